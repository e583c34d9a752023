//! Item-type classification heuristics
//!
//! Free-text ledger descriptions are mapped onto the closed `ItemType` set
//! by an explicit, priority-ordered keyword rule chain. A second, broader
//! alias table maps the vocabulary used by the equipment/material dashboards
//! down to the same buckets. Free-text inference never errors; only an
//! unmapped alias used as an explicit filter does.

use std::sync::LazyLock;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use adega_common::{AdegaError, normalize_lookup_text, normalize_spaces};

use crate::model::ItemType;

/// One classification rule: the first rule whose keyword list hits wins.
pub struct ClassificationRule {
    pub item_type: ItemType,
    pub keywords: &'static [&'static str],
}

/// Priority-ordered rule chain. Order matters: "garrafeira" outranks the
/// refrigerator family, and crate keywords outrank bottle keywords.
pub const CLASSIFICATION_RULES: &[ClassificationRule] = &[
    ClassificationRule {
        item_type: ItemType::Garrafeira,
        keywords: &["garrafeira"],
    },
    ClassificationRule {
        item_type: ItemType::Refrigerador,
        keywords: &[
            "refrigerador",
            "geladeira",
            "frigobar",
            "cervejeira",
            "visa cooler",
            "horizontal",
            "vertical",
            "mini",
        ],
    },
    ClassificationRule {
        item_type: ItemType::VasilhameCaixa,
        keywords: &["caixa", "cx ", "cx.", "engrad", "fardo"],
    },
    ClassificationRule {
        item_type: ItemType::VasilhameGarrafa,
        keywords: &["garrafa", "gfa", "vasilhame"],
    },
];

static VOLUME_300ML: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\b300\s*ml\b").expect("Invalid regex pattern"));

static VOLUME_600ML: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\b600\s*ml\b").expect("Invalid regex pattern"));

static VOLUME_1L: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\b(1|1000)\s*(l|lt|litro|litros)\b").expect("Invalid regex pattern")
});

/// Broader dashboard vocabulary mapped onto the item-type buckets.
const MATERIAL_TYPE_ALIASES: &[(&str, ItemType)] = &[
    ("refrigerador", ItemType::Refrigerador),
    ("refrigeradores", ItemType::Refrigerador),
    ("geladeira", ItemType::Refrigerador),
    ("geladeiras", ItemType::Refrigerador),
    ("frigobar", ItemType::Refrigerador),
    ("frigorifico", ItemType::Refrigerador),
    ("cervejeira", ItemType::Refrigerador),
    ("caixa termica", ItemType::CaixaTermica),
    ("caixa termicas", ItemType::CaixaTermica),
    ("caixas termicas", ItemType::CaixaTermica),
    ("cx termica", ItemType::CaixaTermica),
    ("jogo mesa", ItemType::JogoMesa),
    ("jogos mesa", ItemType::JogoMesa),
    ("jogo de mesa", ItemType::JogoMesa),
    ("jogos de mesa", ItemType::JogoMesa),
    ("garrafeira", ItemType::Garrafeira),
    ("vasilhame caixa", ItemType::VasilhameCaixa),
    ("vasilhame garrafa", ItemType::VasilhameGarrafa),
    ("chopeira", ItemType::Outro),
    ("choppeira", ItemType::Outro),
    ("balde", ItemType::Outro),
    ("baldes", ItemType::Outro),
    ("testeira", ItemType::Outro),
    ("compressor", ItemType::Outro),
    ("totem", ItemType::Outro),
    ("cooler carrinho", ItemType::Outro),
    ("coller carrinho", ItemType::Outro),
    ("inflavel", ItemType::Outro),
    ("empilhadeira", ItemType::Outro),
    ("calca", ItemType::Outro),
    ("cartucho", ItemType::Outro),
    ("ombrelone", ItemType::Outro),
    ("ombrellone", ItemType::Outro),
    ("camera fria", ItemType::Outro),
    ("camara fria", ItemType::Outro),
    ("dispensador", ItemType::Outro),
    ("outro", ItemType::Outro),
    ("outros", ItemType::Outro),
];

/// Bottles that fit one crate, by container volume key.
const BOTTLES_PER_CRATE: &[(&str, i32)] = &[("300ml", 24), ("600ml", 24), ("1l", 12)];

/// Lower-case and strip accents without touching punctuation, the form the
/// classification keywords are written in.
fn normalized_description(text: &str) -> String {
    let lowered = normalize_spaces(text).to_lowercase();
    lowered.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Classify a free-text ledger description into an item-type bucket.
/// Unmatched descriptions fall through to `Outro`; this never errors.
pub fn classify_item_type(description: &str) -> ItemType {
    let text = normalized_description(description);
    for rule in CLASSIFICATION_RULES {
        if rule.keywords.iter().any(|keyword| text.contains(keyword)) {
            return rule.item_type;
        }
    }
    ItemType::Outro
}

/// Detect the container volume key (300ml/600ml/1l) in a description.
/// Returns an empty string when no volume is mentioned.
pub fn detect_volume_key(description: &str) -> String {
    let text = normalized_description(description);
    if VOLUME_300ML.is_match(&text) {
        "300ml".to_string()
    } else if VOLUME_600ML.is_match(&text) {
        "600ml".to_string()
    } else if VOLUME_1L.is_match(&text) {
        "1l".to_string()
    } else {
        String::new()
    }
}

fn material_alias(value: &str) -> Option<ItemType> {
    let normalized = normalize_lookup_text(value);
    MATERIAL_TYPE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == normalized)
        .map(|(_, item_type)| *item_type)
}

fn bucketize(item_type: ItemType) -> ItemType {
    match item_type {
        // The dashboards group every vasilhame flavor under garrafeira.
        ItemType::VasilhameCaixa | ItemType::VasilhameGarrafa | ItemType::Garrafeira => {
            ItemType::Garrafeira
        }
        ItemType::Refrigerador | ItemType::CaixaTermica | ItemType::JogoMesa => item_type,
        ItemType::Outro => ItemType::Outro,
    }
}

/// Map a stored item-type value or dashboard alias to its grouping bucket.
/// Unknown values quietly group under `Outro`.
pub fn material_type_bucket(value: &str) -> ItemType {
    material_alias(value).map(bucketize).unwrap_or(ItemType::Outro)
}

/// Strict variant used for explicit filters: an unmapped alias is a
/// validation error instead of a silent `Outro`.
pub fn normalize_material_type(value: &str) -> Result<ItemType, AdegaError> {
    material_alias(value)
        .map(bucketize)
        .ok_or_else(|| AdegaError::Validation(format!("unknown material type: {value}")))
}

/// Bottles per crate for a volume key, if the volume is known.
pub fn bottles_per_crate(volume_key: &str) -> Option<i32> {
    let normalized = volume_key.trim().to_lowercase();
    BOTTLES_PER_CRATE
        .iter()
        .find(|(key, _)| *key == normalized)
        .map(|(_, bottles)| *bottles)
}

/// Total bottles for a crate count, or `None` when the volume is unknown.
pub fn calculate_bottles_for_crates(volume_key: &str, crates_quantity: i32) -> Option<i32> {
    if crates_quantity <= 0 {
        return Some(0);
    }
    bottles_per_crate(volume_key).map(|per_crate| per_crate * crates_quantity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_refrigerator_family() {
        assert_eq!(classify_item_type("GELADEIRA 330L"), ItemType::Refrigerador);
        assert_eq!(classify_item_type("Frigobar Inox"), ItemType::Refrigerador);
        assert_eq!(classify_item_type("VISA COOLER 330L"), ItemType::Refrigerador);
        assert_eq!(
            classify_item_type("CERVEJEIRA HORIZONTAL"),
            ItemType::Refrigerador
        );
        // The cart-mounted cooler alias stays out of the refrigerator family.
        assert_eq!(classify_item_type("COOLER CARRINHO"), ItemType::Outro);
    }

    #[test]
    fn test_classify_garrafeira_outranks_refrigerator() {
        assert_eq!(
            classify_item_type("GARRAFEIRA VERTICAL"),
            ItemType::Garrafeira
        );
    }

    #[test]
    fn test_classify_crate_outranks_bottle() {
        assert_eq!(classify_item_type("CAIXA PLASTICA"), ItemType::VasilhameCaixa);
        assert_eq!(
            classify_item_type("CAIXA GARRAFA 600ML"),
            ItemType::VasilhameCaixa
        );
        assert_eq!(
            classify_item_type("GARRAFA RETORNAVEL 600ML"),
            ItemType::VasilhameGarrafa
        );
    }

    #[test]
    fn test_classify_unmatched_defaults_to_outro() {
        assert_eq!(classify_item_type(""), ItemType::Outro);
        assert_eq!(classify_item_type("MESA DE SINUCA"), ItemType::Outro);
    }

    #[test]
    fn test_detect_volume_key() {
        assert_eq!(detect_volume_key("CAIXA 600 ML RETORNAVEL"), "600ml");
        assert_eq!(detect_volume_key("GARRAFA 300ML"), "300ml");
        assert_eq!(detect_volume_key("GARRAFAO 1 LITRO"), "1l");
        assert_eq!(detect_volume_key("BARRIL 50L"), "");
    }

    #[test]
    fn test_material_type_bucket_groups_vasilhame() {
        assert_eq!(material_type_bucket("vasilhame_caixa"), ItemType::Garrafeira);
        assert_eq!(material_type_bucket("garrafeira"), ItemType::Garrafeira);
        assert_eq!(material_type_bucket("chopeira"), ItemType::Outro);
        assert_eq!(material_type_bucket("refrigeradores"), ItemType::Refrigerador);
        assert_eq!(material_type_bucket("nunca visto"), ItemType::Outro);
    }

    #[test]
    fn test_normalize_material_type_rejects_unknown_alias() {
        assert_eq!(
            normalize_material_type("Caixa Térmica").unwrap(),
            ItemType::CaixaTermica
        );
        assert!(normalize_material_type("zeppelin").is_err());
    }

    #[test]
    fn test_bottle_math() {
        assert_eq!(calculate_bottles_for_crates("600ml", 3), Some(72));
        assert_eq!(calculate_bottles_for_crates("1l", 2), Some(24));
        assert_eq!(calculate_bottles_for_crates("50l", 2), None);
        assert_eq!(calculate_bottles_for_crates("600ml", 0), Some(0));
    }
}
