//! Text and identifier utilities for Adega
//!
//! Pure, synchronous helpers shared by the catalog and equipment crates:
//! canonical client codes, the lookup-token sets used for fuzzy code
//! matching, and the tolerant numeric parsing applied to spreadsheet
//! exports.

use std::collections::HashSet;
use std::sync::LazyLock;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

static WHITESPACE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\s+").expect("Invalid regex pattern"));

static DIRECT_INTEGER: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^[-+]?\d+$").expect("Invalid regex pattern"));

static FIRST_INTEGER: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"[-+]?\d+").expect("Invalid regex pattern"));

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_spaces(value: &str) -> String {
    WHITESPACE.replace_all(value.trim(), " ").into_owned()
}

/// Keep only ASCII digits.
pub fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Canonical form of a client code: alphanumeric-only, upper-cased, and with
/// leading zeros stripped when the code is purely numeric.
///
/// This is the stable join key between the client registry export and the
/// open-inventory ledger export, which disagree on punctuation and zero
/// padding.
///
/// # Examples
///
/// ```
/// use adega_common::canonical_code;
///
/// assert_eq!(canonical_code(" 001001 "), "1001");
/// assert_eq!(canonical_code("ab-12"), "AB12");
/// assert_eq!(canonical_code("000"), "0");
/// assert_eq!(canonical_code(canonical_code("001001").as_str()), "1001");
/// ```
pub fn canonical_code(value: &str) -> String {
    let compact: String = value
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase();

    if !compact.is_empty() && compact.bytes().all(|b| b.is_ascii_digit()) {
        let stripped = compact.trim_start_matches('0');
        if stripped.is_empty() {
            return "0".to_string();
        }
        return stripped.to_string();
    }
    compact
}

/// Lookup tokens for an RG/tag/serial code: the upper-cased raw value, the
/// alphanumeric-compacted value, and the digits-only value.
///
/// Equality between a ledger serial and a locally registered code is tested
/// by token-set intersection instead of exact string comparison, so
/// punctuation, leading zeros, and digit-only partial entries still match.
pub fn code_lookup_tokens(value: &str) -> HashSet<String> {
    let normalized = normalize_spaces(value);
    if normalized.is_empty() {
        return HashSet::new();
    }
    let upper = normalized.to_uppercase();
    let compact: String = upper.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    let digits = digits_only(&upper);

    let mut tokens = HashSet::new();
    if !compact.is_empty() {
        tokens.insert(compact);
    }
    if !digits.is_empty() {
        tokens.insert(digits);
    }
    tokens.insert(upper);
    tokens
}

/// Lower-case, strip accents (NFD minus combining marks), convert `-`/`_` to
/// spaces, and collapse whitespace. Used to compare free text such as item
/// descriptions, statuses, and category aliases.
pub fn normalize_lookup_text(value: &str) -> String {
    let lowered = normalize_spaces(value).to_lowercase();
    let without_accents: String = lowered.nfd().filter(|c| !is_combining_mark(*c)).collect();
    normalize_spaces(&without_accents.replace(['-', '_'], " "))
}

/// Parse an integer from a locale-ambiguous spreadsheet cell.
///
/// Tries a plain signed integer first, then currency-style cleanup
/// (thousands separators, decimal commas), then falls back to the first
/// digit run. Unparseable input yields `0`; fractions truncate toward zero.
///
/// # Examples
///
/// ```
/// use adega_common::parse_integer;
///
/// assert_eq!(parse_integer("-3"), -3);
/// assert_eq!(parse_integer("1.234.567"), 1234567);
/// assert_eq!(parse_integer("1.234,56"), 1234);
/// assert_eq!(parse_integer("abc"), 0);
/// ```
pub fn parse_integer(value: &str) -> i64 {
    let raw = value.trim();
    if raw.is_empty() {
        return 0;
    }

    let token: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if DIRECT_INTEGER.is_match(&token) {
        return token.parse().unwrap_or(0);
    }

    let has_comma = token.contains(',');
    let has_dot = token.contains('.');
    let cleaned = if has_comma && has_dot {
        token.replace('.', "").replace(',', ".")
    } else if has_comma {
        // A single 3-digit tail after the comma reads as a thousands group.
        let (left, right) = token.split_once(',').unwrap_or((token.as_str(), ""));
        if right.len() == 3 {
            token.replace(',', "")
        } else {
            format!("{left}.{right}")
        }
    } else if has_dot && token.matches('.').count() > 1 {
        token.replace('.', "")
    } else {
        token.clone()
    };

    if let Ok(parsed) = cleaned.parse::<f64>() {
        if parsed.is_finite() {
            return parsed.trunc() as i64;
        }
    }

    let digits_candidate = cleaned.replace(['.', ','], "");
    FIRST_INTEGER
        .find(&digits_candidate)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Normalize a CNPJ/CPF to its significant digits: the last 14 for a CNPJ,
/// the last 9 for a CPF root, empty when the value has too few digits.
pub fn normalize_document(value: &str) -> String {
    let digits = digits_only(value);
    if digits.len() >= 14 {
        digits[digits.len() - 14..].to_string()
    } else if digits.len() >= 9 {
        digits[digits.len() - 9..].to_string()
    } else {
        String::new()
    }
}

/// Normalize a sector code to its last three digits.
pub fn normalize_setor(value: &str) -> String {
    let digits = digits_only(value);
    if digits.is_empty() {
        return String::new();
    }
    let start = digits.len().saturating_sub(3);
    digits[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_code_strips_punctuation_and_zeros() {
        assert_eq!(canonical_code("001001"), "1001");
        assert_eq!(canonical_code(" 00-10.01 "), "1001");
        assert_eq!(canonical_code("RG-777"), "RG777");
        assert_eq!(canonical_code(""), "");
        assert_eq!(canonical_code("0000"), "0");
    }

    #[test]
    fn test_canonical_code_is_idempotent() {
        for raw in ["001001", "rg-001", "  A B C ", "0", ""] {
            let once = canonical_code(raw);
            assert_eq!(canonical_code(&once), once);
        }
    }

    #[test]
    fn test_code_lookup_tokens_formatting_drift() {
        let ledger = code_lookup_tokens("rg-001");
        let local = code_lookup_tokens("RG001");
        assert!(!ledger.is_disjoint(&local));

        // Digit-only partial entry still intersects the full code.
        let partial = code_lookup_tokens("001");
        assert!(!ledger.is_disjoint(&partial));
    }

    #[test]
    fn test_code_lookup_tokens_empty() {
        assert!(code_lookup_tokens("").is_empty());
        assert!(code_lookup_tokens("   ").is_empty());
    }

    #[test]
    fn test_normalize_lookup_text() {
        assert_eq!(normalize_lookup_text("Câmara-Fria_2"), "camara fria 2");
        assert_eq!(normalize_lookup_text("  GELADEIRA  330L "), "geladeira 330l");
    }

    #[test]
    fn test_parse_integer_plain_and_signed() {
        assert_eq!(parse_integer("42"), 42);
        assert_eq!(parse_integer("-7"), -7);
        assert_eq!(parse_integer("+5"), 5);
        assert_eq!(parse_integer(" 1 234 "), 1234);
    }

    #[test]
    fn test_parse_integer_locale_formats() {
        assert_eq!(parse_integer("1.234,50"), 1234);
        assert_eq!(parse_integer("1,234"), 1234);
        assert_eq!(parse_integer("12,5"), 12);
        assert_eq!(parse_integer("1.234.567"), 1234567);
        // A single dot reads as a decimal separator, not thousands.
        assert_eq!(parse_integer("1.5"), 1);
        assert_eq!(parse_integer("-1,5"), -1);
    }

    #[test]
    fn test_parse_integer_fallback() {
        assert_eq!(parse_integer(""), 0);
        assert_eq!(parse_integer("abc"), 0);
        assert_eq!(parse_integer("qty 12 un"), 12);
    }

    #[test]
    fn test_normalize_document() {
        assert_eq!(normalize_document("12.345.678/0001-95"), "12345678000195");
        assert_eq!(normalize_document("123.456.789"), "123456789");
        assert_eq!(normalize_document("123"), "");
    }

    #[test]
    fn test_normalize_setor() {
        assert_eq!(normalize_setor("Setor 0123"), "123");
        assert_eq!(normalize_setor("7"), "7");
        assert_eq!(normalize_setor("sem numero"), "");
    }
}
