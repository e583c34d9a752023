//! CSV ingestion parser
//!
//! Decodes the two spreadsheet exports the catalog is fed from, tolerating
//! the mess real exports arrive in: multiple encodings, shifting delimiters,
//! renamed and duplicated header columns, locale-ambiguous numbers. Rows are
//! mapped into typed records at this boundary; nothing string-keyed leaves
//! this module.
//!
//! Row-level defects (unparseable quantity, blank description, non-negative
//! balance) are skipped, counted, and reported alongside the parse result.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use adega_common::{
    AdegaError, canonical_code, normalize_document, normalize_setor, normalize_spaces,
    parse_integer,
};

use crate::classify::{classify_item_type, detect_volume_key};
use crate::model::{ClientField, ClientRecord, InventoryRecord, ParsedClients, ParsedInventory};

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// Legacy single-byte fallbacks tried after strict UTF-8.
const FALLBACK_ENCODINGS: [&encoding_rs::Encoding; 2] =
    [encoding_rs::WINDOWS_1252, encoding_rs::ISO_8859_15];

const DELIMITER_CANDIDATES: [u8; 4] = [b';', b',', b'|', b'\t'];

/// Bytes of the payload inspected when sniffing the delimiter.
const SNIFF_WINDOW: usize = 4096;

/// Header aliases for the client-code column, shared by both exports.
pub const CLIENT_CODE_ALIASES: &[&str] = &[
    "codigo",
    "codigo cliente",
    "código do cliente",
    "cod cliente",
    "cod_cliente",
    "código",
    "código cliente",
    "cliente",
];

const DESCRIPTION_ALIASES: &[&str] = &[
    "descricao",
    "descrição",
    "material",
    "produto",
    "item",
    "nome produto",
    "equipamento",
];

const BAIXADOS_ALIASES: &[&str] = &[
    "baixados",
    "baixado",
    "qtd baixados",
    "qtde baixados",
    "saldo baixados",
];

const SALDO_ALIASES: &[&str] = &["saldo"];

const RG_ALIASES: &[&str] = &[
    "nro serie mercadoria",
    "numero serie mercadoria",
    "rg",
    "numero rg",
    "n rg",
    "serial",
    "serie",
    "identificador",
];

const RG_FALLBACK_ALIASES: &[&str] =
    &["controla nr serie", "controla nr. serie", "controla n serie"];

const COMODATO_ALIASES: &[&str] = &["nro comodato", "numero comodato", "n comodat", "nr comodato"];

const ISSUE_DATE_ALIASES: &[&str] = &["data emissao", "data emissão", "emissao", "emissão"];

const PRODUCT_CODE_ALIASES: &[&str] = &[
    "codigo produto",
    "cod produto",
    "material codigo",
    "codigo material",
];

/// Per-field header aliases for the client registry export. The same table
/// resolves the embedded client snapshot on ledger rows.
const CLIENT_FIELD_ALIASES: &[(ClientField, &[&str])] = &[
    (ClientField::ClientCode, CLIENT_CODE_ALIASES),
    (ClientField::NomeFantasia, &["nome fantasia", "fantasia"]),
    (
        ClientField::RazaoSocial,
        &["razao social", "razão social", "razao"],
    ),
    (ClientField::CnpjCpf, &["cnpj/cpf", "cnpj cpf", "cnpj", "cpf"]),
    (
        ClientField::Setor,
        &[
            "setor",
            "cod setor",
            "cod. setor",
            "codigo setor",
            "código setor",
            "secao",
            "seção",
            "canal",
        ],
    ),
    (ClientField::Telefone, &["telefone", "fone", "celular"]),
    (
        ClientField::Endereco,
        &["endereco", "endereço", "logradouro"],
    ),
    (ClientField::Bairro, &["bairro"]),
    (
        ClientField::Cidade,
        &["cidade", "municipio", "município"],
    ),
    (ClientField::Cep, &["cep"]),
    (
        ClientField::InscricaoEstadual,
        &["inscricao estadual", "inscr est", "inscr. est.", "ie"],
    ),
    (
        ClientField::ResponsavelCliente,
        &[
            "responsavel",
            "responsável",
            "responsavel pdv",
            "responsavel loja",
        ],
    ),
    (ClientField::ResponsavelRetirada, &["responsavel retirada"]),
    (
        ClientField::ResponsavelConferencia,
        &["responsavel conferencia"],
    ),
];

static HEADER_NON_ALNUM: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"[^a-z0-9]+").expect("Invalid regex pattern"));

/// A decoded CSV payload: disambiguated headers, a normalized-header lookup
/// map, and trimmed data rows padded to the header width.
pub struct CsvTable {
    pub headers: Vec<String>,
    header_map: HashMap<String, Vec<usize>>,
    pub rows: Vec<Vec<String>>,
}

/// Normalize a header name for alias matching: lower-cased, accent-stripped,
/// non-alphanumerics collapsed to single spaces.
pub fn normalize_header(name: &str) -> String {
    let lowered = adega_common::normalize_lookup_text(name);
    normalize_spaces(&HEADER_NON_ALNUM.replace_all(&lowered, " "))
}

/// Decode CSV bytes: strict UTF-8 (BOM tolerated) first, then the legacy
/// single-byte encodings in order.
pub fn decode_csv_bytes(raw: &[u8]) -> Result<String, AdegaError> {
    let stripped = raw.strip_prefix(UTF8_BOM).unwrap_or(raw);
    if let Ok(text) = std::str::from_utf8(stripped) {
        return Ok(text.to_string());
    }
    for encoding in FALLBACK_ENCODINGS {
        let (text, _, had_errors) = encoding.decode(raw);
        if !had_errors {
            return Ok(text.into_owned());
        }
    }
    Err(AdegaError::Decode(
        "save the file as UTF-8 or ANSI and upload it again".to_string(),
    ))
}

/// Sniff the field delimiter by frequency over the head of the payload.
/// Ambiguity (ties, no hits) falls back to `;`, the export default.
pub fn detect_delimiter(text: &str) -> u8 {
    let window_end = text
        .char_indices()
        .take_while(|(idx, _)| *idx < SNIFF_WINDOW)
        .last()
        .map(|(idx, ch)| idx + ch.len_utf8())
        .unwrap_or(0);
    let sample = &text[..window_end];

    let mut best = b';';
    let mut best_count = 0usize;
    for candidate in DELIMITER_CANDIDATES {
        let count = sample.bytes().filter(|&b| b == candidate).count();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}

/// Decode and tabulate a CSV payload. The header row is required; duplicate
/// header names stay addressable through per-occurrence suffixes.
pub fn read_csv_table(raw: &[u8]) -> Result<CsvTable, AdegaError> {
    let text = decode_csv_bytes(raw)?;
    let delimiter = detect_delimiter(&text);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let header_record = match records.next() {
        Some(Ok(record)) => record,
        Some(Err(err)) => return Err(AdegaError::Validation(format!("unreadable CSV: {err}"))),
        None => {
            return Err(AdegaError::Validation(
                "CSV has no header row".to_string(),
            ));
        }
    };

    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut headers = Vec::new();
    let mut header_map: HashMap<String, Vec<usize>> = HashMap::new();
    for (index, raw_name) in header_record.iter().enumerate() {
        let mut base = raw_name.trim().to_string();
        if base.is_empty() {
            base = "coluna".to_string();
        }
        let occurrence = seen.entry(base.clone()).or_insert(0);
        *occurrence += 1;
        let unique = if *occurrence == 1 {
            base.clone()
        } else {
            format!("{base}__{occurrence}")
        };
        headers.push(unique);
        header_map.entry(normalize_header(&base)).or_default().push(index);
    }

    let width = headers.len();
    let mut rows = Vec::new();
    for record in records {
        let record = match record {
            Ok(record) => record,
            Err(err) => return Err(AdegaError::Validation(format!("unreadable CSV: {err}"))),
        };
        let mut row: Vec<String> = record.iter().take(width).map(|cell| cell.trim().to_string()).collect();
        row.resize(width, String::new());
        rows.push(row);
    }

    Ok(CsvTable {
        headers,
        header_map,
        rows,
    })
}

impl CsvTable {
    /// Resolve an ordered alias list against the normalized header map,
    /// returning the first matching column index.
    pub fn column(&self, aliases: &[&str]) -> Option<usize> {
        for alias in aliases {
            if let Some(indexes) = self.header_map.get(&normalize_header(alias)) {
                if let Some(&first) = indexes.first() {
                    return Some(first);
                }
            }
        }
        None
    }
}

fn pick_column(table: &CsvTable, aliases: &[&str]) -> Option<usize> {
    table.column(aliases)
}

fn require_column(table: &CsvTable, aliases: &[&str], label: &str) -> Result<usize, AdegaError> {
    pick_column(table, aliases).ok_or_else(|| AdegaError::MissingColumn(label.to_string()))
}

fn normalize_client_field(field: ClientField, value: &str) -> String {
    match field {
        ClientField::CnpjCpf => normalize_document(value),
        ClientField::Setor => normalize_setor(value),
        _ => normalize_spaces(value),
    }
}

/// Column indexes for the client fields present in this table, resolved once
/// ahead of the row loop.
fn resolve_client_columns(table: &CsvTable) -> Vec<(ClientField, usize)> {
    CLIENT_FIELD_ALIASES
        .iter()
        .filter_map(|(field, aliases)| pick_column(table, aliases).map(|index| (*field, index)))
        .collect()
}

fn client_snapshot_from_row(columns: &[(ClientField, usize)], row: &[String]) -> ClientRecord {
    let mut record = ClientRecord::default();
    for (field, index) in columns {
        let value = row.get(*index).map(String::as_str).unwrap_or_default();
        record.set_field(*field, normalize_client_field(*field, value));
    }
    record
}

/// Parse the client registry export into one record per canonical code.
pub fn load_clients_csv(raw: &[u8]) -> Result<ParsedClients, AdegaError> {
    let table = read_csv_table(raw)?;
    if table.rows.is_empty() {
        return Err(AdegaError::Validation(
            "clients CSV has no data rows".to_string(),
        ));
    }

    let code_column = require_column(&table, CLIENT_CODE_ALIASES, "client code")?;
    let client_columns = resolve_client_columns(&table);

    let mut by_code = BTreeMap::new();
    let mut skipped_rows = 0u32;
    for row in &table.rows {
        let raw_code = row[code_column].trim();
        let code = canonical_code(raw_code);
        if code.is_empty() {
            skipped_rows += 1;
            continue;
        }

        let mut record = client_snapshot_from_row(&client_columns, row);
        record.client_code = if raw_code.is_empty() {
            code.clone()
        } else {
            raw_code.to_string()
        };
        by_code.insert(code, record);
    }

    if by_code.is_empty() {
        return Err(AdegaError::Validation(
            "no valid client rows found in clients CSV".to_string(),
        ));
    }
    Ok(ParsedClients {
        by_code,
        skipped_rows,
    })
}

/// Parse the open-inventory ledger export. Only rows with a strictly
/// negative baixados/saldo balance represent open items; everything else is
/// skipped and counted.
pub fn load_inventory_csv(raw: &[u8]) -> Result<ParsedInventory, AdegaError> {
    let table = read_csv_table(raw)?;
    if table.rows.is_empty() {
        return Err(AdegaError::Validation(
            "inventory CSV has no data rows".to_string(),
        ));
    }

    let code_column = require_column(&table, CLIENT_CODE_ALIASES, "client code")?;
    let description_column = require_column(&table, DESCRIPTION_ALIASES, "item description")?;
    let baixados_column = pick_column(&table, BAIXADOS_ALIASES);
    let saldo_column = pick_column(&table, SALDO_ALIASES);
    if baixados_column.is_none() && saldo_column.is_none() {
        return Err(AdegaError::MissingColumn("baixados or saldo".to_string()));
    }
    let rg_column = pick_column(&table, RG_ALIASES);
    let rg_fallback_column = pick_column(&table, RG_FALLBACK_ALIASES);
    let comodato_column = pick_column(&table, COMODATO_ALIASES);
    let issue_date_column = pick_column(&table, ISSUE_DATE_ALIASES);
    let product_column = pick_column(&table, PRODUCT_CODE_ALIASES);
    let client_columns = resolve_client_columns(&table);

    let cell = |row: &[String], column: Option<usize>| -> String {
        column
            .and_then(|index| row.get(index))
            .map(|value| normalize_spaces(value))
            .unwrap_or_default()
    };

    let mut by_client: BTreeMap<String, Vec<InventoryRecord>> = BTreeMap::new();
    let mut skipped_rows = 0u32;
    for row in &table.rows {
        let code = canonical_code(&row[code_column]);
        if code.is_empty() {
            skipped_rows += 1;
            continue;
        }

        let baixados_value = baixados_column.map(|i| parse_integer(&row[i])).unwrap_or(0);
        let saldo_value = saldo_column.map(|i| parse_integer(&row[i])).unwrap_or(0);

        // Open items show up as negative balances, written-off column first.
        let open_balance = if baixados_column.is_some() && baixados_value < 0 {
            Some(baixados_value)
        } else if saldo_column.is_some() && saldo_value < 0 {
            Some(saldo_value)
        } else {
            None
        };
        let Some(open_balance) = open_balance else {
            skipped_rows += 1;
            continue;
        };

        let description = normalize_spaces(&row[description_column]);
        if description.is_empty() {
            skipped_rows += 1;
            continue;
        }

        let mut rg = cell(row, rg_column);
        if rg.is_empty() {
            rg = cell(row, rg_fallback_column);
        }

        let record = InventoryRecord {
            item_type: classify_item_type(&description),
            volume_key: detect_volume_key(&description),
            open_quantity: open_balance.unsigned_abs().min(i32::MAX as u64) as i32,
            source_baixados: open_balance.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
            description,
            rg,
            comodato_number: cell(row, comodato_column),
            issue_date: cell(row, issue_date_column),
            product_code: cell(row, product_column),
            client_snapshot: client_snapshot_from_row(&client_columns, row),
        };
        by_client.entry(code).or_default().push(record);
    }

    Ok(ParsedInventory {
        by_client,
        skipped_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemType;

    #[test]
    fn test_decode_utf8_with_bom() {
        let bytes = b"\xef\xbb\xbfcodigo;descricao\n1;Gelado";
        let text = decode_csv_bytes(bytes).unwrap();
        assert!(text.starts_with("codigo"));
    }

    #[test]
    fn test_decode_legacy_single_byte() {
        // "ração" in windows-1252: e7/e3 are not valid UTF-8 sequences.
        let bytes = b"descricao\nra\xe7\xe3o";
        let text = decode_csv_bytes(bytes).unwrap();
        assert!(text.contains("ração"));
    }

    #[test]
    fn test_detect_delimiter_prefers_frequency() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), b';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), b',');
        assert_eq!(detect_delimiter("a|b|c"), b'|');
        assert_eq!(detect_delimiter("a\tb\tc"), b'\t');
        // No delimiter at all: default export delimiter.
        assert_eq!(detect_delimiter("abc"), b';');
    }

    #[test]
    fn test_read_csv_table_disambiguates_duplicate_headers() {
        let table = read_csv_table(b"CNPJ;Nome;CNPJ\n1;X;2").unwrap();
        assert_eq!(table.headers, vec!["CNPJ", "Nome", "CNPJ__2"]);
        assert_eq!(table.rows, vec![vec!["1", "X", "2"]]);
    }

    #[test]
    fn test_read_csv_table_pads_short_rows() {
        let table = read_csv_table(b"a;b;c\n1;2").unwrap();
        assert_eq!(table.rows[0], vec!["1", "2", ""]);
    }

    #[test]
    fn test_load_clients_requires_code_column() {
        let err = load_clients_csv(b"nome fantasia;cidade\nBar do Ze;Registro").unwrap_err();
        assert!(matches!(err, AdegaError::MissingColumn(_)));
    }

    #[test]
    fn test_load_clients_canonicalizes_codes() {
        let parsed = load_clients_csv(
            "Código do Cliente;Nome Fantasia;CNPJ\n001001;Bar do Ze;12.345.678/0001-95\n;;\n"
                .as_bytes(),
        )
        .unwrap();
        assert_eq!(parsed.by_code.len(), 1);
        let record = parsed.by_code.get("1001").unwrap();
        assert_eq!(record.client_code, "001001");
        assert_eq!(record.nome_fantasia, "Bar do Ze");
        assert_eq!(record.cnpj_cpf, "12345678000195");
        assert_eq!(parsed.skipped_rows, 1);
    }

    #[test]
    fn test_load_inventory_requires_balance_column() {
        let err = load_inventory_csv(b"codigo;descricao\n1;GELADEIRA").unwrap_err();
        match err {
            AdegaError::MissingColumn(field) => assert_eq!(field, "baixados or saldo"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_load_inventory_keeps_only_negative_balances() {
        let csv = "codigo;descricao;baixados\n\
                   1001;GELADEIRA 330L;-2\n\
                   1001;GELADEIRA 330L;5\n\
                   1002;CAIXA 600ML;0\n";
        let parsed = load_inventory_csv(csv.as_bytes()).unwrap();
        assert_eq!(parsed.by_client.len(), 1);
        let items = parsed.by_client.get("1001").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].open_quantity, 2);
        assert_eq!(items[0].source_baixados, -2);
        assert_eq!(items[0].item_type, ItemType::Refrigerador);
        assert_eq!(parsed.skipped_rows, 2);
    }

    #[test]
    fn test_load_inventory_baixados_wins_over_saldo() {
        let csv = "codigo;descricao;baixados;saldo\n1001;GELADEIRA;-1;-9\n";
        let parsed = load_inventory_csv(csv.as_bytes()).unwrap();
        assert_eq!(parsed.by_client["1001"][0].open_quantity, 1);
    }

    #[test]
    fn test_load_inventory_extracts_optional_fields() {
        let csv = "codigo;material;saldo;nro serie mercadoria;nro comodato;data emissao\n\
                   1001;CAIXA 600 ML;-3;RG-777;CMD-1;2026-02-22\n";
        let parsed = load_inventory_csv(csv.as_bytes()).unwrap();
        let item = &parsed.by_client["1001"][0];
        assert_eq!(item.rg, "RG-777");
        assert_eq!(item.comodato_number, "CMD-1");
        assert_eq!(item.issue_date, "2026-02-22");
        assert_eq!(item.volume_key, "600ml");
        assert_eq!(item.item_type, ItemType::VasilhameCaixa);
    }

    #[test]
    fn test_load_inventory_carries_client_snapshot() {
        let csv = "codigo;descricao;baixados;nome fantasia;cidade\n\
                   1001;GELADEIRA;-1;Bar do Ze;Registro\n";
        let parsed = load_inventory_csv(csv.as_bytes()).unwrap();
        let snapshot = &parsed.by_client["1001"][0].client_snapshot;
        assert_eq!(snapshot.nome_fantasia, "Bar do Ze");
        assert_eq!(snapshot.cidade, "Registro");
    }
}
