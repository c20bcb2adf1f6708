//! Inspeção e normalização das respostas do Bitrix24
//!
//! Um único passo de inspeção decide o formato do JSON e cada variante é
//! convertida para [`Table`] por uma função pura própria:
//!
//! - **Header+rows** (BI Connector): `[["ID","TITLE"], ["1","Negócio"], ...]`
//! - **Array de registros** (REST): `[{"ID": "1", "TITLE": "Negócio"}, ...]`,
//!   também quando embrulhado em `{"result": [...]}`
//! - **Erro**: objeto com chave `error`

use serde_json::{Map, Value};

use crate::error::{BitrixError, Result};
use crate::table::{Cell, Table};

/// Resultado da inspeção de um payload
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedPayload {
    /// Primeira linha é o cabeçalho, as demais são dados posicionais
    HeaderRows { header: Vec<String>, rows: Vec<Vec<Value>> },
    /// Cada objeto vira uma linha
    RecordArray(Vec<Map<String, Value>>),
    /// Objeto `{"error": ...}` devolvido pelo Bitrix24
    UpstreamError(String),
    /// JSON válido que não corresponde a nenhum formato suportado
    Unrecognized(String),
}

impl ParsedPayload {
    /// Classifica o JSON em uma das variantes
    pub fn inspect(value: Value) -> Self {
        match value {
            Value::Array(items) => Self::inspect_array(items),
            Value::Object(mut obj) => {
                if obj.contains_key("error") {
                    return Self::UpstreamError(describe_error(&obj));
                }
                match obj.remove("result") {
                    Some(Value::Array(items)) => Self::inspect_array(items),
                    Some(_) => Self::Unrecognized("'result' is not an array".to_string()),
                    None => Self::Unrecognized("object without 'result' or 'error'".to_string()),
                }
            }
            other => Self::Unrecognized(format!("top-level {} is not an array", json_kind(&other))),
        }
    }

    fn inspect_array(items: Vec<Value>) -> Self {
        let mut iter = items.into_iter();
        let Some(first) = iter.next() else {
            return Self::RecordArray(Vec::new());
        };

        match first {
            Value::Array(header) => {
                let header = header.iter().map(cell_text).collect::<Vec<_>>();
                let mut rows = Vec::new();
                for (pos, item) in iter.enumerate() {
                    match item {
                        Value::Array(cells) => rows.push(cells),
                        other => {
                            return Self::Unrecognized(format!(
                                "row {} is {} but header is an array",
                                pos + 1,
                                json_kind(&other)
                            ))
                        }
                    }
                }
                Self::HeaderRows { header, rows }
            }
            Value::Object(first) => {
                let mut records = vec![first];
                for (pos, item) in iter.enumerate() {
                    match item {
                        Value::Object(obj) => records.push(obj),
                        other => {
                            return Self::Unrecognized(format!(
                                "record {} is {} but first record is an object",
                                pos + 1,
                                json_kind(&other)
                            ))
                        }
                    }
                }
                Self::RecordArray(records)
            }
            other => Self::Unrecognized(format!("first element is {}", json_kind(&other))),
        }
    }

    /// Converte para tabela; variantes de erro viram `Err`
    pub fn into_table(self) -> Result<Table> {
        match self {
            Self::HeaderRows { header, rows } => Ok(table_from_header_rows(header, rows)),
            Self::RecordArray(records) => Ok(table_from_records(records)),
            Self::UpstreamError(message) => Err(BitrixError::ErrorPayload(message)),
            Self::Unrecognized(reason) => Err(BitrixError::ShapeMismatch(reason)),
        }
    }
}

/// Header+rows → tabela
///
/// Linhas curtas são completadas com `""`; células além do cabeçalho são descartadas.
pub fn table_from_header_rows(header: Vec<String>, rows: Vec<Vec<Value>>) -> Table {
    let width = header.len();
    let mut table = Table::with_columns(header);

    for row in rows {
        let mut cells: Vec<Cell> = row.iter().take(width).map(to_cell).collect();
        cells.resize(width, Some(String::new()));
        table.push_row(cells);
    }

    table
}

/// Array de registros → tabela
///
/// As colunas são a união ordenada (primeira ocorrência) de todas as chaves;
/// chave ausente em um registro vira null.
pub fn table_from_records(records: Vec<Map<String, Value>>) -> Table {
    let mut columns: Vec<String> = Vec::new();
    for record in &records {
        for key in record.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }

    let mut table = Table::with_columns(columns.clone());
    for record in &records {
        let cells = columns
            .iter()
            .map(|c| record.get(c).and_then(to_cell))
            .collect();
        table.push_row(cells);
    }

    table
}

/// Valor JSON → célula
fn to_cell(value: &Value) -> Cell {
    match value {
        Value::Null => None,
        other => Some(cell_text(other)),
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn describe_error(obj: &Map<String, Value>) -> String {
    let code = obj.get("error").map(cell_text).unwrap_or_default();
    match obj.get("error_description").map(cell_text) {
        Some(description) if !description.is_empty() => format!("{}: {}", code, description),
        _ => code,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize(value: Value) -> Result<Table> {
        ParsedPayload::inspect(value).into_table()
    }

    #[test]
    fn test_header_rows_pads_short_rows() {
        let table = normalize(json!([["ID", "TITLE"], ["42"], ["43", "Negócio"]])).unwrap();
        assert_eq!(table.columns(), &["ID", "TITLE"]);
        assert_eq!(table.len(), 2);

        let first = table.row(0).unwrap();
        assert_eq!(first.get("ID"), Some("42"));
        assert_eq!(first.get("TITLE"), Some(""));
        assert_eq!(table.row(1).unwrap().get("TITLE"), Some("Negócio"));
    }

    #[test]
    fn test_header_rows_keeps_nulls_and_drops_extra_cells() {
        let table = normalize(json!([["ID", "CATEGORY_ID"], [1, null, "extra"]])).unwrap();
        let row = table.row(0).unwrap();
        assert_eq!(row.get("ID"), Some("1"));
        assert_eq!(row.get("CATEGORY_ID"), None);
        assert_eq!(row.cells().len(), 2);
    }

    #[test]
    fn test_header_only_defines_columns() {
        let table = normalize(json!([["ID", "TITLE"]])).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns(), &["ID", "TITLE"]);
    }

    #[test]
    fn test_empty_array_is_empty_table() {
        let table = normalize(json!([])).unwrap();
        assert!(table.is_empty());
        assert!(table.columns().is_empty());
    }

    #[test]
    fn test_record_array_unions_keys() {
        // Primeiro registro sem o campo personalizado: o valor do segundo não pode sumir
        let table = normalize(json!([
            {"ID": "1", "TITLE": "A"},
            {"ID": "2", "TITLE": "B", "UF_CRM_PENDENCIAS": "Pendência documento"}
        ]))
        .unwrap();

        assert_eq!(table.columns(), &["ID", "TITLE", "UF_CRM_PENDENCIAS"]);
        assert_eq!(table.row(0).unwrap().get("UF_CRM_PENDENCIAS"), None);
        assert_eq!(
            table.row(1).unwrap().get("UF_CRM_PENDENCIAS"),
            Some("Pendência documento")
        );
    }

    #[test]
    fn test_rest_result_envelope() {
        let table = normalize(json!({"result": [{"ID": "9", "CATEGORY_ID": 2}], "total": 1})).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.row(0).unwrap().get("CATEGORY_ID"), Some("2"));
    }

    #[test]
    fn test_error_object_is_failure() {
        let parsed = ParsedPayload::inspect(json!({
            "error": "INVALID_CREDENTIALS",
            "error_description": "Invalid request credentials"
        }));
        assert_eq!(
            parsed,
            ParsedPayload::UpstreamError("INVALID_CREDENTIALS: Invalid request credentials".to_string())
        );
        assert!(matches!(parsed.into_table(), Err(BitrixError::ErrorPayload(_))));
    }

    #[test]
    fn test_unrecognized_shapes() {
        for value in [json!("texto"), json!({"foo": 1}), json!([1, 2]), json!([["A"], {"A": 1}])] {
            assert!(matches!(
                ParsedPayload::inspect(value).into_table(),
                Err(BitrixError::ShapeMismatch(_))
            ));
        }
    }
}
