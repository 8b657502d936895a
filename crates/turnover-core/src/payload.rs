//! Payload validation
//!
//! Maps a parsed JSON document onto [`ReportPayload`], rejecting documents
//! that cannot produce a table. Individual cell values are never rejected:
//! anything that is not a number, string, or boolean is kept as its JSON text.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{CellValue, ColumnDef, ColumnKind, LegendItem, ReportError, ReportPayload, Row, REQUIRED_KEYS};

impl ReportPayload {
    /// Parse and validate a JSON document
    pub fn from_json(input: &str) -> Result<Self, ReportError> {
        let value: Value =
            serde_json::from_str(input).map_err(|_| ReportError::validation("Invalid JSON."))?;
        Self::from_value(&value)
    }

    /// Validate an already parsed JSON document
    pub fn from_value(value: &Value) -> Result<Self, ReportError> {
        let object = value
            .as_object()
            .ok_or_else(|| ReportError::validation("Report payload must be a JSON object."))?;

        for key in REQUIRED_KEYS {
            if !object.contains_key(key) {
                return Err(ReportError::validation(format!(
                    "Missing required key: '{key}'"
                )));
            }
        }

        let columns = match &object["columns"] {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| parse_column(index, item))
                .collect::<Result<Vec<_>, _>>()?,
            _ => return Err(ReportError::validation("'columns' must be a list.")),
        };
        if columns.is_empty() {
            return Err(ReportError::validation("No columns provided."));
        }

        let rows = match &object["rows"] {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| parse_row(index, item))
                .collect::<Result<Vec<_>, _>>()?,
            _ => return Err(ReportError::validation("'rows' must be a list.")),
        };

        // A legend that is not a list renders as an empty line
        let legend = match &object["legend"] {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| parse_legend_item(index, item))
                .collect::<Result<Vec<_>, _>>()?,
            _ => Vec::new(),
        };

        Ok(Self {
            caption: display_text(&object["caption"]),
            date_time_user: display_text(&object["dateTimeUser"]),
            legend,
            columns,
            rows,
        })
    }

    /// Shape of the payload, for reporting without rendering
    pub fn summary(&self) -> PayloadSummary {
        PayloadSummary {
            caption: self.caption.clone(),
            columns: self.columns.len(),
            rows: self.rows.len(),
            currency_column: self.currency_column().map(|i| self.columns[i].clone()),
            percent_column: self.percent_column().map(|i| self.columns[i].clone()),
            kinds: self.columns.iter().map(ColumnDef::kind).collect(),
        }
    }
}

/// What a payload will render to
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PayloadSummary {
    pub caption: String,
    pub columns: usize,
    pub rows: usize,
    pub currency_column: Option<ColumnDef>,
    pub percent_column: Option<ColumnDef>,
    pub kinds: Vec<ColumnKind>,
}

impl CellValue {
    /// Convert a JSON scalar. Empty strings and `null` become `Empty`.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => CellValue::Empty,
            Value::Bool(b) => CellValue::Bool(*b),
            Value::Number(n) => n.as_f64().map_or(CellValue::Empty, CellValue::Number),
            Value::String(s) => CellValue::from(s.as_str()),
            Value::Array(_) | Value::Object(_) => CellValue::Text(value.to_string()),
        }
    }
}

fn parse_column(index: usize, value: &Value) -> Result<ColumnDef, ReportError> {
    let object = expect_object(value, "columns", index)?;
    Ok(ColumnDef::new(field_text(object, "name"), field_text(object, "caption")))
}

fn parse_row(index: usize, value: &Value) -> Result<Row, ReportError> {
    let object = expect_object(value, "rows", index)?;
    let mut row = Row::new();
    for (key, cell) in object {
        row.insert(key.as_str(), CellValue::from_json(cell));
    }
    Ok(row)
}

fn parse_legend_item(index: usize, value: &Value) -> Result<LegendItem, ReportError> {
    let object = expect_object(value, "legend", index)?;
    Ok(LegendItem::new(field_text(object, "label"), field_text(object, "value")))
}

fn expect_object<'a>(
    value: &'a Value,
    key: &str,
    index: usize,
) -> Result<&'a Map<String, Value>, ReportError> {
    value
        .as_object()
        .ok_or_else(|| ReportError::validation(format!("'{key}[{index}]' must be an object.")))
}

fn field_text(object: &Map<String, Value>, field: &str) -> String {
    object.get(field).map(display_text).unwrap_or_default()
}

/// Text shown for a JSON value used as a label
fn display_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
