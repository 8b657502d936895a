//! # turnover-core
//!
//! Core domain model and traits for the turnover report generator.
//!
//! This crate provides:
//! - Domain types: `ReportPayload`, `ColumnDef`, `LegendItem`, `Row`, `CellValue`
//! - Column classification by caption (`ColumnKind`)
//! - The optional branding image (`LogoAsset`)
//! - Core trait: `Renderer`
//! - Error types
//!
//! ## Example
//!
//! ```rust
//! use turnover_core::{CellValue, ColumnKind, ReportPayload, Row};
//!
//! let payload = ReportPayload::new("Turnover Report", "2025-01-01 09:00 alice")
//!     .legend("Period", "Jan-2025")
//!     .column("store", "Store")
//!     .column("amt", "Turnover\r\nEUR")
//!     .row(Row::new().cell("store", "A").cell("amt", "100.5"));
//!
//! assert_eq!(payload.legend_line(), "Period: Jan-2025");
//! assert_eq!(payload.currency_column(), Some(1));
//! assert_eq!(payload.columns[1].kind(), ColumnKind::Currency);
//! assert_eq!(payload.rows[0].get("amt").as_number(), Some(100.5));
//! assert_eq!(payload.rows[0].get("missing"), &CellValue::Empty);
//! ```

pub mod payload;

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

pub use payload::PayloadSummary;

// ============================================================================
// Constants
// ============================================================================

/// Keys every report payload must carry, in validation order
pub const REQUIRED_KEYS: [&str; 5] = ["caption", "dateTimeUser", "legend", "columns", "rows"];

/// Suggested download filename for a rendered report
pub const REPORT_FILENAME: &str = "turnover-report.xlsx";

/// Media type of a rendered report
pub const XLSX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Default logo display width in pixels
pub const LOGO_WIDTH: u32 = 278;

/// Default logo display height in pixels
pub const LOGO_HEIGHT: u32 = 40;

// ============================================================================
// Report Payload
// ============================================================================

/// A validated turnover report, ready to be rendered
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReportPayload {
    /// Report title
    pub caption: String,
    /// Generation timestamp and acting user, displayed verbatim
    pub date_time_user: String,
    /// Filter summary shown under the title
    pub legend: Vec<LegendItem>,
    /// Column definitions in display order
    pub columns: Vec<ColumnDef>,
    /// Data rows in display order
    pub rows: Vec<Row>,
}

impl ReportPayload {
    pub fn new(caption: impl Into<String>, date_time_user: impl Into<String>) -> Self {
        Self {
            caption: caption.into(),
            date_time_user: date_time_user.into(),
            ..Self::default()
        }
    }

    /// Append a legend entry
    pub fn legend(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.legend.push(LegendItem::new(label, value));
        self
    }

    /// Append a column definition
    pub fn column(mut self, name: impl Into<String>, caption: impl Into<String>) -> Self {
        self.columns.push(ColumnDef::new(name, caption));
        self
    }

    /// Append a data row
    pub fn row(mut self, row: Row) -> Self {
        self.rows.push(row);
        self
    }

    /// Legend entries as one display line: `label: value | label: value`
    pub fn legend_line(&self) -> String {
        self.legend
            .iter()
            .map(LegendItem::to_string)
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// Column captions in display order
    pub fn captions(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.caption.as_str()).collect()
    }

    /// Index of the currency column. When several captions match, the last one wins.
    pub fn currency_column(&self) -> Option<usize> {
        self.columns
            .iter()
            .rposition(|c| c.kind() == ColumnKind::Currency)
    }

    /// Index of the percent column. When several captions match, the last one wins.
    pub fn percent_column(&self) -> Option<usize> {
        self.columns
            .iter()
            .rposition(|c| c.kind() == ColumnKind::Percent)
    }
}

/// One `label: value` pair of the legend line
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LegendItem {
    pub label: String,
    pub value: String,
}

impl LegendItem {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for LegendItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.value)
    }
}

/// A report column: the row key to read and the header text to show
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
    /// Key looked up in each row
    pub name: String,
    /// Header text
    pub caption: String,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            caption: caption.into(),
        }
    }

    pub fn kind(&self) -> ColumnKind {
        ColumnKind::from_caption(&self.caption)
    }
}

/// How a column's values are transformed and formatted
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Written verbatim
    Text,
    /// Coerced to a number, shown as `#,##0.00`
    Currency,
    /// Entered on a 0-100 scale, stored divided by 100, shown as `0.0%`
    Percent,
}

impl ColumnKind {
    /// Classify a column by its caption.
    ///
    /// - `%` (surrounding whitespace ignored) is the percent column
    /// - anything starting with `turnover`, case-insensitive and with CR/LF
    ///   removed, is the currency column
    pub fn from_caption(caption: &str) -> Self {
        if caption.trim() == "%" {
            return ColumnKind::Percent;
        }
        let normalized: String = caption
            .chars()
            .filter(|c| *c != '\r' && *c != '\n')
            .collect();
        if normalized.trim().to_lowercase().starts_with("turnover") {
            ColumnKind::Currency
        } else {
            ColumnKind::Text
        }
    }
}

// ============================================================================
// Rows and Cells
// ============================================================================

static EMPTY_CELL: CellValue = CellValue::Empty;

/// One data row, keyed by column name
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    cells: HashMap<String, CellValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style cell insertion
    pub fn cell(mut self, name: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<CellValue>) {
        self.cells.insert(name.into(), value.into());
    }

    /// Value for a column name; absent keys read as `CellValue::Empty`
    pub fn get(&self, name: &str) -> &CellValue {
        self.cells.get(name).unwrap_or(&EMPTY_CELL)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// A scalar cell value as supplied by the payload
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Numeric reading of the value.
    ///
    /// Numbers are returned as-is and text is parsed after trimming. Empty
    /// cells, booleans and text that is not a finite number yield `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            CellValue::Empty | CellValue::Bool(_) => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s)
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

// ============================================================================
// Logo
// ============================================================================

/// Branding image placed in the top-right corner of the report
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogoAsset {
    bytes: Vec<u8>,
    /// Display width in pixels
    pub width: u32,
    /// Display height in pixels
    pub height: u32,
}

impl LogoAsset {
    /// Wrap raw image bytes at the default 278x40 display size
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            width: LOGO_WIDTH,
            height: LOGO_HEIGHT,
        }
    }

    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        Ok(Self::new(std::fs::read(path)?))
    }

    /// Override the display size
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Renders a report payload into an output document
pub trait Renderer {
    type Output;

    /// Render a payload, embedding the logo when one is given
    fn render(
        &self,
        payload: &ReportPayload,
        logo: Option<&LogoAsset>,
    ) -> Result<Self::Output, ReportError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Report generation error
#[derive(Debug, Error)]
pub enum ReportError {
    /// The payload or the generated document is invalid; the caller is at fault
    #[error("{0}")]
    Validation(String),

    /// Anything else that went wrong while building the document
    #[error("Failed to generate report: {0}")]
    Unexpected(String),
}

impl ReportError {
    pub fn validation(message: impl Into<String>) -> Self {
        ReportError::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        ReportError::Unexpected(message.into())
    }

    /// Whether the error should be reported as a bad request
    pub fn is_client_error(&self) -> bool {
        matches!(self, ReportError::Validation(_))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn percent_caption_is_exact_match() {
        assert_eq!(ColumnKind::from_caption("%"), ColumnKind::Percent);
        assert_eq!(ColumnKind::from_caption("  % "), ColumnKind::Percent);
        assert_eq!(ColumnKind::from_caption("% share"), ColumnKind::Text);
        assert_eq!(ColumnKind::from_caption("Share %"), ColumnKind::Text);
    }

    #[test]
    fn turnover_caption_is_case_insensitive_prefix() {
        assert_eq!(ColumnKind::from_caption("Turnover\r\nEUR"), ColumnKind::Currency);
        assert_eq!(ColumnKind::from_caption("TURNOVER"), ColumnKind::Currency);
        assert_eq!(ColumnKind::from_caption("turn\r\nover EUR"), ColumnKind::Currency);
        assert_eq!(ColumnKind::from_caption("Net turnover"), ColumnKind::Text);
        assert_eq!(ColumnKind::from_caption("Store"), ColumnKind::Text);
    }

    #[test]
    fn last_matching_column_wins() {
        let payload = ReportPayload::new("t", "u")
            .column("a", "Turnover 2024")
            .column("b", "%")
            .column("c", "Turnover 2025");
        assert_eq!(payload.currency_column(), Some(2));
        assert_eq!(payload.percent_column(), Some(1));
    }

    #[test]
    fn no_special_columns() {
        let payload = ReportPayload::new("t", "u").column("a", "Store");
        assert_eq!(payload.currency_column(), None);
        assert_eq!(payload.percent_column(), None);
    }

    #[test]
    fn legend_line_joins_pairs() {
        let payload = ReportPayload::new("t", "u")
            .legend("Period", "Jan-2025")
            .legend("Region", "North");
        assert_eq!(payload.legend_line(), "Period: Jan-2025 | Region: North");
        assert_eq!(ReportPayload::new("t", "u").legend_line(), "");
    }

    #[test]
    fn cell_numeric_coercion() {
        assert_eq!(CellValue::from("1234.5").as_number(), Some(1234.5));
        assert_eq!(CellValue::from(" 10 ").as_number(), Some(10.0));
        assert_eq!(CellValue::from(6.4).as_number(), Some(6.4));
        assert_eq!(CellValue::from("n/a").as_number(), None);
        assert_eq!(CellValue::from("NaN").as_number(), None);
        assert_eq!(CellValue::from("inf").as_number(), None);
        assert_eq!(CellValue::from("").as_number(), None);
        assert_eq!(CellValue::from(true).as_number(), None);
    }

    #[test]
    fn cell_display() {
        assert_eq!(CellValue::from(200.0).to_string(), "200");
        assert_eq!(CellValue::from(100.5).to_string(), "100.5");
        assert_eq!(CellValue::from("A").to_string(), "A");
        assert_eq!(CellValue::Empty.to_string(), "");
        assert_eq!(CellValue::from(false).to_string(), "false");
    }

    #[test]
    fn missing_row_key_reads_empty() {
        let row = Row::new().cell("store", "A");
        assert_eq!(row.get("store"), &CellValue::Text("A".into()));
        assert!(row.get("amt").is_empty());
        assert_eq!(row.len(), 1);
    }

    #[test]
    fn logo_defaults_to_banner_size() {
        let logo = LogoAsset::new(vec![1, 2, 3]);
        assert_eq!((logo.width, logo.height), (278, 40));
        assert_eq!(logo.bytes(), &[1u8, 2, 3]);
        let logo = logo.size(100, 20);
        assert_eq!((logo.width, logo.height), (100, 20));
    }

    #[test]
    fn logo_from_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(LogoAsset::from_path(&dir.path().join("nope.png")).is_err());
    }

    #[test]
    fn error_classification() {
        assert!(ReportError::validation("Missing required key: 'rows'").is_client_error());
        assert!(!ReportError::unexpected("boom").is_client_error());
        assert_eq!(
            ReportError::unexpected("boom").to_string(),
            "Failed to generate report: boom"
        );
    }
}
