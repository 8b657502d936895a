//! Excel turnover report renderer
//!
//! Generates a single-sheet XLSX file with a fixed layout:
//!
//! ```text
//! Row 1  | 2025-01-01 09:00 alice                       (banner)  [logo]
//! Row 2  | Turnover Report                              (title)
//! Row 3  | Period: Jan-2025 | Region: North             (legend)
//! Row 4  |                                              (spacer)
//! Row 5  | Store | Turnover EUR |    %                 (header, filter buttons)
//! Row 6  | A     |       100.50 | 10.0%
//! Row 7  | B     |       200.00 | 20.0%
//! Row 8  | Total |      =SUM(…) | =SUM(…)              (only with a currency column)
//! ```
//!
//! ## Column Types
//!
//! Columns are classified by caption (see [`ColumnKind`]):
//! - **Currency** values are coerced to numbers and shown as `#,##0.00`
//! - **Percent** values are entered on a 0-100 scale and stored divided by
//!   100, shown as `0.0%`
//! - Everything else is written as given
//!
//! Values that are not numeric are written verbatim in either numeric column,
//! without a number format.
//!
//! Rows 1-5 are frozen. The rendered bytes are read back before being
//! returned (see [`crate::verify`]).

use rust_xlsxwriter::{
    Format, FormatAlign, FormatBorder, Image, Table, TableColumn, Workbook, Worksheet, XlsxError,
};
use serde_json::Value;
use tracing::{debug, info, warn};
use turnover_core::{CellValue, ColumnKind, LogoAsset, ReportError, ReportPayload, Renderer};

use crate::template::{FilterStyle, ReportTemplate};
use crate::verify::verify_workbook;

/// Banner row (date/time and user)
pub const BANNER_ROW: u32 = 0;
/// Title row, also the logo anchor row
pub const TITLE_ROW: u32 = 1;
/// Legend row
pub const LEGEND_ROW: u32 = 2;
/// Empty spacer row
pub const SPACER_ROW: u32 = 3;
/// Column caption row
pub const HEADER_ROW: u32 = 4;
/// First data row; panes are frozen here
pub const FIRST_DATA_ROW: u32 = 5;
/// Logo column (H) for reports wide enough to reach it
pub const LOGO_COLUMN: u16 = 7;

const CURRENCY_FORMAT: &str = "#,##0.00";
const PERCENT_FORMAT: &str = "0.0%";
const MAX_COLUMN_WIDTH: f64 = 255.0;
/// Longest string a worksheet cell holds
pub const MAX_CELL_CHARS: usize = 32_767;

/// Excel turnover report renderer
#[derive(Clone, Debug)]
pub struct ExcelRenderer {
    /// Visual template
    pub template: ReportTemplate,
    /// Worksheet name
    pub sheet_name: String,
    /// Name of the table object (table filter style only)
    pub table_name: String,
}

impl Default for ExcelRenderer {
    fn default() -> Self {
        Self {
            template: ReportTemplate::default(),
            sheet_name: "Report".into(),
            table_name: "TurnoverTable".into(),
        }
    }
}

impl ExcelRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different visual template
    pub fn template(mut self, template: ReportTemplate) -> Self {
        self.template = template;
        self
    }

    /// Set the worksheet name
    pub fn sheet_name(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = name.into();
        self
    }

    /// Validate a parsed JSON document and render it
    pub fn render_value(
        &self,
        value: &Value,
        logo: Option<&LogoAsset>,
    ) -> Result<Vec<u8>, ReportError> {
        let payload = ReportPayload::from_value(value)?;
        self.render(&payload, logo)
    }

    /// Generate Excel workbook bytes
    pub fn render_to_bytes(
        &self,
        payload: &ReportPayload,
        logo: Option<&LogoAsset>,
    ) -> Result<Vec<u8>, ReportError> {
        let layout = ReportLayout::new(payload)?;
        let formats = self.create_formats();
        let mut workbook = Workbook::new();

        let sheet = workbook.add_worksheet();
        sheet.set_name(&self.sheet_name).map_err(format_error)?;

        self.write_title_block(sheet, payload, &layout, &formats)?;
        self.write_header(sheet, payload, &formats)?;
        self.write_data_rows(sheet, payload, &layout, &formats)?;
        self.write_totals(sheet, &layout, &formats)?;
        self.set_column_widths(sheet, payload, &layout)?;
        self.add_filter(sheet, payload, &layout, &formats)?;
        sheet
            .set_freeze_panes(FIRST_DATA_ROW, 0)
            .map_err(format_error)?;

        if let Some(logo) = logo {
            self.insert_logo(sheet, logo, &layout);
        }

        let buffer = workbook.save_to_buffer().map_err(format_error)?;
        verify_workbook(&buffer, &self.sheet_name, HEADER_ROW, &payload.captions())?;

        info!(
            columns = layout.column_count,
            rows = layout.row_count,
            bytes = buffer.len(),
            "rendered turnover report"
        );
        Ok(buffer)
    }

    /// Create reusable formats
    fn create_formats(&self) -> ReportFormats {
        let t = &self.template;

        let banner = Format::new()
            .set_bold()
            .set_background_color(t.banner_fill)
            .set_align(FormatAlign::Left)
            .set_align(FormatAlign::VerticalCenter);

        let mut title = Format::new()
            .set_bold()
            .set_font_size(t.title_font_size)
            .set_align(FormatAlign::Left)
            .set_align(FormatAlign::VerticalCenter);
        if let Some(color) = t.title_color {
            title = title.set_font_color(color);
        }

        let legend = Format::new()
            .set_italic()
            .set_align(FormatAlign::Left)
            .set_align(FormatAlign::VerticalCenter);

        let header = Format::new()
            .set_bold()
            .set_font_color(t.header_font_color)
            .set_background_color(t.header_fill)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Thin)
            .set_border_color(t.border_color);

        // Data cells: thin side borders, every other row banded when the
        // banding is not provided by a table style
        let side_borders = Format::new()
            .set_border_left(FormatBorder::Thin)
            .set_border_left_color(t.border_color)
            .set_border_right(FormatBorder::Thin)
            .set_border_right_color(t.border_color);
        let banded = if t.filter == FilterStyle::AutoFilter {
            side_borders.clone().set_background_color(t.band_fill)
        } else {
            side_borders.clone()
        };
        let text = [side_borders.clone(), banded.clone()];
        let currency = [
            side_borders.clone().set_num_format(CURRENCY_FORMAT),
            banded.clone().set_num_format(CURRENCY_FORMAT),
        ];
        let percent = [
            side_borders.set_num_format(PERCENT_FORMAT),
            banded.set_num_format(PERCENT_FORMAT),
        ];

        // Totals row: thick rule on top, thin everywhere else
        let total_cell = Format::new()
            .set_border(FormatBorder::Thin)
            .set_border_color(t.border_color)
            .set_border_top(FormatBorder::Thick)
            .set_border_top_color(t.totals_border_color);
        let total_label = total_cell.clone().set_bold();
        let total_currency = total_label.clone().set_num_format(CURRENCY_FORMAT);
        let total_percent = total_label.clone().set_num_format(PERCENT_FORMAT);

        ReportFormats {
            banner,
            title,
            legend,
            header,
            text,
            currency,
            percent,
            total_cell,
            total_label,
            total_currency,
            total_percent,
        }
    }

    /// Rows 1-3: banner, title, legend; row 4 spacer
    fn write_title_block(
        &self,
        sheet: &mut Worksheet,
        payload: &ReportPayload,
        layout: &ReportLayout,
        formats: &ReportFormats,
    ) -> Result<(), ReportError> {
        let legend = payload.legend_line();
        let lines = [
            (BANNER_ROW, payload.date_time_user.as_str(), &formats.banner, self.template.banner_height),
            (TITLE_ROW, payload.caption.as_str(), &formats.title, self.template.title_height),
            (LEGEND_ROW, legend.as_str(), &formats.legend, None),
        ];

        for (row, text, format, height) in lines {
            check_cell_length(text, || format!("row {}", row + 1))?;
            if self.template.merge_banner && layout.last_col > 0 {
                sheet
                    .merge_range(row, 0, row, layout.last_col, text, format)
                    .map_err(format_error)?;
            } else {
                // A one-cell merge is not a valid merge range
                write_text(sheet, row, 0, text, format)?;
            }
            if let Some(height) = height {
                sheet.set_row_height(row, height).map_err(format_error)?;
            }
        }

        if let Some(height) = self.template.spacer_height {
            sheet.set_row_height(SPACER_ROW, height).map_err(format_error)?;
        }

        Ok(())
    }

    /// Row 5: column captions
    fn write_header(
        &self,
        sheet: &mut Worksheet,
        payload: &ReportPayload,
        formats: &ReportFormats,
    ) -> Result<(), ReportError> {
        for (col, column) in payload.columns.iter().enumerate() {
            check_cell_length(&column.caption, || format!("caption of column '{}'", column.name))?;
            write_text(sheet, HEADER_ROW, col as u16, &column.caption, &formats.header)?;
        }
        if let Some(height) = self.template.header_height {
            sheet.set_row_height(HEADER_ROW, height).map_err(format_error)?;
        }
        Ok(())
    }

    fn write_data_rows(
        &self,
        sheet: &mut Worksheet,
        payload: &ReportPayload,
        layout: &ReportLayout,
        formats: &ReportFormats,
    ) -> Result<(), ReportError> {
        for (index, row) in payload.rows.iter().enumerate() {
            let sheet_row = FIRST_DATA_ROW + index as u32;
            let band = index % 2;

            for (col, column) in payload.columns.iter().enumerate() {
                let col = col as u16;
                let value = row.get(&column.name);
                if let CellValue::Text(text) = value {
                    check_cell_length(text, || {
                        format!("data row {} column '{}'", index + 1, column.name)
                    })?;
                }

                match (layout.kind(col), value.as_number()) {
                    (ColumnKind::Percent, Some(n)) => {
                        sheet
                            .write_number_with_format(sheet_row, col, n / 100.0, &formats.percent[band])
                            .map_err(format_error)?;
                    }
                    (ColumnKind::Currency, Some(n)) => {
                        sheet
                            .write_number_with_format(sheet_row, col, n, &formats.currency[band])
                            .map_err(format_error)?;
                    }
                    _ => write_value(sheet, sheet_row, col, value, &formats.text[band])?,
                }
            }
        }
        Ok(())
    }

    /// Totals row below the data, present only with a currency column
    fn write_totals(
        &self,
        sheet: &mut Worksheet,
        layout: &ReportLayout,
        formats: &ReportFormats,
    ) -> Result<(), ReportError> {
        let Some(currency_col) = layout.currency_col else {
            debug!("no currency column, totals row skipped");
            return Ok(());
        };
        let row = layout.totals_row();

        for col in 0..layout.column_count {
            sheet
                .write_blank(row, col, &formats.total_cell)
                .map_err(format_error)?;
        }

        // Label sits left of the currency column; with the currency column
        // first, the sum below takes the cell over
        let label_col = currency_col.saturating_sub(1);
        sheet
            .write_string_with_format(row, label_col, "Total", &formats.total_label)
            .map_err(format_error)?;

        sheet
            .write_formula_with_format(
                row,
                currency_col,
                layout.sum_formula(currency_col).as_str(),
                &formats.total_currency,
            )
            .map_err(format_error)?;

        if let Some(percent_col) = layout.percent_col {
            sheet
                .write_formula_with_format(
                    row,
                    percent_col,
                    layout.sum_formula(percent_col).as_str(),
                    &formats.total_percent,
                )
                .map_err(format_error)?;
        }

        Ok(())
    }

    /// Size each column to the wider of its caption and its longest
    /// displayed value
    fn set_column_widths(
        &self,
        sheet: &mut Worksheet,
        payload: &ReportPayload,
        layout: &ReportLayout,
    ) -> Result<(), ReportError> {
        for (col, column) in payload.columns.iter().enumerate() {
            let col = col as u16;
            let kind = layout.kind(col);
            let content = payload
                .rows
                .iter()
                .map(|row| display_text(kind, row.get(&column.name)).chars().count())
                .max()
                .unwrap_or(0);
            let chars = column.caption.chars().count().max(content);
            let width = (chars as f64 + self.template.width_padding).min(MAX_COLUMN_WIDTH);
            sheet.set_column_width(col, width).map_err(format_error)?;
        }
        Ok(())
    }

    /// Filter buttons on the header row and banding over the data rows
    fn add_filter(
        &self,
        sheet: &mut Worksheet,
        payload: &ReportPayload,
        layout: &ReportLayout,
        formats: &ReportFormats,
    ) -> Result<(), ReportError> {
        let last_row = layout.filter_last_row();
        let captions = payload.captions();

        if self.template.filter == FilterStyle::Table {
            if layout.row_count > 0 && table_headers_usable(&captions) {
                let columns: Vec<TableColumn> = captions
                    .iter()
                    .map(|caption| {
                        TableColumn::new()
                            .set_header(*caption)
                            .set_header_format(formats.header.clone())
                    })
                    .collect();
                let table = Table::new()
                    .set_name(&self.table_name)
                    .set_style(self.template.table_style.clone())
                    .set_columns(&columns);
                sheet
                    .add_table(HEADER_ROW, 0, last_row, layout.last_col, &table)
                    .map_err(format_error)?;
                return Ok(());
            }
            debug!(
                rows = layout.row_count,
                "table needs data rows and distinct single-line captions, using auto-filter"
            );
        }

        sheet
            .autofilter(HEADER_ROW, 0, last_row, layout.last_col)
            .map_err(format_error)?;
        Ok(())
    }

    /// Place the logo on the title row. Failures only cost the logo.
    fn insert_logo(&self, sheet: &mut Worksheet, logo: &LogoAsset, layout: &ReportLayout) {
        let image = match Image::new_from_buffer(logo.bytes()) {
            Ok(image) => image.set_scale_to_size(logo.width, logo.height, false),
            Err(e) => {
                warn!("logo not added: {e}");
                return;
            }
        };

        let col = logo_column(layout.column_count);
        match sheet.insert_image(TITLE_ROW, col, &image) {
            Ok(_) => debug!(col, "logo added"),
            Err(e) => warn!("logo not added: {e}"),
        }
    }
}

impl Renderer for ExcelRenderer {
    type Output = Vec<u8>;

    fn render(
        &self,
        payload: &ReportPayload,
        logo: Option<&LogoAsset>,
    ) -> Result<Vec<u8>, ReportError> {
        if payload.columns.is_empty() {
            return Err(ReportError::validation("No columns provided."));
        }
        self.render_to_bytes(payload, logo)
    }
}

/// Column positions derived from the payload
struct ReportLayout {
    column_count: u16,
    last_col: u16,
    row_count: u32,
    currency_col: Option<u16>,
    percent_col: Option<u16>,
}

impl ReportLayout {
    fn new(payload: &ReportPayload) -> Result<Self, ReportError> {
        let column_count = u16::try_from(payload.columns.len())
            .map_err(|_| ReportError::validation("Too many columns."))?;
        if column_count == 0 {
            return Err(ReportError::validation("No columns provided."));
        }
        let row_count = u32::try_from(payload.rows.len())
            .map_err(|_| ReportError::validation("Too many rows."))?;

        // Both indices fit: they are below column_count
        let currency_col = payload.currency_column().map(|i| i as u16);
        let percent_col = payload.percent_column().map(|i| i as u16);
        debug!(?currency_col, ?percent_col, "column layout");

        Ok(Self {
            column_count,
            last_col: column_count - 1,
            row_count,
            currency_col,
            percent_col,
        })
    }

    fn kind(&self, col: u16) -> ColumnKind {
        if self.percent_col == Some(col) {
            ColumnKind::Percent
        } else if self.currency_col == Some(col) {
            ColumnKind::Currency
        } else {
            ColumnKind::Text
        }
    }

    /// Totals row, directly below the last data row
    fn totals_row(&self) -> u32 {
        FIRST_DATA_ROW + self.row_count
    }

    /// Last row of the filter region; the header row alone without data
    fn filter_last_row(&self) -> u32 {
        HEADER_ROW + self.row_count
    }

    /// `SUM` over a column's data rows.
    ///
    /// Without data rows the range is the header cell, which sums to zero
    /// and does not reference the totals cell itself.
    fn sum_formula(&self, col: u16) -> String {
        let letter = col_to_letter(col);
        let (first, last) = if self.row_count == 0 {
            (HEADER_ROW + 1, HEADER_ROW + 1)
        } else {
            (FIRST_DATA_ROW + 1, FIRST_DATA_ROW + self.row_count)
        };
        format!("=SUM({letter}{first}:{letter}{last})")
    }
}

/// Reusable Excel formats
struct ReportFormats {
    banner: Format,
    title: Format,
    legend: Format,
    header: Format,
    // Data formats indexed by band (even, odd)
    text: [Format; 2],
    currency: [Format; 2],
    percent: [Format; 2],
    total_cell: Format,
    total_label: Format,
    total_currency: Format,
    total_percent: Format,
}

fn format_error(e: XlsxError) -> ReportError {
    ReportError::unexpected(e.to_string())
}

/// Reject text longer than a cell can hold, naming where it came from
fn check_cell_length(text: &str, location: impl FnOnce() -> String) -> Result<(), ReportError> {
    let chars = text.chars().count();
    if chars > MAX_CELL_CHARS {
        return Err(ReportError::validation(format!(
            "Value at {} has {chars} characters; a cell holds at most {MAX_CELL_CHARS}.",
            location()
        )));
    }
    Ok(())
}

fn write_text(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    text: &str,
    format: &Format,
) -> Result<(), ReportError> {
    if text.is_empty() {
        sheet.write_blank(row, col, format).map_err(format_error)?;
    } else {
        sheet
            .write_string_with_format(row, col, text, format)
            .map_err(format_error)?;
    }
    Ok(())
}

/// Write a value as given
fn write_value(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
    format: &Format,
) -> Result<(), ReportError> {
    match value {
        CellValue::Empty => write_text(sheet, row, col, "", format),
        CellValue::Text(s) => write_text(sheet, row, col, s, format),
        CellValue::Number(n) => sheet
            .write_number_with_format(row, col, *n, format)
            .map(|_| ())
            .map_err(format_error),
        CellValue::Bool(b) => sheet
            .write_boolean_with_format(row, col, *b, format)
            .map(|_| ())
            .map_err(format_error),
    }
}

/// Text a cell shows once its number format is applied
fn display_text(kind: ColumnKind, value: &CellValue) -> String {
    match (kind, value.as_number()) {
        (ColumnKind::Percent, Some(n)) => format!("{n:.1}%"),
        (ColumnKind::Currency, Some(n)) => group_thousands(n, 2),
        _ => value.to_string(),
    }
}

/// Format like `#,##0.00`: fixed decimals with comma-grouped thousands
fn group_thousands(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(fixed.len() + int_part.len() / 3 + 1);
    if value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        grouped.push('-');
    }
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if let Some(frac_part) = frac_part {
        grouped.push('.');
        grouped.push_str(frac_part);
    }
    grouped
}

/// Whether `bytes` is an image format the workbook can embed
pub fn is_embeddable_image(bytes: &[u8]) -> bool {
    Image::new_from_buffer(bytes).is_ok()
}

/// Logo column: H, or the first column right of the banner on narrower reports
fn logo_column(column_count: u16) -> u16 {
    column_count.min(LOGO_COLUMN)
}

/// A table needs distinct, non-empty, single-line column names.
///
/// Table column names are stored as XML attributes, where a carriage return
/// does not survive; the header cell would then disagree with its column.
fn table_headers_usable(captions: &[&str]) -> bool {
    let mut seen = std::collections::HashSet::new();
    captions.iter().all(|caption| {
        !caption.trim().is_empty()
            && !caption.contains(['\r', '\n'])
            && seen.insert(caption.to_lowercase())
    })
}

/// Convert column number to Excel letter (0 -> A, 25 -> Z, 26 -> AA)
fn col_to_letter(col: u16) -> String {
    let mut result = String::new();
    let mut n = col as u32;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}
