//! Visual template for turnover reports
//!
//! Colors, fonts, row heights and the filter style are data. The renderer
//! reads them from a `ReportTemplate` instead of branching per variant.

use std::fmt;

use rust_xlsxwriter::TableStyle;

/// How the header/data region gets its filter buttons and row banding
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterStyle {
    /// Worksheet auto-filter; banding is painted as alternating row fills
    AutoFilter,
    /// Native Excel table bound to the header/data range
    Table,
}

/// Style constants for the fixed report layout
#[derive(Clone)]
pub struct ReportTemplate {
    /// Merge banner, title and legend across all report columns
    pub merge_banner: bool,
    /// Row 1 fill
    pub banner_fill: u32,
    /// Title font size in points
    pub title_font_size: f64,
    /// Title font color (`None` keeps the default)
    pub title_color: Option<u32>,
    /// Header band fill
    pub header_fill: u32,
    /// Header band font color
    pub header_font_color: u32,
    /// Thin border color for header, data and totals cells
    pub border_color: u32,
    /// Thick border color above the totals row
    pub totals_border_color: u32,
    /// Fill for every other data row (auto-filter style only)
    pub band_fill: u32,
    /// Table style (table filter style only)
    pub table_style: TableStyle,
    pub filter: FilterStyle,
    pub banner_height: Option<f64>,
    pub title_height: Option<f64>,
    pub spacer_height: Option<f64>,
    pub header_height: Option<f64>,
    /// Characters added to the widest value of each column
    pub width_padding: f64,
}

// `TableStyle` has no `Debug` impl
impl fmt::Debug for ReportTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportTemplate")
            .field("merge_banner", &self.merge_banner)
            .field("banner_fill", &format_args!("{:06X}", self.banner_fill))
            .field("title_font_size", &self.title_font_size)
            .field("title_color", &self.title_color.map(|c| format!("{c:06X}")))
            .field("header_fill", &format_args!("{:06X}", self.header_fill))
            .field("header_font_color", &format_args!("{:06X}", self.header_font_color))
            .field("border_color", &format_args!("{:06X}", self.border_color))
            .field("totals_border_color", &format_args!("{:06X}", self.totals_border_color))
            .field("band_fill", &format_args!("{:06X}", self.band_fill))
            .field("filter", &self.filter)
            .field("banner_height", &self.banner_height)
            .field("title_height", &self.title_height)
            .field("spacer_height", &self.spacer_height)
            .field("header_height", &self.header_height)
            .field("width_padding", &self.width_padding)
            .finish_non_exhaustive()
    }
}

impl Default for ReportTemplate {
    fn default() -> Self {
        Self::branded()
    }
}

impl ReportTemplate {
    /// Merged yellow banner, blue title, light-blue header band, auto-filter
    pub fn branded() -> Self {
        Self {
            merge_banner: true,
            banner_fill: 0xFFFF00,
            title_font_size: 16.0,
            title_color: Some(0x1F4E78),
            header_fill: 0xDDEBF7,
            header_font_color: 0x000000,
            border_color: 0x9E9E9E,
            totals_border_color: 0x000000,
            band_fill: 0xF2F7FC,
            table_style: TableStyle::Medium9,
            filter: FilterStyle::AutoFilter,
            banner_height: Some(22.0),
            title_height: Some(20.0),
            spacer_height: Some(6.0),
            header_height: Some(20.0),
            width_padding: 5.0,
        }
    }

    /// Single-cell banner, dark-blue header with white text, native table
    pub fn classic() -> Self {
        Self {
            merge_banner: false,
            title_font_size: 14.0,
            title_color: None,
            header_fill: 0x4F81BD,
            header_font_color: 0xFFFFFF,
            filter: FilterStyle::Table,
            banner_height: None,
            title_height: None,
            spacer_height: None,
            header_height: None,
            width_padding: 2.0,
            ..Self::branded()
        }
    }

    /// Look up a preset by name
    pub fn named(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "branded" => Some(Self::branded()),
            "classic" => Some(Self::classic()),
            _ => None,
        }
    }

    pub fn filter(mut self, filter: FilterStyle) -> Self {
        self.filter = filter;
        self
    }
}
