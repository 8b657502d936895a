//! # turnover-render
//!
//! Excel rendering backend for turnover reports.
//!
//! This crate provides:
//! - `ExcelRenderer`: payload to styled single-sheet XLSX bytes
//! - `ReportTemplate`: the visual constants (colors, fonts, filter style)
//! - `verify`: read-back check applied to every rendered workbook
//!
//! ## Example
//!
//! ```rust,ignore
//! use turnover_core::{LogoAsset, Renderer, ReportPayload};
//! use turnover_render::{ExcelRenderer, ReportTemplate};
//!
//! let payload = ReportPayload::from_json(&std::fs::read_to_string("turnover.json")?)?;
//! let logo = LogoAsset::from_path("logo.png".as_ref()).ok();
//!
//! let renderer = ExcelRenderer::new().template(ReportTemplate::branded());
//! let xlsx_bytes = renderer.render(&payload, logo.as_ref())?;
//! std::fs::write("turnover-report.xlsx", xlsx_bytes)?;
//! ```

pub mod excel;
pub mod template;
pub mod verify;

pub use excel::{is_embeddable_image, ExcelRenderer};
pub use template::{FilterStyle, ReportTemplate};
