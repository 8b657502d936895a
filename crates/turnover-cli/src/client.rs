//! Report service client
//!
//! Uploads a JSON file to a running report service and returns the
//! spreadsheet it answers with.

use std::path::Path;

use anyhow::{bail, Context, Result};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::header::CONTENT_DISPOSITION;
use tracing::info;

/// Hosted report endpoint
pub const DEFAULT_REPORT_URL: &str = "https://turnover-report-vbs.azurewebsites.net/report";

/// A report returned by the service
#[derive(Debug)]
pub struct ReportDownload {
    /// Filename suggested by the server, if any
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

/// POST `json_path` as the multipart field `file` and collect the response
pub fn post_report(url: &str, json_path: &Path) -> Result<ReportDownload> {
    let body = std::fs::read(json_path)
        .with_context(|| format!("JSON not found: {}", json_path.display()))?;

    let part = Part::bytes(body)
        .file_name("turnover.json")
        .mime_str("application/json")?;
    let form = Form::new().part("file", part);

    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("turnover-report/", env!("CARGO_PKG_VERSION")))
        .build()?;
    info!("posting {} to {url}", json_path.display());
    let response = client
        .post(url)
        .multipart(form)
        .send()
        .with_context(|| format!("Failed to reach {url}"))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().unwrap_or_default();
        bail!("HTTP {}: {}", status.as_u16(), text);
    }

    let filename = response
        .headers()
        .get(CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .and_then(attachment_filename);
    let bytes = response.bytes()?.to_vec();

    Ok(ReportDownload { filename, bytes })
}

/// Filename from a `Content-Disposition` header value.
///
/// Only the final path component is kept so a server cannot direct the
/// download outside the working directory.
pub fn attachment_filename(header: &str) -> Option<String> {
    let (_, rest) = header.split_once("filename=")?;
    let raw = rest.split(';').next()?.trim().trim_matches('"');
    let name = Path::new(raw).file_name()?.to_str()?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
