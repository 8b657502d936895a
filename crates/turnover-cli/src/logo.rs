//! Logo resolution
//!
//! The renderer only takes an already loaded image. This module finds one,
//! trying in order:
//! 1. the configured path (`--logo` / `LOGO_PATH`)
//! 2. a cached download of the configured URL (`--logo-url` / `LOGO_URL`),
//!    fetched once and reused from the cache directory afterwards
//! 3. `logo.png` next to the executable
//!
//! Every failure along the way is logged and skipped; a report without a
//! logo is still a report.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use turnover_core::LogoAsset;
use turnover_render::is_embeddable_image;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Where to look for a logo
#[derive(Clone, Debug, Default)]
pub struct LogoConfig {
    /// Explicitly configured image file
    pub path: Option<PathBuf>,
    /// Image URL, downloaded into `cache_dir` on first use
    pub url: Option<String>,
    pub cache_dir: PathBuf,
    /// Fallback shipped with the binary
    pub bundled: Option<PathBuf>,
}

impl LogoConfig {
    /// Configuration with the default cache directory and bundled logo
    pub fn new(path: Option<PathBuf>, url: Option<String>) -> Self {
        Self {
            path,
            url,
            cache_dir: default_cache_dir(),
            bundled: bundled_logo_path(),
        }
    }
}

/// Where a resolved logo came from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogoSource {
    Configured(PathBuf),
    Cached(PathBuf),
    Bundled(PathBuf),
}

impl LogoSource {
    pub fn path(&self) -> &Path {
        match self {
            LogoSource::Configured(path) | LogoSource::Cached(path) | LogoSource::Bundled(path) => {
                path.as_path()
            }
        }
    }
}

/// `<user cache dir>/turnover-report`, or the temp dir when there is none
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("turnover-report")
}

/// `logo.png` beside the running executable
pub fn bundled_logo_path() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    Some(exe.parent()?.join("logo.png"))
}

/// Cache file for a logo URL, named after the URL's SHA-256
pub fn cached_logo_path(url: &str, cache_dir: &Path) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    cache_dir.join(format!("logo-{}", &digest[..16]))
}

/// Find and load the first available logo
pub fn resolve_logo(config: &LogoConfig) -> Option<(LogoSource, LogoAsset)> {
    if let Some(path) = &config.path {
        if let Some(found) = load(LogoSource::Configured(path.clone())) {
            return Some(found);
        }
    }

    if let Some(url) = &config.url {
        match fetch_cached(url, &config.cache_dir) {
            Ok(path) => {
                if let Some(found) = load(LogoSource::Cached(path)) {
                    return Some(found);
                }
            }
            Err(e) => warn!("Failed to download logo from {url}: {e:#}"),
        }
    }

    if let Some(path) = &config.bundled {
        if let Some(found) = load(LogoSource::Bundled(path.clone())) {
            return Some(found);
        }
    }

    info!("No logo found, skipping");
    None
}

fn load(source: LogoSource) -> Option<(LogoSource, LogoAsset)> {
    let path = source.path();
    if !path.is_file() {
        debug!("no logo at {}", path.display());
        return None;
    }
    match LogoAsset::from_path(path) {
        Ok(asset) => {
            info!("Logo added from {}", path.display());
            Some((source, asset))
        }
        Err(e) => {
            warn!("Logo not readable at {}: {e}", path.display());
            None
        }
    }
}

/// Return the cached copy of `url`, downloading it first if needed.
///
/// A cache entry that is not an embeddable image is discarded and fetched
/// again.
fn fetch_cached(url: &str, cache_dir: &Path) -> Result<PathBuf> {
    let path = cached_logo_path(url, cache_dir);
    if path.is_file() {
        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if is_embeddable_image(&bytes) {
            debug!("cached logo at {}", path.display());
            return Ok(path);
        }
        warn!("Discarding unusable cached logo at {}", path.display());
        std::fs::remove_file(&path)
            .with_context(|| format!("Failed to remove {}", path.display()))?;
    }

    let client = reqwest::blocking::Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .user_agent(concat!("turnover-report/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let bytes = client.get(url).send()?.error_for_status()?.bytes()?;

    store_logo(&bytes, &path)?;
    info!("Downloaded logo from URL to {}", path.display());
    Ok(path)
}

/// Write downloaded logo bytes to `path` if they are an embeddable image.
///
/// The bytes go to a temporary file in the same directory first and are
/// renamed into place, so `path` never holds a partial download.
fn store_logo(bytes: &[u8], path: &Path) -> Result<()> {
    if !is_embeddable_image(bytes) {
        bail!("Downloaded logo is not a PNG, JPEG, GIF or BMP image");
    }

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create a temporary file in {}", dir.display()))?;
    file.write_all(bytes)?;
    file.persist(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
