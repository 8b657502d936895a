//! turnover CLI - Turnover Report Generator
//!
//! Command-line interface for validating turnover JSON payloads and
//! rendering them into styled Excel reports.

mod client;
mod logo;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use turnover_core::{Renderer, ReportPayload, REPORT_FILENAME};
use turnover_render::{ExcelRenderer, ReportTemplate};

use crate::logo::{resolve_logo, LogoConfig};

#[derive(Parser)]
#[command(name = "turnover")]
#[command(author, version, about = "Styled Excel turnover reports from JSON", long_about = None)]
struct Cli {
    /// Verbose output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a turnover JSON file into an Excel report
    Render {
        /// Input file path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output file path
        #[arg(short, long, default_value = REPORT_FILENAME)]
        output: PathBuf,

        /// Visual template
        #[arg(short, long, default_value = "branded", value_parser = ["branded", "classic"])]
        template: String,

        /// Logo image file
        #[arg(long, env = "LOGO_PATH")]
        logo: Option<PathBuf>,

        /// Logo image URL, downloaded once and cached
        #[arg(long, env = "LOGO_URL")]
        logo_url: Option<String>,

        /// Render without a logo
        #[arg(long)]
        no_logo: bool,
    },

    /// Validate a turnover JSON file without rendering it
    Check {
        /// Input file path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Upload a turnover JSON file to a report service and save the result
    Post {
        /// Input file path
        #[arg(value_name = "FILE", default_value = "turnover.json")]
        file: PathBuf,

        /// Report service endpoint
        #[arg(long, env = "TURNOVER_REPORT_URL", default_value = client::DEFAULT_REPORT_URL)]
        url: String,

        /// Output file, unless the service suggests a filename
        #[arg(short, long, default_value = REPORT_FILENAME)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    match cli.command {
        Commands::Render {
            file,
            output,
            template,
            logo,
            logo_url,
            no_logo,
        } => {
            let logo_config = (!no_logo).then(|| LogoConfig::new(logo, logo_url));
            cmd_render(&file, &output, &template, logo_config.as_ref())
        }
        Commands::Check { file, json } => cmd_check(&file, json),
        Commands::Post { file, url, output } => cmd_post(&file, &url, &output),
    }
}

fn read_payload(file: &Path) -> Result<ReportPayload> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    ReportPayload::from_json(&text).with_context(|| format!("Rejected {}", file.display()))
}

fn cmd_render(
    file: &Path,
    output: &Path,
    template: &str,
    logo_config: Option<&LogoConfig>,
) -> Result<()> {
    let payload = read_payload(file)?;
    let template = ReportTemplate::named(template)
        .with_context(|| format!("Unknown template: {template}"))?;

    let logo = logo_config.and_then(resolve_logo).map(|(_, asset)| asset);
    let renderer = ExcelRenderer::new().template(template);
    let bytes = renderer.render(&payload, logo.as_ref())?;

    std::fs::write(output, &bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Saved: {}", output.display());
    Ok(())
}

fn cmd_check(file: &Path, json: bool) -> Result<()> {
    let summary = read_payload(file)?.summary();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{}: OK", file.display());
    println!("  caption:  {}", summary.caption);
    println!("  columns:  {}", summary.columns);
    println!("  rows:     {}", summary.rows);
    match &summary.currency_column {
        Some(column) => println!("  currency: {} (totals row)", column.name),
        None => println!("  currency: none (no totals row)"),
    }
    match &summary.percent_column {
        Some(column) => println!("  percent:  {}", column.name),
        None => println!("  percent:  none"),
    }
    Ok(())
}

fn cmd_post(file: &Path, url: &str, output: &Path) -> Result<()> {
    let download = client::post_report(url, file)?;
    let target = download
        .filename
        .map(PathBuf::from)
        .unwrap_or_else(|| output.to_path_buf());

    std::fs::write(&target, &download.bytes)
        .with_context(|| format!("Failed to write {}", target.display()))?;
    let shown = std::fs::canonicalize(&target).unwrap_or(target);
    println!("Saved: {}", shown.display());
    Ok(())
}
