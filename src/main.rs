//! Main entry point for the zip-manifest CLI application.
//!
//! Prints the manifest of a ZIP archive read from the local filesystem
//! or from an HTTP URL.

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use tokio::io::AsyncWriteExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use zip_manifest::{Cli, ManifestReader};

/// Application entry point.
///
/// Exits with status 1 when the archive holds no manifest, and reports
/// an error when it holds several competing ones.
#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let reader = ManifestReader::new(cli.file_name.clone()).with_http_options(cli.http_options());

    let content = if cli.is_http_url() {
        reader.read_url(&cli.file).await?
    } else {
        reader.read_path(&cli.file).await?
    };

    let Some(content) = content else {
        if !cli.quiet {
            eprintln!("No {} found in {}", reader.file_name(), cli.file);
        }
        return Ok(ExitCode::FAILURE);
    };

    match cli.output {
        Some(ref path) => {
            tokio::fs::write(path, &content)
                .await
                .with_context(|| format!("Failed to write {}", path))?;
            info!(path = %path, bytes = content.len(), "manifest written");
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&content).await?;
            stdout.flush().await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` takes precedence over the `-v`/`-q` flags.
fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
