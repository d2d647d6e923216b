//! Tablescan command-line interface.
//!
//! ```text
//! tablescan extract scan1.png scan2.jpg --output-dir out/
//! tablescan detect scan1.png --format json
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use tablescan::core::pipeline::document_name_for;
use tablescan::{
    CellSegmenter, DocumentInput, GridDetector, ImageDecoder, Orchestrator, Outcome, TablescanConfig, batch_process,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "tablescan")]
#[command(version, about = "Turn scanned tables into spreadsheets")]
struct Cli {
    /// Configuration file (.toml, .yaml or .json); defaults to a discovered tablescan.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract each image into `<name>_output.xlsx`
    Extract {
        /// Image files
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Directory for the spreadsheets (default: current directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Document name, only with a single image (default: file stem)
        #[arg(short, long)]
        name: Option<String>,

        /// Tesseract language, e.g. "eng" or "eng+deu"
        #[arg(short, long)]
        language: Option<String>,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Report the grid decision for each image without running OCR
    Detect {
        /// Image files
        #[arg(required = true)]
        images: Vec<PathBuf>,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Extract {
            images,
            output_dir,
            name,
            language,
            format,
        } => extract(config, images, output_dir, name, language, format).await,
        Command::Detect { images, format } => detect(&config, &images, format),
    }
}

fn load_config(path: Option<&Path>) -> Result<TablescanConfig> {
    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading configuration");
            TablescanConfig::from_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))
        }
        None => match TablescanConfig::discover().context("Failed to load discovered tablescan.toml")? {
            Some(config) => {
                tracing::info!("Using discovered tablescan.toml");
                Ok(config)
            }
            None => {
                tracing::debug!("No tablescan.toml found, using defaults");
                Ok(TablescanConfig::default())
            }
        },
    }
}

/// Document names for `images`; an explicit name only applies to a single image.
fn document_names(images: &[PathBuf], name: Option<String>) -> Result<Vec<String>> {
    match name {
        Some(name) if images.len() == 1 => Ok(vec![name]),
        Some(_) => bail!("--name can only be used with a single image"),
        None => Ok(images.iter().map(|path| document_name_for(path)).collect()),
    }
}

async fn extract(
    mut config: TablescanConfig,
    images: Vec<PathBuf>,
    output_dir: Option<PathBuf>,
    name: Option<String>,
    language: Option<String>,
    format: OutputFormat,
) -> Result<ExitCode> {
    if let Some(language) = language {
        config.ocr.language = language;
    }
    let names = document_names(&images, name)?;
    let output_dir = output_dir.unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let orchestrator = Arc::new(Orchestrator::from_config(config).context("Failed to set up the pipeline")?);

    let mut outcomes: Vec<Option<Outcome>> = vec![None; images.len()];
    let mut documents = Vec::new();
    let mut slots = Vec::new();
    for (index, (path, name)) in images.iter().zip(&names).enumerate() {
        match std::fs::read(path) {
            Ok(bytes) => {
                documents.push(DocumentInput::new(bytes, name.clone()));
                slots.push(index);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read image");
                outcomes[index] = Some(Outcome::error(format!("Failed to read {}: {}", path.display(), e)));
            }
        }
    }

    for (index, outcome) in slots.into_iter().zip(batch_process(orchestrator, documents).await) {
        outcomes[index] = Some(outcome);
    }

    let mut failed = false;
    let mut report = Vec::new();
    for ((path, outcome), name) in images.iter().zip(outcomes).zip(&names) {
        let outcome = outcome.unwrap_or_else(|| Outcome::error("Document was not processed"));
        let entry = match outcome {
            Outcome::Success {
                filename,
                spreadsheet,
                has_grid,
                ..
            } => {
                let target = output_dir.join(&filename);
                match std::fs::write(&target, &spreadsheet) {
                    Ok(()) => json!({
                        "input": path.display().to_string(),
                        "document": name,
                        "status": "success",
                        "output": target.display().to_string(),
                        "has_grid": has_grid,
                    }),
                    Err(e) => {
                        failed = true;
                        tracing::warn!(output = %target.display(), error = %e, "Failed to write spreadsheet");
                        json!({
                            "input": path.display().to_string(),
                            "document": name,
                            "status": "error",
                            "message": format!("Failed to write {}: {}", target.display(), e),
                        })
                    }
                }
            }
            Outcome::NoTextExtracted => json!({
                "input": path.display().to_string(),
                "document": name,
                "status": "no_text",
            }),
            Outcome::Error { message } => {
                failed = true;
                tracing::warn!(input = %path.display(), %message, "Document failed");
                json!({
                    "input": path.display().to_string(),
                    "document": name,
                    "status": "error",
                    "message": message,
                })
            }
        };
        report.push(entry);
    }

    tracing::info!(
        documents = report.len(),
        succeeded = report.iter().filter(|e| e["status"] == "success").count(),
        "Batch finished"
    );

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            for entry in &report {
                let input = entry["input"].as_str().unwrap_or_default();
                match entry["status"].as_str() {
                    Some("success") => println!(
                        "{}: wrote {} ({})",
                        input,
                        entry["output"].as_str().unwrap_or_default(),
                        if entry["has_grid"].as_bool() == Some(true) {
                            "table"
                        } else {
                            "text lines"
                        }
                    ),
                    Some("no_text") => println!("{}: no text extracted", input),
                    _ => println!("{}: error: {}", input, entry["message"].as_str().unwrap_or_default()),
                }
            }
        }
    }

    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

fn detect(config: &TablescanConfig, images: &[PathBuf], format: OutputFormat) -> Result<ExitCode> {
    config.validate()?;
    let detector = GridDetector::new(config.grid.clone());
    let segmenter = CellSegmenter::new(config.grid.clone(), config.segmentation.clone());

    let mut failed = false;
    let mut report = Vec::new();
    for path in images {
        let analysis = std::fs::read(path)
            .map_err(tablescan::TablescanError::from)
            .and_then(|bytes| ImageDecoder::decode(&bytes))
            .and_then(|image| {
                let analysis = detector.analyze(&image)?;
                let cells = if analysis.has_grid {
                    Some(segmenter.segment(&image)?)
                } else {
                    None
                };
                Ok((analysis, cells))
            });

        let entry = match analysis {
            Ok((analysis, grid)) => json!({
                "input": path.display().to_string(),
                "has_grid": analysis.has_grid,
                "horizontal_lines": analysis.horizontal_count(),
                "vertical_lines": analysis.vertical_count(),
                "rows": grid.as_ref().map(|g| g.row_count()),
                "columns": grid.as_ref().map(|g| g.column_count()),
                "cells": grid.as_ref().map(|g| g.cell_count()),
            }),
            Err(e) => {
                failed = true;
                tracing::warn!(input = %path.display(), error = %e, "Detection failed");
                json!({
                    "input": path.display().to_string(),
                    "error": e.to_string(),
                })
            }
        };
        report.push(entry);
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            for entry in &report {
                let input = entry["input"].as_str().unwrap_or_default();
                if let Some(error) = entry["error"].as_str() {
                    println!("{}: error: {}", input, error);
                    continue;
                }
                println!(
                    "{}: grid={} horizontal={} vertical={} cells={}",
                    input,
                    entry["has_grid"],
                    entry["horizontal_lines"],
                    entry["vertical_lines"],
                    entry["cells"].as_u64().unwrap_or(0)
                );
            }
        }
    }

    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}
