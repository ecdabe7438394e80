//! Batch conversion command for multiple PDF files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, warn};

use tradedoc_core::io::write_table;
use tradedoc_core::{Conversion, DocumentConverter};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern selecting the input PDFs
    #[arg(required = true)]
    input: String,

    /// Output directory (default: the configured table directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of converting a single file.
struct ConvertResult {
    path: PathBuf,
    kind: String,
    rows: usize,
    output: Option<PathBuf>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = super::load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("pdf"))
                .unwrap_or(false)
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to convert",
        style("ℹ").blue(),
        files.len()
    );

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| config.files.table_dir.clone());
    fs::create_dir_all(&output_dir)?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let converter = DocumentConverter::new(&config.extraction)?;
    let mut results = Vec::with_capacity(files.len());

    for path in files {
        let file_start = Instant::now();
        let result = convert_one(&converter, &path, &output_dir);
        let processing_time_ms = file_start.elapsed().as_millis() as u64;

        match result {
            Ok((kind, rows, output)) => results.push(ConvertResult {
                path,
                kind,
                rows,
                output,
                error: None,
                processing_time_ms,
            }),
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to convert {}: {}", path.display(), error_msg);
                    results.push(ConvertResult {
                        path,
                        kind: String::new(),
                        rows: 0,
                        output: None,
                        error: Some(error_msg),
                        processing_time_ms,
                    });
                } else {
                    error!("Failed to convert {}: {}", path.display(), error_msg);
                    anyhow::bail!("Conversion failed: {}", error_msg);
                }
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message("Complete");

    if args.summary {
        let summary_path = output_dir.join("summary.csv");
        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let converted = results.iter().filter(|r| r.output.is_some()).count();
    let empty = results
        .iter()
        .filter(|r| r.output.is_none() && r.error.is_none())
        .count();
    let failed = results.iter().filter(|r| r.error.is_some()).count();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!("  Converted: {}", style(converted).green());
    if empty > 0 {
        println!("  No tables: {}", style(empty).yellow());
    }
    if failed > 0 {
        println!("  Failed:    {}", style(failed).red());
        for result in results.iter().filter(|r| r.error.is_some()) {
            println!(
                "    {} {}: {}",
                style("✗").red(),
                result.path.display(),
                result.error.as_deref().unwrap_or_default()
            );
        }
    }

    Ok(())
}

fn convert_one(
    converter: &DocumentConverter,
    path: &Path,
    output_dir: &Path,
) -> anyhow::Result<(String, usize, Option<PathBuf>)> {
    let document = converter.convert_file(path)?;
    let kind = document.kind.to_string();

    match &document.conversion {
        Conversion::Extracted(table) => {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("table")
                .to_lowercase();
            let output = output_dir.join(format!("{}.csv", stem));
            write_table(&output, table)?;
            Ok((kind, table.len(), Some(output)))
        }
        Conversion::NothingFound => {
            warn!("No tables found in {}", path.display());
            Ok((kind, 0, None))
        }
    }
}

fn write_summary(path: &Path, results: &[ConvertResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record(["file", "kind", "status", "rows", "output", "error", "processing_time_ms"])?;

    for result in results {
        let status = match (&result.error, &result.output) {
            (Some(_), _) => "failed",
            (None, Some(_)) => "converted",
            (None, None) => "no_tables",
        };
        wtr.write_record([
            result.path.display().to_string(),
            result.kind.clone(),
            status.to_string(),
            result.rows.to_string(),
            result
                .output
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            result.error.clone().unwrap_or_default(),
            result.processing_time_ms.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
