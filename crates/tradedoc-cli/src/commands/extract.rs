//! Extract command - convert a single PDF into a table.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use tracing::info;

use tradedoc_core::io::write_table;
use tradedoc_core::models::config::TradeDocConfig;
use tradedoc_core::{Conversion, ConvertedDocument, DocumentConverter, DocumentKind, SourceTable};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: <table_dir>/<name>.csv, or stdout for json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Document kind (invoice, specification, pl, generic); default from file name
    #[arg(short, long)]
    kind: Option<DocumentKind>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "csv")]
    format: TableFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum TableFormat {
    /// CSV with a header record
    Csv,
    /// JSON table
    Json,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let converter = DocumentConverter::new(&config.extraction)?;
    let document = convert(&converter, &args.input, args.kind)?;

    let Conversion::Extracted(table) = &document.conversion else {
        anyhow::bail!("No tables found in {}", args.input.display());
    };

    match args.format {
        TableFormat::Csv => {
            let output = args
                .output
                .unwrap_or_else(|| default_output(&config, &args.input));
            write_table(&output, table)?;
            println!(
                "{} {} rows ({}) written to {}",
                style("✓").green(),
                table.len(),
                document.kind,
                output.display()
            );
        }
        TableFormat::Json => {
            let json = serde_json::to_string_pretty(table)?;
            match &args.output {
                Some(path) => {
                    fs::write(path, json)?;
                    println!("{} Output written to {}", style("✓").green(), path.display());
                }
                None => println!("{}", json),
            }
        }
    }

    Ok(())
}

/// Convert `input`, with an explicit kind overriding the file name hint.
pub fn convert(
    converter: &DocumentConverter,
    input: &Path,
    kind: Option<DocumentKind>,
) -> anyhow::Result<ConvertedDocument> {
    let document = match kind {
        Some(kind) => converter.convert(kind, &fs::read(input)?)?,
        None => converter.convert_file(input)?,
    };
    info!(
        "{}: {} document, {} pages, {}ms",
        input.display(),
        document.kind,
        document.page_count,
        document.processing_time_ms
    );
    Ok(document)
}

/// `<table_dir>/<lowercase stem>.csv`, the name merge sources are read from.
pub fn default_output(config: &TradeDocConfig, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table")
        .to_lowercase();
    config.files.table_dir.join(format!("{}.csv", stem))
}

/// Row count for display.
pub fn row_count(document: &ConvertedDocument) -> usize {
    document.conversion.table().map(SourceTable::len).unwrap_or(0)
}
