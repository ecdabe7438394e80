//! Process command - convert a submitted PDF and run the merge.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use tradedoc_core::io::write_table;
use tradedoc_core::{Conversion, DocumentConverter};

use super::extract::{convert, default_output, row_count};
use super::merge::{self, MergeArgs, MergePlan};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Submitted PDF; its file name selects how it is converted
    #[arg(required = true)]
    input: PathBuf,

    /// Only convert, do not merge
    #[arg(long)]
    convert_only: bool,

    #[command(flatten)]
    merge: MergeArgs,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = super::load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {msg}")?
            .progress_chars("##-"),
    );

    pb.set_message("Converting PDF...");
    pb.set_position(10);

    let converter = DocumentConverter::new(&config.extraction)?;
    let document = convert(&converter, &args.input, None)?;

    let Conversion::Extracted(table) = &document.conversion else {
        pb.abandon_with_message("No tables found");
        anyhow::bail!("Could not extract tables from {}", args.input.display());
    };

    let table_path = match document.kind.source() {
        Some(source) => config.files.source_path(source),
        None => default_output(&config, &args.input),
    };
    write_table(&table_path, table)?;

    pb.set_position(50);
    pb.println(format!(
        "{} {} converted as {} ({} rows) to {}",
        style("✓").green(),
        args.input.display(),
        document.kind,
        row_count(&document),
        table_path.display()
    ));

    if args.convert_only {
        pb.finish_and_clear();
        return Ok(());
    }

    pb.set_message("Merging tables...");
    pb.set_position(60);

    let plan = MergePlan::resolve(&args.merge, &config);
    let json = args.merge.json_output();
    let outcome = tokio::task::spawn_blocking(move || merge::execute(&plan, &config)).await??;

    pb.set_position(100);
    pb.finish_and_clear();

    merge::print_outcome(&outcome, json)?;
    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}
