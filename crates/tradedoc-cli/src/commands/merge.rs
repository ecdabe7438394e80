//! Merge command - fill the destination grid from converted tables.

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use tracing::{debug, info, warn};

use tradedoc_core::io::{load_grid, read_table, save_grid, HtmlReportWriter};
use tradedoc_core::lookup::{FolderProvenanceLookup, LinkLookup, NoLinks, NoProvenance, ProvenanceLookup};
use tradedoc_core::models::config::TradeDocConfig;
use tradedoc_core::{Diagnostic, Lookups, MergeEngine, MergeOutcome, MergeSources, SourceId};

use crate::links::HttpLinkLookup;

/// Arguments for the merge command.
#[derive(Args, Clone, Default)]
pub struct MergeArgs {
    /// Converted invoice table
    #[arg(long)]
    invoice: Option<PathBuf>,

    /// Converted packing list table
    #[arg(long)]
    packing_list: Option<PathBuf>,

    /// Converted specification table
    #[arg(long)]
    specification: Option<PathBuf>,

    /// Reference table (customs code to name)
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Destination grid template
    #[arg(long)]
    template: Option<PathBuf>,

    /// Filled grid output
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report output
    #[arg(long)]
    report: Option<PathBuf>,

    /// Skip the report
    #[arg(long)]
    no_report: bool,

    /// Product photo folder for provenance lookup
    #[arg(long)]
    images: Option<PathBuf>,

    /// Print diagnostics as JSON
    #[arg(long)]
    json: bool,
}

impl MergeArgs {
    pub fn json_output(&self) -> bool {
        self.json
    }
}

/// Paths of one merge run, resolved against the configuration.
pub struct MergePlan {
    invoice: PathBuf,
    packing_list: PathBuf,
    specification: PathBuf,
    reference: PathBuf,
    template: Option<PathBuf>,
    output: PathBuf,
    report: Option<PathBuf>,
    images: Option<PathBuf>,
}

impl MergePlan {
    pub fn resolve(args: &MergeArgs, config: &TradeDocConfig) -> Self {
        let files = &config.files;
        let template = args.template.clone().unwrap_or_else(|| files.template.clone());
        Self {
            invoice: args.invoice.clone().unwrap_or_else(|| files.source_path(SourceId::Invoice)),
            packing_list: args
                .packing_list
                .clone()
                .unwrap_or_else(|| files.source_path(SourceId::PackingList)),
            specification: args
                .specification
                .clone()
                .unwrap_or_else(|| files.source_path(SourceId::Specification)),
            reference: args.reference.clone().unwrap_or_else(|| files.reference.clone()),
            // A missing default template means an empty grid; an explicit one must exist
            template: if args.template.is_some() || template.exists() {
                Some(template)
            } else {
                None
            },
            output: args.output.clone().unwrap_or_else(|| files.output.clone()),
            report: if args.no_report {
                None
            } else {
                Some(args.report.clone().unwrap_or_else(|| files.report.clone()))
            },
            images: args.images.clone().or_else(|| config.provenance.image_dir.clone()),
        }
    }
}

pub async fn run(args: MergeArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let plan = MergePlan::resolve(&args, &config);

    let outcome = tokio::task::spawn_blocking(move || execute(&plan, &config)).await??;

    print_outcome(&outcome, args.json)?;
    Ok(())
}

/// Run a merge to completion. Blocks on file and network I/O.
pub fn execute(plan: &MergePlan, config: &TradeDocConfig) -> anyhow::Result<MergeOutcome> {
    let sources = MergeSources {
        invoice: read_source(&plan.invoice, "invoice", true)?,
        packing_list: read_source(&plan.packing_list, "packing list", true)?,
        specification: read_source(&plan.specification, "specification", true)?,
        reference: read_source(&plan.reference, "reference", false)?,
    };

    let mut grid = match &plan.template {
        Some(template) => load_grid(template)?,
        None => {
            warn!("No template found, filling an empty grid");
            Default::default()
        }
    };

    let provenance: Box<dyn ProvenanceLookup> = match &plan.images {
        Some(dir) => Box::new(FolderProvenanceLookup::open(dir, &config.provenance)),
        None => {
            debug!("No image folder configured, provenance defaults to {}", config.provenance.default_code);
            Box::new(NoProvenance)
        }
    };
    let links: Box<dyn LinkLookup> = match HttpLinkLookup::from_config(&config.links)? {
        Some(lookup) => Box::new(lookup),
        None => Box::new(NoLinks),
    };

    let lookups = Lookups {
        provenance: provenance.as_ref(),
        links: links.as_ref(),
        default_provenance: config.provenance.default_code.clone(),
    };

    let mut outcome = MergeEngine::new(&config.merge, lookups).merge(sources, &mut grid)?;

    save_grid(&plan.output, &grid)?;
    info!("Filled grid written to {}", plan.output.display());

    if let Some(report_path) = &plan.report {
        let report = HtmlReportWriter::new(&config.report).write(report_path, &grid, &outcome)?;
        outcome.diagnostics.extend(report.diagnostics);
    }

    Ok(outcome)
}

fn read_source(path: &Path, name: &str, has_header: bool) -> anyhow::Result<tradedoc_core::SourceTable> {
    if !path.exists() {
        anyhow::bail!("Missing {} table: {}", name, path.display());
    }
    Ok(read_table(path, has_header)?)
}

pub fn print_outcome(outcome: &MergeOutcome, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.diagnostics)?);
        return Ok(());
    }

    println!(
        "{} Merged {} rows into rows {}-{}",
        style("✓").green(),
        outcome.min_count,
        outcome.rows().start,
        outcome.rows().end.saturating_sub(1)
    );
    if !outcome.highlighted.is_empty() {
        println!(
            "{} {} rows without a reference name were highlighted",
            style("!").yellow(),
            outcome.highlighted.len()
        );
    }
    for diagnostic in &outcome.diagnostics {
        print_diagnostic(diagnostic);
    }
    Ok(())
}

fn print_diagnostic(diagnostic: &Diagnostic) {
    match diagnostic.row {
        Some(row) => eprintln!("  {} row {}: {}", style("⚠").yellow(), row + 1, diagnostic.message),
        None => eprintln!("  {} {}", style("⚠").yellow(), diagnostic.message),
    }
}
