//! Multi-source merge into a destination grid.
//!
//! A merge runs in three phases: the [`RowAligner`] reconciles row counts,
//! the [`FieldProjector`] writes every configured field from source cells,
//! and the [`DerivedFieldCalculator`] fills columns computed from projected
//! ones.

mod aligner;
mod derive;
mod diagnostics;
mod grid;
pub mod numeric;
mod projector;

pub use aligner::{AlignedSet, RowAligner, RowKey};
pub use derive::{combine, Derivation, DerivedFieldCalculator};
pub use diagnostics::{Diagnostic, DiagnosticCode};
pub use grid::{MemoryGrid, TemplateGrid};
pub use projector::{cyrillic_only, FieldProjector, Projection, ReferenceTable};

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use tracing::info;

use crate::error::MergeError;
use crate::lookup::{LinkLookup, NoLinks, NoProvenance, ProvenanceLookup};
use crate::models::config::MergeLayout;
use crate::models::table::{SourceId, SourceTable};

/// Result type for merge operations.
pub type Result<T> = std::result::Result<T, MergeError>;

/// External lookups consulted during projection.
pub struct Lookups<'a> {
    pub provenance: &'a dyn ProvenanceLookup,
    pub links: &'a dyn LinkLookup,
    /// Provenance code used whenever the lookup has no answer.
    pub default_provenance: String,
}

impl Default for Lookups<'static> {
    fn default() -> Self {
        Self {
            provenance: &NoProvenance,
            links: &NoLinks,
            default_provenance: "EU".to_string(),
        }
    }
}

/// Source tables of one merge.
#[derive(Debug, Clone, Default)]
pub struct MergeSources {
    pub invoice: SourceTable,
    pub packing_list: SourceTable,
    pub specification: SourceTable,
    /// Headerless customs code association.
    pub reference: SourceTable,
}

impl MergeSources {
    fn into_tables(self) -> (BTreeMap<SourceId, SourceTable>, SourceTable) {
        let mut tables = BTreeMap::new();
        tables.insert(SourceId::Invoice, self.invoice);
        tables.insert(SourceId::PackingList, self.packing_list);
        tables.insert(SourceId::Specification, self.specification);
        (tables, self.reference)
    }
}

/// What a merge produced besides the grid contents.
#[derive(Debug, Default)]
pub struct MergeOutcome {
    /// Number of aligned rows written.
    pub min_count: usize,
    /// First grid row written.
    pub origin_row: u32,
    pub diagnostics: Vec<Diagnostic>,
    /// Provenance images by grid row.
    pub images: BTreeMap<u32, Vec<u8>>,
    /// Grid rows flagged for attention.
    pub highlighted: BTreeSet<u32>,
}

impl MergeOutcome {
    /// Grid rows holding merged data.
    pub fn rows(&self) -> Range<u32> {
        let count = u32::try_from(self.min_count).unwrap_or(u32::MAX);
        self.origin_row..self.origin_row.saturating_add(count)
    }
}

/// Runs align, project and derive against a destination grid.
pub struct MergeEngine<'a> {
    layout: &'a MergeLayout,
    lookups: Lookups<'a>,
}

impl<'a> MergeEngine<'a> {
    pub fn new(layout: &'a MergeLayout, lookups: Lookups<'a>) -> Self {
        Self { layout, lookups }
    }

    /// Merge `sources` into `grid`.
    ///
    /// Any error leaves the grid partially written; callers must not
    /// deliver it.
    pub fn merge<G: TemplateGrid>(&self, sources: MergeSources, grid: &mut G) -> Result<MergeOutcome> {
        self.validate()?;

        let (tables, reference) = sources.into_tables();
        let reference = ReferenceTable::from_table(&reference, self.layout.reference);

        let (aligned, mut diagnostics) = RowAligner::new(self.layout.authoritative.clone()).align(tables)?;

        let projection = FieldProjector::new(self.layout, &reference, &self.lookups).project(&aligned, grid)?;
        diagnostics.extend(projection.diagnostics);

        let mut outcome = MergeOutcome {
            min_count: aligned.min_count(),
            origin_row: self.layout.origin_row,
            diagnostics,
            images: projection.images,
            highlighted: projection.highlighted,
        };

        let derivation =
            DerivedFieldCalculator::new(&self.layout.derived, self.layout.rounding).apply(grid, outcome.rows());
        let derived = derivation.written;
        outcome.diagnostics.extend(derivation.diagnostics);

        info!(
            "Merged {} rows from row {} ({} derived cells, {} diagnostics)",
            outcome.min_count,
            outcome.origin_row,
            derived,
            outcome.diagnostics.len()
        );
        Ok(outcome)
    }

    fn validate(&self) -> Result<()> {
        if self.layout.origin_row == 0 {
            return Err(MergeError::Layout("origin row is 1-based".to_string()));
        }
        let targets = self
            .layout
            .fields
            .iter()
            .map(|f| f.target_column)
            .chain(self.layout.derived.iter().map(|d| d.target_column));
        for column in targets {
            if column == 0 {
                return Err(MergeError::Layout("target columns are 1-based".to_string()));
            }
        }
        for rule in &self.layout.derived {
            if rule.left_column == 0 || rule.right_column == 0 {
                return Err(MergeError::Layout("derived operand columns are 1-based".to_string()));
            }
        }
        Ok(())
    }
}
