//! Projection of aligned source cells into the destination grid.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::aligner::{AlignedSet, RowKey};
use super::diagnostics::{Diagnostic, DiagnosticCode};
use super::grid::TemplateGrid;
use super::numeric::{loose_number, normalize_number, round_integer, strip_text};
use super::Lookups;
use crate::error::MergeError;
use crate::lookup::LookupOutcome;
use crate::models::config::{ColumnRef, MergeLayout, ReferenceColumns, Transform};
use crate::models::table::{CellValue, SourceTable};

lazy_static! {
    static ref NON_CYRILLIC: Regex = Regex::new(r"[^\p{Cyrillic}\s]").unwrap();
}

/// Keep only Cyrillic letters and collapse whitespace.
pub fn cyrillic_only(text: &str) -> String {
    NON_CYRILLIC
        .replace_all(text, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Customs code to display name association.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceTable {
    names: HashMap<String, String>,
}

impl ReferenceTable {
    /// Build from a headerless two-column association; later duplicates
    /// overwrite earlier ones.
    pub fn from_table(table: &SourceTable, columns: ReferenceColumns) -> Self {
        let mut names = HashMap::new();
        for row in 0..table.len() {
            let key = strip_text(table.cell(row, columns.key_column), &[]);
            if key.is_empty() {
                continue;
            }
            let name = strip_text(table.cell(row, columns.value_column), &[]);
            names.insert(key, name);
        }
        debug!("Reference table holds {} codes", names.len());
        Self { names }
    }

    /// Display name for `key`, empty names read as missing.
    pub fn name(&self, key: &str) -> Option<&str> {
        self.names
            .get(key.trim())
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Side products of a projection pass.
#[derive(Debug, Default)]
pub struct Projection {
    pub diagnostics: Vec<Diagnostic>,
    /// Provenance images by grid row.
    pub images: BTreeMap<u32, Vec<u8>>,
    /// Grid rows flagged for attention.
    pub highlighted: BTreeSet<u32>,
}

/// Applies the layout's field rules to every aligned row.
///
/// Each row's values are computed from source cells only and then written,
/// so rule order never matters.
pub struct FieldProjector<'a> {
    layout: &'a MergeLayout,
    reference: &'a ReferenceTable,
    lookups: &'a Lookups<'a>,
}

impl<'a> FieldProjector<'a> {
    pub fn new(layout: &'a MergeLayout, reference: &'a ReferenceTable, lookups: &'a Lookups<'a>) -> Self {
        Self {
            layout,
            reference,
            lookups,
        }
    }

    /// Project all rules over `aligned` into `grid`.
    ///
    /// A numeric cell that does not parse aborts the whole projection.
    pub fn project<G: TemplateGrid>(&self, aligned: &AlignedSet, grid: &mut G) -> Result<Projection, MergeError> {
        for rule in &self.layout.fields {
            aligned.check_column(rule.from.source, rule.from.column)?;
            if let Transform::Reference { fallback: Some(fallback) } = &rule.transform {
                aligned.check_column(fallback.source, fallback.column)?;
            }
        }

        let fits = u32::try_from(aligned.min_count())
            .ok()
            .and_then(|count| self.layout.origin_row.checked_add(count))
            .is_some();
        if !fits {
            return Err(MergeError::Layout(format!(
                "{} rows from origin row {} exceed the grid",
                aligned.min_count(),
                self.layout.origin_row
            )));
        }

        let mut projection = Projection::default();

        for row in aligned.rows() {
            let grid_row = self.layout.origin_row + row.index() as u32;
            let mut values = Vec::with_capacity(self.layout.fields.len());
            let mut highlight = false;

            for rule in &self.layout.fields {
                let cell = aligned.cell(row, rule.from.source, rule.from.column)?;
                let value = match &rule.transform {
                    Transform::Text { remove } => CellValue::text(strip_text(cell, remove)),
                    Transform::Number => CellValue::Number(parse_number(cell, rule.from, row, normalize_number)?),
                    Transform::LooseNumber => CellValue::Number(parse_number(cell, rule.from, row, loose_number)?),
                    Transform::Rounded => {
                        let n = parse_number(cell, rule.from, row, normalize_number)?;
                        CellValue::Number(round_integer(n, self.layout.rounding))
                    }
                    Transform::Reference { fallback } => {
                        let key = strip_text(cell, &[]);
                        match self.reference.name(&key) {
                            Some(name) => CellValue::text(name),
                            None => match fallback {
                                Some(fallback) => {
                                    let source = aligned.cell(row, fallback.source, fallback.column)?;
                                    let name = cyrillic_only(&source.display());
                                    highlight = true;
                                    projection.diagnostics.push(
                                        Diagnostic::new(
                                            DiagnosticCode::UnidentifiedItem,
                                            format!("no reference name for code {:?}; using {:?}", key, name),
                                        )
                                        .with_row(row.index()),
                                    );
                                    CellValue::text(name)
                                }
                                None => CellValue::Empty,
                            },
                        }
                    }
                    Transform::Provenance => {
                        let code = self.provenance(cell, row, grid_row, &mut projection);
                        CellValue::text(code)
                    }
                    Transform::Link => self.link(cell, row, &mut projection.diagnostics),
                };
                values.push((rule.target_column, value));
            }

            for (column, value) in values {
                grid.set_cell(grid_row, column, value);
            }
            if highlight {
                grid.highlight_row(grid_row);
                projection.highlighted.insert(grid_row);
            }
        }

        debug!(
            "Projected {} fields over {} rows",
            self.layout.fields.len(),
            aligned.min_count()
        );
        Ok(projection)
    }

    fn provenance(&self, cell: &CellValue, row: RowKey, grid_row: u32, projection: &mut Projection) -> String {
        let default = &self.lookups.default_provenance;
        let name = product_name(cell);
        if name.is_empty() {
            projection.diagnostics.push(
                Diagnostic::new(DiagnosticCode::ProvenanceDefaulted, "no product name for provenance lookup")
                    .with_row(row.index()),
            );
            return default.clone();
        }

        match self.lookups.provenance.lookup(&name) {
            Ok(LookupOutcome::Found(provenance)) => {
                if let Some(image) = provenance.image {
                    projection.images.insert(grid_row, image);
                }
                provenance.code
            }
            Ok(LookupOutcome::NotFound) => {
                projection.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::ProvenanceDefaulted,
                        format!("no provenance for {:?}; using {}", name, default),
                    )
                    .with_row(row.index()),
                );
                default.clone()
            }
            Err(e) => {
                warn!("Provenance lookup for {:?} failed: {}", name, e);
                projection.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::LookupFailed,
                        format!("provenance lookup for {:?} failed: {}; using {}", name, e, default),
                    )
                    .with_row(row.index()),
                );
                default.clone()
            }
        }
    }

    fn link(&self, cell: &CellValue, row: RowKey, diagnostics: &mut Vec<Diagnostic>) -> CellValue {
        let name = product_name(cell);
        if name.is_empty() {
            return CellValue::Empty;
        }

        match self.lookups.links.lookup(&name) {
            Ok(LookupOutcome::Found(url)) => CellValue::text(url),
            Ok(LookupOutcome::NotFound) => {
                diagnostics.push(
                    Diagnostic::new(DiagnosticCode::LinkNotFound, format!("no link for {:?}", name))
                        .with_row(row.index()),
                );
                CellValue::Empty
            }
            Err(e) => {
                warn!("Link lookup for {:?} failed: {}", name, e);
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::LookupFailed,
                        format!("link lookup for {:?} failed: {}", name, e),
                    )
                    .with_row(row.index()),
                );
                CellValue::Empty
            }
        }
    }
}

fn product_name(cell: &CellValue) -> String {
    strip_text(cell, &[]).split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_number(
    cell: &CellValue,
    from: ColumnRef,
    row: RowKey,
    parse: fn(&CellValue) -> Option<Decimal>,
) -> Result<Decimal, MergeError> {
    parse(cell).ok_or_else(|| MergeError::NumericParse {
        table: from.source,
        column: from.column,
        row: row.index(),
        value: cell.display(),
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::str::FromStr;

    use super::*;
    use crate::error::LookupError;
    use crate::lookup::{self, LinkLookup, NoLinks, NoProvenance, Provenance, ProvenanceLookup};
    use crate::merge::aligner::RowAligner;
    use crate::merge::grid::MemoryGrid;
    use crate::models::config::FieldRule;
    use crate::models::table::SourceId;
    use pretty_assertions::assert_eq;

    fn dec(s: &str) -> CellValue {
        CellValue::Number(Decimal::from_str(s).unwrap())
    }

    fn table(rows: &[&[&str]]) -> SourceTable {
        SourceTable::new(
            rows.iter()
                .map(|r| r.iter().map(|c| CellValue::from(*c)).collect())
                .collect(),
        )
    }

    fn aligned(tables: Vec<(SourceId, SourceTable)>) -> AlignedSet {
        let map: BTreeMap<_, _> = tables.into_iter().collect();
        RowAligner::new(Vec::new()).align(map).unwrap().0
    }

    fn layout(fields: Vec<FieldRule>) -> MergeLayout {
        MergeLayout {
            origin_row: 18,
            fields,
            derived: Vec::new(),
            ..MergeLayout::default()
        }
    }

    fn no_lookups() -> Lookups<'static> {
        Lookups::default()
    }

    #[test]
    fn test_cyrillic_only() {
        assert_eq!(cyrillic_only("Масло 500ml  оливковое, Olive"), "Масло оливковое");
        assert_eq!(cyrillic_only("Olive oil 500"), "");
    }

    #[test]
    fn test_reference_table_last_duplicate_wins() {
        let reference = table(&[
            &["", "", "Уксус", "2209"],
            &["", "", "Масло", "1509"],
            &["", "", "Масло оливковое", "1509"],
        ]);
        let reference = ReferenceTable::from_table(&reference, ReferenceColumns::default());

        assert_eq!(reference.len(), 2);
        assert_eq!(reference.name("1509"), Some("Масло оливковое"));
        assert_eq!(reference.name("9999"), None);
    }

    #[test]
    fn test_numeric_and_text_projection() {
        let pl = table(&[&["1", "Olive Kan ", "x", "2,5", "nan"], &["2", "Vinegar", "x", "", "4"]]);
        let set = aligned(vec![(SourceId::PackingList, pl)]);
        let layout = layout(vec![
            FieldRule::new(4, SourceId::PackingList, 1, Transform::Text { remove: vec!["Kan".to_string()] }),
            FieldRule::new(7, SourceId::PackingList, 4, Transform::Number),
            FieldRule::new(10, SourceId::PackingList, 3, Transform::Rounded),
        ]);
        let reference = ReferenceTable::default();
        let lookups = no_lookups();
        let mut grid = MemoryGrid::new();

        FieldProjector::new(&layout, &reference, &lookups)
            .project(&set, &mut grid)
            .unwrap();

        assert_eq!(grid.cell(18, 4), CellValue::from("Olive"));
        assert_eq!(grid.cell(18, 7), dec("0"));
        assert_eq!(grid.cell(19, 7), dec("4"));
        assert_eq!(grid.cell(18, 10), dec("3"));
        assert_eq!(grid.cell(19, 10), dec("0"));
        assert_eq!(grid.cell(20, 4), CellValue::Empty);
    }

    #[test]
    fn test_numeric_parse_failure_is_fatal() {
        let pl = table(&[&["1", "12"], &["2", "twelve"]]);
        let set = aligned(vec![(SourceId::PackingList, pl)]);
        let layout = layout(vec![FieldRule::new(7, SourceId::PackingList, 1, Transform::Number)]);
        let reference = ReferenceTable::default();
        let lookups = no_lookups();
        let mut grid = MemoryGrid::new();

        let err = FieldProjector::new(&layout, &reference, &lookups)
            .project(&set, &mut grid)
            .unwrap_err();

        match err {
            MergeError::NumericParse { table, column, row, value } => {
                assert_eq!(table, SourceId::PackingList);
                assert_eq!(column, 1);
                assert_eq!(row, 1);
                assert_eq!(value, "twelve");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_column_is_rejected() {
        let pl = table(&[&["1", "12"]]);
        let set = aligned(vec![(SourceId::PackingList, pl)]);
        let layout = layout(vec![FieldRule::new(7, SourceId::PackingList, 5, Transform::Number)]);
        let reference = ReferenceTable::default();
        let lookups = no_lookups();

        let err = FieldProjector::new(&layout, &reference, &lookups)
            .project(&set, &mut MemoryGrid::new())
            .unwrap_err();
        assert!(matches!(err, MergeError::MissingColumn { column: 5, .. }));
    }

    #[test]
    fn test_reference_fallback_highlights_row() {
        let invoice = table(&[&["1509"], &["7777"]]);
        let spec = table(&[&["Olive oil Масло оливковое"], &["Vinegar Уксус  винный 6%"]]);
        let set = aligned(vec![(SourceId::Invoice, invoice), (SourceId::Specification, spec)]);
        let layout = layout(vec![FieldRule::new(
            3,
            SourceId::Invoice,
            0,
            Transform::Reference {
                fallback: Some(ColumnRef::new(SourceId::Specification, 0)),
            },
        )]);
        let reference = ReferenceTable::from_table(
            &table(&[&["", "", "Масло", "1509"]]),
            ReferenceColumns::default(),
        );
        let lookups = no_lookups();
        let mut grid = MemoryGrid::new();

        let projection = FieldProjector::new(&layout, &reference, &lookups)
            .project(&set, &mut grid)
            .unwrap();

        assert_eq!(grid.cell(18, 3), CellValue::from("Масло"));
        assert_eq!(grid.cell(19, 3), CellValue::from("Уксус винный"));
        assert!(!grid.is_highlighted(18));
        assert!(grid.is_highlighted(19));
        assert_eq!(projection.highlighted.iter().copied().collect::<Vec<_>>(), vec![19]);
        assert_eq!(projection.diagnostics.len(), 1);
        assert_eq!(projection.diagnostics[0].code, DiagnosticCode::UnidentifiedItem);
        assert_eq!(projection.diagnostics[0].row, Some(1));
    }

    #[test]
    fn test_reference_without_fallback_is_empty() {
        let invoice = table(&[&["7777"]]);
        let set = aligned(vec![(SourceId::Invoice, invoice)]);
        let layout = layout(vec![FieldRule::new(
            3,
            SourceId::Invoice,
            0,
            Transform::Reference { fallback: None },
        )]);
        let reference = ReferenceTable::default();
        let lookups = no_lookups();
        let mut grid = MemoryGrid::new();

        let projection = FieldProjector::new(&layout, &reference, &lookups)
            .project(&set, &mut grid)
            .unwrap();

        assert_eq!(grid.cell(18, 3), CellValue::Empty);
        assert!(projection.highlighted.is_empty());
    }

    struct FixedProvenance;

    impl ProvenanceLookup for FixedProvenance {
        fn lookup(&self, name: &str) -> lookup::Result<LookupOutcome<Provenance>> {
            match name {
                "Olive oil" => Ok(LookupOutcome::Found(Provenance {
                    code: "IT".to_string(),
                    image: Some(vec![1, 2, 3]),
                })),
                "Broken" => Err(LookupError::Service("offline".to_string())),
                _ => Ok(LookupOutcome::NotFound),
            }
        }
    }

    struct RecordingLinks {
        seen: RefCell<Vec<String>>,
    }

    impl LinkLookup for RecordingLinks {
        fn lookup(&self, name: &str) -> lookup::Result<LookupOutcome<String>> {
            self.seen.borrow_mut().push(name.to_string());
            if name == "Olive oil" {
                Ok(LookupOutcome::Found("https://example.org/olive".to_string()))
            } else {
                Err(LookupError::Service("timeout".to_string()))
            }
        }
    }

    #[test]
    fn test_lookups_degrade_to_defaults() {
        let spec = table(&[&["Olive  oil"], &["Vinegar"], &["Broken"]]);
        let set = aligned(vec![(SourceId::Specification, spec)]);
        let layout = layout(vec![
            FieldRule::new(15, SourceId::Specification, 0, Transform::Provenance),
            FieldRule::new(16, SourceId::Specification, 0, Transform::Link),
        ]);
        let reference = ReferenceTable::default();
        let links = RecordingLinks { seen: RefCell::new(Vec::new()) };
        let lookups = Lookups {
            provenance: &FixedProvenance,
            links: &links,
            default_provenance: "EU".to_string(),
        };
        let mut grid = MemoryGrid::new();

        let projection = FieldProjector::new(&layout, &reference, &lookups)
            .project(&set, &mut grid)
            .unwrap();

        assert_eq!(grid.cell(18, 15), CellValue::from("IT"));
        assert_eq!(grid.cell(19, 15), CellValue::from("EU"));
        assert_eq!(grid.cell(20, 15), CellValue::from("EU"));
        assert_eq!(grid.cell(18, 16), CellValue::from("https://example.org/olive"));
        assert_eq!(grid.cell(19, 16), CellValue::Empty);
        assert_eq!(projection.images.get(&18), Some(&vec![1, 2, 3]));
        assert_eq!(links.seen.borrow().as_slice(), ["Olive oil", "Vinegar", "Broken"]);

        let codes: Vec<_> = projection.diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            vec![
                DiagnosticCode::ProvenanceDefaulted,
                DiagnosticCode::LookupFailed,
                DiagnosticCode::LookupFailed,
                DiagnosticCode::LookupFailed,
            ]
        );
    }

    #[test]
    fn test_projection_reads_sources_not_grid() {
        let pl = table(&[&["5"]]);
        let set = aligned(vec![(SourceId::PackingList, pl)]);
        let layout = layout(vec![
            FieldRule::new(1, SourceId::PackingList, 0, Transform::Number),
            FieldRule::new(2, SourceId::PackingList, 0, Transform::Text { remove: Vec::new() }),
        ]);
        let reference = ReferenceTable::default();
        let lookups = Lookups {
            provenance: &NoProvenance,
            links: &NoLinks,
            default_provenance: "EU".to_string(),
        };
        let mut grid = MemoryGrid::new();
        grid.set_cell(18, 1, CellValue::from("stale"));

        FieldProjector::new(&layout, &reference, &lookups)
            .project(&set, &mut grid)
            .unwrap();

        assert_eq!(grid.cell(18, 1), dec("5"));
        assert_eq!(grid.cell(18, 2), CellValue::from("5"));
    }
}
