//! Configuration structures for extraction and merge.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::table::SourceId;
use crate::error::TradeDocError;

/// Main configuration for the tradedoc pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeDocConfig {
    /// Invoice line extraction vocabulary.
    pub extraction: ExtractionConfig,

    /// Destination grid layout for the merge.
    pub merge: MergeLayout,

    /// Provenance lookup configuration.
    pub provenance: ProvenanceConfig,

    /// Reference-link lookup configuration.
    pub links: LinkConfig,

    /// Report layout.
    pub report: ReportConfig,

    /// File locations.
    pub files: FilesConfig,
}

/// Invoice line extraction vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Line prefixes of administrative text to discard.
    pub noise_prefixes: Vec<String>,

    /// Line prefixes that extend the description of the open record.
    pub continuation_prefixes: Vec<String>,

    /// Label introducing a customs tariff code line.
    pub customs_label: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        let noise = [
            "Rechnung",
            "Kundennummer",
            "Rechnungsdatum",
            "Lieferdatum",
            "IBAN",
            "BIC",
            "UST-Id",
            "Zwischensumme",
            "Vortrag",
            "Seite",
            "Amtsgericht",
            "HRB",
            "GF:",
            "Gläubiger-ID",
            "www.",
            "http",
            "Eissing GmbH",
        ];
        Self {
            noise_prefixes: noise.iter().map(|s| s.to_string()).collect(),
            continuation_prefixes: ["EAN", "Art", "Hersteller"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            customs_label: "Zolltarif-Nr".to_string(),
        }
    }
}

/// Where a projected value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRef {
    /// Source table.
    pub source: SourceId,
    /// 0-based column in the source table.
    pub column: usize,
}

impl ColumnRef {
    pub fn new(source: SourceId, column: usize) -> Self {
        Self { source, column }
    }
}

/// How a source cell becomes a destination cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transform {
    /// Text with the listed markers removed and whitespace stripped.
    Text {
        #[serde(default)]
        remove: Vec<String>,
    },
    /// Comma-or-dot decimal; blank, `nan` and `None` read as zero.
    Number,
    /// Everything except digits and commas removed; no digit reads as zero.
    LooseNumber,
    /// [`Transform::Number`] rounded by the layout's rounding policy.
    Rounded,
    /// Reference-table name for the source cell used as key.
    Reference {
        /// Source of a display name when the key has no reference entry.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fallback: Option<ColumnRef>,
    },
    /// Provenance code for the product named by the source cell.
    Provenance,
    /// Reference link for the product named by the source cell.
    Link,
}

/// One projected destination column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    /// 1-based destination column.
    pub target_column: u32,
    /// Source cell.
    #[serde(flatten)]
    pub from: ColumnRef,
    /// Transform applied to the source cell.
    pub transform: Transform,
}

impl FieldRule {
    pub fn new(target_column: u32, source: SourceId, column: usize, transform: Transform) -> Self {
        Self {
            target_column,
            from: ColumnRef::new(source, column),
            transform,
        }
    }
}

/// Combinator for derived fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combinator {
    Sum,
    Product,
}

/// A destination column computed from two already-projected columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedRule {
    /// 1-based destination column to write.
    pub target_column: u32,
    /// First operand column.
    pub left_column: u32,
    /// Second operand column.
    pub right_column: u32,
    /// How the operands combine.
    pub combinator: Combinator,
}

/// Integer rounding policy for rounded and derived fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingPolicy {
    /// Nearest integer, ties away from zero (2.5 -> 3, -2.5 -> -3).
    #[default]
    HalfAwayFromZero,
    /// Ceiling for non-negative values, floor for negative ones.
    CeilAwayFromZero,
}

/// Columns of the two-column reference association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceColumns {
    /// 0-based key column (customs code).
    pub key_column: usize,
    /// 0-based value column (display name).
    pub value_column: usize,
}

impl Default for ReferenceColumns {
    fn default() -> Self {
        Self {
            key_column: 3,
            value_column: 2,
        }
    }
}

/// Destination grid layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeLayout {
    /// 1-based grid row receiving the first aligned row.
    pub origin_row: u32,

    /// Sources whose row counts decide the aligned row count.
    pub authoritative: Vec<SourceId>,

    /// Reference table columns.
    pub reference: ReferenceColumns,

    /// Projected fields.
    pub fields: Vec<FieldRule>,

    /// Derived fields, computed after all projections.
    pub derived: Vec<DerivedRule>,

    /// Rounding policy.
    pub rounding: RoundingPolicy,
}

impl Default for MergeLayout {
    fn default() -> Self {
        use SourceId::*;

        let name = ColumnRef::new(Specification, 1);
        Self {
            origin_row: 18,
            authoritative: vec![Specification, Invoice],
            reference: ReferenceColumns::default(),
            fields: vec![
                FieldRule::new(3, Invoice, 7, Transform::Reference { fallback: Some(name) }),
                FieldRule::new(4, PackingList, 1, Transform::Text { remove: vec!["Kan".to_string()] }),
                FieldRule::new(7, PackingList, 4, Transform::Number),
                FieldRule::new(8, PackingList, 3, Transform::Number),
                FieldRule::new(10, PackingList, 7, Transform::Rounded),
                FieldRule::new(11, PackingList, 8, Transform::Rounded),
                FieldRule::new(12, Specification, 4, Transform::LooseNumber),
                FieldRule::new(14, Invoice, 7, Transform::Text { remove: Vec::new() }),
                FieldRule::new(15, name.source, name.column, Transform::Provenance),
                FieldRule::new(16, name.source, name.column, Transform::Link),
            ],
            derived: vec![DerivedRule {
                target_column: 13,
                left_column: 8,
                right_column: 12,
                combinator: Combinator::Product,
            }],
            rounding: RoundingPolicy::default(),
        }
    }
}

/// Provenance lookup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvenanceConfig {
    /// Folder with one sub-folder of product photos per product.
    pub image_dir: Option<PathBuf>,

    /// Minimum similarity (0.0 - 1.0) between product and folder names.
    pub similarity_cutoff: f64,

    /// Code used when no confident match is found.
    pub default_code: String,

    /// Longest side of report thumbnails in pixels.
    pub thumbnail_size: u32,
}

impl Default for ProvenanceConfig {
    fn default() -> Self {
        Self {
            image_dir: None,
            similarity_cutoff: 0.6,
            default_code: "EU".to_string(),
            thumbnail_size: 256,
        }
    }
}

/// Reference-link lookup configuration.
///
/// No endpoint or key is built in; without an endpoint every lookup
/// degrades to "no link".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Search endpoint URL; the product name is sent as the `q` query
    /// parameter.
    pub endpoint: Option<String>,

    /// API key sent as a bearer token.
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: 10,
        }
    }
}

/// One report column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportColumn {
    /// Column heading.
    pub header: String,
    /// 1-based grid column.
    pub column: u32,
}

/// Report layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Report title.
    pub title: String,

    /// Grid columns shown in the report.
    pub columns: Vec<ReportColumn>,

    /// Row count of the report table, if it is fixed by the template.
    pub expected_rows: Option<usize>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        let columns = [
            ("Name", 3),
            ("Article", 4),
            ("Quantity", 8),
            ("Price", 12),
            ("Total", 13),
            ("Customs code", 14),
            ("Origin", 15),
            ("Link", 16),
        ];
        Self {
            title: "Description".to_string(),
            columns: columns
                .iter()
                .map(|(header, column)| ReportColumn {
                    header: header.to_string(),
                    column: *column,
                })
                .collect(),
            expected_rows: None,
        }
    }
}

/// File locations used by the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Directory receiving converted tables.
    pub table_dir: PathBuf,

    /// Destination grid template.
    pub template: PathBuf,

    /// Reference table (customs code to name).
    pub reference: PathBuf,

    /// Filled grid output.
    pub output: PathBuf,

    /// Report output.
    pub report: PathBuf,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            table_dir: PathBuf::from("tables"),
            template: PathBuf::from("templates/invoice_sell.xlsx"),
            reference: PathBuf::from("templates/reference.xlsx"),
            output: PathBuf::from("output/invoice_sell_filled.csv"),
            report: PathBuf::from("output/description.html"),
        }
    }
}

impl FilesConfig {
    /// Converted table path for a merge source.
    pub fn source_path(&self, source: SourceId) -> PathBuf {
        let name = match source {
            SourceId::Invoice => "invoice_purchase.csv",
            SourceId::PackingList => "pl.csv",
            SourceId::Specification => "specification_sell.csv",
        };
        self.table_dir.join(name)
    }
}

impl TradeDocConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| TradeDocError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| TradeDocError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
