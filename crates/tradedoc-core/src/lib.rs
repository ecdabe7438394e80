//! Core library for trade document processing.
//!
//! This crate provides:
//! - PDF text extraction and whitespace-column table detection
//! - Purchase-invoice line-item reconstruction from free text
//! - Tabular extraction with specification and packing-list filters
//! - Row-aligned merge of several source tables into a destination grid
//! - Provenance lookup over product photo folders
//! - CSV/workbook table I/O and an HTML description report

pub mod convert;
pub mod error;
pub mod invoice;
pub mod io;
pub mod lookup;
pub mod merge;
pub mod models;
pub mod pdf;
pub mod tabular;

pub use convert::{Conversion, ConvertedDocument, DocumentConverter, DocumentKind};
pub use error::{Result, TradeDocError};
pub use invoice::{InvoiceAssembler, LineClassifier, LineRole};
pub use lookup::{LinkLookup, LookupOutcome, Provenance, ProvenanceLookup};
pub use merge::{Diagnostic, DiagnosticCode, Lookups, MemoryGrid, MergeEngine, MergeOutcome, MergeSources, TemplateGrid};
pub use models::config::TradeDocConfig;
pub use models::record::{ItemRecord, RawLine};
pub use models::table::{CellValue, SourceId, SourceTable};
pub use pdf::{PdfExtractor, PdfProcessor};
pub use tabular::{TableFilters, TabularExtractor};
