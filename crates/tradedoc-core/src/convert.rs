//! PDF document to source table conversion, selected by file name.

use std::fmt;
use std::path::Path;
use std::time::Instant;

use tracing::{debug, info};

use crate::error::{ExtractionError, Result};
use crate::invoice::{InvoiceAssembler, LineClassifier};
use crate::models::config::ExtractionConfig;
use crate::models::record::records_to_table;
use crate::models::table::{SourceId, SourceTable};
use crate::pdf::{PdfExtractor, PdfProcessor, TextTableDetector};
use crate::tabular::{TableFilters, TabularExtractor};

/// Document family, decided from the submitted file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Purchase invoice; rows are reconstructed from text lines.
    Invoice,
    /// Specification; page tables keep only indexed rows.
    Specification,
    /// Packing list; page tables lose their first and last row.
    PackingList,
    /// Anything else; page tables are kept as found.
    Generic,
}

impl DocumentKind {
    /// Kind for a file name; only the final path component counts and case is
    /// ignored.
    pub fn from_file_name(name: &str) -> Self {
        let file = Path::new(name)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or(name)
            .to_lowercase();
        match file.as_str() {
            "invoice_purchase.pdf" => Self::Invoice,
            "specification_sell.pdf" => Self::Specification,
            "pl.pdf" => Self::PackingList,
            _ => Self::Generic,
        }
    }

    /// Post-filters for tabular extraction.
    pub fn filters(self) -> TableFilters {
        TableFilters {
            filter_spec: self == Self::Specification,
            remove_edges: self == Self::PackingList,
        }
    }

    /// Merge source this document feeds, if any.
    pub fn source(self) -> Option<SourceId> {
        match self {
            Self::Invoice => Some(SourceId::Invoice),
            Self::Specification => Some(SourceId::Specification),
            Self::PackingList => Some(SourceId::PackingList),
            Self::Generic => None,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Invoice => "invoice",
            Self::Specification => "specification",
            Self::PackingList => "packing list",
            Self::Generic => "generic",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for DocumentKind {
    type Err = ExtractionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "invoice" => Ok(Self::Invoice),
            "specification" | "spec" => Ok(Self::Specification),
            "packing-list" | "packing_list" | "pl" => Ok(Self::PackingList),
            "generic" => Ok(Self::Generic),
            _ => Err(ExtractionError::UnknownKind(s.to_string())),
        }
    }
}

/// Outcome of converting one document.
#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    /// A table with at least one row.
    Extracted(SourceTable),
    /// Nothing table-like was found; not an error.
    NothingFound,
}

impl Conversion {
    pub fn table(&self) -> Option<&SourceTable> {
        match self {
            Self::Extracted(table) => Some(table),
            Self::NothingFound => None,
        }
    }
}

/// A converted document.
#[derive(Debug, Clone)]
pub struct ConvertedDocument {
    pub kind: DocumentKind,
    pub conversion: Conversion,
    pub page_count: u32,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Converts PDF documents into source tables.
pub struct DocumentConverter {
    assembler: InvoiceAssembler,
    detector: TextTableDetector,
}

impl DocumentConverter {
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        Ok(Self {
            assembler: InvoiceAssembler::new(LineClassifier::new(config)?),
            detector: TextTableDetector::new(),
        })
    }

    /// Replace the page table detector.
    pub fn with_detector(mut self, detector: TextTableDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Convert page texts of a document of `kind`.
    ///
    /// Invoices yield reconstructed line items under the invoice header;
    /// every other kind yields page tables under positional headers.
    pub fn convert_pages<S: AsRef<str>>(&self, kind: DocumentKind, pages: &[S]) -> Conversion {
        let table = match kind {
            DocumentKind::Invoice => records_to_table(&self.assembler.assemble_pages(pages)),
            _ => {
                let mut table = TabularExtractor::new(&self.detector, kind.filters()).extract_pages(pages);
                table.header = Some(table.header_or_positional());
                table
            }
        };

        if table.is_empty() {
            debug!("No rows found in {} document", kind);
            Conversion::NothingFound
        } else {
            Conversion::Extracted(table)
        }
    }

    /// Convert a PDF held in memory.
    pub fn convert(&self, kind: DocumentKind, data: &[u8]) -> Result<ConvertedDocument> {
        let start = Instant::now();

        let mut pdf = PdfExtractor::new();
        pdf.load(data)?;
        let pages = pdf.extract_page_texts()?;
        let conversion = self.convert_pages(kind, &pages);

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Converted {} document: {} rows from {} pages in {}ms",
            kind,
            conversion.table().map(SourceTable::len).unwrap_or(0),
            pdf.page_count(),
            processing_time_ms
        );

        Ok(ConvertedDocument {
            kind,
            conversion,
            page_count: pdf.page_count(),
            processing_time_ms,
        })
    }

    /// Convert a PDF file, choosing the kind from its file name.
    pub fn convert_file(&self, path: &Path) -> Result<ConvertedDocument> {
        let kind = DocumentKind::from_file_name(&path.to_string_lossy());
        let data = std::fs::read(path)?;
        self.convert(kind, &data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::table::CellValue;
    use pretty_assertions::assert_eq;

    fn converter() -> DocumentConverter {
        DocumentConverter::new(&ExtractionConfig::default()).unwrap()
    }

    #[test]
    fn test_kind_from_file_name() {
        assert_eq!(DocumentKind::from_file_name("Invoice_Purchase.PDF"), DocumentKind::Invoice);
        assert_eq!(DocumentKind::from_file_name("in/specification_sell.pdf"), DocumentKind::Specification);
        assert_eq!(DocumentKind::from_file_name("PL.pdf"), DocumentKind::PackingList);
        assert_eq!(DocumentKind::from_file_name("pl_old.pdf"), DocumentKind::Generic);
        assert_eq!(DocumentKind::PackingList.source(), Some(SourceId::PackingList));
        assert_eq!(DocumentKind::Generic.source(), None);
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("pl".parse::<DocumentKind>().unwrap(), DocumentKind::PackingList);
        assert!("receipt".parse::<DocumentKind>().is_err());
    }

    #[test]
    fn test_invoice_pages_across_page_break() {
        let pages = [
            "Rechnung 4711\n1 100 Olivenöl extra 10 Stk./6 Fl 9,10 91,00\nEAN 4001234567890",
            "Seite 2 von 3\nZolltarif-Nr.: 15091020\n2 200 Essig 5 Stk. / 12 St 2,00 10,00",
            "Zwischensumme 101,00",
        ];

        let Conversion::Extracted(table) = converter().convert_pages(DocumentKind::Invoice, &pages) else {
            panic!("expected rows");
        };

        assert_eq!(table.len(), 2);
        assert_eq!(table.header.as_ref().unwrap()[7], "CustomsCode");
        assert_eq!(table.cell(0, 2), &CellValue::from("Olivenöl extra EAN 4001234567890"));
        assert_eq!(table.cell(0, 7), &CellValue::from("15091020"));
        assert_eq!(table.cell(1, 2), &CellValue::from("Essig"));
        assert!(!table.rows.iter().flatten().any(|c| c.display().contains("Seite")));
    }

    #[test]
    fn test_packing_list_pages_get_positional_header() {
        let pages = ["Nr  Artikel  Menge\n1  Olivenöl  10\n2  Essig  4\nSumme  14  kg"];

        let Conversion::Extracted(table) = converter().convert_pages(DocumentKind::PackingList, &pages) else {
            panic!("expected rows");
        };

        assert_eq!(table.header, Some(vec!["0".to_string(), "1".to_string(), "2".to_string()]));
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, 1), &CellValue::from("Essig"));
    }

    #[test]
    fn test_nothing_found() {
        let pages = ["Sehr geehrte Damen und Herren"];
        assert_eq!(
            converter().convert_pages(DocumentKind::Generic, &pages),
            Conversion::NothingFound
        );
        assert_eq!(
            converter().convert_pages(DocumentKind::Invoice, &pages),
            Conversion::NothingFound
        );
    }

    #[test]
    fn test_invalid_pdf_is_an_error() {
        assert!(converter().convert(DocumentKind::Generic, b"not a pdf").is_err());
    }
}
