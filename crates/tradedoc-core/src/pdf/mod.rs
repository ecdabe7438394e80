//! PDF processing module.

mod extractor;
mod tables;

pub use extractor::PdfExtractor;
pub use tables::TextTableDetector;

use crate::error::PdfError;
use crate::models::table::RawTable;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Trait for PDF processing implementations.
pub trait PdfProcessor {
    /// Load a PDF from bytes.
    fn load(&mut self, data: &[u8]) -> Result<()>;

    /// Get the number of pages in the PDF.
    fn page_count(&self) -> u32;

    /// Extract text from the entire PDF.
    fn extract_text(&self) -> Result<String>;

    /// Extract plain text per page, in page order.
    fn extract_page_texts(&self) -> Result<Vec<String>>;
}

/// Grid-like table extraction from one page.
pub trait PageTableSource {
    /// Tables found on a page, each as rows of positional cells.
    fn page_tables(&self, page_text: &str) -> Vec<RawTable>;
}

impl<T: PageTableSource + ?Sized> PageTableSource for &T {
    fn page_tables(&self, page_text: &str) -> Vec<RawTable> {
        (**self).page_tables(page_text)
    }
}
