//! Non-fatal merge diagnostics kept for operator visibility.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCode {
    /// Authoritative tables disagree on row count; extra rows were dropped.
    RowCountMismatch,
    /// No reference name for the row's key; a fallback name was used.
    UnidentifiedItem,
    /// Provenance lookup found nothing; the default code was used.
    ProvenanceDefaulted,
    /// Reference-link lookup found nothing.
    LinkNotFound,
    /// An external lookup failed and degraded to its default.
    LookupFailed,
    /// A derived value did not fit the decimal range; its cell was left empty.
    DerivedOverflow,
    /// The report table and the grid disagree on row count.
    ReportTruncated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub message: String,
    /// 0-based aligned row the diagnostic refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            row: None,
        }
    }

    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }
}
