//! Best-effort external lookups used to enrich merged rows.
//!
//! Every lookup answers [`LookupOutcome::Found`] or [`LookupOutcome::NotFound`];
//! failures come back as [`LookupError`] and the caller picks the default.

mod provenance;

pub use provenance::{FolderProvenanceLookup, SidecarText, TextRecognizer, detect_origin};

use crate::error::LookupError;

/// Result type for lookups.
pub type Result<T> = std::result::Result<T, LookupError>;

/// Answer of a best-effort lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome<T> {
    Found(T),
    NotFound,
}

impl<T> LookupOutcome<T> {
    /// Convert into an `Option`.
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(v) => Some(v),
            Self::NotFound => None,
        }
    }
}

impl<T> From<Option<T>> for LookupOutcome<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Found(v),
            None => Self::NotFound,
        }
    }
}

/// Provenance of a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    /// Short provenance code, e.g. a country code.
    pub code: String,
    /// Encoded PNG thumbnail of a product photo.
    pub image: Option<Vec<u8>>,
}

/// Looks up provenance by product name.
pub trait ProvenanceLookup {
    fn lookup(&self, name: &str) -> Result<LookupOutcome<Provenance>>;
}

/// Looks up a reference URL by product name.
pub trait LinkLookup {
    fn lookup(&self, name: &str) -> Result<LookupOutcome<String>>;
}

/// Provenance lookup that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProvenance;

impl ProvenanceLookup for NoProvenance {
    fn lookup(&self, _name: &str) -> Result<LookupOutcome<Provenance>> {
        Ok(LookupOutcome::NotFound)
    }
}

/// Link lookup that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLinks;

impl LinkLookup for NoLinks {
    fn lookup(&self, _name: &str) -> Result<LookupOutcome<String>> {
        Ok(LookupOutcome::NotFound)
    }
}
