//! Purchase-invoice line-item reconstruction.
//!
//! Invoice PDFs carry their items as free text rather than as a table: one
//! fixed-format item line, optionally followed by a customs code line and
//! description continuation lines, with page furniture interleaved.

mod assembler;
mod classifier;
pub mod patterns;

pub use assembler::InvoiceAssembler;
pub use classifier::{LineClassifier, LineRole};
