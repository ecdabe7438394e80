//! Invoice line records reconstructed from PDF text.

use serde::{Deserialize, Serialize};

use super::table::{CellValue, Row, SourceTable};

/// Column headers of a converted invoice table.
pub const INVOICE_HEADER: [&str; 8] = [
    "№",
    "Code",
    "Description",
    "Quantity",
    "Unit/Volume",
    "PricePerUnit",
    "TotalPrice",
    "CustomsCode",
];

/// A single trimmed, non-empty line of extracted PDF text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    /// Line text without surrounding whitespace.
    pub text: String,
    /// 1-indexed page the line came from.
    pub page: u32,
    /// Position of the line across the whole document.
    pub ordinal: usize,
}

impl RawLine {
    /// Split page texts into ordered lines, dropping blank ones.
    pub fn from_pages<S: AsRef<str>>(pages: &[S]) -> Vec<RawLine> {
        let mut lines = Vec::new();
        for (idx, page) in pages.iter().enumerate() {
            for text in page.as_ref().lines().map(str::trim).filter(|l| !l.is_empty()) {
                lines.push(RawLine {
                    text: text.to_string(),
                    page: idx as u32 + 1,
                    ordinal: lines.len(),
                });
            }
        }
        lines
    }
}

/// Fields captured from an item-start line, kept as raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFields {
    /// Sequence number.
    pub sequence: String,
    /// Article code.
    pub code: String,
    /// Description fragment from the item line itself.
    pub description: String,
    /// Quantity.
    pub quantity: String,
    /// Unit/volume token, e.g. `Stk. / 6 Fl`.
    pub unit: String,
    /// Unit price, possibly with an `/alt-price` suffix.
    pub unit_price: String,
    /// Total price.
    pub total_price: String,
}

/// A reconstructed invoice line.
///
/// Numeric fields keep the document's own decimal separator; normalization
/// happens when the record is projected into a destination grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Sequence number.
    pub sequence: String,
    /// Article code.
    pub code: String,
    /// Description, including continuation lines.
    pub description: String,
    /// Quantity.
    pub quantity: String,
    /// Unit/volume token.
    pub unit: String,
    /// Unit price.
    pub unit_price: String,
    /// Total price.
    pub total_price: String,
    /// Customs tariff code, if annotated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customs_code: Option<String>,
}

impl ItemRecord {
    /// Seed a record from the captured item-start fields.
    pub fn open(fields: ItemFields) -> Self {
        Self {
            sequence: fields.sequence,
            code: fields.code,
            description: fields.description,
            quantity: fields.quantity,
            unit: fields.unit,
            unit_price: fields.unit_price,
            total_price: fields.total_price,
            customs_code: None,
        }
    }

    /// Positional row in [`INVOICE_HEADER`] order.
    pub fn to_row(&self) -> Row {
        vec![
            CellValue::text(self.sequence.as_str()),
            CellValue::text(self.code.as_str()),
            CellValue::text(self.description.as_str()),
            CellValue::text(self.quantity.as_str()),
            CellValue::text(self.unit.as_str()),
            CellValue::text(self.unit_price.as_str()),
            CellValue::text(self.total_price.as_str()),
            CellValue::from(self.customs_code.clone()),
        ]
    }
}

/// Build the invoice source table from reconstructed records.
pub fn records_to_table(records: &[ItemRecord]) -> SourceTable {
    SourceTable::with_header(
        INVOICE_HEADER.iter().map(|h| h.to_string()).collect(),
        records.iter().map(ItemRecord::to_row).collect(),
    )
}
