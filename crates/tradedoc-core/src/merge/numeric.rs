//! Cell normalization and integer rounding.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::config::RoundingPolicy;
use crate::models::table::{parse_plain_number, CellValue};

/// Textual sentinels that read as zero.
const ZERO_SENTINELS: [&str; 3] = ["", "nan", "None"];

/// Parse a comma-or-dot decimal cell.
///
/// Empty cells and the sentinels `nan` / `None` read as zero. `None` is
/// returned for text that is not a number after those checks, and for
/// numbers outside the `Decimal` range (about ±7.9e28).
pub fn normalize_number(cell: &CellValue) -> Option<Decimal> {
    match cell {
        CellValue::Number(n) => Some(*n),
        CellValue::Empty => Some(Decimal::ZERO),
        CellValue::Text(s) => {
            let s = s.replace(',', ".");
            let s = s.trim();
            if ZERO_SENTINELS.contains(&s) {
                return Some(Decimal::ZERO);
            }
            parse_plain_number(s)
        }
    }
}

/// Parse a cell after dropping every character except digits and commas.
///
/// A cell without any digit reads as zero; thousands dots are discarded,
/// so `1.234,50` reads as `1234.50`. Digits that concatenate past the
/// `Decimal` range read as `None`, like any other unparseable cell.
pub fn loose_number(cell: &CellValue) -> Option<Decimal> {
    if let CellValue::Number(n) = cell {
        return Some(*n);
    }
    let text = cell.display();
    if !text.chars().any(|c| c.is_ascii_digit()) {
        return Some(Decimal::ZERO);
    }
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    parse_plain_number(&cleaned)
}

/// Round to an integer under `policy`.
pub fn round_integer(value: Decimal, policy: RoundingPolicy) -> Decimal {
    match policy {
        RoundingPolicy::HalfAwayFromZero => {
            value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        }
        RoundingPolicy::CeilAwayFromZero => {
            if value.is_sign_negative() {
                value.floor()
            } else {
                value.ceil()
            }
        }
    }
}

/// Cell as text with `markers` removed and whitespace stripped.
pub fn strip_text(cell: &CellValue, markers: &[String]) -> String {
    let mut text = cell.display();
    for marker in markers.iter().filter(|m| !m.is_empty()) {
        text = text.replace(marker.as_str(), "");
    }
    text.trim().to_string()
}
