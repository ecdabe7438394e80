//! Fixed regex patterns for purchase-invoice item lines.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Item line: seq, code, description, quantity, "Stk. / 6 Fl", price[/alt], total
    pub static ref ITEM_LINE: Regex = Regex::new(
        r"^(\d+)\s+(\d+)\s+(.*?)\s+(\d+)\s+(Stk\.?\s*/\s*\d+\s*\w*)\s+([\d,.]+(?:\s*/?\s*[\d,.]*)?)\s+([\d,.]+)$"
    ).unwrap();

    // Two leading integers: the shape of any item line, complete or not
    pub static ref ITEM_BOUNDARY: Regex = Regex::new(
        r"^\d+\s+\d+\s+"
    ).unwrap();
}
