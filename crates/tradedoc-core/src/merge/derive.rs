//! Fields computed from already-projected grid columns.

use std::ops::Range;

use rust_decimal::Decimal;
use tracing::{trace, warn};

use super::diagnostics::{Diagnostic, DiagnosticCode};
use super::grid::TemplateGrid;
use super::numeric::round_integer;
use crate::models::config::{Combinator, DerivedRule, RoundingPolicy};
use crate::models::table::{parse_plain_number, CellValue};

/// Runs derived rules over grid rows once projection has finished.
#[derive(Debug, Clone)]
pub struct DerivedFieldCalculator<'a> {
    rules: &'a [DerivedRule],
    rounding: RoundingPolicy,
}

/// Cells written by the derive phase and the rows it had to leave alone.
#[derive(Debug, Default)]
pub struct Derivation {
    pub written: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> DerivedFieldCalculator<'a> {
    pub fn new(rules: &'a [DerivedRule], rounding: RoundingPolicy) -> Self {
        Self { rules, rounding }
    }

    /// Apply every rule to every grid row in `rows`.
    ///
    /// A result outside the decimal range leaves the target cell untouched
    /// and is reported against the row's index within `rows`.
    pub fn apply<G: TemplateGrid>(&self, grid: &mut G, rows: Range<u32>) -> Derivation {
        let mut derivation = Derivation::default();
        for row in rows.clone() {
            for rule in self.rules {
                let left = operand(&grid.cell(row, rule.left_column));
                let right = operand(&grid.cell(row, rule.right_column));

                if left.is_none() && right.is_none() {
                    trace!("Row {} has no operands for column {}", row, rule.target_column);
                    continue;
                }

                let Some(value) = combine(rule.combinator, left, right) else {
                    warn!("Derived column {} overflows in row {}", rule.target_column, row);
                    derivation.diagnostics.push(
                        Diagnostic::new(
                            DiagnosticCode::DerivedOverflow,
                            format!("column {} is out of range and was left empty", rule.target_column),
                        )
                        .with_row((row - rows.start) as usize),
                    );
                    continue;
                };

                grid.set_cell(row, rule.target_column, CellValue::Number(round_integer(value, self.rounding)));
                derivation.written += 1;
            }
        }
        derivation
    }
}

/// Combine the present operands.
///
/// `None` when both are absent or the result does not fit a `Decimal`.
pub fn combine(combinator: Combinator, left: Option<Decimal>, right: Option<Decimal>) -> Option<Decimal> {
    match (left, right) {
        (None, None) => None,
        (Some(v), None) | (None, Some(v)) => Some(v),
        (Some(a), Some(b)) => match combinator {
            Combinator::Sum => a.checked_add(b),
            Combinator::Product => a.checked_mul(b),
        },
    }
}

/// Numeric reading of a grid cell; blank or unparseable reads as absent.
fn operand(cell: &CellValue) -> Option<Decimal> {
    match cell {
        CellValue::Number(n) => Some(*n),
        CellValue::Text(s) => parse_plain_number(&s.replace(',', ".")),
        CellValue::Empty => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::grid::MemoryGrid;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn product() -> Vec<DerivedRule> {
        vec![DerivedRule {
            target_column: 13,
            left_column: 8,
            right_column: 12,
            combinator: Combinator::Product,
        }]
    }

    #[test]
    fn test_combine() {
        assert_eq!(combine(Combinator::Sum, Some(dec("2")), Some(dec("3"))), Some(dec("5")));
        assert_eq!(combine(Combinator::Product, Some(dec("2")), Some(dec("3"))), Some(dec("6")));
        assert_eq!(combine(Combinator::Product, None, Some(dec("3"))), Some(dec("3")));
        assert_eq!(combine(Combinator::Sum, None, None), None);
        assert_eq!(combine(Combinator::Product, Some(Decimal::MAX), Some(dec("2"))), None);
        assert_eq!(combine(Combinator::Sum, Some(Decimal::MAX), Some(Decimal::MAX)), None);
    }

    #[test]
    fn test_product_is_rounded_half_away_from_zero() {
        let rules = product();
        let mut grid = MemoryGrid::new();
        grid.set_cell(18, 8, CellValue::Number(dec("3")));
        grid.set_cell(18, 12, CellValue::Number(dec("2.5")));
        grid.set_cell(19, 8, CellValue::Number(dec("-1")));
        grid.set_cell(19, 12, CellValue::from("2,5"));

        let derivation = DerivedFieldCalculator::new(&rules, RoundingPolicy::HalfAwayFromZero).apply(&mut grid, 18..20);

        assert_eq!(derivation.written, 2);
        assert!(derivation.diagnostics.is_empty());
        assert_eq!(grid.cell(18, 13), CellValue::Number(dec("8")));
        assert_eq!(grid.cell(19, 13), CellValue::Number(dec("-3")));
    }

    #[test]
    fn test_absent_operand_is_not_zero() {
        let rules = product();
        let mut grid = MemoryGrid::new();
        grid.set_cell(18, 8, CellValue::Number(dec("4")));
        grid.set_cell(18, 12, CellValue::from("n/a"));

        DerivedFieldCalculator::new(&rules, RoundingPolicy::HalfAwayFromZero).apply(&mut grid, 18..19);

        assert_eq!(grid.cell(18, 13), CellValue::Number(dec("4")));
    }

    #[test]
    fn test_row_without_operands_is_untouched() {
        let rules = product();
        let mut grid = MemoryGrid::new();
        grid.set_cell(18, 13, CellValue::from("keep"));

        let derivation = DerivedFieldCalculator::new(&rules, RoundingPolicy::HalfAwayFromZero).apply(&mut grid, 18..19);

        assert_eq!(derivation.written, 0);
        assert_eq!(grid.cell(18, 13), CellValue::from("keep"));
    }

    #[test]
    fn test_ceil_policy() {
        let rules = vec![DerivedRule {
            target_column: 3,
            left_column: 1,
            right_column: 2,
            combinator: Combinator::Sum,
        }];
        let mut grid = MemoryGrid::new();
        grid.set_cell(1, 1, CellValue::Number(dec("2.1")));
        grid.set_cell(1, 2, CellValue::Number(dec("0.2")));

        DerivedFieldCalculator::new(&rules, RoundingPolicy::CeilAwayFromZero).apply(&mut grid, 1..2);

        assert_eq!(grid.cell(1, 3), CellValue::Number(dec("3")));
    }

    #[test]
    fn test_overflowing_product_leaves_cell_and_reports() {
        let rules = product();
        let mut grid = MemoryGrid::new();
        grid.set_cell(18, 8, CellValue::Number(dec("3")));
        grid.set_cell(18, 12, CellValue::Number(dec("2")));
        grid.set_cell(19, 8, CellValue::Number(dec("100000000000000")));
        grid.set_cell(19, 12, CellValue::Number(dec("100000000000000012.5")));

        let derivation = DerivedFieldCalculator::new(&rules, RoundingPolicy::HalfAwayFromZero).apply(&mut grid, 18..20);

        assert_eq!(derivation.written, 1);
        assert_eq!(grid.cell(18, 13), CellValue::Number(dec("6")));
        assert_eq!(grid.cell(19, 13), CellValue::Empty);
        assert_eq!(derivation.diagnostics.len(), 1);
        assert_eq!(derivation.diagnostics[0].code, DiagnosticCode::DerivedOverflow);
        assert_eq!(derivation.diagnostics[0].row, Some(1));
    }
}
