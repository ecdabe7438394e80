//! Two-state assembly of multi-line invoice records.

use tracing::{debug, trace};

use super::classifier::{LineClassifier, LineRole};
use crate::models::record::{ItemRecord, RawLine};

/// Assembler state.
#[derive(Debug)]
enum State {
    /// No record is open.
    Idle,
    /// A record is being built.
    Open(ItemRecord),
}

/// Rebuilds invoice records from an ordered line stream.
///
/// Each call starts from a fresh state, so assembling the same lines twice
/// yields identical records.
#[derive(Debug, Clone, Default)]
pub struct InvoiceAssembler {
    classifier: LineClassifier,
}

impl InvoiceAssembler {
    pub fn new(classifier: LineClassifier) -> Self {
        Self { classifier }
    }

    /// Assemble records from page texts in reading order.
    pub fn assemble_pages<S: AsRef<str>>(&self, pages: &[S]) -> Vec<ItemRecord> {
        self.assemble(&RawLine::from_pages(pages))
    }

    /// Assemble records from classified lines.
    pub fn assemble(&self, lines: &[RawLine]) -> Vec<ItemRecord> {
        let mut records = Vec::new();
        let mut state = State::Idle;

        for line in lines {
            let role = self.classifier.classify(&line.text);
            trace!("line {} (page {}): {:?}", line.ordinal, line.page, role);
            state = step(state, role, &line.text, &mut records);
        }

        if let State::Open(record) = state {
            seal(record, &mut records);
        }

        debug!("Assembled {} invoice records from {} lines", records.len(), lines.len());
        records
    }
}

fn step(state: State, role: LineRole, text: &str, out: &mut Vec<ItemRecord>) -> State {
    match state {
        State::Idle => idle(role),
        State::Open(mut record) => match role {
            LineRole::Noise => State::Open(record),
            LineRole::CustomsAnnotation(code) => {
                if record.customs_code.is_none() {
                    record.customs_code = Some(code);
                }
                State::Open(record)
            }
            LineRole::DescriptionContinuation => {
                record.description.push(' ');
                record.description.push_str(text);
                State::Open(record)
            }
            // The record ends here; the same line gets its own chance to
            // start the next one.
            role @ (LineRole::ItemStart(_) | LineRole::NextItemBoundary | LineRole::Unrecognized) => {
                seal(record, out);
                idle(role)
            }
        },
    }
}

fn idle(role: LineRole) -> State {
    match role {
        LineRole::ItemStart(fields) => State::Open(ItemRecord::open(fields)),
        _ => State::Idle,
    }
}

fn seal(mut record: ItemRecord, out: &mut Vec<ItemRecord>) {
    record.description = record.description.trim().to_string();
    out.push(record);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn assemble(text: &str) -> Vec<ItemRecord> {
        InvoiceAssembler::default().assemble_pages(&[text])
    }

    #[test]
    fn test_customs_and_continuation() {
        let records = assemble(
            "1 4711 Olivenöl extra vergine 12 Stk. / 6 Fl 4,50 54,00\n\
             Zolltarif-Nr.: 15091020\n\
             EAN 4001234567890",
        );

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].customs_code.as_deref(), Some("15091020"));
        assert_eq!(records[0].description, "Olivenöl extra vergine EAN 4001234567890");
    }

    #[test]
    fn test_first_customs_code_wins() {
        let records = assemble(
            "1 4711 Olivenöl 12 Stk. / 6 Fl 4,50 54,00\n\
             Zolltarif-Nr.: 15091020\n\
             Zolltarif-Nr.: 99999999",
        );

        assert_eq!(records[0].customs_code.as_deref(), Some("15091020"));
    }

    #[test]
    fn test_record_without_annotations() {
        let records = assemble("1 4711 Olivenöl 12 Stk. / 6 Fl 4,50 54,00");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].description, "Olivenöl");
        assert_eq!(records[0].customs_code, None);
    }

    #[test]
    fn test_adjacent_item_lines_both_open_records() {
        let records = assemble(
            "1 4711 Olivenöl 12 Stk. / 6 Fl 4,50 54,00\n\
             2 4712 Essig 3 Stk. / 1 Fl 2,00 6,00\n\
             Art.-Nr. 88",
        );

        let descriptions: Vec<_> = records.iter().map(|r| r.description.as_str()).collect();
        assert_eq!(descriptions, vec!["Olivenöl", "Essig Art.-Nr. 88"]);
    }

    #[test]
    fn test_boundary_closes_record_and_is_dropped() {
        let records = assemble(
            "1 4711 Olivenöl 12 Stk. / 6 Fl 4,50 54,00\n\
             2 4712 unvollständige Zeile\n\
             EAN 4001234567890\n\
             Zolltarif-Nr.: 15091020",
        );

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].description, "Olivenöl");
        assert_eq!(records[0].customs_code, None);
    }

    #[test]
    fn test_noise_is_skipped_inside_record() {
        let records = assemble(
            "1 4711 Olivenöl 12 Stk. / 6 Fl 4,50 54,00\n\
             Seite 1 von 2\n\
             Hersteller Oliveto",
        );

        assert_eq!(records[0].description, "Olivenöl Hersteller Oliveto");
    }

    #[test]
    fn test_unrecognized_line_ends_record() {
        let records = assemble(
            "1 4711 Olivenöl 12 Stk. / 6 Fl 4,50 54,00\n\
             Gesamtbetrag 54,00\n\
             EAN 4001234567890",
        );

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].description, "Olivenöl");
    }

    #[test]
    fn test_lines_before_first_item_are_ignored() {
        let records = assemble(
            "Rechnung 2024-17\n\
             EAN 1\n\
             Zolltarif-Nr.: 1\n\
             1 4711 Olivenöl 12 Stk. / 6 Fl 4,50 54,00",
        );

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].customs_code, None);
    }

    #[test]
    fn test_page_break_noise_between_items() {
        let pages = [
            "Rechnung\n1 4711 Olivenöl 12 Stk. / 6 Fl 4,50 54,00\nEAN 400",
            "Seite 2 von 3\n2 4712 Essig 3 Stk. / 1 Fl 2,00 6,00",
            "Zwischensumme 60,00",
        ];

        let records = InvoiceAssembler::default().assemble_pages(&pages);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].description, "Olivenöl EAN 400");
        assert_eq!(records[1].description, "Essig");
        assert!(records.iter().all(|r| !r.description.contains("Seite")));
    }

    #[test]
    fn test_assembly_is_repeatable() {
        let text = "1 4711 Olivenöl 12 Stk. / 6 Fl 4,50 54,00\nZolltarif-Nr.: 1509\n\
                    2 4712 Essig 3 Stk. / 1 Fl 2,00 6,00";
        let assembler = InvoiceAssembler::default();

        let first = assembler.assemble_pages(&[text]);
        let second = assembler.assemble_pages(&[text]);

        assert_eq!(first, second);
    }
}
