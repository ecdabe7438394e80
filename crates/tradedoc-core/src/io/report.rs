//! HTML description report over the merged grid rows.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Local;
use tracing::{info, warn};

use crate::error::Result;
use crate::merge::{Diagnostic, DiagnosticCode, MergeOutcome, TemplateGrid};
use crate::models::config::ReportConfig;

/// Renders configured grid columns of the merged rows as an HTML table.
pub struct HtmlReportWriter<'a> {
    config: &'a ReportConfig,
}

/// A rendered report.
#[derive(Debug, Clone)]
pub struct Report {
    pub html: String,
    /// Number of table rows rendered.
    pub rows: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> HtmlReportWriter<'a> {
    pub fn new(config: &'a ReportConfig) -> Self {
        Self { config }
    }

    /// Render the merged rows of `grid`.
    ///
    /// When the report has a fixed row count that differs from the merged
    /// row count, a warning is emitted and the shorter of the two is used.
    pub fn render<G: TemplateGrid>(&self, grid: &G, outcome: &MergeOutcome) -> Report {
        let mut diagnostics = Vec::new();
        let mut rows = outcome.min_count;

        if let Some(expected) = self.config.expected_rows {
            if expected != outcome.min_count {
                let message = format!(
                    "report table has {} rows but {} rows were merged; rendering {}",
                    expected,
                    outcome.min_count,
                    expected.min(outcome.min_count)
                );
                warn!("{}", message);
                diagnostics.push(Diagnostic::new(DiagnosticCode::ReportTruncated, message));
                rows = expected.min(outcome.min_count);
            }
        }

        let mut html = String::new();
        let title = escape(&self.config.title);
        let _ = writeln!(html, "<!DOCTYPE html>");
        let _ = writeln!(html, "<html>\n<head>\n<meta charset=\"utf-8\">");
        let _ = writeln!(html, "<title>{}</title>", title);
        let _ = writeln!(
            html,
            "<style>table {{ border-collapse: collapse; }} td, th {{ border: 1px solid #999; padding: 4px; }} tr.unidentified {{ background: #ffff00; }} img {{ max-width: 128px; }}</style>"
        );
        let _ = writeln!(html, "</head>\n<body>");
        let _ = writeln!(html, "<h1>{}</h1>", title);
        let _ = writeln!(
            html,
            "<p>Generated {}</p>",
            Local::now().format("%Y-%m-%d %H:%M")
        );

        let _ = writeln!(html, "<table>\n<tr><th>#</th>");
        for column in &self.config.columns {
            let _ = write!(html, "<th>{}</th>", escape(&column.header));
        }
        let _ = writeln!(html, "<th>Photo</th></tr>");

        for (idx, row) in outcome.rows().take(rows).enumerate() {
            if outcome.highlighted.contains(&row) {
                let _ = write!(html, "<tr class=\"unidentified\">");
            } else {
                let _ = write!(html, "<tr>");
            }
            let _ = write!(html, "<td>{}</td>", idx + 1);
            for column in &self.config.columns {
                let value = grid.cell(row, column.column).display();
                let _ = write!(html, "<td>{}</td>", escape(&value));
            }
            match outcome.images.get(&row) {
                Some(image) => {
                    let _ = writeln!(
                        html,
                        "<td><img src=\"data:image/png;base64,{}\"></td></tr>",
                        STANDARD.encode(image)
                    );
                }
                None => {
                    let _ = writeln!(html, "<td></td></tr>");
                }
            }
        }
        let _ = writeln!(html, "</table>\n</body>\n</html>");

        Report {
            html,
            rows,
            diagnostics,
        }
    }

    /// Render and write the report to `path`.
    pub fn write<G: TemplateGrid>(&self, path: &Path, grid: &G, outcome: &MergeOutcome) -> Result<Report> {
        let report = self.render(grid, outcome);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &report.html)?;
        info!("Wrote report with {} rows to {}", report.rows, path.display());
        Ok(report)
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::MemoryGrid;
    use crate::models::config::ReportColumn;
    use crate::models::table::CellValue;

    fn config(expected_rows: Option<usize>) -> ReportConfig {
        ReportConfig {
            title: "Description".to_string(),
            columns: vec![
                ReportColumn {
                    header: "Name".to_string(),
                    column: 3,
                },
                ReportColumn {
                    header: "Origin".to_string(),
                    column: 15,
                },
            ],
            expected_rows,
        }
    }

    fn merged(rows: usize) -> (MemoryGrid, MergeOutcome) {
        let mut grid = MemoryGrid::new();
        for i in 0..rows as u32 {
            grid.set_cell(18 + i, 3, CellValue::text(format!("Item <{i}>")));
            grid.set_cell(18 + i, 15, CellValue::from("EU"));
        }
        let mut outcome = MergeOutcome {
            min_count: rows,
            origin_row: 18,
            ..MergeOutcome::default()
        };
        outcome.images.insert(18, vec![0x89, b'P', b'N', b'G']);
        outcome.highlighted.insert(19);
        (grid, outcome)
    }

    #[test]
    fn test_render_rows_images_and_highlight() {
        let (grid, outcome) = merged(2);
        let config = config(None);
        let report = HtmlReportWriter::new(&config).render(&grid, &outcome);

        assert_eq!(report.rows, 2);
        assert!(report.diagnostics.is_empty());
        assert!(report.html.contains("<th>Name</th><th>Origin</th>"));
        assert!(report.html.contains("<td>Item &lt;0&gt;</td><td>EU</td>"));
        assert!(report.html.contains("data:image/png;base64,iVBORw=="));
        assert_eq!(report.html.matches("class=\"unidentified\"").count(), 1);
    }

    #[test]
    fn test_row_count_mismatch_truncates_with_warning() {
        let (grid, outcome) = merged(3);
        let config = config(Some(2));
        let report = HtmlReportWriter::new(&config).render(&grid, &outcome);

        assert_eq!(report.rows, 2);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].code, DiagnosticCode::ReportTruncated);
        assert!(!report.html.contains("Item &lt;2&gt;"));
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output").join("description.html");
        let (grid, outcome) = merged(1);
        let config = config(None);

        HtmlReportWriter::new(&config).write(&path, &grid, &outcome).unwrap();

        assert!(fs::read_to_string(path).unwrap().contains("Item &lt;0&gt;"));
    }
}
