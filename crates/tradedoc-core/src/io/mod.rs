//! File formats on the edges of the pipeline.

mod report;
mod spreadsheet;

pub use report::{HtmlReportWriter, Report};
pub use spreadsheet::{load_grid, read_table, save_grid, write_table};
