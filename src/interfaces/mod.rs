pub mod report;

pub use report::{ReportFormat, render, render_json, render_table, write_report};
