mod report;

pub use report::{render_markdown, render_partial_markdown, write_report, EvaluationReport};
