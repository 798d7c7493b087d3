use crate::engine::{CriterionResult, FinalResult, PartialResult};
use crate::error::OutputError;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub document_digest: String,
    pub duration_sec: f64,
    pub result: FinalResult,
}

impl EvaluationReport {
    pub fn new(document_digest: String, duration: Duration, result: FinalResult) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            document_digest,
            duration_sec: duration.as_secs_f64(),
            result,
        }
    }
}

/// Write `<digest>.json` and `<digest>.md` under a dated directory, returning the JSON path
pub fn write_report(report_dir: &Path, report: &EvaluationReport) -> Result<PathBuf, OutputError> {
    let date_str = Local::now().format("%Y-%m-%d").to_string();
    let dir = report_dir.join(date_str);
    fs::create_dir_all(&dir).map_err(OutputError::CreateDir)?;

    let json_path = dir.join(format!("{}.json", report.document_digest));
    let json = serde_json::to_string_pretty(report)?;
    fs::write(&json_path, json).map_err(OutputError::WriteReport)?;

    let md_path = dir.join(format!("{}.md", report.document_digest));
    let mut content = String::new();
    content.push_str(&format!(
        "<!-- run {} at {} -->\n\n",
        report.run_id,
        report.timestamp.to_rfc3339()
    ));
    content.push_str(&render_markdown(&report.result));
    content.push_str(&format!("\n---\n\n*Evaluated in {:.1}s*\n", report.duration_sec));
    fs::write(&md_path, content).map_err(OutputError::WriteReport)?;

    Ok(json_path)
}

pub fn render_markdown(result: &FinalResult) -> String {
    let mut content = String::new();

    content.push_str("# Essay Evaluation\n\n");
    content.push_str(&format!("**Average score:** {:.2} / 10\n\n", result.avg_score));
    push_score_table(&mut content, &result.criteria);

    content.push_str("## Overall Feedback\n\n");
    content.push_str(result.overall_feedback.trim());
    content.push_str("\n\n");

    push_criterion_sections(&mut content, &result.criteria);
    content
}

/// Rendering for a run whose synthesis step failed
pub fn render_partial_markdown(partial: &PartialResult) -> String {
    let mut content = String::new();

    content.push_str("# Essay Evaluation (incomplete)\n\n");
    match partial.avg_score {
        Some(avg) => content.push_str(&format!("**Average score:** {:.2} / 10\n\n", avg)),
        None => content.push_str("**Average score:** n/a\n\n"),
    }
    push_score_table(&mut content, &partial.criteria);
    content.push_str("*Overall feedback unavailable*\n\n");

    push_criterion_sections(&mut content, &partial.criteria);
    content
}

fn push_score_table(content: &mut String, criteria: &[CriterionResult]) {
    content.push_str("| Criterion | Score |\n");
    content.push_str("|-----------|-------|\n");
    for c in criteria {
        content.push_str(&format!("| {} | {} |\n", c.name, c.score));
    }
    content.push('\n');
}

fn push_criterion_sections(content: &mut String, criteria: &[CriterionResult]) {
    for c in criteria {
        content.push_str(&format!("## {} ({}/10)\n\n", c.name, c.score));
        content.push_str(c.feedback.trim());
        content.push_str("\n\n");
    }
}
