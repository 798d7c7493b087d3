mod json;

use crate::error::ParserError;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

/// Feedback and raw score as reported by a provider. The score is not range-checked here.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEvaluation {
    pub feedback: String,
    pub score: i64,
}

#[derive(Deserialize)]
struct EvaluationJson {
    feedback: String,
    score: Value,
}

/// Parse an evaluation from provider output
/// Tries JSON first, then falls back to a `Score: N/10` line
pub fn parse_evaluation(raw: &str) -> Result<ParsedEvaluation, ParserError> {
    let text = json::unwrap_envelope(raw);
    if text.trim().is_empty() {
        return Err(ParserError::EmptyOutput);
    }

    if let Some(json_str) = json::extract_json(&text) {
        match serde_json::from_str::<EvaluationJson>(&json_str) {
            Ok(parsed) => {
                let score = score_from_value(&parsed.score).ok_or(ParserError::NoEvaluation)?;
                return Ok(ParsedEvaluation {
                    feedback: parsed.feedback.trim().to_string(),
                    score,
                });
            }
            Err(e) => tracing::debug!("Failed to parse evaluation JSON: {}", e),
        }
    }

    parse_score_line(&text).ok_or(ParserError::NoEvaluation)
}

/// Extract narrative text from provider output
pub fn parse_summary(raw: &str) -> Result<String, ParserError> {
    let text = json::unwrap_envelope(raw);
    let text = text.trim();
    if text.is_empty() {
        return Err(ParserError::EmptyOutput);
    }
    Ok(text.to_string())
}

fn score_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Fallback: free text with a `Score: 7/10` line; feedback is everything else
fn parse_score_line(text: &str) -> Option<ParsedEvaluation> {
    let re = Regex::new(r"(?im)^\s*\**score\**\s*[:=]\s*\**\s*(-?\d+)\s*(?:/\s*10)?").ok()?;
    let caps = re.captures(text)?;
    let score: i64 = caps.get(1)?.as_str().parse().ok()?;
    let line = caps.get(0)?;

    let feedback = format!("{}{}", &text[..line.start()], &text[line.end()..])
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();

    if feedback.is_empty() {
        return None;
    }

    Some(ParsedEvaluation { feedback, score })
}
