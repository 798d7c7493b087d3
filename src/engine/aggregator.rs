use super::evaluator::Criterion;
use super::state::ScoredState;
use super::{CriterionResult, FinalResult, PartialResult};
use crate::capability::{CriterionFeedback, SummaryCapability};
use crate::error::{AggregateError, SynthesisError};
use std::sync::Arc;
use tracing::{debug, info};

/// Mean score plus a synthesized narrative. Runs once per invocation; the executor enforces that.
pub struct Aggregator {
    summary: Arc<dyn SummaryCapability>,
}

impl Aggregator {
    pub fn new(summary: Arc<dyn SummaryCapability>) -> Self {
        Self { summary }
    }

    pub async fn aggregate(
        &self,
        state: &ScoredState,
        criteria: &[Criterion],
    ) -> Result<FinalResult, AggregateError> {
        let incomplete = || AggregateError::Incomplete {
            expected: criteria.len(),
            actual: state.score_count(),
        };

        if criteria.is_empty() || !state.is_ready(criteria.len()) {
            return Err(incomplete());
        }

        let results = ordered_results(state, criteria);
        if results.len() != criteria.len() {
            return Err(incomplete());
        }

        let individual_scores: Vec<u8> = results.iter().map(|r| r.score).collect();
        let avg_score = mean(&individual_scores).ok_or_else(incomplete)?;

        let feedback: Vec<CriterionFeedback> = results
            .iter()
            .map(|r| CriterionFeedback {
                criterion: r.criterion.clone(),
                name: r.name.clone(),
                feedback: r.feedback.clone(),
            })
            .collect();

        debug!(
            "Synthesizing narrative from {} criteria (avg {:.2})",
            feedback.len(),
            avg_score
        );

        let overall_feedback = match self.summary.summarize(&feedback).await {
            Ok(text) => text,
            Err(e) => {
                return Err(AggregateError::Synthesis {
                    source: SynthesisError::Capability(e),
                    partial: Box::new(PartialResult {
                        criteria: results,
                        individual_scores,
                        avg_score: Some(avg_score),
                    }),
                })
            }
        };

        info!("Aggregation complete: avg score {:.2}", avg_score);

        Ok(FinalResult {
            criteria: results,
            overall_feedback,
            avg_score,
            individual_scores,
        })
    }
}

/// Per-criterion results in dispatch order; criteria without a result are skipped
pub fn ordered_results(state: &ScoredState, criteria: &[Criterion]) -> Vec<CriterionResult> {
    criteria
        .iter()
        .filter_map(|c| {
            let score = state.score_for(c.id())?;
            let feedback = state.feedback_for(c.id())?;
            Some(CriterionResult {
                criterion: c.id().to_string(),
                name: c.name().to_string(),
                feedback: feedback.to_string(),
                score,
            })
        })
        .collect()
}

/// Arithmetic mean with real division; `None` for an empty slice
pub fn mean(scores: &[u8]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let sum: f64 = scores.iter().map(|&s| f64::from(s)).sum();
    Some(sum / scores.len() as f64)
}
