use super::evaluator::EvaluationResult;
use super::FinalResult;
use crate::error::DuplicateWriteError;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreEntry {
    pub criterion: String,
    pub score: u8,
}

/// Per-invocation accumulator
///
/// Feedback slots are single-writer per criterion; scores are append-only in completion order.
/// Only the executor loop holds `&mut ScoredState`, which serializes every merge.
#[derive(Debug, Clone, Default)]
pub struct ScoredState {
    feedback: HashMap<String, String>,
    scores: Vec<ScoreEntry>,
    overall_feedback: Option<String>,
    avg_score: Option<f64>,
}

impl ScoredState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one branch result. The state is untouched on error.
    pub fn record_result(&mut self, result: EvaluationResult) -> Result<(), DuplicateWriteError> {
        if self.feedback.contains_key(&result.criterion) {
            return Err(DuplicateWriteError {
                slot: result.criterion,
            });
        }

        self.scores.push(ScoreEntry {
            criterion: result.criterion.clone(),
            score: result.score,
        });
        self.feedback.insert(result.criterion, result.feedback);
        Ok(())
    }

    /// Write the aggregation fields, once
    pub fn finalize(&mut self, result: &FinalResult) -> Result<(), DuplicateWriteError> {
        if self.overall_feedback.is_some() || self.avg_score.is_some() {
            return Err(DuplicateWriteError {
                slot: "overall_feedback".to_string(),
            });
        }
        self.overall_feedback = Some(result.overall_feedback.clone());
        self.avg_score = Some(result.avg_score);
        Ok(())
    }

    pub fn is_ready(&self, branch_count: usize) -> bool {
        self.scores.len() == branch_count
    }

    pub fn score_count(&self) -> usize {
        self.scores.len()
    }

    /// Scores in completion order
    #[allow(dead_code)]
    pub fn scores(&self) -> &[ScoreEntry] {
        &self.scores
    }

    pub fn score_for(&self, criterion: &str) -> Option<u8> {
        self.scores
            .iter()
            .find(|e| e.criterion == criterion)
            .map(|e| e.score)
    }

    pub fn feedback_for(&self, criterion: &str) -> Option<&str> {
        self.feedback.get(criterion).map(String::as_str)
    }

    #[allow(dead_code)]
    pub fn overall_feedback(&self) -> Option<&str> {
        self.overall_feedback.as_deref()
    }

    #[allow(dead_code)]
    pub fn avg_score(&self) -> Option<f64> {
        self.avg_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(criterion: &str, score: u8) -> EvaluationResult {
        EvaluationResult {
            criterion: criterion.to_string(),
            feedback: format!("{} feedback", criterion),
            score,
        }
    }

    #[test]
    fn test_record_and_ready() {
        let mut state = ScoredState::new();
        assert!(!state.is_ready(2));

        state.record_result(result("language", 8)).unwrap();
        assert!(!state.is_ready(2));

        state.record_result(result("clarity", 6)).unwrap();
        assert!(state.is_ready(2));
        assert_eq!(state.score_for("language"), Some(8));
        assert_eq!(state.feedback_for("clarity"), Some("clarity feedback"));
        assert_eq!(state.overall_feedback(), None);
        assert_eq!(state.avg_score(), None);
    }

    #[test]
    fn test_duplicate_write_rejected_without_side_effects() {
        let mut state = ScoredState::new();
        state.record_result(result("language", 8)).unwrap();

        let err = state.record_result(result("language", 2)).unwrap_err();
        assert_eq!(err.slot, "language");
        assert_eq!(state.score_count(), 1);
        assert_eq!(state.score_for("language"), Some(8));
        assert_eq!(state.feedback_for("language"), Some("language feedback"));
    }

    #[test]
    fn test_merge_is_commutative() {
        let mut forward = ScoredState::new();
        let mut reverse = ScoredState::new();
        let results = [result("a", 1), result("b", 2), result("c", 3)];

        for r in results.iter().cloned() {
            forward.record_result(r).unwrap();
        }
        for r in results.iter().rev().cloned() {
            reverse.record_result(r).unwrap();
        }

        for id in ["a", "b", "c"] {
            assert_eq!(forward.score_for(id), reverse.score_for(id));
            assert_eq!(forward.feedback_for(id), reverse.feedback_for(id));
        }
        assert_eq!(forward.score_count(), reverse.score_count());
    }

    #[test]
    fn test_finalize_is_write_once() {
        let mut state = ScoredState::new();
        state.record_result(result("a", 4)).unwrap();

        let final_result = FinalResult {
            criteria: Vec::new(),
            overall_feedback: "fine".to_string(),
            avg_score: 4.0,
            individual_scores: vec![4],
        };
        state.finalize(&final_result).unwrap();
        assert_eq!(state.overall_feedback(), Some("fine"));
        assert_eq!(state.avg_score(), Some(4.0));

        assert!(state.finalize(&final_result).is_err());
    }
}
