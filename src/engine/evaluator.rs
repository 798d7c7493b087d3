use crate::capability::FeedbackCapability;
use crate::document::Document;
use crate::error::{EvaluationCause, EvaluationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub const MAX_SCORE: u8 = 10;

/// Output of one criterion; produced once, never mutated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub criterion: String,
    pub feedback: String,
    pub score: u8,
}

/// One evaluation dimension bound to the capability that scores it
#[derive(Clone)]
pub struct Criterion {
    id: String,
    name: String,
    capability: Arc<dyn FeedbackCapability>,
}

impl fmt::Debug for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Criterion")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Criterion {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        capability: Arc<dyn FeedbackCapability>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            capability,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scores outside `0..=MAX_SCORE` are rejected, not clamped
    pub async fn evaluate(&self, document: &Document) -> Result<EvaluationResult, EvaluationError> {
        let feedback = self
            .capability
            .feedback(&self.id, document)
            .await
            .map_err(|e| EvaluationError::new(&self.id, e))?;

        let score = u8::try_from(feedback.score)
            .ok()
            .filter(|s| *s <= MAX_SCORE)
            .ok_or_else(|| {
                EvaluationError::new(&self.id, EvaluationCause::ScoreOutOfRange(feedback.score))
            })?;

        Ok(EvaluationResult {
            criterion: self.id.clone(),
            feedback: feedback.text,
            score,
        })
    }
}
