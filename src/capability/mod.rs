//! External capabilities consumed by the engine
//!
//! The engine only sees these traits. [`ProviderFeedback`] and [`ProviderSummary`] bind them to
//! a provider [`Runner`](crate::provider::Runner); tests bind them to stubs.

mod provider;

pub use provider::{ProviderFeedback, ProviderSummary};

use crate::document::Document;
use crate::error::CapabilityError;
use async_trait::async_trait;
use serde::Serialize;

/// Raw feedback from a capability; the score is validated by the evaluator
#[derive(Debug, Clone, PartialEq)]
pub struct Feedback {
    pub text: String,
    pub score: i64,
}

/// One criterion's feedback as handed to the summary capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CriterionFeedback {
    pub criterion: String,
    pub name: String,
    pub feedback: String,
}

#[async_trait]
pub trait FeedbackCapability: Send + Sync {
    async fn feedback(
        &self,
        criterion: &str,
        document: &Document,
    ) -> Result<Feedback, CapabilityError>;
}

#[async_trait]
pub trait SummaryCapability: Send + Sync {
    async fn summarize(&self, feedback: &[CriterionFeedback]) -> Result<String, CapabilityError>;
}
