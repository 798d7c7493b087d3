//! Task-graph execution engine
//!
//! One document fans out to every criterion in parallel, results merge into a [`ScoredState`],
//! and a single aggregation step runs once all branches are done:
//!
//! ```text
//! source ─┬─► criterion ─┐
//!         ├─► criterion ─┼─► aggregate ─► end
//!         └─► criterion ─┘
//! ```
//!
//! Each call to [`Engine::run`] builds a fresh [`TaskGraph`] and [`GraphExecutor`], so
//! concurrent invocations never share state.

mod aggregator;
mod evaluator;
mod executor;
mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use aggregator::Aggregator;
pub use evaluator::{Criterion, EvaluationResult};
pub use executor::{ExecutorOptions, GraphExecutor, RunState};
pub use state::ScoredState;

use crate::capability::{ProviderFeedback, ProviderSummary};
use crate::config::Config;
use crate::document::Document;
use crate::error::{ConfigError, ConfigurationError, ExecutionError};
use crate::graph::TaskGraph;
use crate::provider::create_runner;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CriterionResult {
    pub criterion: String,
    pub name: String,
    pub feedback: String,
    pub score: u8,
}

/// Outcome of a completed run. Per-criterion entries follow dispatch order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FinalResult {
    pub criteria: Vec<CriterionResult>,
    pub overall_feedback: String,
    pub avg_score: f64,
    pub individual_scores: Vec<u8>,
}

impl FinalResult {
    #[allow(dead_code)]
    pub fn feedback_for(&self, criterion: &str) -> Option<&str> {
        self.criteria
            .iter()
            .find(|c| c.criterion == criterion)
            .map(|c| c.feedback.as_str())
    }
}

/// Branch results that survived a failed synthesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PartialResult {
    pub criteria: Vec<CriterionResult>,
    pub individual_scores: Vec<u8>,
    pub avg_score: Option<f64>,
}

/// Long-lived engine; criteria and the aggregator are reused across invocations
pub struct Engine {
    criteria: Vec<Criterion>,
    aggregator: Arc<Aggregator>,
    options: ExecutorOptions,
    run_timeout: Option<Duration>,
}

impl Engine {
    pub fn new(criteria: Vec<Criterion>, aggregator: Aggregator, options: ExecutorOptions) -> Self {
        Self {
            criteria,
            aggregator: Arc::new(aggregator),
            options,
            run_timeout: None,
        }
    }

    pub fn with_run_timeout(mut self, run_timeout: Option<Duration>) -> Self {
        self.run_timeout = run_timeout;
        self
    }

    /// Wire every enabled criterion and the summary to their configured providers
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let mut criteria = Vec::new();
        for criterion in config.enabled_criteria() {
            let capability = ProviderFeedback {
                runner: create_runner(config, config.provider_for(criterion)),
                prompt: config.criterion_prompt(criterion)?,
                timeout: config.timeout_for(criterion),
            };
            criteria.push(Criterion::new(
                criterion.id.clone(),
                criterion.name.clone(),
                Arc::new(capability),
            ));
        }

        let summary = ProviderSummary {
            runner: create_runner(config, config.summary_provider()),
            prompt: config.summary_prompt()?,
            timeout: config.summary_timeout(),
        };

        let options = ExecutorOptions {
            concurrency: config.concurrency,
            launch_delay: Duration::from_millis(config.launch_delay_ms),
        };

        Ok(
            Self::new(criteria, Aggregator::new(Arc::new(summary)), options)
                .with_run_timeout(config.run_timeout_sec.map(Duration::from_secs)),
        )
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    /// The graph a run would execute, built over an empty document
    pub fn plan(&self) -> Result<TaskGraph, ConfigurationError> {
        TaskGraph::build(Document::new(String::new()), &self.criteria)
    }

    pub async fn run(&self, document: Document) -> Result<FinalResult, ExecutionError> {
        self.run_with_cancel(document, CancellationToken::new())
            .await
    }

    /// Run until completion, failure, or `cancel` firing (also fired by the run timeout)
    pub async fn run_with_cancel(
        &self,
        document: Document,
        cancel: CancellationToken,
    ) -> Result<FinalResult, ExecutionError> {
        let graph = TaskGraph::build(document, &self.criteria)?;
        info!(
            "Built task graph: {} nodes for {} byte document",
            graph.nodes().len(),
            graph.document().len()
        );

        let token = cancel.child_token();
        let mut executor = GraphExecutor::new(graph, self.aggregator.clone(), self.options.clone());
        let run = executor.execute(token.clone());
        tokio::pin!(run);

        // The timer lives inside this future, so dropping the run drops it too
        if let Some(limit) = self.run_timeout {
            tokio::select! {
                result = &mut run => return result,
                _ = sleep(limit) => {
                    warn!("Run timeout of {:?} reached, cancelling", limit);
                    token.cancel();
                }
            }
        }

        run.await
    }
}
