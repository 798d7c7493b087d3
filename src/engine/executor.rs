use super::aggregator::{mean, ordered_results, Aggregator};
use super::evaluator::EvaluationResult;
use super::state::ScoredState;
use super::{FinalResult, PartialResult};
use crate::error::{
    AggregateError, EvaluationCause, EvaluationError, ExecutionError, SynthesisError,
};
use crate::graph::{NodeId, NodeKind, NodeStatus, TaskGraph};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Maximum branches running at once
    pub concurrency: usize,
    /// Stagger between branch launches to avoid burst rate limits
    pub launch_delay: Duration,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            concurrency: 6,
            launch_delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Executing,
    Completed,
    Aborted,
}

enum NodeOutput {
    Evaluated(Result<EvaluationResult, EvaluationError>),
    Aggregated(Result<FinalResult, AggregateError>),
}

/// Runs one graph to completion. Owns the scored state for the whole invocation.
pub struct GraphExecutor {
    graph: TaskGraph,
    aggregator: Arc<Aggregator>,
    options: ExecutorOptions,
    statuses: Vec<NodeStatus>,
    state: ScoredState,
    run_state: RunState,
}

impl GraphExecutor {
    pub fn new(graph: TaskGraph, aggregator: Arc<Aggregator>, options: ExecutorOptions) -> Self {
        let statuses = vec![NodeStatus::Pending; graph.nodes().len()];
        Self {
            graph,
            aggregator,
            options,
            statuses,
            state: ScoredState::new(),
            run_state: RunState::Executing,
        }
    }

    #[allow(dead_code)]
    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    #[allow(dead_code)]
    pub fn status(&self, id: NodeId) -> NodeStatus {
        self.statuses[id.0]
    }

    #[allow(dead_code)]
    pub fn state(&self) -> &ScoredState {
        &self.state
    }

    pub async fn execute(
        &mut self,
        cancel: CancellationToken,
    ) -> Result<FinalResult, ExecutionError> {
        if self.run_state != RunState::Executing {
            warn!("Executor already finished, refusing to run again");
            return Err(ExecutionError::Incomplete {
                expected: self.graph.branch_count(),
                actual: self.state.score_count(),
            });
        }

        info!(
            "Evaluating {} criteria with concurrency {}",
            self.graph.branch_count(),
            self.options.concurrency
        );

        let mut tasks = JoinSet::new();
        let result = self.drive(&mut tasks, &cancel).await;

        match &result {
            Ok(_) => self.run_state = RunState::Completed,
            Err(e) => {
                tasks.abort_all();
                for status in self.statuses.iter_mut() {
                    if *status == NodeStatus::Running {
                        *status = NodeStatus::Failed;
                    }
                }
                self.run_state = RunState::Aborted;
                warn!("Run aborted: {}", e);
            }
        }

        result
    }

    async fn drive(
        &mut self,
        tasks: &mut JoinSet<(NodeId, NodeOutput)>,
        cancel: &CancellationToken,
    ) -> Result<FinalResult, ExecutionError> {
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let mut launched = 0u32;
        let mut final_result = None;

        loop {
            // Dispatch everything that is ready; inline nodes may release more
            loop {
                let ready = self.graph.ready_nodes(&self.statuses);
                if ready.is_empty() {
                    break;
                }
                for id in ready {
                    let kind = self.graph.node(id).kind;
                    self.transition(id, NodeStatus::Running);
                    match kind {
                        NodeKind::Source | NodeKind::Terminal => {
                            self.transition(id, NodeStatus::Done);
                        }
                        NodeKind::Branch { criterion } => {
                            let delay = self.options.launch_delay * launched;
                            launched += 1;
                            self.spawn_branch(tasks, id, criterion, delay, semaphore.clone());
                        }
                        NodeKind::Aggregate => self.spawn_aggregate(tasks, id),
                    }
                }
            }

            if tasks.is_empty() {
                break;
            }

            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(ExecutionError::Cancelled {
                        completed: self.state.score_count(),
                        total: self.graph.branch_count(),
                    });
                }
                joined = tasks.join_next() => joined,
            };

            let (id, output) = match joined {
                Some(Ok(done)) => done,
                Some(Err(e)) => {
                    // Panics are caught inside the task, so this is an external abort
                    warn!("Node task ended unexpectedly: {}", e);
                    return Err(ExecutionError::Cancelled {
                        completed: self.state.score_count(),
                        total: self.graph.branch_count(),
                    });
                }
                None => break,
            };

            match output {
                NodeOutput::Evaluated(Ok(result)) => {
                    info!("Completed {}: score {}", result.criterion, result.score);
                    self.state.record_result(result)?;
                    self.transition(id, NodeStatus::Done);
                }
                NodeOutput::Evaluated(Err(e)) => {
                    self.transition(id, NodeStatus::Failed);
                    return Err(e.into());
                }
                NodeOutput::Aggregated(Ok(result)) => {
                    self.state.finalize(&result)?;
                    self.transition(id, NodeStatus::Done);
                    final_result = Some(result);
                }
                NodeOutput::Aggregated(Err(e)) => {
                    self.transition(id, NodeStatus::Failed);
                    return Err(e.into());
                }
            }
        }

        let all_done = self.statuses.iter().all(|s| *s == NodeStatus::Done);
        match final_result {
            Some(result) if all_done => Ok(result),
            _ => Err(ExecutionError::Incomplete {
                expected: self.graph.branch_count(),
                actual: self.state.score_count(),
            }),
        }
    }

    fn transition(&mut self, id: NodeId, next: NodeStatus) {
        let current = self.statuses[id.0];
        debug_assert!(
            current.can_transition_to(next),
            "illegal transition {} -> {} for node {}",
            current,
            next,
            id
        );
        debug!(
            "Node {} ({}) {} -> {}",
            id,
            self.graph.node(id).name,
            current,
            next
        );
        self.statuses[id.0] = next;
    }

    fn spawn_branch(
        &self,
        tasks: &mut JoinSet<(NodeId, NodeOutput)>,
        id: NodeId,
        criterion: usize,
        delay: Duration,
        semaphore: Arc<Semaphore>,
    ) {
        let criterion = self.graph.criteria()[criterion].clone();
        let document = self.graph.document().clone();

        tasks.spawn(async move {
            if !delay.is_zero() {
                sleep(delay).await;
            }

            let result = match semaphore.acquire_owned().await {
                Ok(_permit) => AssertUnwindSafe(criterion.evaluate(&document))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| {
                        Err(EvaluationError::new(
                            criterion.id(),
                            EvaluationCause::Panicked(panic_message(&*panic)),
                        ))
                    }),
                Err(e) => Err(EvaluationError::new(criterion.id(), e)),
            };

            (id, NodeOutput::Evaluated(result))
        });
    }

    fn spawn_aggregate(&self, tasks: &mut JoinSet<(NodeId, NodeOutput)>, id: NodeId) {
        let aggregator = self.aggregator.clone();
        let state = self.state.clone();
        let criteria = self.graph.criteria().to_vec();

        tasks.spawn(async move {
            let result = AssertUnwindSafe(aggregator.aggregate(&state, &criteria))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    let criteria_results = ordered_results(&state, &criteria);
                    let individual_scores: Vec<u8> =
                        criteria_results.iter().map(|r| r.score).collect();
                    Err(AggregateError::Synthesis {
                        source: SynthesisError::Panicked(panic_message(&*panic)),
                        partial: Box::new(PartialResult {
                            avg_score: mean(&individual_scores),
                            criteria: criteria_results,
                            individual_scores,
                        }),
                    })
                });

            (id, NodeOutput::Aggregated(result))
        });
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
