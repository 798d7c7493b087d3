use crate::engine::PartialResult;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("No criteria enabled")]
    NoCriteriaEnabled,

    #[error("Criterion '{0}' is defined more than once")]
    DuplicateCriterion(String),

    #[error("Unknown criterion '{0}'")]
    UnknownCriterion(String),

    #[error("Concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("Provider chat_api requires a base_url")]
    MissingBaseUrl,

    #[error("Failed to read prompt file '{path}': {source}")]
    PromptFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Invalid graph definition, raised before anything is dispatched
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Task graph needs at least one criterion")]
    NoCriteria,

    #[error("Criterion '{0}' appears more than once in the task graph")]
    DuplicateCriterion(String),

    #[error("Task graph contains a cycle through node '{0}'")]
    Cycle(String),

    #[error("Node '{node}' depends on unknown node {predecessor}")]
    UnknownPredecessor { node: String, predecessor: usize },

    #[error("Node at position {position} has id {id}")]
    NodeIdMismatch { position: usize, id: usize },

    #[error("Branch '{node}' refers to unknown criterion index {criterion}")]
    UnknownCriterion { node: String, criterion: usize },

    #[error("Criterion '{0}' is evaluated by more than one branch")]
    DuplicateBranch(String),

    #[error("Criterion '{0}' has no branch in the task graph")]
    MissingBranch(String),

    #[error("Task graph needs exactly one aggregate node, found {0}")]
    AggregateCount(usize),

    #[error("Branch '{0}' does not precede the aggregate node")]
    UnguardedBranch(String),
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to read document '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read document from stdin: {0}")]
    Stdin(std::io::Error),

    #[error("Document is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("Could not extract text from the input")]
    Empty,

    #[error("Document is not valid UTF-8 text")]
    NotUtf8,

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("PDF extraction timed out after {0:?}")]
    Timeout(std::time::Duration),
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Execution timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Process failed with exit code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Environment variable {0} is not set")]
    MissingApiKey(String),

    #[error("Response contained no message content")]
    EmptyResponse,
}

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No evaluation could be parsed from output")]
    NoEvaluation,

    #[error("Output was empty")]
    EmptyOutput,
}

/// Failure of an external capability (feedback or summary)
#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Parser error: {0}")]
    Parser(#[from] ParserError),

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum EvaluationCause {
    #[error("{0}")]
    Capability(#[from] CapabilityError),

    #[error("score {0} is outside 0..=10")]
    ScoreOutOfRange(i64),

    #[error("evaluator panicked: {0}")]
    Panicked(String),

    #[error("failed to acquire semaphore: {0}")]
    Semaphore(#[from] tokio::sync::AcquireError),
}

#[derive(Error, Debug)]
#[error("Criterion '{criterion}' failed: {cause}")]
pub struct EvaluationError {
    pub criterion: String,
    #[source]
    pub cause: EvaluationCause,
}

impl EvaluationError {
    pub fn new(criterion: impl Into<String>, cause: impl Into<EvaluationCause>) -> Self {
        Self {
            criterion: criterion.into(),
            cause: cause.into(),
        }
    }
}

/// A state slot was written twice. Never expected in a well-formed graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("State slot '{slot}' was already written")]
pub struct DuplicateWriteError {
    pub slot: String,
}

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("Summary capability failed: {0}")]
    Capability(#[from] CapabilityError),

    #[error("Summary task panicked: {0}")]
    Panicked(String),
}

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Aggregation needs {expected} scores, state holds {actual}")]
    Incomplete { expected: usize, actual: usize },

    #[error("{source}")]
    Synthesis {
        source: SynthesisError,
        partial: Box<PartialResult>,
    },
}

/// Everything `Engine::run` can fail with
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("Engine defect: {0}")]
    DuplicateWrite(#[from] DuplicateWriteError),

    #[error("All criteria were scored but synthesis failed: {source}")]
    Synthesis {
        source: SynthesisError,
        partial: Box<PartialResult>,
    },

    #[error("Aggregation needs {expected} scores, state holds {actual}")]
    Incomplete { expected: usize, actual: usize },

    #[error("Run cancelled after {completed} of {total} criteria completed")]
    Cancelled { completed: usize, total: usize },
}

impl From<AggregateError> for ExecutionError {
    fn from(err: AggregateError) -> Self {
        match err {
            AggregateError::Incomplete { expected, actual } => {
                ExecutionError::Incomplete { expected, actual }
            }
            AggregateError::Synthesis { source, partial } => {
                ExecutionError::Synthesis { source, partial }
            }
        }
    }
}

impl ExecutionError {
    /// Branch results that survived a failed synthesis step
    pub fn partial_result(&self) -> Option<&PartialResult> {
        match self {
            ExecutionError::Synthesis { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// Criterion that caused an evaluation abort
    pub fn failed_criterion(&self) -> Option<&str> {
        match self {
            ExecutionError::Evaluation(e) => Some(&e.criterion),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to create report directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Failed to write report: {0}")]
    WriteReport(std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
