//! Error types for the blueprint flow.

use crate::flow::action::ActionKind;
use crate::flow::guard::RejectReason;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Transition rejected: {0}")]
    Transition(#[from] TransitionRejected),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Suggestion error: {0}")]
    Suggestion(#[from] SuggestionError),
}

/// Configuration-related errors, including malformed stage graphs.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown stage: {0}")]
    UnknownStage(String),

    #[error("Unknown step {step} in stage {stage}")]
    UnknownStep { stage: String, step: String },

    #[error("Stage graph {0} has no stages")]
    EmptyGraph(String),

    #[error("Stage {0} has no steps")]
    EmptyStage(String),

    #[error("Duplicate stage id: {0}")]
    DuplicateStage(String),

    #[error("Duplicate step {step} in stage {stage}")]
    DuplicateStep { stage: String, step: String },

    #[error("Duplicate document path {path} in stage {stage}")]
    DuplicatePath { stage: String, path: String },

    #[error("Stage id {0} is reserved")]
    ReservedStageId(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejected user input. No state was changed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("An answer is required for {step}")]
    Empty { step: String },

    #[error("Answer for {step} is too short ({got} of {min} characters)")]
    TooShort { step: String, min: usize, got: usize },

    #[error("Answer for {step} doesn't contain any words")]
    Unrecognized { step: String },

    #[error("Step {step} doesn't take an answer")]
    NotAccepted { step: String },

    #[error("The blueprint is complete")]
    Terminal,
}

impl InputError {
    /// Whether this rejection counts as an empty submission (vs. an invalid one).
    pub fn is_empty_submission(&self) -> bool {
        matches!(self, Self::Empty { .. })
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Empty { .. } => "empty",
            Self::TooShort { .. } => "too-short",
            Self::Unrecognized { .. } => "unrecognized",
            Self::NotAccepted { .. } => "not-accepted",
            Self::Terminal => "terminal",
        }
    }

    /// Plain guidance a UI can show instead of the error text.
    pub fn guidance(&self) -> &'static str {
        match self {
            Self::Empty { .. } => "Type an answer to capture it for this step.",
            Self::TooShort { .. } => "Add a little more detail before moving on.",
            Self::Unrecognized { .. } => "Try answering in a few words.",
            Self::NotAccepted { .. } => "This step just needs you to continue.",
            Self::Terminal => "Your blueprint is done. Export it or restart to keep editing.",
        }
    }
}

/// A guard rejection: the action was not legal from the current position.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{action} not allowed: {reason}")]
pub struct TransitionRejected {
    pub action: ActionKind,
    pub reason: RejectReason,
}

impl TransitionRejected {
    pub fn guidance(&self) -> &'static str {
        self.reason.guidance()
    }
}

/// Rehydration errors. Fatal to the load attempt only.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Malformed blueprint document: {0}")]
    MalformedDocument(String),

    #[error("Failed to decode persisted blueprint: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Suggestion provider errors.
#[derive(Debug, thiserror::Error)]
pub enum SuggestionError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("No suggestions for step {step} in stage {stage}")]
    Unavailable { stage: String, step: String },
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
