use duet_llm::TransportError;
use thiserror::Error;

use crate::types::Phase;

/// Settings that are missing or unusable; raised before any network I/O
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// Adapter construction rejected the settings
    #[error("Failed to build {phase} transport: {cause}")]
    Transport { phase: Phase, cause: TransportError },
}

impl ConfigurationError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// A stage's transport failed; identifies which stage
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{phase} stage failed: {cause}")]
pub struct StageFailure {
    pub phase: Phase,
    pub cause: TransportError,
}

impl StageFailure {
    pub fn new(phase: Phase, cause: TransportError) -> Self {
        Self { phase, cause }
    }
}

#[derive(Error, Debug)]
pub enum CompositeError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Question must not be empty")]
    EmptyQuestion,

    #[error(transparent)]
    Stage(#[from] StageFailure),

    /// Event receiver went away mid-run
    #[error("Run cancelled: event receiver dropped")]
    Cancelled,
}

impl CompositeError {
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Stage(failure) => Some(failure.phase),
            _ => None,
        }
    }
}
