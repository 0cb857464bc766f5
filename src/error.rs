//! Error types for jobforge.

/// Top-level error type for the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),
}

/// Shared indexed store errors.
///
/// `Unavailable` is never retried inside the engine — it propagates to the
/// caller immediately; any retry policy belongs to the caller or to
/// infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Agent registry errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Agent '{name}' not found")]
    NotFound { name: String },

    #[error("Agent '{name}' already exists")]
    Conflict { name: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Job dispatch errors.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Only raised by the legacy mode-based dispatch path; the primary path
    /// bootstraps default agents instead of failing.
    #[error("No agents registered")]
    NoAgentsRegistered,

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Workflow orchestration errors.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Workflow '{workflow_id}' not found")]
    NotFound { workflow_id: String },

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;
