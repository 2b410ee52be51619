use quiz_spec::ConfigError;
use thiserror::Error;

/// Failures reported by external collaborators (store, identity, payments).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollabError {
    #[error("'{0}' not found")]
    NotFound(String),
    #[error("'{0}' already exists")]
    Conflict(String),
    #[error("not authorized: {0}")]
    Unauthorized(String),
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("invalid document path '{0}'")]
    InvalidPath(String),
    #[error("payment not settled for session '{0}'")]
    PaymentPending(String),
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid engine settings: {0}")]
    Settings(String),
    #[error("quiz session is still loading")]
    NotReady,
    #[error("quiz session was already initialized")]
    AlreadyInitialized,
    #[error("quiz is not completed")]
    NotCompleted,
    #[error("unknown question '{0}'")]
    UnknownQuestion(String),
    #[error("stored draft at '{path}' is unreadable: {source}")]
    Draft {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("autosave is not running")]
    AutosaveStopped,
    #[error(transparent)]
    Collab(#[from] CollabError),
}
