//! Error types for script-glue.

use thiserror::Error;

/// Main error type for script-glue operations.
#[derive(Error, Debug)]
pub enum GlueError {
    /// The child process could not be created.
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid observer state transition attempted.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        from: crate::observer::ObserverState,
        to: crate::observer::ObserverState,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Regex compilation error.
    #[error("invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No clipboard backend exists for this platform.
    #[error("clipboard is not supported on this platform")]
    ClipboardUnsupported,

    /// A clipboard helper command failed.
    #[error("clipboard error: {0}")]
    Clipboard(String),

    /// The PowerShell request script exited unsuccessfully.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,
}

/// Convenience Result type for script-glue operations.
pub type Result<T> = std::result::Result<T, GlueError>;
