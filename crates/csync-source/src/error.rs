//! Error types for csync-source

use crate::transport::FaultKind;

/// Result type for csync-source operations
pub type Result<T> = std::result::Result<T, Error>;

/// Source errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Remote fault ({kind}): {message}")]
    Fault { kind: FaultKind, message: String },

    #[error("Transport failed: {0}")]
    Transport(String),

    #[error("Unexpected response to '{method}': {message}")]
    Protocol { method: String, message: String },

    #[error("{object} has no key")]
    MissingKey { object: String },

    #[error("Unresolved reference: {handle}")]
    Reference { handle: String },

    #[error("The {source_kind} source does not support {operation}")]
    Unsupported {
        source_kind: String,
        operation: &'static str,
    },

    #[error("No {source_kind} template for {type_name} at platform version {version}")]
    MissingTemplate {
        type_name: String,
        source_kind: String,
        version: u64,
    },

    #[error("Write method for {expected} received a {found} tuple")]
    WrongType { expected: String, found: String },

    #[error(transparent)]
    Fs(#[from] csync_fs::Error),

    #[error(transparent)]
    Binding(#[from] csync_binding::Error),

    #[error(transparent)]
    Model(#[from] csync_model::Error),
}

impl Error {
    pub fn fault(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Fault {
            kind: FaultKind::classify(&message),
            message,
        }
    }

    pub fn transport(message: impl std::fmt::Display) -> Self {
        Self::Transport(message.to_string())
    }

    pub fn missing_key(handle: &csync_model::ContentHandle) -> Self {
        Self::MissingKey {
            object: handle.to_string(),
        }
    }

    pub fn reference(handle: &csync_model::ContentHandle) -> Self {
        Self::Reference {
            handle: handle.to_string(),
        }
    }

    /// The downstream service for a type is not running; the type is
    /// skipped and the run continues.
    pub fn is_recoverable_for_type(&self) -> bool {
        matches!(
            self,
            Self::Fault {
                kind: FaultKind::ServiceUnavailable,
                ..
            }
        )
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(
            self,
            Self::Fault {
                kind: FaultKind::AlreadyExists,
                ..
            }
        )
    }

    /// Errors that abort a run before any I/O.
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::MissingTemplate { .. } | Self::WrongType { .. } => true,
            Self::Model(e) => e.is_configuration(),
            _ => false,
        }
    }
}
