//! Error types for csync-model

/// Result type for csync-model operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in csync-model operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A handle with neither key nor id cannot be indexed
    #[error("{type_name} handle has neither a key nor an id")]
    UnsetHandle { type_name: String },

    /// A handle of another content type was assigned to an object
    #[error("Cannot assign a {found} handle to a {expected} object")]
    TypeMismatch { expected: String, found: String },

    /// Old and new sides of a tuple have different content types
    #[error("Content tuple mixes {old} and {new} objects")]
    TupleTypeMismatch { old: String, new: String },

    /// Tuple without any side
    #[error("Content tuple has neither an old nor a new object")]
    EmptyTuple,

    /// The content type lacks the capability an operation needs
    #[error("{type_name} does not support {capability}")]
    Unsupported {
        type_name: String,
        capability: &'static str,
    },

    /// Configuration names a type that is not registered
    #[error("Unknown content type: {0}")]
    UnknownType(String),

    /// The type needs a newer platform than the one configured
    #[error("{type_name} requires platform version {required}, configured version is {configured}")]
    VersionGate {
        type_name: String,
        required: u64,
        configured: u64,
    },
}

impl Error {
    /// Whether this error belongs to the configuration class, which aborts a
    /// run before any I/O happens.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::TupleTypeMismatch { .. }
                | Self::EmptyTuple
                | Self::UnknownType(_)
                | Self::VersionGate { .. }
        )
    }
}
