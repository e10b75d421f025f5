//! Error types for csync-binding

/// Result type for csync-binding operations
pub type Result<T> = std::result::Result<T, Error>;

/// Binding errors.
///
/// Every structural mismatch names the template and the field path so the
/// failing object can be traced.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Template '{template}': missing required value at '{path}'")]
    MissingValue { template: String, path: String },

    #[error("Template '{template}': invalid {expected} value '{value}' at '{path}'")]
    InvalidValue {
        template: String,
        path: String,
        expected: &'static str,
        value: String,
    },

    #[error("Template '{template}': expected root element <{expected}>, found <{found}>")]
    RootMismatch {
        template: String,
        expected: String,
        found: String,
    },

    #[error("Template '{template}': {message} at '{path}'")]
    Structure {
        template: String,
        path: String,
        message: String,
    },

    #[error("Template '{template}': malformed input: {message}")]
    Malformed { template: String, message: String },

    #[error("Malformed XML: {0}")]
    Xml(String),

    #[error("XML write failed: {0}")]
    Write(String),

    #[error(transparent)]
    Model(#[from] csync_model::Error),
}

impl Error {
    pub fn xml(message: impl std::fmt::Display) -> Self {
        Self::Xml(message.to_string())
    }

    pub fn write(message: impl std::fmt::Display) -> Self {
        Self::Write(message.to_string())
    }
}
