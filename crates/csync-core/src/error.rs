//! Error types for csync-core

/// Result type for csync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving references or driving a sync
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid settings or request; raised before any I/O
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A parent or referenced object exists in neither source
    #[error("Unresolved {type_name} reference '{handle}'")]
    Reference { type_name: String, handle: String },

    /// A parent chain that leads back to itself
    #[error("Folder chain through '{handle}' is cyclic")]
    ReferenceCycle { handle: String },

    /// Failure of one object, tagged with its type and log name
    #[error("{type_name} '{object}': {source}")]
    Object {
        type_name: String,
        object: String,
        source: Box<Error>,
    },

    /// Settings file could not be parsed
    #[error("Invalid settings: {0}")]
    Settings(#[from] toml::de::Error),

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from csync-fs
    #[error(transparent)]
    Fs(#[from] csync_fs::Error),

    /// Model error from csync-model
    #[error(transparent)]
    Model(#[from] csync_model::Error),

    /// Binding error from csync-binding
    #[error(transparent)]
    Binding(#[from] csync_binding::Error),

    /// Source error from csync-source
    #[error(transparent)]
    Source(#[from] csync_source::Error),
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn reference(handle: &csync_model::ContentHandle) -> Self {
        Self::Reference {
            type_name: handle.content_type().display_name().to_string(),
            handle: handle.log_name(),
        }
    }

    /// Wrap an object-level failure with the type's display name and the
    /// object's log name.
    pub fn object(object: &csync_model::ContentObject, source: impl Into<Error>) -> Self {
        Self::named(object.content_type(), object.log_name(), source)
    }

    /// Like [`Self::object`] for an object known only by name, e.g. one
    /// that failed to bind.
    pub fn named(
        ty: csync_model::ContentType,
        object: impl Into<String>,
        source: impl Into<Error>,
    ) -> Self {
        Self::Object {
            type_name: ty.display_name().to_string(),
            object: object.into(),
            source: Box::new(source.into()),
        }
    }

    /// The type's service is down; skip the type and carry on.
    pub fn is_recoverable_for_type(&self) -> bool {
        match self {
            Self::Source(e) => e.is_recoverable_for_type(),
            Self::Object { source, .. } => source.is_recoverable_for_type(),
            _ => false,
        }
    }

    /// Errors that abort the whole run.
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::Configuration(_) | Self::Settings(_) => true,
            Self::Model(e) => e.is_configuration(),
            Self::Source(e) => e.is_configuration(),
            Self::Object { source, .. } => source.is_configuration(),
            _ => false,
        }
    }
}
