use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    /// Unknown module or call class during construction
    #[error("Class not found in stock: {0}")]
    ClassNotFound(String),

    /// An operation referenced an unknown ID or name
    #[error("Not found: {0}")]
    NotFound(String),

    /// Slots cannot be bridged by any call class, or have the same kind
    #[error("Incompatible: {0}")]
    Incompatible(String),

    /// A slot refused the call after compatibility was established
    #[error("Bind failed: {0}")]
    BindFailed(String),

    /// References to a deleted entity survived its removal
    #[error("Unclean deletion: {0}")]
    UncleanDeletion(String),

    /// A name that cannot be given to a module or group
    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("Invalid project: {0}")]
    InvalidProject(String),

    #[error("Cycle detected: {0}")]
    Cycle(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A command of an edit batch failed; earlier commands stay applied
    #[error("Edit #{index} ({action}) failed: {source}")]
    Edit {
        index: usize,
        action: String,
        #[source]
        source: Box<GraphError>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl GraphError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn incompatible(msg: impl Into<String>) -> Self {
        Self::Incompatible(msg.into())
    }

    pub fn invalid_project(msg: impl Into<String>) -> Self {
        Self::InvalidProject(msg.into())
    }

    pub fn invalid_catalog(msg: impl Into<String>) -> Self {
        Self::InvalidCatalog(msg.into())
    }

    /// Short machine-readable code, used by front ends for error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ClassNotFound(_) => "class_not_found",
            Self::NotFound(_) => "not_found",
            Self::Incompatible(_) => "incompatible",
            Self::BindFailed(_) => "bind_failed",
            Self::UncleanDeletion(_) => "unclean_deletion",
            Self::InvalidName(_) => "invalid_name",
            Self::InvalidCatalog(_) => "invalid_catalog",
            Self::InvalidProject(_) => "invalid_project",
            Self::Cycle(_) => "cycle",
            Self::Config(_) => "invalid_config",
            Self::Edit { source, .. } => source.code(),
            Self::Json(_) => "json",
            Self::Other(_) => "internal",
        }
    }
}
