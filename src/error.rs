//! Error taxonomy for liteforge.
//!
//! Every failure is returned to the immediate caller. Layers add a short
//! prefix with [`Error::context`]; [`Error::kind`] sees through those layers
//! so callers can still branch on what actually went wrong.

use thiserror::Error;

/// Boxed engine error carried by connection and execution failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Discriminant of an [`Error`], independent of any context prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidModel,
    NoPrimaryKey,
    Connection,
    NotFound,
    Execution,
    NilRepository,
    Conversion,
    Config,
    Unsupported,
}

#[derive(Debug, Error)]
pub enum Error {
    /// The model is not a usable record (no fields, misaligned values, wrong shape).
    #[error("invalid model: {0}")]
    InvalidModel(String),

    /// The operation needs a primary key and the model declares none.
    #[error("model {0} has no field marked as primary key")]
    NoPrimaryKey(String),

    #[error("connection error: {context}: {source}")]
    Connection {
        context: String,
        #[source]
        source: BoxError,
    },

    /// Zero rows matched a lookup.
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("{context}: {source}")]
    Execution {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("repository is nil")]
    NilRepository,

    #[error("cannot convert {found} into {expected}")]
    Conversion {
        expected: &'static str,
        found: &'static str,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn connection(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::Connection {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn execution(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::Execution {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Wrap this error with a short description of the failing operation.
    pub fn context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidModel(_) => ErrorKind::InvalidModel,
            Error::NoPrimaryKey(_) => ErrorKind::NoPrimaryKey,
            Error::Connection { .. } => ErrorKind::Connection,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Execution { .. } => ErrorKind::Execution,
            Error::NilRepository => ErrorKind::NilRepository,
            Error::Conversion { .. } => ErrorKind::Conversion,
            Error::Config(_) => ErrorKind::Config,
            Error::Unsupported(_) => ErrorKind::Unsupported,
            Error::Context { source, .. } => source.kind(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Attach an operation prefix to the error side of a result.
pub(crate) trait ResultExt<T> {
    fn context(self, context: &str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: &str) -> Result<T> {
        self.map_err(|e| e.context(context))
    }
}
