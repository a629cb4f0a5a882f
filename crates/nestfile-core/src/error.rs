//! Virtual file error types

use thiserror::Error;

/// The main error type for virtual file operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error from the physical filesystem or an archive stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The target does not exist (physical miss or exhausted container scan)
    #[error("Not existing: {0}")]
    NotExisting(String),

    /// The target exists but is the wrong kind (file vs. directory)
    #[error("Wrong kind: {0}")]
    WrongKind(String),

    /// Mutation attempted on an entry that lives inside a container
    #[error("Operation not supported on a container-backed entry: {0}")]
    UnsupportedMutation(String),

    /// A claimed container does not decode as its provider's format
    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    /// A lifecycle wrapper was closed twice or used after close
    #[error("Resource misuse: {0}")]
    ResourceMisuse(String),

    /// Too many container ancestors along one path
    #[error("Container nesting depth {depth} exceeds limit {limit}")]
    NestingTooDeep {
        /// Depth that was about to be created
        depth: usize,
        /// Configured limit
        limit: usize,
    },

    /// Invalid path or path segment
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Configuration text or values that cannot be used
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Signature could not be built (bad hex, empty pattern)
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Size limit exceeded while materializing data
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    /// Unsupported format feature (e.g. an encrypted entry)
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// Result type alias for virtual file operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a not existing error
    pub fn not_existing(msg: impl Into<String>) -> Self {
        Error::NotExisting(msg.into())
    }

    /// Create a wrong kind error
    pub fn wrong_kind(msg: impl Into<String>) -> Self {
        Error::WrongKind(msg.into())
    }

    /// Create an unsupported mutation error
    pub fn unsupported_mutation(msg: impl Into<String>) -> Self {
        Error::UnsupportedMutation(msg.into())
    }

    /// Create a malformed container error
    pub fn malformed_container(msg: impl Into<String>) -> Self {
        Error::MalformedContainer(msg.into())
    }

    /// Create a resource misuse error
    pub fn resource_misuse(msg: impl Into<String>) -> Self {
        Error::ResourceMisuse(msg.into())
    }

    /// Create an invalid path error
    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Error::InvalidPath(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Error::InvalidConfig(msg.into())
    }

    /// Create an invalid signature error
    pub fn invalid_signature(msg: impl Into<String>) -> Self {
        Error::InvalidSignature(msg.into())
    }

    /// Create a limit exceeded error
    pub fn limit_exceeded(msg: impl Into<String>) -> Self {
        Error::LimitExceeded(msg.into())
    }

    /// Create an unsupported error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::Unsupported(msg.into())
    }

    /// True for [`Error::NotExisting`], including I/O "not found"
    pub fn is_not_existing(&self) -> bool {
        match self {
            Error::NotExisting(_) => true,
            Error::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// True for [`Error::WrongKind`]
    pub fn is_wrong_kind(&self) -> bool {
        matches!(self, Error::WrongKind(_))
    }

    /// True for [`Error::UnsupportedMutation`]
    pub fn is_unsupported_mutation(&self) -> bool {
        matches!(self, Error::UnsupportedMutation(_))
    }

    /// True for [`Error::MalformedContainer`]
    pub fn is_malformed_container(&self) -> bool {
        matches!(self, Error::MalformedContainer(_))
    }

    /// True for [`Error::InvalidConfig`]
    pub fn is_invalid_config(&self) -> bool {
        matches!(self, Error::InvalidConfig(_))
    }

    /// True for [`Error::ResourceMisuse`]
    pub fn is_resource_misuse(&self) -> bool {
        matches!(self, Error::ResourceMisuse(_))
    }

    /// Convert into an `io::Error`, keeping the message
    ///
    /// Used where an error has to cross a `Read` implementation.
    pub fn into_io(self) -> std::io::Error {
        match self {
            Error::Io(e) => e,
            Error::NotExisting(msg) => std::io::Error::new(std::io::ErrorKind::NotFound, msg),
            other => std::io::Error::new(std::io::ErrorKind::Other, other.to_string()),
        }
    }
}
