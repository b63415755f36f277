/// Core error types for Aria
use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for Aria
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// Errors surfaced by the remote media service and the catalog
///
/// Implementations map their transport errors onto this taxonomy so the
/// download queue and the orchestrator can decide between skip-and-continue
/// and aborting a user action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The service rejected the credentials; the caller must log in again
    #[error("Authentication required")]
    AuthRequired,

    /// The requested item does not exist on the server
    #[error("Not found: {0}")]
    NotFound(String),

    /// Connection failures and timeouts
    #[error("Network error: {0}")]
    Network(String),

    /// Server returned an error response
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The response could not be understood
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Writing the downloaded payload failed
    #[error("IO error: {0}")]
    Io(String),

    /// The operation was cancelled before it finished
    #[error("Cancelled")]
    Cancelled,
}

impl RemoteError {
    /// Whether retrying the same request later may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Io(_) => true,
            Self::Server { status, .. } => *status >= 500 || *status == 429,
            Self::AuthRequired | Self::NotFound(_) | Self::Parse(_) | Self::Cancelled => false,
        }
    }
}

impl From<std::io::Error> for RemoteError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
