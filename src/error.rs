use thiserror::Error;

/// Main library error type that encompasses all possible failure modes
#[derive(Error, Debug)]
pub enum AresError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("ARES database is not available: {url} - {details}")]
    UpstreamUnavailable { url: String, details: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status error: {status} for {url} - {message}")]
    HttpStatus {
        url: String,
        status: u16,
        message: String,
    },

    #[error("Request timeout: {url} after {timeout_seconds} seconds")]
    Timeout { url: String, timeout_seconds: u64 },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification callers can branch on without matching every variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    UpstreamUnavailable,
    NotFound,
    Transport,
    Config,
}

impl AresError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AresError::InvalidInput(_) => ErrorKind::InvalidInput,
            AresError::UpstreamUnavailable { .. } => ErrorKind::UpstreamUnavailable,
            AresError::NotFound(_) => ErrorKind::NotFound,
            AresError::Http(_) | AresError::HttpStatus { .. } | AresError::Timeout { .. } => {
                ErrorKind::Transport
            }
            AresError::Config(_) => ErrorKind::Config,
        }
    }

    /// Transport failures count as an unavailable upstream for callers
    /// that do not care about the finer distinction.
    pub fn is_upstream_unavailable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::UpstreamUnavailable | ErrorKind::Transport
        )
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub(crate) fn unavailable(url: &str, details: impl Into<String>) -> Self {
        AresError::UpstreamUnavailable {
            url: url.to_string(),
            details: details.into(),
        }
    }
}

/// Cache-specific error types
///
/// These never leave the cache module: a failing cache degrades to a miss.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache initialization failed: {details}")]
    InitializationFailed { details: String },

    #[error("Cache write error: {key} - {details}")]
    WriteError { key: String, details: String },

    #[error("Cache read error: {key} - {details}")]
    ReadError { key: String, details: String },

    #[error("Cache corruption detected: {key} - {details}")]
    Corruption { key: String, details: String },
}

impl From<crate::config::ConfigError> for AresError {
    fn from(err: crate::config::ConfigError) -> Self {
        AresError::Config(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AresError>;

/// Cache result type alias
pub type CacheResult<T> = std::result::Result<T, CacheError>;
