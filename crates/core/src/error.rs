//! Error types for pinpilot-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pinpilot-core
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse failure category a caller can branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing credentials / configuration, detected before any I/O
    Config,
    /// The request could not be sent or the service rejected it
    Transport,
    /// Enumerating or reading local files failed
    Filesystem,
    /// The service answered without the expected payload
    MalformedResponse,
}

impl ErrorKind {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorKind::Config => "configuration",
            ErrorKind::Transport => "transport",
            ErrorKind::Filesystem => "filesystem",
            ErrorKind::MalformedResponse => "malformed-response",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for pinpilot-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    /// Invalid configuration format
    #[error("Invalid configuration format: {0}")]
    InvalidConfig(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Service answered with a non-success status
    #[error("Pinning service error: HTTP {status}: {message}")]
    Service { status: u16, message: String },

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Timeout
    #[error("Operation timed out")]
    Timeout,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory walk error
    #[error("Cannot read {path}: {message}")]
    Walk { path: PathBuf, message: String },

    /// Nothing to upload
    #[error("No files found under {0}")]
    EmptyDirectory(PathBuf),

    /// Response body could not be decoded
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Response decoded but lacked the identifier field
    #[error("Response is missing the '{0}' field")]
    MissingField(&'static str),
}

impl Error {
    /// Classify this error into one of the four failure kinds
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) | Error::ConfigNotFound(_) | Error::InvalidConfig(_) => ErrorKind::Config,
            Error::Network(_)
            | Error::Service { .. }
            | Error::Authentication(_)
            | Error::Timeout => ErrorKind::Transport,
            Error::Io(_) | Error::Walk { .. } | Error::EmptyDirectory(_) => ErrorKind::Filesystem,
            Error::MalformedResponse(_) | Error::MissingField(_) => ErrorKind::MalformedResponse,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else if err.is_decode() {
            Error::MalformedResponse(err.to_string())
        } else {
            Error::Network(err.to_string())
        }
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();
        Error::Walk {
            path,
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedResponse(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::InvalidConfig(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::InvalidConfig(err.to_string())
    }
}
