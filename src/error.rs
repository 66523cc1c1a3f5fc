use std::fmt;

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the journal worker.
///
/// Mirrors the teacher's hand-rolled enum-plus-`Display` style rather than
/// `thiserror`: each layer of the pipeline gets one variant here instead of
/// a nest of per-module error types.
#[derive(Debug)]
pub enum Error {
    /// Required configuration was missing or invalid at startup.
    Config(String),
    /// The key-value store could not be reached or returned a protocol error.
    Store(String),
    /// Writing to or reading a journal file failed.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "configuration error: {msg}"),
            Error::Store(msg) => write!(f, "key-value store error: {msg}"),
            Error::Io(err) => write!(f, "IO error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Config(_) | Error::Store(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Error::Store(err.to_string())
    }
}

impl Error {
    /// Exit code to use when this error surfaces at the process boundary.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) => 2,
            Error::Store(_) | Error::Io(_) => 1,
        }
    }
}
