//! Error types for rotolog

use std::io;

/// Rotolog error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration: missing folder, bad time format, bad schedule,
    /// bad compression level, or an unopenable current file. A previously
    /// valid configuration on a shared instance stays in effect.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Invalid archive name template syntax or variable reference.
    #[error("Invalid archive name template: {0}")]
    Template(String),

    /// An archive scan aborted: malformed glob pattern, or a matched file
    /// could not be stat'ed.
    #[error("Archive scan failed: {0}")]
    Scan(String),

    /// Appending to the current file failed. The engine stays open and the
    /// write may be retried, at the risk of a partially appended record.
    #[error("Write failed: {0}")]
    Write(#[source] io::Error),

    /// A rotation step failed (move, compress, record, evict, or reopen).
    /// May leave the engine with no open current file; another rotate or
    /// close recovers it.
    #[error("Rotation failed: {0}")]
    Rotate(String),

    /// The engine has been closed; no further operations are possible.
    #[error("Rotator is closed")]
    Closed,
}

/// Result type alias for rotolog
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn template<S: Into<String>>(msg: S) -> Self {
        Error::Template(msg.into())
    }

    pub fn scan<S: Into<String>>(msg: S) -> Self {
        Error::Scan(msg.into())
    }

    pub fn rotate<S: Into<String>>(msg: S) -> Self {
        Error::Rotate(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("folder does not exist: /nope");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: folder does not exist: /nope"
        );

        let err = Error::Closed;
        assert_eq!(err.to_string(), "Rotator is closed");
    }

    #[test]
    fn test_write_error_source() {
        use std::error::Error as _;

        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err = Error::Write(io_err);
        assert!(err.to_string().starts_with("Write failed"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_helper_constructors() {
        assert!(matches!(Error::template("oops"), Error::Template(_)));
        assert!(matches!(Error::scan("oops"), Error::Scan(_)));
        assert!(matches!(Error::rotate("oops"), Error::Rotate(_)));
    }
}
