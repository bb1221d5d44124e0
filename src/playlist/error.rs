//! Error types for playlist parsing.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while parsing a playlist file.
///
/// Text decoding never fails: encoding detection always yields a usable
/// guess and malformed sequences decode to U+FFFD.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The playlist path does not exist.
    #[error("playlist not found: {path}")]
    NotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// Reading the playlist failed.
    #[error("IO error reading {path}: {source}")]
    Io {
        /// The playlist path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The cancellation token fired mid-parse.
    #[error("playlist parsing cancelled")]
    Cancelled,
}

impl ParseError {
    /// Creates a not-found error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates an IO error, promoting `NotFound` kinds to [`ParseError::NotFound`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::NotFound { path };
        }
        Self::Io { path, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_not_found_display() {
        let err = ParseError::not_found("/tmp/missing.m3u");
        let msg = err.to_string();
        assert!(msg.contains("not found"), "Expected 'not found' in: {msg}");
        assert!(msg.contains("/tmp/missing.m3u"), "Expected path in: {msg}");
    }

    #[test]
    fn test_parse_error_io_promotes_not_found_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ParseError::io("/tmp/gone.m3u", io);
        assert!(matches!(err, ParseError::NotFound { .. }));
    }

    #[test]
    fn test_parse_error_io_keeps_other_kinds() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ParseError::io("/tmp/locked.m3u", io);
        assert!(matches!(err, ParseError::Io { .. }));
        assert!(err.to_string().contains("/tmp/locked.m3u"));
    }
}
