use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading an env file.
///
/// Parsing itself never fails: blank lines, comments and lines without `=`
/// are skipped, and duplicate keys resolve to the last value. Every variant
/// here comes from locating, reading or decoding the file.
#[derive(Debug, Error)]
pub enum Error {
    #[error("file does not exist in the path provided: {}", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid UTF-8 input: {0}")]
    InvalidEncoding(#[from] std::str::Utf8Error),
}

impl Error {
    /// Whether this error is the missing-file condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::FileNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_the_path() {
        let err = Error::FileNotFound {
            path: PathBuf::from("missing.env"),
        };
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "file does not exist in the path provided: missing.env"
        );
    }

    #[test]
    fn io_errors_are_not_reported_as_missing_file() {
        let err = Error::from(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert!(!err.is_not_found());
        assert!(err.to_string().starts_with("I/O error:"));
    }
}
