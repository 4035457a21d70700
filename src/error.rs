//! Error types for the zipsheet library

use thiserror::Error;

/// Result type alias for zipsheet operations
pub type Result<T> = std::result::Result<T, XlsxError>;

/// Main error type for all archive and workbook operations
#[derive(Error, Debug)]
pub enum XlsxError {
    /// IO error wrapper
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The byte buffer does not hold a coherent ZIP structure
    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    /// Entry uses a compression method other than stored (0) or deflate (8)
    #[error("Unsupported compression method: {0}")]
    UnsupportedCompression(u16),

    /// Compressed output or decompression requested without a DEFLATE backend
    #[error("DEFLATE compression is not available in this build")]
    CompressionUnavailable,

    /// Decoded entry does not match the CRC32 declared in its header
    #[error("Checksum mismatch for '{path}': expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        path: String,
        expected: u32,
        actual: u32,
    },

    /// A required package part is absent from the archive
    #[error("Missing package part: {0}")]
    MissingPart(String),

    /// Invalid format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Sheet name rejected by Excel's naming rules
    #[error("Invalid sheet name '{0}'")]
    InvalidSheetName(String),

    /// ZIP32 size or count limit exceeded
    #[error("Archive limit exceeded: {0}")]
    LimitExceeded(String),

    /// A background task failed before producing its result
    #[error("Background task failed: {0}")]
    Task(String),
}

impl From<std::string::FromUtf8Error> for XlsxError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        XlsxError::InvalidFormat(format!("invalid UTF-8: {}", err))
    }
}

impl From<std::str::Utf8Error> for XlsxError {
    fn from(err: std::str::Utf8Error) -> Self {
        XlsxError::InvalidFormat(format!("invalid UTF-8: {}", err))
    }
}

#[cfg(feature = "async")]
impl From<tokio::task::JoinError> for XlsxError {
    fn from(err: tokio::task::JoinError) -> Self {
        XlsxError::Task(err.to_string())
    }
}
