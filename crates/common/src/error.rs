//! Error types shared across Reel crates.

use std::path::PathBuf;

/// Top-level error type for Reel operations.
#[derive(Debug, thiserror::Error)]
pub enum ReelError {
    #[error("Processing error: {message}")]
    Processing { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Project error: {message}")]
    Project { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ReelError.
pub type ReelResult<T> = Result<T, ReelError>;

impl ReelError {
    pub fn processing(msg: impl Into<String>) -> Self {
        Self::Processing {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn project(msg: impl Into<String>) -> Self {
        Self::Project {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// True when this error is a caller-requested export cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Export(e) if e.is_cancelled())
    }
}

/// Failure (or cancellation) of a single export attempt.
///
/// Every variant carries enough context for the caller to log the failure
/// meaningfully: which stream, which frame, and the backend's own status text.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// A required track is absent from a source file.
    #[error("Source track missing: {track}")]
    SourceTrackMissing { track: String },

    /// A decoder reported a failure while reading a source stream.
    #[error("Decode failed on {stream} stream: {message}")]
    DecodeFailed { stream: String, message: String },

    /// The encoder or container writer reported a failure.
    #[error("Encode failed{}: {status}", describe_frame(.frame_index))]
    EncodeFailed {
        status: String,
        frame_index: Option<u64>,
    },

    /// The caller cancelled the export.
    #[error("Export cancelled")]
    Cancelled,

    /// A buffer pool or encoder could not allocate what it needed.
    #[error("Resources exhausted: {message}")]
    ResourceExhausted { message: String },

    /// The export request itself is not satisfiable.
    #[error("Invalid export request: {message}")]
    InvalidRequest { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias using ExportError.
pub type ExportResult<T> = Result<T, ExportError>;

impl ExportError {
    pub fn source_track_missing(track: impl Into<String>) -> Self {
        Self::SourceTrackMissing {
            track: track.into(),
        }
    }

    pub fn decode(stream: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::DecodeFailed {
            stream: stream.into(),
            message: msg.into(),
        }
    }

    pub fn encode(status: impl Into<String>) -> Self {
        Self::EncodeFailed {
            status: status.into(),
            frame_index: None,
        }
    }

    pub fn encode_at(frame_index: u64, status: impl Into<String>) -> Self {
        Self::EncodeFailed {
            status: status.into(),
            frame_index: Some(frame_index),
        }
    }

    pub fn exhausted(msg: impl Into<String>) -> Self {
        Self::ResourceExhausted {
            message: msg.into(),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: msg.into(),
        }
    }

    /// Cancellation is a first-class outcome, not a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

fn describe_frame(frame_index: &Option<u64>) -> String {
    match frame_index {
        Some(index) => format!(" at frame {index}"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_error_mentions_frame() {
        let err = ExportError::encode_at(42, "pipe closed");
        assert_eq!(err.to_string(), "Encode failed at frame 42: pipe closed");

        let err = ExportError::encode("exit status 1");
        assert_eq!(err.to_string(), "Encode failed: exit status 1");
    }

    #[test]
    fn test_cancelled_is_distinct() {
        assert!(ExportError::Cancelled.is_cancelled());
        assert!(!ExportError::decode("screen", "eof").is_cancelled());

        let wrapped: ReelError = ExportError::Cancelled.into();
        assert!(wrapped.is_cancelled());
        assert!(!ReelError::render("boom").is_cancelled());
    }
}
