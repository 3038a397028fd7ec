//! Errors raised while loading or saving model files.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed {what}: {source}")]
    Parse {
        what: &'static str,
        source: serde_json::Error,
    },

    #[error("Invalid {what}: {message}")]
    Invalid { what: &'static str, message: String },
}

pub type ModelResult<T> = Result<T, ModelError>;

pub(crate) fn read_json<T: serde::de::DeserializeOwned>(
    path: &std::path::Path,
    what: &'static str,
) -> ModelResult<T> {
    let content = std::fs::read_to_string(path).map_err(|source| ModelError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ModelError::Parse { what, source })
}

pub(crate) fn write_json<T: serde::Serialize>(
    path: &std::path::Path,
    what: &'static str,
    value: &T,
) -> ModelResult<()> {
    let json =
        serde_json::to_string_pretty(value).map_err(|source| ModelError::Parse { what, source })?;
    std::fs::write(path, json).map_err(|source| ModelError::Write {
        path: path.to_path_buf(),
        source,
    })
}
