//! Error types for the ultrathink core library.

#[cfg(feature = "python")]
use pyo3::exceptions::{PyIOError, PyImportError, PyRuntimeError, PyValueError};
#[cfg(feature = "python")]
use pyo3::PyErr;

/// Top-level error enum for the ultrathink core library.
#[derive(Debug, thiserror::Error)]
pub enum UltrathinkError {
    /// The target package could not be located or loaded.
    #[error("Import error: {0}")]
    Import(String),

    /// A referenced snapshot, version or option value does not exist or is invalid.
    #[error("Value error: {0}")]
    Value(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(feature = "python")]
impl From<UltrathinkError> for PyErr {
    fn from(err: UltrathinkError) -> PyErr {
        match &err {
            UltrathinkError::Import(_) => PyImportError::new_err(err.to_string()),
            UltrathinkError::Value(_)
            | UltrathinkError::Parse(_)
            | UltrathinkError::Config(_)
            | UltrathinkError::Json(_)
            | UltrathinkError::Toml(_) => PyValueError::new_err(err.to_string()),
            UltrathinkError::Io(_) => PyIOError::new_err(err.to_string()),
            UltrathinkError::Sqlite(_) => PyRuntimeError::new_err(err.to_string()),
        }
    }
}

pub type UltrathinkResult<T> = Result<T, UltrathinkError>;
