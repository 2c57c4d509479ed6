//! Error types for the report-forge library.
//!
//! Only two kinds of failure reach the caller of the renderer: a source file
//! that cannot be read, and a destination that cannot be written. Conversion
//! failures are turned into an HTML fallback inside
//! [`crate::renderer::DocumentRenderer`] and never surface as `Err`.

use std::path::PathBuf;

use thiserror::Error;

/// All errors produced by the report-forge library.
#[derive(Debug, Error)]
pub enum ForgeError {
    /// The Markdown source was missing, unreadable, or not UTF-8.
    #[error("failed to read '{path}': {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An output file or directory could not be written.
    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration file could not be parsed.
    #[error("invalid configuration '{path}': {detail}")]
    Config { path: PathBuf, detail: String },

    /// The selected conversion backend is not usable on this machine.
    #[error("backend '{backend}' is unavailable: {hint}")]
    BackendUnavailable { backend: String, hint: String },

    /// The backend ran but did not produce a PDF.
    #[error("backend '{backend}' failed: {detail}")]
    Conversion { backend: String, detail: String },

    /// A diagram marker refers to an asset id that is not registered.
    #[error("unknown diagram asset '{0}'")]
    UnknownDiagram(String),

    /// An SVG asset is not a self-contained, balanced document.
    #[error("malformed SVG '{id}': {detail}")]
    MalformedSvg { id: String, detail: String },
}

impl ForgeError {
    pub(crate) fn conversion(backend: &str, detail: impl Into<String>) -> Self {
        ForgeError::Conversion {
            backend: backend.to_string(),
            detail: detail.into(),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ForgeError::Write {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ForgeError>;
