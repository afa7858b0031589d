//! Error types.
//!
//! Cache misses are not errors and never show up here. The only failures the
//! cache layer reports are persistence failures, and those are logged and
//! swallowed by the service. Template errors are per-segment and recoverable.

use std::path::PathBuf;

use thiserror::Error;

/// Failures of the cache persistence layer.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode cache snapshot: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("corrupt cache file {path}: {source}")]
    Deserialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures while compiling or evaluating a template.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TemplateError {
    #[error("malformed template {source_text:?}: {message}")]
    Parse {
        source_text: String,
        message: String,
    },

    #[error("missing field {0}")]
    MissingField(String),

    #[error("function {0:?} not defined")]
    UnknownFunction(String),

    #[error("wrong arguments for {function}: {message}")]
    BadArgs { function: String, message: String },

    #[error("can't give argument to non-function {0}")]
    NotCallable(String),

    #[error("{0}")]
    Eval(String),
}

impl TemplateError {
    pub(crate) fn bad_args(function: &str, message: impl Into<String>) -> Self {
        Self::BadArgs {
            function: function.to_string(),
            message: message.into(),
        }
    }
}

/// Failures of system probes such as memory or battery readings.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),

    #[error("no {0} found")]
    NotFound(&'static str),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {what}: {message}")]
    Parse { what: &'static str, message: String },
}
