use std::time::Duration;

use thiserror::Error;

/// Failure to build or perform an HTTP exchange. Carried on the response
/// value instead of being returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("invalid request: {0}")]
    Build(String),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("request failed: reading response body: {0}")]
    Body(String),
}

/// Script-level error recorded on a `TestResult`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("script timed out after {} ms", .0.as_millis())]
    Timeout(Duration),
    #[error("script error: {0}")]
    Runtime(String),
    #[error("invalid pm.test call: {0}")]
    InvalidTest(String),
    #[error("sandbox setup failed: {0}")]
    Setup(String),
}

impl ScriptError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ScriptError::Timeout(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path '{0}' not found")]
    NotFound(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssertionError {
    #[error("failed to parse JSON: {0}")]
    InvalidJson(String),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("expected {subject} to be {expected} but got {actual}")]
    Mismatch {
        subject: String,
        expected: String,
        actual: String,
    },
    #[error("expected response to have header '{0}'")]
    MissingHeader(String),
}
