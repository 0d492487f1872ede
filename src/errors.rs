//! Error Types
//!
//! Failure modes of the pipeline cache. Backend implementations report
//! failures as an opaque [`BackendError`]; the cache wraps them in
//! [`PipelineError`] with the stage or pipeline context they occurred in.
//!
//! Reference-count underflow is deliberately *not* represented here. A
//! double release is a programming error, not a runtime condition: it
//! trips a `debug_assert!` in debug builds and is clamped (with an error
//! log) in release builds, so counts never go negative.

use thiserror::Error;

use crate::pipeline::PipelineKind;
use crate::stage::StageKind;

/// Opaque failure reported by a [`Backend`] implementation.
///
/// The cache does not interpret the message; it only attaches context and
/// forwards it to the caller.
///
/// [`Backend`]: crate::backend::Backend
#[derive(Error, Debug)]
#[error("{message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The backend-provided failure description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The error type for pipeline cache operations.
#[derive(Error, Debug)]
pub enum PipelineError {
    // ========================================================================
    // Shader Stage Errors
    // ========================================================================
    /// The backend rejected the source text of a shader stage.
    #[error("Failed to compile {kind} shader stage: {source}")]
    StageCompile {
        /// Stage kind that failed to compile.
        kind: StageKind,
        /// The backend's failure report.
        source: BackendError,
    },

    // ========================================================================
    // Pipeline Errors
    // ========================================================================
    /// The stages compiled, but the backend rejected the stage/state
    /// combination.
    #[error("Failed to create {kind} pipeline: {source}")]
    PipelineCreate {
        /// Pipeline kind that failed to build.
        kind: PipelineKind,
        /// The backend's failure report.
        source: BackendError,
    },
}

/// Alias for `Result<T, PipelineError>`.
pub type Result<T> = std::result::Result<T, PipelineError>;
