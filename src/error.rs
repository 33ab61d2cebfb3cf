//! Error types for the assistant core.
//!
//! One crate-wide enum keeps the failure taxonomy explicit: callers match
//! on variants to decide between local recovery (analyzer parse failures,
//! per-specialist isolation) and propagation (embedding failures, which
//! must never be conflated with an empty result set).

use thiserror::Error;

/// Errors produced by the orchestration and retrieval core.
#[derive(Debug, Error)]
pub enum Error {
    /// No API key was provided via builder or environment.
    #[error("no API key configured (set OPENAI_API_KEY or VIAJERO_API_KEY)")]
    ApiKeyMissing,

    /// The configured provider name is not supported.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// The provider name that failed to resolve.
        name: String,
    },

    /// A request to the hosted reasoning service failed.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Underlying error description.
        message: String,
        /// HTTP status code, when one was received.
        status: Option<u16>,
    },

    /// A model response could not be parsed into the expected shape.
    #[error("response parse failed: {message}")]
    ResponseParse {
        /// What went wrong during parsing.
        message: String,
        /// The raw response content, for diagnostics.
        content: String,
    },

    /// The embedding service failed or returned an unusable vector.
    ///
    /// Callers must propagate this; substituting a zero vector would turn
    /// a service outage into silently wrong search results.
    #[error("embedding failed: {message}")]
    Embedding {
        /// Underlying error description.
        message: String,
    },

    /// The vector datastore rejected or failed a similarity search.
    #[error("search failed: {message}")]
    Search {
        /// Underlying error description.
        message: String,
    },

    /// A structured-data (NL-to-SQL) lookup failed.
    #[error("structured query failed: {message}")]
    StructuredData {
        /// Underlying error description.
        message: String,
    },

    /// A tool call could not be executed.
    #[error("tool '{name}' failed: {message}")]
    ToolExecution {
        /// Name of the tool that failed.
        name: String,
        /// Underlying error description.
        message: String,
    },

    /// The agentic tool loop exceeded its iteration budget.
    #[error("tool loop exceeded {max_iterations} iterations")]
    ToolLoopExceeded {
        /// The configured iteration limit.
        max_iterations: usize,
    },

    /// A failure in orchestration machinery (task join, dispatch, state).
    #[error("orchestration error: {message}")]
    Orchestration {
        /// Underlying error description.
        message: String,
    },
}

impl Error {
    /// Shorthand for an [`Error::Orchestration`] from any displayable cause.
    pub fn orchestration(message: impl Into<String>) -> Self {
        Self::Orchestration {
            message: message.into(),
        }
    }
}
