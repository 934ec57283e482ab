//! Error types for chart generation.

use thiserror::Error;

/// Longest excerpt of backend text carried by an error.
pub const EXCERPT_CHARS: usize = 200;

/// Result type for generation operations.
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Errors raised while turning a prompt into a note list.
///
/// Inside the orchestrator every variant is fatal for one chunk only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    /// The backend credential is not configured.
    #[error("missing credential: set {variable}")]
    MissingCredential {
        /// Environment variable expected to hold the credential.
        variable: &'static str,
    },

    /// The request never produced an HTTP response.
    #[error("transport error: {message}")]
    Transport {
        /// Client message.
        message: String,
    },

    /// The backend did not answer in time.
    #[error("request timed out after {seconds}s")]
    Timeout {
        /// Configured timeout.
        seconds: u64,
    },

    /// The backend answered with a non-success status.
    #[error("backend returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Bounded prefix of the response body.
        body: String,
    },

    /// The backend returned no text.
    #[error("backend returned an empty response")]
    EmptyResponse,

    /// The unwrapped response is not valid JSON.
    #[error("response is not valid JSON ({message}): {excerpt}")]
    InvalidJson {
        /// Parser message.
        message: String,
        /// Bounded prefix of the original response text.
        excerpt: String,
    },

    /// The response parsed, but is not a JSON array.
    #[error("expected a JSON array of notes, found {found}")]
    NotAnArray {
        /// JSON type found instead.
        found: &'static str,
    },

    /// The backend envelope did not have the expected shape.
    #[error("malformed backend response: {message}")]
    MalformedResponse {
        /// What was missing or wrong.
        message: String,
    },
}

impl GenerationError {
    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a malformed response error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            GenerationError::MissingCredential { .. } => "GEN_001",
            GenerationError::Transport { .. } => "GEN_002",
            GenerationError::Timeout { .. } => "GEN_003",
            GenerationError::Status { .. } => "GEN_004",
            GenerationError::EmptyResponse => "GEN_005",
            GenerationError::InvalidJson { .. } => "GEN_006",
            GenerationError::NotAnArray { .. } => "GEN_007",
            GenerationError::MalformedResponse { .. } => "GEN_008",
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        GenerationError::transport(err.to_string())
    }
}

/// Returns at most [`EXCERPT_CHARS`] characters of `text`.
pub fn excerpt(text: &str) -> String {
    match text.char_indices().nth(EXCERPT_CHARS) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
