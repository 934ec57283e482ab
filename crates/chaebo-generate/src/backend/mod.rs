//! Generation backends.
//!
//! A backend turns a prompt into raw text. Everything after that, from fence
//! stripping to note validation, is shared and lives outside this module.

mod gemini;
mod local;

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

pub use gemini::{GeminiBackend, GEMINI_API_KEY_VAR, GEMINI_ENDPOINT};
pub use local::{LocalBackend, LOCAL_ENDPOINT};

use crate::error::{GenerationError, GenerationResult};

/// Default model identifier for the hosted backend.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Default model identifier for the local backend.
pub const DEFAULT_LOCAL_MODEL: &str = "llama3";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// One prompt sent to a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Prompt text.
    pub prompt: String,
    /// Optional system instruction sent alongside the prompt.
    pub system_instruction: Option<String>,
}

impl GenerationRequest {
    /// Creates a request with no system instruction.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_instruction: None,
        }
    }

    /// Builder method to attach a system instruction.
    pub fn with_system_instruction(mut self, instruction: Option<String>) -> Self {
        self.system_instruction = instruction.filter(|s| !s.trim().is_empty());
        self
    }
}

/// A text-generation service.
///
/// Implementations must be cheap to share across the concurrent chunk tasks
/// of one orchestrator run.
pub trait GenerationBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Sends one request and returns the raw response text.
    fn complete(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = GenerationResult<String>> + Send;
}

/// Which backend implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Hosted Gemini `generateContent` API.
    #[default]
    Gemini,
    /// Local model server speaking the Ollama `/api/generate` protocol.
    Local,
}

impl BackendKind {
    /// Returns the canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Gemini => "gemini",
            BackendKind::Local => "local",
        }
    }

    /// Model used when none is configured.
    pub fn default_model(&self) -> &'static str {
        match self {
            BackendKind::Gemini => DEFAULT_MODEL,
            BackendKind::Local => DEFAULT_LOCAL_MODEL,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "cloud" => Ok(BackendKind::Gemini),
            "local" | "ollama" => Ok(BackendKind::Local),
            other => Err(format!(
                "unknown backend '{}' (expected 'gemini' or 'local')",
                other
            )),
        }
    }
}

/// Backend selection and request limits.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    /// Backend implementation.
    pub kind: BackendKind,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature, if overridden.
    pub temperature: Option<f32>,
    /// Maximum response length in tokens, if limited.
    pub max_output_tokens: Option<u32>,
    /// System instruction sent with every request.
    pub system_instruction: Option<String>,
    /// Base URL override.
    pub endpoint: Option<String>,
    /// Credential for hosted backends.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::for_kind(BackendKind::default())
    }
}

impl BackendConfig {
    /// Default settings for a backend, using its default model.
    pub fn for_kind(kind: BackendKind) -> Self {
        Self {
            kind,
            model: kind.default_model().to_string(),
            temperature: None,
            max_output_tokens: None,
            system_instruction: None,
            endpoint: None,
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Builds a request for `prompt` carrying the configured system instruction.
    pub fn request(&self, prompt: impl Into<String>) -> GenerationRequest {
        GenerationRequest::new(prompt).with_system_instruction(self.system_instruction.clone())
    }
}

/// Builds the HTTP client shared by the concrete backends.
fn http_client(timeout: Duration) -> GenerationResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(GenerationError::from)
}

/// Maps a client error, keeping timeouts distinct.
fn map_request_error(err: reqwest::Error, timeout: Duration) -> GenerationError {
    if err.is_timeout() {
        GenerationError::Timeout {
            seconds: timeout.as_secs(),
        }
    } else {
        GenerationError::from(err)
    }
}

/// Either concrete backend, chosen at runtime from a [`BackendConfig`].
#[derive(Debug, Clone)]
pub enum Backend {
    /// Hosted backend.
    Gemini(GeminiBackend),
    /// Local backend.
    Local(LocalBackend),
}

impl Backend {
    /// Creates the backend selected by `config`.
    ///
    /// A missing cloud credential is not an error here; it surfaces on the
    /// first request.
    pub fn from_config(config: &BackendConfig) -> GenerationResult<Self> {
        Ok(match config.kind {
            BackendKind::Gemini => Backend::Gemini(GeminiBackend::new(config)?),
            BackendKind::Local => Backend::Local(LocalBackend::new(config)?),
        })
    }
}

impl GenerationBackend for Backend {
    fn name(&self) -> &str {
        match self {
            Backend::Gemini(b) => b.name(),
            Backend::Local(b) => b.name(),
        }
    }

    async fn complete(&self, request: &GenerationRequest) -> GenerationResult<String> {
        match self {
            Backend::Gemini(b) => b.complete(request).await,
            Backend::Local(b) => b.complete(request).await,
        }
    }
}

/// Sends a raw prompt and returns the backend text unchanged.
///
/// Errors are returned to the caller as is; there is no fallback.
pub async fn ask<B: GenerationBackend>(
    backend: &B,
    request: &GenerationRequest,
) -> GenerationResult<String> {
    let text = backend.complete(request).await?;
    if text.trim().is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(text)
}
