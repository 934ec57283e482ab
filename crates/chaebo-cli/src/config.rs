//! Shared command-line option groups and their conversion to library configs.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chaebo_analysis::{AnalysisConfig, DEFAULT_MAX_ONSETS};
use chaebo_generate::{
    Backend, BackendConfig, BackendKind, GenerateOptions, Orchestrator, Pipeline,
    DEFAULT_CHUNK_SIZE, GEMINI_API_KEY_VAR,
};
use chaebo_spec::KeyMode;
use clap::Args;

/// Default data directory (`<platform data dir>/chaebo`).
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chaebo")
}

/// Resolves `--data-dir`, falling back to [`default_data_dir`].
pub fn resolve_data_dir(flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(default_data_dir)
}

/// Backend selection flags.
#[derive(Debug, Clone, Args)]
pub struct BackendArgs {
    /// Generation backend (gemini or local)
    #[arg(long, env = "CHAEBO_BACKEND", default_value = "gemini")]
    pub backend: BackendKind,

    /// Model identifier [default: gemini-2.0-flash, or llama3 for local]
    #[arg(long, env = "CHAEBO_MODEL")]
    pub model: Option<String>,

    /// Backend base URL
    #[arg(long, env = "CHAEBO_ENDPOINT")]
    pub endpoint: Option<String>,

    /// API key for the hosted backend
    #[arg(long, env = GEMINI_API_KEY_VAR, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Maximum response length in tokens
    #[arg(long)]
    pub max_output_tokens: Option<u32>,

    /// System instruction sent with every request
    #[arg(long)]
    pub system_instruction: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 120)]
    pub timeout_secs: u64,
}

impl BackendArgs {
    /// Backend configuration described by these flags.
    pub fn to_config(&self) -> BackendConfig {
        BackendConfig {
            kind: self.backend,
            model: self
                .model
                .clone()
                .unwrap_or_else(|| self.backend.default_model().to_string()),
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
            system_instruction: self.system_instruction.clone(),
            endpoint: self.endpoint.clone(),
            api_key: self.api_key.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    /// Builds the backend selected by these flags.
    pub fn backend(&self) -> Result<Backend> {
        Backend::from_config(&self.to_config()).context("Failed to create generation backend")
    }

    /// Builds a pipeline around the selected backend.
    pub fn pipeline(&self) -> Result<Pipeline<Backend>> {
        let config = self.to_config();
        let orchestrator = Orchestrator::new(self.backend()?)
            .with_timeout(config.timeout)
            .with_system_instruction(config.system_instruction);
        Ok(Pipeline::new(orchestrator))
    }
}

/// Onset detection flags.
#[derive(Debug, Clone, Args)]
pub struct AnalysisArgs {
    /// Slow rate for onset detection, in (0, 1]
    #[arg(long, default_value_t = 1.0)]
    pub slow_rate: f64,

    /// Maximum number of onsets to extract
    #[arg(long, default_value_t = DEFAULT_MAX_ONSETS)]
    pub max_onsets: usize,
}

impl AnalysisArgs {
    /// Analysis parameters described by these flags.
    pub fn to_config(&self) -> AnalysisConfig {
        AnalysisConfig::default()
            .with_slow_rate(self.slow_rate)
            .with_max_onsets(self.max_onsets)
    }
}

/// Chart generation flags.
#[derive(Debug, Clone, Args)]
pub struct GenerateArgs {
    /// Key mode (4, 5 or 6, also accepts 4key)
    #[arg(short, long, default_value = "4")]
    pub key: KeyMode,

    /// Extra instructions appended to every prompt
    #[arg(long, default_value = "")]
    pub extra_prompt: String,

    #[command(flatten)]
    pub analysis: AnalysisArgs,

    /// Onsets per generation request
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Skip generation and store the dummy chart
    #[arg(long)]
    pub no_llm: bool,

    /// Directory receiving prompt/response trace files
    #[arg(long)]
    pub trace_dir: Option<PathBuf>,
}

impl GenerateArgs {
    /// Generation options described by these flags.
    pub fn to_options(&self) -> GenerateOptions {
        GenerateOptions {
            key_mode: self.key,
            extra_prompt: self.extra_prompt.clone(),
            slow_rate: self.analysis.slow_rate,
            chunk_size: self.chunk_size,
            max_onsets: self.analysis.max_onsets,
            use_llm: !self.no_llm,
            trace_dir: self.trace_dir.clone(),
        }
    }
}

/// Builds the runtime that drives the async pipeline.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")
}
