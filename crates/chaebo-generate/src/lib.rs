//! Chaebo Chart Generation
//!
//! This crate turns an [`AudioSummary`](chaebo_spec::AudioSummary) into a
//! chart by prompting a text-generation backend.
//!
//! # Overview
//!
//! - **Prompt compiler**: deterministic prompt text for one chunk of onsets
//! - **Backends**: a hosted Gemini client and a local model server client
//!   behind one [`GenerationBackend`] trait
//! - **Extraction**: code-fence stripping and JSON array parsing of responses
//! - **Orchestrator**: concurrent per-chunk requests merged into one chart
//! - **Pipeline**: upload and regeneration flows with dummy fallback
//!
//! # Example
//!
//! ```
//! use chaebo_generate::prompt;
//! use chaebo_spec::{KeyMode, OnsetEvent};
//!
//! let onsets = [OnsetEvent::new(0.5, Some(60), 0.8)];
//! let text = prompt::compile(KeyMode::Four, 120.0, &onsets, "");
//!
//! assert!(text.contains("Key : 4"));
//! assert!(text.contains("BPM : 120"));
//! ```

pub mod backend;
pub mod error;
pub mod extract;
pub mod orchestrator;
pub mod pipeline;
pub mod prompt;
pub mod trace;

pub use backend::{
    ask, Backend, BackendConfig, BackendKind, GeminiBackend, GenerationBackend,
    GenerationRequest, LocalBackend, DEFAULT_LOCAL_MODEL, DEFAULT_MODEL, DEFAULT_TIMEOUT,
    GEMINI_API_KEY_VAR,
};
pub use error::{GenerationError, GenerationResult};
pub use extract::{extract_note_array, strip_code_fence};
pub use orchestrator::{chunk_onsets, BuildStats, ChartBuild, Orchestrator, DEFAULT_CHUNK_SIZE};
pub use pipeline::{ChartSource, FallbackReason, GenerateOptions, Pipeline, PipelineOutcome};
pub use trace::{RequestId, TraceWriter};
