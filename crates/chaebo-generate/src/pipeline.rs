//! Upload and regeneration flows with dummy fallback.
//!
//! The caller of these flows always receives a chart document. When feature
//! extraction fails, generation is disabled, or no chunk produced a note, the
//! fixed dummy chart stands in for the generated one.

use std::path::PathBuf;
use std::sync::Arc;

use chaebo_analysis::{analyze_bytes, AnalysisConfig, AnalysisError};
use chaebo_spec::{lint_key_chart, AudioSummary, ChartDocument, KeyChart, KeyMode};
use thiserror::Error;

use crate::backend::GenerationBackend;
use crate::orchestrator::{BuildStats, Orchestrator, DEFAULT_CHUNK_SIZE};
use crate::trace::{RequestId, TraceWriter};

/// Per-request generation options.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOptions {
    /// Key mode to generate.
    pub key_mode: KeyMode,
    /// Caller instructions appended to every prompt.
    pub extra_prompt: String,
    /// Slow rate used for onset detection, in (0, 1].
    pub slow_rate: f64,
    /// Onsets per generation request.
    pub chunk_size: usize,
    /// Maximum onsets extracted from the audio.
    pub max_onsets: usize,
    /// When false, the dummy chart is used without calling any backend.
    pub use_llm: bool,
    /// Directory for prompt/response trace files.
    pub trace_dir: Option<PathBuf>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            key_mode: KeyMode::Four,
            extra_prompt: String::new(),
            slow_rate: 1.0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_onsets: chaebo_analysis::DEFAULT_MAX_ONSETS,
            use_llm: true,
            trace_dir: None,
        }
    }
}

impl GenerateOptions {
    /// Builder method to set the key mode.
    pub fn with_key_mode(mut self, key_mode: KeyMode) -> Self {
        self.key_mode = key_mode;
        self
    }

    /// Analysis parameters implied by these options.
    pub fn analysis_config(&self) -> AnalysisConfig {
        AnalysisConfig::default()
            .with_slow_rate(self.slow_rate)
            .with_max_onsets(self.max_onsets)
    }
}

/// Why the dummy chart was used.
#[derive(Debug, Error)]
pub enum FallbackReason {
    /// The caller disabled generation.
    #[error("generation disabled")]
    Disabled,

    /// Feature extraction failed.
    #[error("feature extraction failed: {0}")]
    Analysis(#[from] AnalysisError),

    /// The blocking analysis task did not complete.
    #[error("analysis task failed: {0}")]
    AnalysisTask(String),

    /// Every chunk failed, or the merged chart is empty.
    #[error("no notes generated ({failed} of {total} chunks failed)")]
    NoNotes {
        /// Failed chunks.
        failed: usize,
        /// Chunks sent.
        total: usize,
    },
}

/// Where a chart came from.
#[derive(Debug)]
pub enum ChartSource {
    /// Generated by the backend.
    Generated(BuildStats),
    /// Replaced by the dummy chart.
    Fallback(FallbackReason),
}

impl ChartSource {
    /// Returns true if the dummy chart was used.
    pub fn is_fallback(&self) -> bool {
        matches!(self, ChartSource::Fallback(_))
    }
}

/// Result of an upload or regeneration.
#[derive(Debug)]
pub struct PipelineOutcome {
    /// Correlation id used in logs and trace files.
    pub request_id: RequestId,
    /// Document to persist.
    pub document: ChartDocument,
    /// Whether the targeted key was generated or substituted.
    pub source: ChartSource,
    /// Analysis output, when extraction ran and succeeded.
    pub summary: Option<AudioSummary>,
}

/// Audio analysis followed by chunked generation.
#[derive(Debug)]
pub struct Pipeline<B> {
    orchestrator: Orchestrator<B>,
}

impl<B> Clone for Pipeline<B> {
    fn clone(&self) -> Self {
        Self {
            orchestrator: self.orchestrator.clone(),
        }
    }
}

impl<B: GenerationBackend + 'static> Pipeline<B> {
    /// Creates a pipeline around an orchestrator.
    pub fn new(orchestrator: Orchestrator<B>) -> Self {
        Self { orchestrator }
    }

    /// Creates a pipeline for a backend with default orchestration settings.
    pub fn with_backend(backend: B) -> Self {
        Self::new(Orchestrator::new(backend))
    }

    /// Orchestrator used for generation.
    pub fn orchestrator(&self) -> &Orchestrator<B> {
        &self.orchestrator
    }

    /// Runs feature extraction on a blocking worker thread.
    pub async fn analyze(
        &self,
        audio: Arc<[u8]>,
        extension: Option<String>,
        config: AnalysisConfig,
    ) -> Result<AudioSummary, FallbackReason> {
        let joined = tokio::task::spawn_blocking(move || {
            analyze_bytes(&audio, extension.as_deref(), &config)
        })
        .await;
        match joined {
            Ok(result) => Ok(result?),
            Err(e) => Err(FallbackReason::AnalysisTask(e.to_string())),
        }
    }

    /// Produces the chart for `options.key_mode`, or the reason it could not.
    async fn generate_key(
        &self,
        request_id: RequestId,
        audio: Arc<[u8]>,
        extension: Option<String>,
        options: &GenerateOptions,
    ) -> (Result<(KeyChart, BuildStats), FallbackReason>, Option<AudioSummary>) {
        if !options.use_llm {
            return (Err(FallbackReason::Disabled), None);
        }

        let summary = match self
            .analyze(audio, extension, options.analysis_config())
            .await
        {
            Ok(summary) => summary,
            Err(reason) => return (Err(reason), None),
        };
        log::info!(
            "[{}] analysis: {} BPM, {} onsets",
            request_id,
            summary.tempo,
            summary.onsets.len()
        );

        let orchestrator = match &options.trace_dir {
            Some(dir) => self
                .orchestrator
                .clone()
                .with_trace(Some(TraceWriter::new(dir.clone()))),
            None => self.orchestrator.clone(),
        };
        let build = orchestrator
            .build_chart(
                request_id,
                options.key_mode,
                &summary,
                &options.extra_prompt,
                options.chunk_size,
            )
            .await;

        if build.stats.all_failed() || build.chart.chaebo.is_empty() {
            let reason = FallbackReason::NoNotes {
                failed: build.stats.chunks_failed,
                total: build.stats.chunks_total,
            };
            return (Err(reason), Some(summary));
        }

        let report = lint_key_chart(options.key_mode, &build.chart, Some(&summary.onsets));
        if !report.is_clean() {
            log::info!(
                "[{}] {} chart lint: {} issues ({} warnings)",
                request_id,
                options.key_mode,
                report.issues.len(),
                report.warning_count()
            );
        }

        (Ok((build.chart, build.stats)), Some(summary))
    }

    /// Builds the document for a newly uploaded song.
    ///
    /// On success the document holds only the requested key; on fallback it
    /// holds the dummy chart under every key.
    pub async fn upload(
        &self,
        audio: Arc<[u8]>,
        extension: Option<String>,
        options: &GenerateOptions,
    ) -> PipelineOutcome {
        let request_id = RequestId::new();
        let (result, summary) = self
            .generate_key(request_id, audio, extension, options)
            .await;

        let (document, source) = match result {
            Ok((chart, stats)) => (
                ChartDocument::fragment(options.key_mode, &chart),
                ChartSource::Generated(stats),
            ),
            Err(reason) => {
                log::warn!("[{}] using dummy chart: {}", request_id, reason);
                (ChartDocument::dummy(), ChartSource::Fallback(reason))
            }
        };

        PipelineOutcome {
            request_id,
            document,
            source,
            summary,
        }
    }

    /// Regenerates one key of an existing document.
    ///
    /// Every other key of `existing` is carried over unchanged. On fallback
    /// the targeted key receives the dummy chart.
    pub async fn regenerate(
        &self,
        existing: &ChartDocument,
        audio: Arc<[u8]>,
        extension: Option<String>,
        options: &GenerateOptions,
    ) -> PipelineOutcome {
        let request_id = RequestId::new();
        let (result, summary) = self
            .generate_key(request_id, audio, extension, options)
            .await;

        let mut document = existing.clone();
        let source = match result {
            Ok((chart, stats)) => {
                document.replace_key(options.key_mode, &chart);
                ChartSource::Generated(stats)
            }
            Err(reason) => {
                log::warn!(
                    "[{}] using dummy chart for {}: {}",
                    request_id,
                    options.key_mode,
                    reason
                );
                document.replace_key(options.key_mode, &KeyChart::dummy());
                ChartSource::Fallback(reason)
            }
        };

        PipelineOutcome {
            request_id,
            document,
            source,
            summary,
        }
    }
}
