//! Chunk orchestrator.
//!
//! Splits the onsets of one song into bounded chunks, asks the backend for a
//! note list per chunk concurrently, and merges whatever came back. A failed
//! chunk loses its notes and nothing else.

use std::sync::Arc;
use std::time::Duration;

use chaebo_spec::{
    merge_notes, normalize_notes, AudioSummary, KeyChart, KeyMode, NoteEvent, OnsetEvent,
};
use futures_util::future::join_all;

use crate::backend::{GenerationBackend, GenerationRequest, DEFAULT_TIMEOUT};
use crate::error::{GenerationError, GenerationResult};
use crate::extract::extract_note_array;
use crate::prompt;
use crate::trace::{RequestId, TraceWriter};

/// Default number of onsets per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 300;

/// Splits onsets into consecutive chunks of at most `chunk_size` events.
///
/// Each forwarded onset carries only its rounded time, pitch and volume.
/// A `chunk_size` of zero is treated as one.
pub fn chunk_onsets(onsets: &[OnsetEvent], chunk_size: usize) -> Vec<Vec<OnsetEvent>> {
    onsets
        .chunks(chunk_size.max(1))
        .map(|chunk| {
            chunk
                .iter()
                .map(|o| OnsetEvent::new(o.time, o.pitch, o.volume))
                .collect()
        })
        .collect()
}

/// Outcome counters of one orchestrator run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Chunks sent to the backend.
    pub chunks_total: usize,
    /// Chunks whose request or parsing failed.
    pub chunks_failed: usize,
    /// Notes kept after merging.
    pub notes: usize,
}

impl BuildStats {
    /// Returns true if at least one chunk was sent and every one failed.
    pub fn all_failed(&self) -> bool {
        self.chunks_total > 0 && self.chunks_failed == self.chunks_total
    }
}

/// Merged chart for one key mode plus run statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartBuild {
    /// Key mode the chart was built for.
    pub mode: KeyMode,
    /// Merged chart.
    pub chart: KeyChart,
    /// Run statistics.
    pub stats: BuildStats,
}

/// Fans chunk requests out to one backend.
#[derive(Debug)]
pub struct Orchestrator<B> {
    backend: Arc<B>,
    timeout: Duration,
    system_instruction: Option<String>,
    trace: Option<TraceWriter>,
}

impl<B> Clone for Orchestrator<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            timeout: self.timeout,
            system_instruction: self.system_instruction.clone(),
            trace: self.trace.clone(),
        }
    }
}

impl<B: GenerationBackend + 'static> Orchestrator<B> {
    /// Creates an orchestrator with the default request timeout.
    pub fn new(backend: B) -> Self {
        Self::from_shared(Arc::new(backend))
    }

    /// Creates an orchestrator around an already shared backend.
    pub fn from_shared(backend: Arc<B>) -> Self {
        Self {
            backend,
            timeout: DEFAULT_TIMEOUT,
            system_instruction: None,
            trace: None,
        }
    }

    /// Builder method to set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder method to set the system instruction sent with every chunk.
    pub fn with_system_instruction(mut self, instruction: Option<String>) -> Self {
        self.system_instruction = instruction;
        self
    }

    /// Builder method to enable prompt/response trace files.
    pub fn with_trace(mut self, trace: Option<TraceWriter>) -> Self {
        self.trace = trace;
        self
    }

    /// Shared backend handle.
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Builds the chart for one key mode.
    ///
    /// Never fails: chunk errors are logged and counted in [`BuildStats`].
    pub async fn build_chart(
        &self,
        request_id: RequestId,
        mode: KeyMode,
        summary: &AudioSummary,
        extra_instructions: &str,
        chunk_size: usize,
    ) -> ChartBuild {
        let chunks = chunk_onsets(&summary.onsets, chunk_size);
        log::info!(
            "[{}] generating {} chart: {} onsets in {} chunks via {}",
            request_id,
            mode,
            summary.onsets.len(),
            chunks.len(),
            self.backend.name()
        );

        let handles: Vec<_> = chunks
            .iter()
            .enumerate()
            .map(|(index, chunk)| {
                let text = prompt::compile(mode, summary.tempo, chunk, extra_instructions);
                let request = GenerationRequest::new(text)
                    .with_system_instruction(self.system_instruction.clone());
                let task = ChunkTask {
                    backend: Arc::clone(&self.backend),
                    request,
                    request_id,
                    index,
                    timeout: self.timeout,
                    trace: self.trace.clone(),
                };
                tokio::spawn(task.run())
            })
            .collect();

        let mut stats = BuildStats {
            chunks_total: handles.len(),
            ..BuildStats::default()
        };
        let mut parts = Vec::with_capacity(handles.len());
        for (index, joined) in join_all(handles).await.into_iter().enumerate() {
            match joined {
                Ok(Ok(notes)) => {
                    log::debug!("[{}] chunk {}: {} notes", request_id, index, notes.len());
                    parts.push(notes);
                }
                Ok(Err(e)) => {
                    stats.chunks_failed += 1;
                    log::warn!(
                        "[{}] chunk {} dropped: {} ({})",
                        request_id,
                        index,
                        e,
                        e.code()
                    );
                }
                Err(e) => {
                    stats.chunks_failed += 1;
                    log::warn!("[{}] chunk {} task aborted: {}", request_id, index, e);
                }
            }
        }

        let chaebo = merge_notes(parts);
        stats.notes = chaebo.len();
        log::info!(
            "[{}] {} chart: {} notes, {}/{} chunks failed",
            request_id,
            mode,
            stats.notes,
            stats.chunks_failed,
            stats.chunks_total
        );

        ChartBuild {
            mode,
            chart: KeyChart::new(chaebo),
            stats,
        }
    }
}

/// Everything one chunk task owns.
struct ChunkTask<B> {
    backend: Arc<B>,
    request: GenerationRequest,
    request_id: RequestId,
    index: usize,
    timeout: Duration,
    trace: Option<TraceWriter>,
}

impl<B: GenerationBackend> ChunkTask<B> {
    async fn run(self) -> GenerationResult<Vec<NoteEvent>> {
        if let Some(trace) = &self.trace {
            trace
                .prompt(&self.request_id, self.index, &self.request.prompt)
                .await;
        }

        let text = tokio::time::timeout(self.timeout, self.backend.complete(&self.request))
            .await
            .map_err(|_| GenerationError::Timeout {
                seconds: self.timeout.as_secs(),
            })??;

        if let Some(trace) = &self.trace {
            trace.response(&self.request_id, self.index, &text).await;
        }

        let values = extract_note_array(&text)?;
        Ok(normalize_notes(&values))
    }
}
