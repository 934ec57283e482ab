//! Request identifiers and prompt/response trace files.

use std::fmt;
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Correlation id for one upload or regeneration.
///
/// Passed explicitly to every chunk task; used in log lines and trace file
/// names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Writes `<request-id>-<chunk>-prompt.txt` and `-response.txt` files.
///
/// Tracing is diagnostic only: write failures are logged, never returned.
#[derive(Debug, Clone)]
pub struct TraceWriter {
    dir: PathBuf,
}

impl TraceWriter {
    /// Creates a writer targeting `dir` (created on first write).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory receiving the trace files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the trace file for one chunk and stage.
    pub fn path(&self, request_id: &RequestId, chunk: usize, stage: &str) -> PathBuf {
        self.dir.join(format!("{}-{}-{}.txt", request_id, chunk, stage))
    }

    /// Records the prompt sent for a chunk.
    pub async fn prompt(&self, request_id: &RequestId, chunk: usize, text: &str) {
        self.write(self.path(request_id, chunk, "prompt"), text).await;
    }

    /// Records the raw response received for a chunk.
    pub async fn response(&self, request_id: &RequestId, chunk: usize, text: &str) {
        self.write(self.path(request_id, chunk, "response"), text).await;
    }

    async fn write(&self, path: PathBuf, text: &str) {
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            log::warn!("cannot create trace dir {}: {}", self.dir.display(), e);
            return;
        }
        if let Err(e) = tokio::fs::write(&path, text).await {
            log::warn!("cannot write trace file {}: {}", path.display(), e);
        }
    }
}
