//! File-backed song store.
//!
//! Layout under the data directory:
//!
//! - `uploads/{song_id}.{mp3|wav}`: the uploaded audio
//! - `charts/{song_id}.json`: the chart document, pretty-printed
//! - `songs.json`: the metadata registry, keyed by song id

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chaebo_spec::{ChartDocument, SongMetadata};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Audio file extensions accepted on upload.
pub const AUDIO_EXTENSIONS: [&str; 2] = ["mp3", "wav"];

const REGISTRY_FILE: &str = "songs.json";

/// Store lookups that found nothing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No audio and no chart exist for the song.
    #[error("song not found: {song_id}")]
    SongNotFound {
        /// Requested song id.
        song_id: String,
    },

    /// The song exists but lacks a stored file.
    #[error("no stored {what} for song {song_id}")]
    MissingFile {
        /// Song whose file is missing.
        song_id: String,
        /// Kind of file, `"audio"` or `"chart"`.
        what: &'static str,
    },

    /// Upload file name has an extension other than mp3 or wav.
    #[error("unsupported audio file '{file_name}' (expected .mp3 or .wav)")]
    UnsupportedAudio {
        /// File name as given by the uploader.
        file_name: String,
    },
}

/// Returns the lowercase audio extension of an upload file name.
pub fn audio_extension(file_name: &str) -> Result<String, StoreError> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|e| AUDIO_EXTENSIONS.contains(&e.as_str()))
        .ok_or_else(|| StoreError::UnsupportedAudio {
            file_name: file_name.to_string(),
        })
}

/// Display name for an upload: the trimmed given name, else the file stem.
pub fn display_name(given: Option<&str>, file_name: &str) -> String {
    match given.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name)
            .to_string(),
    }
}

/// One registry entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongRecord {
    /// Song id, display name and stored key modes.
    #[serde(flatten)]
    pub meta: SongMetadata,
    /// Time of the last upload or regeneration.
    pub updated_at: DateTime<Utc>,
}

impl SongRecord {
    /// Creates a record stamped with the current time.
    pub fn new(meta: SongMetadata) -> Self {
        Self {
            meta,
            updated_at: Utc::now(),
        }
    }
}

/// Stored audio bytes and their extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAudio {
    /// Raw file contents.
    pub bytes: Vec<u8>,
    /// Lowercase extension, `mp3` or `wav`.
    pub extension: String,
}

/// Song store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct SongStore {
    root: PathBuf,
}

impl SongStore {
    /// Opens (and creates if needed) a store at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self { root: root.into() };
        for dir in [store.uploads_dir(), store.charts_dir()] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }
        Ok(store)
    }

    /// Root data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding uploaded audio files.
    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join("uploads")
    }

    /// Directory holding chart documents.
    pub fn charts_dir(&self) -> PathBuf {
        self.root.join("charts")
    }

    fn audio_path(&self, song_id: &str, extension: &str) -> PathBuf {
        self.uploads_dir().join(format!("{}.{}", song_id, extension))
    }

    /// Path of the chart document for a song.
    pub fn chart_path(&self, song_id: &str) -> PathBuf {
        self.charts_dir().join(format!("{}.json", song_id))
    }

    fn registry_path(&self) -> PathBuf {
        self.root.join(REGISTRY_FILE)
    }

    /// Writes the audio for a song.
    pub fn save_audio(&self, song_id: &str, extension: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.audio_path(song_id, extension);
        fs::write(&path, bytes)
            .with_context(|| format!("Failed to write audio {}", path.display()))?;
        Ok(path)
    }

    /// Path of the stored audio for a song, whichever extension it has.
    pub fn find_audio(&self, song_id: &str) -> Option<PathBuf> {
        AUDIO_EXTENSIONS
            .iter()
            .map(|ext| self.audio_path(song_id, ext))
            .find(|p| p.is_file())
    }

    /// Reads the stored audio for a song.
    pub fn load_audio(&self, song_id: &str) -> Result<Option<StoredAudio>> {
        let Some(path) = self.find_audio(song_id) else {
            return Ok(None);
        };
        let bytes =
            fs::read(&path).with_context(|| format!("Failed to read audio {}", path.display()))?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(Some(StoredAudio { bytes, extension }))
    }

    /// Writes the chart document for a song.
    pub fn save_chart(&self, song_id: &str, chart: &ChartDocument) -> Result<()> {
        let path = self.chart_path(song_id);
        let json = chart
            .to_json_pretty()
            .context("Failed to serialize chart")?;
        fs::write(&path, json).with_context(|| format!("Failed to write chart {}", path.display()))
    }

    /// Reads the chart document for a song.
    pub fn load_chart(&self, song_id: &str) -> Result<Option<ChartDocument>> {
        let path = self.chart_path(song_id);
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read chart {}", path.display()))?;
        let chart = ChartDocument::from_json_str(&text)
            .with_context(|| format!("Failed to parse chart {}", path.display()))?;
        Ok(Some(chart))
    }

    /// Loads the whole registry; a missing file is an empty registry.
    pub fn registry(&self) -> Result<BTreeMap<String, SongRecord>> {
        let path = self.registry_path();
        if !path.is_file() {
            return Ok(BTreeMap::new());
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read registry {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse registry {}", path.display()))
    }

    fn save_registry(&self, registry: &BTreeMap<String, SongRecord>) -> Result<()> {
        let path = self.registry_path();
        let json = serde_json::to_string_pretty(registry)?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write registry {}", path.display()))
    }

    /// Inserts or replaces the registry entry for `record.meta.song_id`.
    pub fn upsert(&self, record: SongRecord) -> Result<()> {
        let mut registry = self.registry()?;
        registry.insert(record.meta.song_id.clone(), record);
        self.save_registry(&registry)
    }

    /// Registry entry for a song.
    pub fn record(&self, song_id: &str) -> Result<Option<SongRecord>> {
        Ok(self.registry()?.remove(song_id))
    }

    /// All registry entries, oldest update first.
    pub fn list(&self) -> Result<Vec<SongRecord>> {
        let mut records: Vec<_> = self.registry()?.into_values().collect();
        records.sort_by(|a, b| {
            a.updated_at
                .cmp(&b.updated_at)
                .then_with(|| a.meta.song_id.cmp(&b.meta.song_id))
        });
        Ok(records)
    }

    /// Removes the audio, chart and registry entry of a song.
    ///
    /// Fails with [`StoreError::SongNotFound`] if neither audio nor chart exists.
    pub fn delete(&self, song_id: &str) -> Result<()> {
        let audio = self.find_audio(song_id);
        let chart = self.chart_path(song_id);
        if audio.is_none() && !chart.is_file() {
            return Err(StoreError::SongNotFound {
                song_id: song_id.to_string(),
            }
            .into());
        }

        if let Some(path) = audio {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        if chart.is_file() {
            fs::remove_file(&chart)
                .with_context(|| format!("Failed to remove {}", chart.display()))?;
        }

        let mut registry = self.registry()?;
        if registry.remove(song_id).is_some() {
            self.save_registry(&registry)?;
        }
        Ok(())
    }
}
