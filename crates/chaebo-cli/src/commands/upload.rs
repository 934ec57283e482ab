//! Upload command implementation
//!
//! Stores an audio file under a new song id, generates its first chart and
//! registers the song.

use std::fs;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chaebo_generate::{GenerateOptions, GenerationBackend, Pipeline};
use chaebo_spec::SongMetadata;
use uuid::Uuid;

use super::GenerationReport;
use crate::config::{runtime, BackendArgs, GenerateArgs};
use crate::store::{audio_extension, display_name, SongRecord, SongStore};

/// Stores `bytes` as a new song and generates its chart.
///
/// The file name must end in `.mp3` or `.wav`. When generation is disabled
/// or fails the dummy chart is stored instead; only store errors fail the
/// upload.
pub async fn upload_song<B: GenerationBackend + 'static>(
    store: &SongStore,
    pipeline: &Pipeline<B>,
    file_name: &str,
    bytes: Vec<u8>,
    name: Option<&str>,
    options: &GenerateOptions,
) -> Result<GenerationReport> {
    let extension = audio_extension(file_name)?;
    let song_id = Uuid::new_v4().to_string();

    store.save_audio(&song_id, &extension, &bytes)?;
    let outcome = pipeline
        .upload(Arc::from(bytes), Some(extension), options)
        .await;
    store.save_chart(&song_id, &outcome.document)?;

    let meta = SongMetadata::from_chart(&song_id, display_name(name, file_name), &outcome.document);
    let record = SongRecord::new(meta);
    store.upsert(record.clone())?;
    log::info!(
        "[{}] stored song {} as '{}'",
        outcome.request_id,
        song_id,
        record.meta.original_name
    );

    Ok(GenerationReport::new(options.key_mode, &outcome, record))
}

/// Run the upload command
///
/// # Arguments
/// * `input` - Path to the audio file
/// * `name` - Optional display name
/// * `data_dir` - Store root
///
/// # Returns
/// Exit code: 0 on success (including dummy fallback), 1 on error
pub fn run(
    input: &str,
    name: Option<&str>,
    data_dir: &Path,
    generate: &GenerateArgs,
    backend: &BackendArgs,
    json: bool,
) -> Result<ExitCode> {
    let file_name = Path::new(input)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(input);
    audio_extension(file_name)?;

    let bytes = fs::read(input).with_context(|| format!("Failed to read audio: {}", input))?;
    let store = SongStore::open(data_dir)?;
    let pipeline = backend.pipeline()?;
    let options = generate.to_options();

    let report = runtime()?.block_on(upload_song(
        &store, &pipeline, file_name, bytes, name, &options,
    ))?;
    report.print(json)?;
    Ok(ExitCode::SUCCESS)
}
