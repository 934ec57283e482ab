//! Regenerate command implementation
//!
//! Rebuilds one key mode of an existing song from its stored audio.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use chaebo_generate::{GenerateOptions, GenerationBackend, Pipeline};
use chaebo_spec::SongMetadata;

use super::GenerationReport;
use crate::config::{runtime, BackendArgs, GenerateArgs};
use crate::store::{SongRecord, SongStore, StoreError};

/// Regenerates `options.key_mode` for a stored song.
///
/// Both the audio and the chart must be stored. Other key modes of the
/// stored chart are kept as they are.
pub async fn regenerate_song<B: GenerationBackend + 'static>(
    store: &SongStore,
    pipeline: &Pipeline<B>,
    song_id: &str,
    options: &GenerateOptions,
) -> Result<GenerationReport> {
    let missing = |what| StoreError::MissingFile {
        song_id: song_id.to_string(),
        what,
    };
    let audio = store.load_audio(song_id)?.ok_or_else(|| missing("audio"))?;
    let existing = store.load_chart(song_id)?.ok_or_else(|| missing("chart"))?;

    let outcome = pipeline
        .regenerate(
            &existing,
            Arc::from(audio.bytes),
            Some(audio.extension),
            options,
        )
        .await;
    store.save_chart(song_id, &outcome.document)?;

    let mut meta = match store.record(song_id)? {
        Some(record) => record.meta,
        None => SongMetadata::from_chart(song_id, song_id, &outcome.document),
    };
    meta.sync_with(&outcome.document);
    let record = SongRecord::new(meta);
    store.upsert(record.clone())?;
    log::info!(
        "[{}] updated {} chart of song {}",
        outcome.request_id,
        options.key_mode.as_key(),
        song_id
    );

    Ok(GenerationReport::new(options.key_mode, &outcome, record))
}

/// Run the regenerate command
pub fn run(
    song_id: &str,
    data_dir: &Path,
    generate: &GenerateArgs,
    backend: &BackendArgs,
    json: bool,
) -> Result<ExitCode> {
    let store = SongStore::open(data_dir)?;
    let pipeline = backend.pipeline()?;
    let options = generate.to_options();

    let report = runtime()?.block_on(regenerate_song(&store, &pipeline, song_id, &options))?;
    report.print(json)?;
    Ok(ExitCode::SUCCESS)
}
