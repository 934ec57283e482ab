//! Upload, regenerate and delete against a temporary store.

use std::io::Cursor;

use chaebo_cli::commands::ask::ask_backend;
use chaebo_cli::commands::regenerate::regenerate_song;
use chaebo_cli::commands::upload::upload_song;
use chaebo_cli::store::{SongStore, StoreError};
use chaebo_generate::{
    Backend, BackendConfig, GenerateOptions, GenerationBackend, GenerationRequest,
    GenerationResult, Pipeline,
};
use chaebo_spec::{ChartDocument, KeyChart, KeyMode, NoteEvent};
use pretty_assertions::assert_eq;

/// Replies with one note regardless of the prompt.
struct OneNote;

impl GenerationBackend for OneNote {
    fn name(&self) -> &str {
        "one-note"
    }

    async fn complete(&self, _request: &GenerationRequest) -> GenerationResult<String> {
        Ok("```json\n[{\"time\": 0.25, \"type\": \"short\", \"position\": 3}]\n```".to_string())
    }
}

fn offline_pipeline() -> Pipeline<Backend> {
    Pipeline::with_backend(Backend::from_config(&BackendConfig::default()).unwrap())
}

fn no_llm(key_mode: KeyMode) -> GenerateOptions {
    GenerateOptions {
        key_mode,
        use_llm: false,
        ..GenerateOptions::default()
    }
}

fn burst_wav() -> Vec<u8> {
    let sr = 22050u32;
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: sr,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..2 * sr as usize {
            let t = i as f64 / sr as f64;
            let mut value = 0.0;
            for start in [0.25, 0.75, 1.25] {
                if t >= start {
                    let dt = t - start;
                    value += 0.6
                        * (-dt / 0.04).exp()
                        * (2.0 * std::f64::consts::PI * 880.0 * dt).sin();
                }
            }
            writer
                .write_sample((value.clamp(-1.0, 1.0) * i16::MAX as f64) as i16)
                .unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

#[tokio::test]
async fn test_upload_without_generation_stores_dummy_everywhere() {
    let tmp = tempfile::tempdir().unwrap();
    let store = SongStore::open(tmp.path()).unwrap();

    let report = upload_song(
        &store,
        &offline_pipeline(),
        "Track 01.WAV",
        burst_wav(),
        None,
        &no_llm(KeyMode::Four),
    )
    .await
    .unwrap();

    assert!(report.fallback);
    assert_eq!(report.name, "Track 01");
    assert_eq!(
        store.load_chart(&report.song_id).unwrap(),
        Some(ChartDocument::dummy())
    );
    let audio = store.load_audio(&report.song_id).unwrap().unwrap();
    assert_eq!(audio.extension, "wav");

    let records = store.list().unwrap();
    assert_eq!(records.len(), 1);
    let meta = &records[0].meta;
    assert!(meta.has4 && meta.has5 && meta.has6);
}

#[tokio::test]
async fn test_upload_with_generation_stores_one_key() {
    let tmp = tempfile::tempdir().unwrap();
    let store = SongStore::open(tmp.path()).unwrap();
    let pipeline = Pipeline::with_backend(OneNote);

    let report = upload_song(
        &store,
        &pipeline,
        "beat.wav",
        burst_wav(),
        Some("  Beat  "),
        &GenerateOptions::default().with_key_mode(KeyMode::Five),
    )
    .await
    .unwrap();

    assert!(!report.fallback, "{:?}", report.fallback_reason);
    assert_eq!(report.name, "Beat");
    assert_eq!(report.notes, 1);
    let chart = store.load_chart(&report.song_id).unwrap().unwrap();
    assert_eq!(chart.key_modes(), vec![KeyMode::Five]);
    let record = store.record(&report.song_id).unwrap().unwrap();
    assert!(!record.meta.has4 && record.meta.has5 && !record.meta.has6);
}

#[tokio::test]
async fn test_upload_rejects_unsupported_files() {
    let tmp = tempfile::tempdir().unwrap();
    let store = SongStore::open(tmp.path()).unwrap();

    let err = upload_song(
        &store,
        &offline_pipeline(),
        "song.flac",
        vec![0; 16],
        None,
        &no_llm(KeyMode::Four),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<StoreError>(),
        Some(StoreError::UnsupportedAudio { .. })
    ));
    assert!(store.list().unwrap().is_empty());
}

#[tokio::test]
async fn test_regenerate_keeps_other_keys_and_updates_flags() {
    let tmp = tempfile::tempdir().unwrap();
    let store = SongStore::open(tmp.path()).unwrap();
    let pipeline = offline_pipeline();

    let four = KeyChart::new(vec![NoteEvent::short(1.0, 2)]);
    let report = upload_song(
        &store,
        &pipeline,
        "song.wav",
        burst_wav(),
        None,
        &no_llm(KeyMode::Four),
    )
    .await
    .unwrap();
    let id = report.song_id;
    store
        .save_chart(&id, &ChartDocument::fragment(KeyMode::Four, &four))
        .unwrap();

    let report = regenerate_song(&store, &pipeline, &id, &no_llm(KeyMode::Six))
        .await
        .unwrap();

    assert!(report.fallback);
    let chart = store.load_chart(&id).unwrap().unwrap();
    assert_eq!(chart.key_chart(KeyMode::Four).unwrap(), Some(four));
    assert_eq!(chart.key_chart(KeyMode::Six).unwrap(), Some(KeyChart::dummy()));
    assert!(!chart.contains(KeyMode::Five));

    let record = store.record(&id).unwrap().unwrap();
    assert_eq!(record.meta.original_name, "song");
    assert!(record.meta.has4 && !record.meta.has5 && record.meta.has6);
}

#[tokio::test]
async fn test_regenerate_unknown_song_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let store = SongStore::open(tmp.path()).unwrap();

    let err = regenerate_song(&store, &offline_pipeline(), "nope", &no_llm(KeyMode::Four))
        .await
        .unwrap_err();

    assert_eq!(
        err.downcast_ref::<StoreError>(),
        Some(&StoreError::MissingFile {
            song_id: "nope".to_string(),
            what: "audio"
        })
    );
}

#[tokio::test]
async fn test_delete_removes_everything_once() {
    let tmp = tempfile::tempdir().unwrap();
    let store = SongStore::open(tmp.path()).unwrap();
    let report = upload_song(
        &store,
        &offline_pipeline(),
        "song.wav",
        burst_wav(),
        None,
        &no_llm(KeyMode::Four),
    )
    .await
    .unwrap();

    store.delete(&report.song_id).unwrap();

    assert!(store.find_audio(&report.song_id).is_none());
    assert_eq!(store.load_chart(&report.song_id).unwrap(), None);
    assert!(store.list().unwrap().is_empty());
    assert!(store.delete(&report.song_id).is_err());
}

#[tokio::test]
async fn test_ask_passes_text_through_and_rejects_no_llm() {
    let request = GenerationRequest::new("hello");

    let text = ask_backend(&OneNote, &request, true).await.unwrap();
    assert!(text.starts_with("```json"));

    assert!(ask_backend(&OneNote, &request, false).await.is_err());
}

#[tokio::test]
async fn test_ask_propagates_missing_credential() {
    let backend = Backend::from_config(&BackendConfig::default()).unwrap();
    let err = ask_backend(&backend, &GenerationRequest::new("hello"), true)
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("GOOGLE_API_KEY"));
}
