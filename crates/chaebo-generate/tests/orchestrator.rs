//! Chunked generation against a scripted backend.

mod common;

use std::time::Duration;

use chaebo_generate::{GenerationError, Orchestrator, RequestId, TraceWriter};
use chaebo_spec::{AudioSummary, ChartDocument, KeyMode, NoteEvent, OnsetEvent};
use common::{first_time, ScriptedBackend};
use pretty_assertions::assert_eq;
use serde_json::json;

fn summary(times: &[f64]) -> AudioSummary {
    AudioSummary {
        tempo: 120.0,
        onsets: times
            .iter()
            .map(|&t| OnsetEvent::new(t, Some(60), 0.5))
            .collect(),
    }
}

#[tokio::test]
async fn test_failed_chunk_only_loses_its_notes() {
    let backend = ScriptedBackend::new(|onsets| {
        if first_time(onsets) < 0.75 {
            Err(GenerationError::transport("connection reset"))
        } else {
            Ok("```json\n[{\"time\": 1.0, \"type\": \"short\", \"position\": 2}]\n```".to_string())
        }
    });
    let orchestrator = Orchestrator::new(backend);

    let build = orchestrator
        .build_chart(RequestId::new(), KeyMode::Four, &summary(&[0.5, 1.0]), "", 1)
        .await;

    assert_eq!(build.stats.chunks_total, 2);
    assert_eq!(build.stats.chunks_failed, 1);
    assert_eq!(orchestrator.backend().calls(), 2);

    let doc = ChartDocument::fragment(KeyMode::Four, &build.chart);
    assert_eq!(
        serde_json::to_value(&doc).unwrap(),
        json!({
            "4key": {
                "maxscore": {"score": 0, "player": "AAA"},
                "chaebo": [{"time": 1.0, "type": "short", "position": 2}]
            }
        })
    );
}

#[tokio::test]
async fn test_chunks_are_merged_deduplicated_and_sorted() {
    // Both chunks repeat the same note; the later chunk adds a chord.
    let backend = ScriptedBackend::new(|onsets| {
        let reply = if first_time(onsets) < 1.0 {
            json!([
                {"time": 0.5, "type": "short", "position": 1},
                {"time": 1.5, "type": "short", "position": 4}
            ])
        } else {
            json!([
                {"time": 1.5, "type": "short", "position": 4},
                {"time": 1.5, "type": "short", "position": 2},
                {"time": 1.0, "type": "long", "position": 3, "end": 1.25},
                "not a note"
            ])
        };
        Ok(reply.to_string())
    });
    let orchestrator = Orchestrator::new(backend);

    let build = orchestrator
        .build_chart(
            RequestId::new(),
            KeyMode::Five,
            &summary(&[0.5, 0.75, 1.0, 1.5]),
            "",
            2,
        )
        .await;

    assert_eq!(build.stats.chunks_failed, 0);
    assert_eq!(build.stats.notes, 4);
    let times: Vec<_> = build.chart.chaebo.iter().map(|n| n.time).collect();
    assert_eq!(times, vec![0.5, 1.0, 1.5, 1.5]);
    assert_eq!(build.chart.chaebo[2], NoteEvent::short(1.5, 2));
    assert_eq!(build.chart.chaebo[3], NoteEvent::short(1.5, 4));
    assert_eq!(build.chart.chaebo[1].end, Some(1.25));
}

#[tokio::test]
async fn test_every_chunk_failing_is_reported() {
    let orchestrator = Orchestrator::new(ScriptedBackend::constant("I cannot help with that."));

    let build = orchestrator
        .build_chart(RequestId::new(), KeyMode::Six, &summary(&[0.1, 0.2, 0.3]), "", 2)
        .await;

    assert_eq!(build.stats.chunks_total, 2);
    assert!(build.stats.all_failed());
    assert!(build.chart.chaebo.is_empty());
}

#[tokio::test]
async fn test_slow_chunk_times_out() {
    let backend = ScriptedBackend::constant("[]").with_delay(Duration::from_millis(500));
    let orchestrator = Orchestrator::new(backend).with_timeout(Duration::from_millis(20));

    let build = orchestrator
        .build_chart(RequestId::new(), KeyMode::Four, &summary(&[0.1]), "", 300)
        .await;

    assert!(build.stats.all_failed());
}

#[tokio::test]
async fn test_no_onsets_sends_nothing() {
    let orchestrator = Orchestrator::new(ScriptedBackend::constant("[]"));

    let build = orchestrator
        .build_chart(RequestId::new(), KeyMode::Four, &summary(&[]), "", 300)
        .await;

    assert_eq!(build.stats.chunks_total, 0);
    assert!(!build.stats.all_failed());
    assert_eq!(orchestrator.backend().calls(), 0);
}

#[tokio::test]
async fn test_extra_instructions_reach_every_prompt() {
    let tmp = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::new(ScriptedBackend::constant("[]"))
        .with_trace(Some(TraceWriter::new(tmp.path())));
    let id = RequestId::new();

    orchestrator
        .build_chart(id, KeyMode::Four, &summary(&[0.1, 0.2]), "Only use lanes 1 and 4.", 1)
        .await;

    for chunk in 0..2 {
        let prompt = std::fs::read_to_string(tmp.path().join(format!("{}-{}-prompt.txt", id, chunk)))
            .unwrap();
        assert!(prompt.contains("Only use lanes 1 and 4."));
        let response =
            std::fs::read_to_string(tmp.path().join(format!("{}-{}-response.txt", id, chunk)))
                .unwrap();
        assert_eq!(response, "[]");
    }
}
