//! CLI command implementations

pub mod analyze;
pub mod ask;
pub mod chart;
pub mod compile;
pub mod delete;
pub mod lint;
pub mod regenerate;
pub mod songs;
pub mod upload;

use colored::Colorize;
use serde::Serialize;

use chaebo_generate::{ChartSource, PipelineOutcome};
use chaebo_spec::KeyMode;

use crate::store::SongRecord;

/// Result of an upload or regeneration, printed by both commands.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    /// Song identifier.
    pub song_id: String,
    /// Display name.
    pub name: String,
    /// Key mode that was generated.
    pub key: String,
    /// Request id used in logs and trace files.
    pub request_id: String,
    /// Whether the dummy chart was stored for the key.
    pub fallback: bool,
    /// Reason the dummy chart was used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    /// Notes in the generated chart (zero on fallback).
    pub notes: usize,
    /// Tempo estimate, when analysis ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpm: Option<f64>,
    /// Registry entry after the operation.
    pub record: SongRecord,
}

impl GenerationReport {
    pub(crate) fn new(mode: KeyMode, outcome: &PipelineOutcome, record: SongRecord) -> Self {
        let (fallback_reason, notes) = match &outcome.source {
            ChartSource::Generated(stats) => (None, stats.notes),
            ChartSource::Fallback(reason) => (Some(reason.to_string()), 0),
        };
        Self {
            song_id: record.meta.song_id.clone(),
            name: record.meta.original_name.clone(),
            key: mode.as_key().to_string(),
            request_id: outcome.request_id.to_string(),
            fallback: outcome.source.is_fallback(),
            fallback_reason,
            notes,
            bpm: outcome.summary.as_ref().map(|s| s.tempo),
            record,
        }
    }

    pub(crate) fn print(&self, json: bool) -> anyhow::Result<()> {
        if json {
            println!("{}", serde_json::to_string_pretty(self)?);
            return Ok(());
        }

        println!("{} {}", "Song:".cyan().bold(), self.song_id);
        println!("{} {}", "Name:".dimmed(), self.name);
        if let Some(bpm) = self.bpm {
            println!("{} {}", "BPM:".dimmed(), bpm);
        }
        match &self.fallback_reason {
            None => println!(
                "{} {} chart with {} notes",
                "Generated".green().bold(),
                self.key,
                self.notes
            ),
            Some(reason) => println!(
                "{} dummy chart for {} ({})",
                "Stored".yellow().bold(),
                self.key,
                reason
            ),
        }
        Ok(())
    }
}
