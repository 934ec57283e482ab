//! Lint command implementation
//!
//! Reports where a stored chart departs from the charting rules. Charts are
//! never modified.

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chaebo_analysis::{analyze_bytes, AnalysisConfig};
use chaebo_spec::{lint_key_chart, ChartDocument, KeyMode, LintReport, OnsetEvent, Severity};
use colored::Colorize;
use serde::Serialize;

use crate::store::{SongStore, StoreError};

/// Where the chart to lint comes from.
#[derive(Debug, Clone, Copy)]
pub enum LintTarget<'a> {
    /// A stored song.
    Song(&'a str),
    /// A chart document file.
    File(&'a str),
}

/// Lint report of one key mode.
#[derive(Debug, Clone, Serialize)]
pub struct KeyLint {
    /// Document key, such as `4key`.
    pub key: String,
    /// Issues found under that key.
    pub report: LintReport,
}

/// Lints every requested key present in `chart`.
pub fn lint_document(
    chart: &ChartDocument,
    key: Option<KeyMode>,
    onsets: Option<&[OnsetEvent]>,
) -> Result<Vec<KeyLint>> {
    let modes = match key {
        Some(mode) => vec![mode],
        None => chart.key_modes(),
    };
    let mut results = Vec::with_capacity(modes.len());
    for mode in modes {
        let key_chart = chart
            .key_chart(mode)?
            .with_context(|| format!("chart has no {} entry", mode.as_key()))?;
        results.push(KeyLint {
            key: mode.as_key().to_string(),
            report: lint_key_chart(mode, &key_chart, onsets),
        });
    }
    Ok(results)
}

fn load_target(target: LintTarget<'_>, data_dir: &Path) -> Result<(ChartDocument, Option<SongStore>)> {
    match target {
        LintTarget::File(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read chart: {}", path))?;
            let chart = ChartDocument::from_json_str(&text)
                .with_context(|| format!("Failed to parse chart: {}", path))?;
            Ok((chart, None))
        }
        LintTarget::Song(song_id) => {
            let store = SongStore::open(data_dir)?;
            let chart = store
                .load_chart(song_id)?
                .ok_or_else(|| StoreError::MissingFile {
                    song_id: song_id.to_string(),
                    what: "chart",
                })?;
            Ok((chart, Some(store)))
        }
    }
}

fn stored_onsets(store: &SongStore, song_id: &str) -> Result<Vec<OnsetEvent>> {
    let audio = store
        .load_audio(song_id)?
        .ok_or_else(|| StoreError::MissingFile {
            song_id: song_id.to_string(),
            what: "audio",
        })?;
    let summary = analyze_bytes(&audio.bytes, Some(&audio.extension), &AnalysisConfig::default())
        .with_context(|| format!("Failed to analyze audio of {}", song_id))?;
    Ok(summary.onsets)
}

/// Run the lint command
///
/// # Arguments
/// * `target` - Stored song or chart file
/// * `key` - Only lint this key mode
/// * `check_onsets` - Also report note times that are not onset times (songs only)
/// * `strict` - Fail on warnings
///
/// # Returns
/// Exit code: 0 if clean (or only info issues without `strict`), 1 otherwise
pub fn run(
    target: LintTarget<'_>,
    key: Option<KeyMode>,
    check_onsets: bool,
    strict: bool,
    data_dir: &Path,
    json: bool,
) -> Result<ExitCode> {
    let (chart, store) = load_target(target, data_dir)?;
    let onsets = match (check_onsets, target, &store) {
        (true, LintTarget::Song(song_id), Some(store)) => Some(stored_onsets(store, song_id)?),
        (true, LintTarget::File(_), _) => {
            anyhow::bail!("--onsets needs a stored song; chart files have no audio")
        }
        _ => None,
    };

    let results = lint_document(&chart, key, onsets.as_deref())?;
    let warnings: usize = results.iter().map(|r| r.report.warning_count()).sum();

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for result in &results {
            print_key_lint(result);
        }
    }

    if strict && warnings > 0 {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn print_key_lint(result: &KeyLint) {
    if result.report.is_clean() {
        println!("{} {}", result.key.cyan().bold(), "clean".green());
        return;
    }
    println!(
        "{} {} issues, {} chord moments",
        result.key.cyan().bold(),
        result.report.issues.len(),
        result.report.chord_moments
    );
    for issue in &result.report.issues {
        let marker = match issue.severity {
            Severity::Warning => "!".yellow(),
            Severity::Info => "i".blue(),
        };
        let location = issue
            .note_index
            .map(|i| format!(" (note {})", i))
            .unwrap_or_default();
        println!(
            "  {} [{}] {}{}",
            marker,
            issue.rule_id.dimmed(),
            issue.message,
            location
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaebo_spec::{KeyChart, NoteEvent};

    #[test]
    fn test_lint_document_covers_present_keys() {
        let mut doc = ChartDocument::dummy();
        doc.replace_key(KeyMode::Four, &KeyChart::new(vec![NoteEvent::short(0.5, 7)]));

        let results = lint_document(&doc, None, None).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].report.by_rule("chart/lane-range").count() > 0);

        let only_five = lint_document(&doc, Some(KeyMode::Five), None).unwrap();
        assert_eq!(only_five.len(), 1);
        assert_eq!(only_five[0].key, "5key");
    }

    #[test]
    fn test_lint_document_missing_key() {
        let doc = ChartDocument::fragment(KeyMode::Four, &KeyChart::dummy());
        assert!(lint_document(&doc, Some(KeyMode::Six), None).is_err());
    }
}
