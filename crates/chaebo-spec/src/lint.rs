//! Chart quality report.
//!
//! The generation prompt asks the backend to respect lane bounds, chord
//! sizes and onset alignment, but nothing forces it to. This module reports
//! where a chart departs from those rules. It never modifies a chart.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::chart::{KeyChart, KeyMode};
use crate::note::NoteKind;
use crate::onset::OnsetEvent;

/// Most lanes a chord may use.
pub const MAX_CHORD_LANES: usize = 3;

/// Fewest chord moments a chart is expected to contain.
pub const MIN_CHORD_MOMENTS: usize = 3;

/// Severity level for lint issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Style or variety suggestions.
    Info,
    /// Notes a player cannot hit as written.
    Warning,
}

/// A single lint issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LintIssue {
    /// Rule identifier (e.g., "chart/lane-range").
    pub rule_id: String,
    /// Severity level.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
    /// Index of the offending note in the chaebo, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_index: Option<usize>,
}

impl LintIssue {
    /// Creates a chart-level issue.
    pub fn new(rule_id: &str, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            severity,
            message: message.into(),
            note_index: None,
        }
    }

    /// Builder method to attach a note index.
    pub fn at_note(mut self, index: usize) -> Self {
        self.note_index = Some(index);
        self
    }
}

/// Lint report for one key chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LintReport {
    /// All issues, in rule order.
    pub issues: Vec<LintIssue>,
    /// Number of distinct times with two or more notes.
    pub chord_moments: usize,
}

impl LintReport {
    /// Number of warning-level issues.
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// Returns true if no issues were found.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Issues raised by one rule.
    pub fn by_rule<'a>(&'a self, rule_id: &'a str) -> impl Iterator<Item = &'a LintIssue> + 'a {
        self.issues.iter().filter(move |i| i.rule_id == rule_id)
    }
}

fn time_key(seconds: f64) -> i64 {
    (seconds * 10_000.0).round() as i64
}

/// Checks a key chart against the rules stated in the generation prompt.
///
/// When `onsets` is given, note times that are not onset times are reported.
pub fn lint_key_chart(mode: KeyMode, chart: &KeyChart, onsets: Option<&[OnsetEvent]>) -> LintReport {
    let mut report = LintReport::default();
    let lanes = i64::from(mode.lanes());

    if chart.chaebo.is_empty() {
        report.issues.push(LintIssue::new(
            "chart/empty",
            Severity::Warning,
            "chart has no notes",
        ));
        return report;
    }

    for (index, note) in chart.chaebo.iter().enumerate() {
        if note.kind != NoteKind::ChangeBeat {
            match note.position {
                Some(lane) if (1..=lanes).contains(&lane) => {}
                Some(lane) => report.issues.push(
                    LintIssue::new(
                        "chart/lane-range",
                        Severity::Warning,
                        format!("lane {} outside 1..={} at {}s", lane, lanes, note.time),
                    )
                    .at_note(index),
                ),
                None => report.issues.push(
                    LintIssue::new(
                        "chart/lane-range",
                        Severity::Warning,
                        format!("note at {}s has no lane", note.time),
                    )
                    .at_note(index),
                ),
            }
        }

        if note.kind != NoteKind::Short {
            report.issues.push(
                LintIssue::new(
                    "chart/note-type",
                    Severity::Info,
                    format!("{} note at {}s; only short notes are requested", note.kind, note.time),
                )
                .at_note(index),
            );
        }

        if index > 0 && chart.chaebo[index - 1].time > note.time {
            report.issues.push(
                LintIssue::new(
                    "chart/order",
                    Severity::Warning,
                    format!("note at {}s is earlier than the note before it", note.time),
                )
                .at_note(index),
            );
        }
    }

    let mut lanes_by_time: BTreeMap<i64, HashSet<i64>> = BTreeMap::new();
    for note in chart.chaebo.iter().filter(|n| n.kind != NoteKind::ChangeBeat) {
        if let Some(lane) = note.position {
            lanes_by_time.entry(time_key(note.time)).or_default().insert(lane);
        }
    }
    for (key, used) in &lanes_by_time {
        if used.len() > MAX_CHORD_LANES {
            report.issues.push(LintIssue::new(
                "chart/chord-width",
                Severity::Warning,
                format!(
                    "{} lanes pressed at once at {}s (at most {})",
                    used.len(),
                    *key as f64 / 10_000.0,
                    MAX_CHORD_LANES
                ),
            ));
        }
    }
    report.chord_moments = lanes_by_time.values().filter(|used| used.len() >= 2).count();
    if report.chord_moments < MIN_CHORD_MOMENTS {
        report.issues.push(LintIssue::new(
            "chart/few-chords",
            Severity::Info,
            format!(
                "{} chord moments (at least {} requested)",
                report.chord_moments, MIN_CHORD_MOMENTS
            ),
        ));
    }

    if let Some(onsets) = onsets {
        let onset_times: HashSet<i64> = onsets.iter().map(|o| time_key(o.time)).collect();
        for (index, note) in chart.chaebo.iter().enumerate() {
            if !onset_times.contains(&time_key(note.time)) {
                report.issues.push(
                    LintIssue::new(
                        "chart/off-onset",
                        Severity::Info,
                        format!("note time {}s is not an onset time", note.time),
                    )
                    .at_note(index),
                );
            }
        }
    }

    report
}
