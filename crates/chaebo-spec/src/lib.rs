//! Chaebo Chart Data Model
//!
//! This crate provides the types shared by every stage of the onset-to-chart
//! pipeline: the onset events produced by audio analysis, the note events
//! returned by a generation backend, and the persisted chart document.
//!
//! # Overview
//!
//! - **Onsets**: `{time, pitch, volume}` records with times rounded to 4 decimals
//! - **Notes**: untrusted backend output normalized into [`NoteEvent`] and merged
//!   into a deduplicated, time-ordered chaebo
//! - **Charts**: a [`ChartDocument`] keyed by lane count (`"4key"`, `"5key"`, `"6key"`)
//!
//! # Example
//!
//! ```
//! use chaebo_spec::{ChartDocument, KeyChart, KeyMode, NoteEvent};
//!
//! let mut doc = ChartDocument::dummy();
//! let chart = KeyChart::new(vec![NoteEvent::short(0.5, 2)]);
//! doc.replace_key(KeyMode::Five, &chart);
//!
//! assert!(doc.contains(KeyMode::Four));
//! assert_eq!(doc.key_chart(KeyMode::Five).unwrap().unwrap().chaebo.len(), 1);
//! ```
//!
//! # Modules
//!
//! - [`chart`]: Key modes, per-key charts and the chart document
//! - [`error`]: Error type for chart parsing
//! - [`lint`]: Non-enforcing chart quality report
//! - [`note`]: Note events, normalization and merging
//! - [`onset`]: Onset events and analysis summaries
//! - [`song`]: Song metadata records

pub mod chart;
pub mod error;
pub mod lint;
pub mod note;
pub mod onset;
pub mod song;

pub use chart::{ChartDocument, KeyChart, KeyMode, MaxScore, DEFAULT_PLAYER};
pub use error::{ChartError, ChartResult};
pub use lint::{lint_key_chart, LintIssue, LintReport, Severity};
pub use note::{merge_notes, normalize_notes, NoteEvent, NoteKind, NoteRejection};
pub use onset::{round_f64, round_time, AudioSummary, OnsetEvent, TIME_DECIMALS};
pub use song::SongMetadata;
