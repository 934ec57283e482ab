//! Note events and the merge step that turns chunk outputs into one chaebo.
//!
//! Backend output is untrusted. Each array element is parsed on its own by
//! [`NoteEvent::from_value`]; elements that do not have the note shape are
//! dropped and the rest are kept. Game rules (lane bounds, chord size, note
//! type) are not enforced here, see [`crate::lint`] for a report.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::onset::round_time;

/// Note shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    /// Single tap.
    Short,
    /// Hold from `time` to `end`.
    Long,
    /// Tempo change marker carrying `beat`.
    ChangeBeat,
}

impl NoteKind {
    /// Returns the wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteKind::Short => "short",
            NoteKind::Long => "long",
            NoteKind::ChangeBeat => "change_beat",
        }
    }

    /// Parses a wire name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "short" => Some(NoteKind::Short),
            "long" => Some(NoteKind::Long),
            "change_beat" => Some(NoteKind::ChangeBeat),
            _ => None,
        }
    }
}

impl std::fmt::Display for NoteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason an element of a backend response was not accepted as a note.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NoteRejection {
    /// Element is not a JSON object.
    #[error("note is not an object")]
    NotAnObject,
    /// Object has no `time` field.
    #[error("note has no time")]
    MissingTime,
    /// `time` is not a finite number.
    #[error("note time is not a finite number")]
    InvalidTime,
    /// `type` is not one of the known note kinds.
    #[error("unknown note type '{0}'")]
    UnknownType(String),
    /// An optional field has the wrong JSON type.
    #[error("note field '{0}' has an invalid value")]
    InvalidField(&'static str),
}

/// One note of a chaebo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Time in seconds, 4 decimals.
    pub time: f64,
    /// Note shape.
    #[serde(rename = "type")]
    pub kind: NoteKind,
    /// Lane index, 1-based. Not checked against the lane count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    /// End time of a long note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
    /// New beat value of a change_beat marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beat: Option<f64>,
}

impl NoteEvent {
    /// Creates a short note.
    pub fn short(time: f64, position: i64) -> Self {
        Self {
            time: round_time(time),
            kind: NoteKind::Short,
            position: Some(position),
            end: None,
            beat: None,
        }
    }

    /// Parses one element of a backend response.
    ///
    /// A missing `type` is read as `short`. Unknown fields are dropped.
    pub fn from_value(value: &Value) -> Result<Self, NoteRejection> {
        let obj = value.as_object().ok_or(NoteRejection::NotAnObject)?;

        let time = obj
            .get("time")
            .ok_or(NoteRejection::MissingTime)?
            .as_f64()
            .filter(|t| t.is_finite())
            .ok_or(NoteRejection::InvalidTime)?;

        let kind = match obj.get("type") {
            None | Some(Value::Null) => NoteKind::Short,
            Some(Value::String(name)) => {
                NoteKind::parse(name).ok_or_else(|| NoteRejection::UnknownType(name.clone()))?
            }
            Some(other) => return Err(NoteRejection::UnknownType(other.to_string())),
        };

        Ok(Self {
            time: round_time(time),
            kind,
            position: lane_field(obj)?,
            end: number_field(obj, "end")?,
            beat: number_field(obj, "beat")?,
        })
    }

    /// Converts to the persisted JSON shape.
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("time".to_string(), Value::from(self.time));
        obj.insert("type".to_string(), Value::from(self.kind.as_str()));
        if let Some(position) = self.position {
            obj.insert("position".to_string(), Value::from(position));
        }
        if let Some(end) = self.end {
            obj.insert("end".to_string(), Value::from(end));
        }
        if let Some(beat) = self.beat {
            obj.insert("beat".to_string(), Value::from(beat));
        }
        Value::Object(obj)
    }

    /// Identity used for deduplication: two notes are duplicates only when
    /// every field matches.
    pub fn identity_key(&self) -> String {
        format!(
            "{}|{}|{:?}|{:?}|{:?}",
            self.time, self.kind, self.position, self.end, self.beat
        )
    }

    /// Total order of a merged chaebo.
    ///
    /// Ascending time; same-time notes by position (absent first), then kind,
    /// then `end`, then `beat`.
    pub fn chart_order(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.position.cmp(&other.position))
            .then_with(|| self.kind.cmp(&other.kind))
            .then_with(|| cmp_optional(self.end, other.end))
            .then_with(|| cmp_optional(self.beat, other.beat))
    }
}

fn cmp_optional(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (a, b) => a.is_some().cmp(&b.is_some()),
    }
}

fn lane_field(obj: &Map<String, Value>) -> Result<Option<i64>, NoteRejection> {
    match obj.get("position") {
        None | Some(Value::Null) => Ok(None),
        Some(v) => {
            if let Some(lane) = v.as_i64() {
                return Ok(Some(lane));
            }
            match v.as_f64() {
                Some(f) if f.is_finite() && f.fract() == 0.0 => Ok(Some(f as i64)),
                _ => Err(NoteRejection::InvalidField("position")),
            }
        }
    }
}

fn number_field(
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<f64>, NoteRejection> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_f64()
            .filter(|f| f.is_finite())
            .map(Some)
            .ok_or(NoteRejection::InvalidField(field)),
    }
}

/// Parses every element of a backend response, dropping the ones that are not notes.
pub fn normalize_notes(values: &[Value]) -> Vec<NoteEvent> {
    let mut notes = Vec::with_capacity(values.len());
    let mut rejected = 0usize;
    for value in values {
        match NoteEvent::from_value(value) {
            Ok(note) => notes.push(note),
            Err(reason) => {
                rejected += 1;
                log::debug!("dropping backend element {}: {}", value, reason);
            }
        }
    }
    if rejected > 0 {
        log::warn!(
            "dropped {} of {} backend elements that were not notes",
            rejected,
            values.len()
        );
    }
    notes
}

/// Concatenates chunk outputs, removes exact duplicates and sorts by [`NoteEvent::chart_order`].
pub fn merge_notes<I>(parts: I) -> Vec<NoteEvent>
where
    I: IntoIterator<Item = Vec<NoteEvent>>,
{
    let mut seen = HashSet::new();
    let mut merged: Vec<NoteEvent> = parts
        .into_iter()
        .flatten()
        .filter(|note| seen.insert(note.identity_key()))
        .collect();
    merged.sort_by(NoteEvent::chart_order);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_from_value_short_note() {
        let note = NoteEvent::from_value(&json!({"time": 0.1, "type": "short", "position": 1}))
            .unwrap();
        assert_eq!(note, NoteEvent::short(0.1, 1));
    }

    #[test]
    fn test_from_value_rounds_time_and_accepts_float_lane() {
        let note =
            NoteEvent::from_value(&json!({"time": 1.234_56, "type": "short", "position": 2.0}))
                .unwrap();
        assert_eq!(note.time, 1.2346);
        assert_eq!(note.position, Some(2));
    }

    #[test]
    fn test_from_value_missing_type_is_short() {
        let note = NoteEvent::from_value(&json!({"time": 0.5, "position": 3})).unwrap();
        assert_eq!(note.kind, NoteKind::Short);
    }

    #[test]
    fn test_from_value_keeps_out_of_range_lane() {
        let note =
            NoteEvent::from_value(&json!({"time": 0.5, "type": "short", "position": 9})).unwrap();
        assert_eq!(note.position, Some(9));
    }

    #[test]
    fn test_from_value_rejections() {
        assert_eq!(
            NoteEvent::from_value(&json!([1, 2])),
            Err(NoteRejection::NotAnObject)
        );
        assert_eq!(
            NoteEvent::from_value(&json!({"type": "short"})),
            Err(NoteRejection::MissingTime)
        );
        assert_eq!(
            NoteEvent::from_value(&json!({"time": "0.1"})),
            Err(NoteRejection::InvalidTime)
        );
        assert_eq!(
            NoteEvent::from_value(&json!({"time": 0.1, "type": "slide"})),
            Err(NoteRejection::UnknownType("slide".to_string()))
        );
        assert_eq!(
            NoteEvent::from_value(&json!({"time": 0.1, "position": 1.5})),
            Err(NoteRejection::InvalidField("position"))
        );
    }

    #[test]
    fn test_to_value_matches_wire_shape() {
        let note = NoteEvent::short(0.1, 1);
        assert_eq!(
            note.to_value(),
            json!({"time": 0.1, "type": "short", "position": 1})
        );
        assert_eq!(serde_json::to_value(&note).unwrap(), note.to_value());
    }

    #[test]
    fn test_normalize_drops_only_bad_elements() {
        let values = vec![
            json!({"time": 0.1, "type": "short", "position": 1}),
            json!("garbage"),
            json!({"time": 0.2, "type": "short", "position": 2}),
        ];
        let notes = normalize_notes(&values);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[1].time, 0.2);
    }

    #[test]
    fn test_merge_removes_exact_duplicates() {
        let a = vec![NoteEvent::short(0.1, 1), NoteEvent::short(0.3, 2)];
        let b = vec![NoteEvent::short(0.1, 1)];
        let merged = merge_notes(vec![a, b]);
        assert_eq!(merged, vec![NoteEvent::short(0.1, 1), NoteEvent::short(0.3, 2)]);
    }

    #[test]
    fn test_merge_keeps_chords() {
        let a = vec![NoteEvent::short(0.5, 3)];
        let b = vec![NoteEvent::short(0.5, 1)];
        let merged = merge_notes(vec![a, b]);
        assert_eq!(merged, vec![NoteEvent::short(0.5, 1), NoteEvent::short(0.5, 3)]);
    }

    #[test]
    fn test_merge_sorts_regardless_of_chunk_order() {
        let late = vec![NoteEvent::short(2.0, 1), NoteEvent::short(1.5, 4)];
        let early = vec![NoteEvent::short(0.2, 2)];
        let merged = merge_notes(vec![late, early]);
        let times: Vec<f64> = merged.iter().map(|n| n.time).collect();
        assert_eq!(times, vec![0.2, 1.5, 2.0]);
    }

    #[test]
    fn test_merge_same_time_same_lane_different_kind_survive() {
        let long = NoteEvent {
            time: 1.0,
            kind: NoteKind::Long,
            position: Some(2),
            end: Some(1.5),
            beat: None,
        };
        let merged = merge_notes(vec![vec![long.clone()], vec![NoteEvent::short(1.0, 2)]]);
        assert_eq!(merged, vec![NoteEvent::short(1.0, 2), long]);
    }

    #[test]
    fn test_chart_order_puts_missing_position_first() {
        let marker = NoteEvent {
            time: 1.0,
            kind: NoteKind::ChangeBeat,
            position: None,
            end: None,
            beat: Some(4.0),
        };
        let merged = merge_notes(vec![vec![NoteEvent::short(1.0, 1), marker.clone()]]);
        assert_eq!(merged[0], marker);
    }
}
