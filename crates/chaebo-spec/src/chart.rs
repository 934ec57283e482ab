//! Chart documents keyed by lane count.
//!
//! A [`ChartDocument`] is persisted as a plain JSON object:
//!
//! ```json
//! {
//!   "4key": {"maxscore": {"score": 0, "player": "AAA"}, "chaebo": [...]},
//!   "6key": {"maxscore": {"score": 0, "player": "AAA"}, "chaebo": [...]}
//! }
//! ```
//!
//! Entries are held as raw JSON values so that replacing one key leaves the
//! others exactly as they were read.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ChartError, ChartResult};
use crate::note::NoteEvent;

/// Player name recorded for charts that have not been played yet.
pub const DEFAULT_PLAYER: &str = "AAA";

/// Number of lanes a chart variant targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum KeyMode {
    /// 4 lanes.
    Four,
    /// 5 lanes.
    Five,
    /// 6 lanes.
    Six,
}

impl KeyMode {
    /// All supported key modes in ascending lane count.
    pub const ALL: [KeyMode; 3] = [KeyMode::Four, KeyMode::Five, KeyMode::Six];

    /// Number of lanes.
    pub fn lanes(&self) -> u8 {
        match self {
            KeyMode::Four => 4,
            KeyMode::Five => 5,
            KeyMode::Six => 6,
        }
    }

    /// Document key for this mode (e.g., `"4key"`).
    pub fn as_key(&self) -> &'static str {
        match self {
            KeyMode::Four => "4key",
            KeyMode::Five => "5key",
            KeyMode::Six => "6key",
        }
    }

    /// Parses a document key (e.g., `"5key"`).
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.as_key() == key)
    }
}

impl TryFrom<u8> for KeyMode {
    type Error = ChartError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(KeyMode::Four),
            5 => Ok(KeyMode::Five),
            6 => Ok(KeyMode::Six),
            other => Err(ChartError::UnsupportedKeyMode {
                value: other.to_string(),
            }),
        }
    }
}

impl From<KeyMode> for u8 {
    fn from(mode: KeyMode) -> Self {
        mode.lanes()
    }
}

impl std::str::FromStr for KeyMode {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(mode) = Self::from_key(trimmed) {
            return Ok(mode);
        }
        trimmed
            .parse::<u8>()
            .map_err(|_| ChartError::UnsupportedKeyMode {
                value: trimmed.to_string(),
            })
            .and_then(KeyMode::try_from)
    }
}

impl std::fmt::Display for KeyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.lanes())
    }
}

/// Best score recorded for a chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxScore {
    /// Score value.
    pub score: i64,
    /// Player name.
    pub player: String,
}

impl Default for MaxScore {
    fn default() -> Self {
        Self {
            score: 0,
            player: DEFAULT_PLAYER.to_string(),
        }
    }
}

/// One playable chart for one key mode.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KeyChart {
    /// Best score, zero for a freshly generated chart.
    pub maxscore: MaxScore,
    /// Time-ordered notes.
    pub chaebo: Vec<NoteEvent>,
}

impl KeyChart {
    /// Wraps notes with a zero score.
    pub fn new(chaebo: Vec<NoteEvent>) -> Self {
        Self {
            maxscore: MaxScore::default(),
            chaebo,
        }
    }

    /// Fixed four-note pattern used when generation is disabled or fails.
    pub fn dummy() -> Self {
        Self::new(vec![
            NoteEvent::short(0.214, 1),
            NoteEvent::short(0.429, 3),
            NoteEvent::short(0.643, 2),
            NoteEvent::short(0.857, 4),
        ])
    }

    /// Converts to the persisted JSON shape.
    pub fn to_value(&self) -> Value {
        let mut maxscore = Map::new();
        maxscore.insert("score".to_string(), Value::from(self.maxscore.score));
        maxscore.insert(
            "player".to_string(),
            Value::from(self.maxscore.player.as_str()),
        );

        let mut obj = Map::new();
        obj.insert("maxscore".to_string(), Value::Object(maxscore));
        obj.insert(
            "chaebo".to_string(),
            Value::Array(self.chaebo.iter().map(NoteEvent::to_value).collect()),
        );
        Value::Object(obj)
    }
}

/// Chart document for one song.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChartDocument {
    entries: Map<String, Value>,
}

impl ChartDocument {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Document holding the dummy chart under every key mode.
    pub fn dummy() -> Self {
        let chart = KeyChart::dummy();
        let mut doc = Self::new();
        for mode in KeyMode::ALL {
            doc.replace_key(mode, &chart);
        }
        doc
    }

    /// Document holding a single key mode.
    pub fn fragment(mode: KeyMode, chart: &KeyChart) -> Self {
        let mut doc = Self::new();
        doc.replace_key(mode, chart);
        doc
    }

    /// Parses a persisted document.
    pub fn from_json_str(text: &str) -> ChartResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Wraps a JSON value, which must be an object.
    pub fn from_value(value: Value) -> ChartResult<Self> {
        match value {
            Value::Object(entries) => Ok(Self { entries }),
            Value::Array(_) => Err(ChartError::NotAnObject { found: "array" }),
            Value::String(_) => Err(ChartError::NotAnObject { found: "string" }),
            Value::Number(_) => Err(ChartError::NotAnObject { found: "number" }),
            Value::Bool(_) => Err(ChartError::NotAnObject { found: "boolean" }),
            Value::Null => Err(ChartError::NotAnObject { found: "null" }),
        }
    }

    /// Serializes with two-space indentation.
    pub fn to_json_pretty(&self) -> ChartResult<String> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    /// Returns true if the document has an entry for the key mode.
    pub fn contains(&self, mode: KeyMode) -> bool {
        self.entries.contains_key(mode.as_key())
    }

    /// Key modes present in the document.
    pub fn key_modes(&self) -> Vec<KeyMode> {
        KeyMode::ALL
            .into_iter()
            .filter(|mode| self.contains(*mode))
            .collect()
    }

    /// Returns true if the document has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw JSON entry for the key mode, exactly as stored.
    pub fn raw_entry(&self, mode: KeyMode) -> Option<&Value> {
        self.entries.get(mode.as_key())
    }

    /// Typed view of the entry for the key mode.
    pub fn key_chart(&self, mode: KeyMode) -> ChartResult<Option<KeyChart>> {
        match self.entries.get(mode.as_key()) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| ChartError::MalformedEntry {
                    key: mode.as_key().to_string(),
                    message: e.to_string(),
                }),
        }
    }

    /// Replaces exactly one key mode; every other entry is left untouched.
    pub fn replace_key(&mut self, mode: KeyMode, chart: &KeyChart) {
        self.entries
            .insert(mode.as_key().to_string(), chart.to_value());
    }

    /// Removes a key mode, returning whether it was present.
    pub fn remove_key(&mut self, mode: KeyMode) -> bool {
        self.entries.shift_remove(mode.as_key()).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_key_mode_parsing() {
        assert_eq!("4".parse::<KeyMode>().unwrap(), KeyMode::Four);
        assert_eq!("5key".parse::<KeyMode>().unwrap(), KeyMode::Five);
        assert_eq!(KeyMode::try_from(6).unwrap(), KeyMode::Six);
        assert!("7".parse::<KeyMode>().is_err());
        assert!(KeyMode::try_from(3).is_err());
    }

    #[test]
    fn test_dummy_document_shape() {
        let doc = ChartDocument::dummy();
        assert_eq!(doc.key_modes(), KeyMode::ALL.to_vec());

        let expected = json!({
            "maxscore": {"score": 0, "player": "AAA"},
            "chaebo": [
                {"time": 0.214, "type": "short", "position": 1},
                {"time": 0.429, "type": "short", "position": 3},
                {"time": 0.643, "type": "short", "position": 2},
                {"time": 0.857, "type": "short", "position": 4}
            ]
        });
        for mode in KeyMode::ALL {
            assert_eq!(doc.raw_entry(mode), Some(&expected));
        }
    }

    #[test]
    fn test_fragment_holds_one_key() {
        let doc = ChartDocument::fragment(KeyMode::Four, &KeyChart::new(vec![]));
        assert_eq!(doc.key_modes(), vec![KeyMode::Four]);
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({"4key": {"maxscore": {"score": 0, "player": "AAA"}, "chaebo": []}})
        );
    }

    #[test]
    fn test_replace_key_leaves_other_keys_byte_identical() {
        let stored = r#"{
  "4key": {"maxscore": {"score": 9120, "player": "ZED"}, "chaebo": [{"time": 0.1, "type": "short", "position": 1, "note": "x"}]},
  "6key": {"maxscore": {"score": 0, "player": "AAA"}, "chaebo": [{"time": 1.25, "type": "short", "position": 6}]}
}"#;
        let mut doc = ChartDocument::from_json_str(stored).unwrap();
        let four_before = serde_json::to_string(doc.raw_entry(KeyMode::Four).unwrap()).unwrap();
        let six_before = serde_json::to_string(doc.raw_entry(KeyMode::Six).unwrap()).unwrap();

        doc.replace_key(KeyMode::Five, &KeyChart::new(vec![NoteEvent::short(0.5, 5)]));

        let four_after = serde_json::to_string(doc.raw_entry(KeyMode::Four).unwrap()).unwrap();
        let six_after = serde_json::to_string(doc.raw_entry(KeyMode::Six).unwrap()).unwrap();
        assert_eq!(four_before, four_after);
        assert_eq!(six_before, six_after);
        assert_eq!(doc.key_modes(), KeyMode::ALL.to_vec());
    }

    #[test]
    fn test_replace_key_keeps_stored_field_order() {
        let four = r#"{"maxscore":{"score":9120,"player":"ZED"},"chaebo":[{"time":0.1,"type":"short","position":1}]}"#;
        let six = r#"{"chaebo":[{"position":6,"time":1.25,"type":"short"}],"maxscore":{"score":0,"player":"AAA"}}"#;
        let stored = format!(r#"{{"6key":{six},"4key":{four}}}"#);
        let mut doc = ChartDocument::from_json_str(&stored).unwrap();

        doc.replace_key(KeyMode::Five, &KeyChart::new(vec![NoteEvent::short(0.5, 5)]));
        doc.replace_key(KeyMode::Six, &KeyChart::dummy());
        assert!(doc.remove_key(KeyMode::Six));

        let text = serde_json::to_string(&doc).unwrap();
        assert!(text.starts_with(&format!(r#"{{"4key":{four},"5key":"#)), "{text}");
        assert_eq!(
            serde_json::to_string(doc.raw_entry(KeyMode::Four).unwrap()).unwrap(),
            four
        );
    }

    #[test]
    fn test_pretty_output_keeps_stored_field_order() {
        let stored = r#"{"5key":{"maxscore":{"score":1,"player":"B"},"chaebo":[]},"4key":{"chaebo":[],"maxscore":{"score":2,"player":"A"}}}"#;
        let mut doc = ChartDocument::from_json_str(stored).unwrap();
        doc.replace_key(KeyMode::Six, &KeyChart::new(vec![]));

        let pretty = doc.to_json_pretty().unwrap();
        let five_at = pretty.find("\"5key\"").unwrap();
        let four_at = pretty.find("\"4key\"").unwrap();
        let six_at = pretty.find("\"6key\"").unwrap();
        assert!(five_at < four_at && four_at < six_at);

        let four_entry = &pretty[four_at..six_at];
        let maxscore_at = four_entry.find("\"maxscore\"").unwrap();
        assert!(four_entry.find("\"chaebo\"").unwrap() < maxscore_at);
        let maxscore = &four_entry[maxscore_at..];
        assert!(maxscore.find("\"score\"").unwrap() < maxscore.find("\"player\"").unwrap());
    }

    #[test]
    fn test_key_chart_roundtrip_through_document() {
        let chart = KeyChart::new(vec![NoteEvent::short(0.1, 1), NoteEvent::short(0.1, 2)]);
        let doc = ChartDocument::fragment(KeyMode::Six, &chart);
        let text = doc.to_json_pretty().unwrap();
        let parsed = ChartDocument::from_json_str(&text).unwrap();
        assert_eq!(parsed.key_chart(KeyMode::Six).unwrap(), Some(chart));
        assert_eq!(parsed.key_chart(KeyMode::Four).unwrap(), None);
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        let err = ChartDocument::from_json_str("[1, 2]").unwrap_err();
        assert_eq!(err.code(), "CHART_002");
    }

    #[test]
    fn test_key_chart_reports_malformed_entry() {
        let doc = ChartDocument::from_json_str(r#"{"4key": {"chaebo": 3}}"#).unwrap();
        let err = doc.key_chart(KeyMode::Four).unwrap_err();
        assert_eq!(err.code(), "CHART_003");
    }

    #[test]
    fn test_remove_key() {
        let mut doc = ChartDocument::dummy();
        assert!(doc.remove_key(KeyMode::Five));
        assert!(!doc.remove_key(KeyMode::Five));
        assert_eq!(doc.key_modes(), vec![KeyMode::Four, KeyMode::Six]);
    }
}
