//! Song metadata records kept by the registry.

use serde::{Deserialize, Serialize};

use crate::chart::{ChartDocument, KeyMode};

/// Registry entry for one uploaded song.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongMetadata {
    /// Opaque song identifier.
    pub song_id: String,
    /// Display name.
    pub original_name: String,
    /// Whether a 4-lane chart exists.
    pub has4: bool,
    /// Whether a 5-lane chart exists.
    pub has5: bool,
    /// Whether a 6-lane chart exists.
    pub has6: bool,
}

impl SongMetadata {
    /// Builds the record for a song, mirroring the keys present in its chart.
    pub fn from_chart(
        song_id: impl Into<String>,
        original_name: impl Into<String>,
        chart: &ChartDocument,
    ) -> Self {
        let mut meta = Self {
            song_id: song_id.into(),
            original_name: original_name.into(),
            has4: false,
            has5: false,
            has6: false,
        };
        meta.sync_with(chart);
        meta
    }

    /// Refreshes the `hasN` flags from a chart document.
    pub fn sync_with(&mut self, chart: &ChartDocument) {
        self.has4 = chart.contains(KeyMode::Four);
        self.has5 = chart.contains(KeyMode::Five);
        self.has6 = chart.contains(KeyMode::Six);
    }

    /// Returns whether a chart exists for the key mode.
    pub fn has(&self, mode: KeyMode) -> bool {
        match mode {
            KeyMode::Four => self.has4,
            KeyMode::Five => self.has5,
            KeyMode::Six => self.has6,
        }
    }
}
