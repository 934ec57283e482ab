//! Chart command implementation

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chaebo_spec::KeyMode;

use crate::store::{SongStore, StoreError};

/// Print the stored chart document of a song, or one key of it.
pub fn run(song_id: &str, key: Option<KeyMode>, data_dir: &Path) -> Result<ExitCode> {
    let store = SongStore::open(data_dir)?;
    let chart = store
        .load_chart(song_id)?
        .ok_or_else(|| StoreError::MissingFile {
            song_id: song_id.to_string(),
            what: "chart",
        })?;

    let json = match key {
        None => chart.to_json_pretty()?,
        Some(mode) => {
            let entry = chart
                .raw_entry(mode)
                .with_context(|| format!("Song {} has no {} chart", song_id, mode.as_key()))?;
            serde_json::to_string_pretty(entry)?
        }
    };
    println!("{}", json);
    Ok(ExitCode::SUCCESS)
}
