//! Delete command implementation

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;

use crate::store::SongStore;

/// Remove a song's audio, chart and registry entry.
pub fn run(song_id: &str, data_dir: &Path) -> Result<ExitCode> {
    let store = SongStore::open(data_dir)?;
    store.delete(song_id)?;
    println!("{} {}", "Deleted".green().bold(), song_id);
    Ok(ExitCode::SUCCESS)
}
