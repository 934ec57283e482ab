//! Songs command implementation
//!
//! Lists the metadata registry.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;

use crate::store::{SongRecord, SongStore};

fn key_flags(record: &SongRecord) -> String {
    [(record.meta.has4, "4"), (record.meta.has5, "5"), (record.meta.has6, "6")]
        .iter()
        .map(|(has, key)| if *has { key.to_string() } else { "-".to_string() })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run the songs command
pub fn run(data_dir: &Path, json: bool) -> Result<ExitCode> {
    let store = SongStore::open(data_dir)?;
    let records = store.list()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(ExitCode::SUCCESS);
    }

    if records.is_empty() {
        println!("{}", "No songs uploaded".dimmed());
        return Ok(ExitCode::SUCCESS);
    }

    for record in &records {
        println!(
            "{}  [{}]  {}  {}",
            record.meta.song_id.cyan(),
            key_flags(record),
            record.updated_at.format("%Y-%m-%d %H:%M"),
            record.meta.original_name
        );
    }
    println!("\n{} {}", "Total:".dimmed(), records.len());
    Ok(ExitCode::SUCCESS)
}
