//! Analyze command implementation
//!
//! Runs feature extraction on an audio file and prints tempo and onsets.

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chaebo_analysis::analyze_bytes;
use chaebo_spec::AudioSummary;
use colored::Colorize;

use crate::config::AnalysisArgs;

/// Reads and analyzes an audio file.
pub fn summarize(input: &str, args: &AnalysisArgs) -> Result<AudioSummary> {
    let bytes = fs::read(input).with_context(|| format!("Failed to read audio: {}", input))?;
    let extension = Path::new(input).extension().and_then(|e| e.to_str());
    analyze_bytes(&bytes, extension, &args.to_config())
        .with_context(|| format!("Failed to analyze {}", input))
}

/// Run the analyze command
pub fn run(input: &str, args: &AnalysisArgs, json: bool) -> Result<ExitCode> {
    let summary = summarize(input, args)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("{} {}", "Analyzed:".cyan().bold(), input);
    println!("{} {}", "BPM:".dimmed(), summary.tempo);
    println!("{} {}", "Onsets:".dimmed(), summary.onsets.len());
    for onset in &summary.onsets {
        let pitch = onset
            .pitch
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("  {:>9.4}s  pitch {:>3}  volume {:.3}", onset.time, pitch, onset.volume);
    }
    Ok(ExitCode::SUCCESS)
}
