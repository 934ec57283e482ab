//! Compile command implementation
//!
//! Prints the prompts that generation would send for an audio file, one per
//! chunk, without contacting a backend.

use std::process::ExitCode;

use anyhow::Result;
use chaebo_generate::{chunk_onsets, prompt};
use colored::Colorize;

use super::analyze::summarize;
use crate::config::GenerateArgs;

/// Renders every chunk prompt for an audio file.
pub fn compile_prompts(input: &str, args: &GenerateArgs) -> Result<Vec<String>> {
    let summary = summarize(input, &args.analysis)?;
    Ok(chunk_onsets(&summary.onsets, args.chunk_size)
        .iter()
        .map(|chunk| prompt::compile(args.key, summary.tempo, chunk, &args.extra_prompt))
        .collect())
}

/// Run the compile command
///
/// With `chunk`, only that chunk's prompt is printed.
pub fn run(input: &str, args: &GenerateArgs, chunk: Option<usize>) -> Result<ExitCode> {
    let prompts = compile_prompts(input, args)?;
    if prompts.is_empty() {
        eprintln!("{} no onsets detected, nothing to send", "warning:".yellow());
        return Ok(ExitCode::SUCCESS);
    }

    match chunk {
        Some(index) => {
            let text = prompts.get(index).ok_or_else(|| {
                anyhow::anyhow!("chunk {} out of range (0..{})", index, prompts.len())
            })?;
            println!("{}", text);
        }
        None => {
            for (index, text) in prompts.iter().enumerate() {
                println!(
                    "{}",
                    format!("===== chunk {} / {} =====", index + 1, prompts.len()).dimmed()
                );
                println!("{}\n", text);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
