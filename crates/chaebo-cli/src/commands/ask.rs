//! Ask command implementation
//!
//! Sends a raw prompt to the backend and prints the reply unchanged. There
//! is no fallback: generation errors fail the command.

use std::fs;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chaebo_generate::{ask, GenerationBackend, GenerationRequest};

use crate::config::{runtime, BackendArgs};

/// Sends `prompt` and returns the backend text.
pub async fn ask_backend<B: GenerationBackend>(
    backend: &B,
    request: &GenerationRequest,
    use_llm: bool,
) -> Result<String> {
    if !use_llm {
        anyhow::bail!("ask requires a generation backend; --no-llm is not supported");
    }
    let text = ask(backend, request).await.with_context(|| {
        format!("Generation request to {} failed", backend.name())
    })?;
    Ok(text)
}

/// Run the ask command
///
/// The prompt is taken from `prompt`, or read from `prompt_file`.
pub fn run(
    prompt: Option<&str>,
    prompt_file: Option<&str>,
    no_llm: bool,
    backend: &BackendArgs,
) -> Result<ExitCode> {
    let prompt = match (prompt, prompt_file) {
        (Some(text), _) => text.to_string(),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompt file: {}", path))?,
        (None, None) => anyhow::bail!("a prompt or --prompt-file is required"),
    };
    if prompt.trim().is_empty() {
        anyhow::bail!("prompt is empty");
    }

    let config = backend.to_config();
    let request = config.request(prompt);
    let client = backend.backend()?;
    let text = runtime()?.block_on(ask_backend(&client, &request, !no_llm))?;
    println!("{}", text);
    Ok(ExitCode::SUCCESS)
}
