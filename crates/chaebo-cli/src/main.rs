//! Chaebo CLI - onset analysis and chart generation for rhythm-game songs
//!
//! This binary uploads songs into a local store, generates charts for them
//! through a text-generation backend and inspects the results.

use std::path::PathBuf;
use std::process::ExitCode;

use chaebo_spec::KeyMode;
use clap::{Parser, Subcommand};

use chaebo_cli::commands;
use chaebo_cli::commands::lint::LintTarget;
use chaebo_cli::config::{resolve_data_dir, AnalysisArgs, BackendArgs, GenerateArgs};

/// Chaebo - rhythm-game chart generation from audio onsets
#[derive(Parser)]
#[command(name = "chaebo")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Data directory holding uploads, charts and the song registry
    #[arg(long, global = true, env = "CHAEBO_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect tempo and onsets in an audio file
    Analyze {
        /// Path to the audio file (MP3 or WAV)
        #[arg(short, long)]
        input: String,

        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Output machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the generation prompts for an audio file without sending them
    Compile {
        /// Path to the audio file (MP3 or WAV)
        #[arg(short, long)]
        input: String,

        #[command(flatten)]
        generate: GenerateArgs,

        /// Only print this chunk (0-based)
        #[arg(long)]
        chunk: Option<usize>,
    },

    /// Upload a song and generate its first chart
    Upload {
        /// Path to the audio file (MP3 or WAV)
        #[arg(short, long)]
        input: String,

        /// Display name (default: file name without extension)
        #[arg(short, long)]
        name: Option<String>,

        #[command(flatten)]
        generate: GenerateArgs,

        #[command(flatten)]
        backend: BackendArgs,

        /// Output machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Regenerate one key mode of an uploaded song
    Regenerate {
        /// Song identifier
        song_id: String,

        #[command(flatten)]
        generate: GenerateArgs,

        #[command(flatten)]
        backend: BackendArgs,

        /// Output machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the chart document of a song
    Chart {
        /// Song identifier
        song_id: String,

        /// Only print this key mode
        #[arg(short, long)]
        key: Option<KeyMode>,
    },

    /// List uploaded songs
    Songs {
        /// Output machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a song's audio, chart and registry entry
    Delete {
        /// Song identifier
        song_id: String,
    },

    /// Send a raw prompt to the backend and print the reply
    Ask {
        /// Prompt text
        prompt: Option<String>,

        /// Read the prompt from a file
        #[arg(long, conflicts_with = "prompt")]
        prompt_file: Option<String>,

        /// Rejected: ask always needs a backend
        #[arg(long)]
        no_llm: bool,

        #[command(flatten)]
        backend: BackendArgs,
    },

    /// Report chart rule violations (never modifies the chart)
    Lint {
        /// Song identifier
        #[arg(required_unless_present = "chart")]
        song_id: Option<String>,

        /// Lint a chart document file instead of a stored song
        #[arg(long, conflicts_with = "song_id")]
        chart: Option<String>,

        /// Only lint this key mode
        #[arg(short, long)]
        key: Option<KeyMode>,

        /// Also report note times that are not detected onsets
        #[arg(long)]
        onsets: bool,

        /// Exit non-zero on warnings
        #[arg(long)]
        strict: bool,

        /// Output machine-readable JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let data_dir = resolve_data_dir(cli.data_dir);

    let result = match cli.command {
        Commands::Analyze {
            input,
            analysis,
            json,
        } => commands::analyze::run(&input, &analysis, json),
        Commands::Compile {
            input,
            generate,
            chunk,
        } => commands::compile::run(&input, &generate, chunk),
        Commands::Upload {
            input,
            name,
            generate,
            backend,
            json,
        } => commands::upload::run(&input, name.as_deref(), &data_dir, &generate, &backend, json),
        Commands::Regenerate {
            song_id,
            generate,
            backend,
            json,
        } => commands::regenerate::run(&song_id, &data_dir, &generate, &backend, json),
        Commands::Chart { song_id, key } => commands::chart::run(&song_id, key, &data_dir),
        Commands::Songs { json } => commands::songs::run(&data_dir, json),
        Commands::Delete { song_id } => commands::delete::run(&song_id, &data_dir),
        Commands::Ask {
            prompt,
            prompt_file,
            no_llm,
            backend,
        } => commands::ask::run(prompt.as_deref(), prompt_file.as_deref(), no_llm, &backend),
        Commands::Lint {
            song_id,
            chart,
            key,
            onsets,
            strict,
            json,
        } => match (&chart, &song_id) {
            (Some(path), _) => {
                commands::lint::run(LintTarget::File(path), key, onsets, strict, &data_dir, json)
            }
            (None, Some(id)) => {
                commands::lint::run(LintTarget::Song(id), key, onsets, strict, &data_dir, json)
            }
            (None, None) => Err(anyhow::anyhow!("a song id or --chart is required")),
        },
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}
