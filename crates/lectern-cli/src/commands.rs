//! Subcommands and their arguments.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use lectern_core::AudioFormat;

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// List registered speech providers and what they accept
    Providers {
        /// Print the catalogs as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Narrate a Markdown/HTML document as if it were streamed by a model
    Narrate(NarrateArgs),
}

/// Arguments of `lectern narrate`.
#[derive(Args, Debug, Clone)]
pub struct NarrateArgs {
    /// Input file, or `-` for stdin
    pub input: String,

    /// Speech provider name
    #[arg(short, long, env = "LECTERN_PROVIDER", default_value = "minimax")]
    pub provider: String,

    /// Voice id (defaults to the provider's default voice)
    #[arg(long)]
    pub voice: Option<String>,

    /// Provider model (defaults to the provider's default model)
    #[arg(long)]
    pub model: Option<String>,

    /// Speaking speed on the provider's scale
    #[arg(long)]
    pub speed: Option<f32>,

    /// Pitch on the provider's scale
    #[arg(long, allow_hyphen_values = true)]
    pub pitch: Option<f32>,

    /// Emotion/style label
    #[arg(long)]
    pub emotion: Option<String>,

    /// Audio container: mp3, wav or pcm
    #[arg(long, default_value = "mp3")]
    pub format: AudioFormat,

    /// Sample rate in Hz
    #[arg(long, default_value_t = 24_000)]
    pub sample_rate: u32,

    /// Characters per simulated stream increment
    #[arg(long, default_value_t = 24, value_parser = clap::value_parser!(u32).range(1..))]
    pub chunk_size: u32,

    /// Block identifier (random when omitted)
    #[arg(long)]
    pub block_id: Option<String>,

    /// Directory region audio is written to
    #[arg(long, env = "LECTERN_OUT_DIR", default_value = "lectern-audio")]
    pub out_dir: PathBuf,

    /// SQLite database for audio records
    #[arg(long, env = "LECTERN_DB", default_value = "lectern.db")]
    pub db: PathBuf,
}
