//! Main CLI parser and top-level argument handling.

use clap::Parser;

use crate::commands::Commands;

/// Stream text through a speech provider and emit narration events.
#[derive(Parser)]
#[command(name = "lectern")]
#[command(about = "Narrate streamed tutor output with visual-aware speech synthesis")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}
