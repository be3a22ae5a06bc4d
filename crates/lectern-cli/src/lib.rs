//! Command-line front end for lectern.
//!
//! `main.rs` is the composition root; this library holds the argument
//! definitions, the bootstrap that wires adapters together, and the
//! command handlers, so they can be exercised from tests.
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

#[cfg(test)]
use async_trait as _;
#[cfg(test)]
use tempfile as _;

// Used by the binary only
use anyhow as _;
use dotenvy as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;

// Re-export primary types for convenient access
pub use bootstrap::{CliConfig, CliContext, bootstrap};
pub use commands::{Commands, NarrateArgs};
pub use error::CliError;
pub use parser::Cli;
