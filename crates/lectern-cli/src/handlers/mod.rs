//! Command handlers.
//!
//! Handlers follow the canonical pattern:
//! - Signature: `pub async fn execute(ctx: &CliContext, ...) -> Result<(), CliError>`
//! - Thin wrappers that:
//!   1. Parse/validate CLI-specific input
//!   2. Drive the pipeline or registry
//!   3. Format output for the terminal
//!
//! The formatting halves take a `Write` so tests can capture output.

pub mod narrate;
pub mod providers;
