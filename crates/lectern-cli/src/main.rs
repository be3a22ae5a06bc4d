//! CLI entry point - the composition root.
//!
//! Logging, `.env` loading and argument parsing happen here; handlers get
//! a fully wired [`CliContext`](lectern_cli::CliContext).

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lectern_cli::{Cli, CliConfig, CliError, Commands, bootstrap, handlers};

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Providers { json } => {
            let registry = lectern_cli::bootstrap::provider_registry()?;
            handlers::providers::execute(&registry, json)?;
        }
        Commands::Narrate(args) => {
            let config = CliConfig::from_env(args.db.clone(), args.out_dir.clone())?;
            let ctx = bootstrap(config).await?;
            handlers::narrate::execute(&ctx, &args).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before clap reads `env` defaults
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err}");
        std::process::exit(err.exit_code());
    }
    Ok(())
}
