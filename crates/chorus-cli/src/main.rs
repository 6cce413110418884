//! CLI entry point - the composition root.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use chorus_cli::{Cli, CliConfig, CliError, bootstrap, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before clap reads them
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = execute(&cli).await {
        eprintln!("Error: {err:#}");
        let code = err.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
        std::process::exit(code);
    }
    Ok(())
}

async fn execute(cli: &Cli) -> anyhow::Result<()> {
    let config = CliConfig::from_cli(cli)?;
    let server = config.server.clone();
    let ctx = bootstrap(config)
        .await
        .with_context(|| format!("could not start a conversation on {server}"))?;
    run(ctx).await?;
    Ok(())
}

/// Logs go to stderr so they never interleave with the transcript on stdout.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "info,chorus_core=debug,chorus_voice=debug,chorus_cli=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
