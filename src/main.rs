//! OptionsHouse command line client.

use anyhow::Context;
use clap::Parser;
use optionshouse::cli::{Cli, execute};
use optionshouse::config::Config;
use optionshouse_client::Session;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut session = Session::new(config.client_config(cli.password.as_deref())?)?;
    info!("Using {}", session.config().remote_host);

    let response = execute(&mut session, &cli.command, !cli.no_logout).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
