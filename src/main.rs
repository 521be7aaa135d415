//! Congestion forecast - main entry point

use clap::Parser;
use congestion_forecast::cli::{
    cmd_ingest, cmd_predict, cmd_run, cmd_serve, cmd_train, cmd_transform, resolve_config, Cli, Commands,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "congestion_forecast=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Ingest { source }) => {
            if let Some(source) = source {
                config = config.with_source(source);
            }
            cmd_ingest(&config).await?;
        }
        Some(Commands::Transform) => cmd_transform(&config)?,
        Some(Commands::Train { cv_folds, no_evaluate, no_save }) => {
            cmd_train(&config, cv_folds, !no_evaluate, !no_save)?;
        }
        Some(Commands::Predict { x, y, direction, transformed }) => {
            cmd_predict(&config, x, y, &direction, transformed)?;
        }
        Some(Commands::Serve { port, host }) => cmd_serve(config, &host, port).await?,
        Some(Commands::Run) | None => cmd_run(&config).await?,
    }

    Ok(())
}
