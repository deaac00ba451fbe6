mod config;
mod error;
mod logging;
mod ports;
mod services;
mod spotify_api;
mod store;
#[cfg(test)]
mod test_utils;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};

use crate::{
    config::Config,
    logging::{init_tracing, shutdown_tracing},
    services::{
        history::load_history,
        spotify::client::SpotifyHttpAdapter,
        sync::{SyncContext, SyncOutcome, SyncService, SyncState},
    },
    store::record_store::RecordStore,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "PLAYED_HISTORY_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `info` or `played_history=debug`
    #[arg(long, default_value = "info", global = true, env = "LOG_LEVEL")]
    log_level: String,

    /// Export spans to this OTLP (gRPC) endpoint
    #[arg(long, global = true, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch plays newer than the last saved one and store them
    Sync,
    /// Print every stored play, oldest first, one line each
    History {
        /// Print the flattened records as JSON instead
        #[arg(long)]
        json: bool,
    },
    /// Inspect or create the config file
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let tracer_provider = init_tracing(
        env!("CARGO_PKG_NAME"),
        args.otlp_endpoint.as_deref(),
        &args.log_level,
    )?;

    let result = run(args).await;
    shutdown_tracing(tracer_provider);
    result
}

async fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::from_file(path),
        None => Config::load(),
    }
    .with_context(|| "Failed to load played-history config")?;

    match args.command {
        Commands::Sync => sync(&config).await,
        Commands::History { json } => history(&config, json),
        Commands::Config(config_commands) => match config_commands {
            ConfigCommands::CreateDefault => {
                let path = Config::create_default()?;
                tracing::info!("Default config at {}", path.display());
                Ok(())
            }
            ConfigCommands::Path => {
                match Config::config_path() {
                    Some(path) => println!("{}", path.display()),
                    None => println!("No default config path found"),
                }
                Ok(())
            }
        },
    }
}

async fn sync(config: &Config) -> Result<()> {
    tracing::debug!(
        "Using credentials {} and data directory {}",
        config.credentials_path().display(),
        config.data_directory_path().display()
    );

    let context = SyncContext::load(config).wrap_err("Failed to load credentials")?;
    let adapter = SpotifyHttpAdapter::new(&config.spotify, config.sync.max_pages())
        .wrap_err("Failed to build HTTP client")?;
    let service = SyncService::new(adapter, context);

    match service.run().await {
        Ok(SyncOutcome::Saved { count, persisted }) => {
            tracing::debug!(
                state = %SyncState::Done,
                saved = count,
                snapshot = %persisted.snapshot.display(),
                latest = %persisted.latest.display(),
            );
            Ok(())
        }
        Ok(SyncOutcome::NoNewPlays { watermark }) => {
            let since = watermark.map(|mark| mark.played_at);
            tracing::debug!(state = %SyncState::Done, saved = 0, since = ?since);
            Ok(())
        }
        Err(failure) => {
            tracing::error!(
                state = %SyncState::Failed,
                failed_in = %failure.state,
                error = %failure.error,
                "Sync run failed"
            );
            Err(eyre!("Sync failed while {}", failure.state))
        }
    }
}

fn history(config: &Config, json: bool) -> Result<()> {
    let store = RecordStore::new(config.data_directory_path());
    let plays = load_history(&store).wrap_err("Failed to read stored history")?;

    if json {
        let records: Vec<_> = plays.into_iter().map(|play| play.0).collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        for play in &plays {
            println!("{}", play.line());
        }
    }

    Ok(())
}
