mod commands;

use clap::Parser;
use commands::{Cli, Commands};
use log::{info, warn};
use safe_tx_core::{error::CoreError, native::FileStorage, PendingTxTracker, Settings};
use std::{path::PathBuf, sync::Arc};

type AppError = CoreError;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let settings = if cli.config.exists() {
        let path = cli.config.to_string_lossy();
        Settings::from_file(&path)?
    } else {
        warn!("{} not found, using default settings", cli.config.display());
        Settings::default()
    };
    settings.validate()?;

    match cli.command.unwrap_or(Commands::Pending) {
        Commands::Pending => commands::print_pending(&open_tracker(&settings).await?),
        Commands::Prune => commands::prune(&open_tracker(&settings).await?).await?,
        Commands::Status { tx_id } => {
            commands::print_status(&open_tracker(&settings).await?, &tx_id)?
        }
        Commands::Follow => commands::follow_stdin(&open_tracker(&settings).await?).await,
        Commands::Overrides { path } => commands::print_overrides(&path, &settings)?,
    }
    Ok(())
}

async fn open_tracker(settings: &Settings) -> Result<PendingTxTracker<FileStorage>, AppError> {
    let storage = Arc::new(FileStorage::new(PathBuf::from(&settings.storage_dir)));
    let tracker = PendingTxTracker::restore(storage).await?;
    info!("Loaded pending transactions from {}", settings.storage_dir);
    Ok(tracker)
}
