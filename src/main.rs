//! fretsync - command-line front end for the practice-data sync core
//!
//! Runs sync passes against the configured backend, manages local backups
//! and can host the reference backend.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use fretsync::config::Config;
use fretsync::remote::{EnvToken, HttpRemoteStore};
use fretsync::store::{JsonFileStore, SnapshotStore};
use fretsync::sync::{SyncCoordinator, SyncEvent, SystemClock};
use fretsync::BackupManager;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "fretsync")]
#[command(version, about = "Offline-first sync for guitar practice data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Config file path
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync pass
    Sync,

    /// Sync periodically until interrupted
    Daemon {
        /// Override the sync interval in seconds
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Show local data and sync state
    Status,

    /// Delete all data stored on the backend for this account
    DeleteRemote {
        /// Skip confirmation
        #[arg(long)]
        yes: bool,
    },

    /// Manage local backups
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },

    /// Run the reference sync backend
    #[cfg(feature = "server")]
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        save: bool,
    },
}

#[derive(Subcommand)]
enum BackupAction {
    /// Back up the current local data
    Create,
    /// List backups, newest first
    List,
    /// Replace local data with a backup
    Restore { path: PathBuf },
    /// Delete a backup file
    Delete { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Sync => cmd_sync(config).await,
        Commands::Daemon { interval } => cmd_daemon(config, interval).await,
        Commands::Status => cmd_status(config),
        Commands::DeleteRemote { yes } => cmd_delete_remote(config, yes).await,
        Commands::Backup { action } => cmd_backup(config, action).await,
        #[cfg(feature = "server")]
        Commands::Serve { host, port } => cmd_serve(config, host, port).await,
        Commands::Config { save } => cmd_config(config, cli.config, save),
    }
}

fn open_local(config: &Config) -> Result<Arc<SnapshotStore>> {
    let store = JsonFileStore::open(&config.storage.data_path)?;
    Ok(Arc::new(SnapshotStore::new(Arc::new(store))))
}

fn build_coordinator(config: &Config) -> Result<SyncCoordinator> {
    let local = open_local(config)?;
    let tokens = Arc::new(EnvToken::new(&config.remote.token_env));
    let remote = HttpRemoteStore::new(&config.remote, tokens)?;
    Ok(SyncCoordinator::new(
        config.sync.clone(),
        local,
        Arc::new(remote),
        Arc::new(SystemClock),
    ))
}

async fn cmd_sync(config: Config) -> Result<()> {
    let coordinator = build_coordinator(&config)?;

    if !coordinator.sync_data().await {
        let stats = coordinator.stats();
        bail!(
            "sync failed: {}",
            stats.last_error.unwrap_or_else(|| "unknown error".to_string())
        );
    }

    println!("✅ Sync complete");
    Ok(())
}

async fn cmd_daemon(mut config: Config, interval: Option<u64>) -> Result<()> {
    if let Some(secs) = interval {
        config.sync.interval_secs = secs.max(1);
    }

    let coordinator = build_coordinator(&config)?;
    coordinator.on_event(|event| match event {
        SyncEvent::Completed { outcome, duration_ms } => {
            info!("Pass finished: {:?} in {} ms", outcome, duration_ms)
        }
        SyncEvent::Failed { error } => warn!("Pass failed: {}", error),
        _ => {}
    });
    coordinator.start_auto_sync()?;

    println!("🔄 Syncing every {} s (Ctrl+C to stop)", config.sync.interval_secs);
    tokio::signal::ctrl_c().await?;

    coordinator.stop_auto_sync();
    let stats = coordinator.stats();
    println!(
        "Stopped after {} passes ({} ok, {} failed)",
        stats.total_syncs, stats.successful_syncs, stats.failed_syncs
    );
    Ok(())
}

fn cmd_status(config: Config) -> Result<()> {
    let local = open_local(&config)?;
    let snapshot = local.read()?;

    println!("📊 Local Data");
    println!("═══════════════════════════════════════");
    println!("  Store:        {}", config.storage.data_path.display());
    println!("  Preferences:  {}", snapshot.preferences.len());
    println!("  Favorites:    {}", snapshot.favorites.len());
    println!("  Songs:        {}", snapshot.song_progress.len());
    println!("  Chords:       {}", snapshot.custom_chords.len());
    println!("  Sessions:     {}", snapshot.practice_sessions.len());

    match chrono::DateTime::from_timestamp_millis(snapshot.last_sync_timestamp) {
        Some(at) if snapshot.last_sync_timestamp > 0 => println!("  Last sync:    {}", at),
        _ => println!("  Last sync:    never"),
    }
    println!("  Remote:       {}", config.remote.base_url);
    Ok(())
}

async fn cmd_delete_remote(config: Config, yes: bool) -> Result<()> {
    if !yes {
        bail!("refusing to delete remote data without --yes");
    }

    let coordinator = build_coordinator(&config)?;
    if !coordinator.delete_server_data().await {
        bail!("could not delete remote data");
    }

    println!("🗑️  Remote data deleted");
    Ok(())
}

async fn cmd_backup(config: Config, action: BackupAction) -> Result<()> {
    let manager = BackupManager::new(
        open_local(&config)?,
        &config.backup.backup_dir,
        &config.backup.app_version,
        Arc::new(SystemClock),
    );

    match action {
        BackupAction::Create => {
            let path = manager.create()?;
            println!("💾 Backup written to {}", path.display());
        }
        BackupAction::List => {
            let backups = manager.list()?;
            if backups.is_empty() {
                println!("No backups in {}", manager.dir().display());
            }
            for backup in backups {
                let at = chrono::DateTime::from_timestamp_millis(backup.timestamp)
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| backup.timestamp.to_string());
                println!("  {}  {:>8} B  {}", at, backup.size, backup.path.display());
            }
        }
        BackupAction::Restore { path } => {
            manager.restore(&path).await?;
            println!("♻️  Restored {}", path.display());
        }
        BackupAction::Delete { path } => {
            manager.delete(&path)?;
            println!("Deleted {}", path.display());
        }
    }
    Ok(())
}

#[cfg(feature = "server")]
async fn cmd_serve(mut config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    fretsync::server::start_server(&config.server).await?;
    Ok(())
}

fn cmd_config(config: Config, path: Option<PathBuf>, save: bool) -> Result<()> {
    if save {
        config.save(path.as_deref())?;
        let written = path.unwrap_or_else(Config::default_path);
        println!("Configuration written to {}", written.display());
        return Ok(());
    }

    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
