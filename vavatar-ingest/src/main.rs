//! vavatar-ingest - Voice avatar clip ingest service
//!
//! `serve` runs the HTTP control surface; `ingest` runs one batch from
//! the command line and commits it to the clip library.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vavatar_common::config::{
    default_config_path, load_toml_config, RootFolderInitializer, RootFolderResolver, TomlConfig,
};
use vavatar_common::events::EventBus;
use vavatar_common::human_time::format_clip_duration;

use vavatar_ingest::config::resolve_ingest_settings;
use vavatar_ingest::models::BatchPhase;
use vavatar_ingest::services::{
    BatchAccumulator, EngineHandle, LibraryStore, PathPicker, SymphoniaEngine,
};
use vavatar_ingest::AppState;

/// Command-line arguments for vavatar-ingest
#[derive(Parser, Debug)]
#[command(name = "vavatar-ingest")]
#[command(about = "Batch audio ingest for voice avatars")]
#[command(version)]
struct Cli {
    /// Root folder holding the clip library and database
    #[arg(long, global = true)]
    root_folder: Option<PathBuf>,

    /// TOML config file (default: <config_dir>/vavatar/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP control surface (default)
    Serve {
        /// Listen address, overrides [http] bind
        #[arg(long)]
        bind: Option<String>,
    },

    /// Ingest files as one batch and commit them
    Ingest {
        /// Audio files, in batch order
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Rename an accepted clip: FILE=NAME, or N=NAME for the Nth accepted clip
        #[arg(long = "name", value_parser = parse_name_override)]
        names: Vec<(String, String)>,

        /// Report what would be accepted without committing
        #[arg(long)]
        dry_run: bool,
    },
}

fn parse_name_override(raw: &str) -> Result<(String, String), String> {
    let (key, name) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=NAME, got '{}'", raw))?;
    if key.trim().is_empty() || name.trim().is_empty() {
        return Err(format!("expected ID=NAME, got '{}'", raw));
    }
    Ok((key.trim().to_string(), name.trim().to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(default_config_path);
    let toml_config = match &config_path {
        Some(path) => load_toml_config(path)?,
        None => TomlConfig::default(),
    };

    init_tracing(&toml_config)?;

    info!("Starting vavatar-ingest");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) if path.exists() => info!("Config: {}", path.display()),
        Some(path) => warn!("Config file {} not found, using defaults", path.display()),
        None => warn!("No config directory on this platform, using defaults"),
    }

    // Resolve root folder: CLI → env → TOML → default
    let resolver = RootFolderResolver::new("vavatar-ingest");
    let root_folder = resolver.resolve(cli.root_folder.as_deref(), &toml_config);
    let initializer = RootFolderInitializer::new(root_folder);

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| toml_config.http.bind.clone());
            serve(&toml_config, &initializer, &bind).await
        }
        Command::Ingest {
            paths,
            names,
            dry_run,
        } => ingest(&toml_config, &initializer, paths, names, dry_run).await,
    }
}

/// Level: `RUST_LOG`, else `[logging] level`; optional plain-text file copy
fn init_tracing(toml_config: &TomlConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&toml_config.logging.level))
        .context("Invalid log level")?;

    let file_layer = match &toml_config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(())
}

async fn open_library(initializer: &RootFolderInitializer, in_memory: bool) -> Result<LibraryStore> {
    let db = if in_memory {
        vavatar_ingest::db::init_memory_pool().await?
    } else {
        initializer
            .ensure_directory_exists()
            .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;
        let db_path = initializer.database_path();
        info!("Database: {}", db_path.display());
        vavatar_ingest::db::init_database_pool(&db_path).await?
    };
    Ok(LibraryStore::new(db, initializer.clips_dir()))
}

fn build_pipeline(
    toml_config: &TomlConfig,
    library: &LibraryStore,
    event_bus: EventBus,
) -> Result<BatchAccumulator> {
    let settings = resolve_ingest_settings(toml_config)?;
    let engine = EngineHandle::new(SymphoniaEngine::new());
    Ok(vavatar_ingest::build_pipeline(
        &settings,
        engine,
        Arc::new(library.clone()),
        event_bus,
    ))
}

async fn serve(toml_config: &TomlConfig, initializer: &RootFolderInitializer, bind: &str) -> Result<()> {
    let library = open_library(initializer, false).await?;
    info!("Database connection established");

    let event_bus = EventBus::new(100);
    let pipeline = build_pipeline(toml_config, &library, event_bus)?;

    let state = AppState::new(pipeline.clone(), library);
    let app = vavatar_ingest::build_router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;
    info!("Listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Release anything still staged
    if pipeline.cancel().await {
        info!("Pending batch cancelled at shutdown");
    }
    info!("Server shutdown complete");
    Ok(())
}

async fn ingest(
    toml_config: &TomlConfig,
    initializer: &RootFolderInitializer,
    paths: Vec<PathBuf>,
    names: Vec<(String, String)>,
    dry_run: bool,
) -> Result<()> {
    let library = open_library(initializer, dry_run).await?;
    let pipeline = build_pipeline(toml_config, &library, EventBus::new(100))?;
    let picker = PathPicker::new(paths);

    let progress = tokio::select! {
        result = pipeline.select(&picker) => result?,
        _ = signal::ctrl_c() => {
            pipeline.cancel().await;
            anyhow::bail!("Interrupted; batch cancelled");
        }
    };

    if progress.phase != BatchPhase::Ready {
        anyhow::bail!("Batch did not complete (phase {:?})", progress.phase);
    }

    let entries = pipeline.entries().await;
    for (key, name) in &names {
        let target = match key.parse::<usize>() {
            Ok(n) if n >= 1 => entries.get(n - 1),
            _ => entries.iter().find(|e| &e.source_name == key),
        };
        match target {
            Some(entry) => {
                pipeline.rename(entry.id, name).await?;
            }
            None => warn!(key = %key, "No accepted clip matches --name"),
        }
    }

    println!(
        "Processed {}/{}: {} accepted, {} skipped",
        progress.processed, progress.total, progress.accepted, progress.skipped
    );
    for entry in pipeline.entries().await {
        println!(
            "  + {:<32} {:>10}  ({})",
            entry.display_name, entry.duration_display, entry.source_name
        );
    }
    for item in pipeline.skipped().await {
        match &item.detail {
            Some(detail) => println!("  - {:<32} {}: {}", item.name, item.reason, detail),
            None => println!("  - {:<32} {}", item.name, item.reason),
        }
    }

    if dry_run {
        pipeline.cancel().await;
        println!("Dry run: nothing committed");
        return Ok(());
    }

    let committed = pipeline.commit().await?;
    println!(
        "Committed {} clip(s) to {}",
        committed.len(),
        library.clips_dir().display()
    );
    for clip in committed {
        println!(
            "  {} [{}] -> {}",
            clip.record.display_name,
            format_clip_duration(clip.record.duration),
            clip.location
        );
    }
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
