pub mod api;
pub mod db;
pub mod server;
pub mod services;
pub mod settings;
pub mod utils;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::net::TcpListener;

use db::Database;
use server::ServerHandle;
use settings::SettingsStore;

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub settings: Arc<SettingsStore>,
    /// Study new subjects are attached to when the request names none.
    pub active_study_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub config_dir: PathBuf,
    pub db_path: PathBuf,
    pub host: String,
    /// Overrides the port from `config.json`.
    pub port: Option<u16>,
    pub study_name: Option<String>,
}

pub fn init_logging() {
    // RUST_LOG wins; otherwise info and above.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Open the store and settings and pick the active study.
pub async fn open_state(options: &ServeOptions) -> Result<AppState> {
    let settings = SettingsStore::new(options.config_dir.clone())?;
    let config = settings.config();
    if let Err(err) = config.validate() {
        warn!(
            "Configuration in {} is incomplete: {err}",
            settings.dir().display()
        );
    }

    let db = Database::new(options.db_path.clone())?;
    if let Some(path) = db.path() {
        info!("Database opened at {}", path.display());
    }
    let study =
        services::studies::resolve_active_study(&db, &config, options.study_name.clone()).await?;

    Ok(AppState {
        db,
        settings: Arc::new(settings),
        active_study_id: Some(study.id),
    })
}

/// Run the HTTP server until Ctrl-C.
pub async fn serve(options: ServeOptions) -> Result<()> {
    info!("GazeTrack starting up...");

    let state = open_state(&options).await?;
    let port = options
        .port
        .unwrap_or_else(|| state.settings.config().port_or_default());

    let listener = TcpListener::bind((options.host.as_str(), port))
        .await
        .with_context(|| format!("failed to bind {}:{port}", options.host))?;
    let server = ServerHandle::start(listener, state)?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("Shutdown requested");

    server.stop().await
}
