use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use save_export_backend::{BackendConfig, HttpBackend};
use save_export_daemon::config::{self, Config};
use save_export_daemon::{build_router, AppState, ExportTab};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = parse_args()?;

    let listen = env::var("SAVE_EXPORT_LISTEN")
        .ok()
        .or_else(|| cfg.server.listen.clone())
        .unwrap_or_else(|| "127.0.0.1:8089".to_owned());

    let backend = HttpBackend::new(&backend_config(&cfg))?;
    let tab = Arc::new(ExportTab::new(Arc::new(backend)));

    let initial = tab.clone();
    tokio::spawn(async move {
        if let Err(e) = initial.table.refresh(true).await {
            warn!(error = %e, "initial export table load failed");
        }
    });

    let state = AppState {
        tab,
        api_token: env::var("SAVE_EXPORT_API_TOKEN")
            .ok()
            .or_else(|| cfg.security.api_token.clone()),
    };

    let addr: SocketAddr = listen
        .parse()
        .with_context(|| format!("invalid listen address: {listen}"))?;
    let app = build_router(state);

    info!(%addr, "starting export tab server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Parse CLI args, returning the loaded config.
fn parse_args() -> Result<Config> {
    let args: Vec<String> = env::args().collect();
    let mut config_path: Option<PathBuf> = None;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                if i >= args.len() {
                    bail!("--config requires a path argument");
                }
                config_path = Some(PathBuf::from(&args[i]));
            }
            other => bail!("unknown argument: {other}"),
        }
        i += 1;
    }

    match config_path {
        Some(path) => {
            info!(?path, "loading config file");
            config::load_config(&path)
        }
        None => Ok(Config::default()),
    }
}

fn backend_config(cfg: &Config) -> BackendConfig {
    let defaults = BackendConfig::default();
    BackendConfig {
        base_url: env::var("SAVE_EXPORT_BACKEND_URL")
            .ok()
            .or_else(|| cfg.backend.url.clone())
            .unwrap_or(defaults.base_url),
        timeout: env::var("SAVE_EXPORT_BACKEND_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .or(cfg.backend.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
