//! InternLink server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and serves the JSON API over HTTP.

mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use chrono::Duration;
use clap::Parser;
use internlink_api::AppState;
use internlink_auth::{GoogleVerifier, IdentityResolver, Passwords, TokenIssuer};
use internlink_core::workflow::ApplicationWorkflow;
use internlink_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use settings::{ServerConfig, expand_tilde};

#[derive(Parser)]
#[command(author, version, about = "InternLink API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = ServerConfig::load(&cli.config)?;

  let store_path = expand_tilde(&cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = Arc::new(
    SqliteStore::open(&store_path)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?,
  );

  let ttl = Duration::try_minutes(cfg.token_ttl_minutes)
    .context("token_ttl_minutes out of range")?;
  let tokens = TokenIssuer::new(cfg.jwt_secret.as_bytes(), ttl)
    .context("invalid token settings")?;
  let passwords = Passwords::new().context("failed to set up password hashing")?;
  let verifier = GoogleVerifier::new(cfg.google_client_id.clone())
    .context("failed to set up Google verification")?;

  let state = AppState {
    identity: IdentityResolver::new(store.clone(), passwords, Arc::new(tokens)),
    workflow: ApplicationWorkflow::new(store),
    verifier: Arc::new(verifier),
  };
  let app = internlink_api::api_router(state).layer(TraceLayer::new_for_http());

  let address = cfg.address();
  tracing::info!(store = ?store_path, "Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  Ok(())
}

async fn shutdown_signal() {
  if tokio::signal::ctrl_c().await.is_ok() {
    tracing::info!("shutting down");
  }
}
