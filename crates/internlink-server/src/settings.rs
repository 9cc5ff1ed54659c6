//! Runtime configuration: an optional TOML file overlaid by `INTERNLINK_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use internlink_auth::token::{MAX_TTL_MINUTES, MIN_SECRET_BYTES};
use serde::Deserialize;

pub const ENV_PREFIX: &str = "INTERNLINK";

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:              String,
  #[serde(default = "default_port")]
  pub port:              u16,
  #[serde(default = "default_store_path")]
  pub store_path:        PathBuf,
  /// HS256 signing secret; at least 32 bytes.
  pub jwt_secret:        String,
  #[serde(default = "default_token_ttl")]
  pub token_ttl_minutes: i64,
  /// OAuth client id Google ID tokens must be issued for.
  pub google_client_id:  String,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/internlink/internlink.db") }

fn default_token_ttl() -> i64 { 24 * 60 }

impl ServerConfig {
  /// Read `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix(ENV_PREFIX))
      .build()
      .context("failed to read config file")?;

    let cfg: Self = settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")?;
    cfg.check()?;
    Ok(cfg)
  }

  /// Reject settings that would only fail later, at first login.
  pub fn check(&self) -> anyhow::Result<()> {
    if self.jwt_secret.len() < MIN_SECRET_BYTES {
      bail!("jwt_secret must be at least {MIN_SECRET_BYTES} bytes");
    }
    if !(1..=MAX_TTL_MINUTES).contains(&self.token_ttl_minutes) {
      bail!("token_ttl_minutes must be between 1 and {MAX_TTL_MINUTES}");
    }
    if self.google_client_id.trim().is_empty() {
      bail!("google_client_id must be set");
    }
    Ok(())
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
