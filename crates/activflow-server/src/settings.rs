//! Runtime configuration, deserialised from `config.toml` and `ACTIVFLOW_*`
//! environment variables.

use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  pub store_path:          PathBuf,
  /// With `admin_password_hash`, bootstraps an admin user at startup when
  /// no user has this email.
  pub admin_email:         Option<String>,
  /// argon2 PHC string, see `--hash-password`.
  pub admin_password_hash: Option<String>,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

impl ServerConfig {
  /// Layer the optional TOML file under the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("ACTIVFLOW"))
      .build()?
      .try_deserialize()
  }

  /// The admin credentials to bootstrap, when both are configured.
  pub fn bootstrap_admin(&self) -> Option<(&str, &str)> {
    match (&self.admin_email, &self.admin_password_hash) {
      (Some(email), Some(hash)) if !email.is_empty() && !hash.is_empty() => {
        Some((email.as_str(), hash.as_str()))
      }
      _ => None,
    }
  }
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
