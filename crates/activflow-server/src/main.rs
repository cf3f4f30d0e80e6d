//! ActivFlow server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store, bootstraps the configured admin user and serves the JSON API over
//! HTTP.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `admin_password_hash`:
//!
//! ```text
//! cargo run -p activflow-server -- --hash-password
//! ```

mod settings;

use std::path::PathBuf;

use activflow_api::{AppState, auth::hash_password};
use activflow_core::{
  rbac::Rbac,
  service,
  store::ActivityStore as _,
  user::{NewUser, Profile},
};
use activflow_store_sqlite::SqliteStore;
use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::{ServerConfig, expand_tilde};

#[derive(Parser)]
#[command(author, version, about = "ActivFlow reporting server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password()?;
    let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
    println!("{hash}");
    return Ok(());
  }

  let server_cfg = ServerConfig::load(&cli.config).context("failed to read configuration")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  bootstrap_admin(&store, &server_cfg).await?;

  let app = activflow_api::router(AppState::new(store, Rbac::default()));
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Create the configured admin user if nobody holds that email yet.
async fn bootstrap_admin(store: &SqliteStore, cfg: &ServerConfig) -> anyhow::Result<()> {
  let Some((email, password_hash)) = cfg.bootstrap_admin() else {
    return Ok(());
  };
  let existing = store
    .find_user_by_email(email.trim().to_lowercase())
    .await
    .context("failed to look up admin user")?;
  if existing.is_some() {
    return Ok(());
  }

  service::create_user(store, NewUser {
    email:         email.to_owned(),
    firstname:     "Admin".to_owned(),
    lastname:      String::new(),
    profile:       Profile::Admin,
    password_hash: password_hash.to_owned(),
  })
  .await
  .context("failed to create admin user")?;
  tracing::info!(email, "admin user created");
  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_owned())
}
