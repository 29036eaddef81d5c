//! merit server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) layered under
//! `MERIT_*` environment variables, opens the content and reference SQLite
//! stores, and serves the achievement API over HTTP.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use merit_server::{ServerBackend, ServerConfig, files::LocalFileSink};
use merit_store_sqlite::{SqliteContentStore, SqliteReferenceStore};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Merit achievement server")]
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

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("MERIT"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let content_path = expand_tilde(&server_cfg.content_store_path);
  let reference_path = expand_tilde(&server_cfg.reference_store_path);
  let upload_dir = expand_tilde(&server_cfg.upload_dir);

  let content = SqliteContentStore::open(&content_path)
    .await
    .with_context(|| format!("failed to open content store at {content_path:?}"))?;
  let references = SqliteReferenceStore::open(&reference_path)
    .await
    .with_context(|| format!("failed to open reference store at {reference_path:?}"))?;
  tokio::fs::create_dir_all(&upload_dir)
    .await
    .with_context(|| format!("failed to create upload dir {upload_dir:?}"))?;

  let backend = ServerBackend {
    content,
    references,
    files: LocalFileSink::new(&upload_dir, server_cfg.upload_base_url.clone()),
  };

  let app = merit_server::router(merit_server::state(backend, &server_cfg), upload_dir);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
