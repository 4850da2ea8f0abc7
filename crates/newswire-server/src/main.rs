//! newswire server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, starts the maintenance sweeper and serves the JSON API over
//! HTTP until interrupted.
//!
//! ```text
//! newswire --once        # one sweep, report on stdout, exit
//! newswire --no-http     # sweeper only
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use newswire_api::ApiState;
use newswire_engine::{LiveFeed, Sweeper};
use newswire_server::{ServerConfig, expand_tilde};
use newswire_store_sqlite::SqliteStore;
use tokio::{net::TcpListener, sync::watch};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Newswire live-event server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Run a single sweep, print its report as JSON and exit.
  #[arg(long)]
  once: bool,

  /// Run the sweeper without serving HTTP.
  #[arg(long, conflicts_with = "once")]
  no_http: bool,
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
  let cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to read configuration from {:?}", cli.config))?;
  cfg.validate().context("invalid configuration")?;

  // Open SQLite store.
  let store_path = expand_tilde(&cfg.store_path);
  if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = Arc::new(
    SqliteStore::open(&store_path)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?,
  );

  let sweeper = Arc::new(
    Sweeper::new(
      store.clone(),
      cfg.lifecycle.clone(),
      cfg.archive.clone(),
      cfg.dedup.clone(),
    )
    .context("failed to build sweeper")?,
  );

  if cli.once {
    let report = sweeper.run_sweep().await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    drop(sweeper);
    return close_store(store).await;
  }

  let (shutdown_tx, shutdown_rx) = watch::channel(false);
  let sweep_task = tokio::spawn({
    let sweeper = sweeper.clone();
    let interval = cfg.sweep_interval();
    async move { sweeper.run_forever(interval, shutdown_rx).await }
  });

  if cli.no_http {
    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    drop(sweeper);
  } else {
    let state = Arc::new(ApiState {
      feed: LiveFeed::new(store.clone(), cfg.archive.clone()),
      sweeper,
      store: store.clone(),
    });
    let app = newswire_server::router(state);
    let address = cfg.address();

    tracing::info!("Listening on http://{address}");
    let listener = TcpListener::bind(&address)
      .await
      .with_context(|| format!("failed to bind {address}"))?;

    axum::serve(listener, app)
      .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
      })
      .await
      .context("server error")?;
  }

  tracing::info!("shutting down");
  let _ = shutdown_tx.send(true);
  sweep_task.await.context("sweeper task failed")?;

  close_store(store).await
}

/// Close the store once every other handle is gone.
async fn close_store(store: Arc<SqliteStore>) -> anyhow::Result<()> {
  match Arc::try_unwrap(store) {
    Ok(store) => store.close().await.context("failed to close store"),
    Err(_) => {
      tracing::warn!("store still in use at shutdown; dropping it unclosed");
      Ok(())
    }
  }
}
