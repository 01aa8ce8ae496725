// crates/codeless-session/src/main.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use codeless_core::{RecordingHost, TransformerRegistry};
use codeless_session::client::EditorClient;
use codeless_session::config::Config;
use codeless_session::ui::UiHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(name = "codeless-session")]
#[clap(about = "Live-edit session client for the codeless editor")]
struct Cli {
    /// TOML config file
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Editor WebSocket URL
    #[clap(short, long)]
    url: Option<String>,

    /// Keep retrying the first connection
    #[clap(short, long)]
    keep_trying: bool,

    /// Units of work allowed to run at once per connection
    #[clap(long)]
    concurrency: Option<usize>,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(url) = cli.url {
        config.editor_url = url;
    }
    if cli.keep_trying {
        config.keep_trying = true;
    }
    if let Some(n) = cli.concurrency {
        anyhow::ensure!(n > 0, "--concurrency must be at least 1");
        config.command_concurrency = n;
    }

    info!(
        url = %config.editor_url,
        keep_trying = config.keep_trying,
        concurrency = config.command_concurrency,
        "starting codeless-session"
    );

    let ui = UiHandle::spawn(&config.ui_thread_name, Box::new(RecordingHost::new()))
        .context("starting UI thread")?;
    let transformers = Arc::new(TransformerRegistry::with_defaults());

    let client = EditorClient::new(config, ui, transformers)
        .on_connect(|| info!("connected to editor"))
        .on_disconnect(|| warn!("editor connection lost, reconnecting"));

    tokio::select! {
        res = client.run() => res,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, shutting down");
            Ok(())
        }
    }
}
