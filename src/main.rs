//! Binary entrypoint for Photowall.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use photowall::api::Client;
use photowall::config::Configuration;
use photowall::error::Error;
use photowall::events::{Command, DisplayEvent, FetchOutcome, FetchRequest};
use photowall::tasks::{engine, fetcher, input, viewer};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// Simple CLI
#[derive(Debug, Parser)]
#[command(name = "photowall", about = "Kiosk-style image slideshow client")]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE", default_value = "config.yaml")]
    config: PathBuf,

    /// Override the collaborator base URL
    #[arg(long, value_name = "URL")]
    server_url: Option<String>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("photowall={level}").parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("hyper=warn".parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let mut cfg = if cli.config.exists() {
        Configuration::from_yaml_file(&cli.config)
            .with_context(|| format!("loading config from {}", cli.config.display()))?
    } else {
        info!(path = %cli.config.display(), "config file not found; using defaults");
        Configuration::default()
    };
    if let Some(url) = cli.server_url {
        cfg.server_url = url;
    }
    let mut cfg = cfg.validated().context("validating configuration")?;

    let client = Client::new(&cfg.server_url, cfg.request_timeout, cfg.probe_timeout)
        .context("building collaborator client")?;

    // Startup parameters from the collaborator; local values stand on failure.
    let provider = match client.remote_config().await {
        Ok(remote) => {
            cfg.merge_remote(&remote);
            remote.provider.unwrap_or_else(|| "local".to_string())
        }
        Err(err) => {
            warn!(error = %Error::ConfigLoad(err), "falling back to local defaults");
            "local".to_string()
        }
    };
    info!(
        provider,
        interval = %humantime::format_duration(cfg.image_interval),
        query = %cfg.image_query,
        "starting slideshow"
    );

    let (command_tx, command_rx) = mpsc::channel::<Command>(16);
    let (request_tx, request_rx) = mpsc::channel::<FetchRequest>(64);
    let (outcome_tx, outcome_rx) = mpsc::channel::<FetchOutcome>(64);
    let (display_tx, display_rx) = mpsc::channel::<DisplayEvent>(64);
    let cancel = CancellationToken::new();

    let opts = engine::Options::from_config(&cfg);
    let engine_task = tokio::spawn(engine::run(
        opts,
        command_rx,
        request_tx,
        outcome_rx,
        display_tx,
        cancel.clone(),
    ));
    let fetcher_task = tokio::spawn(fetcher::run(
        client,
        request_rx,
        outcome_tx,
        cancel.clone(),
        cfg.fetch_max_concurrent,
    ));
    let viewer_task = tokio::spawn(viewer::run(display_rx, provider, cancel.clone()));
    let input_task = tokio::spawn(input::run(command_tx, cancel.clone()));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("ctrl-c received; shutting down");
            cancel.cancel();
        }
        _ = cancel.cancelled() => {}
    }

    let _ = engine_task.await;
    let _ = fetcher_task.await;
    let _ = viewer_task.await;
    let _ = input_task.await;
    Ok(())
}
