mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{Level, info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};
use twitch_online::{Params, StreamMonitor};

use crate::cli::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before parsing so env-backed flags pick it up.
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(args.verbose, args.quiet, args.json);

    let monitor = Arc::new(
        StreamMonitor::new(Some(Params::new(args.client_id, args.oauth_token)))
            .context("Failed to create stream monitor")?,
    );
    monitor.set_interval(Duration::from_secs(args.interval))?;

    let added = monitor.add_channels(args.channels).await;
    info!(channels = added, interval_secs = args.interval, "watching channels");

    monitor.on_online(|stream| {
        info!(
            channel = %stream.user_id,
            title = %stream.title,
            game = %stream.game_name,
            viewers = stream.viewer_count,
            "{} is online",
            stream.user_name
        );
    });
    monitor.on_offline(|channel_id| {
        info!("{} is offline", channel_id);
    });

    let runner = {
        let monitor = monitor.clone();
        tokio::spawn(async move { monitor.start().await })
    };

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("shutting down");
    if !monitor.stop() {
        // Interrupted before the loop reached its first wait point.
        warn!("monitor was not running");
        runner.abort();
        return Ok(());
    }

    runner.await.context("monitor task panicked")??;
    Ok(())
}

fn init_logging(verbose: bool, quiet: bool, json: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry
            .with(fmt::layer().with_target(verbose).with_level(true))
            .init();
    }
}
