//! goldwatch - headless gold price monitor
//!
//! Polls the configured source on a fixed interval, keeps the observation
//! history in SQLite, refits the price model when it goes stale and raises
//! alerts when the price drops out of its deviation band.
//!
//! # Usage
//! ```sh
//! DATABASE_URL=sqlite://data/goldwatch.db cargo run --bin goldwatch
//! DATABASE_URL=sqlite://data/goldwatch.db cargo run --bin goldwatch -- --once
//! ```
//!
//! Alerts are written to the log and, as `ALERT_JSON:` lines, to stdout.

use anyhow::Result;
use clap::Parser;
use goldwatch::application::system::Application;
use goldwatch::config::Config;
use goldwatch::domain::ports::Notifier;
use goldwatch::infrastructure::notifiers::{
    ChannelNotifier, LogNotifier, NotifierRegistry, forward_json_lines,
};
use goldwatch::infrastructure::sources::SimulatedSource;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

const ALERT_CHANNEL_CAPACITY: usize = 64;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run a single cycle, print the status and exit
    #[arg(long)]
    once: bool,

    /// Print the current status and exit without fetching
    #[arg(long)]
    status: bool,

    /// Override MODEL_PATH
    #[arg(long)]
    model_path: Option<PathBuf>,

    /// Override DATABASE_URL
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("goldwatch {} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = Config::from_env()?;
    if let Some(path) = args.model_path {
        config.model.model_path = path;
    }
    if let Some(url) = args.database_url {
        config.storage.database_url = url;
        config.validate()?;
    }
    info!(
        "Configuration loaded: db={}, model={:?}, interval={:?}",
        config.storage.database_url, config.model.model_path, config.schedule.fetch_interval
    );

    let (channel_notifier, alert_rx) = ChannelNotifier::new(ALERT_CHANNEL_CAPACITY);
    let mut notifiers = NotifierRegistry::new();
    notifiers.register(Arc::new(LogNotifier));
    notifiers.register(Arc::new(channel_notifier));
    let notifier: Arc<dyn Notifier> = Arc::new(notifiers);

    // Stand-in transport: one JSON line per alert, ends when the last sender drops
    let printer = tokio::spawn(forward_json_lines(alert_rx, |json| {
        println!("ALERT_JSON:{}", json)
    }));

    let app = Application::build(config, Arc::new(SimulatedSource::default()), notifier).await?;

    if args.status {
        println!("{}", app.status.status().await?);
        drop(app);
    } else if args.once {
        if let Some(report) = app.run_once().await? {
            info!(
                "Cycle {:?}: training {:?}, {} alert(s)",
                report.outcome,
                report.training,
                report.alerts.len()
            );
        }
        println!("{}", app.status.status().await?);
        drop(app);
    } else {
        let handle = app.start();
        info!("Monitor running. Press Ctrl+C to shutdown.");
        handle.wait().await?;
        info!("Shutdown complete.");
    }

    let forwarded = printer.await?;
    info!("Forwarded {} alert(s)", forwarded);
    Ok(())
}
