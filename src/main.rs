use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::info;

use fieldwatch::core::config::Settings;
use fieldwatch::core::dispatch::DispatchPolicy;
use fieldwatch::core::ingest::IngestionLoop;
use fieldwatch::core::log_io::LogTailer;
use fieldwatch::core::registry::AlertRegistry;
use fieldwatch::notify::SmsGateway;
use fieldwatch::server::{self, AppState};

/// Field-sensor alert ingestion and acknowledgment server.
#[derive(Parser)]
#[command(name = "fieldwatch", version)]
struct Cli {
    /// Path of the sensor CSV log file.
    path: PathBuf,
    /// Target telephone number for dispatched alerts.
    number: String,
    /// Optional JSON settings file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Listen port for the query/command interface.
    #[arg(long)]
    port: Option<u16>,
    /// Ingestion poll interval in milliseconds.
    #[arg(long)]
    interval_ms: Option<u64>,
    /// SMS gateway base URL.
    #[arg(long)]
    gateway: Option<String>,
    /// Start with manual triage disabled (alerts notify immediately).
    #[arg(long)]
    auto: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("failed to load settings from {path:?}"))?,
        None => Settings::default(),
    };
    settings.log_path = cli.path;
    settings.target_number = cli.number;
    if let Some(port) = cli.port {
        settings.listen_port = port;
    }
    if let Some(interval_ms) = cli.interval_ms {
        settings.poll_interval_ms = interval_ms;
    }
    if let Some(gateway) = cli.gateway {
        settings.gateway_url = gateway;
    }
    if cli.auto {
        settings.manual_mode = false;
    }

    // The file may not exist yet (the tailer retries), but a path that can
    // never become a readable file is startup misconfiguration.
    if settings.log_path.exists() && !settings.log_path.is_file() {
        anyhow::bail!("source path {:?} is not a regular file", settings.log_path);
    }

    info!(
        "watching {:?}, dispatching to {} via {}",
        settings.log_path, settings.target_number, settings.gateway_url
    );

    let gateway = Arc::new(SmsGateway::new(settings.gateway_url.clone()));
    let state = Arc::new(AppState {
        registry: Mutex::new(AlertRegistry::new()),
        policy: Mutex::new(DispatchPolicy::new(
            gateway,
            settings.target_number.clone(),
            settings.escalate_every,
            settings.manual_mode,
        )),
    });

    let mut ingest = IngestionLoop::new(LogTailer::new(&settings.log_path));
    let poll_interval = Duration::from_millis(settings.poll_interval_ms.max(1));
    let ingest_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(poll_interval);
        loop {
            interval.tick().await;
            // File I/O happens before the locks so a slow read never
            // stalls the HTTP handlers.
            let lines = ingest.poll_source();
            if lines.is_empty() {
                continue;
            }
            let mut registry = ingest_state.registry.lock().unwrap();
            let mut policy = ingest_state.policy.lock().unwrap();
            ingest.admit_batch(lines, &mut registry, &mut policy);
        }
    });

    server::serve(state, settings.listen_port)
        .await
        .context("query/command interface failed")?;
    Ok(())
}
