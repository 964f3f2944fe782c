//! Espera node binary: boots the replicated scheduler core, the default
//! channel's drivers, and the delivery loop, then runs until signalled.

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::bounded;
use espera_core::drivers::{DriverRegistry, MemoryHub};
use espera_core::{
    ChannelPriorityStore, CommandApplier, CommandLog, DeliveryProcessor, EsperaConfig, IngestPump,
    IngestTarget, LocalLog, PrioritizedStateMachine,
};
use tracing::{error, info};

fn load_config() -> EsperaConfig {
    let paths = ["espera.toml", "/etc/espera/espera.toml"];

    for path in &paths {
        if Path::new(path).exists() {
            match std::fs::read_to_string(path) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(config) => {
                        info!(path, "loaded configuration");
                        return config;
                    }
                    Err(e) => {
                        eprintln!("error parsing {path}: {e}");
                        std::process::exit(1);
                    }
                },
                Err(e) => {
                    eprintln!("error reading {path}: {e}");
                    std::process::exit(1);
                }
            }
        }
    }

    info!("no config file found, using defaults");
    EsperaConfig::default()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    espera_core::telemetry::init_tracing();

    let config = load_config();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        poll_interval_ms = config.processor.poll_interval_ms,
        "espera node starting"
    );

    let store = Arc::new(ChannelPriorityStore::new());
    let fsm = Arc::new(PrioritizedStateMachine::new(Arc::clone(&store)));
    let log = Arc::new(LocalLog::new(fsm, config.cluster.command_channel_capacity)?);
    let applier = Arc::new(CommandApplier::new(
        Arc::clone(&log) as Arc<dyn CommandLog>,
        Duration::from_millis(config.cluster.submit_timeout_ms),
    ));

    let hub = Arc::new(MemoryHub::new());
    let registry = DriverRegistry::with_memory(hub);

    // One cancel channel fans out to every loop; dropping the sender on
    // shutdown stops them all within a poll interval.
    let (cancel_tx, cancel_rx) = bounded::<()>(1);
    let mut workers = Vec::new();

    if let Some(channel) = config.channel.clone() {
        let created = applier.create_channel(channel.clone())?;
        info!(channel_id = %created.id, "default channel registered");

        let mut listener = registry.listener(&channel.source)?;
        let (inbound_tx, inbound_rx) = bounded(1024);
        let listener_cancel = cancel_rx.clone();
        workers.push(
            thread::Builder::new()
                .name("espera-listener".to_string())
                .spawn(move || {
                    if let Err(e) = listener.listen(inbound_tx, listener_cancel) {
                        error!(error = %e, "listener terminated");
                    }
                })?,
        );

        let pump = IngestPump::new(
            Arc::clone(&applier),
            inbound_rx,
            IngestTarget::Channel(created.id),
        );
        workers.push(
            thread::Builder::new()
                .name("espera-ingest".to_string())
                .spawn(move || pump.run())?,
        );

        let publisher = registry.publisher(&channel.destination)?;
        let processor = DeliveryProcessor::new(
            Arc::clone(&store),
            publisher,
            cancel_rx.clone(),
            Duration::from_millis(config.processor.poll_interval_ms),
        );
        workers.push(
            thread::Builder::new()
                .name("espera-processor".to_string())
                .spawn(move || {
                    if let Err(e) = processor.run() {
                        error!(error = %e, "delivery processor terminated");
                    }
                })?,
        );
    } else {
        info!("no default channel configured, running reducer only");
    }

    shutdown_signal().await;

    // Dropping the only sender disconnects every cancel receiver.
    drop(cancel_tx);
    drop(cancel_rx);
    for worker in workers {
        let _ = worker.join();
    }

    info!("espera node stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {},
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.expect("failed to install CTRL+C handler");
    }

    info!("received shutdown signal");
}
