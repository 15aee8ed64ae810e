//! Packet Sniffer - passive 802.15.4-style frame capture
//!
//! Reads a demodulated bit stream, finds frames by their access code,
//! decodes the MAC header, verifies the CRC and records every frame plus a
//! per-channel summary in SQLite. The input bits are passed through unchanged.

mod capture;
mod config;
mod frame;
mod sink;
mod sniffer;
mod sync;

use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use capture::{BitCapture, CaptureConfig};
use config::Config;
use sink::{RecordSink, SqliteStore};
use sniffer::PacketSniffer;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("packet_sniffer=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("===========================================");
    info!("   Packet Sniffer - 802.15.4 frame capture");
    info!("===========================================");

    // Load configuration
    let config = Config::from_env()?;
    let pattern = config.sync_pattern()?;

    info!("Configuration:");
    info!("  Sync pattern: {} ({})", config.sync_pattern, config.sync_tag);
    info!("  Sync threshold: {}", config.sync_threshold);
    info!("  Channel: {}", config.channel);
    info!("  Bitrate: {} bit/s", config.bitrate);
    info!("  Database: {}", config.db_path.display());
    info!("  Input: {} ({:?})", config.input_path, config.input_format);
    if let Some(path) = &config.passthrough_path {
        info!("  Passthrough: {}", path.display());
    }
    if config.run_minutes > 0 {
        info!("  Runtime limit: {} min", config.run_minutes);
    }

    let store = SqliteStore::open(&config.db_path)
        .with_context(|| format!("Failed to open database {}", config.db_path.display()))?;
    let sink = RecordSink::spawn(Box::new(store), &config.channel)?;

    let sniffer = PacketSniffer::new(pattern, &config.sync_tag, config.bitrate, sink);
    sniffer.log_report_header();
    let sniffer = Arc::new(Mutex::new(sniffer));

    let source: Box<dyn Read + Send> = if config.input_path == "-" {
        Box::new(std::io::stdin())
    } else {
        Box::new(
            File::open(&config.input_path)
                .with_context(|| format!("Failed to open input {}", config.input_path))?,
        )
    };

    let passthrough: Option<Box<dyn Write + Send>> = match &config.passthrough_path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create passthrough output {}", path.display()))?;
            Some(Box::new(BufWriter::new(file)))
        }
        None => None,
    };

    let capture = BitCapture::new(CaptureConfig {
        format: config.input_format,
        chunk_size: config.chunk_size,
        ..Default::default()
    });
    let capture_handle = capture.start(sniffer.clone(), source, passthrough)?;

    info!("===========================================");
    info!("  Sniffing on channel '{}'...", config.channel);
    info!("  Press Ctrl+C to stop.");
    info!("===========================================");

    let run_minutes = config.run_minutes;
    let runtime_limit = async move {
        if run_minutes == 0 {
            std::future::pending::<()>().await;
        } else {
            tokio::time::sleep(Duration::from_secs(run_minutes * 60)).await;
        }
    };

    let capture_ended = async {
        let mut tick = tokio::time::interval(Duration::from_millis(200));
        while capture.is_running() {
            tick.tick().await;
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for Ctrl+C: {}", e);
            }
            info!("Interrupted, shutting down");
        }
        _ = runtime_limit => info!("Runtime limit of {} min reached", run_minutes),
        _ = capture_ended => info!("Input exhausted"),
    }

    // Cleanup
    capture.stop();

    // A reader blocked on stdin cannot be interrupted; only join a finished thread
    if capture_handle.is_finished() {
        match capture_handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Capture ended with error: {:#}", e),
            Err(_) => error!("Capture thread panicked"),
        }
    }

    let stats = capture.stats();
    info!(
        "Capture: {} bytes read, {} bits in {} chunks",
        stats.bytes_read.load(Ordering::Relaxed),
        stats.bits_ingested.load(Ordering::Relaxed),
        stats.chunks_processed.load(Ordering::Relaxed)
    );

    let summary = sniffer
        .lock()
        .map_err(|_| anyhow!("sniffer lock poisoned"))?
        .stop()?;

    if let Some(summary) = summary {
        info!(
            "Channel '{}': {} packets, {:.3} s total on-air time",
            summary.channel, summary.packet_count, summary.total_time_seconds
        );
    }
    info!("Full sniffing report available at: {}", config.db_path.display());

    Ok(())
}
