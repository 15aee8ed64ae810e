//! Asynchronous frame persistence
//!
//! Records are queued from the processing path and written by a single
//! dedicated thread, so storage latency never reaches the bit stream. The
//! per-channel summary is kept in memory and written once, after the queue
//! has been drained.

mod store;
mod summary;
#[cfg(test)]
pub(crate) mod testing;

pub use store::{FrameStore, SqliteStore};
#[cfg(test)]
pub use store::StoreError;
pub use summary::ChannelSummary;

use summary::SessionTotals;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::frame::FrameRecord;

/// Frame table name for a channel: `packets_` plus the channel with every
/// character outside `[A-Za-z0-9_]` replaced by `_`
pub fn table_name(channel: &str) -> String {
    let sanitized: String = channel
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!("packets_{}", sanitized)
}

/// Writer statistics (atomic, shared with the writer thread)
#[derive(Debug, Default)]
pub struct WriterStats {
    pub written: AtomicU64,
    pub failed: AtomicU64,
}

/// Queue-backed persistence of frame records plus the channel summary
pub struct RecordSink {
    channel: String,
    table: String,
    tx: Option<Sender<FrameRecord>>,
    worker: Option<JoinHandle<Box<dyn FrameStore>>>,
    totals: SessionTotals,
    stats: Arc<WriterStats>,
    finalized: bool,
}

impl RecordSink {
    /// Prepare the channel table and start the writer thread
    pub fn spawn(mut store: Box<dyn FrameStore>, channel: &str) -> Result<Self> {
        let table = table_name(channel);
        store
            .prepare_table(&table)
            .with_context(|| format!("Failed to prepare table {}", table))?;

        let (tx, rx) = unbounded::<FrameRecord>();
        let stats = Arc::new(WriterStats::default());

        let worker_table = table.clone();
        let worker_stats = stats.clone();
        let worker = thread::Builder::new()
            .name("record-writer".to_string())
            .spawn(move || run_writer(store, worker_table, rx, worker_stats))
            .context("Failed to spawn record writer thread")?;

        info!("Recording channel '{}' into table {}", channel, table);

        Ok(Self {
            channel: channel.to_string(),
            table,
            tx: Some(tx),
            worker: Some(worker),
            totals: SessionTotals::new(),
            stats,
            finalized: false,
        })
    }

    /// Queue a record for writing; never blocks
    pub fn submit(&self, record: FrameRecord) {
        match &self.tx {
            Some(tx) => {
                if tx.send(record).is_err() {
                    warn!("Record writer has stopped, dropping frame");
                }
            }
            None => debug!("Sink already finished, dropping frame"),
        }
    }

    /// Account one more frame of `duration_ms` in the channel totals
    pub fn update_summary(&mut self, duration_ms: f64) {
        self.totals.record(duration_ms);
    }

    /// Current in-memory summary
    pub fn summary(&self) -> ChannelSummary {
        self.totals.snapshot(&self.channel)
    }

    /// Records waiting in the queue
    pub fn pending(&self) -> usize {
        self.tx.as_ref().map_or(0, |tx| tx.len())
    }

    #[cfg(test)]
    pub fn stats(&self) -> &Arc<WriterStats> {
        &self.stats
    }

    /// Drain the queue, stop the writer and upsert the channel summary.
    ///
    /// Runs once; later calls return `Ok(None)`.
    pub fn finish(&mut self) -> Result<Option<ChannelSummary>> {
        if self.finalized {
            return Ok(None);
        }
        self.finalized = true;

        // Closing the sender lets the writer drain what is queued and exit
        drop(self.tx.take());

        let worker = self
            .worker
            .take()
            .ok_or_else(|| anyhow!("record writer already joined"))?;
        let mut store = worker
            .join()
            .map_err(|_| anyhow!("record writer thread panicked"))?;

        let summary = self.summary();
        store
            .upsert_summary(&summary)
            .with_context(|| format!("Failed to write summary for channel '{}'", self.channel))?;

        info!(
            "Summary for '{}': {} packets, {:.3} s on air ({} written to {}, {} failed)",
            summary.channel,
            summary.packet_count,
            summary.total_time_seconds,
            self.stats.written.load(Ordering::Relaxed),
            self.table,
            self.stats.failed.load(Ordering::Relaxed)
        );

        Ok(Some(summary))
    }
}

impl Drop for RecordSink {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            warn!("Failed to finalize record sink: {}", e);
        }
    }
}

/// Writer loop (runs in dedicated thread); returns the store once the queue closes
fn run_writer(
    mut store: Box<dyn FrameStore>,
    table: String,
    rx: Receiver<FrameRecord>,
    stats: Arc<WriterStats>,
) -> Box<dyn FrameStore> {
    for record in rx.iter() {
        match store.insert_frame(&table, &record) {
            Ok(()) => {
                stats.written.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!("Failed to persist frame at {}: {}", record.timestamp, e);
            }
        }
    }

    debug!("Record writer for {} drained", table);
    store
}
