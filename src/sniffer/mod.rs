//! Packet sniffer block: passthrough, frame extraction, decoding and recording
//!
//! `work` is called once per chunk of received bits by whatever drives the
//! stream. It must return promptly: decoded records are only queued here and
//! persisted by the sink's writer thread.

mod passthrough;

pub use passthrough::StreamPassthrough;

use anyhow::Result;
use tracing::info;

use crate::frame::{decode_frame, FrameRecord, TIMESTAMP_FORMAT};
use crate::sink::{ChannelSummary, RecordSink};
use crate::sync::{FrameAssembler, SyncCorrelator, SyncPattern};

/// Live report columns
const REPORT_HEADER: &str = "Timestamp                  | Frame Type   | CRC      | Seq  | Dest Addr         | Src Addr          | PAN ID";

/// Sniffer for one channel
pub struct PacketSniffer {
    tag: String,
    bitrate: u32,
    assembler: FrameAssembler,
    passthrough: StreamPassthrough,
    sink: RecordSink,
    frames_decoded: u64,
    crc_errors: u64,
    stopped: bool,
}

impl PacketSniffer {
    pub fn new(pattern: SyncPattern, tag: &str, bitrate: u32, sink: RecordSink) -> Self {
        info!(
            "Searching for '{}' {} ({} bits, threshold {}) at {} bit/s",
            tag,
            pattern,
            pattern.len(),
            pattern.threshold(),
            bitrate
        );

        Self {
            tag: tag.to_string(),
            bitrate,
            assembler: FrameAssembler::new(SyncCorrelator::new(pattern)),
            passthrough: StreamPassthrough::new(),
            sink,
            frames_decoded: 0,
            crc_errors: 0,
            stopped: false,
        }
    }

    /// Log the column header of the per-frame report
    pub fn log_report_header(&self) {
        info!("{}", REPORT_HEADER);
        info!("{}", "-".repeat(REPORT_HEADER.len()));
    }

    /// Process one chunk of bits. `output` receives the input unchanged;
    /// returns the number of items written to it.
    pub fn work(&mut self, input: &[u8], output: &mut [u8]) -> usize {
        let produced = self.passthrough.forward(input, output);
        if self.stopped {
            return produced;
        }

        for raw in self.assembler.push(input) {
            let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
            let record = decode_frame(&raw, self.bitrate, timestamp);
            self.record(record);
        }

        produced
    }

    fn record(&mut self, record: FrameRecord) {
        self.frames_decoded += 1;
        if !record.crc_valid {
            self.crc_errors += 1;
        }

        let header = &record.header;
        info!(
            "{:26} | {:12} | {:8} | {:4} | {:17} | {:17} | {:6}",
            record.timestamp,
            header.frame_type(),
            if record.crc_valid { "VALID" } else { "INVALID" },
            header.sequence_number,
            header.dest_address,
            header.src_address,
            header.pan_id
        );

        self.sink.update_summary(record.duration_ms);
        self.sink.submit(record);
    }

    /// Stop processing and finalize the channel summary (once)
    pub fn stop(&mut self) -> Result<Option<ChannelSummary>> {
        if !self.stopped {
            let stats = &self.assembler.stats;
            info!(
                "Stopping '{}' sniffer: {} frames ({} CRC errors), {} records queued",
                self.tag,
                self.frames_decoded,
                self.crc_errors,
                self.sink.pending()
            );
            info!(
                "Bits: {} ingested, {} passed through, {} consumed, {} left buffered{} | Syncs: {} | Discarded: {}",
                self.assembler.ingested(),
                self.passthrough.forwarded(),
                self.assembler.consumed(),
                self.assembler.buffered(),
                if self.assembler.has_pending() { " (incomplete frame)" } else { "" },
                stats.syncs_detected,
                stats.bits_discarded
            );
        }
        self.stopped = true;
        self.sink.finish()
    }

    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    pub fn crc_errors(&self) -> u64 {
        self.crc_errors
    }
}
