//! Bit stream capture
//!
//! Reads demodulated bits from a byte source (stdin, a file or a pipe from
//! the demodulator) on a dedicated thread and feeds them to the sniffer in
//! fixed-size chunks. The passthrough output of every chunk can be written
//! to a second stream.

use anyhow::{anyhow, Context, Result};
use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::InputFormat;
use crate::sniffer::PacketSniffer;

/// Capture configuration
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub format: InputFormat,
    pub chunk_size: usize,
    /// Interval between stats log lines
    pub stats_interval: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            format: InputFormat::Unpacked,
            chunk_size: 4096,
            stats_interval: Duration::from_secs(5),
        }
    }
}

/// Statistics for bit capture (atomic for thread-safe access)
#[derive(Debug, Default)]
pub struct CaptureStats {
    pub bytes_read: AtomicU64,
    pub bits_ingested: AtomicU64,
    pub chunks_processed: AtomicU64,
    pub frames_detected: AtomicU64,
    pub crc_errors: AtomicU64,
}

impl CaptureStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

/// Capture controller
pub struct BitCapture {
    config: CaptureConfig,
    running: Arc<AtomicBool>,
    stats: Arc<CaptureStats>,
}

impl BitCapture {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            stats: CaptureStats::new(),
        }
    }

    /// Start reading `source` on a capture thread
    pub fn start(
        &self,
        sniffer: Arc<Mutex<PacketSniffer>>,
        source: Box<dyn Read + Send>,
        passthrough: Option<Box<dyn Write + Send>>,
    ) -> Result<JoinHandle<Result<()>>> {
        info!("Starting bit capture");
        info!("  Input format: {:?}", self.config.format);
        info!("  Chunk size: {} bytes", self.config.chunk_size);
        info!("  Passthrough: {}", if passthrough.is_some() { "enabled" } else { "disabled" });

        let config = self.config.clone();
        let running = self.running.clone();
        let stats = self.stats.clone();

        running.store(true, Ordering::SeqCst);

        let handle = thread::Builder::new()
            .name("bit-capture".to_string())
            .spawn(move || {
                let result = run_capture(config, &running, &stats, sniffer, source, passthrough);
                if let Err(e) = &result {
                    error!("Bit capture error: {:#}", e);
                }
                running.store(false, Ordering::SeqCst);
                result
            })
            .context("Failed to spawn capture thread")?;

        Ok(handle)
    }

    /// Stop capturing after the current chunk
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("Stopping bit capture...");
        }
    }

    /// False once stopped or the input has ended
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> &Arc<CaptureStats> {
        &self.stats
    }
}

impl Drop for BitCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Main capture loop (runs in dedicated thread)
fn run_capture(
    config: CaptureConfig,
    running: &AtomicBool,
    stats: &CaptureStats,
    sniffer: Arc<Mutex<PacketSniffer>>,
    mut source: Box<dyn Read + Send>,
    mut passthrough: Option<Box<dyn Write + Send>>,
) -> Result<()> {
    let mut buffer = vec![0u8; config.chunk_size.max(1)];
    let mut output = vec![0u8; buffer.len()];

    let mut last_stats_time = Instant::now();
    let mut last_bit_count = 0u64;
    let mut first_data = true;

    while running.load(Ordering::SeqCst) {
        let n_read = match source.read(&mut buffer) {
            Ok(0) => {
                info!("Input closed (EOF)");
                break;
            }
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("Failed to read bit stream"),
        };

        if first_data {
            info!("First bits received ({} bytes)", n_read);
            first_data = false;
        }

        let n_bits = config.format.decode(&mut buffer[..n_read]);
        stats.bytes_read.fetch_add(n_read as u64, Ordering::Relaxed);
        stats.bits_ingested.fetch_add(n_bits as u64, Ordering::Relaxed);
        stats.chunks_processed.fetch_add(1, Ordering::Relaxed);

        let produced = {
            let mut sniffer = sniffer
                .lock()
                .map_err(|_| anyhow!("sniffer lock poisoned"))?;
            let produced = sniffer.work(&buffer[..n_bits], &mut output[..n_bits]);
            stats.frames_detected.store(sniffer.frames_decoded(), Ordering::Relaxed);
            stats.crc_errors.store(sniffer.crc_errors(), Ordering::Relaxed);
            produced
        };

        if let Some(writer) = passthrough.as_mut() {
            if let Err(e) = writer.write_all(&output[..produced]) {
                warn!("Passthrough output failed, disabling it: {}", e);
                passthrough = None;
            }
        }

        // Periodic stats logging
        if last_stats_time.elapsed() >= config.stats_interval {
            let current_bits = stats.bits_ingested.load(Ordering::Relaxed);
            let elapsed = last_stats_time.elapsed().as_secs_f64();
            let bit_rate = (current_bits - last_bit_count) as f64 / elapsed;

            info!(
                "[Capture Stats] Rate: {:.1} kbit/s | Chunks: {} | Frames: {} | CRC errors: {}",
                bit_rate / 1000.0,
                stats.chunks_processed.load(Ordering::Relaxed),
                stats.frames_detected.load(Ordering::Relaxed),
                stats.crc_errors.load(Ordering::Relaxed)
            );

            last_stats_time = Instant::now();
            last_bit_count = current_bits;
        }
    }

    if let Some(writer) = passthrough.as_mut() {
        if let Err(e) = writer.flush() {
            debug!("Passthrough flush failed: {}", e);
        }
    }

    info!("Bit capture stopped");
    info!(
        "Final stats: Bits={}, Chunks={}, Frames={}, CRC errors={}",
        stats.bits_ingested.load(Ordering::Relaxed),
        stats.chunks_processed.load(Ordering::Relaxed),
        stats.frames_detected.load(Ordering::Relaxed),
        stats.crc_errors.load(Ordering::Relaxed)
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::frame_crc;
    use crate::sink::testing::MemoryStore;
    use crate::sink::RecordSink;
    use crate::sync::SyncPattern;
    use std::io::Cursor;

    /// Writer that keeps everything in a shared buffer
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// One frame as ASCII bits: access code, PHR, payload, CRC
    fn frame_text(payload: &[u8]) -> String {
        let crc = frame_crc(payload.len() as u8, payload);
        let mut text = String::from("1001000001001110");
        for b in std::iter::once(payload.len() as u8)
            .chain(payload.iter().copied())
            .chain(crc.to_be_bytes())
        {
            text.push_str(&format!("{:08b}", b));
        }
        text
    }

    fn sniffer() -> (Arc<Mutex<PacketSniffer>>, MemoryStore) {
        let store = MemoryStore::default();
        let sink = RecordSink::spawn(Box::new(store.clone()), "capture").unwrap();
        let pattern = SyncPattern::parse("1001000001001110", 0).unwrap();
        let sniffer = PacketSniffer::new(pattern, "Sync Word", 50_000, sink);
        (Arc::new(Mutex::new(sniffer)), store)
    }

    #[test]
    fn test_ascii_input_until_eof() {
        let (sniffer, store) = sniffer();
        let mut text = String::from("0110\n");
        text.push_str(&frame_text(&[0x00, 0x00]));
        text.push('\n');
        text.push_str(&frame_text(&[0x41, 0x88, 0x01, 0xCD, 0xAB, 0xFF, 0xFF, 0x01, 0x00]));

        let capture = BitCapture::new(CaptureConfig {
            format: InputFormat::Ascii,
            chunk_size: 7,
            ..Default::default()
        });
        let handle = capture
            .start(sniffer.clone(), Box::new(Cursor::new(text.into_bytes())), None)
            .unwrap();
        handle.join().unwrap().unwrap();

        assert!(!capture.is_running());
        assert_eq!(capture.stats().frames_detected.load(Ordering::Relaxed), 2);
        assert_eq!(capture.stats().crc_errors.load(Ordering::Relaxed), 0);

        sniffer.lock().unwrap().stop().unwrap();
        let records = store.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].header.frame_type(), "Data");
    }

    #[test]
    fn test_unpacked_passthrough_is_unchanged() {
        let (sniffer, _store) = sniffer();
        let bits: Vec<u8> = frame_text(&[0x12, 0x34])
            .bytes()
            .map(|c| c - b'0')
            .collect();
        let out = SharedBuf::default();

        let capture = BitCapture::new(CaptureConfig {
            chunk_size: 16,
            ..Default::default()
        });
        let handle = capture
            .start(
                sniffer.clone(),
                Box::new(Cursor::new(bits.clone())),
                Some(Box::new(out.clone())),
            )
            .unwrap();
        handle.join().unwrap().unwrap();

        assert_eq!(*out.0.lock().unwrap(), bits);
        assert_eq!(
            capture.stats().bits_ingested.load(Ordering::Relaxed),
            bits.len() as u64
        );
        assert_eq!(sniffer.lock().unwrap().frames_decoded(), 1);
    }

    #[test]
    fn test_stop_before_reading() {
        let (sniffer, _store) = sniffer();
        let capture = BitCapture::new(CaptureConfig::default());
        capture.stop();
        assert!(!capture.is_running());

        // A stopped capture can still be started; an empty source ends it at once
        let handle = capture
            .start(sniffer, Box::new(Cursor::new(Vec::new())), None)
            .unwrap();
        handle.join().unwrap().unwrap();
        assert!(!capture.is_running());
        assert_eq!(capture.stats().chunks_processed.load(Ordering::Relaxed), 0);
    }
}
