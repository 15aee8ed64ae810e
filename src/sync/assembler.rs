//! Frame assembly from a synchronized bit stream
//!
//! Frame structure on the wire:
//! - Access code (SFD): pattern length bits
//! - PHR: 8 bits, unsigned, MSB first, payload length L in bytes
//! - PSDU: (L + 2) * 8 bits, the last 16 being the CRC-16

use tracing::{debug, trace};

use super::buffer::BitAccumulator;
use super::correlator::{SyncCorrelator, SyncScan, PHR_BITS};

/// Number of bits in the trailing CRC field
pub const CRC_BITS: usize = 16;

/// One complete frame sliced out of the bit stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub sync_bits: Vec<u8>,
    pub length_field: Vec<u8>,
    pub psdu: Vec<u8>,
}

impl RawFrame {
    /// Declared payload length (PHR value)
    #[cfg(test)]
    pub fn declared_len(&self) -> u8 {
        self.length_field.iter().fold(0u8, |acc, b| (acc << 1) | (b & 1))
    }

    /// Payload bits without the trailing CRC (header + body)
    pub fn payload(&self) -> &[u8] {
        let end = self.psdu.len().saturating_sub(CRC_BITS);
        &self.psdu[..end]
    }

    /// Received CRC bits
    pub fn crc_bits(&self) -> &[u8] {
        let start = self.psdu.len().saturating_sub(CRC_BITS);
        &self.psdu[start..]
    }

    /// Total frame length in bits
    pub fn total_bits(&self) -> usize {
        self.sync_bits.len() + self.length_field.len() + self.psdu.len()
    }
}

/// Total frame length in bits for an access code of `pattern_len` bits and PHR value `len`
pub fn frame_bits(pattern_len: usize, len: u8) -> usize {
    pattern_len + PHR_BITS + (len as usize + 2) * 8
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AssemblerStats {
    pub syncs_detected: u64,
    pub frames_extracted: u64,
    pub bits_discarded: u64,
}

/// Sync search plus length-driven frame slicing over a `BitAccumulator`
///
/// When a frame is synchronized but not yet fully buffered, its length is
/// kept as pending with the access code at the head of the buffer; later
/// calls only re-check completeness instead of correlating again.
pub struct FrameAssembler {
    buffer: BitAccumulator,
    correlator: SyncCorrelator,
    pending: Option<usize>,
    pub stats: AssemblerStats,
}

impl FrameAssembler {
    pub fn new(correlator: SyncCorrelator) -> Self {
        Self {
            buffer: BitAccumulator::new(),
            correlator,
            pending: None,
            stats: AssemblerStats::default(),
        }
    }

    /// Append received bits and return every frame completed by them
    pub fn push(&mut self, bits: &[u8]) -> Vec<RawFrame> {
        self.buffer.append(bits);

        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame() {
            frames.push(frame);
        }
        frames
    }

    /// Try to extract the next frame from the buffered bits
    pub fn next_frame(&mut self) -> Option<RawFrame> {
        let total_bits = match self.pending {
            Some(total_bits) => total_bits,
            None => self.synchronize()?,
        };

        if self.buffer.len() < total_bits {
            trace!(
                "Frame incomplete: {} of {} bits buffered",
                self.buffer.len(),
                total_bits
            );
            self.pending = Some(total_bits);
            return None;
        }

        self.pending = None;
        let frame = self.slice(total_bits);
        self.buffer.consume(total_bits);
        self.stats.frames_extracted += 1;
        Some(frame)
    }

    /// Search for the access code, discarding everything before it.
    /// Returns the total frame length announced by the PHR that follows.
    fn synchronize(&mut self) -> Option<usize> {
        if self.buffer.is_empty() {
            return None;
        }
        match self.correlator.scan(self.buffer.as_slice(), 0) {
            SyncScan::Found(offset) => {
                self.discard(offset);
                self.stats.syncs_detected += 1;

                let pattern_len = self.correlator.pattern().len();
                let phr = &self.buffer.as_slice()[pattern_len..pattern_len + PHR_BITS];
                let len = phr.iter().fold(0u8, |acc, b| (acc << 1) | b);
                let total_bits = frame_bits(pattern_len, len);

                debug!(
                    "Sync at bit {} (PHR={}, frame={} bits)",
                    self.buffer.total_consumed(),
                    len,
                    total_bits
                );
                Some(total_bits)
            }
            SyncScan::NotFound { resume_at } => {
                self.discard(resume_at);
                None
            }
        }
    }

    fn discard(&mut self, n: usize) {
        let dropped = self.buffer.consume(n);
        self.stats.bits_discarded += dropped as u64;
    }

    fn slice(&self, total_bits: usize) -> RawFrame {
        let bits = &self.buffer.as_slice()[..total_bits];
        let pattern_len = self.correlator.pattern().len();
        RawFrame {
            sync_bits: bits[..pattern_len].to_vec(),
            length_field: bits[pattern_len..pattern_len + PHR_BITS].to_vec(),
            psdu: bits[pattern_len + PHR_BITS..].to_vec(),
        }
    }

    /// Bits currently buffered and not yet consumed
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Bits pushed since creation
    pub fn ingested(&self) -> u64 {
        self.buffer.total_appended()
    }

    /// Bits consumed since creation (frames plus discarded noise)
    pub fn consumed(&self) -> u64 {
        self.buffer.total_consumed()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}
