//! Append-only bit buffer with head consumption

/// Growable buffer of received symbol bits (one bit per byte, 0 or 1)
///
/// Bits are consumed strictly in arrival order. The buffer itself has no
/// capacity limit; the assembler keeps residency bounded by consuming every
/// offset it has already examined.
#[derive(Debug, Default)]
pub struct BitAccumulator {
    bits: Vec<u8>,
    total_appended: u64,
    total_consumed: u64,
}

impl BitAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append newly arrived bits to the tail (only the low bit of each byte is kept)
    pub fn append(&mut self, bits: &[u8]) {
        if bits.is_empty() {
            return;
        }
        self.bits.extend(bits.iter().map(|b| b & 1));
        self.total_appended += bits.len() as u64;
    }

    /// Discard the first `n` bits, clamped to the buffered length.
    /// Returns the number of bits actually discarded.
    pub fn consume(&mut self, n: usize) -> usize {
        let n = n.min(self.bits.len());
        if n > 0 {
            self.bits.drain(..n);
            self.total_consumed += n as u64;
        }
        n
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bits
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Bits appended over the buffer's lifetime
    pub fn total_appended(&self) -> u64 {
        self.total_appended
    }

    /// Bits consumed over the buffer's lifetime
    pub fn total_consumed(&self) -> u64 {
        self.total_consumed
    }
}
