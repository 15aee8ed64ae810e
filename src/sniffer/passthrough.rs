//! Unmodified bit passthrough for downstream consumers

/// Re-emits every ingested chunk unchanged, independent of frame state
#[derive(Debug, Default)]
pub struct StreamPassthrough {
    forwarded: u64,
}

impl StreamPassthrough {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `input` into `output`, returning the number of items produced
    pub fn forward(&mut self, input: &[u8], output: &mut [u8]) -> usize {
        let n = input.len().min(output.len());
        output[..n].copy_from_slice(&input[..n]);
        self.forwarded += n as u64;
        n
    }

    /// Items produced since creation
    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }
}
