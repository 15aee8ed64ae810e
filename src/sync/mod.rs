//! Bit-level synchronization and frame extraction
//!
//! This module turns a raw stream of sliced bits into frames:
//! 1. Buffer incoming bits
//! 2. Correlate against the access code (with a mismatch tolerance)
//! 3. Read the PHR length field
//! 4. Slice the frame once enough bits have arrived

mod assembler;
mod buffer;
mod correlator;

pub use assembler::{FrameAssembler, RawFrame};
pub use correlator::{PatternError, SyncCorrelator, SyncPattern};
#[cfg(test)]
pub use correlator::SyncScan;
