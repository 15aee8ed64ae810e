//! Access code correlation under a bit-mismatch tolerance
//!
//! The access code is compared bit-for-bit against every candidate window;
//! a candidate matches when the Hamming distance is at most `threshold`.

use std::fmt;

use thiserror::Error;

/// Number of bits in the length field (PHR) that follows the access code
pub const PHR_BITS: usize = 8;

/// Errors building a sync pattern from configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("sync pattern is empty")]
    Empty,
    #[error("sync pattern contains invalid character {0:?} (expected '0' or '1')")]
    InvalidBit(char),
}

/// Fixed access code plus match tolerance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPattern {
    bits: Vec<u8>,
    threshold: usize,
}

impl SyncPattern {
    /// Parse a pattern such as `"1001000001001110"`; surrounding whitespace is ignored
    pub fn parse(pattern: &str, threshold: usize) -> Result<Self, PatternError> {
        let bits = pattern
            .trim()
            .chars()
            .map(|c| match c {
                '0' => Ok(0),
                '1' => Ok(1),
                other => Err(PatternError::InvalidBit(other)),
            })
            .collect::<Result<Vec<u8>, _>>()?;

        if bits.is_empty() {
            return Err(PatternError::Empty);
        }

        Ok(Self { bits, threshold })
    }

    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }
}

impl fmt::Display for SyncPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in &self.bits {
            write!(f, "{}", bit)?;
        }
        Ok(())
    }
}

/// Outcome of a correlation scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncScan {
    /// Access code found at this offset
    Found(usize),
    /// No candidate matched; offsets before `resume_at` have all been examined
    NotFound { resume_at: usize },
}

/// Linear, tolerant access code search
#[derive(Debug, Clone)]
pub struct SyncCorrelator {
    pattern: SyncPattern,
}

impl SyncCorrelator {
    pub fn new(pattern: SyncPattern) -> Self {
        Self { pattern }
    }

    pub fn pattern(&self) -> &SyncPattern {
        &self.pattern
    }

    /// Count mismatched bits between the pattern and `window`, stopping
    /// early once `limit` is exceeded.
    pub fn mismatches(&self, window: &[u8], limit: usize) -> usize {
        let mut count = 0;
        for (a, b) in window.iter().zip(self.pattern.bits()) {
            count += ((a ^ b) & 1) as usize;
            if count > limit {
                break;
            }
        }
        count
    }

    /// True if the window at `offset` is within threshold of the pattern
    pub fn matches_at(&self, bits: &[u8], offset: usize) -> bool {
        let len = self.pattern.len();
        match bits.get(offset..offset + len) {
            Some(window) => self.mismatches(window, self.pattern.threshold()) <= self.pattern.threshold(),
            None => false,
        }
    }

    /// Scan `bits` from `start`, leftmost match wins.
    ///
    /// A candidate offset is examined only when the pattern and the length
    /// field after it are both buffered.
    pub fn scan(&self, bits: &[u8], start: usize) -> SyncScan {
        let needed = self.pattern.len() + PHR_BITS;
        let mut offset = start;

        while bits.len().saturating_sub(offset) >= needed {
            if self.matches_at(bits, offset) {
                return SyncScan::Found(offset);
            }
            offset += 1;
        }

        SyncScan::NotFound { resume_at: offset }
    }
}
