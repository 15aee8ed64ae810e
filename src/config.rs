//! Configuration loaded from environment variables

use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;
use tracing::warn;

use crate::sync::{PatternError, SyncPattern};

/// Default access code (SFD) searched for at the start of each frame
pub const DEFAULT_SYNC_PATTERN: &str = "1001000001001110";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid SYNC_PATTERN '{value}': {source}")]
    Pattern {
        value: String,
        #[source]
        source: PatternError,
    },

    #[error("invalid SYNC_THRESHOLD '{0}' (expected a non-negative integer)")]
    Threshold(String),

    #[error("unknown INPUT_FORMAT '{0}' (expected 'unpacked' or 'ascii')")]
    InputFormat(String),
}

/// How bits are encoded on the input stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputFormat {
    /// One byte per bit, only the least-significant bit is used
    #[default]
    Unpacked,
    /// ASCII `0`/`1` characters; anything else is skipped
    Ascii,
}

impl FromStr for InputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unpacked" | "bits" => Ok(Self::Unpacked),
            "ascii" | "text" => Ok(Self::Ascii),
            other => Err(ConfigError::InputFormat(other.to_string())),
        }
    }
}

impl InputFormat {
    /// Convert raw input bytes to bit values in place; returns how many bits remain
    pub fn decode(&self, buf: &mut [u8]) -> usize {
        match self {
            Self::Unpacked => {
                for b in buf.iter_mut() {
                    *b &= 1;
                }
                buf.len()
            }
            Self::Ascii => {
                let mut n = 0;
                for i in 0..buf.len() {
                    match buf[i] {
                        b'0' | b'1' => {
                            buf[n] = buf[i] - b'0';
                            n += 1;
                        }
                        _ => {}
                    }
                }
                n
            }
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Access code as a string of '0'/'1'
    pub sync_pattern: String,

    /// Tag used to label the access code in logs
    pub sync_tag: String,

    /// Maximum mismatched bits for a sync match
    pub sync_threshold: usize,

    /// Channel id (frame table suffix and summary key)
    pub channel: String,

    /// SQLite database file
    pub db_path: PathBuf,

    /// Nominal bitrate in bit/s, used for on-air duration
    pub bitrate: u32,

    /// Bit source; "-" reads stdin
    pub input_path: String,

    pub input_format: InputFormat,

    /// Optional file receiving the passthrough bits
    pub passthrough_path: Option<PathBuf>,

    /// Bytes read per ingest call
    pub chunk_size: usize,

    /// Runtime limit in minutes (0 runs until Ctrl+C or end of input)
    pub run_minutes: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let input_format = match var("INPUT_FORMAT") {
            Some(s) => s.parse()?,
            None => InputFormat::default(),
        };

        let sync_threshold = match var("SYNC_THRESHOLD") {
            Some(s) => s
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::Threshold(s.clone()))?,
            None => 0,
        };

        Ok(Self {
            sync_pattern: var("SYNC_PATTERN").unwrap_or_else(|| DEFAULT_SYNC_PATTERN.to_string()),

            sync_tag: var("SYNC_TAG").unwrap_or_else(|| "Sync Word".to_string()),

            sync_threshold,

            channel: var("CHANNEL").unwrap_or_else(|| "default".to_string()),

            db_path: var("DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data").join("Database.db")),

            bitrate: var("BITRATE")
                .and_then(|s| s.parse().ok())
                .filter(|&b| b > 0)
                .unwrap_or(50_000),

            input_path: var("INPUT_PATH").unwrap_or_else(|| "-".to_string()),

            input_format,

            passthrough_path: var("PASSTHROUGH_PATH")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),

            chunk_size: var("CHUNK_SIZE")
                .and_then(|s| s.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(4096),

            run_minutes: var("RUN_MINUTES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
        })
    }

    /// Validate and build the sync pattern.
    ///
    /// A threshold at or above the pattern length is accepted; every window
    /// then matches.
    pub fn sync_pattern(&self) -> Result<SyncPattern, ConfigError> {
        let pattern = SyncPattern::parse(&self.sync_pattern, self.sync_threshold).map_err(|source| {
            ConfigError::Pattern {
                value: self.sync_pattern.clone(),
                source,
            }
        })?;

        if self.sync_threshold >= pattern.len() {
            warn!(
                "SYNC_THRESHOLD {} covers the whole {}-bit sync pattern, every position will match",
                self.sync_threshold,
                pattern.len()
            );
        }
        Ok(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{SyncCorrelator, SyncScan};
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.sync_pattern, DEFAULT_SYNC_PATTERN);
        assert_eq!(config.sync_tag, "Sync Word");
        assert_eq!(config.sync_threshold, 0);
        assert_eq!(config.channel, "default");
        assert_eq!(config.db_path, PathBuf::from("data/Database.db"));
        assert_eq!(config.bitrate, 50_000);
        assert_eq!(config.input_path, "-");
        assert_eq!(config.input_format, InputFormat::Unpacked);
        assert!(config.passthrough_path.is_none());
        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.run_minutes, 0);

        let pattern = config.sync_pattern().unwrap();
        assert_eq!(pattern.len(), 16);
        assert_eq!(pattern.threshold(), 0);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("SYNC_PATTERN", "10101"),
            ("SYNC_THRESHOLD", "1"),
            ("CHANNEL", "ch26"),
            ("BITRATE", "250000"),
            ("INPUT_FORMAT", "ASCII"),
            ("PASSTHROUGH_PATH", "/tmp/out.bin"),
            ("CHUNK_SIZE", "not-a-number"),
        ])
        .unwrap();

        assert_eq!(config.channel, "ch26");
        assert_eq!(config.bitrate, 250_000);
        assert_eq!(config.input_format, InputFormat::Ascii);
        assert_eq!(config.passthrough_path, Some(PathBuf::from("/tmp/out.bin")));
        assert_eq!(config.chunk_size, 4096);

        let pattern = config.sync_pattern().unwrap();
        assert_eq!(pattern.bits(), &[1, 0, 1, 0, 1]);
        assert_eq!(pattern.threshold(), 1);
    }

    #[test]
    fn test_invalid_pattern() {
        let config = load(&[("SYNC_PATTERN", "10x1")]).unwrap();
        assert!(matches!(
            config.sync_pattern(),
            Err(ConfigError::Pattern { source: PatternError::InvalidBit('x'), .. })
        ));

        let config = load(&[("SYNC_PATTERN", "")]).unwrap();
        assert!(matches!(
            config.sync_pattern(),
            Err(ConfigError::Pattern { source: PatternError::Empty, .. })
        ));
    }

    #[test]
    fn test_threshold_covering_pattern_is_accepted() {
        for threshold in ["4", "9"] {
            let config = load(&[("SYNC_PATTERN", "1011"), ("SYNC_THRESHOLD", threshold)]).unwrap();
            let pattern = config.sync_pattern().unwrap();
            assert_eq!(pattern.len(), 4);
            assert_eq!(pattern.threshold(), threshold.parse::<usize>().unwrap());

            // Any window matches, so the first examinable offset wins
            let correlator = SyncCorrelator::new(pattern);
            assert_eq!(correlator.scan(&[0u8; 12], 0), SyncScan::Found(0));
        }
    }

    #[test]
    fn test_invalid_threshold() {
        for value in ["abc", "-1", "1.5"] {
            assert!(matches!(
                load(&[("SYNC_THRESHOLD", value)]),
                Err(ConfigError::Threshold(v)) if v == value
            ));
        }
        assert_eq!(load(&[("SYNC_THRESHOLD", " 3 ")]).unwrap().sync_threshold, 3);
    }

    #[test]
    fn test_unknown_input_format() {
        assert!(matches!(
            load(&[("INPUT_FORMAT", "iq")]),
            Err(ConfigError::InputFormat(f)) if f == "iq"
        ));
    }

    #[test]
    fn test_decode_input() {
        let mut raw = vec![0u8, 1, 2, 3, 0xFF];
        assert_eq!(InputFormat::Unpacked.decode(&mut raw), 5);
        assert_eq!(raw, vec![0, 1, 0, 1, 1]);

        let mut text = b"10 01\n1x0".to_vec();
        let n = InputFormat::Ascii.decode(&mut text);
        assert_eq!(&text[..n], &[1, 0, 0, 1, 1, 0]);
    }
}
