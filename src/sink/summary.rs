//! Per-channel session totals

/// Summary row persisted once per channel at shutdown
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSummary {
    pub channel: String,
    pub packet_count: u64,
    pub total_time_seconds: f64,
}

impl ChannelSummary {
    #[cfg(test)]
    pub fn new(channel: &str) -> Self {
        Self {
            channel: channel.to_string(),
            packet_count: 0,
            total_time_seconds: 0.0,
        }
    }
}

/// Running totals, owned by the processing path
#[derive(Debug, Default)]
pub struct SessionTotals {
    packet_count: u64,
    total_time_ms: f64,
}

impl SessionTotals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, duration_ms: f64) {
        self.packet_count += 1;
        self.total_time_ms += duration_ms;
    }

    /// Snapshot of the totals as a summary row
    pub fn snapshot(&self, channel: &str) -> ChannelSummary {
        ChannelSummary {
            channel: channel.to_string(),
            packet_count: self.packet_count,
            total_time_seconds: self.total_time_ms / 1000.0,
        }
    }
}
