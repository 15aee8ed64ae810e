//! 802.15.4-style MAC frame decoding

mod bits;
mod crc;
mod header;
mod types;

pub use crc::frame_crc;
pub use types::FrameRecord;
#[cfg(test)]
pub use types::DecodedHeader;

use bits::{bits_to_bytes_msb, bits_to_hex};
use crc::check_crc;
use header::decode_header;

use crate::sync::RawFrame;

/// Timestamp format used for persisted records
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// On-air duration in milliseconds of `bits` at `bitrate` bits per second
pub fn frame_duration_ms(bits: usize, bitrate: u32) -> f64 {
    bits as f64 / bitrate as f64 * 1000.0
}

/// Decode a raw frame into a record stamped with `timestamp`
///
/// The CRC result is informational only: a mismatching frame is still
/// returned, with `crc_valid` cleared.
pub fn decode_frame(raw: &RawFrame, bitrate: u32, timestamp: String) -> FrameRecord {
    let payload_bits = raw.payload();
    let payload = bits_to_bytes_msb(payload_bits);
    let crc = bits_to_hex(raw.crc_bits());

    // The PHR byte covered by the CRC is the payload byte count
    let computed = frame_crc(payload.len() as u8, &payload);

    FrameRecord {
        timestamp,
        sfd: bits_to_hex(&raw.sync_bits),
        phr: bits_to_hex(&raw.length_field),
        header: decode_header(payload_bits),
        psdu: hex::encode_upper(&payload),
        crc_valid: check_crc(computed, &crc),
        crc,
        duration_ms: frame_duration_ms(raw.total_bits(), bitrate),
    }
}
