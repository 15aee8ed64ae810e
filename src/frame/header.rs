//! MAC header decoder
//!
//! Header layout after the PHR (bit offsets into the payload):
//! - 0..16   frame control field, least significant byte first
//! - 16..24  sequence number
//! - 24..40  PAN ID
//! - 40..    destination address, then source address (0, 16 or 64 bits each)
//!
//! Short payloads are never an error: fields past the end come out empty.

use super::bits::{bits_to_hex, bits_to_u64, field, reverse_bytes_hex};
use super::types::{AddrMode, DecodedHeader, FrameControl, FrameType};

const FCF_BITS: usize = 16;
const SEQ_BITS: usize = 8;
const PAN_ID_BITS: usize = 16;

/// Decode the frame control field from its 16 on-air bits
pub fn decode_frame_control(fcf_bits: &[u8]) -> FrameControl {
    // Reassembled big-endian, then byte-swapped: the LSB is sent first
    let fcf = (bits_to_u64(fcf_bits) as u16).swap_bytes();

    FrameControl {
        frame_type: FrameType::from(fcf),
        ack_requested: (fcf >> 5) & 1 == 1,
        dest_addr_mode: AddrMode::from(fcf >> 10),
        src_addr_mode: AddrMode::from(fcf >> 14),
    }
}

/// Decode the MAC header from the payload bits (PSDU without CRC)
pub fn decode_header(payload: &[u8]) -> DecodedHeader {
    if payload.len() < FCF_BITS {
        return DecodedHeader::default();
    }

    let control = decode_frame_control(&payload[..FCF_BITS]);

    let mut idx = FCF_BITS;
    let sequence_number = bits_to_hex(field(payload, idx, SEQ_BITS));
    idx += SEQ_BITS;

    let pan_id = reverse_bytes_hex(&bits_to_hex(field(payload, idx, PAN_ID_BITS)));
    idx += PAN_ID_BITS;

    let dest_bits = control.dest_addr_mode.address_bits();
    let dest_address = address(payload, idx, dest_bits);
    idx += dest_bits;

    let src_address = address(payload, idx, control.src_addr_mode.address_bits());

    DecodedHeader {
        control: Some(control),
        sequence_number,
        pan_id,
        dest_address,
        src_address,
    }
}

fn address(payload: &[u8], start: usize, len: usize) -> String {
    if len == 0 {
        return String::new();
    }
    reverse_bytes_hex(&bits_to_hex(field(payload, start, len)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
        bytes
            .iter()
            .flat_map(|b| (0..8).rev().map(move |i| (b >> i) & 1))
            .collect()
    }

    #[test]
    fn test_decode_data_frame_short_addresses() {
        // FCF 0x8861, sent as 61 88: data, ack request, PAN ID compression,
        // short destination and source
        let payload = bytes_to_bits(&hex::decode("61882AFECA3412CDAB").unwrap());
        let header = decode_header(&payload);

        let control = header.control.unwrap();
        assert_eq!(control.frame_type, FrameType::Data);
        assert!(control.ack_requested);
        assert_eq!(control.dest_addr_mode, AddrMode::Short);
        assert_eq!(control.src_addr_mode, AddrMode::Short);
        assert_eq!(header.sequence_number, "2A");
        assert_eq!(header.pan_id, "CAFE");
        assert_eq!(header.dest_address, "1234");
        assert_eq!(header.src_address, "ABCD");
    }

    #[test]
    fn test_decode_long_source_address() {
        // FCF 0xC841: data, short destination, long source
        let payload = bytes_to_bits(&hex::decode("41C807332211110807060504030201").unwrap());
        let header = decode_header(&payload);

        assert_eq!(header.frame_type(), "Data");
        assert_eq!(header.ack_requested(), Some(false));
        assert_eq!(header.dest_addr_mode(), "Short (16-bit)");
        assert_eq!(header.src_addr_mode(), "Long (64-bit)");
        assert_eq!(header.sequence_number, "07");
        assert_eq!(header.pan_id, "2233");
        assert_eq!(header.dest_address, "1111");
        assert_eq!(header.src_address, "0102030405060708");
    }

    #[test]
    fn test_decode_beacon_without_addresses() {
        let payload = bytes_to_bits(&hex::decode("000001").unwrap());
        let header = decode_header(&payload);

        assert_eq!(header.frame_type(), "Beacon");
        assert_eq!(header.dest_addr_mode(), "None");
        assert_eq!(header.sequence_number, "01");
        assert_eq!(header.pan_id, "");
        assert_eq!(header.dest_address, "");
        assert_eq!(header.src_address, "");
    }

    #[test]
    fn test_reserved_values_are_unknown() {
        // Frame type 5, destination mode 1
        let control = decode_frame_control(&bytes_to_bits(&[0x05, 0x04]));
        assert_eq!(control.frame_type, FrameType::Unknown);
        assert_eq!(control.dest_addr_mode, AddrMode::Unknown);
        assert_eq!(control.frame_type.to_string(), "Unknown");
    }

    #[test]
    fn test_too_short_for_header() {
        let header = decode_header(&bytes_to_bits(&[0x41]));
        assert_eq!(header, DecodedHeader::default());
        assert_eq!(header.frame_type(), "");
        assert_eq!(header.ack_requested(), None);
        assert!(decode_header(&[]).control.is_none());
    }

    #[test]
    fn test_truncated_address_degrades() {
        // Long destination announced but only one address byte present
        let payload = bytes_to_bits(&hex::decode("010C01CDAB77").unwrap());
        let header = decode_header(&payload);

        assert_eq!(header.dest_addr_mode(), "Long (64-bit)");
        assert_eq!(header.dest_address, "77");
        assert_eq!(header.src_address, "");
    }

    #[test]
    fn test_decode_is_idempotent() {
        let payload = bytes_to_bits(&hex::decode("61882AFECA3412CDAB").unwrap());
        assert_eq!(decode_header(&payload), decode_header(&payload));
    }
}
