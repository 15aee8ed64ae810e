//! CRC-16 checksum validation for 802.15.4-style frames

/// CRC-16 generator polynomial (x^16 + x^12 + x^5 + 1)
const CRC16_POLY: u16 = 0x1021;

/// Initial register value
const CRC16_INIT: u16 = 0x1D0F;

/// Final XOR applied to the register
const CRC16_XOR_OUT: u16 = 0xFFFF;

/// Compute CRC-16 over message bytes, most significant bit first
pub fn compute_crc16(data: &[u8]) -> u16 {
    let mut crc = CRC16_INIT;

    for &byte in data {
        crc ^= (byte as u16) << 8;

        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ CRC16_POLY;
            } else {
                crc <<= 1;
            }
        }
    }

    crc ^ CRC16_XOR_OUT
}

/// CRC over the payload byte count followed by the payload bytes
pub fn frame_crc(len: u8, payload: &[u8]) -> u16 {
    let mut data = Vec::with_capacity(payload.len() + 1);
    data.push(len);
    data.extend_from_slice(payload);
    compute_crc16(&data)
}

/// Compare a computed CRC against the received field rendered as hex
pub fn check_crc(computed: u16, received_hex: &str) -> bool {
    format!("{:04X}", computed) == received_hex
}
