//! Bit slice conversions used when rendering frame fields

/// Render a bit slice as its unsigned value in uppercase hex, zero-padded to
/// two digits per started byte. An empty slice renders as an empty string.
pub fn bits_to_hex(bits: &[u8]) -> String {
    if bits.is_empty() {
        return String::new();
    }

    // Left-pad to a whole number of bytes so the value stays right-aligned
    let pad = (8 - bits.len() % 8) % 8;
    let mut padded = vec![0u8; pad];
    padded.extend_from_slice(bits);

    hex::encode_upper(bits_to_bytes_msb(&padded))
}

/// Pack bits into bytes, most significant bit first. Trailing bits that do
/// not fill a byte are dropped.
pub fn bits_to_bytes_msb(bits: &[u8]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, b| (acc << 1) | (b & 1)))
        .collect()
}

/// Interpret up to 64 bits as an unsigned big-endian value
pub fn bits_to_u64(bits: &[u8]) -> u64 {
    bits.iter().take(64).fold(0u64, |acc, b| (acc << 1) | (b & 1) as u64)
}

/// Reverse the byte order of a hex string (`"3412"` becomes `"1234"`).
/// Odd-length input is left-padded with a zero first.
pub fn reverse_bytes_hex(hex_str: &str) -> String {
    let mut s = hex_str.to_uppercase();
    if s.len() % 2 != 0 {
        s.insert(0, '0');
    }

    let bytes = s.as_bytes();
    bytes
        .chunks(2)
        .rev()
        .map(|pair| String::from_utf8_lossy(pair).into_owned())
        .collect()
}

/// Bits of `bits[start..start + len]`, truncated at the end of the slice
pub fn field(bits: &[u8], start: usize, len: usize) -> &[u8] {
    let start = start.min(bits.len());
    let end = (start + len).min(bits.len());
    &bits[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(s: &str) -> Vec<u8> {
        s.bytes().map(|c| c - b'0').collect()
    }

    #[test]
    fn test_bits_to_hex() {
        assert_eq!(bits_to_hex(&bits("1001000001001110")), "904E");
        assert_eq!(bits_to_hex(&bits("00000010")), "02");
        assert_eq!(bits_to_hex(&bits("1010")), "0A");
        assert_eq!(bits_to_hex(&bits("000000001")), "0001");
        assert_eq!(bits_to_hex(&[]), "");
    }

    #[test]
    fn test_bits_to_bytes_msb() {
        assert_eq!(bits_to_bytes_msb(&bits("1000000011111111")), vec![0x80, 0xFF]);
        assert_eq!(bits_to_bytes_msb(&bits("101")), Vec::<u8>::new());
    }

    #[test]
    fn test_bits_to_u64() {
        assert_eq!(bits_to_u64(&bits("00000010")), 2);
        assert_eq!(bits_to_u64(&bits("1000000000000001")), 0x8001);
        assert_eq!(bits_to_u64(&[]), 0);
    }

    #[test]
    fn test_reverse_bytes_hex() {
        assert_eq!(reverse_bytes_hex("3412"), "1234");
        assert_eq!(reverse_bytes_hex("abc"), "BC0A");
        assert_eq!(reverse_bytes_hex("0123456789ABCDEF"), "EFCDAB8967452301");
        assert_eq!(reverse_bytes_hex(""), "");
    }

    #[test]
    fn test_field_truncates() {
        let b = bits("1100");
        assert_eq!(field(&b, 2, 8), &[0, 0]);
        assert!(field(&b, 10, 8).is_empty());
    }
}
