//! Encoders for the WOFF2 variable-length integers.

/// The shortest `255UInt16` encoding of `value`.
pub fn encode_255_u16(value: u16) -> Vec<u8> {
    const LOWEST_U_CODE: u16 = 253;
    match value {
        0..=252 => vec![value as u8],
        253..=505 => vec![255, (value - LOWEST_U_CODE) as u8],
        506..=761 => vec![254, (value - LOWEST_U_CODE * 2) as u8],
        _ => {
            let [hi, lo] = value.to_be_bytes();
            vec![253, hi, lo]
        }
    }
}

/// The `UIntBase128` encoding of `value`.
pub fn encode_uint_base128(value: u32) -> Vec<u8> {
    let mut groups = vec![(value & 0x7F) as u8];
    let mut rest = value >> 7;
    while rest != 0 {
        groups.push((rest & 0x7F) as u8 | 0x80);
        rest >>= 7;
    }
    groups.reverse();
    groups
}
