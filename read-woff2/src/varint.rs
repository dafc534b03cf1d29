//! The variable-length integer encodings used by WOFF2.
//!
//! See the [WOFF2 data types](https://www.w3.org/TR/WOFF2/#DataTypes).

use crate::{Cursor, ReadError};

const ONE_MORE_BYTE_CODE1: u8 = 255;
const ONE_MORE_BYTE_CODE2: u8 = 254;
const WORD_CODE: u8 = 253;
const LOWEST_U_CODE: u16 = 253;

/// Read a `UIntBase128` value, a variable-length encoding of a `u32`.
///
/// Each byte contributes its low seven bits, most significant group first;
/// the high bit is set on every byte but the last. Leading zero groups,
/// values that overflow 32 bits and sequences longer than five bytes are
/// rejected.
pub fn read_uint_base128(cursor: &mut Cursor) -> Result<u32, ReadError> {
    let mut accum = 0u32;
    for i in 0..5 {
        let byte = cursor.read_u8()?;
        if i == 0 && byte == 0x80 {
            return Err(ReadError::MalformedVarInt("UIntBase128 has leading zeros"));
        }
        // if any of the top seven bits are set, the shift would overflow
        if accum & 0xFE00_0000 != 0 {
            return Err(ReadError::MalformedVarInt("UIntBase128 overflows u32"));
        }
        accum = (accum << 7) | u32::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            return Ok(accum);
        }
    }
    Err(ReadError::MalformedVarInt("UIntBase128 exceeds five bytes"))
}

/// Read a `255UInt16` value, a variable-length encoding of a `u16`.
///
/// The encoding is not unique: 506 may be written as `[255, 253]`,
/// `[254, 0]` or `[253, 1, 250]`, and all of them are accepted.
pub fn read_255_u16(cursor: &mut Cursor) -> Result<u16, ReadError> {
    match cursor.read_u8()? {
        WORD_CODE => cursor.read::<u16>(),
        ONE_MORE_BYTE_CODE1 => Ok(u16::from(cursor.read_u8()?) + LOWEST_U_CODE),
        ONE_MORE_BYTE_CODE2 => Ok(u16::from(cursor.read_u8()?) + LOWEST_U_CODE * 2),
        code => Ok(u16::from(code)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FontData;
    use woff2_test_data::varint::{encode_255_u16, encode_uint_base128};

    fn decode_255(bytes: &[u8]) -> u16 {
        let data = FontData::new(bytes);
        let mut cursor = data.cursor();
        let value = read_255_u16(&mut cursor).unwrap();
        assert!(cursor.is_finished(), "trailing bytes in {bytes:?}");
        value
    }

    fn decode_base128(bytes: &[u8]) -> Result<u32, ReadError> {
        read_uint_base128(&mut FontData::new(bytes).cursor())
    }

    #[test]
    fn all_encodings_of_506() {
        assert_eq!(decode_255(&[255, 253]), 506);
        assert_eq!(decode_255(&[254, 0]), 506);
        assert_eq!(decode_255(&[253, 1, 250]), 506);
    }

    #[test]
    fn code_boundaries() {
        assert_eq!(decode_255(&[0]), 0);
        assert_eq!(decode_255(&[252]), 252);
        assert_eq!(decode_255(&[255, 0]), 253);
        assert_eq!(decode_255(&[255, 252]), 505);
        assert_eq!(decode_255(&[254, 255]), 761);
        assert_eq!(decode_255(&[253, 0xff, 0xff]), u16::MAX);
    }

    #[test]
    fn every_u16_is_representable() {
        for value in 0..=u16::MAX {
            assert_eq!(decode_255(&encode_255_u16(value)), value);
        }
    }

    #[test]
    fn truncated_255_u16() {
        let data = FontData::new(&[253, 1]);
        assert!(matches!(
            read_255_u16(&mut data.cursor()),
            Err(ReadError::OutOfBounds)
        ));
    }

    #[test]
    fn base128_values() {
        assert_eq!(decode_base128(&[0x00]).unwrap(), 0);
        assert_eq!(decode_base128(&[0x3f]).unwrap(), 63);
        assert_eq!(decode_base128(&[0x81, 0x00]).unwrap(), 128);
        assert_eq!(decode_base128(&[0x8f, 0xff, 0xff, 0xff, 0x7f]).unwrap(), u32::MAX);
        for value in [1, 127, 300, 16_384, 0x0fff_ffff, u32::MAX] {
            assert_eq!(decode_base128(&encode_uint_base128(value)).unwrap(), value);
        }
    }

    #[test]
    fn base128_rejects_leading_zero() {
        assert!(matches!(
            decode_base128(&[0x80, 0x01]),
            Err(ReadError::MalformedVarInt(_))
        ));
    }

    #[test]
    fn base128_rejects_long_sequences() {
        assert!(matches!(
            decode_base128(&[0x81, 0x80, 0x80, 0x80, 0x80, 0x00]),
            Err(ReadError::MalformedVarInt(_))
        ));
    }

    #[test]
    fn base128_rejects_overflow() {
        // the fifth byte would shift bits out of the accumulator
        assert!(matches!(
            decode_base128(&[0x90, 0x80, 0x80, 0x80, 0x00]),
            Err(ReadError::MalformedVarInt(_))
        ));
    }

    #[test]
    fn base128_unterminated() {
        assert!(matches!(
            decode_base128(&[0x81, 0x81]),
            Err(ReadError::OutOfBounds)
        ));
    }
}
