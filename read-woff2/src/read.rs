//! Traits and errors for interpreting font data

use types::{F2Dot14, Fixed, Tag};

use crate::tables::glyf::DecodeError;

/// A scalar that can be read from big-endian bytes.
///
/// This is implemented for the integer and fixed-point types that appear in
/// WOFF2 and TrueType data. It is used as a bound on [`FontData::read_at`]
/// and [`Cursor::read`].
///
/// [`FontData::read_at`]: crate::FontData::read_at
/// [`Cursor::read`]: crate::Cursor::read
pub trait ReadScalar: Sized {
    /// The size of the raw representation, in bytes.
    const RAW_BYTE_LEN: usize;

    /// Decode a value from exactly `RAW_BYTE_LEN` big-endian bytes.
    ///
    /// Returns `None` if the slice has the wrong length.
    fn read(bytes: &[u8]) -> Option<Self>;
}

macro_rules! int_scalar {
    ($ty:ty, $len:literal) => {
        impl ReadScalar for $ty {
            const RAW_BYTE_LEN: usize = $len;

            #[inline]
            fn read(bytes: &[u8]) -> Option<Self> {
                let raw: [u8; $len] = bytes.try_into().ok()?;
                Some(<$ty>::from_be_bytes(raw))
            }
        }
    };
}

int_scalar!(u8, 1);
int_scalar!(i8, 1);
int_scalar!(u16, 2);
int_scalar!(i16, 2);
int_scalar!(u32, 4);
int_scalar!(i32, 4);

impl ReadScalar for F2Dot14 {
    const RAW_BYTE_LEN: usize = 2;

    fn read(bytes: &[u8]) -> Option<Self> {
        i16::read(bytes).map(F2Dot14::from_bits)
    }
}

impl ReadScalar for Fixed {
    const RAW_BYTE_LEN: usize = 4;

    fn read(bytes: &[u8]) -> Option<Self> {
        i32::read(bytes).map(Fixed::from_bits)
    }
}

impl ReadScalar for Tag {
    const RAW_BYTE_LEN: usize = 4;

    fn read(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; 4] = bytes.try_into().ok()?;
        Some(Tag::from_be_bytes(raw))
    }
}

/// An error that occurs when reading font data
#[derive(Debug, Clone)]
pub enum ReadError {
    OutOfBounds,
    // i64 is flexible enough to store any value we might encounter
    InvalidFormat(i64),
    InvalidSignature(u32),
    /// The font is a WOFF2 collection, which is not supported.
    UnsupportedCollection,
    /// A `UIntBase128` sequence was padded, overflowed or unterminated.
    MalformedVarInt(&'static str),
    TableIsMissing(Tag),
    /// The Brotli compressed table data could not be decompressed.
    Decompression(&'static str),
    /// The table is present but could not be decoded.
    InvalidTable(Tag, Box<DecodeError>),
    MalformedData(&'static str),
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::OutOfBounds => write!(f, "An offset was out of bounds"),
            ReadError::InvalidFormat(x) => write!(f, "Invalid format '{x}'"),
            ReadError::InvalidSignature(sig) => write!(f, "Invalid WOFF2 signature 0x{sig:08X}"),
            ReadError::UnsupportedCollection => {
                write!(f, "WOFF2 font collections are not supported")
            }
            ReadError::MalformedVarInt(msg) => write!(f, "Malformed variable-length integer: {msg}"),
            ReadError::TableIsMissing(tag) => write!(f, "the {tag} table is missing"),
            ReadError::Decompression(msg) => write!(f, "Brotli decompression failed: {msg}"),
            ReadError::InvalidTable(tag, err) => {
                write!(f, "could not read font table '{tag}': {err}")
            }
            ReadError::MalformedData(msg) => write!(f, "Malformed data: '{msg}'"),
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReadError::InvalidTable(_, err) => Some(err.as_ref()),
            _ => None,
        }
    }
}
