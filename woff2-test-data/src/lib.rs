//! test data shared between the woff2 crates.

pub mod bebuffer;
pub mod glyf;
pub mod varint;
pub mod woff2;
