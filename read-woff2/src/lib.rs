//! Reading WOFF2 fonts
//!
//! This crate decodes the [WOFF2] font container and reconstructs the glyph
//! outlines of its transformed `glyf` table.
//!
//! A WOFF2 encoder splits the records of the `glyf` table into seven streams
//! (contour counts, point counts, flags, coordinates, composite records,
//! bounding boxes and instructions) and encodes most numbers with compact
//! variable-length formats. Decoding produces a [`GlyphTable`]: one
//! [`Glyph`] per glyph index, each with its points, contour end points,
//! bounding box and hinting instructions. Composite glyphs are flattened
//! into their components' points.
//!
//! # Example
//!
//! ```no_run
//! # let path_to_my_font_file = std::path::Path::new("");
//! use read_woff2::Woff2Font;
//! let font_bytes = std::fs::read(path_to_my_font_file).unwrap();
//! let font = Woff2Font::new(&font_bytes).expect("failed to read font data");
//! let glyphs = font.glyphs().expect("failed to decode 'glyf'");
//! for glyph in &glyphs {
//!     println!("glyph {} has {} points", glyph.glyph_id(), glyph.points().len());
//! }
//! ```
//!
//! A transformed `glyf` table can also be decoded on its own, with
//! [`TransformedGlyf`](tables::glyf::TransformedGlyf).
//!
//! [WOFF2]: https://www.w3.org/TR/WOFF2/

#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

mod font_data;
pub mod glyph;
pub mod options;
mod read;
pub mod tables;
pub mod varint;
pub mod woff2;

#[cfg(test)]
mod tests;

pub use font_data::{Cursor, FontData};
pub use glyph::{
    BitmapGlyph, Bounds, CffGlyph, CurvePoint, Glyph, GlyphClass, GlyphKind, GlyphTable, Outline,
};
pub use options::{BboxBitmapLayout, DecodeOptions};
pub use read::{ReadError, ReadScalar};
pub use woff2::Woff2Font;

/// Public re-export of the font-types crate.
pub extern crate font_types as types;
