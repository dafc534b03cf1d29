//! The transformed [glyf](https://www.w3.org/TR/WOFF2/#glyf_table_format) table
//!
//! A WOFF2 encoder may replace the `glyf` and `loca` tables with a single
//! table whose glyph records are split into seven streams, each holding one
//! kind of data for every glyph. This module reassembles those streams into
//! complete glyphs.

mod composite;
mod simple;
mod triplet;

use std::fmt;
use std::ops::Range;

pub use composite::{Anchor, Component, CompositeGlyphFlags, Transform};
pub use triplet::{is_on_curve, TripletEncoding, TRIPLET_ENCODINGS};

use crate::glyph::{Bounds, Glyph, GlyphTable};
use crate::options::{BboxBitmapLayout, DecodeOptions};
use crate::varint::read_255_u16;
use crate::{Cursor, FontData, ReadError};

/// The size of the fixed header that precedes the streams.
pub const HEADER_LEN: usize = 36;

const NUM_STREAMS: usize = 7;

/// One of the sections of a transformed `glyf` table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stream {
    /// The fixed size header.
    Header,
    /// One `i16` contour count per glyph.
    NContour,
    /// One `255UInt16` point count per contour.
    NPoints,
    /// One flag byte per point.
    Flag,
    /// Point coordinates and instruction lengths.
    Glyph,
    /// Composite glyph component records.
    Composite,
    /// The bounding box bitmap followed by the explicit boxes.
    Bbox,
    /// Hinting instructions.
    Instruction,
}

impl Stream {
    /// The streams that follow the header, in the order they are stored.
    pub const ALL: [Stream; NUM_STREAMS] = [
        Stream::NContour,
        Stream::NPoints,
        Stream::Flag,
        Stream::Glyph,
        Stream::Composite,
        Stream::Bbox,
        Stream::Instruction,
    ];

    fn index(self) -> Option<usize> {
        Self::ALL.iter().position(|s| *s == self)
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stream::Header => "header",
            Stream::NContour => "nContour",
            Stream::NPoints => "nPoints",
            Stream::Flag => "flag",
            Stream::Glyph => "glyph",
            Stream::Composite => "composite",
            Stream::Bbox => "bbox",
            Stream::Instruction => "instruction",
        };
        f.write_str(name)
    }
}

/// An error that occurs when decoding a transformed `glyf` table.
///
/// None of these are recoverable: a table that produces one of them yields
/// no glyphs at all.
#[derive(Clone, Debug)]
pub enum DecodeError {
    /// Reading a value failed.
    Read {
        stream: Stream,
        glyph: Option<u16>,
        error: ReadError,
    },
    /// A stream was not consumed exactly, or the declared sizes do not
    /// add up to the table length.
    StreamSizeMismatch {
        stream: Stream,
        expected: usize,
        actual: usize,
    },
    UnsupportedVersion(u32),
    /// A point flag selected a coordinate encoding that cannot be decoded.
    UnsupportedFormatCode { glyph: u16, code: u8 },
    /// A composite glyph has no bit set in the bounding box bitmap.
    MissingCompositeBbox { glyph: u16 },
    /// A component references a glyph that does not exist, or that is
    /// still being resolved (a cycle).
    UnresolvableReference { glyph: u16, component: u16 },
    /// Composite glyphs are nested deeper than the configured limit.
    RecursionLimitExceeded { glyph: u16 },
    /// The `maxp` table and the `glyf` header disagree on the glyph count.
    GlyphCountMismatch { maxp: u16, glyf: u16 },
}

impl DecodeError {
    /// The glyph being decoded when the error occurred, if known.
    pub fn glyph(&self) -> Option<u16> {
        match self {
            DecodeError::Read { glyph, .. } => *glyph,
            DecodeError::UnsupportedFormatCode { glyph, .. }
            | DecodeError::MissingCompositeBbox { glyph }
            | DecodeError::UnresolvableReference { glyph, .. }
            | DecodeError::RecursionLimitExceeded { glyph } => Some(*glyph),
            _ => None,
        }
    }

    /// The stream being read when the error occurred, if known.
    pub fn stream(&self) -> Option<Stream> {
        match self {
            DecodeError::Read { stream, .. } | DecodeError::StreamSizeMismatch { stream, .. } => {
                Some(*stream)
            }
            DecodeError::UnsupportedVersion(_) => Some(Stream::Header),
            DecodeError::UnsupportedFormatCode { .. } => Some(Stream::Flag),
            DecodeError::MissingCompositeBbox { .. } => Some(Stream::Bbox),
            DecodeError::UnresolvableReference { .. }
            | DecodeError::RecursionLimitExceeded { .. } => Some(Stream::Composite),
            DecodeError::GlyphCountMismatch { .. } => None,
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Read {
                stream,
                glyph: Some(glyph),
                error,
            } => write!(f, "reading {stream} stream for glyph {glyph}: {error}"),
            DecodeError::Read {
                stream,
                glyph: None,
                error,
            } => write!(f, "reading {stream} stream: {error}"),
            DecodeError::StreamSizeMismatch {
                stream,
                expected,
                actual,
            } => write!(
                f,
                "{stream} stream size mismatch: expected {expected} bytes, found {actual}"
            ),
            DecodeError::UnsupportedVersion(version) => {
                write!(f, "unsupported transformed glyf version {version}")
            }
            DecodeError::UnsupportedFormatCode { glyph, code } => {
                write!(f, "unsupported point format code {code} in glyph {glyph}")
            }
            DecodeError::MissingCompositeBbox { glyph } => {
                write!(f, "composite glyph {glyph} has no bounding box")
            }
            DecodeError::UnresolvableReference { glyph, component } => write!(
                f,
                "glyph {glyph} references unresolvable component glyph {component}"
            ),
            DecodeError::RecursionLimitExceeded { glyph } => write!(
                f,
                "component nesting in glyph {glyph} exceeds the recursion limit"
            ),
            DecodeError::GlyphCountMismatch { maxp, glyf } => write!(
                f,
                "maxp declares {maxp} glyphs but the glyf table holds {glyf}"
            ),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Read { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Wrap a [`ReadError`] with the stream and glyph it occurred in.
fn read_error(
    stream: Stream,
    glyph: impl Into<Option<u16>>,
) -> impl FnOnce(ReadError) -> DecodeError {
    let glyph = glyph.into();
    move |error| DecodeError::Read {
        stream,
        glyph,
        error,
    }
}

/// Fail unless every byte of the stream has been read.
fn check_consumed(cursor: &Cursor, stream: Stream, len: usize) -> Result<(), DecodeError> {
    let actual = cursor.position().map_err(read_error(stream, None))?;
    if actual != len {
        return Err(DecodeError::StreamSizeMismatch {
            stream,
            expected: len,
            actual,
        });
    }
    Ok(())
}

/// The fixed header of a transformed `glyf` table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TableHeader {
    pub version: u32,
    pub num_glyphs: u16,
    /// The `loca` offset format, 0 for short and 1 for long.
    pub index_format: u16,
    /// Stream sizes in storage order; see [`Stream::ALL`].
    pub stream_sizes: [u32; NUM_STREAMS],
}

impl TableHeader {
    pub fn read(data: FontData) -> Result<Self, DecodeError> {
        let mut cursor = data.cursor();
        let version = cursor.read().map_err(read_error(Stream::Header, None))?;
        let num_glyphs = cursor.read().map_err(read_error(Stream::Header, None))?;
        let index_format = cursor.read().map_err(read_error(Stream::Header, None))?;
        let mut stream_sizes = [0u32; NUM_STREAMS];
        for size in stream_sizes.iter_mut() {
            *size = cursor.read().map_err(read_error(Stream::Header, None))?;
        }
        Ok(Self {
            version,
            num_glyphs,
            index_format,
            stream_sizes,
        })
    }

    /// The declared size of a stream, in bytes.
    pub fn stream_size(&self, stream: Stream) -> usize {
        match stream.index() {
            Some(idx) => self.stream_sizes[idx] as usize,
            None => HEADER_LEN,
        }
    }

    /// The table length implied by the header.
    pub fn table_len(&self) -> u64 {
        HEADER_LEN as u64 + self.stream_sizes.iter().map(|s| *s as u64).sum::<u64>()
    }

    /// The byte range of a stream within the table.
    pub fn stream_range(&self, stream: Stream) -> Range<usize> {
        let Some(idx) = stream.index() else {
            return 0..HEADER_LEN;
        };
        let start = HEADER_LEN
            + self.stream_sizes[..idx]
                .iter()
                .map(|s| *s as usize)
                .sum::<usize>();
        start..start + self.stream_sizes[idx] as usize
    }
}

/// Per glyph bookkeeping while the streams are decoded.
#[derive(Clone, Copy, Debug, Default)]
struct GlyphDescriptor {
    num_contours: i16,
    instruction_len: u16,
    /// Set by the composite pre-scan.
    has_instructions: bool,
    /// Offset of the component records in the composite stream.
    composite_offset: usize,
}

impl GlyphDescriptor {
    fn is_composite(&self) -> bool {
        self.num_contours < 0
    }
}

/// A transformed `glyf` table.
#[derive(Clone)]
pub struct TransformedGlyf<'a> {
    data: FontData<'a>,
    header: TableHeader,
}

impl<'a> TransformedGlyf<'a> {
    /// Parse the header and check that the stream sizes add up to the
    /// length of `data`.
    pub fn read(data: FontData<'a>) -> Result<Self, DecodeError> {
        let header = TableHeader::read(data)?;
        if header.version != 0 {
            return Err(DecodeError::UnsupportedVersion(header.version));
        }
        let expected = header.table_len();
        if expected != data.len() as u64 {
            return Err(DecodeError::StreamSizeMismatch {
                stream: Stream::Header,
                expected: usize::try_from(expected).unwrap_or(usize::MAX),
                actual: data.len(),
            });
        }
        log::debug!(
            "transformed glyf: {} glyphs, index format {}, stream sizes {:?}",
            header.num_glyphs,
            header.index_format,
            header.stream_sizes
        );
        Ok(Self { data, header })
    }

    pub fn header(&self) -> &TableHeader {
        &self.header
    }

    pub fn num_glyphs(&self) -> u16 {
        self.header.num_glyphs
    }

    /// The raw bytes of one stream.
    pub fn stream_data(&self, stream: Stream) -> FontData<'a> {
        // the ranges were validated against the table length in `read`
        self.data
            .slice(self.header.stream_range(stream))
            .unwrap_or_default()
    }

    /// Reconstruct every glyph in the table.
    pub fn decode(&self, options: &DecodeOptions) -> Result<GlyphTable, DecodeError> {
        let mut descriptors = self.read_contour_counts()?;
        let point_counts = self.read_point_counts(&descriptors)?;
        composite::scan_composites(self.stream_data(Stream::Composite), &mut descriptors)?;
        let glyphs = self.read_glyph_stream(&mut descriptors, &point_counts)?;
        let mut glyphs = composite::Resolver::new(
            self.stream_data(Stream::Composite),
            &descriptors,
            glyphs,
            options.max_component_depth,
        )
        .resolve_all()?;
        self.read_bboxes(&descriptors, &mut glyphs, options.bbox_bitmap)?;
        self.read_instructions(&descriptors, &mut glyphs)?;
        Ok(GlyphTable::new(glyphs, self.header.index_format))
    }

    fn read_contour_counts(&self) -> Result<Vec<GlyphDescriptor>, DecodeError> {
        let data = self.stream_data(Stream::NContour);
        let mut cursor = data.cursor();
        let descriptors = (0..self.header.num_glyphs)
            .map(|gid| {
                let num_contours = cursor
                    .read::<i16>()
                    .map_err(read_error(Stream::NContour, gid))?;
                Ok(GlyphDescriptor {
                    num_contours,
                    ..Default::default()
                })
            })
            .collect::<Result<Vec<_>, DecodeError>>()?;
        check_consumed(&cursor, Stream::NContour, data.len())?;
        Ok(descriptors)
    }

    /// The point count of every contour of every simple glyph, in order.
    fn read_point_counts(&self, descriptors: &[GlyphDescriptor]) -> Result<Vec<u16>, DecodeError> {
        let data = self.stream_data(Stream::NPoints);
        let mut cursor = data.cursor();
        // each count is at least one byte
        let mut counts = Vec::with_capacity(data.len());
        for (gid, desc) in descriptors.iter().enumerate() {
            for _ in 0..desc.num_contours.max(0) {
                let count =
                    read_255_u16(&mut cursor).map_err(read_error(Stream::NPoints, gid as u16))?;
                counts.push(count);
            }
        }
        check_consumed(&cursor, Stream::NPoints, data.len())?;
        Ok(counts)
    }

    /// Decode simple glyphs and instruction lengths.
    ///
    /// Composite glyphs are left as `None`, to be filled in by the resolver.
    fn read_glyph_stream(
        &self,
        descriptors: &mut [GlyphDescriptor],
        point_counts: &[u16],
    ) -> Result<Vec<Option<Glyph>>, DecodeError> {
        let glyph_data = self.stream_data(Stream::Glyph);
        let flag_data = self.stream_data(Stream::Flag);
        let mut glyph_cursor = glyph_data.cursor();
        let mut flag_cursor = flag_data.cursor();
        let mut remaining_contours = point_counts;
        let mut glyphs = Vec::with_capacity(descriptors.len());
        for (gid, desc) in descriptors.iter_mut().enumerate() {
            let gid = gid as u16;
            if desc.is_composite() {
                if desc.has_instructions {
                    desc.instruction_len = read_255_u16(&mut glyph_cursor)
                        .map_err(read_error(Stream::Glyph, gid))?;
                }
                glyphs.push(None);
            } else if desc.num_contours == 0 {
                glyphs.push(Some(Glyph::empty(gid)));
            } else {
                let (contours, rest) = remaining_contours.split_at(desc.num_contours as usize);
                remaining_contours = rest;
                let outline =
                    simple::read_outline(gid, contours, &mut flag_cursor, &mut glyph_cursor)?;
                desc.instruction_len =
                    read_255_u16(&mut glyph_cursor).map_err(read_error(Stream::Glyph, gid))?;
                glyphs.push(Some(Glyph::from_outline(gid, outline)));
            }
        }
        check_consumed(&flag_cursor, Stream::Flag, flag_data.len())?;
        check_consumed(&glyph_cursor, Stream::Glyph, glyph_data.len())?;
        Ok(glyphs)
    }

    fn read_bboxes(
        &self,
        descriptors: &[GlyphDescriptor],
        glyphs: &mut [Glyph],
        layout: BboxBitmapLayout,
    ) -> Result<(), DecodeError> {
        let data = self.stream_data(Stream::Bbox);
        let bitmap_len = bbox_bitmap_len(data, self.header.num_glyphs, layout)?;
        let bitmap = data
            .read_bytes(..bitmap_len)
            .map_err(read_error(Stream::Bbox, None))?;
        let mut cursor = data.cursor_at(bitmap_len);
        for (gid, (desc, glyph)) in descriptors.iter().zip(glyphs.iter_mut()).enumerate() {
            let gid = gid as u16;
            if has_bbox(bitmap, gid) {
                let mut read = || cursor.read::<i16>().map_err(read_error(Stream::Bbox, gid));
                let bounds = Bounds {
                    x_min: read()?,
                    y_min: read()?,
                    x_max: read()?,
                    y_max: read()?,
                };
                glyph.set_bounds(bounds);
            } else if desc.is_composite() {
                return Err(DecodeError::MissingCompositeBbox { glyph: gid });
            }
        }
        check_consumed(&cursor, Stream::Bbox, data.len())
    }

    fn read_instructions(
        &self,
        descriptors: &[GlyphDescriptor],
        glyphs: &mut [Glyph],
    ) -> Result<(), DecodeError> {
        let data = self.stream_data(Stream::Instruction);
        let mut cursor = data.cursor();
        for (gid, (desc, glyph)) in descriptors.iter().zip(glyphs.iter_mut()).enumerate() {
            if desc.instruction_len > 0 {
                let instructions = cursor
                    .read_bytes(desc.instruction_len as usize)
                    .map_err(read_error(Stream::Instruction, gid as u16))?;
                glyph.set_instructions(instructions.to_vec());
            }
        }
        check_consumed(&cursor, Stream::Instruction, data.len())
    }
}

fn has_bbox(bitmap: &[u8], glyph: u16) -> bool {
    let glyph = glyph as usize;
    bitmap
        .get(glyph >> 3)
        .is_some_and(|byte| byte & (0x80 >> (glyph & 7)) != 0)
}

/// The number of explicit boxes announced by the bitmap.
fn count_bboxes(bitmap: &[u8], num_glyphs: u16) -> usize {
    (0..num_glyphs).filter(|gid| has_bbox(bitmap, *gid)).count()
}

fn bbox_bitmap_len(
    data: FontData,
    num_glyphs: u16,
    layout: BboxBitmapLayout,
) -> Result<usize, DecodeError> {
    if let Some(len) = layout.bitmap_len(num_glyphs) {
        return Ok(len);
    }
    // the stream must end right after the last box
    let expected_len = |bitmap_len: usize| {
        data.read_bytes(..bitmap_len)
            .map(|bitmap| bitmap_len + 8 * count_bboxes(bitmap, num_glyphs))
            .unwrap_or(bitmap_len)
    };
    let packed = num_glyphs.div_ceil(8) as usize;
    let word_aligned = 4 * ((num_glyphs as usize + 31) / 32);
    [packed, word_aligned]
        .into_iter()
        .find(|len| expected_len(*len) == data.len() && *len <= data.len())
        .ok_or(DecodeError::StreamSizeMismatch {
            stream: Stream::Bbox,
            expected: expected_len(packed),
            actual: data.len(),
        })
}
