//! The [WOFF2](https://www.w3.org/TR/WOFF2/) container.
//!
//! A WOFF2 file holds a fixed header, a compact table directory and a single
//! Brotli compressed block containing the data of every table, stored back
//! to back. Some tables may be stored in a transformed format.

use brotli_decompressor::{BrotliDecompressStream, BrotliResult, BrotliState, StandardAlloc};
use types::Tag;

use crate::glyph::GlyphTable;
use crate::options::DecodeOptions;
use crate::tables::glyf::{DecodeError, TransformedGlyf};
use crate::varint::read_uint_base128;
use crate::{Cursor, FontData, ReadError};

/// `wOF2`
pub const WOFF2_SIGNATURE: u32 = 0x774F_4632;

/// The size of [`Woff2Header`] in bytes.
pub const HEADER_LEN: usize = 48;

const TTC_FLAVOR: Tag = Tag::new(b"ttcf");
const GLYF: Tag = Tag::new(b"glyf");
const LOCA: Tag = Tag::new(b"loca");
const MAXP: Tag = Tag::new(b"maxp");

/// Index value in a directory entry's flags that is followed by an explicit tag.
const EXPLICIT_TAG: u8 = 63;
const TAG_INDEX_MASK: u8 = 0x3F;

/// Tags that can be referenced by index from the table directory.
pub static KNOWN_TABLE_TAGS: [Tag; 63] = [
    Tag::new(b"cmap"),
    Tag::new(b"head"),
    Tag::new(b"hhea"),
    Tag::new(b"hmtx"),
    Tag::new(b"maxp"),
    Tag::new(b"name"),
    Tag::new(b"OS/2"),
    Tag::new(b"post"),
    Tag::new(b"cvt "),
    Tag::new(b"fpgm"),
    Tag::new(b"glyf"),
    Tag::new(b"loca"),
    Tag::new(b"prep"),
    Tag::new(b"CFF "),
    Tag::new(b"VORG"),
    Tag::new(b"EBDT"),
    Tag::new(b"EBLC"),
    Tag::new(b"gasp"),
    Tag::new(b"hdmx"),
    Tag::new(b"kern"),
    Tag::new(b"LTSH"),
    Tag::new(b"PCLT"),
    Tag::new(b"VDMX"),
    Tag::new(b"vhea"),
    Tag::new(b"vmtx"),
    Tag::new(b"BASE"),
    Tag::new(b"GDEF"),
    Tag::new(b"GPOS"),
    Tag::new(b"GSUB"),
    Tag::new(b"EBSC"),
    Tag::new(b"JSTF"),
    Tag::new(b"MATH"),
    Tag::new(b"CBDT"),
    Tag::new(b"CBLC"),
    Tag::new(b"COLR"),
    Tag::new(b"CPAL"),
    Tag::new(b"SVG "),
    Tag::new(b"sbix"),
    Tag::new(b"acnt"),
    Tag::new(b"avar"),
    Tag::new(b"bdat"),
    Tag::new(b"bloc"),
    Tag::new(b"bsln"),
    Tag::new(b"cvar"),
    Tag::new(b"fdsc"),
    Tag::new(b"feat"),
    Tag::new(b"fmtx"),
    Tag::new(b"fvar"),
    Tag::new(b"gvar"),
    Tag::new(b"hsty"),
    Tag::new(b"just"),
    Tag::new(b"lcar"),
    Tag::new(b"mort"),
    Tag::new(b"morx"),
    Tag::new(b"opbd"),
    Tag::new(b"prop"),
    Tag::new(b"trak"),
    Tag::new(b"Zapf"),
    Tag::new(b"Silf"),
    Tag::new(b"Glat"),
    Tag::new(b"Gloc"),
    Tag::new(b"Feat"),
    Tag::new(b"Sill"),
];

/// The fixed WOFF2 header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Woff2Header {
    pub signature: u32,
    /// The `sfntVersion` of the wrapped font.
    pub flavor: Tag,
    /// Total size of the WOFF2 file.
    pub length: u32,
    pub num_tables: u16,
    pub reserved: u16,
    /// Size of the uncompressed font, including padding.
    pub total_sfnt_size: u32,
    /// Size of the Brotli block.
    pub total_compressed_size: u32,
    pub major_version: u16,
    pub minor_version: u16,
    pub meta_offset: u32,
    pub meta_length: u32,
    pub meta_orig_length: u32,
    pub priv_offset: u32,
    pub priv_length: u32,
}

impl Woff2Header {
    pub fn read(data: FontData) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let signature = cursor.read()?;
        if signature != WOFF2_SIGNATURE {
            return Err(ReadError::InvalidSignature(signature));
        }
        let header = Woff2Header {
            signature,
            flavor: cursor.read()?,
            length: cursor.read()?,
            num_tables: cursor.read()?,
            reserved: cursor.read()?,
            total_sfnt_size: cursor.read()?,
            total_compressed_size: cursor.read()?,
            major_version: cursor.read()?,
            minor_version: cursor.read()?,
            meta_offset: cursor.read()?,
            meta_length: cursor.read()?,
            meta_orig_length: cursor.read()?,
            priv_offset: cursor.read()?,
            priv_length: cursor.read()?,
        };
        if header.flavor == TTC_FLAVOR {
            return Err(ReadError::UnsupportedCollection);
        }
        if header.reserved != 0 {
            return Err(ReadError::MalformedData("reserved header field is not zero"));
        }
        if header.length as usize != data.len() {
            return Err(ReadError::MalformedData(
                "header length does not match file size",
            ));
        }
        Ok(header)
    }
}

/// An entry in the table directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableDirectoryEntry {
    pub tag: Tag,
    /// The raw flags byte.
    pub flags: u8,
    pub orig_length: u32,
    /// Present only for tables stored in a transformed format.
    pub transform_length: Option<u32>,
    /// Offset of the table data in the decompressed block.
    pub offset: u32,
}

impl TableDirectoryEntry {
    fn read(cursor: &mut Cursor, offset: u32) -> Result<Self, ReadError> {
        let flags = cursor.read_u8()?;
        let tag = match flags & TAG_INDEX_MASK {
            EXPLICIT_TAG => cursor.read()?,
            idx => KNOWN_TABLE_TAGS[idx as usize],
        };
        let orig_length = read_uint_base128(cursor)?;
        let transform_version = flags >> 6;
        // for glyf and loca version 0 is the transform, version 3 the null transform;
        // every other table uses version 0 as the null transform
        let is_transformed = match tag {
            GLYF | LOCA => transform_version == 0,
            _ => transform_version != 0,
        };
        let transform_length = is_transformed
            .then(|| read_uint_base128(cursor))
            .transpose()?;
        Ok(Self {
            tag,
            flags,
            orig_length,
            transform_length,
            offset,
        })
    }

    /// The transformation version, from the top two bits of the flags.
    pub fn transform_version(&self) -> u8 {
        self.flags >> 6
    }

    pub fn is_transformed(&self) -> bool {
        self.transform_length.is_some()
    }

    /// The number of bytes the table occupies in the decompressed block.
    pub fn stored_len(&self) -> u32 {
        self.transform_length.unwrap_or(self.orig_length)
    }
}

/// A WOFF2 font with its table data decompressed.
#[derive(Clone)]
pub struct Woff2Font<'a> {
    data: FontData<'a>,
    header: Woff2Header,
    table_directory: Vec<TableDirectoryEntry>,
    table_data: Vec<u8>,
    options: DecodeOptions,
}

impl<'a> Woff2Font<'a> {
    /// Parse the header and directory and decompress the table data.
    pub fn new(bytes: &'a [u8]) -> Result<Self, ReadError> {
        Self::with_options(bytes, DecodeOptions::default())
    }

    pub fn with_options(bytes: &'a [u8], options: DecodeOptions) -> Result<Self, ReadError> {
        let data = FontData::new(bytes);
        let header = Woff2Header::read(data)?;
        let mut cursor = data.cursor_at(HEADER_LEN);
        let mut table_directory = Vec::with_capacity(header.num_tables as usize);
        let mut offset = 0u32;
        for _ in 0..header.num_tables {
            let entry = TableDirectoryEntry::read(&mut cursor, offset)?;
            offset = offset
                .checked_add(entry.stored_len())
                .ok_or(ReadError::MalformedData("table lengths overflow"))?;
            table_directory.push(entry);
        }
        let compressed_start = cursor.position()?;
        let compressed = data.read_bytes(
            compressed_start..compressed_start + header.total_compressed_size as usize,
        )?;
        let limit = options
            .max_decompressed_size
            .min(header.total_sfnt_size as usize);
        let table_data = decompress(compressed, limit)?;
        if (offset as usize) > table_data.len() {
            return Err(ReadError::MalformedData(
                "table directory exceeds decompressed data",
            ));
        }
        log::debug!(
            "woff2: flavor {}, {} tables, {} compressed bytes -> {} bytes",
            header.flavor,
            header.num_tables,
            compressed.len(),
            table_data.len()
        );
        Ok(Self {
            data,
            header,
            table_directory,
            table_data,
            options,
        })
    }

    /// The raw bytes of the file.
    pub fn data(&self) -> FontData<'a> {
        self.data
    }

    pub fn header(&self) -> &Woff2Header {
        &self.header
    }

    pub fn table_directory(&self) -> &[TableDirectoryEntry] {
        &self.table_directory
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    pub fn table_entry(&self, tag: Tag) -> Option<&TableDirectoryEntry> {
        self.table_directory.iter().find(|entry| entry.tag == tag)
    }

    /// The stored, possibly transformed, data for a table.
    pub fn table_data(&self, tag: Tag) -> Option<FontData<'_>> {
        let entry = self.table_entry(tag)?;
        let start = entry.offset as usize;
        FontData::new(&self.table_data).slice(start..start + entry.stored_len() as usize)
    }

    fn expect_table(&self, tag: Tag) -> Result<FontData<'_>, ReadError> {
        self.table_data(tag).ok_or(ReadError::TableIsMissing(tag))
    }

    /// The glyph count from the `maxp` table.
    pub fn num_glyphs(&self) -> Result<u16, ReadError> {
        self.expect_table(MAXP)?.read_at(4)
    }

    /// Reconstruct every glyph of a transformed `glyf` table.
    pub fn glyphs(&self) -> Result<GlyphTable, ReadError> {
        let entry = self.table_entry(GLYF).ok_or(ReadError::TableIsMissing(GLYF))?;
        if !entry.is_transformed() {
            return Err(ReadError::InvalidFormat(entry.transform_version() as i64));
        }
        let num_glyphs = self.num_glyphs()?;
        self.decode_glyf(num_glyphs)
            .map_err(|err| ReadError::InvalidTable(GLYF, Box::new(err)))
    }

    fn decode_glyf(&self, num_glyphs: u16) -> Result<GlyphTable, DecodeError> {
        let glyf = TransformedGlyf::read(self.table_data(GLYF).unwrap_or_default())?;
        if glyf.num_glyphs() != num_glyphs {
            return Err(DecodeError::GlyphCountMismatch {
                maxp: num_glyphs,
                glyf: glyf.num_glyphs(),
            });
        }
        glyf.decode(&self.options)
    }
}

/// Decompress a Brotli stream, failing if it would exceed `max_len` bytes
/// or if input remains after the end of the stream.
fn decompress(compressed: &[u8], max_len: usize) -> Result<Vec<u8>, ReadError> {
    let mut state = BrotliState::new_strict(
        StandardAlloc::default(),
        StandardAlloc::default(),
        StandardAlloc::default(),
    );
    let mut available_in = compressed.len();
    let mut input_offset = 0;
    let mut chunk = [0u8; 4096];
    let mut total_out = 0;
    let mut output = Vec::new();
    loop {
        let mut available_out = chunk.len();
        let mut written = 0;
        let result = BrotliDecompressStream(
            &mut available_in,
            &mut input_offset,
            compressed,
            &mut available_out,
            &mut written,
            &mut chunk,
            &mut total_out,
            &mut state,
        );
        if output.len() + written > max_len {
            return Err(ReadError::Decompression("output exceeds size limit"));
        }
        output.extend_from_slice(&chunk[..written]);
        match result {
            BrotliResult::ResultSuccess => break,
            BrotliResult::NeedsMoreOutput => continue,
            BrotliResult::NeedsMoreInput => {
                return Err(ReadError::Decompression("truncated stream"))
            }
            BrotliResult::ResultFailure => return Err(ReadError::Decompression("invalid stream")),
        }
    }
    if available_in != 0 {
        return Err(ReadError::Decompression("excess input after stream"));
    }
    Ok(output)
}
