//! Building complete WOFF2 files.

use std::io::Write;

use brotlic::CompressorWriter;

use crate::bebuffer::BeBuffer;
use crate::varint::encode_uint_base128;

pub const SIGNATURE: u32 = 0x774F_4632;

/// The start of the known tag list in the table directory encoding.
const KNOWN_TAGS: [&[u8; 4]; 13] = [
    b"cmap", b"head", b"hhea", b"hmtx", b"maxp", b"name", b"OS/2", b"post", b"cvt ", b"fpgm",
    b"glyf", b"loca", b"prep",
];
const EXPLICIT_TAG: u8 = 63;

struct TableEntry {
    tag: [u8; 4],
    transform_version: u8,
    orig_length: u32,
    transform_length: Option<u32>,
    data: Vec<u8>,
}

/// Builds a WOFF2 file from table data.
///
/// Tables are written in the order they are added.
pub struct Woff2Builder {
    flavor: [u8; 4],
    tables: Vec<TableEntry>,
    truncate_compressed: Option<usize>,
}

impl Default for Woff2Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Woff2Builder {
    pub fn new() -> Self {
        Self {
            flavor: [0, 1, 0, 0],
            tables: Vec::new(),
            truncate_compressed: None,
        }
    }

    pub fn flavor(mut self, flavor: [u8; 4]) -> Self {
        self.flavor = flavor;
        self
    }

    /// Add a table stored without a transform.
    ///
    /// `glyf` and `loca` are written with the null transform, version 3.
    pub fn table(self, tag: [u8; 4], data: Vec<u8>) -> Self {
        let version = match &tag {
            b"glyf" | b"loca" => 3,
            _ => 0,
        };
        self.push_table(tag, version, None, data)
    }

    /// Same as [`table`](Self::table).
    pub fn untransformed_table(self, tag: [u8; 4], data: Vec<u8>) -> Self {
        self.table(tag, data)
    }

    /// Add a transformed `glyf` table followed by an empty transformed `loca`.
    pub fn transformed_glyf(self, data: Vec<u8>) -> Self {
        let len = data.len() as u32;
        self.push_table(*b"glyf", 0, Some(len), data)
            .push_table(*b"loca", 0, Some(0), Vec::new())
    }

    /// Keep only the first `len` bytes of the compressed block.
    pub fn truncate_compressed_data(mut self, len: usize) -> Self {
        self.truncate_compressed = Some(len);
        self
    }

    fn push_table(
        mut self,
        tag: [u8; 4],
        transform_version: u8,
        transform_length: Option<u32>,
        data: Vec<u8>,
    ) -> Self {
        self.tables.push(TableEntry {
            tag,
            transform_version,
            orig_length: transform_length.unwrap_or(data.len() as u32),
            transform_length,
            data,
        });
        self
    }

    fn directory(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for table in &self.tables {
            let index = KNOWN_TAGS
                .iter()
                .position(|tag| **tag == table.tag)
                .map(|idx| idx as u8)
                .unwrap_or(EXPLICIT_TAG);
            out.push(table.transform_version << 6 | index);
            if index == EXPLICIT_TAG {
                out.extend_from_slice(&table.tag);
            }
            out.extend(encode_uint_base128(table.orig_length));
            if let Some(len) = table.transform_length {
                out.extend(encode_uint_base128(len));
            }
        }
        out
    }

    pub fn build(&self) -> Vec<u8> {
        let payload: Vec<u8> = self
            .tables
            .iter()
            .flat_map(|table| table.data.iter().copied())
            .collect();
        let mut compressor = CompressorWriter::new(Vec::new());
        compressor.write_all(&payload).unwrap();
        let mut compressed = compressor.into_inner().unwrap();
        if let Some(len) = self.truncate_compressed {
            compressed.truncate(len);
        }
        let directory = self.directory();

        let num_tables = self.tables.len() as u16;
        let sfnt_size = 12
            + 16 * num_tables as u32
            + self
                .tables
                .iter()
                .map(|table| (table.orig_length + 3) & !3)
                .sum::<u32>();

        let mut buf = BeBuffer::new()
            .push(SIGNATURE)
            .push(self.flavor)
            .push_with_tag(0u32, "length")
            .push(num_tables)
            .push(0u16) // reserved
            .push(sfnt_size)
            .push_with_tag(0u32, "totalCompressedSize")
            .push(1u16) // major version
            .push(0u16) // minor version
            .extend([0u32; 5]) // no metadata or private data
            .push_bytes(&directory);
        let compressed_start = buf.len();
        buf = buf.push_bytes(&compressed);
        let compressed_len = (buf.len() - compressed_start) as u32;
        buf.write_at("totalCompressedSize", compressed_len);
        let length = buf.len() as u32;
        buf.write_at("length", length);
        buf.into_vec()
    }
}

/// A version 0.5 `maxp` table.
pub fn maxp_table(num_glyphs: u16) -> Vec<u8> {
    BeBuffer::new()
        .push(0x0000_5000u32)
        .push(num_glyphs)
        .into_vec()
}
