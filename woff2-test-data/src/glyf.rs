//! Building transformed `glyf` tables.
//!
//! The builder writes each glyph into the seven streams the same way a
//! WOFF2 encoder would: the shortest triplet for every point delta, the
//! shortest `255UInt16` for every count.

use crate::bebuffer::BeBuffer;
use crate::varint::encode_255_u16;

/// Composite glyph flag bits.
pub mod flags {
    pub const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
    pub const ARGS_ARE_XY_VALUES: u16 = 0x0002;
    pub const ROUND_XY_TO_GRID: u16 = 0x0004;
    pub const WE_HAVE_A_SCALE: u16 = 0x0008;
    pub const MORE_COMPONENTS: u16 = 0x0020;
    pub const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
    pub const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;
    pub const WE_HAVE_INSTRUCTIONS: u16 = 0x0100;
    pub const USE_MY_METRICS: u16 = 0x0200;
}

/// Where a component is placed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ComponentAnchor {
    Offset(i16, i16),
    /// Matched point numbers: (base glyph point, component point).
    Point(u16, u16),
}

/// The transform written after a component's arguments.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum ComponentTransform {
    #[default]
    None,
    Scale(f32),
    XyScale(f32, f32),
    /// In storage order: xx, yx, xy, yy.
    Matrix([f32; 4]),
}

/// A single component of a composite glyph.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentRecord {
    pub glyph: u16,
    pub anchor: ComponentAnchor,
    pub transform: ComponentTransform,
    /// Flags written in addition to the ones derived from the other fields.
    pub extra_flags: u16,
    /// Write the arguments as words even when they fit in bytes.
    pub force_words: bool,
}

impl ComponentRecord {
    pub fn offset(glyph: u16, x: i16, y: i16) -> Self {
        Self {
            glyph,
            anchor: ComponentAnchor::Offset(x, y),
            transform: ComponentTransform::None,
            extra_flags: 0,
            force_words: false,
        }
    }

    pub fn point(glyph: u16, base: u16, component: u16) -> Self {
        Self {
            anchor: ComponentAnchor::Point(base, component),
            ..Self::offset(glyph, 0, 0)
        }
    }

    pub fn scale(mut self, scale: f32) -> Self {
        self.transform = ComponentTransform::Scale(scale);
        self
    }

    pub fn xy_scale(mut self, x: f32, y: f32) -> Self {
        self.transform = ComponentTransform::XyScale(x, y);
        self
    }

    pub fn matrix(mut self, matrix: [f32; 4]) -> Self {
        self.transform = ComponentTransform::Matrix(matrix);
        self
    }

    pub fn flags(mut self, extra_flags: u16) -> Self {
        self.extra_flags |= extra_flags;
        self
    }

    pub fn words(mut self) -> Self {
        self.force_words = true;
        self
    }

    /// Append the component record to `out`.
    pub fn encode(&self, more_components: bool, has_instructions: bool, out: &mut Vec<u8>) {
        let mut flag_bits = self.extra_flags;
        let mut args = BeBuffer::new();
        match self.anchor {
            ComponentAnchor::Offset(x, y) => {
                flag_bits |= flags::ARGS_ARE_XY_VALUES;
                let fits = |v: i16| i8::try_from(v).is_ok();
                if self.force_words || !fits(x) || !fits(y) {
                    flag_bits |= flags::ARG_1_AND_2_ARE_WORDS;
                    args = args.push(x).push(y);
                } else {
                    args = args.push(x as i8).push(y as i8);
                }
            }
            ComponentAnchor::Point(base, component) => {
                let fits = |v: u16| u8::try_from(v).is_ok();
                if self.force_words || !fits(base) || !fits(component) {
                    flag_bits |= flags::ARG_1_AND_2_ARE_WORDS;
                    args = args.push(base).push(component);
                } else {
                    args = args.push(base as u8).push(component as u8);
                }
            }
        }
        let scales: Vec<f32> = match self.transform {
            ComponentTransform::None => vec![],
            ComponentTransform::Scale(s) => {
                flag_bits |= flags::WE_HAVE_A_SCALE;
                vec![s]
            }
            ComponentTransform::XyScale(x, y) => {
                flag_bits |= flags::WE_HAVE_AN_X_AND_Y_SCALE;
                vec![x, y]
            }
            ComponentTransform::Matrix(m) => {
                flag_bits |= flags::WE_HAVE_A_TWO_BY_TWO;
                m.to_vec()
            }
        };
        if more_components {
            flag_bits |= flags::MORE_COMPONENTS;
        }
        if has_instructions {
            flag_bits |= flags::WE_HAVE_INSTRUCTIONS;
        }
        let record = BeBuffer::new()
            .push(flag_bits)
            .push(self.glyph)
            .push_bytes(&args)
            .extend(scales.into_iter().map(f2dot14));
        out.extend_from_slice(&record);
    }
}

fn f2dot14(value: f32) -> i16 {
    (value * 16384.0)
        .round()
        .clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// The flag byte and coordinate bytes for a point delta.
pub fn encode_triplet(dx: i32, dy: i32, on_curve: bool) -> (u8, Vec<u8>) {
    let on_curve_bit = if on_curve { 0 } else { 0x80 };
    let (abs_x, abs_y) = (dx.unsigned_abs(), dy.unsigned_abs());
    let x_sign_bit = u32::from(dx >= 0);
    let y_sign_bit = u32::from(dy >= 0);
    let xy_sign_bits = x_sign_bit + 2 * y_sign_bit;
    let (flag, data) = if dx == 0 && abs_y < 1280 {
        (((abs_y & 0xf00) >> 7) + y_sign_bit, vec![abs_y as u8])
    } else if dy == 0 && abs_x < 1280 {
        (10 + ((abs_x & 0xf00) >> 7) + x_sign_bit, vec![abs_x as u8])
    } else if abs_x < 65 && abs_y < 65 {
        let (x, y) = (abs_x - 1, abs_y - 1);
        (
            20 + (x & 0x30) + ((y & 0x30) >> 2) + xy_sign_bits,
            vec![(((x & 0xf) << 4) | (y & 0xf)) as u8],
        )
    } else if abs_x < 769 && abs_y < 769 {
        let (x, y) = (abs_x - 1, abs_y - 1);
        (
            84 + 12 * ((x & 0x300) >> 8) + ((y & 0x300) >> 6) + xy_sign_bits,
            vec![x as u8, y as u8],
        )
    } else if abs_x < 4096 && abs_y < 4096 {
        (
            120 + xy_sign_bits,
            vec![
                (abs_x >> 4) as u8,
                (((abs_x & 0xf) << 4) | (abs_y >> 8)) as u8,
                abs_y as u8,
            ],
        )
    } else {
        assert!(abs_x < 65536 && abs_y < 65536, "delta out of range");
        (
            124 + xy_sign_bits,
            vec![
                (abs_x >> 8) as u8,
                abs_x as u8,
                (abs_y >> 8) as u8,
                abs_y as u8,
            ],
        )
    };
    (flag as u8 | on_curve_bit, data)
}

#[derive(Clone, Debug)]
enum GlyphRecord {
    Empty,
    Simple(Vec<Vec<(i32, i32, bool)>>),
    Composite(Vec<ComponentRecord>),
}

#[derive(Clone, Debug)]
struct GlyphEntry {
    record: GlyphRecord,
    bbox: Option<[i16; 4]>,
    instructions: Vec<u8>,
}

/// Builds a transformed `glyf` table, one glyph at a time.
///
/// Points are given in absolute coordinates as `(x, y, on_curve)`.
#[derive(Clone, Debug, Default)]
pub struct TransformedGlyfBuilder {
    glyphs: Vec<GlyphEntry>,
    index_format: u16,
    word_aligned_bitmap: bool,
}

impl TransformedGlyfBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    fn push(mut self, record: GlyphRecord) -> Self {
        self.glyphs.push(GlyphEntry {
            record,
            bbox: None,
            instructions: Vec::new(),
        });
        self
    }

    pub fn empty_glyph(self) -> Self {
        self.push(GlyphRecord::Empty)
    }

    pub fn simple_glyph<C>(self, contours: impl IntoIterator<Item = C>) -> Self
    where
        C: AsRef<[(i32, i32, bool)]>,
    {
        let contours = contours
            .into_iter()
            .map(|c| c.as_ref().to_vec())
            .collect();
        self.push(GlyphRecord::Simple(contours))
    }

    pub fn composite_glyph(self, components: impl IntoIterator<Item = ComponentRecord>) -> Self {
        self.push(GlyphRecord::Composite(components.into_iter().collect()))
    }

    /// Give the most recently added glyph an explicit bounding box.
    pub fn with_bbox(mut self, [x_min, y_min, x_max, y_max]: [i16; 4]) -> Self {
        if let Some(last) = self.glyphs.last_mut() {
            last.bbox = Some([x_min, y_min, x_max, y_max]);
        }
        self
    }

    /// Give the most recently added glyph hinting instructions.
    pub fn with_instructions(mut self, instructions: &[u8]) -> Self {
        if let Some(last) = self.glyphs.last_mut() {
            last.instructions = instructions.to_vec();
        }
        self
    }

    pub fn index_format(mut self, index_format: u16) -> Self {
        self.index_format = index_format;
        self
    }

    /// Pad the bbox bitmap to a multiple of four bytes.
    pub fn word_aligned_bitmap(mut self) -> Self {
        self.word_aligned_bitmap = true;
        self
    }

    pub fn num_glyphs(&self) -> u16 {
        self.glyphs.len() as u16
    }

    /// The seven streams, in storage order.
    pub fn streams(&self) -> [Vec<u8>; 7] {
        let mut n_contour = BeBuffer::new();
        let mut n_points = Vec::new();
        let mut flag_stream = Vec::new();
        let mut glyph_stream = Vec::new();
        let mut composite_stream = Vec::new();
        let mut instruction_stream = Vec::new();
        for glyph in &self.glyphs {
            let has_instructions = !glyph.instructions.is_empty();
            match &glyph.record {
                GlyphRecord::Empty => n_contour = n_contour.push(0i16),
                GlyphRecord::Simple(contours) => {
                    n_contour = n_contour.push(contours.len() as i16);
                    let (mut x, mut y) = (0, 0);
                    for contour in contours {
                        n_points.extend(encode_255_u16(contour.len() as u16));
                        for (px, py, on_curve) in contour {
                            let (flag, data) = encode_triplet(px - x, py - y, *on_curve);
                            flag_stream.push(flag);
                            glyph_stream.extend(data);
                            (x, y) = (*px, *py);
                        }
                    }
                    glyph_stream.extend(encode_255_u16(glyph.instructions.len() as u16));
                }
                GlyphRecord::Composite(components) => {
                    n_contour = n_contour.push(-1i16);
                    for (i, component) in components.iter().enumerate() {
                        let last = i + 1 == components.len();
                        component.encode(
                            !last,
                            last && has_instructions,
                            &mut composite_stream,
                        );
                    }
                    if has_instructions {
                        glyph_stream.extend(encode_255_u16(glyph.instructions.len() as u16));
                    }
                }
            }
            instruction_stream.extend_from_slice(&glyph.instructions);
        }

        let num_glyphs = self.glyphs.len();
        let bitmap_len = if self.word_aligned_bitmap {
            4 * num_glyphs.div_ceil(32)
        } else {
            num_glyphs.div_ceil(8)
        };
        let mut bitmap = vec![0u8; bitmap_len];
        let mut boxes = BeBuffer::new();
        for (gid, glyph) in self.glyphs.iter().enumerate() {
            if let Some(bbox) = glyph.bbox {
                bitmap[gid >> 3] |= 0x80 >> (gid & 7);
                boxes = boxes.extend(bbox);
            }
        }
        let bbox_stream = [bitmap, boxes.into_vec()].concat();

        [
            n_contour.into_vec(),
            n_points,
            flag_stream,
            glyph_stream,
            composite_stream,
            bbox_stream,
            instruction_stream,
        ]
    }

    pub fn build(&self) -> Vec<u8> {
        assemble_table(self.num_glyphs(), self.index_format, &self.streams())
    }
}

/// Write the 36-byte header followed by the streams.
pub fn assemble_table(num_glyphs: u16, index_format: u16, streams: &[Vec<u8>; 7]) -> Vec<u8> {
    let mut buf = BeBuffer::new()
        .push(0u32) // version
        .push(num_glyphs)
        .push(index_format)
        .extend(streams.iter().map(|s| s.len() as u32));
    for stream in streams {
        buf = buf.push_bytes(stream);
    }
    buf.into_vec()
}

/// A transformed table holding an empty glyph, a triangle and a composite
/// placing the triangle twice.
///
/// The composite places the triangle at (0, 0) and at (100, 50).
pub fn triangle_and_composite() -> TransformedGlyfBuilder {
    TransformedGlyfBuilder::new()
        .empty_glyph()
        .simple_glyph([[(0, 0, true), (100, 0, true), (50, 100, true)]])
        .composite_glyph([
            ComponentRecord::offset(1, 0, 0),
            ComponentRecord::offset(1, 100, 50),
        ])
        .with_bbox([0, 0, 200, 150])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triplet_bands() {
        assert_eq!(encode_triplet(0, -5, true), (0, vec![5]));
        assert_eq!(encode_triplet(0, 260, false), (0x83, vec![4]));
        assert_eq!(encode_triplet(-1024, 0, true), (18, vec![0]));
        assert_eq!(encode_triplet(3, -4, true), (21, vec![0x23]));
        assert_eq!(encode_triplet(300, 2, true).0, 84 + 12 + 3);
        assert_eq!(encode_triplet(1000, 1000, true).0, 123);
        assert_eq!(encode_triplet(256, 5000, true), (127, vec![1, 0, 0x13, 0x88]));
    }

    #[test]
    fn table_layout() {
        let table = triangle_and_composite().build();
        // nContour: 0, 1, -1
        assert_eq!(&table[36..42], &[0, 0, 0, 1, 0xff, 0xff]);
        let sizes: u32 = table[8..36]
            .chunks(4)
            .map(|c| u32::from_be_bytes(c.try_into().unwrap()))
            .sum();
        assert_eq!(36 + sizes as usize, table.len());
    }

    #[test]
    fn component_flags() {
        let mut out = Vec::new();
        ComponentRecord::offset(3, 200, -1).encode(true, false, &mut out);
        // words, xy values, more components
        assert_eq!(&out[..2], &[0x00, 0x23]);
        assert_eq!(out.len(), 8);
        out.clear();
        ComponentRecord::point(3, 1, 2).scale(0.5).encode(false, true, &mut out);
        assert_eq!(out, [0x01, 0x08, 0, 3, 1, 2, 0x20, 0x00]);
    }
}
