//! The triplet encoding of point coordinates.
//!
//! Each point of a simple glyph is described by a flag byte, from the flag
//! stream, and between one and four coordinate bytes from the glyph stream.
//! The low seven bits of the flag select one of 128 encodings; the high bit
//! marks the point as off-curve.
//!
//! See <https://www.w3.org/TR/WOFF2/#triplet_decoding>

/// The encoding of a point's coordinate deltas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TripletEncoding {
    /// Total size, including the flag byte.
    pub byte_count: u8,
    pub x_bits: u8,
    pub y_bits: u8,
    /// Added to the decoded x magnitude.
    pub delta_x: u16,
    /// Added to the decoded y magnitude.
    pub delta_y: u16,
    /// -1, 0 or 1
    pub x_sign: i8,
    /// -1, 0 or 1
    pub y_sign: i8,
}

const ON_CURVE_MASK: u8 = 0x80;
const INDEX_MASK: u8 = 0x7F;

const COARSE_DELTAS: [u16; 5] = [0, 256, 512, 768, 1024];
const NIBBLE_DELTAS: [u16; 4] = [1, 17, 33, 49];
const BYTE_DELTAS: [u16; 3] = [1, 257, 513];
// (x_sign, y_sign) in the order they cycle through within each block
const SIGNS: [(i8, i8); 4] = [(-1, -1), (1, -1), (-1, 1), (1, 1)];

/// All 128 triplet encodings, indexed by the low seven bits of a flag.
pub static TRIPLET_ENCODINGS: [TripletEncoding; 128] = build_encodings();

impl TripletEncoding {
    const fn new(byte_count: u8, x_bits: u8, y_bits: u8) -> Self {
        Self {
            byte_count,
            x_bits,
            y_bits,
            delta_x: 0,
            delta_y: 0,
            x_sign: 0,
            y_sign: 0,
        }
    }

    const fn with_deltas(mut self, delta_x: u16, delta_y: u16) -> Self {
        self.delta_x = delta_x;
        self.delta_y = delta_y;
        self
    }

    const fn with_signs(mut self, (x_sign, y_sign): (i8, i8)) -> Self {
        self.x_sign = x_sign;
        self.y_sign = y_sign;
        self
    }

    /// The encoding selected by a flag byte.
    pub fn for_flag(flag: u8) -> &'static TripletEncoding {
        &TRIPLET_ENCODINGS[(flag & INDEX_MASK) as usize]
    }

    /// The number of coordinate bytes that follow in the glyph stream.
    pub fn data_len(&self) -> usize {
        (self.byte_count as usize).saturating_sub(1)
    }

    /// Decode the `(dx, dy)` deltas from the coordinate bytes.
    ///
    /// Returns `None` if `data` is not [`data_len`](Self::data_len) bytes
    /// long, or if the bit layout is not one the format defines.
    pub fn decode(&self, data: &[u8]) -> Option<(i32, i32)> {
        let layout_len = match (self.x_bits, self.y_bits) {
            (0, 8) | (8, 0) | (4, 4) => 1,
            (8, 8) => 2,
            (12, 12) => 3,
            (16, 16) => 4,
            _ => return None,
        };
        if data.len() != self.data_len() || data.len() != layout_len {
            return None;
        }
        let b = |i: usize| data[i] as u32;
        let (x, y) = match (self.x_bits, self.y_bits) {
            (0, 8) => (0, b(0)),
            (8, 0) => (b(0), 0),
            (4, 4) => (b(0) >> 4, b(0) & 0x0F),
            (8, 8) => (b(0), b(1)),
            (12, 12) => ((b(0) << 4) | (b(1) >> 4), ((b(1) & 0x0F) << 8) | b(2)),
            _ => ((b(0) << 8) | b(1), (b(2) << 8) | b(3)),
        };
        Some((
            (x as i32 + self.delta_x as i32) * self.x_sign as i32,
            (y as i32 + self.delta_y as i32) * self.y_sign as i32,
        ))
    }
}

/// `true` if the flag marks an on-curve point.
pub fn is_on_curve(flag: u8) -> bool {
    flag & ON_CURVE_MASK == 0
}

const fn build_encodings() -> [TripletEncoding; 128] {
    let mut table = [TripletEncoding::new(0, 0, 0); 128];
    let mut idx = 0;

    // one coordinate byte: y only, then x only
    let mut i = 0;
    while i < COARSE_DELTAS.len() {
        let delta = COARSE_DELTAS[i];
        table[idx] = TripletEncoding::new(2, 0, 8)
            .with_deltas(0, delta)
            .with_signs((0, -1));
        table[idx + 1] = TripletEncoding::new(2, 0, 8)
            .with_deltas(0, delta)
            .with_signs((0, 1));
        idx += 2;
        i += 1;
    }
    let mut i = 0;
    while i < COARSE_DELTAS.len() {
        let delta = COARSE_DELTAS[i];
        table[idx] = TripletEncoding::new(2, 8, 0)
            .with_deltas(delta, 0)
            .with_signs((-1, 0));
        table[idx + 1] = TripletEncoding::new(2, 8, 0)
            .with_deltas(delta, 0)
            .with_signs((1, 0));
        idx += 2;
        i += 1;
    }

    // one coordinate byte, a nibble each
    let mut i = 0;
    while i < NIBBLE_DELTAS.len() {
        let mut j = 0;
        while j < NIBBLE_DELTAS.len() {
            let mut s = 0;
            while s < SIGNS.len() {
                table[idx] = TripletEncoding::new(2, 4, 4)
                    .with_deltas(NIBBLE_DELTAS[i], NIBBLE_DELTAS[j])
                    .with_signs(SIGNS[s]);
                idx += 1;
                s += 1;
            }
            j += 1;
        }
        i += 1;
    }

    // two coordinate bytes, a byte each
    let mut i = 0;
    while i < BYTE_DELTAS.len() {
        let mut j = 0;
        while j < BYTE_DELTAS.len() {
            let mut s = 0;
            while s < SIGNS.len() {
                table[idx] = TripletEncoding::new(3, 8, 8)
                    .with_deltas(BYTE_DELTAS[i], BYTE_DELTAS[j])
                    .with_signs(SIGNS[s]);
                idx += 1;
                s += 1;
            }
            j += 1;
        }
        i += 1;
    }

    let mut s = 0;
    while s < SIGNS.len() {
        table[idx] = TripletEncoding::new(4, 12, 12).with_signs(SIGNS[s]);
        idx += 1;
        s += 1;
    }
    let mut s = 0;
    while s < SIGNS.len() {
        table[idx] = TripletEncoding::new(5, 16, 16).with_signs(SIGNS[s]);
        idx += 1;
        s += 1;
    }
    assert!(idx == 128);
    table
}
