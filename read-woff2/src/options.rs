//! Settings that control decoding.

/// The default limit on nested composite glyphs.
///
/// This matches the limit used by FreeType and HarfBuzz.
pub const DEFAULT_MAX_COMPONENT_DEPTH: u16 = 32;

/// The default upper bound on the size of the decompressed table data.
pub const DEFAULT_MAX_DECOMPRESSED_SIZE: usize = 256 * 1024 * 1024;

/// Configuration settings for decoding a WOFF2 font.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecodeOptions {
    /// The maximum nesting depth of composite glyphs.
    ///
    /// A composite that references another composite counts as one level.
    /// Defaults to [`DEFAULT_MAX_COMPONENT_DEPTH`].
    pub max_component_depth: u16,
    /// How the length of the bounding box bitmap is computed.
    ///
    /// Defaults to [`BboxBitmapLayout::Auto`].
    pub bbox_bitmap: BboxBitmapLayout,
    /// The maximum number of bytes the Brotli block may decompress to.
    ///
    /// The header's `totalSfntSize` is also an upper bound; whichever is
    /// smaller applies.
    pub max_decompressed_size: usize,
}

/// The padding of the bounding box bitmap in a transformed `glyf` table.
///
/// The WOFF2 recommendation describes a bitmap padded to a multiple of four
/// bytes, while some decoders read a tightly packed one. Fonts produced by
/// different encoders use both.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BboxBitmapLayout {
    /// `ceil(num_glyphs / 8)` bytes.
    Packed,
    /// `4 * floor((num_glyphs + 31) / 32)` bytes.
    WordAligned,
    /// Choose the layout whose remaining bytes hold exactly one box per set
    /// bit, preferring [`Packed`](Self::Packed).
    #[default]
    Auto,
}

impl BboxBitmapLayout {
    /// The bitmap length in bytes for the given number of glyphs, or `None`
    /// for [`Auto`](Self::Auto).
    pub fn bitmap_len(self, num_glyphs: u16) -> Option<usize> {
        let num_glyphs = num_glyphs as usize;
        match self {
            Self::Packed => Some(num_glyphs.div_ceil(8)),
            Self::WordAligned => Some(4 * ((num_glyphs + 31) / 32)),
            Self::Auto => None,
        }
    }
}

impl DecodeOptions {
    pub fn with_max_component_depth(mut self, depth: u16) -> Self {
        self.max_component_depth = depth;
        self
    }

    pub fn with_bbox_bitmap(mut self, layout: BboxBitmapLayout) -> Self {
        self.bbox_bitmap = layout;
        self
    }

    pub fn with_max_decompressed_size(mut self, size: usize) -> Self {
        self.max_decompressed_size = size;
        self
    }
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_component_depth: DEFAULT_MAX_COMPONENT_DEPTH,
            bbox_bitmap: BboxBitmapLayout::default(),
            max_decompressed_size: DEFAULT_MAX_DECOMPRESSED_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitmap_lengths() {
        assert_eq!(BboxBitmapLayout::Packed.bitmap_len(0), Some(0));
        assert_eq!(BboxBitmapLayout::Packed.bitmap_len(3), Some(1));
        assert_eq!(BboxBitmapLayout::Packed.bitmap_len(9), Some(2));
        assert_eq!(BboxBitmapLayout::WordAligned.bitmap_len(3), Some(4));
        assert_eq!(BboxBitmapLayout::WordAligned.bitmap_len(32), Some(4));
        assert_eq!(BboxBitmapLayout::WordAligned.bitmap_len(33), Some(8));
        assert_eq!(BboxBitmapLayout::Auto.bitmap_len(33), None);
    }

    #[test]
    fn builder() {
        let options = DecodeOptions::default()
            .with_max_component_depth(4)
            .with_bbox_bitmap(BboxBitmapLayout::WordAligned);
        assert_eq!(options.max_component_depth, 4);
        assert_eq!(options.bbox_bitmap, BboxBitmapLayout::WordAligned);
        assert_eq!(
            options.max_decompressed_size,
            DEFAULT_MAX_DECOMPRESSED_SIZE
        );
    }
}
