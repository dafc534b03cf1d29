//! Reconstructed glyphs.

use std::ops::Index;

use types::BoundingBox;

use crate::ReadError;

/// The bounding box of a glyph, in font units.
pub type Bounds = BoundingBox<i16>;

/// A point in a glyph outline.
///
/// Coordinates are wider than the `i16` of a `glyf` table because the
/// accumulated deltas of a transformed glyph are not range checked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CurvePoint {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// True if this is an on-curve point.
    pub on_curve: bool,
}

impl CurvePoint {
    /// Construct a new `CurvePoint`
    pub fn new(x: i32, y: i32, on_curve: bool) -> Self {
        Self { x, y, on_curve }
    }

    /// Convenience method to construct an on-curve point
    pub fn on_curve(x: i32, y: i32) -> Self {
        Self::new(x, y, true)
    }

    /// Convenience method to construct an off-curve point
    pub fn off_curve(x: i32, y: i32) -> Self {
        Self::new(x, y, false)
    }
}

/// TrueType outline data: points, contour ends and hinting instructions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Outline {
    pub points: Vec<CurvePoint>,
    /// The index of the last point of each contour.
    pub end_points: Vec<u16>,
    pub instructions: Option<Vec<u8>>,
}

impl Outline {
    pub fn num_contours(&self) -> usize {
        self.end_points.len()
    }

    /// Iterate over the contours as slices of points.
    pub fn contours(&self) -> impl Iterator<Item = &[CurvePoint]> + '_ {
        let mut start = 0;
        self.end_points.iter().filter_map(move |end| {
            let end = *end as usize + 1;
            let contour = self.points.get(start..end)?;
            start = end;
            Some(contour)
        })
    }

    /// The min/max of the points, or `None` if there are none.
    pub fn compute_bounds(&self) -> Option<Bounds> {
        let first = self.points.first()?;
        let (mut x_min, mut y_min, mut x_max, mut y_max) = (first.x, first.y, first.x, first.y);
        for point in &self.points[1..] {
            x_min = x_min.min(point.x);
            y_min = y_min.min(point.y);
            x_max = x_max.max(point.x);
            y_max = y_max.max(point.y);
        }
        Some(Bounds {
            x_min: saturate(x_min),
            y_min: saturate(y_min),
            x_max: saturate(x_max),
            y_max: saturate(y_max),
        })
    }
}

/// Outline data for a glyph in a `CFF ` table.
///
/// The charstring is carried as-is; it is not interpreted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CffGlyph {
    pub name: Option<String>,
    pub charstring: Vec<u8>,
}

/// The location of an embedded bitmap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BitmapGlyph {
    /// Offset of the image data in its containing table.
    pub stream_offset: u32,
    pub stream_len: u32,
    pub image_format: u16,
}

/// The kind of data a glyph carries.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GlyphKind {
    /// A TrueType outline.
    Outline(Outline),
    /// A PostScript outline from a `CFF ` table.
    CompactFontOutline(CffGlyph),
    /// An embedded bitmap.
    Bitmap(BitmapGlyph),
    /// Only the fields needed for layout; no drawing data.
    LayoutOnly,
}

/// Glyph class, as defined in the `GDEF` table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GlyphClass {
    #[default]
    Unclassified,
    Base,
    Ligature,
    Mark,
    Component,
}

impl GlyphClass {
    /// The class for a `GDEF` glyph class value.
    ///
    /// Unknown values map to [`GlyphClass::Unclassified`].
    pub fn new(raw: u16) -> Self {
        match raw {
            1 => Self::Base,
            2 => Self::Ligature,
            3 => Self::Mark,
            4 => Self::Component,
            _ => Self::Unclassified,
        }
    }
}

/// A single glyph.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Glyph {
    glyph_id: u16,
    bounds: Bounds,
    class: GlyphClass,
    advance_width: Option<u16>,
    kind: GlyphKind,
}

impl Glyph {
    pub fn new(glyph_id: u16, bounds: Bounds, kind: GlyphKind) -> Self {
        Self {
            glyph_id,
            bounds,
            class: GlyphClass::default(),
            advance_width: None,
            kind,
        }
    }

    /// A glyph with an empty outline.
    pub fn empty(glyph_id: u16) -> Self {
        Self::new(
            glyph_id,
            Bounds::default(),
            GlyphKind::Outline(Outline::default()),
        )
    }

    /// A TrueType outline glyph whose bounds are computed from its points.
    pub fn from_outline(glyph_id: u16, outline: Outline) -> Self {
        let bounds = outline.compute_bounds().unwrap_or_default();
        Self::new(glyph_id, bounds, GlyphKind::Outline(outline))
    }

    pub fn glyph_id(&self) -> u16 {
        self.glyph_id
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn class(&self) -> GlyphClass {
        self.class
    }

    pub fn advance_width(&self) -> Option<u16> {
        self.advance_width
    }

    pub fn kind(&self) -> &GlyphKind {
        &self.kind
    }

    /// The TrueType outline, if this is an outline glyph.
    pub fn outline(&self) -> Option<&Outline> {
        match &self.kind {
            GlyphKind::Outline(outline) => Some(outline),
            _ => None,
        }
    }

    /// The points of a TrueType outline; empty for other kinds.
    pub fn points(&self) -> &[CurvePoint] {
        self.outline().map(|o| o.points.as_slice()).unwrap_or_default()
    }

    /// The contour end points of a TrueType outline; empty for other kinds.
    pub fn end_points(&self) -> &[u16] {
        self.outline()
            .map(|o| o.end_points.as_slice())
            .unwrap_or_default()
    }

    pub fn instructions(&self) -> Option<&[u8]> {
        self.outline()?.instructions.as_deref()
    }

    pub fn with_class(mut self, class: GlyphClass) -> Self {
        self.class = class;
        self
    }

    pub fn with_advance_width(mut self, advance: u16) -> Self {
        self.advance_width = Some(advance);
        self
    }

    /// A copy of this glyph with its drawing data removed.
    pub fn to_layout_only(&self) -> Glyph {
        Glyph {
            kind: GlyphKind::LayoutOnly,
            ..self.clone()
        }
    }

    pub(crate) fn set_bounds(&mut self, bounds: Bounds) {
        self.bounds = bounds;
    }

    pub(crate) fn set_instructions(&mut self, instructions: Vec<u8>) {
        if let GlyphKind::Outline(outline) = &mut self.kind {
            outline.instructions = Some(instructions);
        }
    }

    /// A copy of the outline geometry under a new glyph id, without
    /// instructions.
    pub(crate) fn clone_geometry(&self, glyph_id: u16) -> Glyph {
        let outline = self
            .outline()
            .map(|outline| Outline {
                points: outline.points.clone(),
                end_points: outline.end_points.clone(),
                instructions: None,
            })
            .unwrap_or_default();
        Glyph::new(glyph_id, self.bounds, GlyphKind::Outline(outline))
    }

    /// Move every point, and the bounds, by `(dx, dy)`.
    pub(crate) fn translate(&mut self, dx: i32, dy: i32) {
        if dx == 0 && dy == 0 {
            return;
        }
        if let GlyphKind::Outline(outline) = &mut self.kind {
            for point in outline.points.iter_mut() {
                point.x = point.x.wrapping_add(dx);
                point.y = point.y.wrapping_add(dy);
            }
        }
        let b = self.bounds;
        self.bounds = Bounds {
            x_min: saturate(b.x_min as i32 + dx),
            y_min: saturate(b.y_min as i32 + dy),
            x_max: saturate(b.x_max as i32 + dx),
            y_max: saturate(b.y_max as i32 + dy),
        };
    }

    /// Apply a 2x2 linear transform to every point.
    ///
    /// `x' = round(x * xx + y * xy)`, `y' = round(x * yx + y * yy)`. The
    /// bounds are recomputed from the transformed points.
    pub(crate) fn apply_matrix(&mut self, [xx, yx, xy, yy]: [f32; 4]) {
        let GlyphKind::Outline(outline) = &mut self.kind else {
            return;
        };
        for point in outline.points.iter_mut() {
            let (x, y) = (point.x as f32, point.y as f32);
            point.x = (x * xx + y * xy).round() as i32;
            point.y = (x * yx + y * yy).round() as i32;
        }
        if let Some(bounds) = outline.compute_bounds() {
            self.bounds = bounds;
        }
    }

    /// Append the outline of `other`, renumbering its contours.
    ///
    /// The bounds become the union of both; a component with no points does
    /// not contribute to the bounds. Fails if the merged outline would have
    /// more points than a contour end point can index.
    pub(crate) fn append(&mut self, other: Glyph) -> Result<(), ReadError> {
        let other_bounds = other.bounds;
        let GlyphKind::Outline(other) = other.kind else {
            return Ok(());
        };
        let GlyphKind::Outline(outline) = &mut self.kind else {
            return Ok(());
        };
        if other.points.is_empty() {
            return Ok(());
        }
        let base = u16::try_from(outline.points.len())
            .ok()
            .filter(|base| *base as usize + other.points.len() <= u16::MAX as usize + 1)
            .ok_or(ReadError::MalformedData("too many points in composite glyph"))?;
        if outline.points.is_empty() {
            self.bounds = other_bounds;
        } else {
            self.bounds = union(self.bounds, other_bounds);
        }
        outline
            .end_points
            .extend(other.end_points.iter().map(|end| end + base));
        outline.points.extend(other.points);
        Ok(())
    }
}

fn union(a: Bounds, b: Bounds) -> Bounds {
    Bounds {
        x_min: a.x_min.min(b.x_min),
        y_min: a.y_min.min(b.y_min),
        x_max: a.x_max.max(b.x_max),
        y_max: a.y_max.max(b.y_max),
    }
}

fn saturate(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// The reconstructed glyphs of a font, in glyph id order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GlyphTable {
    glyphs: Vec<Glyph>,
    index_format: u16,
}

impl GlyphTable {
    pub fn new(glyphs: Vec<Glyph>, index_format: u16) -> Self {
        Self {
            glyphs,
            index_format,
        }
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn get(&self, glyph_id: u16) -> Option<&Glyph> {
        self.glyphs.get(glyph_id as usize)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Glyph> {
        self.glyphs.iter()
    }

    /// The `loca` offset format declared by the transformed table.
    ///
    /// 0 for short offsets, 1 for long.
    pub fn index_format(&self) -> u16 {
        self.index_format
    }

    pub fn into_glyphs(self) -> Vec<Glyph> {
        self.glyphs
    }
}

impl Index<u16> for GlyphTable {
    type Output = Glyph;

    fn index(&self, glyph_id: u16) -> &Self::Output {
        &self.glyphs[glyph_id as usize]
    }
}

impl<'a> IntoIterator for &'a GlyphTable {
    type Item = &'a Glyph;
    type IntoIter = std::slice::Iter<'a, Glyph>;

    fn into_iter(self) -> Self::IntoIter {
        self.glyphs.iter()
    }
}
