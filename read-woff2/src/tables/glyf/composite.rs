//! Composite glyphs
//!
//! The composite stream holds the component records of every composite
//! glyph, back to back, in the format of the `glyf` table. A component may
//! reference a glyph with a higher index, including another composite, so
//! composites are resolved on demand rather than in stream order.

use std::ops::{BitOr, BitOrAssign};

use types::F2Dot14;

use super::{check_consumed, read_error, DecodeError, GlyphDescriptor, Stream};
use crate::glyph::Glyph;
use crate::{Cursor, FontData, ReadError};

/// Flags for a composite glyph component.
///
/// See <https://learn.microsoft.com/en-us/typography/opentype/spec/glyf#composite-glyph-description>
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompositeGlyphFlags(u16);

impl CompositeGlyphFlags {
    /// The arguments are 16-bit; otherwise they are bytes.
    pub const ARG_1_AND_2_ARE_WORDS: Self = Self(0x0001);
    /// The arguments are an x/y offset; otherwise they are point numbers.
    pub const ARGS_ARE_XY_VALUES: Self = Self(0x0002);
    /// Round the offset to the grid. Has no effect here.
    pub const ROUND_XY_TO_GRID: Self = Self(0x0004);
    /// There is a single scale for both axes.
    pub const WE_HAVE_A_SCALE: Self = Self(0x0008);
    /// Another component follows this one.
    pub const MORE_COMPONENTS: Self = Self(0x0020);
    /// There are separate x and y scales.
    pub const WE_HAVE_AN_X_AND_Y_SCALE: Self = Self(0x0040);
    /// There is a 2x2 transformation matrix.
    pub const WE_HAVE_A_TWO_BY_TWO: Self = Self(0x0080);
    /// Instructions follow the last component.
    pub const WE_HAVE_INSTRUCTIONS: Self = Self(0x0100);
    /// Use this component's metrics for the composite.
    pub const USE_MY_METRICS: Self = Self(0x0200);
    /// The components of the composite overlap.
    pub const OVERLAP_COMPOUND: Self = Self(0x0400);
    /// The offset is scaled by the component transform.
    pub const SCALED_COMPONENT_OFFSET: Self = Self(0x0800);
    /// The offset is not scaled by the component transform.
    pub const UNSCALED_COMPONENT_OFFSET: Self = Self(0x1000);

    /// Return new, empty flags
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Returns `true` if all of the flags in `other` are contained within `self`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl BitOr for CompositeGlyphFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for CompositeGlyphFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0
    }
}

/// Transformation matrix for a composite component.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Transform {
    /// X scale factor.
    pub xx: F2Dot14,
    /// YX skew factor.
    pub yx: F2Dot14,
    /// XY skew factor.
    pub xy: F2Dot14,
    /// Y scale factor.
    pub yy: F2Dot14,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            xx: F2Dot14::from_f32(1.0),
            yx: F2Dot14::from_f32(0.0),
            xy: F2Dot14::from_f32(0.0),
            yy: F2Dot14::from_f32(1.0),
        }
    }
}

impl Transform {
    /// The matrix as `[xx, yx, xy, yy]`.
    pub fn to_f32(&self) -> [f32; 4] {
        [
            self.xx.to_f32(),
            self.yx.to_f32(),
            self.xy.to_f32(),
            self.yy.to_f32(),
        ]
    }
}

/// Anchor position for a composite component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Offset { x: i16, y: i16 },
    Point { base: u16, component: u16 },
}

/// A reference to another glyph, from a composite glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Component {
    /// Component flags.
    pub flags: CompositeGlyphFlags,
    /// Glyph identifier.
    pub glyph: u16,
    /// Anchor for component placement.
    pub anchor: Anchor,
    /// Component transformation matrix.
    pub transform: Transform,
}

impl Component {
    /// Read one component record.
    pub fn read(cursor: &mut Cursor) -> Result<Self, ReadError> {
        let flags = CompositeGlyphFlags::from_bits(cursor.read()?);
        let glyph = cursor.read::<u16>()?;
        let args_are_words = flags.contains(CompositeGlyphFlags::ARG_1_AND_2_ARE_WORDS);
        let args_are_xy_values = flags.contains(CompositeGlyphFlags::ARGS_ARE_XY_VALUES);
        let anchor = match (args_are_xy_values, args_are_words) {
            (true, true) => Anchor::Offset {
                x: cursor.read()?,
                y: cursor.read()?,
            },
            (true, false) => Anchor::Offset {
                x: cursor.read::<i8>()? as _,
                y: cursor.read::<i8>()? as _,
            },
            (false, true) => Anchor::Point {
                base: cursor.read()?,
                component: cursor.read()?,
            },
            (false, false) => Anchor::Point {
                base: cursor.read::<u8>()? as _,
                component: cursor.read::<u8>()? as _,
            },
        };
        let mut transform = Transform::default();
        if flags.contains(CompositeGlyphFlags::WE_HAVE_A_SCALE) {
            transform.xx = cursor.read()?;
            transform.yy = transform.xx;
        } else if flags.contains(CompositeGlyphFlags::WE_HAVE_AN_X_AND_Y_SCALE) {
            transform.xx = cursor.read()?;
            transform.yy = cursor.read()?;
        } else if flags.contains(CompositeGlyphFlags::WE_HAVE_A_TWO_BY_TWO) {
            transform.xx = cursor.read()?;
            transform.yx = cursor.read()?;
            transform.xy = cursor.read()?;
            transform.yy = cursor.read()?;
        }
        Ok(Component {
            flags,
            glyph,
            anchor,
            transform,
        })
    }

    pub fn has_more_components(&self) -> bool {
        self.flags.contains(CompositeGlyphFlags::MORE_COMPONENTS)
    }

    /// Transform and position a copy of the referenced glyph.
    ///
    /// A 2x2 matrix is applied and the bounds are taken from the
    /// transformed points; otherwise a scale is applied unless it is the
    /// identity. The offset is applied last. Point-matched anchors leave the
    /// component at its own origin.
    fn place(&self, glyph: &mut Glyph, composite_id: u16) {
        let flags = self.flags;
        if flags.contains(CompositeGlyphFlags::WE_HAVE_A_SCALE)
            || flags.contains(CompositeGlyphFlags::WE_HAVE_AN_X_AND_Y_SCALE)
        {
            let [xx, _, _, yy] = self.transform.to_f32();
            if xx != 1.0 || yy != 1.0 {
                glyph.apply_matrix([xx, 0.0, 0.0, yy]);
            }
        } else if flags.contains(CompositeGlyphFlags::WE_HAVE_A_TWO_BY_TWO) {
            glyph.apply_matrix(self.transform.to_f32());
        }
        match self.anchor {
            Anchor::Offset { x, y } => glyph.translate(x as i32, y as i32),
            Anchor::Point { base, component } => log::warn!(
                "glyph {composite_id}: point matching (base {base}, component {component}) \
                 is not supported; component {} is placed at its origin",
                self.glyph
            ),
        }
    }
}

/// Walk the composite stream once, recording where each composite starts
/// and whether its last component announces instructions.
pub(super) fn scan_composites(
    data: FontData,
    descriptors: &mut [GlyphDescriptor],
) -> Result<(), DecodeError> {
    let mut cursor = data.cursor();
    for (gid, desc) in descriptors.iter_mut().enumerate() {
        if !desc.is_composite() {
            continue;
        }
        let gid = gid as u16;
        desc.composite_offset = cursor
            .position()
            .map_err(read_error(Stream::Composite, gid))?;
        loop {
            let component =
                Component::read(&mut cursor).map_err(read_error(Stream::Composite, gid))?;
            desc.has_instructions = component
                .flags
                .contains(CompositeGlyphFlags::WE_HAVE_INSTRUCTIONS);
            if !component.has_more_components() {
                break;
            }
        }
    }
    check_consumed(&cursor, Stream::Composite, data.len())
}

enum Slot {
    Unresolved,
    /// On the current resolution path; seeing it again means a cycle.
    Pending,
    /// A finished glyph and the number of composite levels below it.
    Resolved(Glyph, u16),
}

/// Builds composite glyphs from their components.
///
/// Every glyph has a slot. Simple and empty glyphs start out resolved;
/// composites are resolved depth first, each reading its components with
/// its own cursor at the offset recorded by [`scan_composites`].
pub(super) struct Resolver<'a, 'b> {
    data: FontData<'a>,
    descriptors: &'b [GlyphDescriptor],
    slots: Vec<Slot>,
    max_depth: u16,
}

impl<'a, 'b> Resolver<'a, 'b> {
    /// `glyphs` holds the decoded simple glyphs, with `None` for composites.
    pub fn new(
        data: FontData<'a>,
        descriptors: &'b [GlyphDescriptor],
        glyphs: Vec<Option<Glyph>>,
        max_depth: u16,
    ) -> Self {
        let slots = glyphs
            .into_iter()
            .map(|glyph| match glyph {
                Some(glyph) => Slot::Resolved(glyph, 0),
                None => Slot::Unresolved,
            })
            .collect();
        Self {
            data,
            descriptors,
            slots,
            max_depth,
        }
    }

    /// Resolve every composite in glyph id order and return all glyphs.
    pub fn resolve_all(mut self) -> Result<Vec<Glyph>, DecodeError> {
        for gid in 0..self.slots.len() {
            self.resolve(gid as u16, 0)?;
        }
        self.slots
            .into_iter()
            .enumerate()
            .map(|(gid, slot)| match slot {
                Slot::Resolved(glyph, _) => Ok(glyph),
                _ => Err(DecodeError::UnresolvableReference {
                    glyph: gid as u16,
                    component: gid as u16,
                }),
            })
            .collect()
    }

    fn resolve(&mut self, glyph_id: u16, depth: u16) -> Result<(), DecodeError> {
        if !matches!(self.slots[glyph_id as usize], Slot::Unresolved) {
            return Ok(());
        }
        if depth > self.max_depth {
            return Err(DecodeError::RecursionLimitExceeded { glyph: glyph_id });
        }
        self.slots[glyph_id as usize] = Slot::Pending;
        let offset = self.descriptors[glyph_id as usize].composite_offset;
        let mut cursor = self.data.cursor_at(offset);
        let mut result: Option<Glyph> = None;
        let mut height = 0u16;
        loop {
            let component =
                Component::read(&mut cursor).map_err(read_error(Stream::Composite, glyph_id))?;
            log::trace!(
                "glyph {glyph_id}: component {} flags {:#06x} anchor {:?}",
                component.glyph,
                component.flags.bits(),
                component.anchor
            );
            let unresolvable = DecodeError::UnresolvableReference {
                glyph: glyph_id,
                component: component.glyph,
            };
            let needs_resolve = match self.slots.get(component.glyph as usize) {
                None | Some(Slot::Pending) => return Err(unresolvable),
                Some(Slot::Unresolved) => true,
                Some(Slot::Resolved(..)) => false,
            };
            if needs_resolve {
                self.resolve(component.glyph, depth + 1)?;
            }
            let Some(Slot::Resolved(source, source_height)) =
                self.slots.get(component.glyph as usize)
            else {
                return Err(unresolvable);
            };
            // a composite resolved earlier still counts its own levels
            if *source_height > 0 && depth.saturating_add(*source_height) > self.max_depth {
                return Err(DecodeError::RecursionLimitExceeded {
                    glyph: component.glyph,
                });
            }
            height = height.max(source_height.saturating_add(1));
            let mut placed = source.clone_geometry(glyph_id);
            component.place(&mut placed, glyph_id);
            match result.as_mut() {
                Some(result) => result
                    .append(placed)
                    .map_err(read_error(Stream::Composite, glyph_id))?,
                None => result = Some(placed),
            }
            if !component.has_more_components() {
                break;
            }
        }
        let glyph = result.unwrap_or_else(|| Glyph::empty(glyph_id));
        self.slots[glyph_id as usize] = Slot::Resolved(glyph, height);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::{Bounds, CurvePoint, Outline};
    use woff2_test_data::glyf::{flags, ComponentRecord};

    fn rect() -> Glyph {
        Glyph::from_outline(
            0,
            Outline {
                points: vec![
                    CurvePoint::on_curve(0, 0),
                    CurvePoint::on_curve(10, 0),
                    CurvePoint::on_curve(10, 10),
                    CurvePoint::on_curve(0, 10),
                ],
                end_points: vec![3],
                instructions: Some(vec![1, 2, 3]),
            },
        )
    }

    fn composite_stream(glyphs: &[&[ComponentRecord]]) -> Vec<u8> {
        let mut out = Vec::new();
        for components in glyphs {
            for (i, component) in components.iter().enumerate() {
                component.encode(i + 1 < components.len(), false, &mut out);
            }
        }
        out
    }

    fn descriptors(contours: &[i16]) -> Vec<GlyphDescriptor> {
        contours
            .iter()
            .map(|n| GlyphDescriptor {
                num_contours: *n,
                ..Default::default()
            })
            .collect()
    }

    /// Scan and resolve; glyph 0 is the rectangle and all others composites.
    fn resolve(
        composites: &[&[ComponentRecord]],
        max_depth: u16,
    ) -> Result<Vec<Glyph>, DecodeError> {
        let stream = composite_stream(composites);
        let data = FontData::new(&stream);
        let mut contours = vec![1i16];
        contours.extend(std::iter::repeat(-1).take(composites.len()));
        let mut descriptors = descriptors(&contours);
        scan_composites(data, &mut descriptors)?;
        let mut glyphs = vec![Some(rect())];
        glyphs.extend(std::iter::repeat(None).take(composites.len()));
        Resolver::new(data, &descriptors, glyphs, max_depth).resolve_all()
    }

    fn bounds(x_min: i16, y_min: i16, x_max: i16, y_max: i16) -> Bounds {
        Bounds {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    #[test]
    fn read_component_variants() {
        let mut stream = Vec::new();
        ComponentRecord::offset(5, -3, 4).encode(true, false, &mut stream);
        ComponentRecord::point(6, 300, 2)
            .matrix([0.5, 0.25, -0.25, 0.5])
            .encode(false, true, &mut stream);
        let data = FontData::new(&stream);
        let mut cursor = data.cursor();
        let first = Component::read(&mut cursor).unwrap();
        assert_eq!(first.glyph, 5);
        assert_eq!(first.anchor, Anchor::Offset { x: -3, y: 4 });
        assert_eq!(first.transform, Transform::default());
        assert!(first.has_more_components());
        let second = Component::read(&mut cursor).unwrap();
        assert_eq!(
            second.anchor,
            Anchor::Point {
                base: 300,
                component: 2
            }
        );
        assert_eq!(second.transform.to_f32(), [0.5, 0.25, -0.25, 0.5]);
        assert!(second
            .flags
            .contains(CompositeGlyphFlags::WE_HAVE_INSTRUCTIONS));
        assert!(!second.has_more_components());
        assert!(cursor.is_finished());
    }

    #[test]
    fn truncated_component() {
        let mut stream = Vec::new();
        ComponentRecord::offset(1, 1, 1)
            .scale(2.0)
            .encode(false, false, &mut stream);
        let data = FontData::new(&stream[..stream.len() - 1]);
        assert!(matches!(
            Component::read(&mut data.cursor()),
            Err(ReadError::OutOfBounds)
        ));
    }

    #[test]
    fn scan_records_offsets_and_instructions() {
        let mut stream = Vec::new();
        ComponentRecord::offset(0, 1, 1).encode(false, false, &mut stream);
        let second_offset = stream.len();
        ComponentRecord::offset(0, 1, 1).encode(true, false, &mut stream);
        ComponentRecord::offset(0, 2, 2).encode(false, true, &mut stream);
        let data = FontData::new(&stream);
        let mut descriptors = descriptors(&[-1, 0, 2, -1]);
        scan_composites(data, &mut descriptors).unwrap();
        assert_eq!(descriptors[0].composite_offset, 0);
        assert!(!descriptors[0].has_instructions);
        assert_eq!(descriptors[3].composite_offset, second_offset);
        assert!(descriptors[3].has_instructions);
    }

    #[test]
    fn scan_rejects_trailing_bytes() {
        let mut stream = Vec::new();
        ComponentRecord::offset(0, 1, 1).encode(false, false, &mut stream);
        stream.push(0);
        let mut descriptors = descriptors(&[-1]);
        let err = scan_composites(FontData::new(&stream), &mut descriptors).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::StreamSizeMismatch {
                stream: Stream::Composite,
                expected: 7,
                actual: 6,
            }
        ));
    }

    #[test]
    fn rectangle_and_offset_copy() {
        let glyphs = resolve(
            &[&[
                ComponentRecord::offset(0, 0, 0),
                ComponentRecord::offset(0, 20, 0),
            ]],
            32,
        )
        .unwrap();
        let composite = &glyphs[1];
        assert_eq!(composite.glyph_id(), 1);
        assert_eq!(composite.points().len(), 8);
        assert_eq!(composite.end_points(), &[3, 7]);
        assert_eq!(composite.bounds(), bounds(0, 0, 30, 10));
        assert_eq!(composite.points()[4], CurvePoint::on_curve(20, 0));
        // component instructions are not copied
        assert!(composite.instructions().is_none());
        // the source glyph is untouched
        assert_eq!(glyphs[0].bounds(), bounds(0, 0, 10, 10));
    }

    #[test]
    fn forward_reference() {
        // glyph 1 uses glyph 2, which is only defined later in the stream
        let glyphs = resolve(
            &[
                &[ComponentRecord::offset(2, 100, 0)],
                &[ComponentRecord::offset(0, 0, 5)],
            ],
            32,
        )
        .unwrap();
        assert_eq!(glyphs[2].bounds(), bounds(0, 5, 10, 15));
        assert_eq!(glyphs[1].bounds(), bounds(100, 5, 110, 15));
        assert_eq!(glyphs[1].points()[0], CurvePoint::on_curve(100, 5));
    }

    #[test]
    fn scale_and_matrix() {
        let glyphs = resolve(
            &[
                &[ComponentRecord::offset(0, 1, 1).scale(1.5)],
                &[ComponentRecord::offset(0, 0, 0).xy_scale(1.0, 1.0)],
                // 90 degree rotation, then offset
                &[ComponentRecord::offset(0, 50, 0).matrix([0.0, 1.0, -1.0, 0.0])],
                &[ComponentRecord::offset(0, 0, 0).xy_scale(-1.0, 0.5)],
            ],
            32,
        )
        .unwrap();
        assert_eq!(glyphs[1].bounds(), bounds(1, 1, 16, 16));
        assert_eq!(glyphs[2].points(), glyphs[0].points());
        assert_eq!(glyphs[3].bounds(), bounds(40, 0, 50, 10));
        assert_eq!(glyphs[3].points()[1], CurvePoint::on_curve(50, 10));
        assert_eq!(glyphs[4].bounds(), bounds(-10, 0, 0, 5));
    }

    #[test]
    fn byte_offsets_are_signed() {
        let glyphs = resolve(&[&[ComponentRecord::offset(0, -5, -128)]], 32).unwrap();
        assert_eq!(glyphs[1].bounds(), bounds(-5, -128, 5, -118));
    }

    #[test]
    fn point_anchors_stay_at_origin() {
        let glyphs = resolve(
            &[&[ComponentRecord::point(0, 1, 2).flags(flags::ROUND_XY_TO_GRID)]],
            32,
        )
        .unwrap();
        assert_eq!(glyphs[1].points(), glyphs[0].points());
    }

    #[test]
    fn invalid_component_index() {
        let err = resolve(&[&[ComponentRecord::offset(7, 0, 0)]], 32).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::UnresolvableReference {
                glyph: 1,
                component: 7
            }
        ));
    }

    #[test]
    fn cycles_are_errors() {
        let err = resolve(
            &[
                &[ComponentRecord::offset(2, 0, 0)],
                &[ComponentRecord::offset(1, 0, 0)],
            ],
            32,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::UnresolvableReference {
                glyph: 2,
                component: 1
            }
        ));
        let err = resolve(&[&[ComponentRecord::offset(1, 0, 0)]], 32).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::UnresolvableReference {
                glyph: 1,
                component: 1
            }
        ));
    }

    #[test]
    fn depth_limit() {
        // 1 -> 2 -> 3 -> 0
        let chain: [&[ComponentRecord]; 3] = [
            &[ComponentRecord::offset(2, 0, 0)],
            &[ComponentRecord::offset(3, 0, 0)],
            &[ComponentRecord::offset(0, 0, 0)],
        ];
        assert!(resolve(&chain, 2).is_ok());
        let err = resolve(&chain, 1).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::RecursionLimitExceeded { glyph: 3 }
        ));
    }

    #[test]
    fn depth_limit_ignores_glyph_order() {
        // 3 -> 2 -> 1 -> 0; each composite is resolved before its parent
        let chain: [&[ComponentRecord]; 3] = [
            &[ComponentRecord::offset(0, 0, 0)],
            &[ComponentRecord::offset(1, 0, 0)],
            &[ComponentRecord::offset(2, 0, 0)],
        ];
        let glyphs = resolve(&chain, 2).unwrap();
        assert_eq!(glyphs[3].bounds(), bounds(0, 0, 10, 10));
        assert!(matches!(
            resolve(&chain, 1).unwrap_err(),
            DecodeError::RecursionLimitExceeded { glyph: 2 }
        ));
        assert!(matches!(
            resolve(&chain, 0).unwrap_err(),
            DecodeError::RecursionLimitExceeded { glyph: 1 }
        ));
    }

    #[test]
    fn merged_point_count_is_limited() {
        // 0x4000 copies of the four point rectangle fill every point index
        let fits = vec![ComponentRecord::offset(0, 0, 0); 0x4000];
        let glyphs = resolve(&[fits.as_slice()], 32).unwrap();
        assert_eq!(glyphs[1].points().len(), 0x10000);
        assert_eq!(glyphs[1].end_points().last(), Some(&u16::MAX));

        let too_many = vec![ComponentRecord::offset(0, 0, 0); 0x4001];
        assert!(matches!(
            resolve(&[too_many.as_slice()], 32).unwrap_err(),
            DecodeError::Read {
                stream: Stream::Composite,
                glyph: Some(1),
                error: ReadError::MalformedData(_),
            }
        ));
    }
}
