//! Simple glyph outlines.

use super::triplet::{is_on_curve, TripletEncoding};
use super::{read_error, DecodeError, Stream};
use crate::glyph::{CurvePoint, Outline};
use crate::{Cursor, ReadError};

/// Decode the points of one simple glyph.
///
/// `point_counts` holds the number of points in each contour. One flag is
/// read per point, followed by that point's coordinate bytes from the glyph
/// stream. Coordinates are stored as deltas from the previous point,
/// starting at the origin.
pub(super) fn read_outline(
    glyph_id: u16,
    point_counts: &[u16],
    flags: &mut Cursor,
    glyph_stream: &mut Cursor,
) -> Result<Outline, DecodeError> {
    let num_points: usize = point_counts.iter().map(|n| *n as usize).sum();
    // contour end points are u16
    if num_points > u16::MAX as usize + 1 {
        return Err(DecodeError::Read {
            stream: Stream::NPoints,
            glyph: Some(glyph_id),
            error: ReadError::MalformedData("too many points in glyph"),
        });
    }
    if num_points > flags.remaining_bytes() {
        return Err(DecodeError::Read {
            stream: Stream::Flag,
            glyph: Some(glyph_id),
            error: ReadError::OutOfBounds,
        });
    }
    let mut points = Vec::with_capacity(num_points);
    let mut end_points = Vec::with_capacity(point_counts.len());
    let (mut x, mut y) = (0i32, 0i32);
    for count in point_counts {
        for _ in 0..*count {
            let flag = flags.read_u8().map_err(read_error(Stream::Flag, glyph_id))?;
            let encoding = TripletEncoding::for_flag(flag);
            let data = glyph_stream
                .read_bytes(encoding.data_len())
                .map_err(read_error(Stream::Glyph, glyph_id))?;
            let (dx, dy) = encoding
                .decode(data)
                .ok_or(DecodeError::UnsupportedFormatCode {
                    glyph: glyph_id,
                    code: flag,
                })?;
            x = x.wrapping_add(dx);
            y = y.wrapping_add(dy);
            points.push(CurvePoint::new(x, y, is_on_curve(flag)));
        }
        let end_point = points.len().checked_sub(1).ok_or(DecodeError::Read {
            stream: Stream::NPoints,
            glyph: Some(glyph_id),
            error: ReadError::MalformedData("leading contour has no points"),
        })?;
        end_points.push(end_point as u16);
    }
    Ok(Outline {
        points,
        end_points,
        instructions: None,
    })
}
