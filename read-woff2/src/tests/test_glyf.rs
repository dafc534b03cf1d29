use pretty_assertions::assert_eq;
use woff2_test_data::glyf::{
    assemble_table, triangle_and_composite, ComponentRecord, TransformedGlyfBuilder,
};

use super::init_logging;
use crate::tables::glyf::{DecodeError, Stream, TransformedGlyf};
use crate::{BboxBitmapLayout, Bounds, CurvePoint, DecodeOptions, FontData, GlyphTable};

fn decode(table: &[u8]) -> Result<GlyphTable, DecodeError> {
    decode_with(table, DecodeOptions::default())
}

fn decode_with(table: &[u8], options: DecodeOptions) -> Result<GlyphTable, DecodeError> {
    init_logging();
    TransformedGlyf::read(FontData::new(table))?.decode(&options)
}

fn bounds(x_min: i16, y_min: i16, x_max: i16, y_max: i16) -> Bounds {
    Bounds {
        x_min,
        y_min,
        x_max,
        y_max,
    }
}

const RECT: [(i32, i32, bool); 4] = [(0, 0, true), (10, 0, true), (10, 10, true), (0, 10, true)];

#[test]
fn triangle_and_composite_glyphs() {
    let table = triangle_and_composite().build();
    let glyphs = decode(&table).unwrap();
    assert_eq!(glyphs.len(), 3);

    let empty = &glyphs[0];
    assert!(empty.points().is_empty());
    assert!(empty.end_points().is_empty());
    assert_eq!(empty.bounds(), Bounds::default());

    let triangle = &glyphs[1];
    assert_eq!(
        triangle.points(),
        &[
            CurvePoint::on_curve(0, 0),
            CurvePoint::on_curve(100, 0),
            CurvePoint::on_curve(50, 100),
        ]
    );
    assert_eq!(triangle.end_points(), &[2]);
    assert_eq!(triangle.bounds(), bounds(0, 0, 100, 100));
    assert_eq!(triangle.instructions(), None);

    let composite = &glyphs[2];
    assert_eq!(composite.glyph_id(), 2);
    assert_eq!(
        composite.points(),
        &[
            CurvePoint::on_curve(0, 0),
            CurvePoint::on_curve(100, 0),
            CurvePoint::on_curve(50, 100),
            CurvePoint::on_curve(100, 50),
            CurvePoint::on_curve(200, 50),
            CurvePoint::on_curve(150, 150),
        ]
    );
    assert_eq!(composite.end_points(), &[2, 5]);
    assert_eq!(composite.bounds(), bounds(0, 0, 200, 150));
}

#[test]
fn decoding_is_deterministic() {
    let table = triangle_and_composite().build();
    assert_eq!(decode(&table).unwrap(), decode(&table).unwrap());
}

#[test]
fn index_format_is_preserved() {
    let table = triangle_and_composite().index_format(1).build();
    assert_eq!(decode(&table).unwrap().index_format(), 1);
}

#[test]
fn instructions() {
    let table = TransformedGlyfBuilder::new()
        .simple_glyph([RECT])
        .with_instructions(&[0xb0, 0x01, 0x2f])
        .simple_glyph([RECT])
        .composite_glyph([ComponentRecord::offset(0, 5, 5)])
        .with_bbox([0, 0, 15, 15])
        .with_instructions(&[0x40, 0x41])
        .build();
    let glyphs = decode(&table).unwrap();
    assert_eq!(glyphs[0].instructions(), Some(&[0xb0, 0x01, 0x2f][..]));
    assert_eq!(glyphs[1].instructions(), None);
    assert_eq!(glyphs[2].instructions(), Some(&[0x40, 0x41][..]));
    assert_eq!(glyphs[2].points().len(), 4);
}

#[test]
fn explicit_bbox_replaces_computed_bounds() {
    let table = TransformedGlyfBuilder::new()
        .simple_glyph([RECT])
        .with_bbox([-5, -5, 20, 20])
        .simple_glyph([RECT])
        .build();
    let glyphs = decode(&table).unwrap();
    assert_eq!(glyphs[0].bounds(), bounds(-5, -5, 20, 20));
    assert_eq!(glyphs[1].bounds(), bounds(0, 0, 10, 10));
}

#[test]
fn word_aligned_bitmap() {
    let table = triangle_and_composite().word_aligned_bitmap().build();
    let glyphs = decode(&table).unwrap();
    assert_eq!(glyphs[2].bounds(), bounds(0, 0, 200, 150));

    let options = DecodeOptions::default().with_bbox_bitmap(BboxBitmapLayout::WordAligned);
    assert!(decode_with(&table, options).is_ok());

    let options = DecodeOptions::default().with_bbox_bitmap(BboxBitmapLayout::Packed);
    let err = decode_with(&table, options).unwrap_err();
    assert_eq!(err.stream(), Some(Stream::Bbox));
}

#[test]
fn trailing_byte_in_table() {
    let mut table = triangle_and_composite().build();
    table.push(0);
    assert!(matches!(
        decode(&table),
        Err(DecodeError::StreamSizeMismatch {
            stream: Stream::Header,
            ..
        })
    ));
}

#[test]
fn stream_with_unread_bytes() {
    let builder = triangle_and_composite();
    let mut streams = builder.streams();
    streams[0].extend([0, 0]);
    let table = assemble_table(builder.num_glyphs(), 0, &streams);
    assert!(matches!(
        decode(&table),
        Err(DecodeError::StreamSizeMismatch {
            stream: Stream::NContour,
            expected: 8,
            actual: 6,
        })
    ));
}

#[test]
fn missing_composite_bbox() {
    let table = TransformedGlyfBuilder::new()
        .simple_glyph([RECT])
        .composite_glyph([ComponentRecord::offset(0, 0, 0)])
        .build();
    assert!(matches!(
        decode(&table),
        Err(DecodeError::MissingCompositeBbox { glyph: 1 })
    ));
}

#[test]
fn nested_composites() {
    // glyph 1 refers forward to glyph 2, which places the rectangle
    let table = TransformedGlyfBuilder::new()
        .simple_glyph([RECT])
        .composite_glyph([ComponentRecord::offset(2, 5, 5)])
        .with_bbox([105, 5, 115, 15])
        .composite_glyph([ComponentRecord::offset(0, 100, 0)])
        .with_bbox([100, 0, 110, 10])
        .build();
    let glyphs = decode(&table).unwrap();
    assert_eq!(glyphs[2].points()[0], CurvePoint::on_curve(100, 0));
    assert_eq!(glyphs[1].points()[0], CurvePoint::on_curve(105, 5));
    assert_eq!(glyphs[1].points()[2], CurvePoint::on_curve(115, 15));

    let options = DecodeOptions::default().with_max_component_depth(0);
    assert!(matches!(
        decode_with(&table, options),
        Err(DecodeError::RecursionLimitExceeded { glyph: 2 })
    ));
}

#[test]
fn nested_composites_in_index_order() {
    // glyph 2 refers back to glyph 1, which is resolved first
    let table = TransformedGlyfBuilder::new()
        .simple_glyph([RECT])
        .composite_glyph([ComponentRecord::offset(0, 100, 0)])
        .with_bbox([100, 0, 110, 10])
        .composite_glyph([ComponentRecord::offset(1, 5, 5)])
        .with_bbox([105, 5, 115, 15])
        .build();
    let glyphs = decode(&table).unwrap();
    assert_eq!(glyphs[2].points()[0], CurvePoint::on_curve(105, 5));

    let options = DecodeOptions::default().with_max_component_depth(1);
    assert!(decode_with(&table, options).is_ok());
    let options = DecodeOptions::default().with_max_component_depth(0);
    assert!(matches!(
        decode_with(&table, options),
        Err(DecodeError::RecursionLimitExceeded { glyph: 1 })
    ));
}

#[test]
fn composite_cycle() {
    let table = TransformedGlyfBuilder::new()
        .composite_glyph([ComponentRecord::offset(1, 0, 0)])
        .with_bbox([0, 0, 0, 0])
        .composite_glyph([ComponentRecord::offset(0, 0, 0)])
        .with_bbox([0, 0, 0, 0])
        .build();
    let err = decode(&table).unwrap_err();
    assert!(matches!(err, DecodeError::UnresolvableReference { .. }));
    assert!(err.glyph().is_some());
}

#[test]
fn component_out_of_range() {
    let table = TransformedGlyfBuilder::new()
        .composite_glyph([ComponentRecord::offset(9, 0, 0)])
        .with_bbox([0, 0, 0, 0])
        .build();
    assert!(matches!(
        decode(&table),
        Err(DecodeError::UnresolvableReference {
            glyph: 0,
            component: 9
        })
    ));
}

#[test]
fn transformed_components() {
    let table = TransformedGlyfBuilder::new()
        .simple_glyph([RECT])
        .composite_glyph([
            ComponentRecord::offset(0, 0, 0).scale(0.5),
            ComponentRecord::offset(0, 20, 0).matrix([0.0, 1.0, -1.0, 0.0]),
        ])
        .with_bbox([0, 0, 20, 10])
        .build();
    let glyphs = decode(&table).unwrap();
    let points = glyphs[1].points();
    assert_eq!(points.len(), 8);
    assert_eq!(points[2], CurvePoint::on_curve(5, 5));
    // rotated a quarter turn counterclockwise, then moved right
    assert_eq!(points[5], CurvePoint::on_curve(20, 10));
    assert_eq!(points[7], CurvePoint::on_curve(10, 0));
    assert_eq!(glyphs[1].end_points(), &[3, 7]);
}
