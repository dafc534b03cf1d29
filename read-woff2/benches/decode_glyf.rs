use criterion::{black_box, criterion_group, criterion_main, Criterion};
use read_woff2::tables::glyf::TransformedGlyf;
use read_woff2::{DecodeOptions, FontData};
use woff2_test_data::glyf::{ComponentRecord, TransformedGlyfBuilder};

/// A table with many small simple glyphs and a composite for each of them.
fn make_table(num_simple: u16) -> Vec<u8> {
    let mut builder = TransformedGlyfBuilder::new();
    for i in 0..num_simple as i32 {
        let contour = [
            (i, 0, true),
            (i + 300, 0, true),
            (i + 300, 700, false),
            (i + 40, 650, true),
        ];
        builder = builder.simple_glyph([contour, contour.map(|(x, y, on)| (x + 20, y + 20, on))]);
    }
    for gid in 0..num_simple {
        builder = builder
            .composite_glyph([
                ComponentRecord::offset(gid, 0, 0),
                ComponentRecord::offset(gid, 500, 100).scale(0.75),
            ])
            .with_bbox([0, 0, 1000, 1000]);
    }
    builder.build()
}

pub fn decode_glyf(c: &mut Criterion) {
    let table = make_table(500);
    let options = DecodeOptions::default();
    c.bench_function("decode_glyf", |b| {
        b.iter(|| {
            let glyf = TransformedGlyf::read(FontData::new(black_box(&table))).unwrap();
            glyf.decode(&options).unwrap()
        })
    });
}

criterion_group!(benches, decode_glyf);
criterion_main!(benches);
