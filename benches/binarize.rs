use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ultracode_bridge::binarize::{binarize_line, binarize_row, binarize_row_adaptive, runs};
use ultracode_bridge::options::Binarizer;
use ultracode_bridge::{Bridge, CropRect, ReaderHints};

fn make_row(width: usize, seed: u32) -> Vec<u8> {
    // Немного «полосатого» шума, чтобы бенч был стабильным и не совсем рандомным
    let mut x = seed;
    (0..width)
        .map(|i| {
            x = x.wrapping_mul(1664525).wrapping_add(1013904223);
            let v = ((x >> 24) & 0xFF) as u8;
            if (i / 7) % 2 == 0 {
                v.saturating_add(32)
            } else {
                v.saturating_sub(32)
            }
        })
        .collect()
}

fn bench_binarize(c: &mut Criterion) {
    let width = 2048usize;
    let row = make_row(width, 123);

    c.bench_function("binarize_row", |b| {
        b.iter(|| {
            let bin = binarize_row(black_box(&row));
            black_box(bin.len())
        })
    });

    c.bench_function("binarize_row_adaptive", |b| {
        b.iter(|| {
            let bin = binarize_row_adaptive(black_box(&row));
            black_box(bin.len())
        })
    });

    c.bench_function("binarize_line(LOCAL_AVERAGE) + runs", |b| {
        b.iter(|| {
            let bin = binarize_line(black_box(&row), Binarizer::LocalAverage);
            let r = runs(&bin);
            black_box(r.len())
        })
    });
}

fn bench_read_plane(c: &mut Criterion) {
    let bridge = Bridge::new();
    let Ok(m) = bridge.encode_text("0123456789ABCDEF", "CODE_128", 640, 120, -1, -1) else {
        return;
    };
    let (width, height) = (m.width(), m.height());
    let plane: Vec<u8> = m.data().iter().map(|&v| 255 - v).collect();
    let crop = CropRect::new(0, 0, width as i32, height as i32);
    let hints = ReaderHints::default();
    let fast = ReaderHints { try_harder: false, ..ReaderHints::default() };

    c.bench_function("read_plane code128 640x120", |b| {
        b.iter(|| black_box(bridge.read_plane(black_box(&plane), width, crop, 0, &hints)))
    });

    c.bench_function("read_plane code128 640x120 (fast)", |b| {
        b.iter(|| black_box(bridge.read_plane(black_box(&plane), width, crop, 0, &fast)))
    });
}

criterion_group!(benches, bench_binarize, bench_read_plane);
criterion_main!(benches);
