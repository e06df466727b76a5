use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use doorcam_core::{
    locate_template, normalize_roi, offset_to_vertices, GrayImage, LabImage, NormalizeParams,
    OffsetBox, Point, RgbImage, Smoothing,
};

fn textured(width: usize, height: usize, seed: usize) -> GrayImage {
    let data = (0..width * height)
        .map(|i| {
            let (x, y) = (i % width, i / width);
            ((x * 37 + y * 91 + seed * 13) % 211) as u8 + 20
        })
        .collect();
    GrayImage {
        width,
        height,
        data,
    }
}

fn bench_locate(c: &mut Criterion) {
    let mut group = c.benchmark_group("locate_template");
    let template = textured(48, 32, 7);
    for (w, h) in [(160usize, 120usize), (320, 240), (640, 480)] {
        let mut frame = textured(w, h, 1);
        for y in 0..template.height {
            for x in 0..template.width {
                frame.set(w / 3 + x, h / 4 + y, template.get(x, y));
            }
        }
        group.bench_with_input(BenchmarkId::from_parameter(format!("{w}x{h}")), &frame, |b, f| {
            b.iter(|| locate_template(black_box(&f.view()), black_box(&template.view())))
        });
    }
    group.finish();
}

fn bench_normalize(c: &mut Criterion) {
    let gray = textured(640, 480, 3);
    let rgb = RgbImage {
        width: gray.width,
        height: gray.height,
        data: gray.data.iter().flat_map(|&v| [v, v, v]).collect(),
    };
    let lab = LabImage::from_rgb(&rgb);
    let roi = offset_to_vertices(
        Point::new(100, 60),
        &OffsetBox::new(167, 154, 52, 112).expect("offset"),
    );
    let params = NormalizeParams {
        smoothing: Smoothing::Gaussian(5),
        clip_limit: 3.0,
        grid_size: 8,
    };
    c.bench_function("normalize_roi_52x112", |b| {
        b.iter(|| normalize_roi(black_box(&lab), black_box(&roi), black_box(&params)))
    });
}

criterion_group!(benches, bench_locate, bench_normalize);
criterion_main!(benches);
