//! Benchmarks for the Vista captioning pipeline.
//!
//! Run with: cargo bench -p vista-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::DynamicImage;
use std::path::Path;
use vista_core::pipeline::{ImageEncoder, SourceResolver};
use vista_core::{estimate_cost, ImageSource, Resolution, WritePolicy};

fn benchmark_encode_downscale(c: &mut Criterion) {
    let img = DynamicImage::new_rgb8(4032, 3024);
    let encoder = ImageEncoder::new(Resolution::Mid);

    c.bench_function("encode_4032x3024_to_1024", |b| {
        b.iter(|| {
            let _ = encoder.encode_image(black_box(img.clone()), Path::new("bench.jpg"));
        })
    });
}

fn benchmark_encode_passthrough(c: &mut Criterion) {
    let img = DynamicImage::new_rgb8(800, 600);
    let encoder = ImageEncoder::new(Resolution::High);

    c.bench_function("encode_800x600_no_resize", |b| {
        b.iter(|| {
            let _ = encoder.encode_image(black_box(img.clone()), Path::new("bench.jpg"));
        })
    });
}

fn benchmark_estimate(c: &mut Criterion) {
    let sources: Vec<ImageSource> = (0..10_000)
        .map(|i| ImageSource::parse(format!("https://images.example.com/batch/{i:05}.jpg")))
        .collect();

    c.bench_function("estimate_cost_10k", |b| {
        b.iter(|| {
            estimate_cost(
                black_box(sources.len()),
                Resolution::Mid,
                "What's in this image?",
                black_box(&sources),
            )
        })
    });
}

fn benchmark_resolve_remote(c: &mut Criterion) {
    let inputs: Vec<String> = (0..10_000)
        .map(|i| format!("https://images.example.com/batch/{i:05}.jpg"))
        .collect();
    let resolver = SourceResolver::new(WritePolicy::default());

    c.bench_function("resolve_10k_urls", |b| {
        b.iter(|| resolver.resolve(black_box(&inputs)))
    });
}

criterion_group!(
    benches,
    benchmark_encode_downscale,
    benchmark_encode_passthrough,
    benchmark_estimate,
    benchmark_resolve_remote,
);
criterion_main!(benches);
