use criterion::{Criterion, black_box, criterion_group, criterion_main};
use glam::Vec2;
use nebula_trail::*;

fn spec() -> TrailSpec {
    TrailSpec::new("bench", 2.0, StyleSpec::color([1.0, 0.8, 0.4, 1.0]))
}

fn bench_sample(c: &mut Criterion) {
    let spec = spec();
    let style = spec.style(TrailMode::Idle);
    let mut buf = TrailBuffer::new(&spec, 0.05, 0.5);
    let mut x = 0.0f32;
    c.bench_function("trail_sample", |bencher| {
        bencher.iter(|| {
            x += 1.0;
            buf.sample(black_box(Vec2::new(x, 0.0)), style);
        })
    });
}

fn bench_advance_full_ring(c: &mut Criterion) {
    let spec = spec();
    let style = spec.style(TrailMode::Idle);
    let mut buf = TrailBuffer::new(&spec, 0.05, 0.5);
    c.bench_function("trail_advance_full", |bencher| {
        bencher.iter(|| {
            while buf.len() < buf.capacity() {
                buf.sample(Vec2::ZERO, style);
            }
            buf.advance(black_box(0.016));
        })
    });
}

fn bench_registry_tick(c: &mut Criterion) {
    let spec = spec();
    let mut reg = TrailRegistry::new(0.05, 9);
    let handles: Vec<_> = (0..256).filter_map(|_| reg.create(&spec).ok()).collect();
    let mut x = 0.0f32;
    c.bench_function("registry_tick_256", |bencher| {
        bencher.iter(|| {
            x += 1.0;
            for h in &handles {
                reg.sample_mode(*h, Vec2::new(x, 0.0), TrailMode::Glow);
            }
            reg.tick(black_box(1.0 / 60.0));
        })
    });
}

criterion_group!(
    benches,
    bench_sample,
    bench_advance_full_ring,
    bench_registry_tick
);
criterion_main!(benches);
