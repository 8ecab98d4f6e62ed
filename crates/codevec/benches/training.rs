//! Codebook Training Benchmarks
//!
//! Benchmarks for Lloyd training, nearest-codeword assignment and the
//! full grid compress path.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use codevec::{
    assign, BlockEncoding, BlockShape, CodebookTrainer, CodecSession, Grid, InitStrategy,
    SessionConfig, TrainingConfig, Vector,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn generate_vectors(n: usize, dim: usize, seed: u64) -> Vec<Vector> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let center = rng.gen_range(0..8) as f64 * 32.0;
            let components: Vec<f64> = (0..dim)
                .map(|_| center + rng.gen_range(-12.0..12.0))
                .collect();
            Vector::from(components)
        })
        .collect()
}

fn generate_grid(height: usize, width: usize, seed: u64) -> Grid {
    let mut rng = StdRng::seed_from_u64(seed);
    let raw: Vec<u8> = (0..height * width * 3).map(|_| rng.gen()).collect();
    Grid::from_u8(height, width, 3, &raw).unwrap()
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("train");
    group.sample_size(20);
    let vectors = generate_vectors(4096, 4, 42);
    for k in [8, 32, 128] {
        group.throughput(Throughput::Elements(vectors.len() as u64));
        group.bench_with_input(BenchmarkId::new("random", k), &k, |b, &k| {
            let trainer = CodebookTrainer::new(TrainingConfig::with_codebook_size(k).seeded(7));
            b.iter(|| trainer.train(black_box(&vectors)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("kmeans++", k), &k, |b, &k| {
            let trainer = CodebookTrainer::new(TrainingConfig {
                codebook_size: k,
                seed: Some(7),
                init: InitStrategy::KMeansPlusPlus,
                ..Default::default()
            });
            b.iter(|| trainer.train(black_box(&vectors)).unwrap())
        });
    }
    group.finish();
}

fn bench_assign(c: &mut Criterion) {
    let mut group = c.benchmark_group("assign");
    let vectors = generate_vectors(16384, 12, 1);
    for k in [16, 64, 256] {
        let codebook = CodebookTrainer::new(TrainingConfig {
            codebook_size: k,
            max_iterations: 1,
            seed: Some(3),
            ..Default::default()
        })
        .train(&vectors)
        .unwrap()
        .codebook;
        group.throughput(Throughput::Elements(vectors.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(k), &codebook, |b, codebook| {
            b.iter(|| assign(codebook, black_box(&vectors)))
        });
    }
    group.finish();
}

fn bench_compress(c: &mut Criterion) {
    let mut group = c.benchmark_group("compress");
    group.sample_size(10);
    let grid = generate_grid(128, 128, 9);
    for (name, block, encoding) in [
        ("pixel", BlockShape::SINGLE, BlockEncoding::Mean),
        ("mean_2x2", BlockShape::default(), BlockEncoding::Mean),
        ("samples_4x4", BlockShape::new(4, 4).unwrap(), BlockEncoding::Samples),
    ] {
        let session = CodecSession::new(SessionConfig {
            block,
            encoding,
            training: TrainingConfig::with_codebook_size(32).seeded(11),
            ..Default::default()
        });
        group.throughput(Throughput::Bytes(grid.samples().len() as u64));
        group.bench_function(name, |b| b.iter(|| session.compress(black_box(&grid)).unwrap()));
    }
    group.finish();
}

criterion_group!(benches, bench_training, bench_assign, bench_compress);
criterion_main!(benches);
