//! Benchmarks for compressed-sensing reconstruction performance.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use cs_cluster_reconstructor::{
    Omp, ReconstructionAlgorithm, Reconstructor, ReconstructorConfig, RecoveryParams,
    SensingMatrix,
};

/// Sparse test signal with `k` spikes spread over `n` samples.
fn create_sparse_signal(n: usize, k: usize, offset: usize) -> Vec<f64> {
    let mut x = vec![0.0; n];
    for i in 0..k {
        let idx = (offset + i * (n / k.max(1)) + i * 3) % n;
        x[idx] = if i % 2 == 0 { 1.0 } else { -0.75 };
    }
    x
}

fn bench_sensing(c: &mut Criterion) {
    let mut group = c.benchmark_group("sensing");

    group.bench_function("generate_64x256", |b| {
        b.iter(|| black_box(SensingMatrix::generate(black_box(42), 64, 256, true)))
    });

    let phi = SensingMatrix::generate(42, 64, 256, true);
    let x = create_sparse_signal(256, 8, 0);
    group.bench_function("compress_64x256", |b| {
        b.iter(|| black_box(phi.compress(black_box(&x))))
    });

    group.finish();
}

fn bench_omp(c: &mut Criterion) {
    let mut group = c.benchmark_group("omp");
    let omp = Omp::new();

    for &(n, m, k) in &[(128, 32, 4), (256, 64, 8), (512, 128, 16)] {
        let phi = SensingMatrix::generate(7, m, n, true);
        let y = phi
            .compress(&create_sparse_signal(n, k, 5))
            .unwrap_or_default();
        let params = RecoveryParams::new(k, 1e-9);

        group.bench_with_input(
            BenchmarkId::new("recover", format!("n{n}_m{m}_k{k}")),
            &y,
            |b, y| b.iter(|| black_box(omp.recover(&phi, black_box(y), &params))),
        );
    }

    group.finish();
}

fn build_store(nodes: u8, n: usize, m: usize, k: usize) -> Reconstructor {
    let config = ReconstructorConfig::new(n, m)
        .with_sparsity(k)
        .with_logging(false);
    let mut rec = match Reconstructor::omp(config) {
        Ok(rec) => rec,
        Err(e) => panic!("invalid bench config: {e}"),
    };

    for id in 1..=nodes {
        let seed = u32::from(id) * 101;
        let _ = rec.add_src_node(id, seed);
        let phi = SensingMatrix::generate(seed, m, n, true);
        let y = phi
            .compress(&create_sparse_signal(n, k, id as usize))
            .unwrap_or_default();
        for v in y {
            let _ = rec.write(id, v);
        }
    }
    rec
}

fn bench_batch(c: &mut Criterion) {
    let nodes = 32u8;
    let mut group = c.benchmark_group("batch");
    group.throughput(Throughput::Elements(u64::from(nodes)));

    group.bench_function("reconstruct_all", |b| {
        let mut rec = build_store(nodes, 256, 64, 8);
        b.iter(|| black_box(rec.reconstruct_all()))
    });

    #[cfg(feature = "parallel")]
    group.bench_function("reconstruct_all_parallel", |b| {
        let mut rec = build_store(nodes, 256, 64, 8);
        b.iter(|| black_box(rec.reconstruct_all_parallel()))
    });

    group.finish();
}

criterion_group!(benches, bench_sensing, bench_omp, bench_batch);
criterion_main!(benches);
