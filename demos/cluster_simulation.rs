//! Cluster simulation: several nodes, several windows, noisy channel.
//!
//! Run with: RUST_LOG=debug cargo run --example cluster_simulation

use cs_cluster_reconstructor::cluster::{ESTIMATES_STREAM, MEASUREMENTS_STREAM};
use cs_cluster_reconstructor::{Cluster, ClusterConfig, DataStream, SampleBuffer};

const NODES: usize = 8;
const N: usize = 256;
const M: usize = 64;
const WINDOWS: usize = 4;

/// Piecewise-sparse test signal: a few spikes per window.
fn node_signal(node: usize) -> Vec<f64> {
    let mut x = vec![0.0; N * WINDOWS];
    for w in 0..WINDOWS {
        for s in 0..5 {
            let idx = w * N + (node * 13 + s * 47 + w * 5) % N;
            x[idx] = 1.0 + (s as f64) * 0.25 * if s % 2 == 0 { 1.0 } else { -1.0 };
        }
    }
    x
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=================================================================");
    println!("CS Cluster Reconstructor - Cluster Simulation");
    println!("=================================================================\n");

    let mut signals = DataStream::new("signals");
    for node in 0..NODES {
        signals.push(SampleBuffer::from_vec(node_signal(node)));
    }
    let originals: Vec<Vec<f64>> = signals.iter().map(|b| b.as_slice().to_vec()).collect();

    let config = ClusterConfig::new(0, N, M)
        .with_sparsity(5)
        .with_noise(1e-3)
        .with_parallel(true);
    let mut cluster = Cluster::from_stream(config, NODES, &mut signals)?;
    println!(
        "✓ Cluster 0: {} source nodes, n={N}, m={M} ({:.0}% of samples)\n",
        cluster.source_ids().len(),
        100.0 * M as f64 / N as f64
    );

    let run = cluster.run()?;
    let measurements = run
        .streams
        .get(MEASUREMENTS_STREAM)
        .ok_or("missing measurements stream")?;
    let estimates = run
        .streams
        .get(ESTIMATES_STREAM)
        .ok_or("missing estimates stream")?;

    println!("Windows: {}", run.windows);
    println!("Failures: {}", run.failures);
    println!("Solve time: {:.3} ms\n", run.total_elapsed_us as f64 / 1_000.0);

    println!(
        "{:>6} {:>10} {:>12} {:>18}",
        "node", "samples", "rmse", "solve ms (mean±sd)"
    );
    for (idx, (y, est)) in measurements.iter().zip(estimates.iter()).enumerate() {
        let original = &originals[idx + 1];
        let mse = est
            .iter()
            .zip(original)
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            / original.len() as f64;
        let timing = &cluster.reconstructor().node_stats((idx + 1) as u8)?.elapsed_ms;
        println!(
            "{:>6} {:>10} {:>12.3e} {:>10.3}±{:<7.3}",
            idx + 1,
            y.len(),
            mse.sqrt(),
            timing.mean,
            timing.std()
        );
    }

    let summary = cluster.reconstructor().warnings().summary();
    println!("\nWarnings recorded: {}", summary.total);

    Ok(())
}
