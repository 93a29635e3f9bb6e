//! Basic usage example: one node, one window.
//!
//! Run with: cargo run --example basic_usage

use cs_cluster_reconstructor::{Reconstructor, ReconstructorConfig, SensingMatrix};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=================================================================");
    println!("CS Cluster Reconstructor - Basic Usage Example");
    println!("=================================================================\n");

    let (n, m, k) = (128, 40, 4);
    let seed = 1001;

    // Cluster head side: register the node with the seed it announced
    let config = ReconstructorConfig::new(n, m).with_sparsity(k);
    let mut rec = Reconstructor::omp(config)?;
    rec.add_src_node(1, seed)?;
    println!("✓ Registered node 1 (n={n}, m={m}, seed={seed})\n");

    // Source node side: a 4-sparse window, compressed with the same seed
    let mut x = vec![0.0; n];
    x[5] = 2.0;
    x[33] = -1.0;
    x[70] = 0.5;
    x[121] = 1.25;
    let y = SensingMatrix::generate(seed, m, n, true).compress(&x)?;
    println!("Node 1 transmits {} measurements instead of {} samples", y.len(), n);

    for v in y {
        rec.write(1, v)?;
    }

    let elapsed_ms = rec.reconstruct(1)?;
    let recovery = rec
        .last_recovery(1)?
        .ok_or("reconstruction left no recovery")?;

    println!("\nReconstruction:");
    println!("  Stop reason: {}", recovery.stop_reason.name());
    println!("  Iterations: {}", recovery.iterations);
    println!("  Support: {:?}", recovery.support);
    println!("  Residual norm: {:.3e}", recovery.residual_norm);
    println!("  Elapsed: {elapsed_ms} ms");

    let max_err = recovery
        .estimate
        .iter()
        .zip(&x)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max);
    println!("  Max abs error: {max_err:.3e}");

    println!("\n✓ Done");
    Ok(())
}
