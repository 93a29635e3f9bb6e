//! End-to-end tests for the cluster-head reconstruction pipeline.
//!
//! These tests exercise the public API the way a simulation drives it:
//! - Nodes compress with their seed, the store regenerates the same matrix
//! - Batch reconstruction tolerates per-node failures
//! - Estimates and inputs are exported as streams in registration order
//! - The cluster pipeline moves signals through compress → reconstruct
//!
//! Run with:
//! ```bash
//! cargo test --test integration_test --release
//! ```

use cs_cluster_reconstructor::cluster::{ESTIMATES_STREAM, MEASUREMENTS_STREAM};
use cs_cluster_reconstructor::{
    Cluster, ClusterConfig, CsError, DataStream, NodeState, Reconstructor, ReconstructorConfig,
    SampleBuffer, SensingMatrix, StopReason, WarningCategory,
};

fn sparse_signal(n: usize, spikes: &[(usize, f64)]) -> Vec<f64> {
    let mut x = vec![0.0; n];
    for &(idx, v) in spikes {
        x[idx] = v;
    }
    x
}

fn transmit(rec: &mut Reconstructor, id: u8, seed: u32, x: &[f64]) {
    let config = rec.config().clone();
    let phi = SensingMatrix::generate(seed, config.m_max, config.n_meas, config.normalize_matrix);
    for v in phi.compress(x).unwrap() {
        rec.write(id, v).unwrap();
    }
}

fn quiet(n: usize, m: usize) -> ReconstructorConfig {
    ReconstructorConfig::new(n, m).with_logging(false)
}

// ============================================================================
// Test: Seeded Matrices Agree Between Node And Cluster Head
// ============================================================================

#[test]
fn test_node_and_head_share_matrix() {
    let mut rec = Reconstructor::omp(quiet(96, 32)).unwrap();
    rec.add_src_node(4, 123_456).unwrap();

    let node_side = SensingMatrix::generate(123_456, 32, 96, true);
    assert_eq!(rec.node(4).unwrap().matrix(), &node_side);
}

// ============================================================================
// Test: End-To-End Recovery
// ============================================================================

#[test]
fn test_end_to_end_recovery() {
    let mut rec = Reconstructor::omp(quiet(128, 40).with_sparsity(3).with_tolerance(1e-9)).unwrap();
    rec.add_src_node(1, 99).unwrap();

    let x = sparse_signal(128, &[(10, 1.5), (64, -1.0), (100, 0.75)]);
    transmit(&mut rec, 1, 99, &x);
    assert_eq!(rec.node(1).unwrap().state(), NodeState::Buffering);

    rec.reconstruct(1).unwrap();

    let recovery = rec.last_recovery(1).unwrap().unwrap();
    let mut support = recovery.support.clone();
    support.sort_unstable();
    assert_eq!(support, vec![10, 64, 100]);
    assert!(recovery.residual_norm <= 1e-9);
    assert!(matches!(
        recovery.stop_reason,
        StopReason::Tolerance | StopReason::Sparsity
    ));

    let estimate = rec.estimate(1).unwrap().unwrap();
    for (a, b) in estimate.iter().zip(&x) {
        assert!((a - b).abs() < 1e-6);
    }
}

// ============================================================================
// Test: Batch With Partial Failure
// ============================================================================

#[test]
fn test_batch_partial_failure_and_streams() {
    let mut rec = Reconstructor::omp(quiet(64, 24).with_sparsity(2)).unwrap();
    for id in [7u8, 3, 5] {
        rec.add_src_node(id, u32::from(id) * 17).unwrap();
    }

    transmit(&mut rec, 7, 7 * 17, &sparse_signal(64, &[(1, 1.0), (30, -2.0)]));
    transmit(&mut rec, 5, 5 * 17, &sparse_signal(64, &[(12, 0.5), (50, 1.0)]));

    let report = rec.reconstruct_all();
    assert_eq!(report.succeeded, vec![7, 5]);
    assert_eq!(report.failure(3), Some(&CsError::EmptyBuffer(3)));
    assert!(!report.is_complete());
    assert!(matches!(
        report.clone().into_result(),
        Err(CsError::Batch {
            failed: 1,
            total: 3
        })
    ));

    // Registration order, zero fill for the failed node
    let estimates = rec.estimates_stream("estimates");
    assert_eq!(estimates.len(), 3);
    assert!(estimates.peek(1).unwrap().iter().all(|v| *v == 0.0));
    assert!((estimates.peek(0).unwrap().read(30).unwrap() + 2.0).abs() < 1e-6);
    assert!((estimates.peek(2).unwrap().read(50).unwrap() - 1.0).abs() < 1e-6);

    let inputs = rec.inputs_stream("inputs");
    assert_eq!(inputs.peek(0).unwrap().len(), 24);
    assert!(inputs.peek(1).unwrap().is_empty());

    assert_eq!(rec.warnings().count_by_category(WarningCategory::EmptyBuffer), 1);
    assert_eq!(rec.stats().batches, 1);
}

// ============================================================================
// Test: Buffer Capacity
// ============================================================================

#[test]
fn test_buffer_capacity_is_enforced() {
    let mut rec = Reconstructor::omp(quiet(32, 4)).unwrap();
    rec.add_src_node(1, 1).unwrap();

    for i in 0..4 {
        assert_eq!(rec.write(1, i as f64).unwrap(), 3 - i);
    }
    assert_eq!(rec.write(1, 9.0), Err(CsError::BufferFull { capacity: 4 }));
    assert_eq!(rec.input(1).unwrap().as_slice(), &[0.0, 1.0, 2.0, 3.0]);
}

// ============================================================================
// Test: Cluster Pipeline
// ============================================================================

#[test]
fn test_cluster_pipeline() {
    let mut signals = DataStream::new("signals");
    for node in 0..5usize {
        let mut x = vec![0.0; 3 * 64];
        for w in 0..3 {
            x[w * 64 + (node * 9 + w) % 64] = 1.0;
        }
        signals.push(SampleBuffer::from_vec(x));
    }
    // One extra buffer beyond the cluster stays in the stream
    signals.push(SampleBuffer::from_vec(vec![42.0; 64]));

    let config = ClusterConfig::new(3, 64, 20).with_sparsity(1);
    let mut cluster = Cluster::from_stream(config, 5, &mut signals).unwrap();
    assert_eq!(signals.len(), 1);
    assert_eq!(signals.peek(0).unwrap().read(0).unwrap(), 42.0);
    assert_eq!(cluster.reconstructor().node(1).unwrap().seed(), 4001);

    let run = cluster.run().unwrap();
    assert_eq!(run.windows, 3);
    assert_eq!(run.failures, 0);

    let measurements = run.streams.get(MEASUREMENTS_STREAM).unwrap();
    let estimates = run.streams.get(ESTIMATES_STREAM).unwrap();
    assert_eq!(measurements.len(), 4);
    assert_eq!(estimates.len(), 4);

    for (idx, est) in estimates.iter().enumerate() {
        let node = idx + 1;
        for w in 0..3 {
            let spike = w * 64 + (node * 9 + w) % 64;
            assert!((est.read(spike).unwrap() - 1.0).abs() < 1e-6);
        }
    }
}
