//! # CS-Cluster-Reconstructor
//!
//! Compressed-sensing reconstruction for the cluster head of a sensor network.
//!
//! Source nodes transmit `m` random projections of a window of `n` samples
//! instead of the samples themselves. The cluster head regenerates each
//! node's sensing matrix from its seed, buffers the received measurements
//! and recovers a sparse estimate of the original window with Orthogonal
//! Matching Pursuit.
//!
//! ## Features
//!
//! - **Seeded Sensing Matrices**: Gaussian matrices reproducible from a 32-bit seed
//! - **Orthogonal Matching Pursuit**: Incremental QR least squares, deterministic tie-breaks
//! - **Per-Node Store**: Registration order preserved, per-node sparsity/tolerance overrides
//! - **Batch Reconstruction**: Failures collected per node, optional rayon parallelism
//! - **Statistics & Warnings**: Welford timings, deduplicated warning tracking
//! - **Cluster Pipeline**: In-process compress → transmit → reconstruct simulation
//!
//! ## Quick Start
//!
//! ```rust
//! use cs_cluster_reconstructor::{Reconstructor, ReconstructorConfig, SensingMatrix};
//!
//! // 64-sample windows, 24 measurements per window, sparsity 2
//! let config = ReconstructorConfig::new(64, 24).with_sparsity(2);
//! let mut rec = Reconstructor::omp(config).unwrap();
//! rec.add_src_node(1, 7).unwrap();
//!
//! // What node 1 does on its side
//! let mut x = vec![0.0; 64];
//! x[3] = 1.0;
//! x[40] = -0.5;
//! let y = SensingMatrix::generate(7, 24, 64, true).compress(&x).unwrap();
//!
//! // What the cluster head does
//! for v in y {
//!     rec.write(1, v).unwrap();
//! }
//! rec.reconstruct(1).unwrap();
//!
//! let estimate = rec.estimate(1).unwrap().unwrap();
//! assert!((estimate[3] - 1.0).abs() < 1e-6);
//! ```
//!
//! ### Batch Reconstruction
//!
//! ```ignore
//! let report = rec.reconstruct_all();
//! for (id, err) in &report.failures {
//!     log::warn!("node {id} failed: {err}");
//! }
//! let estimates = rec.estimates_stream("estimates");
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Core types: `NodeId`, `RecoveryParams`, `Recovery`, `StopReason` |
//! | [`buffer`] | Fixed-capacity `SampleBuffer` |
//! | [`stream`] | `DataStream` and `DataStreamContainer` |
//! | [`sensing`] | Seeded Gaussian `SensingMatrix` |
//! | [`reconstructor`] | `Omp` and the per-node `Reconstructor` store |
//! | [`statistics`] | `RunningStats`, `NodeStats`, `ReconstructorStats` |
//! | [`warnings`] | Warning tracking: `WarningTracker`, `Warning`, `WarningCategory` |
//! | [`cluster`] | In-process cluster pipeline: `Cluster`, `ClusterConfig` |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `parallel` | ✅ | Rayon-backed `reconstruct_all_parallel` |

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod buffer;
pub mod cluster;
pub mod error;
pub mod reconstructor;
pub mod sensing;
pub mod statistics;
pub mod stream;
pub mod types;
pub mod warnings;

// Re-exports - Core types
pub use error::{CsError, Result};
pub use types::{
    NodeId, NodeState, Recovery, RecoveryParams, StopReason, CLUSTER_NODE_ID, MAX_SRC_NODES,
};

// Re-exports - Data containers
pub use buffer::SampleBuffer;
pub use stream::{DataStream, DataStreamContainer};

// Re-exports - Reconstruction
pub use reconstructor::{
    BatchReport, NodeRecord, Omp, ReconstructionAlgorithm, Reconstructor, ReconstructorConfig,
};
pub use sensing::SensingMatrix;

// Re-exports - Statistics
pub use statistics::{NodeStats, ReconstructorStats, RunningStats};

// Re-exports - Warnings
pub use warnings::{
    Warning, WarningCategory, WarningSummary, WarningTracker, WarningTrackerConfig,
};

// Re-exports - Cluster pipeline
pub use cluster::{default_seed_creator, Cluster, ClusterConfig, ClusterRun, SeedCreator};
