//! In-process cluster pipeline.
//!
//! Wires a stream of original node signals to a [`Reconstructor`] the way a
//! cluster is laid out in the network simulation, without any networking:
//!
//! - buffer [`CLUSTER_NODE_ID`] of the input stream is the cluster head's
//!   own signal, the following buffers feed source nodes `1..n_nodes`
//! - the cluster seed is `cluster_id + 1`; every source node derives its
//!   sensing-matrix seed from it through a [`SeedCreator`]
//! - each source signal is cut into windows of length `n`, every window is
//!   compressed to `m` measurements (optionally with Gaussian noise) and
//!   written to the store, then all nodes are reconstructed
//!
//! # Example
//!
//! ```rust
//! use cs_cluster_reconstructor::{Cluster, ClusterConfig, DataStream, SampleBuffer};
//!
//! let mut signals = DataStream::new("signals");
//! for node in 0..3 {
//!     let mut x = vec![0.0; 64];
//!     x[node * 7] = 1.0;
//!     signals.push(SampleBuffer::from_vec(x));
//! }
//!
//! let config = ClusterConfig::new(0, 64, 24).with_sparsity(1);
//! let mut cluster = Cluster::from_stream(config, 3, &mut signals).unwrap();
//! let run = cluster.run().unwrap();
//!
//! assert_eq!(run.windows, 1);
//! assert_eq!(run.streams.get("estimates").unwrap().len(), 2);
//! ```

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::buffer::SampleBuffer;
use crate::error::{CsError, Result};
use crate::reconstructor::{Reconstructor, ReconstructorConfig};
use crate::stream::{DataStream, DataStreamContainer};
use crate::types::{NodeId, CLUSTER_NODE_ID, MAX_SRC_NODES};

/// Derives a node seed from the cluster seed and the node id.
pub type SeedCreator = fn(cluster_seed: u32, node_id: NodeId) -> u32;

/// Default seed derivation: `cluster_seed * 1000 + node_id`.
pub fn default_seed_creator(cluster_seed: u32, node_id: NodeId) -> u32 {
    cluster_seed
        .wrapping_mul(1000)
        .wrapping_add(u32::from(node_id))
}

/// Name of the output stream holding the transmitted measurements.
pub const MEASUREMENTS_STREAM: &str = "measurements";

/// Name of the output stream holding the reconstructed signals.
pub const ESTIMATES_STREAM: &str = "estimates";

/// Configuration of one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Cluster id; the cluster seed is `cluster_id + 1`
    pub cluster_id: u8,

    /// Window length of the original signal
    pub n: usize,

    /// Measurements per window
    pub m: usize,

    /// Sparsity (0 = half the measurements)
    pub k: usize,

    /// Residual-norm tolerance
    pub tolerance: f64,

    /// Standard deviation of additive measurement noise (0 = noiseless)
    pub noise_std: f64,

    /// Scale sensing matrices by `1/sqrt(m)`
    pub normalize: bool,

    /// Reconstruct nodes concurrently (requires the `parallel` feature)
    pub parallel: bool,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            cluster_id: 0,
            n: 128,
            m: 32,
            k: 0,
            tolerance: 1e-6,
            noise_std: 0.0,
            normalize: true,
            parallel: false,
        }
    }
}

impl ClusterConfig {
    /// Create a new config with the given id and dimensions.
    pub fn new(cluster_id: u8, n: usize, m: usize) -> Self {
        Self {
            cluster_id,
            n,
            m,
            ..Default::default()
        }
    }

    /// Set the sparsity.
    pub fn with_sparsity(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Set the tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the measurement noise.
    pub fn with_noise(mut self, noise_std: f64) -> Self {
        self.noise_std = noise_std;
        self
    }

    /// Enable/disable sensing-matrix normalization.
    pub fn with_normalization(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Enable/disable concurrent reconstruction.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Seed shared by all nodes of this cluster.
    #[inline]
    pub fn cluster_seed(&self) -> u32 {
        u32::from(self.cluster_id) + 1
    }

    fn reconstructor_config(&self) -> ReconstructorConfig {
        ReconstructorConfig::new(self.n, self.m)
            .with_sparsity(self.k)
            .with_tolerance(self.tolerance)
            .with_normalization(self.normalize)
    }
}

/// Outcome of [`Cluster::run`].
#[derive(Debug, Clone)]
pub struct ClusterRun {
    /// [`MEASUREMENTS_STREAM`] and [`ESTIMATES_STREAM`], one buffer per
    /// source node, windows concatenated
    pub streams: DataStreamContainer<f64>,

    /// Windows processed per node
    pub windows: usize,

    /// Failed node reconstructions across all windows
    pub failures: usize,

    /// Accumulated solve time (microseconds)
    pub total_elapsed_us: u64,
}

/// A cluster head with its source nodes.
#[derive(Debug)]
pub struct Cluster {
    config: ClusterConfig,
    head_signal: SampleBuffer<f64>,
    /// Source node ids and their original signals
    sources: Vec<(NodeId, SampleBuffer<f64>)>,
    reconstructor: Reconstructor,
}

impl Cluster {
    /// Build a cluster from a stream of signals with the default seeds.
    pub fn from_stream(
        config: ClusterConfig,
        n_nodes: usize,
        stream: &mut DataStream<f64>,
    ) -> Result<Self> {
        Self::from_stream_with_seeder(config, n_nodes, stream, default_seed_creator)
    }

    /// Build a cluster from a stream of signals.
    ///
    /// Takes `n_nodes` buffers out of `stream`: the cluster head's first,
    /// then one per source node.
    ///
    /// # Errors
    /// [`CsError::Configuration`] if `n_nodes` is zero or exceeds
    /// `MAX_SRC_NODES + 1`, if the stream holds fewer than `n_nodes`
    /// buffers, or if the dimensions are invalid.
    pub fn from_stream_with_seeder(
        config: ClusterConfig,
        n_nodes: usize,
        stream: &mut DataStream<f64>,
        seeder: SeedCreator,
    ) -> Result<Self> {
        if n_nodes == 0 || n_nodes > MAX_SRC_NODES + 1 {
            return Err(CsError::config(format!(
                "cluster needs between 1 and {} nodes, got {n_nodes}",
                MAX_SRC_NODES + 1
            )));
        }
        if stream.len() < n_nodes {
            return Err(CsError::config(format!(
                "stream '{}' holds {} buffers, {n_nodes} needed",
                stream.name(),
                stream.len()
            )));
        }
        if !config.noise_std.is_finite() || config.noise_std < 0.0 {
            return Err(CsError::config(format!(
                "invalid noise standard deviation {}",
                config.noise_std
            )));
        }

        let mut reconstructor = Reconstructor::omp(config.reconstructor_config())?;
        let cluster_seed = config.cluster_seed();

        let head_signal = stream.take(usize::from(CLUSTER_NODE_ID))?;
        let mut sources = Vec::with_capacity(n_nodes - 1);
        for id in 1..n_nodes {
            let id = id as NodeId;
            reconstructor.add_src_node(id, seeder(cluster_seed, id))?;
            // Later buffers shift down, so the next source is always first
            sources.push((id, stream.take(0)?));
        }

        log::debug!(
            "Cluster {} created with {} source nodes (seed={cluster_seed})",
            config.cluster_id,
            sources.len()
        );

        Ok(Self {
            config,
            head_signal,
            sources,
            reconstructor,
        })
    }

    /// Compress, transmit and reconstruct every full window of every source.
    ///
    /// Trailing samples that do not fill a window are ignored. Windows are
    /// limited by the shortest source signal.
    pub fn run(&mut self) -> Result<ClusterRun> {
        let n = self.config.n;
        let windows = self
            .sources
            .iter()
            .map(|(_, signal)| signal.len() / n)
            .min()
            .unwrap_or(0);

        let mut noise = if self.config.noise_std > 0.0 {
            let normal = Normal::new(0.0, self.config.noise_std)
                .map_err(|e| CsError::config(format!("invalid noise distribution: {e}")))?;
            Some((
                ChaCha8Rng::seed_from_u64(u64::from(self.config.cluster_seed())),
                normal,
            ))
        } else {
            None
        };

        let mut measurements: Vec<Vec<f64>> = vec![Vec::new(); self.sources.len()];
        let mut estimates: Vec<Vec<f64>> = vec![Vec::new(); self.sources.len()];
        let mut failures = 0;
        let mut total_elapsed_us = 0;

        for window in 0..windows {
            self.reconstructor.reset_all_inputs();

            for (idx, (id, signal)) in self.sources.iter().enumerate() {
                let x = &signal.as_slice()[window * n..(window + 1) * n];
                let mut y = self.reconstructor.node(*id)?.matrix().compress(x)?;
                if let Some((rng, normal)) = noise.as_mut() {
                    for v in y.iter_mut() {
                        *v += normal.sample(rng);
                    }
                }
                for &v in &y {
                    self.reconstructor.write(*id, v)?;
                }
                measurements[idx].extend_from_slice(&y);
            }

            let report = self.reconstruct_window();
            failures += report.failures.len();
            total_elapsed_us += report.total_elapsed_us;

            for (idx, (id, _)) in self.sources.iter().enumerate() {
                match self.reconstructor.estimate(*id)? {
                    Some(estimate) => estimates[idx].extend_from_slice(estimate),
                    None => estimates[idx].extend(std::iter::repeat(0.0).take(n)),
                }
            }
        }

        let mut measurements_stream = DataStream::new(MEASUREMENTS_STREAM);
        let mut estimates_stream = DataStream::new(ESTIMATES_STREAM);
        for (y, x) in measurements.into_iter().zip(estimates) {
            measurements_stream.push(SampleBuffer::from_vec(y));
            estimates_stream.push(SampleBuffer::from_vec(x));
        }

        let mut streams = DataStreamContainer::new();
        streams.push(measurements_stream);
        streams.push(estimates_stream);

        log::info!(
            "Cluster {}: {} windows x {} nodes, {} failures, {} us",
            self.config.cluster_id,
            windows,
            self.sources.len(),
            failures,
            total_elapsed_us
        );

        Ok(ClusterRun {
            streams,
            windows,
            failures,
            total_elapsed_us,
        })
    }

    #[cfg(feature = "parallel")]
    fn reconstruct_window(&mut self) -> crate::reconstructor::BatchReport {
        if self.config.parallel {
            self.reconstructor.reconstruct_all_parallel()
        } else {
            self.reconstructor.reconstruct_all()
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn reconstruct_window(&mut self) -> crate::reconstructor::BatchReport {
        self.reconstructor.reconstruct_all()
    }

    /// Configuration.
    #[inline]
    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// The cluster head's own signal.
    #[inline]
    pub fn head_signal(&self) -> &SampleBuffer<f64> {
        &self.head_signal
    }

    /// Source node ids.
    pub fn source_ids(&self) -> Vec<NodeId> {
        self.sources.iter().map(|(id, _)| *id).collect()
    }

    /// The underlying reconstruction store.
    #[inline]
    pub fn reconstructor(&self) -> &Reconstructor {
        &self.reconstructor
    }
}
