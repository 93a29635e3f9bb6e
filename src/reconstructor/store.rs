//! Per-node reconstruction store.
//!
//! Manages one record per source node: its seeded sensing matrix, the input
//! buffer the compressor writes into, and the latest estimate. Designed for
//! long simulations:
//! - Node records are kept in registration order, so batch runs are
//!   reproducible
//! - Per-node failures in a batch are recorded, never fatal
//! - Every reconstruction is timed and tracked in statistics

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::buffer::SampleBuffer;
use crate::error::{CsError, Result};
use crate::sensing::SensingMatrix;
use crate::statistics::{NodeStats, ReconstructorStats};
use crate::stream::DataStream;
use crate::types::{NodeId, NodeState, Recovery, RecoveryParams, StopReason, MAX_SRC_NODES};
use crate::warnings::{Warning, WarningCategory, WarningTracker, WarningTrackerConfig};

use super::algorithm::ReconstructionAlgorithm;
use super::omp::Omp;

/// Configuration for reconstructor behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconstructorConfig {
    /// Original signal length per node
    pub n_meas: usize,

    /// Maximum number of measurements retained per node
    pub m_max: usize,

    /// Default sparsity (0 = half the available measurements)
    pub k_default: usize,

    /// Default residual-norm tolerance
    pub tolerance: f64,

    /// Maximum number of source nodes
    pub max_nodes: usize,

    /// Scale sensing matrices by `1/sqrt(m_max)`
    pub normalize_matrix: bool,

    /// Clear a node's input buffer after a successful reconstruction
    pub consume_input: bool,

    /// Whether to log warnings for per-node issues
    pub log_warnings: bool,
}

impl Default for ReconstructorConfig {
    fn default() -> Self {
        Self {
            n_meas: 128,
            m_max: 32,
            k_default: 0,
            tolerance: 1e-6,
            max_nodes: MAX_SRC_NODES,
            normalize_matrix: true,
            consume_input: false,
            log_warnings: true,
        }
    }
}

impl ReconstructorConfig {
    /// Create a new config with the given dimensions.
    pub fn new(n_meas: usize, m_max: usize) -> Self {
        Self {
            n_meas,
            m_max,
            ..Default::default()
        }
    }

    /// Set the default sparsity.
    pub fn with_sparsity(mut self, k: usize) -> Self {
        self.k_default = k;
        self
    }

    /// Set the default tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the maximum number of source nodes.
    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    /// Enable/disable sensing-matrix normalization.
    pub fn with_normalization(mut self, normalize: bool) -> Self {
        self.normalize_matrix = normalize;
        self
    }

    /// Enable/disable clearing input buffers after reconstruction.
    pub fn with_consume_input(mut self, consume: bool) -> Self {
        self.consume_input = consume;
        self
    }

    /// Enable/disable warning logs.
    pub fn with_logging(mut self, log: bool) -> Self {
        self.log_warnings = log;
        self
    }

    /// Check the configuration.
    ///
    /// # Errors
    /// [`CsError::Configuration`] on zero dimensions, `m_max > n_meas`,
    /// an invalid tolerance or a node limit above [`MAX_SRC_NODES`].
    pub fn validate(&self) -> Result<()> {
        validate_dimensions(self.n_meas, self.m_max)?;
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(CsError::config(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        if self.max_nodes > MAX_SRC_NODES {
            return Err(CsError::config(format!(
                "max_nodes {} exceeds the protocol limit {}",
                self.max_nodes, MAX_SRC_NODES
            )));
        }
        Ok(())
    }

    /// Save to JSON file.
    pub fn save_json(&self, path: impl AsRef<std::path::Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }

    /// Load from JSON file.
    pub fn load_json(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }
}

fn validate_dimensions(n_meas: usize, m_max: usize) -> Result<()> {
    if n_meas == 0 {
        return Err(CsError::config("n_meas must be greater than 0"));
    }
    if m_max == 0 {
        return Err(CsError::config("m_max must be greater than 0"));
    }
    if m_max > n_meas {
        return Err(CsError::config(format!(
            "m_max {m_max} exceeds n_meas {n_meas}"
        )));
    }
    Ok(())
}

/// Everything the store keeps for one source node.
#[derive(Debug, Clone)]
pub struct NodeRecord {
    id: NodeId,
    seed: u32,
    n_meas: usize,
    m_max: usize,
    matrix: SensingMatrix,
    input: SampleBuffer<f64>,
    estimate: Option<Vec<f64>>,
    sparsity: Option<usize>,
    tolerance: Option<f64>,
    last_recovery: Option<Recovery>,
    stats: NodeStats,
}

impl NodeRecord {
    fn new(id: NodeId, seed: u32, n_meas: usize, m_max: usize, normalize: bool) -> Self {
        Self {
            id,
            seed,
            n_meas,
            m_max,
            matrix: SensingMatrix::generate(seed, m_max, n_meas, normalize),
            input: SampleBuffer::new(m_max),
            estimate: None,
            sparsity: None,
            tolerance: None,
            last_recovery: None,
            stats: NodeStats::default(),
        }
    }

    /// Node id.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Seed of the sensing matrix.
    #[inline]
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Original signal length.
    #[inline]
    pub fn n_meas(&self) -> usize {
        self.n_meas
    }

    /// Maximum number of measurements.
    #[inline]
    pub fn m_max(&self) -> usize {
        self.m_max
    }

    /// Sensing matrix (`m_max × n_meas`).
    #[inline]
    pub fn matrix(&self) -> &SensingMatrix {
        &self.matrix
    }

    /// Input buffer.
    #[inline]
    pub fn input(&self) -> &SampleBuffer<f64> {
        &self.input
    }

    /// Latest estimate, if the last reconstruction succeeded.
    #[inline]
    pub fn estimate(&self) -> Option<&[f64]> {
        self.estimate.as_deref()
    }

    /// Sparsity override.
    #[inline]
    pub fn sparsity(&self) -> Option<usize> {
        self.sparsity
    }

    /// Tolerance override.
    #[inline]
    pub fn tolerance(&self) -> Option<f64> {
        self.tolerance
    }

    /// Report of the latest successful reconstruction.
    #[inline]
    pub fn last_recovery(&self) -> Option<&Recovery> {
        self.last_recovery.as_ref()
    }

    /// Per-node statistics.
    #[inline]
    pub fn stats(&self) -> &NodeStats {
        &self.stats
    }

    /// Logical state derived from buffer and estimate.
    pub fn state(&self) -> NodeState {
        if self.estimate.is_some() {
            NodeState::Reconstructed
        } else if !self.input.is_empty() {
            NodeState::Buffering
        } else {
            NodeState::Registered
        }
    }
}

/// Outcome of a batch reconstruction.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Accumulated solve time of all successful nodes (microseconds)
    pub total_elapsed_us: u64,

    /// Nodes reconstructed successfully, in registration order
    pub succeeded: Vec<NodeId>,

    /// Failed nodes and their errors, in registration order
    pub failures: IndexMap<NodeId, CsError>,
}

impl BatchReport {
    /// Accumulated solve time in whole milliseconds.
    #[inline]
    pub fn total_elapsed_ms(&self) -> u64 {
        self.total_elapsed_us / 1_000
    }

    /// Number of nodes processed.
    #[inline]
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failures.len()
    }

    /// Check if every node succeeded.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Error recorded for a node, if it failed.
    pub fn failure(&self, id: NodeId) -> Option<&CsError> {
        self.failures.get(&id)
    }

    /// Total elapsed milliseconds, or [`CsError::Batch`] if any node failed.
    pub fn into_result(self) -> Result<u64> {
        if self.is_complete() {
            Ok(self.total_elapsed_ms())
        } else {
            Err(CsError::Batch {
                failed: self.failures.len(),
                total: self.total(),
            })
        }
    }
}

/// Per-node reconstruction store.
///
/// # Example
/// ```
/// use cs_cluster_reconstructor::{Reconstructor, ReconstructorConfig, SensingMatrix};
///
/// let config = ReconstructorConfig::new(64, 24).with_sparsity(2).with_tolerance(1e-9);
/// let mut rec = Reconstructor::omp(config).unwrap();
/// rec.add_src_node(1, 1234).unwrap();
///
/// // The compressing side regenerates the same matrix from the seed
/// let phi = SensingMatrix::generate(1234, 24, 64, true);
/// let mut x = vec![0.0; 64];
/// x[10] = 1.0;
/// x[50] = -0.5;
/// for y in phi.compress(&x).unwrap() {
///     rec.write(1, y).unwrap();
/// }
///
/// rec.reconstruct(1).unwrap();
/// let estimate = rec.estimate(1).unwrap().unwrap();
/// assert!((estimate[10] - 1.0).abs() < 1e-6);
/// ```
#[derive(Debug)]
pub struct Reconstructor<A: ReconstructionAlgorithm = Omp> {
    /// Configuration
    config: ReconstructorConfig,

    /// Recovery algorithm shared by all nodes
    algorithm: A,

    /// Node records in registration order
    nodes: IndexMap<NodeId, NodeRecord>,

    /// Statistics
    stats: ReconstructorStats,

    /// Per-node issues
    warnings: WarningTracker,
}

impl Reconstructor<Omp> {
    /// Create a store backed by Orthogonal Matching Pursuit.
    pub fn omp(config: ReconstructorConfig) -> Result<Self> {
        Self::new(config, Omp::new())
    }
}

impl<A: ReconstructionAlgorithm> Reconstructor<A> {
    /// Create a new store.
    ///
    /// # Errors
    /// [`CsError::Configuration`] if the configuration is invalid.
    pub fn new(config: ReconstructorConfig, algorithm: A) -> Result<Self> {
        config.validate()?;

        let warnings = WarningTracker::with_config(WarningTrackerConfig {
            log_records: config.log_warnings,
            ..Default::default()
        });

        Ok(Self {
            config,
            algorithm,
            nodes: IndexMap::new(),
            stats: ReconstructorStats::default(),
            warnings,
        })
    }

    /// Set module-wide defaults.
    ///
    /// Nodes already registered keep their dimensions.
    ///
    /// # Errors
    /// [`CsError::Configuration`] if `n_meas == 0`, `m_max == 0`,
    /// `m_max > n_meas` or the tolerance is invalid. The previous
    /// configuration is kept on error.
    pub fn setup(&mut self, n_meas: usize, m_max: usize, k: usize, tolerance: f64) -> Result<()> {
        let config = ReconstructorConfig {
            n_meas,
            m_max,
            k_default: k,
            tolerance,
            ..self.config.clone()
        };
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Register a source node with the default dimensions.
    pub fn add_src_node(&mut self, id: NodeId, seed: u32) -> Result<()> {
        self.add_src_node_with(id, seed, self.config.n_meas, self.config.m_max)
    }

    /// Register a source node.
    ///
    /// Builds its sensing matrix from `seed` and allocates an input buffer
    /// of capacity `m_max`.
    ///
    /// # Errors
    /// - [`CsError::DuplicateNode`] if `id` is already registered
    /// - [`CsError::Configuration`] if the node limit is reached or the
    ///   dimensions are invalid
    pub fn add_src_node_with(
        &mut self,
        id: NodeId,
        seed: u32,
        n_meas: usize,
        m_max: usize,
    ) -> Result<()> {
        if self.nodes.contains_key(&id) {
            return Err(CsError::DuplicateNode(id));
        }
        if self.nodes.len() >= self.config.max_nodes {
            return Err(CsError::config(format!(
                "cannot add node {id}: limit of {} source nodes reached",
                self.config.max_nodes
            )));
        }
        validate_dimensions(n_meas, m_max)?;

        let record = NodeRecord::new(id, seed, n_meas, m_max, self.config.normalize_matrix);
        self.nodes.insert(id, record);
        self.stats.node_count = self.nodes.len();

        log::debug!("Registered node {id} (seed={seed}, n={n_meas}, m={m_max})");
        Ok(())
    }

    /// Write one measurement into a node's input buffer.
    ///
    /// # Returns
    /// Free slots remaining in the buffer
    ///
    /// # Errors
    /// - [`CsError::UnknownNode`] if `id` is not registered
    /// - [`CsError::BufferFull`] if the buffer has no slot left
    pub fn write(&mut self, id: NodeId, value: f64) -> Result<usize> {
        let node = self.nodes.get_mut(&id).ok_or(CsError::UnknownNode(id))?;

        let result = node.input.write(value);
        node.stats.record_write(result.is_ok());

        if result.is_err() {
            let warning = Warning::new(
                self.warnings.next_id(),
                WarningCategory::BufferOverflow,
                format!("node {id}: sample dropped, input buffer full"),
            )
            .with_node_id(id)
            .with_measurements(node.m_max);
            self.warnings.record(warning);
        }

        result
    }

    /// Override the sparsity of one node (`None` restores the default).
    pub fn set_node_sparsity(&mut self, id: NodeId, k: Option<usize>) -> Result<()> {
        self.node_mut(id)?.sparsity = k;
        Ok(())
    }

    /// Override the tolerance of one node (`None` restores the default).
    pub fn set_node_tolerance(&mut self, id: NodeId, tolerance: Option<f64>) -> Result<()> {
        if let Some(t) = tolerance {
            if !t.is_finite() || t < 0.0 {
                return Err(CsError::config(format!("invalid tolerance {t}")));
            }
        }
        self.node_mut(id)?.tolerance = tolerance;
        Ok(())
    }

    /// Reconstruct one node with the given sparsity and iteration cap.
    ///
    /// # Arguments
    /// * `id` - Node to reconstruct
    /// * `k` - Sparsity of the solution (0: half the available measurements)
    /// * `iter_limit` - Iteration cap (0: no cap)
    ///
    /// # Returns
    /// Wall-clock time of the solve in milliseconds
    ///
    /// # Errors
    /// [`CsError::UnknownNode`], [`CsError::EmptyBuffer`] or
    /// [`CsError::Numerical`]. On failure the node's estimate is cleared.
    pub fn reconstruct_with(&mut self, id: NodeId, k: usize, iter_limit: usize) -> Result<u64> {
        let tolerance = self.config.tolerance;
        let consume = self.config.consume_input;

        let node = self.nodes.get_mut(&id).ok_or(CsError::UnknownNode(id))?;
        let m_max = node.m_max;
        let outcome = run_node(&self.algorithm, node, k, iter_limit, tolerance, consume);

        self.record_outcome(id, m_max, &outcome);
        outcome.map(|recovery| recovery.elapsed_ms())
    }

    /// Reconstruct one node with its default sparsity and no iteration cap.
    pub fn reconstruct(&mut self, id: NodeId) -> Result<u64> {
        let k = self.effective_sparsity(id)?;
        self.reconstruct_with(id, k, 0)
    }

    /// Reconstruct every node in registration order.
    ///
    /// A failing node is recorded in the report and does not stop the batch.
    pub fn reconstruct_all(&mut self) -> BatchReport {
        let ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        let mut report = BatchReport::default();

        for id in ids {
            let tolerance = self.config.tolerance;
            let consume = self.config.consume_input;
            let k_default = self.config.k_default;

            let Some(node) = self.nodes.get_mut(&id) else {
                continue;
            };
            let m_max = node.m_max;
            let k = node.sparsity.unwrap_or(k_default);
            let outcome = run_node(&self.algorithm, node, k, 0, tolerance, consume);

            self.record_outcome(id, m_max, &outcome);
            report.add(id, outcome);
        }

        self.finish_batch(&report);
        report
    }

    /// Reconstruct every node concurrently.
    ///
    /// Same semantics and report order as [`reconstruct_all`](Self::reconstruct_all);
    /// node solves run on the rayon thread pool.
    #[cfg(feature = "parallel")]
    pub fn reconstruct_all_parallel(&mut self) -> BatchReport {
        use rayon::prelude::*;

        let tolerance = self.config.tolerance;
        let consume = self.config.consume_input;
        let k_default = self.config.k_default;
        let algorithm = &self.algorithm;

        let outcomes: Vec<(NodeId, usize, Result<Recovery>)> = self
            .nodes
            .values_mut()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|node| {
                let k = node.sparsity.unwrap_or(k_default);
                let outcome = run_node(algorithm, node, k, 0, tolerance, consume);
                (node.id, node.m_max, outcome)
            })
            .collect();

        let mut report = BatchReport::default();
        for (id, m_max, outcome) in outcomes {
            self.record_outcome(id, m_max, &outcome);
            report.add(id, outcome);
        }

        self.finish_batch(&report);
        report
    }

    /// Clear one node's input buffer.
    pub fn reset_input(&mut self, id: NodeId) -> Result<()> {
        self.node_mut(id)?.input.clear();
        Ok(())
    }

    /// Clear every input buffer.
    pub fn reset_all_inputs(&mut self) {
        for node in self.nodes.values_mut() {
            node.input.clear();
        }
    }

    /// Snapshot of every node's estimate as a stream, in registration order.
    ///
    /// Nodes without an estimate contribute a zero vector.
    pub fn estimates_stream(&self, name: impl Into<String>) -> DataStream<f64> {
        let mut stream = DataStream::new(name);
        for node in self.nodes.values() {
            let estimate = node
                .estimate
                .clone()
                .unwrap_or_else(|| vec![0.0; node.n_meas]);
            stream.push(SampleBuffer::from_vec(estimate));
        }
        stream
    }

    /// Snapshot of every node's input buffer as a stream, in registration order.
    pub fn inputs_stream(&self, name: impl Into<String>) -> DataStream<f64> {
        let mut stream = DataStream::new(name);
        for node in self.nodes.values() {
            stream.push(node.input.clone());
        }
        stream
    }

    /// Get a node record.
    pub fn node(&self, id: NodeId) -> Result<&NodeRecord> {
        self.nodes.get(&id).ok_or(CsError::UnknownNode(id))
    }

    /// Iterate over node records in registration order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.values()
    }

    /// Node ids in registration order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    /// Number of registered nodes.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Check if a node is registered.
    #[inline]
    pub fn has_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Input buffer of a node.
    pub fn input(&self, id: NodeId) -> Result<&SampleBuffer<f64>> {
        Ok(&self.node(id)?.input)
    }

    /// Latest estimate of a node.
    pub fn estimate(&self, id: NodeId) -> Result<Option<&[f64]>> {
        Ok(self.node(id)?.estimate())
    }

    /// Report of a node's latest successful reconstruction.
    pub fn last_recovery(&self, id: NodeId) -> Result<Option<&Recovery>> {
        Ok(self.node(id)?.last_recovery())
    }

    /// Statistics of one node.
    pub fn node_stats(&self, id: NodeId) -> Result<&NodeStats> {
        Ok(&self.node(id)?.stats)
    }

    /// Current configuration.
    #[inline]
    pub fn config(&self) -> &ReconstructorConfig {
        &self.config
    }

    /// Recovery algorithm.
    #[inline]
    pub fn algorithm(&self) -> &A {
        &self.algorithm
    }

    /// Store-wide statistics.
    #[inline]
    pub fn stats(&self) -> &ReconstructorStats {
        &self.stats
    }

    /// Recorded per-node issues.
    #[inline]
    pub fn warnings(&self) -> &WarningTracker {
        &self.warnings
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeRecord> {
        self.nodes.get_mut(&id).ok_or(CsError::UnknownNode(id))
    }

    fn effective_sparsity(&self, id: NodeId) -> Result<usize> {
        let node = self.node(id)?;
        Ok(node.sparsity.unwrap_or(self.config.k_default))
    }

    /// Update statistics and warnings after one node ran.
    fn record_outcome(&mut self, id: NodeId, m_max: usize, outcome: &Result<Recovery>) {
        match outcome {
            Ok(recovery) => {
                self.stats.record_success(recovery);
                log::debug!(
                    "{}: node {id} reconstructed from {} samples in {} us \
                     (support={}, residual={:.3e}, stop={})",
                    self.algorithm.name(),
                    recovery.measurements,
                    recovery.elapsed_us,
                    recovery.support.len(),
                    recovery.residual_norm,
                    recovery.stop_reason.name()
                );

                if recovery.measurements < m_max {
                    let warning = Warning::new(
                        self.warnings.next_id(),
                        WarningCategory::PartialBuffer,
                        format!(
                            "node {id}: reconstructed from {} of {m_max} measurements",
                            recovery.measurements
                        ),
                    )
                    .with_node_id(id)
                    .with_measurements(recovery.measurements);
                    self.warnings.record(warning);
                }

                let category = match recovery.stop_reason {
                    StopReason::IterationLimit => Some(WarningCategory::IterationLimit),
                    StopReason::Exhausted => Some(WarningCategory::ToleranceNotMet),
                    _ => None,
                };
                if let Some(category) = category {
                    let warning = Warning::new(
                        self.warnings.next_id(),
                        category,
                        format!(
                            "node {id}: stopped at residual {:.3e} ({})",
                            recovery.residual_norm,
                            recovery.stop_reason.name()
                        ),
                    )
                    .with_node_id(id)
                    .with_residual_norm(recovery.residual_norm);
                    self.warnings.record(warning);
                }
            }
            Err(err) => {
                self.stats.record_failure();
                let category = match err {
                    CsError::EmptyBuffer(_) => WarningCategory::EmptyBuffer,
                    CsError::Numerical(_) => WarningCategory::NumericalIssue,
                    _ => WarningCategory::Other,
                };
                self.warnings.record_node_warning(
                    category,
                    format!("node {id}: reconstruction failed: {err}"),
                    id,
                );
            }
        }
    }

    fn finish_batch(&mut self, report: &BatchReport) {
        self.stats.batches += 1;
        log::info!(
            "Batch reconstruction: {}/{} nodes succeeded in {} ms",
            report.succeeded.len(),
            report.total(),
            report.total_elapsed_ms()
        );
    }
}

impl BatchReport {
    fn add(&mut self, id: NodeId, outcome: Result<Recovery>) {
        match outcome {
            Ok(recovery) => {
                self.total_elapsed_us += recovery.elapsed_us;
                self.succeeded.push(id);
            }
            Err(err) => {
                self.failures.insert(id, err);
            }
        }
    }
}

/// Run the algorithm on one node and update the node record.
///
/// Touches nothing but `node`, so nodes can run concurrently.
fn run_node<A: ReconstructionAlgorithm>(
    algorithm: &A,
    node: &mut NodeRecord,
    k: usize,
    iter_limit: usize,
    default_tolerance: f64,
    consume: bool,
) -> Result<Recovery> {
    let m = node.input.len();
    if m == 0 {
        node.estimate = None;
        node.stats.record_failure();
        return Err(CsError::EmptyBuffer(node.id));
    }

    // A single buffered sample gives working sparsity 0 and a zero estimate
    let sparsity = if k == 0 { m / 2 } else { k };
    let params = RecoveryParams::new(sparsity, node.tolerance.unwrap_or(default_tolerance))
        .with_iteration_limit(iter_limit);

    let start = Instant::now();
    let outcome = algorithm.recover(&node.matrix, node.input.as_slice(), &params);
    let elapsed_us = start.elapsed().as_micros() as u64;

    match outcome {
        Ok(mut recovery) => {
            recovery.elapsed_us = elapsed_us;
            node.estimate = Some(recovery.estimate.clone());
            node.stats.record_success(&recovery);
            node.last_recovery = Some(recovery.clone());
            if consume {
                node.input.clear();
            }
            Ok(recovery)
        }
        Err(err) => {
            node.estimate = None;
            node.stats.record_failure();
            Err(err)
        }
    }
}
