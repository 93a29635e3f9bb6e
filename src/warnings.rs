//! Warning and issue tracking for reconstruction runs.
//!
//! Data problems on a single node (an empty or partially filled buffer, a
//! solve that hit its iteration cap, an ill-conditioned support) must not
//! abort a simulation of thousands of transmissions, but they must not
//! vanish either. They are recorded here, categorized and timestamped, and
//! can be exported for later analysis.
//!
//! # Example
//!
//! ```rust
//! use cs_cluster_reconstructor::warnings::{WarningCategory, WarningTracker};
//!
//! let mut tracker = WarningTracker::new();
//! tracker.record_node_warning(
//!     WarningCategory::PartialBuffer,
//!     "node 3 reconstructed from 6 of 10 measurements",
//!     3,
//! );
//!
//! let summary = tracker.summary();
//! assert_eq!(summary.total, 1);
//! assert_eq!(summary.unique_nodes, 1);
//! ```

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::NodeId;

/// Category of warning for classification and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningCategory {
    /// Reconstruction requested with no buffered measurements
    EmptyBuffer,

    /// Reconstruction ran on fewer measurements than the buffer capacity
    PartialBuffer,

    /// Recovery stopped at the iteration cap
    IterationLimit,

    /// Recovery finished with a residual above the tolerance
    ToleranceNotMet,

    /// Ill-conditioned or non-finite solve
    NumericalIssue,

    /// Sample rejected because the input buffer was full
    BufferOverflow,

    /// Other/uncategorized warning
    Other,
}

impl WarningCategory {
    /// Get a human-readable name for the category.
    pub fn name(&self) -> &'static str {
        match self {
            WarningCategory::EmptyBuffer => "EMPTY_BUFFER",
            WarningCategory::PartialBuffer => "PARTIAL_BUFFER",
            WarningCategory::IterationLimit => "ITERATION_LIMIT",
            WarningCategory::ToleranceNotMet => "TOLERANCE_NOT_MET",
            WarningCategory::NumericalIssue => "NUMERICAL_ISSUE",
            WarningCategory::BufferOverflow => "BUFFER_OVERFLOW",
            WarningCategory::Other => "OTHER",
        }
    }

    /// Get severity level (1=low, 2=medium, 3=high).
    pub fn severity(&self) -> u8 {
        match self {
            WarningCategory::EmptyBuffer => 3,
            WarningCategory::PartialBuffer => 1,
            WarningCategory::IterationLimit => 1,
            WarningCategory::ToleranceNotMet => 2,
            WarningCategory::NumericalIssue => 3,
            WarningCategory::BufferOverflow => 2,
            WarningCategory::Other => 1,
        }
    }
}

/// A single warning record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warning {
    /// Unique warning ID (auto-incremented)
    pub id: u64,

    /// Warning category
    pub category: WarningCategory,

    /// Human-readable message
    pub message: String,

    /// Wall clock time when warning was recorded (nanoseconds since epoch)
    pub recorded_at: u64,

    /// Related node (if applicable)
    pub node_id: Option<NodeId>,

    /// Number of measurements involved (if applicable)
    pub measurements: Option<usize>,

    /// Residual norm involved (if applicable)
    pub residual_norm: Option<f64>,

    /// Additional context as key-value pairs
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub context: HashMap<String, String>,
}

impl Warning {
    /// Create a new warning with minimal information.
    pub fn new(id: u64, category: WarningCategory, message: impl Into<String>) -> Self {
        Self {
            id,
            category,
            message: message.into(),
            recorded_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0),
            node_id: None,
            measurements: None,
            residual_norm: None,
            context: HashMap::new(),
        }
    }

    /// Set the node id.
    pub fn with_node_id(mut self, node_id: NodeId) -> Self {
        self.node_id = Some(node_id);
        self
    }

    /// Set the number of measurements.
    pub fn with_measurements(mut self, measurements: usize) -> Self {
        self.measurements = Some(measurements);
        self
    }

    /// Set the residual norm.
    pub fn with_residual_norm(mut self, residual_norm: f64) -> Self {
        self.residual_norm = Some(residual_norm);
        self
    }

    /// Add context key-value pair.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Summary statistics for warnings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WarningSummary {
    /// Total number of warnings
    pub total: u64,

    /// Count by category
    pub by_category: HashMap<String, u64>,

    /// Count by severity
    pub by_severity: HashMap<u8, u64>,

    /// Number of distinct nodes involved
    pub unique_nodes: u64,
}

/// Configuration for warning tracker.
#[derive(Debug, Clone)]
pub struct WarningTrackerConfig {
    /// Maximum number of warnings to keep in memory
    pub max_warnings: usize,

    /// Whether to forward warnings to the `log` facade
    pub log_records: bool,

    /// Minimum severity to log (1=all, 2=medium+, 3=high only)
    pub min_log_severity: u8,

    /// Whether to deduplicate identical messages
    pub deduplicate: bool,

    /// Time window for deduplication (nanoseconds)
    pub dedupe_window_ns: u64,
}

impl Default for WarningTrackerConfig {
    fn default() -> Self {
        Self {
            max_warnings: 100_000,
            log_records: true,
            min_log_severity: 2,
            deduplicate: true,
            dedupe_window_ns: 1_000_000_000, // 1 second
        }
    }
}

#[derive(Serialize)]
struct WarningExport<'a> {
    summary: WarningSummary,
    warnings: &'a [Warning],
}

/// Warning tracker for reconstruction runs.
#[derive(Debug)]
pub struct WarningTracker {
    /// Configuration
    config: WarningTrackerConfig,

    /// Stored warnings
    warnings: Vec<Warning>,

    /// Counter for unique IDs
    next_id: AtomicU64,

    /// Count by category (for fast summary)
    category_counts: AHashMap<WarningCategory, u64>,

    /// Recent warnings for deduplication (category -> (message_hash, timestamp))
    recent: AHashMap<WarningCategory, Vec<(u64, u64)>>,

    /// Node ids seen in warnings
    unique_nodes: AHashSet<NodeId>,

    /// Counted but not stored because of deduplication
    suppressed: u64,
}

impl WarningTracker {
    /// Create a new warning tracker with default configuration.
    pub fn new() -> Self {
        Self::with_config(WarningTrackerConfig::default())
    }

    /// Create a new warning tracker with custom configuration.
    pub fn with_config(config: WarningTrackerConfig) -> Self {
        Self {
            config,
            warnings: Vec::new(),
            next_id: AtomicU64::new(1),
            category_counts: AHashMap::new(),
            recent: AHashMap::new(),
            unique_nodes: AHashSet::new(),
            suppressed: 0,
        }
    }

    /// Record a warning.
    ///
    /// Every warning is counted and logged. Deduplication only limits what is
    /// stored: a repeat of a message seen within the dedupe window is not kept.
    ///
    /// Returns the warning ID if stored, or None if deduplicated.
    pub fn record(&mut self, warning: Warning) -> Option<u64> {
        if self.config.log_records && warning.category.severity() >= self.config.min_log_severity
        {
            log::warn!(
                "[{}] #{}: {}",
                warning.category.name(),
                warning.id,
                warning.message
            );
        }

        if let Some(node_id) = warning.node_id {
            self.unique_nodes.insert(node_id);
        }

        *self.category_counts.entry(warning.category).or_insert(0) += 1;

        if self.config.deduplicate {
            let msg_hash = self.hash_message(&warning.message);
            let now = warning.recorded_at;
            let window = self.config.dedupe_window_ns;

            let recent_list = self.recent.entry(warning.category).or_default();
            recent_list.retain(|(_, ts)| now.saturating_sub(*ts) < window);
            if recent_list.iter().any(|(h, _)| *h == msg_hash) {
                self.suppressed += 1;
                return None;
            }
            recent_list.push((msg_hash, now));
        }

        let id = warning.id;

        if self.warnings.len() < self.config.max_warnings {
            self.warnings.push(warning);
        }

        Some(id)
    }

    /// Record a simple warning with just category and message.
    pub fn record_simple(
        &mut self,
        category: WarningCategory,
        message: impl Into<String>,
    ) -> Option<u64> {
        let id = self.next_id();
        self.record(Warning::new(id, category, message))
    }

    /// Record a warning about one node.
    pub fn record_node_warning(
        &mut self,
        category: WarningCategory,
        message: impl Into<String>,
        node_id: NodeId,
    ) -> Option<u64> {
        let id = self.next_id();
        self.record(Warning::new(id, category, message).with_node_id(node_id))
    }

    /// Allocate the next warning ID.
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Get the number of warnings stored.
    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// Check if no warnings have been stored.
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Get total count of recorded warnings.
    pub fn total_count(&self) -> u64 {
        self.category_counts.values().sum()
    }

    /// Get the number of warnings counted but not stored as duplicates.
    pub fn suppressed_count(&self) -> u64 {
        self.suppressed
    }

    /// Get count for a specific category.
    pub fn count_by_category(&self, category: WarningCategory) -> u64 {
        self.category_counts.get(&category).copied().unwrap_or(0)
    }

    /// Get all warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Get warnings for one node.
    pub fn warnings_for_node(&self, node_id: NodeId) -> Vec<&Warning> {
        self.warnings
            .iter()
            .filter(|w| w.node_id == Some(node_id))
            .collect()
    }

    /// Get summary statistics.
    pub fn summary(&self) -> WarningSummary {
        let mut by_category = HashMap::new();
        let mut by_severity = HashMap::new();

        for (cat, count) in &self.category_counts {
            by_category.insert(cat.name().to_string(), *count);
            *by_severity.entry(cat.severity()).or_insert(0) += *count;
        }

        WarningSummary {
            total: self.total_count(),
            by_category,
            by_severity,
            unique_nodes: self.unique_nodes.len() as u64,
        }
    }

    /// Export summary and warnings to a JSON file.
    pub fn export_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        let export = WarningExport {
            summary: self.summary(),
            warnings: &self.warnings,
        };
        serde_json::to_writer_pretty(&mut writer, &export)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

        writer.flush()
    }

    /// Clear all warnings.
    pub fn clear(&mut self) {
        self.warnings.clear();
        self.category_counts.clear();
        self.recent.clear();
        self.unique_nodes.clear();
        self.suppressed = 0;
    }

    /// Simple hash for deduplication.
    fn hash_message(&self, message: &str) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        message.hash(&mut hasher);
        hasher.finish()
    }
}

impl Default for WarningTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config() -> WarningTrackerConfig {
        WarningTrackerConfig {
            log_records: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_warning_category_names() {
        assert_eq!(WarningCategory::EmptyBuffer.name(), "EMPTY_BUFFER");
        assert_eq!(WarningCategory::PartialBuffer.name(), "PARTIAL_BUFFER");
    }

    #[test]
    fn test_warning_category_severity() {
        assert_eq!(WarningCategory::PartialBuffer.severity(), 1);
        assert_eq!(WarningCategory::NumericalIssue.severity(), 3);
    }

    #[test]
    fn test_warning_creation() {
        let warning = Warning::new(1, WarningCategory::ToleranceNotMet, "residual too large")
            .with_node_id(4)
            .with_measurements(12)
            .with_residual_norm(0.5)
            .with_context("tolerance", "1e-6");

        assert_eq!(warning.id, 1);
        assert_eq!(warning.node_id, Some(4));
        assert_eq!(warning.measurements, Some(12));
        assert_eq!(warning.residual_norm, Some(0.5));
        assert_eq!(warning.context.get("tolerance"), Some(&"1e-6".to_string()));
    }

    #[test]
    fn test_warning_tracker_basic() {
        let mut tracker = WarningTracker::with_config(quiet_config());

        tracker.record_node_warning(WarningCategory::EmptyBuffer, "node 1 empty", 1);
        tracker.record_node_warning(WarningCategory::EmptyBuffer, "node 2 empty", 2);
        tracker.record_simple(WarningCategory::Other, "something else");

        assert_eq!(tracker.len(), 3);
        assert_eq!(tracker.count_by_category(WarningCategory::EmptyBuffer), 2);
        assert_eq!(tracker.warnings_for_node(2).len(), 1);
    }

    #[test]
    fn test_warning_tracker_deduplication() {
        let mut config = quiet_config();
        config.dedupe_window_ns = 1_000_000_000_000;
        let mut tracker = WarningTracker::with_config(config);

        let id1 = tracker.record_node_warning(WarningCategory::EmptyBuffer, "node 1 empty", 1);
        let id2 = tracker.record_node_warning(WarningCategory::EmptyBuffer, "node 1 empty", 1);

        assert!(id1.is_some());
        assert!(id2.is_none());
        assert_eq!(tracker.len(), 1);

        // Duplicates are still counted
        assert_eq!(tracker.count_by_category(WarningCategory::EmptyBuffer), 2);
        assert_eq!(tracker.total_count(), 2);
        assert_eq!(tracker.summary().total, 2);
        assert_eq!(tracker.suppressed_count(), 1);
    }

    #[test]
    fn test_warning_tracker_summary() {
        let mut tracker = WarningTracker::with_config(quiet_config());

        tracker.record_node_warning(WarningCategory::PartialBuffer, "node 1 partial", 1);
        tracker.record_node_warning(WarningCategory::PartialBuffer, "node 2 partial", 2);
        tracker.record_node_warning(WarningCategory::NumericalIssue, "node 2 singular", 2);

        let summary = tracker.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.unique_nodes, 2);
        assert_eq!(summary.by_category.get("PARTIAL_BUFFER"), Some(&2));
        assert_eq!(summary.by_severity.get(&3), Some(&1));
    }

    #[test]
    fn test_export_to_file() {
        let mut tracker = WarningTracker::with_config(quiet_config());
        tracker.record_node_warning(WarningCategory::EmptyBuffer, "node 9 empty", 9);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warnings.json");
        tracker.export_to_file(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["summary"]["total"], 1);
        assert_eq!(json["warnings"][0]["node_id"], 9);
    }

    #[test]
    fn test_clear() {
        let mut tracker = WarningTracker::with_config(quiet_config());
        tracker.record_simple(WarningCategory::Other, "x");
        tracker.clear();
        assert!(tracker.is_empty());
        assert_eq!(tracker.total_count(), 0);
    }
}
