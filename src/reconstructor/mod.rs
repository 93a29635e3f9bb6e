//! Reconstruction of node signals from buffered measurements.
//!
//! This module provides the per-node store and the recovery algorithms it
//! can be configured with.

mod algorithm;
pub mod omp;
mod store;

pub use algorithm::ReconstructionAlgorithm;
pub use omp::Omp;
pub use store::{BatchReport, NodeRecord, Reconstructor, ReconstructorConfig};
