//! # single-wsum
//!
//! Weighted-sum (WSUM) regulon activity scoring for single-cell data, part of the single-rust ecosystem.
//!
//! Given a samples × features expression matrix and a prior-knowledge network of weighted
//! source → target edges, this crate scores the activity of every source in every sample. A
//! permutation null over the target features turns the raw scores into z-scores, empirical
//! p-values and p-value corrected scores.
//!
//! ## Core Features
//!
//! - **WSUM Estimate**: Weighted sum of target expression per source
//! - **Permutation Null**: Seeded, reproducible label shuffling with z-scores and two-sided p-values
//! - **Sparse Matrix Support**: `CsrMatrix` input from nalgebra-sparse, densified in bounded batches
//! - **Network Handling**: Long-format edge lists filtered, pivoted and aligned to the matrix
//!
//! ## Quick Start
//!
//! Build a [`enrichment::LabeledMatrix`] (or an [`enrichment::AnnotatedMatrix`]), a list of
//! [`enrichment::Edge`]s, and call [`enrichment::run_wsum`] with a [`enrichment::WsumConfig`].
//!
//! ## Module Organization
//!
//! - **[`enrichment`]**: Input extraction, network processing and WSUM scoring

pub mod enrichment;
