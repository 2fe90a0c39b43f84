//! Regulon activity inference for single-cell data.
//!
//! This module scores how active each source (transcription factor, pathway, …) of a
//! prior-knowledge network is in every sample of an expression matrix, using the weighted
//! sum (WSUM) method.
//!
//! ## Method
//!
//! WSUM multiplies each target feature by its edge weight and sums them into an enrichment
//! score (`wsum_estimate`). Optionally the target features are permuted `times` times to
//! build a null distribution, giving a z-score (`wsum_norm`), an empirical two-sided p-value
//! (`wsum_pvals`) and a corrected estimate (`wsum_corr`, the estimate times `-log10(p)`).
//!
//! ## Pipeline
//!
//! 1. [`extract`]: any accepted input becomes a uniform matrix with sorted features,
//!    empty samples/features removed.
//! 2. [`network`]: the long-format network is filtered by `min_n`, pivoted and aligned to
//!    the matrix features.
//! 3. [`wsum`](wsum::wsum): batched scoring.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use ndarray::array;
//! use single_wsum::enrichment::{run_wsum, Edge, LabeledMatrix, MatrixData, WsumConfig};
//!
//! let mat = LabeledMatrix::new(
//!     MatrixData::Dense(array![[1.0, 2.0, 0.5], [0.0, 1.0, 3.0]]),
//!     vec!["cell1".into(), "cell2".into()],
//!     vec!["g1".into(), "g2".into(), "g3".into()],
//! )?;
//! let net = vec![
//!     Edge::new("TF1", "g1", 1.0),
//!     Edge::new("TF1", "g2", -1.0),
//!     Edge::new("TF1", "g3", 0.5),
//! ];
//! let config = WsumConfig::default().with_min_n(3).with_times(100);
//! let tables = run_wsum(&mat, &net, &config)?;
//! println!("{:?}", tables.estimate.get("cell1", "TF1"));
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod extract;
pub mod network;
pub mod results;
pub(crate) mod utils;
pub mod wsum;

pub use config::WsumConfig;
pub use extract::{AnnotatedMatrix, Extracted, LabeledMatrix, MatInput, MatrixData, RawMatrix};
pub use network::Edge;
pub use results::{ActivityTable, WsumTables};
pub use wsum::{Activity, PermutationScores, run_perm};

use log::info;
use single_utilities::traits::FloatOpsTS;

/// Run WSUM on a labeled matrix and return the score tables.
pub fn run_wsum<T>(
    mat: &LabeledMatrix<T>,
    net: &[Edge<T>],
    config: &WsumConfig,
) -> anyhow::Result<WsumTables<T>>
where
    T: FloatOpsTS + ndarray::LinalgScalar,
{
    let extracted = extract::extract(MatInput::Labeled(mat))?;
    score(extracted, net, config)
}

/// Run WSUM on an annotated container and store the tables in its `obsm`
/// under `wsum_estimate`, `wsum_norm`, `wsum_corr` and `wsum_pvals`.
///
/// Scores `config.layer` or, with `config.use_raw`, the raw matrix instead of `x`.
pub fn run_wsum_annotated<T>(
    adata: &mut AnnotatedMatrix<T>,
    net: &[Edge<T>],
    config: &WsumConfig,
) -> anyhow::Result<()>
where
    T: FloatOpsTS + ndarray::LinalgScalar,
{
    let extracted = extract::extract(MatInput::Annotated {
        adata: &*adata,
        layer: config.layer.as_deref(),
        use_raw: config.use_raw,
    })?;
    let tables = score(extracted, net, config)?;
    for table in tables.into_tables() {
        adata.obsm.insert(table.name.clone(), table);
    }
    Ok(())
}

fn score<T>(
    extracted: Extracted<T>,
    net: &[Edge<T>],
    config: &WsumConfig,
) -> anyhow::Result<WsumTables<T>>
where
    T: FloatOpsTS + ndarray::LinalgScalar,
{
    network::check_network(net)?;
    let net = network::filter_min_targets(&extracted.features, net, config.min_n)?;
    let (sources, targets, weights) = network::weight_matrix(&net);
    let weights = network::match_features(&extracted.features, &targets, weights.view());

    if config.verbose {
        info!(
            "Running wsum on mat with {} samples and {} targets for {} sources.",
            extracted.data.nrows(),
            extracted.features.len(),
            sources.len()
        );
    }

    let activity = wsum::wsum(
        &extracted.data,
        weights.view(),
        config.times,
        config.batch_size,
        config.seed,
        config.verbose,
    )?;

    Ok(WsumTables::new(activity, extracted.samples, sources))
}
