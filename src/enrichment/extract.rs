use std::collections::HashMap;

use anyhow::{anyhow, bail};
use log::info;
use nalgebra_sparse::CsrMatrix;
use ndarray::parallel::prelude::*;
use ndarray::{Array2, Axis};
use num_traits::{Float, Zero};
use single_utilities::traits::FloatOpsTS;

use crate::enrichment::results::ActivityTable;
use crate::enrichment::utils::{csr_nonzero_counts, subset_csr};

/// Samples × features matrix, either dense or in CSR layout.
#[derive(Debug, Clone)]
pub enum MatrixData<T> {
    Dense(Array2<T>),
    Sparse(CsrMatrix<T>),
}

impl<T> MatrixData<T> {
    pub fn nrows(&self) -> usize {
        match self {
            MatrixData::Dense(m) => m.nrows(),
            MatrixData::Sparse(m) => m.nrows(),
        }
    }

    pub fn ncols(&self) -> usize {
        match self {
            MatrixData::Dense(m) => m.ncols(),
            MatrixData::Sparse(m) => m.ncols(),
        }
    }
}

/// A matrix with sample (row) and feature (column) names.
#[derive(Debug, Clone)]
pub struct LabeledMatrix<T> {
    pub data: MatrixData<T>,
    pub samples: Vec<String>,
    pub features: Vec<String>,
}

impl<T> LabeledMatrix<T> {
    pub fn new(
        data: MatrixData<T>,
        samples: Vec<String>,
        features: Vec<String>,
    ) -> anyhow::Result<Self> {
        check_labels(&data, &samples, &features)?;
        Ok(LabeledMatrix {
            data,
            samples,
            features,
        })
    }
}

/// Unprocessed counts kept next to the main matrix. Shares the samples of
/// its container but may cover a different feature set.
#[derive(Debug, Clone)]
pub struct RawMatrix<T> {
    pub x: MatrixData<T>,
    pub var_names: Vec<String>,
}

/// Annotated data container: a main matrix, optional named layers of the
/// same shape, an optional raw matrix, and per-sample result tables stored
/// by name in `obsm`.
#[derive(Debug, Clone)]
pub struct AnnotatedMatrix<T> {
    pub x: MatrixData<T>,
    pub layers: HashMap<String, MatrixData<T>>,
    pub raw: Option<RawMatrix<T>>,
    pub obs_names: Vec<String>,
    pub var_names: Vec<String>,
    pub obsm: HashMap<String, ActivityTable<T>>,
}

impl<T> AnnotatedMatrix<T> {
    pub fn new(
        x: MatrixData<T>,
        obs_names: Vec<String>,
        var_names: Vec<String>,
    ) -> anyhow::Result<Self> {
        check_labels(&x, &obs_names, &var_names)?;
        Ok(AnnotatedMatrix {
            x,
            layers: HashMap::new(),
            raw: None,
            obs_names,
            var_names,
            obsm: HashMap::new(),
        })
    }

    pub fn add_layer(&mut self, name: &str, data: MatrixData<T>) -> anyhow::Result<()> {
        check_labels(&data, &self.obs_names, &self.var_names)?;
        self.layers.insert(name.to_string(), data);
        Ok(())
    }

    pub fn set_raw(&mut self, x: MatrixData<T>, var_names: Vec<String>) -> anyhow::Result<()> {
        check_labels(&x, &self.obs_names, &var_names)?;
        self.raw = Some(RawMatrix { x, var_names });
        Ok(())
    }
}

/// Inputs accepted by the extraction step.
#[derive(Debug, Clone, Copy)]
pub enum MatInput<'a, T> {
    Labeled(&'a LabeledMatrix<T>),
    Annotated {
        adata: &'a AnnotatedMatrix<T>,
        layer: Option<&'a str>,
        use_raw: bool,
    },
}

/// Uniform representation handed to the scoring core.
#[derive(Debug, Clone)]
pub struct Extracted<T> {
    pub data: MatrixData<T>,
    pub samples: Vec<String>,
    pub features: Vec<String>,
}

fn check_labels<T>(
    data: &MatrixData<T>,
    samples: &[String],
    features: &[String],
) -> anyhow::Result<()> {
    if data.nrows() != samples.len() {
        bail!(
            "Matrix has {} rows but {} sample names were given",
            data.nrows(),
            samples.len()
        );
    }
    if data.ncols() != features.len() {
        bail!(
            "Matrix has {} columns but {} feature names were given",
            data.ncols(),
            features.len()
        );
    }
    Ok(())
}

/// Turn any accepted input into an [`Extracted`] matrix.
///
/// Features are sorted by name. Features and samples without any non-zero
/// value are dropped. Repeated feature names and non-finite values are
/// rejected.
pub fn extract<T>(input: MatInput<'_, T>) -> anyhow::Result<Extracted<T>>
where
    T: FloatOpsTS,
{
    let (data, samples, features) = match input {
        MatInput::Labeled(m) => (&m.data, &m.samples, &m.features),
        MatInput::Annotated {
            adata,
            layer,
            use_raw,
        } => match (layer, use_raw) {
            (Some(_), true) => bail!("Cannot use both a layer and use_raw at the same time"),
            (Some(name), false) => {
                let data = adata
                    .layers
                    .get(name)
                    .ok_or_else(|| anyhow!("Layer '{}' not found", name))?;
                (data, &adata.obs_names, &adata.var_names)
            }
            (None, true) => {
                let raw = adata.raw.as_ref().ok_or_else(|| {
                    anyhow!("Received use_raw=true, but the container has no raw matrix")
                })?;
                (&raw.x, &adata.obs_names, &raw.var_names)
            }
            (None, false) => (&adata.x, &adata.obs_names, &adata.var_names),
        },
    };
    check_labels(data, samples, features)?;

    let (row_nnz, col_nnz) = nonzero_counts(data);

    let mut order: Vec<usize> = (0..features.len()).collect();
    order.sort_by(|&a, &b| features[a].cmp(&features[b]));

    let n_empty_features = col_nnz.iter().filter(|&&c| c == 0).count();
    if n_empty_features > 0 {
        info!(
            "{} features of mat are empty, they will be removed.",
            n_empty_features
        );
    }
    let kept_cols: Vec<usize> = order.into_iter().filter(|&j| col_nnz[j] > 0).collect();
    let kept_features: Vec<String> = kept_cols.iter().map(|&j| features[j].clone()).collect();

    if let Some(pair) = kept_features.windows(2).find(|w| w[0] == w[1]) {
        bail!(
            "mat contains repeated feature names ('{}'), please make them unique",
            pair[0]
        );
    }

    let kept_rows: Vec<usize> = (0..samples.len()).filter(|&i| row_nnz[i] > 0).collect();
    let n_empty_samples = samples.len() - kept_rows.len();
    if n_empty_samples > 0 {
        info!(
            "{} samples of mat are empty, they will be removed.",
            n_empty_samples
        );
    }
    let kept_samples: Vec<String> = kept_rows.iter().map(|&i| samples[i].clone()).collect();

    if !all_finite(data) {
        bail!("mat contains non finite values (nan or inf), please set them to 0 or remove them");
    }

    let data = match data {
        MatrixData::Dense(m) => {
            MatrixData::Dense(m.select(Axis(0), &kept_rows).select(Axis(1), &kept_cols))
        }
        MatrixData::Sparse(m) => {
            let mut col_map = vec![None; m.ncols()];
            for (new_col, &old_col) in kept_cols.iter().enumerate() {
                col_map[old_col] = Some(new_col);
            }
            MatrixData::Sparse(subset_csr(m, &kept_rows, &col_map, kept_cols.len())?)
        }
    };

    Ok(Extracted {
        data,
        samples: kept_samples,
        features: kept_features,
    })
}

fn nonzero_counts<T>(data: &MatrixData<T>) -> (Vec<usize>, Vec<usize>)
where
    T: FloatOpsTS,
{
    match data {
        MatrixData::Dense(m) => {
            let rows = m
                .axis_iter(Axis(0))
                .into_par_iter()
                .map(|row| row.iter().filter(|v| !Zero::is_zero(*v)).count())
                .collect();
            let cols = m
                .axis_iter(Axis(1))
                .into_par_iter()
                .map(|col| col.iter().filter(|v| !Zero::is_zero(*v)).count())
                .collect();
            (rows, cols)
        }
        MatrixData::Sparse(m) => csr_nonzero_counts(m),
    }
}

fn all_finite<T>(data: &MatrixData<T>) -> bool
where
    T: FloatOpsTS,
{
    match data {
        MatrixData::Dense(m) => m.iter().all(|&v| Float::is_finite(v)),
        MatrixData::Sparse(m) => m.values().iter().all(|&v| Float::is_finite(v)),
    }
}
