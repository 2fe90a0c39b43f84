// Weighted sum (WSUM) activity scoring, following the decoupler method:
// https://github.com/scverse/decoupler/blob/main/src/decoupler/mt/_wsum.py

use anyhow::{anyhow, bail};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressIterator};
use log::debug;
use ndarray::{Array2, ArrayView2, Axis, Zip, s};
use num_traits::Float;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use single_utilities::traits::FloatOpsTS;

use crate::enrichment::extract::MatrixData;
use crate::enrichment::utils::csr_rows_to_dense;

/// Scores of one permutation run over a dense block of samples.
#[derive(Debug, Clone)]
pub struct PermutationScores<T> {
    /// Raw weighted sum, `mat · net`.
    pub estimate: Array2<T>,
    /// Z-score of the estimate against the permutation null.
    pub norm: Array2<T>,
    /// Estimate scaled by `-log10(pvals)`.
    pub corr: Array2<T>,
    /// Two-sided empirical p-values.
    pub pvals: Array2<T>,
}

/// Output of the batched driver. `norm`, `corr` and `pvals` are only present
/// when more than one permutation was requested.
#[derive(Debug, Clone)]
pub struct Activity<T> {
    pub estimate: Array2<T>,
    pub norm: Option<Array2<T>>,
    pub corr: Option<Array2<T>>,
    pub pvals: Option<Array2<T>>,
}

impl<T> Activity<T> {
    pub fn has_null(&self) -> bool {
        self.pvals.is_some()
    }
}

impl<T> From<PermutationScores<T>> for Activity<T> {
    fn from(scores: PermutationScores<T>) -> Self {
        Activity {
            estimate: scores.estimate,
            norm: Some(scores.norm),
            corr: Some(scores.corr),
            pvals: Some(scores.pvals),
        }
    }
}

/// Weighted sum of a dense block with a permutation null.
///
/// `idxs` holds the current ordering of the feature axis of `net` and is
/// shuffled in place `times` times. The generator is reseeded with `seed` on
/// every call, so two calls only draw the same permutations if `idxs` starts
/// from the same ordering.
///
/// Empirical p-values never reach 0 or 1: a count of 0 is raised to 1 and a
/// count of `times` is lowered to `times - 1` before folding to two-sided.
/// A zero or negative null variance propagates as `inf`/`NaN` in `norm`.
pub fn run_perm<T>(
    mat: ArrayView2<T>,
    net: ArrayView2<T>,
    idxs: &mut [usize],
    times: usize,
    seed: u64,
) -> anyhow::Result<PermutationScores<T>>
where
    T: FloatOpsTS + ndarray::LinalgScalar,
{
    if times < 2 {
        bail!("At least 2 permutations are required, got {}", times);
    }
    if mat.ncols() != net.nrows() {
        bail!(
            "Matrix has {} features but the network has {} rows",
            mat.ncols(),
            net.nrows()
        );
    }
    if idxs.len() != net.nrows() {
        bail!(
            "Index buffer has length {} but the network has {} rows",
            idxs.len(),
            net.nrows()
        );
    }

    let estimate = mat.dot(&net);
    let mut rng = StdRng::seed_from_u64(seed);

    let shape = estimate.raw_dim();
    let abs_estimate = estimate.mapv(|v| Float::abs(v));
    let mut counts = Array2::<T>::zeros(shape);
    let mut sum_permuted = Array2::<T>::zeros(shape);
    let mut sum_squares_permuted = Array2::<T>::zeros(shape);

    for _ in 0..times {
        idxs.shuffle(&mut rng);
        let permuted = mat.dot(&net.select(Axis(0), idxs));
        Zip::from(&mut counts)
            .and(&mut sum_permuted)
            .and(&mut sum_squares_permuted)
            .and(&permuted)
            .and(&abs_estimate)
            .for_each(|count, sum, sum_sq, &p, &abs_e| {
                if Float::abs(p) > abs_e {
                    *count = *count + T::one();
                }
                *sum = *sum + p;
                *sum_sq = *sum_sq + p * p;
            });
    }

    let n = <T as num_traits::NumCast>::from(times)
        .ok_or_else(|| anyhow!("Cannot represent {} permutations as float", times))?;
    let one = T::one();
    let two = one + one;
    let half = one / two;

    let pvals = counts.mapv(|count| {
        let count = if count == T::zero() {
            one
        } else if count == n {
            n - one
        } else {
            count
        };
        let p = count / n;
        let p = if p >= half { one - p } else { p };
        p * two
    });

    let mean_permuted = sum_permuted.mapv(|sum| sum / n);
    // Not the textbook unbiased estimator: only the squared mean carries the n / (n - 1) factor.
    let std_permuted = Zip::from(&sum_squares_permuted)
        .and(&mean_permuted)
        .map_collect(|&sum_sq, &mean| Float::sqrt(sum_sq / n - mean * mean * n / (n - one)));

    let norm = Zip::from(&estimate)
        .and(&mean_permuted)
        .and(&std_permuted)
        .map_collect(|&e, &mean, &std| (e - mean) / std);
    let corr = Zip::from(&estimate)
        .and(&pvals)
        .map_collect(|&e, &p| e * -Float::log10(p));

    Ok(PermutationScores {
        estimate,
        norm,
        corr,
        pvals,
    })
}

/// Batched WSUM driver.
///
/// Dense input is scored in one pass. Sparse input is split into blocks of
/// `batch_size` samples which are densified one at a time, bounding peak
/// memory to `batch_size × features`.
///
/// With `times <= 1` only the estimate is computed and no generator is
/// created. Otherwise one feature index buffer lives for the whole call and
/// carries its shuffled state from one batch into the next, while each batch
/// reseeds with `seed`. Results are therefore reproducible for a fixed
/// `batch_size` but change when the batching changes.
pub fn wsum<T>(
    mat: &MatrixData<T>,
    net: ArrayView2<T>,
    times: usize,
    batch_size: usize,
    seed: u64,
    verbose: bool,
) -> anyhow::Result<Activity<T>>
where
    T: FloatOpsTS + ndarray::LinalgScalar,
{
    let n_samples = mat.nrows();
    let (n_features, n_sources) = net.dim();

    if mat.ncols() != n_features {
        bail!(
            "Matrix has {} features but the network has {} rows",
            mat.ncols(),
            n_features
        );
    }
    if batch_size == 0 {
        bail!("Batch size must be greater than 0");
    }

    let permute = times > 1;
    let mut idxs: Vec<usize> = (0..n_features).collect();

    match mat {
        MatrixData::Dense(dense) => {
            if permute {
                Ok(run_perm(dense.view(), net, &mut idxs, times, seed)?.into())
            } else {
                Ok(Activity {
                    estimate: dense.dot(&net),
                    norm: None,
                    corr: None,
                    pvals: None,
                })
            }
        }
        MatrixData::Sparse(sparse) => {
            let mut estimate = Array2::<T>::zeros((n_samples, n_sources));
            let mut null = if permute {
                Some((
                    Array2::<T>::zeros((n_samples, n_sources)),
                    Array2::<T>::zeros((n_samples, n_sources)),
                    Array2::<T>::zeros((n_samples, n_sources)),
                ))
            } else {
                None
            };

            let n_batches = n_samples.div_ceil(batch_size);
            let pb = ProgressBar::new(n_batches as u64);
            if !verbose {
                pb.set_draw_target(ProgressDrawTarget::hidden());
            }

            for i in (0..n_batches).progress_with(pb) {
                let srt = i * batch_size;
                let end = (srt + batch_size).min(n_samples);
                debug!("wsum batch {}/{}: rows {}..{}", i + 1, n_batches, srt, end);

                let block = csr_rows_to_dense(sparse, srt, end);
                match null.as_mut() {
                    Some((norm, corr, pvals)) => {
                        let scores = run_perm(block.view(), net, &mut idxs, times, seed)?;
                        estimate.slice_mut(s![srt..end, ..]).assign(&scores.estimate);
                        norm.slice_mut(s![srt..end, ..]).assign(&scores.norm);
                        corr.slice_mut(s![srt..end, ..]).assign(&scores.corr);
                        pvals.slice_mut(s![srt..end, ..]).assign(&scores.pvals);
                    }
                    None => {
                        estimate
                            .slice_mut(s![srt..end, ..])
                            .assign(&block.dot(&net));
                    }
                }
            }

            let (norm, corr, pvals) = match null {
                Some((norm, corr, pvals)) => (Some(norm), Some(corr), Some(pvals)),
                None => (None, None, None),
            };
            Ok(Activity {
                estimate,
                norm,
                corr,
                pvals,
            })
        }
    }
}
