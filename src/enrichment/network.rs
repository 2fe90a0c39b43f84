use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use anyhow::bail;
use ndarray::{Array2, ArrayView2};
use num_traits::Zero;

/// One row of a long-format network: `source` regulates `target` with `weight`.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge<T> {
    pub source: String,
    pub target: String,
    pub weight: T,
}

impl<T> Edge<T> {
    pub fn new(source: &str, target: &str, weight: T) -> Self {
        Edge {
            source: source.to_string(),
            target: target.to_string(),
            weight,
        }
    }
}

/// Reject networks that list the same source-target pair more than once.
pub fn check_network<T>(edges: &[Edge<T>]) -> anyhow::Result<()> {
    let mut seen = HashSet::with_capacity(edges.len());
    for edge in edges {
        if !seen.insert((edge.source.as_str(), edge.target.as_str())) {
            bail!(
                "net contains repeated edges ('{}' -> '{}'), please remove them",
                edge.source,
                edge.target
            );
        }
    }
    Ok(())
}

/// Keep edges whose target is one of `features`, then drop sources with
/// fewer than `min_n` remaining targets.
pub fn filter_min_targets<T>(
    features: &[String],
    edges: &[Edge<T>],
    min_n: usize,
) -> anyhow::Result<Vec<Edge<T>>>
where
    T: Clone,
{
    let features: HashSet<&str> = features.iter().map(String::as_str).collect();
    let matched: Vec<&Edge<T>> = edges
        .iter()
        .filter(|e| features.contains(e.target.as_str()))
        .collect();

    let mut n_targets: HashMap<&str, usize> = HashMap::new();
    for edge in &matched {
        *n_targets.entry(edge.source.as_str()).or_insert(0) += 1;
    }

    let kept: Vec<Edge<T>> = matched
        .into_iter()
        .filter(|e| n_targets[e.source.as_str()] >= min_n)
        .cloned()
        .collect();

    if kept.is_empty() {
        bail!(
            "No sources with more than min_n={} targets. Make sure mat and net have shared target features or reduce the number assigned to min_n",
            min_n
        );
    }
    Ok(kept)
}

/// Pivot edges into a targets × sources weight matrix. Both axes are sorted
/// by name and absent pairs are zero.
pub fn weight_matrix<T>(edges: &[Edge<T>]) -> (Vec<String>, Vec<String>, Array2<T>)
where
    T: Clone + Zero,
{
    let sources: Vec<String> = edges
        .iter()
        .map(|e| e.source.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let targets: Vec<String> = edges
        .iter()
        .map(|e| e.target.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let source_pos: BTreeMap<&str, usize> = sources
        .iter()
        .enumerate()
        .map(|(i, s)| (s.as_str(), i))
        .collect();
    let target_pos: BTreeMap<&str, usize> = targets
        .iter()
        .enumerate()
        .map(|(i, t)| (t.as_str(), i))
        .collect();

    let mut mat = Array2::zeros((targets.len(), sources.len()));
    for edge in edges {
        let i = target_pos[edge.target.as_str()];
        let j = source_pos[edge.source.as_str()];
        mat[[i, j]] = edge.weight.clone();
    }

    (sources, targets, mat)
}

/// Align the rows of a targets × sources matrix to `features`. Row `i` of the
/// result holds the weights of `features[i]`, or zeros when it is not a target.
pub fn match_features<T>(features: &[String], targets: &[String], net: ArrayView2<T>) -> Array2<T>
where
    T: Clone + Zero,
{
    let target_pos: HashMap<&str, usize> = targets
        .iter()
        .enumerate()
        .map(|(i, t)| (t.as_str(), i))
        .collect();

    let mut matched = Array2::zeros((features.len(), net.ncols()));
    for (i, feature) in features.iter().enumerate() {
        if let Some(&j) = target_pos.get(feature.as_str()) {
            matched.row_mut(i).assign(&net.row(j));
        }
    }
    matched
}
