use ndarray::Array2;

use crate::enrichment::wsum::Activity;

pub const ESTIMATE_NAME: &str = "wsum_estimate";
pub const NORM_NAME: &str = "wsum_norm";
pub const CORR_NAME: &str = "wsum_corr";
pub const PVALS_NAME: &str = "wsum_pvals";

/// Samples × sources score table with row and column labels.
#[derive(Debug, Clone)]
pub struct ActivityTable<T> {
    pub name: String,
    pub samples: Vec<String>,
    pub sources: Vec<String>,
    pub values: Array2<T>,
}

impl<T: Copy> ActivityTable<T> {
    pub fn new(name: &str, samples: Vec<String>, sources: Vec<String>, values: Array2<T>) -> Self {
        ActivityTable {
            name: name.to_string(),
            samples,
            sources,
            values,
        }
    }

    pub fn get(&self, sample: &str, source: &str) -> Option<T> {
        let i = self.samples.iter().position(|s| s == sample)?;
        let j = self.sources.iter().position(|s| s == source)?;
        Some(self.values[[i, j]])
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }
}

/// WSUM outputs as labeled tables. Only `estimate` is present when no
/// permutations were run.
#[derive(Debug, Clone)]
pub struct WsumTables<T> {
    pub estimate: ActivityTable<T>,
    pub norm: Option<ActivityTable<T>>,
    pub corr: Option<ActivityTable<T>>,
    pub pvals: Option<ActivityTable<T>>,
}

impl<T: Copy> WsumTables<T> {
    pub fn new(activity: Activity<T>, samples: Vec<String>, sources: Vec<String>) -> Self {
        let table = |name: &str, values: Array2<T>| {
            ActivityTable::new(name, samples.clone(), sources.clone(), values)
        };
        WsumTables {
            estimate: table(ESTIMATE_NAME, activity.estimate),
            norm: activity.norm.map(|v| table(NORM_NAME, v)),
            corr: activity.corr.map(|v| table(CORR_NAME, v)),
            pvals: activity.pvals.map(|v| table(PVALS_NAME, v)),
        }
    }

    pub fn into_tables(self) -> Vec<ActivityTable<T>> {
        let mut tables = vec![self.estimate];
        tables.extend(self.norm);
        tables.extend(self.corr);
        tables.extend(self.pvals);
        tables
    }
}
