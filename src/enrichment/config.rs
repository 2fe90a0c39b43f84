/// Run parameters for [`run_wsum`](crate::enrichment::run_wsum).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsumConfig {
    /// Number of random permutations. Values of 0 or 1 skip the null entirely.
    pub times: usize,
    /// Samples per dense block when the input is sparse.
    pub batch_size: usize,
    /// Minimum number of matched targets a source needs to be scored.
    pub min_n: usize,
    /// Seed for the permutation generator.
    pub seed: u64,
    /// Show a progress bar over batches.
    pub verbose: bool,
    /// Layer of an annotated container to score instead of its main matrix.
    pub layer: Option<String>,
    /// Score the raw matrix of an annotated container. Exclusive with `layer`.
    pub use_raw: bool,
}

impl Default for WsumConfig {
    fn default() -> Self {
        Self {
            times: 1000,
            batch_size: 10000,
            min_n: 5,
            seed: 42,
            verbose: false,
            layer: None,
            use_raw: false,
        }
    }
}

impl WsumConfig {
    pub fn with_times(mut self, times: usize) -> Self {
        self.times = times;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_min_n(mut self, min_n: usize) -> Self {
        self.min_n = min_n;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_layer(mut self, layer: &str) -> Self {
        self.layer = Some(layer.to_string());
        self
    }

    pub fn with_use_raw(mut self, use_raw: bool) -> Self {
        self.use_raw = use_raw;
        self
    }
}
