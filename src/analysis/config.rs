/// Tunables for the k-means grouping of acceleration vectors.
#[derive(Debug, Clone)]
pub struct ClusteringConfig {
    /// Independent k-means++ restarts; the lowest-inertia run wins.
    pub n_init: usize,

    pub max_iterations: usize,

    /// Fixed so that the same rows always get the same labels.
    pub seed: u64,

    /// Stop once the summed squared centroid shift falls to this value.
    pub tolerance: f64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            n_init: 10,
            max_iterations: 300,
            seed: 42,
            tolerance: 1e-4,
        }
    }
}
