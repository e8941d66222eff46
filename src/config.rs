use serde::{Deserialize, Serialize};

/// Hyperparameters of the extractor pipeline, passed at construction.
/// Defaults carry the documented values used in production.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Number of k-means clusters over the embedding space.
    pub cluster_count: usize,
    /// Dimensionality requested from the embedding backend.
    pub embedding_dim: usize,
    pub crf: CrfHyperparameters,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            cluster_count: 15,
            embedding_dim: 100,
            crf: CrfHyperparameters::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrfHyperparameters {
    /// L1 regularization coefficient.
    pub c1: f64,
    /// L2 regularization coefficient.
    pub c2: f64,
    pub max_iterations: usize,
}

impl Default for CrfHyperparameters {
    fn default() -> Self {
        Self {
            c1: 0.0001,
            c2: 0.01,
            max_iterations: 500,
        }
    }
}
