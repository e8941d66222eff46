use std::collections::HashMap;
use std::sync::Mutex;

use itertools::Itertools;
use log::debug;
use ndarray::{Array1, ArrayView1};

use crate::embedding::WordVectors;
use crate::errors::*;

const MAX_ITERATIONS: usize = 100;
const CONVERGENCE_THRESHOLD: f32 = 1e-6;

/// Discrete cluster id lookup, used as a categorical feature.
pub trait WordClusterer: Send + Sync {
    fn get_cluster(&self, word: &str) -> Option<String>;
}

/// Partition of the embedding space obtained with Lloyd's algorithm.
/// Initialization is deterministic (first point, then farthest point) so
/// that training is reproducible.
#[derive(Debug)]
pub struct KMeansModel {
    centroids: Vec<Array1<f32>>,
}

impl KMeansModel {
    pub fn fit(points: &[Array1<f32>], k: usize) -> Result<Self> {
        if points.len() < k {
            return Err(SlotExtractionError::NotEnoughWordVectors {
                required: k,
                found: points.len(),
            }
            .into());
        }

        let mut centroids = farthest_point_init(points, k);
        let mut assignments = vec![0usize; points.len()];

        for iteration in 0..MAX_ITERATIONS {
            for (point_index, point) in points.iter().enumerate() {
                assignments[point_index] = nearest(&centroids, point.view());
            }

            let new_centroids = recompute_centroids(points, &assignments, &centroids);
            let max_movement = centroids
                .iter()
                .zip(new_centroids.iter())
                .map(|(old, new)| squared_distance(old.view(), new.view()).sqrt())
                .fold(0.0f32, f32::max);
            centroids = new_centroids;

            if max_movement < CONVERGENCE_THRESHOLD {
                debug!("k-means converged after {} iterations", iteration + 1);
                break;
            }
        }

        Ok(Self { centroids })
    }

    pub fn nearest_cluster(&self, vector: ArrayView1<f32>) -> usize {
        nearest(&self.centroids, vector)
    }

    pub fn cluster_count(&self) -> usize {
        self.centroids.len()
    }
}

fn squared_distance(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

fn nearest(centroids: &[Array1<f32>], vector: ArrayView1<f32>) -> usize {
    centroids
        .iter()
        .map(|centroid| squared_distance(centroid.view(), vector))
        .position_min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .unwrap_or(0)
}

fn farthest_point_init(points: &[Array1<f32>], k: usize) -> Vec<Array1<f32>> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[0].clone());
    let mut min_distances = vec![f32::MAX; points.len()];
    // Index of the most recently added centroid within `points`
    let mut latest = 0;

    while centroids.len() < k {
        for (point_index, point) in points.iter().enumerate() {
            let distance = squared_distance(point.view(), points[latest].view());
            if distance < min_distances[point_index] {
                min_distances[point_index] = distance;
            }
        }
        let farthest = min_distances
            .iter()
            .position_max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap_or(0);
        latest = farthest;
        centroids.push(points[farthest].clone());
    }
    centroids
}

fn recompute_centroids(
    points: &[Array1<f32>],
    assignments: &[usize],
    previous: &[Array1<f32>],
) -> Vec<Array1<f32>> {
    let dim = points[0].len();
    let mut sums = vec![Array1::<f32>::zeros(dim); previous.len()];
    let mut counts = vec![0usize; previous.len()];

    for (point, &cluster) in points.iter().zip(assignments.iter()) {
        sums[cluster] += point;
        counts[cluster] += 1;
    }

    sums.into_iter()
        .zip(counts.into_iter())
        .enumerate()
        .map(|(cluster, (mut sum, count))| {
            if count > 0 {
                sum /= count as f32;
                sum
            } else {
                // An empty cluster keeps its previous centroid
                previous[cluster].clone()
            }
        })
        .collect()
}

/// Word clusterer derived from trained embeddings: the vocabulary observed in
/// the training corpus is partitioned with k-means, and cluster lookups are
/// memoized per word during feature extraction.
pub struct KMeansWordClusterer {
    model: KMeansModel,
    word_vectors: Box<dyn WordVectors>,
    cache: Mutex<HashMap<String, Option<String>>>,
}

impl std::fmt::Debug for KMeansWordClusterer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KMeansWordClusterer")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl KMeansWordClusterer {
    pub fn fit(word_vectors: Box<dyn WordVectors>, words: &[String], k: usize) -> Result<Self> {
        let points: Vec<Array1<f32>> = words
            .iter()
            .unique()
            .filter_map(|word| word_vectors.vector(word).map(|vector| vector.to_owned()))
            .collect();
        debug!(
            "Clustering {} distinct word vectors into {} clusters",
            points.len(),
            k
        );
        let model = KMeansModel::fit(&points, k)?;
        Ok(Self {
            model,
            word_vectors,
            cache: Mutex::new(HashMap::new()),
        })
    }
}

impl WordClusterer for KMeansWordClusterer {
    fn get_cluster(&self, word: &str) -> Option<String> {
        if let Ok(cache) = self.cache.lock() {
            if let Some(cached) = cache.get(word) {
                return cached.clone();
            }
        }
        let cluster = self
            .word_vectors
            .vector(word)
            .map(|vector| self.model.nearest_cluster(vector).to_string());
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(word.to_string(), cluster.clone());
        }
        cluster
    }
}
