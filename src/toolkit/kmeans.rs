use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use ndarray::prelude::*;

use crate::configurations::KMeansConfig;
use crate::errors::*;
use crate::models::ProcessedIntent;
use crate::toolkit::Clusterer;

/// Utterance clusters computed over the training vocabulary of a language
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterTable {
    vocabulary: BTreeMap<String, usize>,
    /// matrix with shape (k, v)
    centroids: Array2<f32>,
}

impl ClusterTable {
    pub fn nb_clusters(&self) -> usize {
        self.centroids.dim().0
    }

    /// Number of tokens that belong to the training vocabulary
    pub fn vocabulary_coverage(&self, tokens: &[String]) -> usize {
        tokens
            .iter()
            .filter(|token| self.vocabulary.contains_key(*token))
            .count()
    }

    /// Index of the closest cluster, if any token is known
    pub fn nearest(&self, tokens: &[String]) -> Option<usize> {
        if self.nb_clusters() == 0 {
            return None;
        }
        let vector = vectorize(&self.vocabulary, tokens)?;
        Some(nearest_centroid(&self.centroids, &vector.view()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct KMeansClusterer {
    config: KMeansConfig,
}

impl KMeansClusterer {
    pub fn new(config: KMeansConfig) -> Self {
        Self { config }
    }
}

impl Clusterer for KMeansClusterer {
    fn compute_clusters(&self, intents: &[ProcessedIntent]) -> Result<ClusterTable> {
        let documents: Vec<Vec<String>> = intents
            .iter()
            .flat_map(|intent| intent.utterances.iter())
            .map(|utterance| utterance.token_values())
            .collect();
        let vocabulary: BTreeMap<String, usize> = documents
            .iter()
            .flat_map(|document| document.iter().cloned())
            .collect::<BTreeSet<String>>()
            .into_iter()
            .enumerate()
            .map(|(index, token)| (token, index))
            .collect();
        let vectors: Vec<Array1<f32>> = documents
            .iter()
            .filter_map(|document| vectorize(&vocabulary, document))
            .collect();
        let nb_clusters = self.config.max_clusters.min(vectors.len());
        let mut centroids = init_centroids(&vectors, nb_clusters, vocabulary.len());
        for iteration in 0..self.config.max_iterations {
            let assignments: Vec<usize> = vectors
                .iter()
                .map(|vector| nearest_centroid(&centroids, &vector.view()))
                .collect();
            let updated_centroids = update_centroids(&centroids, &vectors, &assignments);
            if updated_centroids == centroids {
                debug!("K-means converged after {} iterations", iteration + 1);
                break;
            }
            centroids = updated_centroids;
        }
        debug!(
            "Computed {} clusters over {} utterances",
            nb_clusters,
            vectors.len()
        );
        Ok(ClusterTable {
            vocabulary,
            centroids,
        })
    }
}

fn vectorize(vocabulary: &BTreeMap<String, usize>, tokens: &[String]) -> Option<Array1<f32>> {
    let mut vector = Array1::<f32>::zeros(vocabulary.len());
    for token in tokens {
        if let Some(index) = vocabulary.get(token) {
            vector[*index] += 1.;
        }
    }
    let norm = vector.dot(&vector).sqrt();
    if norm == 0. {
        return None;
    }
    vector /= norm;
    Some(vector)
}

fn squared_distance(lhs: &ArrayView1<f32>, rhs: &ArrayView1<f32>) -> f32 {
    lhs.iter().zip(rhs.iter()).map(|(l, r)| (l - r) * (l - r)).sum()
}

fn nearest_centroid(centroids: &Array2<f32>, vector: &ArrayView1<f32>) -> usize {
    let mut nearest = 0;
    let mut min_distance = f32::MAX;
    for (index, centroid) in centroids.outer_iter().enumerate() {
        let distance = squared_distance(&centroid, vector);
        if distance < min_distance {
            min_distance = distance;
            nearest = index;
        }
    }
    nearest
}

/// Farthest point initialization, starting from the first vector
fn init_centroids(vectors: &[Array1<f32>], nb_clusters: usize, dim: usize) -> Array2<f32> {
    let mut centroids = Array2::<f32>::zeros((nb_clusters, dim));
    if nb_clusters == 0 {
        return centroids;
    }
    centroids.row_mut(0).assign(&vectors[0]);
    let mut min_distances: Vec<f32> = vectors
        .iter()
        .map(|vector| squared_distance(&vector.view(), &centroids.row(0)))
        .collect();
    for cluster in 1..nb_clusters {
        let mut farthest = 0;
        for (index, distance) in min_distances.iter().enumerate() {
            if *distance > min_distances[farthest] {
                farthest = index;
            }
        }
        centroids.row_mut(cluster).assign(&vectors[farthest]);
        for (index, vector) in vectors.iter().enumerate() {
            let distance = squared_distance(&vector.view(), &centroids.row(cluster));
            if distance < min_distances[index] {
                min_distances[index] = distance;
            }
        }
    }
    centroids
}

/// Empty clusters keep their previous centroid
fn update_centroids(
    centroids: &Array2<f32>,
    vectors: &[Array1<f32>],
    assignments: &[usize],
) -> Array2<f32> {
    let mut sums = Array2::<f32>::zeros(centroids.dim());
    let mut counts = vec![0usize; centroids.dim().0];
    for (vector, cluster) in vectors.iter().zip(assignments.iter()) {
        let mut row = sums.row_mut(*cluster);
        row += vector;
        counts[*cluster] += 1;
    }
    let mut updated = centroids.clone();
    for (cluster, count) in counts.into_iter().enumerate() {
        if count > 0 {
            let mean = sums.row(cluster).mapv(|value| value / count as f32);
            updated.row_mut(cluster).assign(&mean);
        }
    }
    updated
}
