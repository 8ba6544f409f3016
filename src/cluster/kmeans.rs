//! K-Means clustering.
//!
//! Lloyd's algorithm with k-means++ initialization. Used on log-prices to
//! discover natural market tiers.

use crate::error::{MongkolError, Result};
use crate::metrics::inertia;
use crate::primitives::Matrix;
use crate::traits::UnsupervisedEstimator;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// K-Means clustering.
///
/// # Examples
///
/// ```
/// use mongkol::cluster::KMeans;
/// use mongkol::traits::UnsupervisedEstimator;
/// use mongkol::primitives::Matrix;
///
/// let data = Matrix::from_vec(6, 1, vec![1.0, 1.1, 1.2, 9.0, 9.1, 9.2])
///     .expect("valid shape");
///
/// let mut kmeans = KMeans::new(2).with_random_state(42);
/// kmeans.fit(&data).expect("fit");
/// assert_eq!(kmeans.predict(&data).len(), 6);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeans {
    n_clusters: usize,
    max_iter: usize,
    tol: f32,
    random_state: Option<u64>,
    centroids: Option<Matrix<f32>>,
    labels: Option<Vec<usize>>,
    inertia: f32,
    n_iter: usize,
}

impl Default for KMeans {
    fn default() -> Self {
        Self::new(8)
    }
}

impl KMeans {
    #[must_use]
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            max_iter: 300,
            tol: 1e-4,
            random_state: None,
            centroids: None,
            labels: None,
            inertia: 0.0,
            n_iter: 0,
        }
    }

    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    #[must_use]
    pub fn with_tol(mut self, tol: f32) -> Self {
        self.tol = tol;
        self
    }

    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self
    }

    /// Fitted centroids, one row per cluster.
    #[must_use]
    pub fn centroids(&self) -> Option<&Matrix<f32>> {
        self.centroids.as_ref()
    }

    /// Labels assigned to the training data.
    #[must_use]
    pub fn labels(&self) -> Option<&[usize]> {
        self.labels.as_deref()
    }

    /// Within-cluster sum of squares after fitting.
    #[must_use]
    pub fn inertia(&self) -> f32 {
        self.inertia
    }

    /// Iterations run before convergence.
    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    fn squared_distance(x: &Matrix<f32>, i: usize, centroids: &Matrix<f32>, c: usize) -> f32 {
        let n_features = x.n_cols();
        let mut dist = 0.0;
        for j in 0..n_features {
            let diff = x.get(i, j) - centroids.get(c, j);
            dist += diff * diff;
        }
        dist
    }

    /// k-means++ seeding: first centroid uniform, the rest proportional to
    /// squared distance from the nearest chosen centroid.
    fn init_centroids(&self, x: &Matrix<f32>, rng: &mut StdRng) -> Matrix<f32> {
        let (n_samples, n_features) = x.shape();
        let mut chosen: Vec<usize> = Vec::with_capacity(self.n_clusters);
        chosen.push(rng.gen_range(0..n_samples));

        let mut min_dists = vec![f32::INFINITY; n_samples];
        while chosen.len() < self.n_clusters {
            let last = chosen[chosen.len() - 1];
            for i in 0..n_samples {
                let mut dist = 0.0;
                for j in 0..n_features {
                    let diff = x.get(i, j) - x.get(last, j);
                    dist += diff * diff;
                }
                min_dists[i] = min_dists[i].min(dist);
            }

            let total: f32 = min_dists.iter().sum();
            let next = if total > 0.0 {
                let mut target = rng.gen::<f32>() * total;
                let mut pick = n_samples - 1;
                for (i, &d) in min_dists.iter().enumerate() {
                    target -= d;
                    if target <= 0.0 {
                        pick = i;
                        break;
                    }
                }
                pick
            } else {
                rng.gen_range(0..n_samples)
            };
            chosen.push(next);
        }

        let mut data = Vec::with_capacity(self.n_clusters * n_features);
        for &i in &chosen {
            for j in 0..n_features {
                data.push(x.get(i, j));
            }
        }
        Matrix::from_vec(self.n_clusters, n_features, data)
            .unwrap_or_else(|_| Matrix::zeros(self.n_clusters, n_features))
    }

    fn assign(x: &Matrix<f32>, centroids: &Matrix<f32>) -> Vec<usize> {
        let n_samples = x.n_rows();
        let n_clusters = centroids.n_rows();
        (0..n_samples)
            .map(|i| {
                let mut best = 0;
                let mut best_dist = f32::INFINITY;
                for c in 0..n_clusters {
                    let dist = Self::squared_distance(x, i, centroids, c);
                    if dist < best_dist {
                        best_dist = dist;
                        best = c;
                    }
                }
                best
            })
            .collect()
    }

    fn update_centroids(
        x: &Matrix<f32>,
        labels: &[usize],
        n_clusters: usize,
        old: &Matrix<f32>,
    ) -> Matrix<f32> {
        let n_features = x.n_cols();
        let mut sums = vec![0.0_f32; n_clusters * n_features];
        let mut counts = vec![0usize; n_clusters];
        for (i, &label) in labels.iter().enumerate() {
            counts[label] += 1;
            for j in 0..n_features {
                sums[label * n_features + j] += x.get(i, j);
            }
        }

        let mut data = Vec::with_capacity(n_clusters * n_features);
        for c in 0..n_clusters {
            for j in 0..n_features {
                if counts[c] > 0 {
                    data.push(sums[c * n_features + j] / counts[c] as f32);
                } else {
                    // empty cluster keeps its old centroid
                    data.push(old.get(c, j));
                }
            }
        }
        Matrix::from_vec(n_clusters, n_features, data)
            .unwrap_or_else(|_| old.clone())
    }

    fn centroid_shift(old: &Matrix<f32>, new: &Matrix<f32>) -> f32 {
        old.as_slice()
            .iter()
            .zip(new.as_slice())
            .map(|(a, b)| (a - b).powi(2))
            .sum()
    }
}

impl UnsupervisedEstimator for KMeans {
    type Labels = Vec<usize>;

    fn fit(&mut self, x: &Matrix<f32>) -> Result<()> {
        let n_samples = x.n_rows();
        if n_samples < self.n_clusters {
            return Err(MongkolError::DataInsufficiency {
                context: "k-means fit".to_string(),
                available: n_samples,
                required: self.n_clusters,
            });
        }
        if self.n_clusters == 0 {
            return Err(MongkolError::InvalidHyperparameter {
                param: "n_clusters".to_string(),
                value: "0".to_string(),
                constraint: "must be at least 1".to_string(),
            });
        }

        let mut rng = StdRng::seed_from_u64(self.random_state.unwrap_or(0));
        let mut centroids = self.init_centroids(x, &mut rng);
        let mut labels = Self::assign(x, &centroids);

        let mut n_iter = 0;
        for iter in 0..self.max_iter {
            n_iter = iter + 1;
            let new_centroids = Self::update_centroids(x, &labels, self.n_clusters, &centroids);
            let shift = Self::centroid_shift(&centroids, &new_centroids);
            centroids = new_centroids;
            labels = Self::assign(x, &centroids);
            if shift < self.tol {
                break;
            }
        }

        self.inertia = inertia(x, &centroids, &labels);
        self.centroids = Some(centroids);
        self.labels = Some(labels);
        self.n_iter = n_iter;
        Ok(())
    }

    fn predict(&self, x: &Matrix<f32>) -> Vec<usize> {
        match &self.centroids {
            Some(centroids) => Self::assign(x, centroids),
            None => vec![0; x.n_rows()],
        }
    }
}
