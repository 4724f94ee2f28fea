use rand::{rngs::StdRng, Rng, SeedableRng};

use super::config::ClusteringConfig;

pub type Point = [f64; 3];

#[derive(Debug, Clone)]
pub struct KMeansFit {
    pub labels: Vec<usize>,
    pub centroids: Vec<Point>,
    pub inertia: f64,
}

/// Lloyd's algorithm with k-means++ seeding and `n_init` restarts.
///
/// Returns `None` when `k` is zero or larger than the number of points.
pub fn fit(points: &[Point], k: usize, config: &ClusteringConfig) -> Option<KMeansFit> {
    if k == 0 || points.len() < k {
        return None;
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut best: Option<KMeansFit> = None;

    for _ in 0..config.n_init.max(1) {
        let candidate = single_run(points, k, config, &mut rng);
        let better = best
            .as_ref()
            .map_or(true, |current| candidate.inertia < current.inertia);
        if better {
            best = Some(candidate);
        }
    }

    best
}

fn single_run(points: &[Point], k: usize, config: &ClusteringConfig, rng: &mut StdRng) -> KMeansFit {
    let mut centroids = kmeans_pp_init(points, k, rng);

    for _ in 0..config.max_iterations {
        let labels = assign(points, &centroids);
        let updated = update_centroids(points, &labels, &centroids);
        let shift: f64 = centroids
            .iter()
            .zip(updated.iter())
            .map(|(old, new)| squared_distance(old, new))
            .sum();
        centroids = updated;
        if shift <= config.tolerance {
            break;
        }
    }

    let labels = assign(points, &centroids);
    let inertia = points
        .iter()
        .zip(labels.iter())
        .map(|(point, &label)| squared_distance(point, &centroids[label]))
        .sum();

    KMeansFit {
        labels,
        centroids,
        inertia,
    }
}

fn kmeans_pp_init(points: &[Point], k: usize, rng: &mut StdRng) -> Vec<Point> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())]);

    while centroids.len() < k {
        let distances: Vec<f64> = points
            .iter()
            .map(|point| nearest(point, &centroids).1)
            .collect();
        let total: f64 = distances.iter().sum();

        if total <= 0.0 {
            // Every point already coincides with a centroid.
            centroids.push(points[rng.gen_range(0..points.len())]);
            continue;
        }

        let mut threshold = rng.gen::<f64>() * total;
        let mut chosen = distances
            .iter()
            .rposition(|dist| *dist > 0.0)
            .unwrap_or(points.len() - 1);
        for (idx, &dist) in distances.iter().enumerate() {
            threshold -= dist;
            if threshold <= 0.0 && dist > 0.0 {
                chosen = idx;
                break;
            }
        }
        centroids.push(points[chosen]);
    }

    centroids
}

fn assign(points: &[Point], centroids: &[Point]) -> Vec<usize> {
    points
        .iter()
        .map(|point| nearest(point, centroids).0)
        .collect()
}

/// Empty clusters keep their previous centroid.
fn update_centroids(points: &[Point], labels: &[usize], previous: &[Point]) -> Vec<Point> {
    let mut sums = vec![[0.0; 3]; previous.len()];
    let mut counts = vec![0usize; previous.len()];

    for (point, &label) in points.iter().zip(labels.iter()) {
        for (sum, value) in sums[label].iter_mut().zip(point.iter()) {
            *sum += value;
        }
        counts[label] += 1;
    }

    sums.iter()
        .zip(counts.iter())
        .zip(previous.iter())
        .map(|((sum, &count), old)| {
            if count == 0 {
                *old
            } else {
                let n = count as f64;
                [sum[0] / n, sum[1] / n, sum[2] / n]
            }
        })
        .collect()
}

/// Index of and squared distance to the closest centroid (first one wins ties).
fn nearest(point: &Point, centroids: &[Point]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (idx, centroid) in centroids.iter().enumerate() {
        let dist = squared_distance(point, centroid);
        if dist < best.1 {
            best = (idx, dist);
        }
    }
    best
}

fn squared_distance(a: &Point, b: &Point) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum()
}
