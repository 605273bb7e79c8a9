//! Mini-batch k-means with greedy k-means++ seeding.
//!
//! Deterministic for a given seed: every random draw (seeding, validation
//! subset, mini-batches) comes from one `StdRng` in a fixed order.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::config::ClusterParams;
use crate::error::{ClusterError, Result};

/// Result of a fit over all samples.
#[derive(Clone, Debug)]
pub struct KMeansFit {
    pub centers: Array2<f64>,
    pub labels: Vec<usize>,
    /// Sum of squared distances of every sample to its assigned centre.
    pub inertia: f64,
    /// Mini-batch steps actually run before stopping.
    pub n_steps: usize,
}

/// Smoothed-inertia early stopping state.
struct Convergence {
    ewa_inertia: Option<f64>,
    ewa_inertia_min: Option<f64>,
    no_improvement: usize,
}

impl Convergence {
    fn new() -> Self {
        Self {
            ewa_inertia: None,
            ewa_inertia_min: None,
            no_improvement: 0,
        }
    }

    /// Returns true when training should stop.
    fn update(
        &mut self,
        step: usize,
        batch_inertia: f64,
        batch_size: usize,
        n_samples: usize,
        max_no_improvement: usize,
    ) -> bool {
        // first step measures the seeding, not the updates
        if step == 0 {
            return false;
        }
        let batch_inertia = batch_inertia / batch_size as f64;
        let ewa = match self.ewa_inertia {
            None => batch_inertia,
            Some(prev) => {
                let alpha = (batch_size as f64 * 2.0 / (n_samples as f64 + 1.0)).min(1.0);
                prev * (1.0 - alpha) + batch_inertia * alpha
            }
        };
        self.ewa_inertia = Some(ewa);

        match self.ewa_inertia_min {
            Some(min) if ewa >= min => self.no_improvement += 1,
            _ => {
                self.no_improvement = 0;
                self.ewa_inertia_min = Some(ewa);
            }
        }
        self.no_improvement >= max_no_improvement
    }
}

pub struct MiniBatchKMeans {
    params: ClusterParams,
}

impl MiniBatchKMeans {
    pub fn new(params: ClusterParams) -> Self {
        Self { params }
    }

    /// Fit on the rows of `x` and label every row.
    pub fn fit(&self, x: &Array2<f64>) -> Result<KMeansFit> {
        let n = x.nrows();
        let k = self.params.n_clusters;
        if k == 0 {
            return Err(ClusterError::Config("cluster count must be at least 1".into()));
        }
        if n < k {
            return Err(ClusterError::TooFewAssets {
                assets: n,
                clusters: k,
            });
        }

        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let batch_size = self.params.batch_size.clamp(1, n);
        let init_size = (3 * batch_size).max(3 * k).min(n);

        // Restarts are compared on one shared validation subset.
        let validation = sample_rows(x, &mut rng, init_size);

        let mut best: Option<(Array2<f64>, f64)> = None;
        for init in 0..self.params.n_init.max(1) {
            let centers = if init_size < n {
                let subset = sample_rows(x, &mut rng, init_size);
                kmeans_plusplus(&subset, k, &mut rng)
            } else {
                kmeans_plusplus(x, k, &mut rng)
            };
            let (_, inertia) = assign(&validation, &centers);
            debug!(init, inertia, "k-means++ seeding");
            if best.as_ref().map_or(true, |(_, b)| inertia < *b) {
                best = Some((centers, inertia));
            }
        }
        let mut centers = match best {
            Some((c, _)) => c,
            None => kmeans_plusplus(x, k, &mut rng),
        };

        let n_steps = ((self.params.max_iter * n) / batch_size).max(1);
        let mut counts = Array1::<f64>::zeros(k);
        let mut convergence = Convergence::new();
        let mut steps_run = 0;
        for step in 0..n_steps {
            let indices: Vec<usize> = (0..batch_size).map(|_| rng.gen_range(0..n)).collect();
            let batch = x.select(Axis(0), &indices);
            let batch_inertia = minibatch_step(&batch, &mut centers, &mut counts);
            steps_run = step + 1;
            if convergence.update(
                step,
                batch_inertia,
                batch_size,
                n,
                self.params.max_no_improvement,
            ) {
                debug!(step, "converged on smoothed inertia");
                break;
            }
        }

        let (labels, inertia) = assign(x, &centers);
        for c in 0..k {
            if !labels.contains(&c) {
                warn!(cluster = c, "cluster has no members");
            }
        }

        Ok(KMeansFit {
            centers,
            labels,
            inertia,
            n_steps: steps_run,
        })
    }
}

// ─── Kernels ───

#[inline]
fn sq_dist(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Nearest centre per row and the summed squared distance.
pub fn assign(x: &Array2<f64>, centers: &Array2<f64>) -> (Vec<usize>, f64) {
    let mut inertia = 0.0;
    let labels = x
        .outer_iter()
        .map(|row| {
            let (label, d) = centers
                .outer_iter()
                .map(|c| sq_dist(row, c))
                .enumerate()
                .fold((0, f64::INFINITY), |best, (j, d)| if d < best.1 { (j, d) } else { best });
            inertia += d;
            label
        })
        .collect();
    (labels, inertia)
}

fn sample_rows(x: &Array2<f64>, rng: &mut StdRng, size: usize) -> Array2<f64> {
    let indices: Vec<usize> = (0..size).map(|_| rng.gen_range(0..x.nrows())).collect();
    x.select(Axis(0), &indices)
}

/// Greedy k-means++: each new centre is the best of `2 + ln k` candidates
/// drawn proportionally to squared distance from the current centres.
pub fn kmeans_plusplus(x: &Array2<f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
    let n = x.nrows();
    let n_local_trials = 2 + (k as f64).ln() as usize;
    let mut centers = Array2::<f64>::zeros((k, x.ncols()));

    let first = rng.gen_range(0..n);
    centers.row_mut(0).assign(&x.row(first));
    let mut closest: Vec<f64> = x.outer_iter().map(|r| sq_dist(r, x.row(first))).collect();
    let mut potential: f64 = closest.iter().sum();

    for c in 1..k {
        let mut best_candidate = 0;
        let mut best_potential = f64::INFINITY;
        let mut best_closest: Option<Vec<f64>> = None;

        for _ in 0..n_local_trials {
            let target = rng.gen::<f64>() * potential;
            let candidate = pick_by_cumulative(&closest, target);
            let trial: Vec<f64> = x
                .outer_iter()
                .zip(&closest)
                .map(|(r, &d)| d.min(sq_dist(r, x.row(candidate))))
                .collect();
            let trial_potential: f64 = trial.iter().sum();
            if trial_potential < best_potential {
                best_candidate = candidate;
                best_potential = trial_potential;
                best_closest = Some(trial);
            }
        }

        centers.row_mut(c).assign(&x.row(best_candidate));
        if let Some(d) = best_closest {
            closest = d;
            potential = best_potential;
        }
    }
    centers
}

/// First index whose cumulative weight reaches `target`, clipped to the last index.
fn pick_by_cumulative(weights: &[f64], target: f64) -> usize {
    let mut acc = 0.0;
    for (i, w) in weights.iter().enumerate() {
        acc += w;
        if acc >= target {
            return i;
        }
    }
    weights.len().saturating_sub(1)
}

/// One update: assign the batch, then move each centre to the count-weighted
/// running mean of everything it has absorbed so far. Returns batch inertia
/// measured against the pre-update centres.
fn minibatch_step(batch: &Array2<f64>, centers: &mut Array2<f64>, counts: &mut Array1<f64>) -> f64 {
    let (labels, inertia) = assign(batch, centers);
    let k = centers.nrows();

    let mut sums = Array2::<f64>::zeros(centers.raw_dim());
    let mut batch_counts = vec![0usize; k];
    for (row, &label) in batch.outer_iter().zip(&labels) {
        let mut s = sums.row_mut(label);
        s += &row;
        batch_counts[label] += 1;
    }

    for c in 0..k {
        if batch_counts[c] == 0 {
            continue;
        }
        let old = counts[c];
        let new = old + batch_counts[c] as f64;
        let updated = (&centers.row(c) * old + &sums.row(c)) / new;
        centers.row_mut(c).assign(&updated);
        counts[c] = new;
    }
    inertia
}
