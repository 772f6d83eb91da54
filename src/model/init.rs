//! Parameter initialization for EM: k-means++ seeding and priors.
//!
//! Randomness comes only from the caller-supplied generator, seeded from the
//! model options; nothing here touches ambient RNG state.

use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::Rng;

fn sq_dist(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

/// k-means++ seeding: pick `k` initial means from the pooled observations.
///
/// The first center is drawn uniformly; each subsequent center is drawn with
/// probability proportional to its squared distance from the nearest center
/// chosen so far. When every remaining point coincides with a chosen center
/// (duplicate/degenerate data) the draw falls back to uniform, so seeding
/// always completes.
pub(crate) fn kmeanspp_means(obs: &Array2<f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
    let n = obs.nrows();
    let d = obs.ncols();
    let mut means = Array2::<f64>::zeros((k, d));

    let first = rng.gen_range(0..n);
    means.row_mut(0).assign(&obs.row(first));

    // d2[i] = squared distance from obs i to its nearest chosen center
    let mut d2 = vec![f64::INFINITY; n];
    for c in 1..k {
        let prev = means.row(c - 1).to_owned();
        for i in 0..n {
            let dist = sq_dist(obs.row(i), prev.view());
            if dist < d2[i] {
                d2[i] = dist;
            }
        }
        let total: f64 = d2.iter().sum();
        let idx = if total > 0.0 && total.is_finite() {
            let mut r = rng.gen::<f64>() * total;
            let mut pick = n - 1;
            for (i, &w) in d2.iter().enumerate() {
                r -= w;
                if r <= 0.0 {
                    pick = i;
                    break;
                }
            }
            pick
        } else {
            rng.gen_range(0..n)
        };
        means.row_mut(c).assign(&obs.row(idx));
    }
    means
}

/// Per-feature global population variance over the pooled observations,
/// floored to `floor`. Used as the initial emission variance for every state.
pub(crate) fn global_variances(obs: &Array2<f64>, floor: f64) -> Array1<f64> {
    let n = obs.nrows() as f64;
    let d = obs.ncols();
    let mut mean = Array1::<f64>::zeros(d);
    for row in obs.rows() {
        mean += &row;
    }
    mean /= n;
    let mut var = Array1::<f64>::zeros(d);
    for row in obs.rows() {
        for (j, &v) in row.iter().enumerate() {
            let diff = v - mean[j];
            var[j] += diff * diff;
        }
    }
    var /= n;
    var.mapv(|v| v.max(floor))
}

/// Sticky transition prior: diagonal 0.7, remaining mass spread uniformly
/// over the off-diagonal entries of each row. `k == 1` yields `[[1.0]]`.
pub(crate) fn sticky_transition(k: usize) -> Array2<f64> {
    if k == 1 {
        return Array2::from_elem((1, 1), 1.0);
    }
    let off = 0.3 / (k as f64 - 1.0);
    let mut t = Array2::from_elem((k, k), off);
    for i in 0..k {
        t[[i, i]] = 0.7;
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    #[test]
    fn kmeanspp_separates_distinct_clusters() {
        // two tight clusters far apart; the second center must come from the
        // opposite cluster
        let obs = array![
            [0.0, 0.0],
            [0.1, 0.0],
            [0.0, 0.1],
            [10.0, 10.0],
            [10.1, 10.0],
            [10.0, 10.1],
        ];
        let mut rng = StdRng::seed_from_u64(7);
        let means = kmeanspp_means(&obs, 2, &mut rng);
        let gap = sq_dist(means.row(0), means.row(1));
        assert!(gap > 50.0, "centers too close: {gap}");
    }

    #[test]
    fn kmeanspp_handles_duplicate_data() {
        let obs = Array2::from_elem((5, 3), 2.0);
        let mut rng = StdRng::seed_from_u64(1);
        let means = kmeanspp_means(&obs, 3, &mut rng);
        assert_eq!(means.nrows(), 3);
        assert!(means.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn kmeanspp_is_deterministic_for_a_seed() {
        let obs = array![[0.0, 1.0], [2.0, 3.0], [4.0, 5.0], [6.0, 7.0]];
        let a = kmeanspp_means(&obs, 2, &mut StdRng::seed_from_u64(42));
        let b = kmeanspp_means(&obs, 2, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn sticky_transition_rows_sum_to_one() {
        for k in 1..=5 {
            let t = sticky_transition(k);
            for row in t.rows() {
                let sum: f64 = row.sum();
                assert!((sum - 1.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn global_variances_are_floored() {
        let obs = array![[1.0, 5.0], [1.0, 6.0], [1.0, 7.0]];
        let var = global_variances(&obs, 1e-6);
        assert_eq!(var[0], 1e-6);
        assert!(var[1] > 0.1);
    }
}
