//! Gaussian-emission Hidden Markov Model for behavioral flow segmentation.
//!
//! Diagonal covariance per state, k-means++ initialization, Baum–Welch EM
//! training, Viterbi decoding, BIC scoring, and plain-JSON persistence. All
//! probability recurrences run in log-space to survive long sequences.

mod init;
mod scaler;

pub use scaler::{ScalerJson, StandardScaler};

use crate::error::{ModelError, Result};
use init::{global_variances, kmeanspp_means, sticky_transition};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Emission variances never drop below this, preventing collapse on
/// near-degenerate clusters.
const VAR_FLOOR: f64 = 1e-6;
/// Additive smoothing applied to transition rows before normalization.
const TRANS_SMOOTH: f64 = 1e-6;
/// Guard added to probabilities before taking logs.
const LOG_EPS: f64 = 1e-10;

/// EM training options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HmmOptions {
    /// Maximum EM iterations.
    pub max_iter: usize,
    /// Convergence threshold on |Δ log-likelihood|.
    pub tol: f64,
    /// Seed for k-means++ initialization.
    pub seed: u64,
}

impl Default for HmmOptions {
    fn default() -> Self {
        Self {
            max_iter: 100,
            tol: 1e-4,
            seed: 42,
        }
    }
}

/// Outcome of a completed `fit`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FitSummary {
    /// EM iterations performed (1-indexed count).
    pub iterations: usize,
    /// Total batch log-likelihood at the last E-step.
    pub log_likelihood: f64,
    /// Whether `tol` was reached before `max_iter`.
    pub converged: bool,
}

/// Persisted model shape. Field names are the stable on-disk contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HmmJson {
    pub n_states: usize,
    pub n_features: usize,
    pub means: Vec<Vec<f64>>,
    pub variances: Vec<Vec<f64>>,
    pub transition_matrix: Vec<Vec<f64>>,
    pub initial_probs: Vec<f64>,
}

#[derive(Debug, Clone)]
struct HmmParams {
    /// K x D state means.
    means: Array2<f64>,
    /// K x D diagonal variances, every entry > 0.
    variances: Array2<f64>,
    /// K x K row-stochastic transition matrix.
    transition: Array2<f64>,
    /// Length-K initial state distribution.
    initial: Array1<f64>,
}

/// Sufficient statistics accumulated across sequences during the E-step.
struct Accumulator {
    gamma_sum: Array1<f64>,
    weighted_x: Array2<f64>,
    weighted_x2: Array2<f64>,
    trans: Array2<f64>,
    init: Array1<f64>,
    log_likelihood: f64,
}

impl Accumulator {
    fn new(k: usize, d: usize) -> Self {
        Self {
            gamma_sum: Array1::zeros(k),
            weighted_x: Array2::zeros((k, d)),
            weighted_x2: Array2::zeros((k, d)),
            trans: Array2::zeros((k, k)),
            init: Array1::zeros(k),
            log_likelihood: 0.0,
        }
    }
}

/// K-state Gaussian HMM over D-dimensional standardized feature sequences.
///
/// Lifecycle: constructed unfitted; `fit` transitions to fitted, after which
/// `predict`, `bic` and `to_json` become valid. Re-calling `fit` re-trains
/// from scratch. An instance is exclusively owned by its caller; parallel
/// model search uses independent instances.
pub struct GaussianHmm {
    n_states: usize,
    n_features: usize,
    opts: HmmOptions,
    params: Option<HmmParams>,
}

impl GaussianHmm {
    pub fn new(n_states: usize, n_features: usize, opts: HmmOptions) -> Result<Self> {
        if n_states == 0 {
            return Err(ModelError::InvalidInput("n_states must be > 0".into()));
        }
        if n_features == 0 {
            return Err(ModelError::InvalidInput("n_features must be > 0".into()));
        }
        Ok(Self {
            n_states,
            n_features,
            opts,
            params: None,
        })
    }

    pub fn n_states(&self) -> usize {
        self.n_states
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn is_fitted(&self) -> bool {
        self.params.is_some()
    }

    fn validate_sequences(&self, sequences: &[Array2<f64>]) -> Result<usize> {
        if sequences.is_empty() {
            return Err(ModelError::InvalidInput("no training sequences".into()));
        }
        let mut total = 0usize;
        for (s, seq) in sequences.iter().enumerate() {
            if seq.nrows() == 0 {
                return Err(ModelError::InvalidInput(format!("sequence {s} is empty")));
            }
            if seq.ncols() != self.n_features {
                return Err(ModelError::InvalidInput(format!(
                    "sequence {s} has {} features, model expects {}",
                    seq.ncols(),
                    self.n_features
                )));
            }
            total += seq.nrows();
        }
        Ok(total)
    }

    /// Train with Baum–Welch EM. Equivalent to [`fit_with_progress`] with a
    /// no-op callback.
    ///
    /// [`fit_with_progress`]: Self::fit_with_progress
    pub fn fit(&mut self, sequences: &[Array2<f64>]) -> Result<FitSummary> {
        self.fit_with_progress(sequences, |_, _, _| {})
    }

    /// Train with Baum–Welch EM, invoking `on_progress(iter, max_iter, ll)`
    /// once per completed iteration (1-indexed).
    ///
    /// Initialization pools all observations, seeds the PRNG from the
    /// configured seed, places means with k-means++, starts variances at the
    /// floored global per-feature variance, and uses a sticky transition
    /// prior with a uniform initial distribution. Iteration stops when
    /// |Δ log-likelihood| < tol (converged) or at `max_iter`.
    ///
    /// No model state is mutated unless training completes.
    pub fn fit_with_progress<F>(
        &mut self,
        sequences: &[Array2<f64>],
        mut on_progress: F,
    ) -> Result<FitSummary>
    where
        F: FnMut(usize, usize, f64),
    {
        let total = self.validate_sequences(sequences)?;
        let k = self.n_states;
        let d = self.n_features;

        let mut pooled = Array2::<f64>::zeros((total, d));
        let mut row = 0;
        for seq in sequences {
            for obs in seq.rows() {
                pooled.row_mut(row).assign(&obs);
                row += 1;
            }
        }

        let mut rng = StdRng::seed_from_u64(self.opts.seed);
        let means = kmeanspp_means(&pooled, k, &mut rng);
        let gvar = global_variances(&pooled, VAR_FLOOR);
        let mut variances = Array2::<f64>::zeros((k, d));
        for i in 0..k {
            variances.row_mut(i).assign(&gvar);
        }
        let mut params = HmmParams {
            means,
            variances,
            transition: sticky_transition(k),
            initial: Array1::from_elem(k, 1.0 / k as f64),
        };

        let max_iter = self.opts.max_iter;
        let mut prev_ll = f64::NEG_INFINITY;
        let mut iterations = 0;
        let mut log_likelihood = f64::NEG_INFINITY;
        let mut converged = false;

        for iter in 1..=max_iter {
            let mut acc = Accumulator::new(k, d);
            for seq in sequences {
                accumulate_sequence(&params, seq, &mut acc);
            }
            m_step(&mut params, &acc);

            let ll = acc.log_likelihood;
            iterations = iter;
            log_likelihood = ll;
            tracing::debug!(iter, max_iter, log_likelihood = ll, "em iteration");
            on_progress(iter, max_iter, ll);

            if prev_ll.is_finite() && (ll - prev_ll).abs() < self.opts.tol {
                converged = true;
                break;
            }
            prev_ll = ll;
        }

        self.params = Some(params);
        Ok(FitSummary {
            iterations,
            log_likelihood,
            converged,
        })
    }

    /// Viterbi decoding: one state id per observation, the maximum-probability
    /// state path under the fitted model. Chosen over per-timestep MAP
    /// decoding for temporally consistent segmentation.
    pub fn predict(&self, sequence: &Array2<f64>) -> Result<Vec<usize>> {
        let params = self.params.as_ref().ok_or(ModelError::NotFitted)?;
        if sequence.nrows() == 0 {
            return Err(ModelError::InvalidInput("sequence is empty".into()));
        }
        if sequence.ncols() != self.n_features {
            return Err(ModelError::InvalidInput(format!(
                "sequence has {} features, model expects {}",
                sequence.ncols(),
                self.n_features
            )));
        }
        Ok(viterbi(params, sequence))
    }

    /// Total log-likelihood of a batch of sequences under the fitted model.
    pub fn log_likelihood(&self, sequences: &[Array2<f64>]) -> Result<f64> {
        let params = self.params.as_ref().ok_or(ModelError::NotFitted)?;
        self.validate_sequences(sequences)?;
        let log_trans = log_matrix(&params.transition);
        let log_init = params.initial.mapv(|p| (p + LOG_EPS).ln());
        let mut total = 0.0;
        for seq in sequences {
            let log_b = log_emissions(params, seq);
            let (_, ll) = forward(&log_b, &log_trans, &log_init);
            total += ll;
        }
        Ok(total)
    }

    /// Bayesian Information Criterion: `-2·ll + p·ln(N)` with
    /// `p = 2KD + K(K−1) + (K−1)`. Lower is better; used to select K.
    pub fn bic(&self, sequences: &[Array2<f64>]) -> Result<f64> {
        if self.params.is_none() {
            return Err(ModelError::NotFitted);
        }
        let total_obs = self.validate_sequences(sequences)?;
        let ll = self.log_likelihood(sequences)?;
        let k = self.n_states as f64;
        let d = self.n_features as f64;
        let num_params = 2.0 * k * d + k * (k - 1.0) + (k - 1.0);
        Ok(-2.0 * ll + num_params * (total_obs as f64).ln())
    }

    /// Export fitted parameters as plain JSON (no schema-version field; the
    /// shape is the stable persistence contract).
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let params = self.params.as_ref().ok_or(ModelError::NotFitted)?;
        let json = HmmJson {
            n_states: self.n_states,
            n_features: self.n_features,
            means: matrix_rows(&params.means),
            variances: matrix_rows(&params.variances),
            transition_matrix: matrix_rows(&params.transition),
            initial_probs: params.initial.to_vec(),
        };
        serde_json::to_value(json)
            .map_err(|e| ModelError::InvalidInput(format!("serialize model: {e}")))
    }

    /// Restore a fitted model from `to_json` output. The round trip
    /// reproduces `predict` and `bic` results.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let json: HmmJson = serde_json::from_value(value.clone())
            .map_err(|e| ModelError::InvalidInput(format!("malformed model JSON: {e}")))?;
        let k = json.n_states;
        let d = json.n_features;
        if k == 0 || d == 0 {
            return Err(ModelError::InvalidInput(
                "model JSON has zero states or features".into(),
            ));
        }
        let means = matrix_from_rows(&json.means, k, d, "means")?;
        let variances = matrix_from_rows(&json.variances, k, d, "variances")?
            .mapv(|v| v.max(VAR_FLOOR));
        let transition = matrix_from_rows(&json.transition_matrix, k, k, "transitionMatrix")?;
        if json.initial_probs.len() != k {
            return Err(ModelError::InvalidInput(format!(
                "initialProbs has length {}, expected {k}",
                json.initial_probs.len()
            )));
        }
        Ok(Self {
            n_states: k,
            n_features: d,
            opts: HmmOptions::default(),
            params: Some(HmmParams {
                means,
                variances,
                transition,
                initial: Array1::from_vec(json.initial_probs),
            }),
        })
    }
}

fn matrix_rows(m: &Array2<f64>) -> Vec<Vec<f64>> {
    m.rows().into_iter().map(|r| r.to_vec()).collect()
}

fn matrix_from_rows(rows: &[Vec<f64>], k: usize, d: usize, field: &str) -> Result<Array2<f64>> {
    if rows.len() != k || rows.iter().any(|r| r.len() != d) {
        return Err(ModelError::InvalidInput(format!(
            "{field} is not a {k}x{d} matrix"
        )));
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((k, d), flat)
        .map_err(|e| ModelError::InvalidInput(format!("{field}: {e}")))
}

fn log_matrix(m: &Array2<f64>) -> Array2<f64> {
    m.mapv(|p| (p + LOG_EPS).ln())
}

/// Numerically stable log(Σ exp(x)) over a slice.
fn log_sum_exp(xs: &[f64]) -> f64 {
    let max = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    let sum: f64 = xs.iter().map(|&x| (x - max).exp()).sum();
    max + sum.ln()
}

/// Per-observation, per-state Gaussian log-density (T x K), diagonal
/// covariance.
fn log_emissions(params: &HmmParams, seq: &Array2<f64>) -> Array2<f64> {
    let ln_2pi = (2.0 * std::f64::consts::PI).ln();
    let t_len = seq.nrows();
    let k = params.means.nrows();
    let d = params.means.ncols();
    let mut log_b = Array2::<f64>::zeros((t_len, k));
    for t in 0..t_len {
        for i in 0..k {
            let mut lp = 0.0;
            for j in 0..d {
                let var = params.variances[[i, j]];
                let diff = seq[[t, j]] - params.means[[i, j]];
                lp -= 0.5 * (ln_2pi + var.ln()) + diff * diff / (2.0 * var);
            }
            log_b[[t, i]] = lp;
        }
    }
    log_b
}

/// Log-space forward pass; returns (alpha, sequence log-likelihood).
fn forward(log_b: &Array2<f64>, log_trans: &Array2<f64>, log_init: &Array1<f64>) -> (Array2<f64>, f64) {
    let t_len = log_b.nrows();
    let k = log_b.ncols();
    let mut alpha = Array2::<f64>::from_elem((t_len, k), f64::NEG_INFINITY);
    for i in 0..k {
        alpha[[0, i]] = log_init[i] + log_b[[0, i]];
    }
    let mut scratch = vec![f64::NEG_INFINITY; k];
    for t in 1..t_len {
        for j in 0..k {
            for (i, s) in scratch.iter_mut().enumerate() {
                *s = alpha[[t - 1, i]] + log_trans[[i, j]];
            }
            alpha[[t, j]] = log_sum_exp(&scratch) + log_b[[t, j]];
        }
    }
    let last: Vec<f64> = (0..k).map(|i| alpha[[t_len - 1, i]]).collect();
    let ll = log_sum_exp(&last);
    (alpha, ll)
}

/// Log-space backward pass.
fn backward(log_b: &Array2<f64>, log_trans: &Array2<f64>) -> Array2<f64> {
    let t_len = log_b.nrows();
    let k = log_b.ncols();
    let mut beta = Array2::<f64>::zeros((t_len, k));
    let mut scratch = vec![f64::NEG_INFINITY; k];
    for t in (0..t_len.saturating_sub(1)).rev() {
        for i in 0..k {
            for (j, s) in scratch.iter_mut().enumerate() {
                *s = log_trans[[i, j]] + log_b[[t + 1, j]] + beta[[t + 1, j]];
            }
            beta[[t, i]] = log_sum_exp(&scratch);
        }
    }
    beta
}

/// E-step for one sequence: forward–backward posteriors folded into the
/// shared sufficient statistics.
fn accumulate_sequence(params: &HmmParams, seq: &Array2<f64>, acc: &mut Accumulator) {
    let k = params.means.nrows();
    let d = params.means.ncols();
    let t_len = seq.nrows();

    let log_b = log_emissions(params, seq);
    let log_trans = log_matrix(&params.transition);
    let log_init = params.initial.mapv(|p| (p + LOG_EPS).ln());
    let (alpha, ll) = forward(&log_b, &log_trans, &log_init);
    let beta = backward(&log_b, &log_trans);
    acc.log_likelihood += ll;

    for t in 0..t_len {
        for i in 0..k {
            let gamma = (alpha[[t, i]] + beta[[t, i]] - ll).exp();
            acc.gamma_sum[i] += gamma;
            if t == 0 {
                acc.init[i] += gamma;
            }
            for j in 0..d {
                let x = seq[[t, j]];
                acc.weighted_x[[i, j]] += gamma * x;
                acc.weighted_x2[[i, j]] += gamma * x * x;
            }
        }
    }

    for t in 0..t_len.saturating_sub(1) {
        for i in 0..k {
            for j in 0..k {
                let xi = (alpha[[t, i]]
                    + log_trans[[i, j]]
                    + log_b[[t + 1, j]]
                    + beta[[t + 1, j]]
                    - ll)
                    .exp();
                acc.trans[[i, j]] += xi;
            }
        }
    }
}

/// M-step: posterior-weighted parameter re-estimation with variance floor
/// and additive transition smoothing.
fn m_step(params: &mut HmmParams, acc: &Accumulator) {
    let k = params.means.nrows();
    let d = params.means.ncols();

    for i in 0..k {
        let g = acc.gamma_sum[i].max(LOG_EPS);
        for j in 0..d {
            let mean = acc.weighted_x[[i, j]] / g;
            let var = (acc.weighted_x2[[i, j]] / g - mean * mean).max(VAR_FLOOR);
            params.means[[i, j]] = mean;
            params.variances[[i, j]] = var;
        }
        let row_total: f64 = acc.trans.row(i).sum() + k as f64 * TRANS_SMOOTH;
        for j in 0..k {
            params.transition[[i, j]] = (acc.trans[[i, j]] + TRANS_SMOOTH) / row_total;
        }
    }

    let init_total: f64 = acc.init.sum() + k as f64 * LOG_EPS;
    for i in 0..k {
        params.initial[i] = (acc.init[i] + LOG_EPS) / init_total;
    }
}

/// Viterbi decoding in log-space with backtracking.
fn viterbi(params: &HmmParams, seq: &Array2<f64>) -> Vec<usize> {
    let k = params.means.nrows();
    let t_len = seq.nrows();
    let log_b = log_emissions(params, seq);
    let log_trans = log_matrix(&params.transition);
    let log_init = params.initial.mapv(|p| (p + LOG_EPS).ln());

    let mut delta = Array2::<f64>::from_elem((t_len, k), f64::NEG_INFINITY);
    let mut psi = vec![vec![0usize; k]; t_len];
    for i in 0..k {
        delta[[0, i]] = log_init[i] + log_b[[0, i]];
    }
    for t in 1..t_len {
        for j in 0..k {
            let mut best_val = f64::NEG_INFINITY;
            let mut best_state = 0;
            for i in 0..k {
                let v = delta[[t - 1, i]] + log_trans[[i, j]];
                if v > best_val {
                    best_val = v;
                    best_state = i;
                }
            }
            delta[[t, j]] = best_val + log_b[[t, j]];
            psi[t][j] = best_state;
        }
    }

    let mut best_final = 0usize;
    let mut best_score = f64::NEG_INFINITY;
    for i in 0..k {
        if delta[[t_len - 1, i]] > best_score {
            best_score = delta[[t_len - 1, i]];
            best_final = i;
        }
    }
    let mut path = vec![0usize; t_len];
    path[t_len - 1] = best_final;
    for t in (0..t_len - 1).rev() {
        path[t] = psi[t + 1][path[t + 1]];
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    /// Box–Muller standard normal draw.
    fn normal(rng: &mut StdRng) -> f64 {
        let u1: f64 = rng.gen::<f64>().max(1e-12);
        let u2: f64 = rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    /// Sequences drawn from a 2-state process: cluster means (0,0) and (5,5),
    /// sigma 0.5, 90% self-loop transitions.
    fn two_cluster_sequences(seed: u64, n_seqs: usize, len: usize) -> Vec<Array2<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        let centers = [[0.0, 0.0], [5.0, 5.0]];
        (0..n_seqs)
            .map(|_| {
                let mut state = if rng.gen::<f64>() < 0.5 { 0 } else { 1 };
                let mut seq = Array2::<f64>::zeros((len, 2));
                for t in 0..len {
                    for j in 0..2 {
                        seq[[t, j]] = centers[state][j] + 0.5 * normal(&mut rng);
                    }
                    if rng.gen::<f64>() < 0.1 {
                        state = 1 - state;
                    }
                }
                seq
            })
            .collect()
    }

    /// Held-out sequence: `half` observations from cluster 0 then `half`
    /// from cluster 1.
    fn half_half_sequence(seed: u64, half: usize) -> Array2<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut seq = Array2::<f64>::zeros((2 * half, 2));
        for t in 0..2 * half {
            let c = if t < half { 0.0 } else { 5.0 };
            for j in 0..2 {
                seq[[t, j]] = c + 0.5 * normal(&mut rng);
            }
        }
        seq
    }

    fn fitted_two_state(seed: u64) -> (GaussianHmm, Vec<Array2<f64>>) {
        let train = two_cluster_sequences(seed, 4, 60);
        let mut hmm = GaussianHmm::new(
            2,
            2,
            HmmOptions {
                max_iter: 50,
                tol: 1e-6,
                seed,
            },
        )
        .unwrap();
        hmm.fit(&train).unwrap();
        (hmm, train)
    }

    #[test]
    fn recovers_two_well_separated_clusters() {
        let (hmm, _) = fitted_two_state(11);
        let held_out = half_half_sequence(99, 20);
        let path = hmm.predict(&held_out).unwrap();
        assert_eq!(path.len(), 40);

        let majority = |xs: &[usize]| -> usize {
            let ones = xs.iter().filter(|&&s| s == 1).count();
            usize::from(ones * 2 > xs.len())
        };
        let a = majority(&path[..20]);
        let b = majority(&path[20..]);
        assert_ne!(a, b, "both halves decoded to the same state");

        let correct = path[..20].iter().filter(|&&s| s == a).count()
            + path[20..].iter().filter(|&&s| s == b).count();
        assert!(correct >= 32, "only {correct}/40 decoded consistently");
    }

    #[test]
    fn fit_converges_to_finite_log_likelihood() {
        let train = two_cluster_sequences(3, 4, 60);
        let mut hmm = GaussianHmm::new(2, 2, HmmOptions::default()).unwrap();
        let summary = hmm.fit(&train).unwrap();
        assert!(summary.log_likelihood.is_finite());
        assert!(summary.iterations >= 1);
    }

    #[test]
    fn bic_prefers_two_states_on_two_cluster_data() {
        let train = two_cluster_sequences(5, 4, 60);
        let opts = HmmOptions {
            max_iter: 40,
            tol: 1e-6,
            seed: 5,
        };
        let mut h2 = GaussianHmm::new(2, 2, opts.clone()).unwrap();
        h2.fit(&train).unwrap();
        let mut h5 = GaussianHmm::new(5, 2, opts).unwrap();
        h5.fit(&train).unwrap();
        let bic2 = h2.bic(&train).unwrap();
        let bic5 = h5.bic(&train).unwrap();
        assert!(bic2 < bic5, "bic2={bic2} bic5={bic5}");
    }

    #[test]
    fn same_seed_and_data_give_identical_predictions() {
        let train = two_cluster_sequences(8, 3, 50);
        let held_out = half_half_sequence(8, 15);
        let opts = HmmOptions {
            max_iter: 30,
            tol: 1e-6,
            seed: 123,
        };
        let mut hmm = GaussianHmm::new(2, 2, opts).unwrap();
        hmm.fit(&train).unwrap();
        let first = hmm.predict(&held_out).unwrap();
        hmm.fit(&train).unwrap();
        let second = hmm.predict(&held_out).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn json_round_trip_reproduces_predict_and_bic() {
        let (hmm, train) = fitted_two_state(21);
        let held_out = half_half_sequence(22, 10);
        let restored = GaussianHmm::from_json(&hmm.to_json().unwrap()).unwrap();
        assert_eq!(
            hmm.predict(&held_out).unwrap(),
            restored.predict(&held_out).unwrap()
        );
        let diff = (hmm.bic(&train).unwrap() - restored.bic(&train).unwrap()).abs();
        assert!(diff < 1e-10, "bic drift {diff}");
    }

    #[test]
    fn loose_tolerance_converges_early() {
        let train = two_cluster_sequences(4, 3, 40);
        let mut hmm = GaussianHmm::new(
            2,
            2,
            HmmOptions {
                max_iter: 100,
                tol: 1.0,
                seed: 4,
            },
        )
        .unwrap();
        let summary = hmm.fit(&train).unwrap();
        assert!(summary.converged);
        assert!(summary.iterations < 100);
    }

    #[test]
    fn unreachable_tolerance_does_not_converge() {
        let train = two_cluster_sequences(4, 3, 40);
        let mut hmm = GaussianHmm::new(
            2,
            2,
            HmmOptions {
                max_iter: 1,
                tol: 1e-30,
                seed: 4,
            },
        )
        .unwrap();
        let summary = hmm.fit(&train).unwrap();
        assert!(!summary.converged);
        assert_eq!(summary.iterations, 1);
    }

    #[test]
    fn progress_callback_fires_once_per_iteration() {
        let train = two_cluster_sequences(6, 2, 30);
        let mut hmm = GaussianHmm::new(
            2,
            2,
            HmmOptions {
                max_iter: 5,
                tol: 1e-30,
                seed: 6,
            },
        )
        .unwrap();
        let mut calls = Vec::new();
        hmm.fit_with_progress(&train, |iter, max_iter, ll| {
            calls.push((iter, max_iter, ll));
        })
        .unwrap();
        assert_eq!(calls.len(), 5);
        assert_eq!(calls[0].0, 1);
        assert_eq!(calls[4].0, 5);
        assert!(calls.iter().all(|c| c.1 == 5 && c.2.is_finite()));
    }

    #[test]
    fn degenerate_inputs_stay_finite() {
        // all-identical observations
        let seq = Array2::from_elem((20, 3), 1.5);
        let mut hmm = GaussianHmm::new(
            2,
            3,
            HmmOptions {
                max_iter: 10,
                tol: 1e-6,
                seed: 1,
            },
        )
        .unwrap();
        let summary = hmm.fit(&[seq.clone()]).unwrap();
        assert!(summary.log_likelihood.is_finite());
        let path = hmm.predict(&seq).unwrap();
        assert!(path.iter().all(|&s| s < 2));

        // single-observation sequences
        let singles: Vec<Array2<f64>> = (0..5)
            .map(|i| Array2::from_elem((1, 3), i as f64))
            .collect();
        let mut hmm = GaussianHmm::new(
            2,
            3,
            HmmOptions {
                max_iter: 10,
                tol: 1e-6,
                seed: 2,
            },
        )
        .unwrap();
        let summary = hmm.fit(&singles).unwrap();
        assert!(summary.log_likelihood.is_finite());
        assert_eq!(hmm.predict(&singles[0]).unwrap().len(), 1);
    }

    #[test]
    fn single_state_model_assigns_state_zero() {
        let train = two_cluster_sequences(9, 2, 30);
        let mut hmm = GaussianHmm::new(
            1,
            2,
            HmmOptions {
                max_iter: 10,
                tol: 1e-6,
                seed: 9,
            },
        )
        .unwrap();
        hmm.fit(&train).unwrap();
        let path = hmm.predict(&train[0]).unwrap();
        assert!(path.iter().all(|&s| s == 0));
    }

    #[test]
    fn invalid_input_is_rejected() {
        let mut hmm = GaussianHmm::new(2, 2, HmmOptions::default()).unwrap();
        assert!(matches!(hmm.fit(&[]), Err(ModelError::InvalidInput(_))));
        let wrong_dim = Array2::<f64>::zeros((4, 3));
        assert!(matches!(
            hmm.fit(&[wrong_dim]),
            Err(ModelError::InvalidInput(_))
        ));
        assert!(!hmm.is_fitted());
    }

    #[test]
    fn reads_before_fit_are_rejected() {
        let hmm = GaussianHmm::new(2, 2, HmmOptions::default()).unwrap();
        let seq = Array2::<f64>::zeros((3, 2));
        assert!(matches!(hmm.predict(&seq), Err(ModelError::NotFitted)));
        assert!(matches!(
            hmm.bic(std::slice::from_ref(&seq)),
            Err(ModelError::NotFitted)
        ));
        assert!(matches!(hmm.to_json(), Err(ModelError::NotFitted)));
    }
}
