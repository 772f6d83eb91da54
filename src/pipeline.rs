//! End-to-end modeling pipeline: raw flows → features → standardization →
//! BIC model selection → state assignments → per-state profiles.
//!
//! Pure computation; the caller owns reading flows and persisting the
//! assignment map and model JSON.

use crate::config::ModelConfig;
use crate::error::{ModelError, Result};
use crate::features::{extract_flow_features, FlowRecord, FEATURE_DIM};
use crate::model::{FitSummary, GaussianHmm, StandardScaler};
use crate::narrative::StateProfile;
use crate::signature::state_profiles;
use ndarray::Array2;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// A trained behavioral model with its artifacts.
pub struct BehaviorModel {
    /// Fitted scaler applied before the HMM.
    pub scaler: StandardScaler,
    /// The winning HMM from the BIC sweep.
    pub hmm: GaussianHmm,
    /// Training outcome of the winning fit.
    pub summary: FitSummary,
    /// `(n_states, bic)` for every candidate, in sweep order.
    pub bic_by_states: Vec<(usize, f64)>,
    /// Flow row id → assigned state id, for every flow that was modeled.
    pub assignments: HashMap<String, usize>,
    /// One aggregate profile per state of the winning model.
    pub profiles: Vec<StateProfile>,
}

/// Train a behavioral state model over a batch of flow rows.
///
/// Rows are grouped into per-host sequences (input order preserved within a
/// host; hosts iterated in key order so runs are deterministic), hosts with
/// fewer than `min_flows_per_host` rows are dropped, and one independent
/// `GaussianHmm` per candidate state count is fitted on the standardized
/// sequences. The candidate with the lowest BIC wins; its Viterbi decoding
/// produces the assignment map and per-state profiles.
pub fn train_behavior_model(flows: &[FlowRecord], cfg: &ModelConfig) -> Result<BehaviorModel> {
    if cfg.state_candidates.is_empty() {
        return Err(ModelError::InvalidInput(
            "no candidate state counts configured".into(),
        ));
    }

    let mut by_host: BTreeMap<&str, Vec<&FlowRecord>> = BTreeMap::new();
    for flow in flows {
        by_host.entry(flow.host.as_str()).or_default().push(flow);
    }
    by_host.retain(|_, rows| rows.len() >= cfg.min_flows_per_host);
    if by_host.is_empty() {
        return Err(ModelError::InvalidInput(format!(
            "no host has at least {} flows",
            cfg.min_flows_per_host
        )));
    }

    // kept flows in host order; sequence boundaries recorded as lengths
    let kept: Vec<&FlowRecord> = by_host.values().flatten().copied().collect();
    let seq_lens: Vec<usize> = by_host.values().map(|rows| rows.len()).collect();
    let total = kept.len();
    info!(
        hosts = seq_lens.len(),
        flows = total,
        dropped = flows.len() - total,
        "building training batch"
    );

    let mut pooled = Array2::<f64>::zeros((total, FEATURE_DIM));
    for (row, flow) in kept.iter().enumerate() {
        let features = extract_flow_features(flow);
        for (col, &v) in features.iter().enumerate() {
            pooled[[row, col]] = v;
        }
    }

    let mut scaler = StandardScaler::new();
    let standardized = scaler.fit_transform(&pooled)?;

    let mut sequences: Vec<Array2<f64>> = Vec::with_capacity(seq_lens.len());
    let mut offset = 0;
    for &len in &seq_lens {
        sequences.push(
            standardized
                .slice(ndarray::s![offset..offset + len, ..])
                .to_owned(),
        );
        offset += len;
    }

    let mut best: Option<(GaussianHmm, FitSummary, f64)> = None;
    let mut bic_by_states = Vec::with_capacity(cfg.state_candidates.len());
    for &k in &cfg.state_candidates {
        let mut hmm = GaussianHmm::new(k, FEATURE_DIM, cfg.hmm_options())?;
        let summary = hmm.fit(&sequences)?;
        let bic = hmm.bic(&sequences)?;
        debug!(
            n_states = k,
            bic,
            iterations = summary.iterations,
            converged = summary.converged,
            "candidate fitted"
        );
        bic_by_states.push((k, bic));
        if best.as_ref().map_or(true, |(_, _, b)| bic < *b) {
            best = Some((hmm, summary, bic));
        }
    }
    let (hmm, summary, best_bic) = best.expect("at least one candidate");
    info!(
        n_states = hmm.n_states(),
        bic = best_bic,
        log_likelihood = summary.log_likelihood,
        converged = summary.converged,
        "selected model"
    );

    let n_states = hmm.n_states();
    let mut assignments = HashMap::with_capacity(total);
    let mut states_flat = Vec::with_capacity(total);
    let mut flow_idx = 0;
    for seq in &sequences {
        let path = hmm.predict(seq)?;
        for state in path {
            assignments.insert(kept[flow_idx].id.clone(), state);
            states_flat.push(state);
            flow_idx += 1;
        }
    }

    let owned: Vec<FlowRecord> = kept.iter().map(|f| (*f).clone()).collect();
    let profiles = state_profiles(&owned, &states_flat, n_states);

    Ok(BehaviorModel {
        scaler,
        hmm,
        summary,
        bic_by_states,
        assignments,
        profiles,
    })
}
