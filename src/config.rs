//! Pipeline configuration. Candidate state counts are swept with BIC; the
//! seed makes a whole training run reproducible.

use crate::model::HmmOptions;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model selection and training parameters
    pub model: ModelConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Candidate numbers of behavioral states; lowest BIC wins
    pub state_candidates: Vec<usize>,
    /// Maximum EM iterations per candidate
    pub max_iter: usize,
    /// EM convergence threshold on |Δ log-likelihood|
    pub tol: f64,
    /// PRNG seed for k-means++ initialization
    pub seed: u64,
    /// Hosts with fewer flows than this are excluded from training
    pub min_flows_per_host: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            state_candidates: vec![2, 3, 4, 5, 6],
            max_iter: 100,
            tol: 1e-4,
            seed: 42,
            min_flows_per_host: 3,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl ModelConfig {
    pub fn hmm_options(&self) -> HmmOptions {
        HmmOptions {
            max_iter: self.max_iter,
            tol: self.tol,
            seed: self.seed,
        }
    }
}

impl AppConfig {
    /// Load from JSON file if present; otherwise return default
    pub fn load(path: &std::path::Path) -> Self {
        if path.exists() {
            if let Ok(data) = std::fs::read_to_string(path) {
                if let Ok(c) = serde_json::from_str::<AppConfig>(&data) {
                    return c;
                }
            }
        }
        Self::default()
    }
}
