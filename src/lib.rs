//! Flowstate — behavioral state modeling for NetFlow security analytics.
//!
//! Clusters network flows into a small number of recurring behavioral
//! archetypes (scanning, exfiltration, DNS chatter, web browsing, …) without
//! labeled data, and renders a human-readable description of each state.
//!
//! Modular structure:
//! - [`features`] — Deterministic 16-feature extraction from raw flow fields
//! - [`model`] — Z-score standardization and the Gaussian-emission HMM
//! - [`signature`] — Per-state aggregation of assigned flows
//! - [`narrative`] — Rule-based state descriptions
//! - [`pipeline`] — Flows → features → BIC model selection → assignments
//! - [`logging`] — Structured JSON logging

pub mod config;
pub mod error;
pub mod features;
pub mod logging;
pub mod model;
pub mod narrative;
pub mod pipeline;
pub mod signature;

pub use config::{AppConfig, ModelConfig};
pub use error::ModelError;
pub use features::{extract_flow_features, FeatureVector, FlowRecord, FEATURE_DIM};
pub use logging::StructuredLogger;
pub use model::{FitSummary, GaussianHmm, HmmOptions, StandardScaler};
pub use narrative::{generate_narrative, StateProfile};
pub use pipeline::{train_behavior_model, BehaviorModel};
pub use signature::state_profiles;
