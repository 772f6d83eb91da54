//! Deterministic feature engineering from raw NetFlow fields.

mod extract;

pub use extract::{extract_flow_features, port_category, FEATURE_DIM};

use serde::{Deserialize, Serialize};

/// Fixed-order feature vector for one flow; immutable once produced.
pub type FeatureVector = [f64; FEATURE_DIM];

/// One raw flow row as delivered by the storage layer: NetFlow counters plus
/// an opaque row identifier and the destination host used for grouping.
/// Optional fields default when absent; extraction never produces NaN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowRecord {
    /// Opaque row identifier, echoed back in state assignments.
    pub id: String,
    /// Destination host IP; sequences are grouped per host.
    pub host: String,
    #[serde(rename = "IN_BYTES")]
    pub in_bytes: u64,
    #[serde(rename = "OUT_BYTES")]
    pub out_bytes: u64,
    #[serde(rename = "IN_PKTS")]
    pub in_pkts: u64,
    #[serde(rename = "OUT_PKTS")]
    pub out_pkts: u64,
    #[serde(rename = "FLOW_DURATION_MILLISECONDS")]
    pub flow_duration_ms: f64,
    #[serde(rename = "PROTOCOL")]
    pub protocol: u8,
    #[serde(rename = "L4_DST_PORT")]
    pub l4_dst_port: u16,
    #[serde(rename = "SRC_TO_DST_IAT_AVG", default)]
    pub src_to_dst_iat_avg: Option<f64>,
    #[serde(rename = "CONN_STATE", default)]
    pub conn_state: Option<String>,
    #[serde(rename = "INTER_FLOW_GAP_MS", default)]
    pub inter_flow_gap_ms: Option<f64>,
}
