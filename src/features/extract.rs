//! Flow row → fixed 16-dimensional feature vector.

use super::FlowRecord;

/// Number of features produced per flow.
pub const FEATURE_DIM: usize = 16;

/// Connection states counted as rejected/reset (Zeek-style).
const REJECTED_CONN_STATES: &[&str] = &["S0", "REJ", "RSTO", "RSTR"];

/// Port category: 0 = well-known (<= 1023), 1 = registered (1024..=49151),
/// 2 = ephemeral (>= 49152).
pub fn port_category(port: u16) -> f64 {
    if port <= 1023 {
        0.0
    } else if port <= 49151 {
        1.0
    } else {
        2.0
    }
}

/// Map one raw flow row to its 16-element feature vector.
///
/// Pure and deterministic; missing optional fields default to 0 and no
/// combination of inputs produces NaN. Field order is fixed and is part of
/// the model contract — trained models are only valid against vectors
/// produced by this function.
pub fn extract_flow_features(flow: &FlowRecord) -> [f64; FEATURE_DIM] {
    let in_bytes = flow.in_bytes as f64;
    let out_bytes = flow.out_bytes as f64;
    let in_pkts = flow.in_pkts as f64;
    let out_pkts = flow.out_pkts as f64;
    let duration_ms = flow.flow_duration_ms;

    let total_pkts = in_pkts + out_pkts;
    let duration_secs = (duration_ms / 1000.0).max(0.001);
    let bytes_per_pkt = (in_bytes + out_bytes) / total_pkts.max(1.0);

    let conn_state = flow.conn_state.as_deref();
    let is_complete = conn_state == Some("SF");
    let is_rejected = conn_state.is_some_and(|s| REJECTED_CONN_STATES.contains(&s));

    [
        in_bytes.ln_1p(),
        out_bytes.ln_1p(),
        in_pkts.ln_1p(),
        out_pkts.ln_1p(),
        duration_ms.ln_1p(),
        flow.src_to_dst_iat_avg.unwrap_or(0.0).ln_1p(),
        in_bytes / (out_bytes + 1.0),
        total_pkts / duration_secs,
        if flow.protocol == 6 { 1.0 } else { 0.0 },
        if flow.protocol == 17 { 1.0 } else { 0.0 },
        if flow.protocol == 1 { 1.0 } else { 0.0 },
        port_category(flow.l4_dst_port),
        if is_complete { 1.0 } else { 0.0 },
        if is_rejected { 1.0 } else { 0.0 },
        bytes_per_pkt.ln_1p(),
        flow.inter_flow_gap_ms.unwrap_or(0.0).ln_1p(),
    ]
}
