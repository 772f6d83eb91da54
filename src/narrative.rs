//! Rule-based narrative generation for behavioral states.
//!
//! Turns per-state aggregate statistics into a one-sentence description by
//! independently classifying volume, duration, direction, protocol mix and
//! port usage against fixed threshold bands, then concatenating the
//! descriptors. Total: never fails, never returns an empty string.

use serde::{Deserialize, Serialize};

/// Protocol share of a state's flows; a probability distribution.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ProtocolDist {
    pub tcp: f64,
    pub udp: f64,
    pub icmp: f64,
}

/// Destination-port-category share of a state's flows.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortCategoryDist {
    pub well_known: f64,
    pub registered: f64,
    pub ephemeral: f64,
}

/// Aggregate statistics for one HMM state, as produced by the per-state
/// aggregation over assigned flows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateProfile {
    pub flow_count: u64,
    pub avg_in_bytes: f64,
    pub avg_out_bytes: f64,
    pub bytes_ratio: f64,
    pub avg_duration_ms: f64,
    pub avg_pkts_per_sec: f64,
    pub protocol_dist: ProtocolDist,
    pub port_category_dist: PortCategoryDist,
}

fn volume_descriptor(profile: &StateProfile) -> &'static str {
    let total = profile.avg_in_bytes + profile.avg_out_bytes;
    if total < 1000.0 {
        "low-volume"
    } else if total < 50000.0 {
        "medium-volume"
    } else {
        "high-volume"
    }
}

fn duration_descriptor(profile: &StateProfile) -> &'static str {
    if profile.avg_duration_ms < 100.0 {
        "short-duration"
    } else if profile.avg_duration_ms < 10000.0 {
        "medium-duration"
    } else {
        "long-duration"
    }
}

fn direction_descriptor(profile: &StateProfile) -> &'static str {
    let total = profile.avg_in_bytes + profile.avg_out_bytes;
    if total <= 0.0 {
        return "bidirectional";
    }
    // strictly greater: an exact 70/30 split is still bidirectional
    let inbound = profile.avg_in_bytes / total;
    if inbound > 0.7 {
        "inbound-heavy"
    } else if inbound < 0.3 {
        "outbound-heavy"
    } else {
        "bidirectional"
    }
}

fn protocol_descriptor(profile: &StateProfile) -> &'static str {
    let p = &profile.protocol_dist;
    if p.tcp > 0.8 {
        "TCP flows"
    } else if p.tcp > 0.5 {
        "predominantly TCP traffic"
    } else if p.udp > 0.5 {
        if p.icmp > 0.1 {
            "mixed protocol (UDP/ICMP) traffic"
        } else if p.udp > 0.8 {
            "UDP flows"
        } else {
            "predominantly UDP traffic"
        }
    } else if p.icmp > 0.5 {
        "ICMP traffic"
    } else {
        "mixed protocol traffic"
    }
}

fn port_descriptor(profile: &StateProfile) -> &'static str {
    let p = &profile.port_category_dist;
    if p.well_known > 0.6 {
        "well-known ports"
    } else if p.registered > 0.6 {
        "registered ports"
    } else if p.ephemeral > 0.6 {
        "ephemeral ports"
    } else {
        "mixed port ranges"
    }
}

/// Render a human-readable description of one behavioral state.
pub fn generate_narrative(profile: &StateProfile) -> String {
    format!(
        "This state captures {}, {}, {} activity: {} on {} ({} flows, ~{:.1} pkts/s).",
        volume_descriptor(profile),
        duration_descriptor(profile),
        direction_descriptor(profile),
        protocol_descriptor(profile),
        port_descriptor(profile),
        profile.flow_count,
        profile.avg_pkts_per_sec,
    )
}
