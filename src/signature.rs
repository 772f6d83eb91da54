//! Per-state aggregation: flows + state assignments → `StateProfile`s.
//!
//! One pass over the assigned flows accumulating counters per state, then a
//! finalize step producing averages and share distributions. States with no
//! assigned flows yield an all-zero profile, which the narrative stage still
//! renders.

use crate::features::FlowRecord;
use crate::narrative::{PortCategoryDist, ProtocolDist, StateProfile};

#[derive(Default)]
struct StateAccum {
    flows: u64,
    in_bytes: f64,
    out_bytes: f64,
    duration_ms: f64,
    pkts_per_sec: f64,
    tcp: u64,
    udp: u64,
    icmp: u64,
    well_known: u64,
    registered: u64,
    ephemeral: u64,
}

/// Aggregate flows into one `StateProfile` per state id in `[0, n_states)`.
///
/// `states[i]` is the state assigned to `flows[i]`; out-of-range state ids
/// are ignored. The packets-per-second figure uses the same clamped-duration
/// formula as feature extraction.
pub fn state_profiles(flows: &[FlowRecord], states: &[usize], n_states: usize) -> Vec<StateProfile> {
    let mut acc: Vec<StateAccum> = (0..n_states).map(|_| StateAccum::default()).collect();

    for (flow, &state) in flows.iter().zip(states.iter()) {
        let Some(a) = acc.get_mut(state) else {
            continue;
        };
        a.flows += 1;
        a.in_bytes += flow.in_bytes as f64;
        a.out_bytes += flow.out_bytes as f64;
        a.duration_ms += flow.flow_duration_ms;
        let duration_secs = (flow.flow_duration_ms / 1000.0).max(0.001);
        a.pkts_per_sec += (flow.in_pkts + flow.out_pkts) as f64 / duration_secs;
        match flow.protocol {
            6 => a.tcp += 1,
            17 => a.udp += 1,
            1 => a.icmp += 1,
            _ => {}
        }
        if flow.l4_dst_port <= 1023 {
            a.well_known += 1;
        } else if flow.l4_dst_port <= 49151 {
            a.registered += 1;
        } else {
            a.ephemeral += 1;
        }
    }

    acc.into_iter()
        .map(|a| {
            if a.flows == 0 {
                return StateProfile::default();
            }
            let n = a.flows as f64;
            let avg_in = a.in_bytes / n;
            let avg_out = a.out_bytes / n;
            StateProfile {
                flow_count: a.flows,
                avg_in_bytes: avg_in,
                avg_out_bytes: avg_out,
                bytes_ratio: avg_in / (avg_out + 1.0),
                avg_duration_ms: a.duration_ms / n,
                avg_pkts_per_sec: a.pkts_per_sec / n,
                protocol_dist: ProtocolDist {
                    tcp: a.tcp as f64 / n,
                    udp: a.udp as f64 / n,
                    icmp: a.icmp as f64 / n,
                },
                port_category_dist: PortCategoryDist {
                    well_known: a.well_known as f64 / n,
                    registered: a.registered as f64 / n,
                    ephemeral: a.ephemeral as f64 / n,
                },
            }
        })
        .collect()
}
