//! Pipeline benchmark: feature extraction and HMM training/decoding on
//! synthetic flow batches.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flowstate::{
    extract_flow_features,
    model::{GaussianHmm, HmmOptions},
    FlowRecord,
};
use ndarray::Array2;

fn make_flows(n: usize) -> Vec<FlowRecord> {
    (0..n)
        .map(|i| FlowRecord {
            id: format!("bench-{i}"),
            host: format!("10.0.{}.{}", i / 256, i % 256),
            in_bytes: 500 + (i as u64 % 9000),
            out_bytes: 200 + (i as u64 % 3000),
            in_pkts: 5 + (i as u64 % 40),
            out_pkts: 3 + (i as u64 % 20),
            flow_duration_ms: 50.0 + (i % 10000) as f64,
            protocol: if i % 3 == 0 { 17 } else { 6 },
            l4_dst_port: (i % 60000) as u16,
            src_to_dst_iat_avg: Some((i % 100) as f64),
            conn_state: Some((if i % 5 == 0 { "REJ" } else { "SF" }).to_string()),
            inter_flow_gap_ms: Some((i % 500) as f64),
        })
        .collect()
}

fn make_sequences(n_seqs: usize, len: usize) -> Vec<Array2<f64>> {
    let flows = make_flows(n_seqs * len);
    (0..n_seqs)
        .map(|s| {
            let mut seq = Array2::<f64>::zeros((len, flowstate::FEATURE_DIM));
            for t in 0..len {
                let features = extract_flow_features(&flows[s * len + t]);
                for (j, &v) in features.iter().enumerate() {
                    seq[[t, j]] = v;
                }
            }
            seq
        })
        .collect()
}

fn bench_feature_extraction(c: &mut Criterion) {
    let flows = make_flows(1000);
    c.bench_function("extract_features_1000_flows", |b| {
        b.iter(|| {
            for flow in black_box(&flows) {
                black_box(extract_flow_features(flow));
            }
        })
    });
}

fn bench_fit(c: &mut Criterion) {
    let sequences = make_sequences(8, 50);
    c.bench_function("hmm_fit_3_states_400_obs", |b| {
        b.iter(|| {
            let mut hmm = GaussianHmm::new(
                3,
                flowstate::FEATURE_DIM,
                HmmOptions {
                    max_iter: 10,
                    tol: 1e-4,
                    seed: 1,
                },
            )
            .unwrap();
            black_box(hmm.fit(black_box(&sequences)).unwrap())
        })
    });
}

fn bench_predict(c: &mut Criterion) {
    let sequences = make_sequences(8, 50);
    let mut hmm = GaussianHmm::new(
        3,
        flowstate::FEATURE_DIM,
        HmmOptions {
            max_iter: 10,
            tol: 1e-4,
            seed: 1,
        },
    )
    .unwrap();
    hmm.fit(&sequences).unwrap();
    c.bench_function("hmm_predict_50_obs", |b| {
        b.iter(|| black_box(hmm.predict(black_box(&sequences[0])).unwrap()))
    });
}

criterion_group!(benches, bench_feature_extraction, bench_fit, bench_predict);
criterion_main!(benches);
