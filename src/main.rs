//! Flowstate entrypoint: read a batch of flow rows, train the behavioral
//! state model, and emit per-state narratives as ndjson. The surrounding
//! dashboard owns storage and write-back; this binary is the offline
//! training path.

use chrono::Utc;
use flowstate::{
    config::AppConfig,
    logging::{LogEvent, StructuredLogger},
    narrative::generate_narrative,
    pipeline::train_behavior_model,
    FlowRecord,
};
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::var("FLOWSTATE_CONFIG_PATH")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from("config.json"));
    let config = AppConfig::load(&config_path);

    StructuredLogger::init(config.log.json, &config.log.level);

    let mut args = std::env::args().skip(1);
    let flows_path = args
        .next()
        .ok_or("usage: flowstate <flows.json> [model-out.json]")?;
    let model_out = args.next();

    let data = std::fs::read_to_string(&flows_path)?;
    let flows: Vec<FlowRecord> = serde_json::from_str(&data)?;
    info!(count = flows.len(), path = %flows_path, "loaded flow rows");

    let model = train_behavior_model(&flows, &config.model)?;
    info!(
        n_states = model.hmm.n_states(),
        assigned = model.assignments.len(),
        log_likelihood = model.summary.log_likelihood,
        converged = model.summary.converged,
        "training complete"
    );

    if let Some(path) = model_out {
        let json = model.hmm.to_json()?;
        std::fs::write(&path, serde_json::to_string_pretty(&json)?)?;
        info!(path = %path, "model written");
    }

    let stdout = std::io::stdout();
    let mut w = stdout.lock();
    for (state, profile) in model.profiles.iter().enumerate() {
        let narrative = generate_narrative(profile);
        let event = LogEvent {
            ts: Utc::now().to_rfc3339(),
            level: "info",
            target: "flowstate",
            message: "state narrative",
            host: None,
            state: Some(state),
            log_likelihood: None,
            narrative: Some(&narrative),
            error: None,
        };
        StructuredLogger::emit_json(&event, &mut w);
    }

    Ok(())
}
