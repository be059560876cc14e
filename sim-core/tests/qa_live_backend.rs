//! Smoke test against a real generation endpoint. Ignored by default;
//! point SIM_AI_ENDPOINT at a server (and set SIM_AI_PROVIDER if it is not
//! the generic dialect) to run it:
//!
//! ```bash
//! SIM_AI_ENDPOINT=http://localhost:5001/api/v1/generate \
//!   cargo test -p sim-core --test qa_live_backend -- --ignored
//! ```

use localai::{BackendSettings, GenerateRequest, LocalAi, Provider};

fn live_settings() -> Option<BackendSettings> {
    dotenvy::dotenv().ok();
    let endpoint = std::env::var("SIM_AI_ENDPOINT").ok()?;
    let provider = match std::env::var("SIM_AI_PROVIDER").ok().as_deref() {
        Some("koboldcpp") => Provider::KoboldCpp,
        Some("openrouter") => Provider::OpenRouter,
        Some("huggingface") => Provider::HuggingFace,
        _ => Provider::Generic,
    };
    Some(BackendSettings {
        enabled: true,
        provider,
        endpoint,
        api_key_env: std::env::var("SIM_AI_KEY_ENV").unwrap_or_default(),
        ..BackendSettings::default()
    })
}

#[tokio::test]
#[ignore]
async fn live_backend_returns_text() {
    let Some(settings) = live_settings() else {
        eprintln!("SIM_AI_ENDPOINT not set, skipping");
        return;
    };
    let client = LocalAi::new(settings).expect("client builds");
    let request = GenerateRequest::new(
        "You are a dry-witted teenage friend. Reply in one short sentence.",
        "I survived another shift at the fryer.",
    );
    let text = client.generate(&request).await.expect("live completion");
    assert!(!text.trim().is_empty());
}
