//! Metron - multi-model trading decision pipeline
//!
//! Routes sentiment, pattern, risk and decision calls to hosted model
//! backends by role, memoizes their replies, and degrades every stage to a
//! safe default when no backend can answer.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use metron::models::{MetronConfig, PipelineInput};
//!
//! # async fn run(input: PipelineInput) -> anyhow::Result<()> {
//! let pipeline = metron::build_pipeline(&MetronConfig::default())?;
//! let result = metron::evaluate(&pipeline, &input).await;
//! println!("{}", result.decision);
//! # Ok(())
//! # }
//! ```

pub use metron_cache as cache;
pub use metron_models as models;
pub use metron_providers as providers;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use metron_models::{BackendConfig, MetronConfig, PipelineInput, PipelineResult};
use metron_providers::http::build_client;
use metron_providers::{
    AnalysisBackend, AnalysisCache, DecisionPipeline, DeepSeekBackend, GeminiBackend, RoleRouter,
};
use tracing::{info, warn};

/// Read a TOML config file. Sections left out keep their defaults.
pub fn load_config(path: &Path) -> anyhow::Result<MetronConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("Failed to parse config: {}", path.display()))
}

/// API key from the environment variable the backend config names. Blank counts as missing.
fn api_key(name: &str, config: &BackendConfig) -> Option<String> {
    let key = std::env::var(&config.api_key_env)
        .ok()
        .filter(|k| !k.trim().is_empty());
    if key.is_none() && config.enabled {
        warn!(backend = name, env = %config.api_key_env, "API key not set, backend offline");
    }
    key
}

/// Build the adapters, role router and cache described by `config`.
///
/// Backends without credentials are still registered but never resolve, so
/// their roles fall through to the next candidate or the stage default.
pub fn build_pipeline(config: &MetronConfig) -> anyhow::Result<DecisionPipeline> {
    let client = build_client().context("Failed to build HTTP client")?;

    let gemini = GeminiBackend::new(
        client.clone(),
        config.backends.gemini.clone(),
        api_key("gemini", &config.backends.gemini),
    );
    let deepseek = DeepSeekBackend::new(
        client,
        config.backends.deepseek.clone(),
        api_key("deepseek", &config.backends.deepseek),
    );
    let backends: Vec<Arc<dyn AnalysisBackend>> = vec![Arc::new(gemini), Arc::new(deepseek)];

    let router = RoleRouter::from_config(&config.roles, &backends);
    router.log_assignments();

    let cache = Arc::new(AnalysisCache::new(config.cache.ttl()));
    info!(
        ttl_seconds = config.cache.ttl_seconds,
        stage_timeout_ms = config.pipeline.stage_timeout_ms,
        validator_enabled = config.pipeline.validator_enabled,
        "Pipeline ready"
    );

    Ok(DecisionPipeline::new(router, cache, config.pipeline.clone()))
}

/// Run one pipeline invocation. Never fails; degraded stages are reported in the result.
pub async fn evaluate(pipeline: &DecisionPipeline, input: &PipelineInput) -> PipelineResult {
    pipeline.run(input).await
}
