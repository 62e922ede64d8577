use async_trait::async_trait;
use metron_models::{
    AnalysisBundle, BackendConfig, Candle, Decision, PatternAnalysis, PortfolioContext,
    RiskVerdict, Sentiment,
};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::backend::AnalysisBackend;
use crate::error::BackendError;
use crate::http::post_json;
use crate::parser;
use crate::prompts;

pub const GEMINI_ID: &str = "gemini";

/// Google Gemini over the `generateContent` REST endpoint.
///
/// Implements all four operations.
pub struct GeminiBackend {
    client: Client,
    config: BackendConfig,
    api_key: Option<String>,
}

impl GeminiBackend {
    pub fn new(client: Client, config: BackendConfig, api_key: Option<String>) -> Self {
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        Self {
            client,
            config,
            api_key,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Send one user prompt and return the concatenated reply text.
    async fn generate(&self, prompt: String) -> Result<String, BackendError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| BackendError::Transport("GEMINI API key not configured".to_string()))?;

        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": 0.2 },
        });

        debug!(backend = GEMINI_ID, model = %self.config.model, "Calling Gemini");
        let request = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", key);
        let reply = post_json(request, &body, self.config.request_timeout()).await?;
        let text = reply_text(&reply)?;
        debug!(backend = GEMINI_ID, chars = text.len(), "Gemini reply received");
        Ok(text)
    }
}

/// Join `candidates[0].content.parts[].text`.
fn reply_text(reply: &Value) -> Result<String, BackendError> {
    let parts = reply
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| BackendError::Parse("Gemini reply has no candidate content".to_string()))?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();

    if text.trim().is_empty() {
        return Err(BackendError::Parse("Gemini reply text is empty".to_string()));
    }
    Ok(text)
}

#[async_trait]
impl AnalysisBackend for GeminiBackend {
    fn id(&self) -> &str {
        GEMINI_ID
    }

    fn display_name(&self) -> &str {
        "Gemini Flash"
    }

    fn is_live(&self) -> bool {
        self.config.enabled && self.api_key.is_some()
    }

    async fn analyze_sentiment(&self, text: &str) -> Result<Sentiment, BackendError> {
        let raw = self.generate(prompts::sentiment_prompt(text)).await?;
        parser::parse_sentiment(&raw)
    }

    async fn analyze_pattern(&self, candles: &[Candle]) -> Result<PatternAnalysis, BackendError> {
        let raw = self.generate(prompts::pattern_prompt(candles)).await?;
        parser::parse_pattern(&raw)
    }

    async fn check_risk(&self, context: &PortfolioContext) -> Result<RiskVerdict, BackendError> {
        let raw = self.generate(prompts::risk_prompt(context)).await?;
        parser::parse_risk(&raw)
    }

    async fn make_decision(&self, bundle: &AnalysisBundle) -> Result<Decision, BackendError> {
        let raw = self.generate(prompts::decision_prompt(bundle)).await?;
        parser::parse_decision(&raw)
    }
}
