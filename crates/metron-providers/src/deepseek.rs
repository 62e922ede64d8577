use async_trait::async_trait;
use metron_models::{
    AnalysisBundle, BackendConfig, Candle, Decision, PatternAnalysis, PortfolioContext,
    RiskVerdict, Sentiment,
};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::backend::AnalysisBackend;
use crate::error::BackendError;
use crate::http::post_json;
use crate::parser;
use crate::prompts;

pub const DEEPSEEK_ID: &str = "deepseek";

/// Reason attached to the placeholder risk verdict.
pub const RISK_PLACEHOLDER_REASON: &str =
    "DeepSeek risk review not implemented; approving by default";

/// DeepSeek through its OpenAI-compatible chat completions API.
///
/// Sentiment and pattern reads call the model. Risk and decision are
/// placeholders that answer locally: risk is always approved and the
/// decision is always HOLD. Route those roles elsewhere for real answers.
pub struct DeepSeekBackend {
    client: Client,
    config: BackendConfig,
    api_key: Option<String>,
}

impl DeepSeekBackend {
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
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    async fn chat(&self, prompt: String) -> Result<String, BackendError> {
        let key = self.api_key.as_deref().ok_or_else(|| {
            BackendError::Transport("DEEPSEEK API key not configured".to_string())
        })?;

        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": prompts::analyst_system_prompt() },
                { "role": "user", "content": prompt },
            ],
            "stream": false,
        });

        debug!(backend = DEEPSEEK_ID, model = %self.config.model, "Calling DeepSeek");
        let request = self.client.post(self.endpoint()).bearer_auth(key);
        let reply = post_json(request, &body, self.config.request_timeout()).await?;

        let text = reply
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                BackendError::Parse("DeepSeek reply has no message content".to_string())
            })?;

        debug!(backend = DEEPSEEK_ID, chars = text.len(), "DeepSeek reply received");
        Ok(text.to_string())
    }
}

#[async_trait]
impl AnalysisBackend for DeepSeekBackend {
    fn id(&self) -> &str {
        DEEPSEEK_ID
    }

    fn display_name(&self) -> &str {
        "DeepSeek V3 (Strategist)"
    }

    fn is_live(&self) -> bool {
        self.config.enabled && self.api_key.is_some()
    }

    async fn analyze_sentiment(&self, text: &str) -> Result<Sentiment, BackendError> {
        let raw = self.chat(prompts::sentiment_prompt(text)).await?;
        parser::parse_sentiment(&raw)
    }

    async fn analyze_pattern(&self, candles: &[Candle]) -> Result<PatternAnalysis, BackendError> {
        let raw = self.chat(prompts::pattern_prompt(candles)).await?;
        parser::parse_pattern(&raw)
    }

    async fn check_risk(&self, context: &PortfolioContext) -> Result<RiskVerdict, BackendError> {
        warn!(
            backend = DEEPSEEK_ID,
            symbol = %context.symbol,
            "Risk check answered by placeholder"
        );
        Ok(RiskVerdict {
            approved: true,
            reason: RISK_PLACEHOLDER_REASON.to_string(),
        })
    }

    async fn make_decision(&self, _bundle: &AnalysisBundle) -> Result<Decision, BackendError> {
        warn!(backend = DEEPSEEK_ID, "Decision answered by placeholder");
        Ok(Decision::Hold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn backend(key: Option<&str>) -> DeepSeekBackend {
        DeepSeekBackend::new(
            Client::new(),
            BackendConfig::deepseek(),
            key.map(str::to_string),
        )
    }

    #[test]
    fn endpoint_under_base_url() {
        assert_eq!(
            backend(Some("k")).endpoint(),
            "https://api.deepseek.com/v1/chat/completions"
        );
    }

    #[test]
    fn blank_key_is_not_live() {
        assert!(backend(Some("sk-1")).is_live());
        assert!(!backend(Some("")).is_live());
        assert!(!backend(None).is_live());
    }

    #[tokio::test]
    async fn risk_and_decision_are_placeholders() {
        let b = backend(None);
        let ctx = PortfolioContext {
            symbol: "BTC/USDT".to_string(),
            cash_balance: dec!(1000),
            total_equity: dec!(1000),
            open_positions: vec![],
            proposed_order: None,
            metadata: None,
        };
        let verdict = b.check_risk(&ctx).await.unwrap();
        assert!(verdict.approved);
        assert_eq!(verdict.reason, RISK_PLACEHOLDER_REASON);

        let bundle = AnalysisBundle {
            sentiment: Sentiment::neutral(),
            pattern: PatternAnalysis::unknown(),
            risk: RiskVerdict::no_backend(),
        };
        assert_eq!(b.make_decision(&bundle).await.unwrap(), Decision::Hold);
    }
}
