use async_trait::async_trait;
use metron_models::{
    AnalysisBundle, Candle, Decision, PatternAnalysis, PortfolioContext, RiskVerdict, Sentiment,
};

use crate::error::BackendError;

/// Capability contract every model provider implements. Mockable for testing.
///
/// Implementations only talk to their provider. Caching, fallback and stage
/// defaults are handled by [`crate::AnalysisCache`], [`crate::RoleRouter`] and
/// [`crate::DecisionPipeline`].
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Stable id used in role configuration and cache keys (e.g. `gemini`).
    fn id(&self) -> &str;

    /// Human readable name for role tables and logs.
    fn display_name(&self) -> &str;

    /// Whether the backend was configured with usable credentials.
    fn is_live(&self) -> bool;

    async fn analyze_sentiment(&self, text: &str) -> Result<Sentiment, BackendError>;

    async fn analyze_pattern(&self, candles: &[Candle]) -> Result<PatternAnalysis, BackendError>;

    async fn check_risk(&self, context: &PortfolioContext) -> Result<RiskVerdict, BackendError>;

    async fn make_decision(&self, bundle: &AnalysisBundle) -> Result<Decision, BackendError>;
}
