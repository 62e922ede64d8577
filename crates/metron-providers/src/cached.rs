use std::sync::Arc;
use std::time::Duration;

use metron_cache::{CacheKey, Cached, Fingerprint, ResultCache};
use metron_models::{
    AnalysisBundle, Candle, Decision, Operation, PatternAnalysis, PortfolioContext, RiskVerdict,
    Sentiment,
};

use crate::backend::AnalysisBackend;
use crate::error::BackendError;

/// Memoizes every backend operation behind a shared TTL.
///
/// Keys are `(backend id, operation, fingerprint)`, so two backends answering
/// the same request never share an entry. Concurrent identical requests make
/// one backend call. Failures reach every waiter and are not stored.
pub struct AnalysisCache {
    ttl: Duration,
    sentiment: ResultCache<Sentiment>,
    pattern: ResultCache<PatternAnalysis>,
    risk: ResultCache<RiskVerdict>,
    decision: ResultCache<Decision>,
}

impl AnalysisCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sentiment: ResultCache::new(),
            pattern: ResultCache::new(),
            risk: ResultCache::new(),
            decision: ResultCache::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn analyze_sentiment(
        &self,
        backend: &Arc<dyn AnalysisBackend>,
        text: &str,
    ) -> Result<Cached<Sentiment>, BackendError> {
        let key = CacheKey::new(backend.id(), Operation::Sentiment, Fingerprint::text(text));
        self.sentiment
            .get_or_compute(key, self.ttl, backend.analyze_sentiment(text))
            .await
            .map_err(unshare)
    }

    /// Keyed on the trailing candle window only; the call still sees the full series.
    pub async fn analyze_pattern(
        &self,
        backend: &Arc<dyn AnalysisBackend>,
        candles: &[Candle],
    ) -> Result<Cached<PatternAnalysis>, BackendError> {
        let key = CacheKey::new(backend.id(), Operation::Pattern, Fingerprint::candles(candles)?);
        self.pattern
            .get_or_compute(key, self.ttl, backend.analyze_pattern(candles))
            .await
            .map_err(unshare)
    }

    pub async fn check_risk(
        &self,
        backend: &Arc<dyn AnalysisBackend>,
        context: &PortfolioContext,
    ) -> Result<Cached<RiskVerdict>, BackendError> {
        let key = CacheKey::new(backend.id(), Operation::Risk, Fingerprint::portfolio(context)?);
        self.risk
            .get_or_compute(key, self.ttl, backend.check_risk(context))
            .await
            .map_err(unshare)
    }

    pub async fn make_decision(
        &self,
        backend: &Arc<dyn AnalysisBackend>,
        bundle: &AnalysisBundle,
    ) -> Result<Cached<Decision>, BackendError> {
        let key = CacheKey::new(backend.id(), Operation::Decision, Fingerprint::bundle(bundle)?);
        self.decision
            .get_or_compute(key, self.ttl, backend.make_decision(bundle))
            .await
            .map_err(unshare)
    }

    /// Drop every memoized reply.
    pub fn flush_all(&self) {
        self.sentiment.flush();
        self.pattern.flush();
        self.risk.flush();
        self.decision.flush();
    }

    /// Live entries across all operations.
    pub async fn entry_count(&self) -> u64 {
        self.sentiment.entry_count().await
            + self.pattern.entry_count().await
            + self.risk.entry_count().await
            + self.decision.entry_count().await
    }
}

fn unshare(e: Arc<BackendError>) -> BackendError {
    BackendError::clone(&e)
}
