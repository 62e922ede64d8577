//! Scripted backend for exercising the cache, router and pipeline without a network.
//!
//! `ScriptedBackend` answers every operation with a configurable canned reply,
//! counts calls per operation, and can be told to sleep or fail. Sleeps use
//! `tokio::time`, so tests running on a paused clock stay instant.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use metron_models::{
    AnalysisBundle, Candle, Decision, Operation, PatternAnalysis, PortfolioContext, RiskVerdict,
    Sentiment,
};

use crate::backend::AnalysisBackend;
use crate::error::BackendError;

#[derive(Debug, Clone)]
struct Replies {
    sentiment: Sentiment,
    pattern: PatternAnalysis,
    risk: RiskVerdict,
    decision: Decision,
}

pub struct ScriptedBackend {
    id: String,
    live: bool,
    delay: Duration,
    failing: AtomicBool,
    replies: Mutex<Replies>,
    calls: [AtomicUsize; 4],
}

impl ScriptedBackend {
    /// A live backend replying neutral sentiment, an unknown pattern, an
    /// approved risk check and HOLD.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            live: true,
            delay: Duration::ZERO,
            failing: AtomicBool::new(false),
            replies: Mutex::new(Replies {
                sentiment: Sentiment::neutral(),
                pattern: PatternAnalysis::unknown(),
                risk: RiskVerdict {
                    approved: true,
                    reason: format!("{id} approves"),
                },
                decision: Decision::Hold,
            }),
            calls: Default::default(),
        }
    }

    /// Registered but without credentials.
    pub fn offline(mut self) -> Self {
        self.live = false;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(self) -> Self {
        self.set_failing(true);
        self
    }

    pub fn with_sentiment(self, sentiment: Sentiment) -> Self {
        self.replies().sentiment = sentiment;
        self
    }

    pub fn with_pattern(self, pattern: PatternAnalysis) -> Self {
        self.replies().pattern = pattern;
        self
    }

    pub fn with_risk(self, risk: RiskVerdict) -> Self {
        self.replies().risk = risk;
        self
    }

    pub fn with_decision(self, decision: Decision) -> Self {
        self.set_decision(decision);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_decision(&self, decision: Decision) {
        self.replies().decision = decision;
    }

    /// Calls that reached this backend for `operation`, cache hits excluded.
    pub fn calls(&self, operation: Operation) -> usize {
        self.calls[slot(operation)].load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.iter().map(|c| c.load(Ordering::SeqCst)).sum()
    }

    fn replies(&self) -> MutexGuard<'_, Replies> {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn answer<T>(
        &self,
        operation: Operation,
        pick: impl FnOnce(&Replies) -> T,
    ) -> Result<T, BackendError> {
        self.calls[slot(operation)].fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(BackendError::Transport(format!(
                "{} scripted {operation} failure",
                self.id
            )));
        }
        let replies = self.replies();
        Ok(pick(&replies))
    }
}

fn slot(operation: Operation) -> usize {
    match operation {
        Operation::Sentiment => 0,
        Operation::Pattern => 1,
        Operation::Risk => 2,
        Operation::Decision => 3,
    }
}

#[async_trait]
impl AnalysisBackend for ScriptedBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.id
    }

    fn is_live(&self) -> bool {
        self.live
    }

    async fn analyze_sentiment(&self, _text: &str) -> Result<Sentiment, BackendError> {
        self.answer(Operation::Sentiment, |r| r.sentiment.clone()).await
    }

    async fn analyze_pattern(&self, _candles: &[Candle]) -> Result<PatternAnalysis, BackendError> {
        self.answer(Operation::Pattern, |r| r.pattern.clone()).await
    }

    async fn check_risk(&self, _context: &PortfolioContext) -> Result<RiskVerdict, BackendError> {
        self.answer(Operation::Risk, |r| r.risk.clone()).await
    }

    async fn make_decision(&self, _bundle: &AnalysisBundle) -> Result<Decision, BackendError> {
        self.answer(Operation::Decision, |r| r.decision).await
    }
}
