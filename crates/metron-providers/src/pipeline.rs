use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use metron_cache::Cached;
use metron_models::{
    AnalysisBundle, Decision, PatternAnalysis, PipelineConfig, PipelineInput, PipelineResult,
    RiskVerdict, Role, Sentiment, Stage, StageOutcome, StageReport,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::AnalysisBackend;
use crate::cached::AnalysisCache;
use crate::error::BackendError;
use crate::router::RoleRouter;

/// Report error for a role with no live backend.
const NO_BACKEND: &str = "no backend";

/// What one stage produced. `value` is `None` when the stage must use its default.
struct StageRun<T> {
    value: Option<T>,
    report: StageReport,
}

/// Runs sentiment, pattern and risk concurrently, then the strategist's
/// decision, then the optional validator cross-check.
///
/// Never fails: every stage that cannot produce a value falls back to its
/// documented default and the reason is recorded in the stage report.
pub struct DecisionPipeline {
    router: RoleRouter,
    cache: Arc<AnalysisCache>,
    config: PipelineConfig,
}

impl DecisionPipeline {
    pub fn new(router: RoleRouter, cache: Arc<AnalysisCache>, config: PipelineConfig) -> Self {
        Self {
            router,
            cache,
            config,
        }
    }

    pub fn router(&self) -> &RoleRouter {
        &self.router
    }

    pub fn cache(&self) -> &Arc<AnalysisCache> {
        &self.cache
    }

    /// Forget every memoized backend reply.
    pub fn flush_cache(&self) {
        self.cache.flush_all();
        info!("Result cache flushed");
    }

    pub async fn run(&self, input: &PipelineInput) -> PipelineResult {
        self.run_with_cancel(input, CancellationToken::new()).await
    }

    /// Like [`DecisionPipeline::run`], but any stage still in flight when
    /// `cancel` fires falls back to its default.
    pub async fn run_with_cancel(
        &self,
        input: &PipelineInput,
        cancel: CancellationToken,
    ) -> PipelineResult {
        let start = Instant::now();
        let id = Uuid::new_v4();
        info!(
            id = %id,
            symbol = %input.portfolio.symbol,
            candles = input.candles.len(),
            "Starting pipeline"
        );

        let cache = &self.cache;

        // Stages 1-3 are independent.
        let (sentiment, pattern, risk) = tokio::join!(
            self.run_stage(Stage::Sentiment, Role::Scout, &cancel, |b| async move {
                cache.analyze_sentiment(&b, &input.news_text).await
            }),
            self.run_stage(Stage::Pattern, Role::Strategist, &cancel, |b| async move {
                cache.analyze_pattern(&b, &input.candles).await
            }),
            self.run_stage(Stage::Risk, Role::RiskOfficer, &cancel, |b| async move {
                cache.check_risk(&b, &input.portfolio).await
            }),
        );

        let risk_default: fn() -> RiskVerdict = if risk.report.backend.is_some() {
            RiskVerdict::backend_error
        } else {
            RiskVerdict::no_backend
        };
        let bundle = AnalysisBundle {
            sentiment: sentiment.value.unwrap_or_else(Sentiment::neutral),
            pattern: pattern.value.unwrap_or_else(PatternAnalysis::unknown),
            risk: risk.value.unwrap_or_else(risk_default),
        };
        let mut stages = vec![sentiment.report, pattern.report, risk.report];

        let bundle_ref = &bundle;
        let decided = self
            .run_stage(Stage::Decision, Role::Strategist, &cancel, |b| async move {
                cache.make_decision(&b, bundle_ref).await
            })
            .await;
        let mut decision = decided.value.unwrap_or_default();
        let strategist_id = decided.report.backend.clone();
        stages.push(decided.report);

        // A validator that is the strategist would answer from the same cache
        // entry and could never disagree.
        let validator = if self.config.validator_enabled {
            self.router
                .resolve(Role::Validator)
                .filter(|v| match strategist_id.as_deref() {
                    Some(strategist) if v.id() == strategist => {
                        warn!(
                            id = %id,
                            backend = %strategist,
                            "Validator is the strategist, skipping cross-check"
                        );
                        false
                    }
                    _ => true,
                })
        } else {
            None
        };

        let mut validator_decision = None;
        if validator.is_some() {
            let validated = self
                .run_stage(Stage::Validation, Role::Validator, &cancel, |b| async move {
                    cache.make_decision(&b, bundle_ref).await
                })
                .await;
            validator_decision = validated.value;
            stages.push(validated.report);

            if decision.is_actionable() && validator_decision != Some(decision) {
                warn!(
                    id = %id,
                    strategist = %decision,
                    validator = ?validator_decision,
                    "Validator did not confirm decision, downgrading to HOLD"
                );
                decision = Decision::Hold;
            }
        }

        let processing_time_ms = start.elapsed().as_millis() as u64;
        let result = PipelineResult {
            id,
            decided_at: Utc::now(),
            sentiment: bundle.sentiment,
            pattern: bundle.pattern,
            risk: bundle.risk,
            decision,
            validator_decision,
            stages,
            processing_time_ms,
        };

        info!(
            id = %id,
            decision = %result.decision,
            degraded = result.degraded(),
            elapsed_ms = processing_time_ms,
            "Pipeline complete"
        );

        result
    }

    /// Resolve `role` and run `call` against it under the stage timeout and
    /// the caller's cancellation token.
    async fn run_stage<T, F, Fut>(
        &self,
        stage: Stage,
        role: Role,
        cancel: &CancellationToken,
        call: F,
    ) -> StageRun<T>
    where
        F: FnOnce(Arc<dyn AnalysisBackend>) -> Fut,
        Fut: Future<Output = Result<Cached<T>, BackendError>>,
    {
        let started = Instant::now();

        let Some(backend) = self.router.resolve(role) else {
            warn!(stage = ?stage, role = %role, "No live backend for role, using stage default");
            return StageRun {
                value: None,
                report: StageReport {
                    stage,
                    role,
                    backend: None,
                    outcome: StageOutcome::Fallback,
                    elapsed_ms: 0,
                    error: Some(NO_BACKEND.to_string()),
                },
            };
        };
        let backend_id = backend.id().to_string();

        let timeout = self.config.stage_timeout();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BackendError::Cancelled),
            outcome = tokio::time::timeout(timeout, call(backend)) => match outcome {
                Ok(result) => result,
                Err(_) => Err(BackendError::Timeout(timeout.as_millis() as u64)),
            },
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(cached) => StageRun {
                value: Some(cached.value),
                report: StageReport {
                    stage,
                    role,
                    backend: Some(backend_id),
                    outcome: if cached.hit {
                        StageOutcome::CacheHit
                    } else {
                        StageOutcome::Fresh
                    },
                    elapsed_ms,
                    error: None,
                },
            },
            Err(e) => {
                warn!(
                    stage = ?stage,
                    role = %role,
                    backend = %backend_id,
                    error = %e,
                    elapsed_ms,
                    "Stage failed, using stage default"
                );
                StageRun {
                    value: None,
                    report: StageReport {
                        stage,
                        role,
                        backend: Some(backend_id),
                        outcome: StageOutcome::Fallback,
                        elapsed_ms,
                        error: Some(e.to_string()),
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::TimeZone;
    use metron_models::{Candle, Operation, PortfolioContext, SentimentLabel, Signal};
    use rust_decimal_macros::dec;

    use crate::test_support::ScriptedBackend;

    fn input() -> PipelineInput {
        let ts = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        PipelineInput {
            news_text: "BTC rallies".to_string(),
            candles: vec![Candle {
                timestamp: ts,
                open: dec!(100),
                high: dec!(102),
                low: dec!(99),
                close: dec!(101),
                volume: dec!(10),
            }],
            portfolio: PortfolioContext {
                symbol: "BTC/USDT".to_string(),
                cash_balance: dec!(5000),
                total_equity: dec!(10000),
                open_positions: vec![],
                proposed_order: None,
                metadata: None,
            },
        }
    }

    fn pipeline(router: RoleRouter) -> DecisionPipeline {
        DecisionPipeline::new(
            router,
            Arc::new(AnalysisCache::new(Duration::from_secs(60))),
            PipelineConfig::default(),
        )
    }

    #[tokio::test]
    async fn healthy_run_reports_every_stage_fresh() {
        let gemini = Arc::new(
            ScriptedBackend::new("gemini")
                .with_sentiment(Sentiment {
                    score: 0.9,
                    label: SentimentLabel::Positive,
                })
                .with_pattern(PatternAnalysis {
                    pattern: "Hammer".to_string(),
                    signal: Signal::Bullish,
                })
                .with_decision(Decision::Buy),
        );
        let shared: Arc<dyn AnalysisBackend> = gemini.clone();
        let router = RoleRouter::new()
            .with_role(Role::Scout, vec![shared.clone()])
            .with_role(Role::Strategist, vec![shared.clone()])
            .with_role(Role::RiskOfficer, vec![shared]);

        let result = pipeline(router).run(&input()).await;

        assert_eq!(result.decision, Decision::Buy);
        assert_eq!(result.pattern.pattern, "Hammer");
        assert!(result.risk.approved);
        assert_eq!(result.validator_decision, None);
        assert_eq!(result.stages.len(), 4);
        assert!(result
            .stages
            .iter()
            .all(|r| r.outcome == StageOutcome::Fresh && r.backend.as_deref() == Some("gemini")));
        assert_eq!(gemini.calls(Operation::Decision), 1);
    }

    #[tokio::test]
    async fn second_identical_run_is_all_cache_hits() {
        let gemini = Arc::new(ScriptedBackend::new("gemini"));
        let shared: Arc<dyn AnalysisBackend> = gemini.clone();
        let router = RoleRouter::new()
            .with_role(Role::Scout, vec![shared.clone()])
            .with_role(Role::Strategist, vec![shared.clone()])
            .with_role(Role::RiskOfficer, vec![shared]);
        let pipeline = pipeline(router);

        pipeline.run(&input()).await;
        let second = pipeline.run(&input()).await;

        assert!(second
            .stages
            .iter()
            .all(|r| r.outcome == StageOutcome::CacheHit));
        assert_eq!(gemini.total_calls(), 4);

        pipeline.flush_cache();
        let third = pipeline.run(&input()).await;
        assert!(third
            .stages
            .iter()
            .all(|r| r.outcome == StageOutcome::Fresh));
        assert_eq!(gemini.total_calls(), 8);
    }

    #[tokio::test]
    async fn no_backends_yields_default_chain() {
        let result = pipeline(RoleRouter::new()).run(&input()).await;

        assert_eq!(result.sentiment, Sentiment::neutral());
        assert_eq!(result.pattern, PatternAnalysis::unknown());
        assert_eq!(result.risk, RiskVerdict::no_backend());
        assert_eq!(result.decision, Decision::Hold);
        assert!(result.degraded());
        assert!(result
            .stages
            .iter()
            .all(|r| r.backend.is_none() && r.error.as_deref() == Some("no backend")));
    }

    #[tokio::test]
    async fn validator_sharing_strategist_backend_is_skipped() {
        let gemini = Arc::new(ScriptedBackend::new("gemini").with_decision(Decision::Buy));
        let shared: Arc<dyn AnalysisBackend> = gemini.clone();
        let router = RoleRouter::new()
            .with_role(Role::Strategist, vec![shared.clone()])
            .with_role(Role::Validator, vec![shared]);

        let result = pipeline(router).run(&input()).await;

        assert_eq!(result.decision, Decision::Buy);
        assert_eq!(result.validator_decision, None);
        assert!(result.report(Stage::Validation).is_none());
        assert_eq!(gemini.calls(Operation::Decision), 1);
    }

    #[tokio::test]
    async fn failed_risk_officer_is_not_reported_as_missing() {
        let risk: Arc<dyn AnalysisBackend> = Arc::new(ScriptedBackend::new("gemini").failing());
        let router = RoleRouter::new().with_role(Role::RiskOfficer, vec![risk]);

        let result = pipeline(router).run(&input()).await;

        assert_eq!(result.risk, RiskVerdict::backend_error());
        let report = result.report(Stage::Risk).unwrap();
        assert_eq!(report.outcome, StageOutcome::Fallback);
        assert_eq!(report.backend.as_deref(), Some("gemini"));
    }

    #[tokio::test]
    async fn validator_disabled_skips_cross_check() {
        let strategist: Arc<dyn AnalysisBackend> =
            Arc::new(ScriptedBackend::new("gemini").with_decision(Decision::Sell));
        let validator = Arc::new(ScriptedBackend::new("deepseek").with_decision(Decision::Hold));
        let validator_handle: Arc<dyn AnalysisBackend> = validator.clone();
        let router = RoleRouter::new()
            .with_role(Role::Strategist, vec![strategist])
            .with_role(Role::Validator, vec![validator_handle]);

        let config = PipelineConfig {
            validator_enabled: false,
            ..PipelineConfig::default()
        };
        let pipeline = DecisionPipeline::new(
            router,
            Arc::new(AnalysisCache::new(Duration::from_secs(60))),
            config,
        );
        let result = pipeline.run(&input()).await;

        assert_eq!(result.decision, Decision::Sell);
        assert!(result.report(Stage::Validation).is_none());
        assert_eq!(validator.total_calls(), 0);
    }
}
