use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::{Decision, PatternAnalysis, RiskVerdict, Sentiment};
use crate::market::{Candle, PortfolioContext};
use crate::role::Role;

/// Everything one pipeline invocation needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineInput {
    pub news_text: String,
    /// Oldest first.
    pub candles: Vec<Candle>,
    pub portfolio: PortfolioContext,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Sentiment,
    Pattern,
    Risk,
    Decision,
    /// Validator cross-check of the strategist's decision.
    Validation,
}

/// How a stage value was obtained.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    CacheHit,
    Fresh,
    /// The documented stage default was substituted.
    Fallback,
}

/// Per-stage record for the external telemetry collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageReport {
    pub stage: Stage,
    pub role: Role,
    /// Backend id that served the stage. None when the role had no live backend.
    pub backend: Option<String>,
    pub outcome: StageOutcome,
    pub elapsed_ms: u64,
    /// Why the stage fell back, if it did.
    pub error: Option<String>,
}

/// Aggregate output of one pipeline run. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineResult {
    pub id: Uuid,
    pub decided_at: DateTime<Utc>,
    pub sentiment: Sentiment,
    pub pattern: PatternAnalysis,
    pub risk: RiskVerdict,
    /// Final decision after the validator cross-check.
    pub decision: Decision,
    /// What the validator said, when one was consulted and answered.
    pub validator_decision: Option<Decision>,
    pub stages: Vec<StageReport>,
    pub processing_time_ms: u64,
}

impl PipelineResult {
    pub fn report(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|r| r.stage == stage)
    }

    /// True when any stage ran on its default.
    pub fn degraded(&self) -> bool {
        self.stages
            .iter()
            .any(|r| r.outcome == StageOutcome::Fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SentimentLabel;

    fn report(stage: Stage, outcome: StageOutcome) -> StageReport {
        StageReport {
            stage,
            role: Role::Scout,
            backend: Some("gemini".to_string()),
            outcome,
            elapsed_ms: 12,
            error: None,
        }
    }

    fn sample_result(stages: Vec<StageReport>) -> PipelineResult {
        PipelineResult {
            id: Uuid::new_v4(),
            decided_at: Utc::now(),
            sentiment: Sentiment {
                score: 0.6,
                label: SentimentLabel::Positive,
            },
            pattern: PatternAnalysis::unknown(),
            risk: RiskVerdict::no_backend(),
            decision: Decision::Hold,
            validator_decision: None,
            stages,
            processing_time_ms: 40,
        }
    }

    #[test]
    fn degraded_when_any_stage_fell_back() {
        let healthy = sample_result(vec![
            report(Stage::Sentiment, StageOutcome::Fresh),
            report(Stage::Pattern, StageOutcome::CacheHit),
        ]);
        assert!(!healthy.degraded());

        let degraded = sample_result(vec![
            report(Stage::Sentiment, StageOutcome::Fresh),
            report(Stage::Risk, StageOutcome::Fallback),
        ]);
        assert!(degraded.degraded());
        assert_eq!(
            degraded.report(Stage::Risk).unwrap().outcome,
            StageOutcome::Fallback
        );
        assert!(degraded.report(Stage::Validation).is_none());
    }

    #[test]
    fn outcome_serialization() {
        assert_eq!(
            serde_json::to_string(&StageOutcome::CacheHit).unwrap(),
            "\"cache_hit\""
        );
    }
}
