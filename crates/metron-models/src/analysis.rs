use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl FromStr for SentimentLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            "neutral" => Ok(Self::Neutral),
            other => Err(format!("unknown sentiment label: {other}")),
        }
    }
}

/// Sentiment of a piece of news or social text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sentiment {
    /// -1.0 (very negative) to 1.0 (very positive).
    pub score: f64,
    pub label: SentimentLabel,
}

impl Sentiment {
    /// Stage default when no scout is available.
    pub fn neutral() -> Self {
        Self {
            score: 0.0,
            label: SentimentLabel::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Bullish,
    Bearish,
    None,
}

impl FromStr for Signal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bullish" => Ok(Self::Bullish),
            "bearish" => Ok(Self::Bearish),
            "none" | "neutral" => Ok(Self::None),
            other => Err(format!("unknown pattern signal: {other}")),
        }
    }
}

/// Candlestick pattern read from recent OHLCV data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatternAnalysis {
    pub pattern: String,
    pub signal: Signal,
}

impl PatternAnalysis {
    pub const UNKNOWN: &'static str = "Unknown";

    pub fn unknown() -> Self {
        Self {
            pattern: Self::UNKNOWN.to_string(),
            signal: Signal::None,
        }
    }
}

/// Risk officer verdict on the proposed trade.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RiskVerdict {
    pub approved: bool,
    pub reason: String,
}

impl RiskVerdict {
    pub const NO_BACKEND: &'static str = "no backend";

    /// Stage default: deny when nobody can review the trade.
    pub fn no_backend() -> Self {
        Self {
            approved: false,
            reason: Self::NO_BACKEND.to_string(),
        }
    }

    pub const BACKEND_ERROR: &'static str = "AI Error";

    /// Stage default when the risk officer was reachable but failed,
    /// timed out or was cancelled.
    pub fn backend_error() -> Self {
        Self {
            approved: false,
            reason: Self::BACKEND_ERROR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Buy,
    Sell,
    #[default]
    Hold,
}

impl Decision {
    /// True for decisions that would place an order.
    pub fn is_actionable(self) -> bool {
        !matches!(self, Decision::Hold)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Decision::Buy => "BUY",
            Decision::Sell => "SELL",
            Decision::Hold => "HOLD",
        };
        f.write_str(s)
    }
}

impl FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Self::Buy),
            "SELL" => Ok(Self::Sell),
            "HOLD" => Ok(Self::Hold),
            other => Err(format!("unknown decision: {other}")),
        }
    }
}

/// Inputs to the final decision: the outputs of the first three stages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisBundle {
    pub sentiment: Sentiment,
    pub pattern: PatternAnalysis,
    pub risk: RiskVerdict,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Decision::Buy).unwrap(), "\"BUY\"");
        assert_eq!(serde_json::to_string(&Decision::Hold).unwrap(), "\"HOLD\"");
        assert_eq!(Decision::Sell.to_string(), "SELL");
    }

    #[test]
    fn signal_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Signal::Bullish).unwrap(), "\"bullish\"");
        assert_eq!(serde_json::to_string(&Signal::None).unwrap(), "\"none\"");
    }

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!("POSITIVE".parse::<SentimentLabel>(), Ok(SentimentLabel::Positive));
        assert_eq!(" neutral ".parse::<SentimentLabel>(), Ok(SentimentLabel::Neutral));
        assert_eq!("Neutral".parse::<Signal>(), Ok(Signal::None));
        assert_eq!("hold".parse::<Decision>(), Ok(Decision::Hold));
        assert!("sideways".parse::<Signal>().is_err());
    }

    #[test]
    fn stage_defaults() {
        assert_eq!(Sentiment::neutral().score, 0.0);
        assert_eq!(Sentiment::neutral().label, SentimentLabel::Neutral);
        assert_eq!(PatternAnalysis::unknown().pattern, "Unknown");
        assert_eq!(PatternAnalysis::unknown().signal, Signal::None);
        assert_eq!(
            RiskVerdict::no_backend(),
            RiskVerdict {
                approved: false,
                reason: "no backend".to_string()
            }
        );
        assert!(!RiskVerdict::backend_error().approved);
        assert_ne!(RiskVerdict::backend_error(), RiskVerdict::no_backend());
        assert_eq!(Decision::default(), Decision::Hold);
        assert!(!Decision::Hold.is_actionable());
        assert!(Decision::Sell.is_actionable());
    }
}
