//! Turn free-form model replies into typed analysis results.
//!
//! Models are asked for bare JSON but routinely wrap it in markdown fences or
//! lead with prose. Everything that cannot be coerced into the expected shape
//! becomes [`BackendError::Parse`].

use metron_models::{Decision, PatternAnalysis, RiskVerdict, Sentiment, SentimentLabel, Signal};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::BackendError;

/// Extract the first JSON object from text that may contain surrounding prose.
///
/// Handles clean JSON, ```json fenced blocks and `Here is the result: {...}`.
pub fn extract_json(text: &str) -> Result<serde_json::Value, BackendError> {
    let trimmed = text.trim();

    let candidates = [
        Some(trimmed.to_string()),
        fenced_block(trimmed),
        first_balanced_object(trimmed),
    ];

    for candidate in candidates.into_iter().flatten() {
        let parsed = serde_json::from_str::<serde_json::Value>(&candidate);
        if let Ok(value @ serde_json::Value::Object(_)) = parsed {
            return Ok(value);
        }
    }

    Err(BackendError::Parse(format!(
        "No JSON object found in reply (length={})",
        text.len()
    )))
}

/// Contents of the first ``` fence, with or without a `json` tag.
fn fenced_block(text: &str) -> Option<String> {
    let start = text.find("```")?;
    let after_ticks = &text[start + 3..];
    let body_start = after_ticks.find('\n')? + 1;
    let body = &after_ticks[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim().to_string())
}

/// The first `{ ... }` span with balanced braces, ignoring braces inside strings.
fn first_balanced_object(text: &str) -> Option<String> {
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if !in_string && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|s| text[s..=i].to_string());
                }
            }
            _ => {}
        }
    }

    None
}

#[derive(Deserialize)]
struct SentimentReply {
    score: f64,
    label: String,
}

#[derive(Deserialize)]
struct PatternReply {
    pattern: String,
    signal: String,
}

#[derive(Deserialize)]
struct RiskReply {
    approved: bool,
    #[serde(default)]
    reason: String,
}

fn decode<T: DeserializeOwned>(raw: &str, what: &str) -> Result<T, BackendError> {
    let value = extract_json(raw)?;
    serde_json::from_value(value).map_err(|e| BackendError::Parse(format!("{what}: {e}")))
}

pub fn parse_sentiment(raw: &str) -> Result<Sentiment, BackendError> {
    let reply: SentimentReply = decode(raw, "sentiment")?;
    if !reply.score.is_finite() || !(-1.0..=1.0).contains(&reply.score) {
        return Err(BackendError::Parse(format!(
            "sentiment score out of range: {}",
            reply.score
        )));
    }
    let label: SentimentLabel = reply.label.parse().map_err(BackendError::Parse)?;
    Ok(Sentiment {
        score: reply.score,
        label,
    })
}

pub fn parse_pattern(raw: &str) -> Result<PatternAnalysis, BackendError> {
    let reply: PatternReply = decode(raw, "pattern")?;
    let signal: Signal = reply.signal.parse().map_err(BackendError::Parse)?;
    let pattern = reply.pattern.trim();
    Ok(PatternAnalysis {
        pattern: if pattern.is_empty() {
            PatternAnalysis::UNKNOWN.to_string()
        } else {
            pattern.to_string()
        },
        signal,
    })
}

pub fn parse_risk(raw: &str) -> Result<RiskVerdict, BackendError> {
    let reply: RiskReply = decode(raw, "risk")?;
    Ok(RiskVerdict {
        approved: reply.approved,
        reason: reply.reason,
    })
}

/// First whole-word BUY, SELL or HOLD in the reply.
pub fn parse_decision(raw: &str) -> Result<Decision, BackendError> {
    raw.split(|c: char| !c.is_ascii_alphabetic())
        .find_map(|word| word.parse::<Decision>().ok())
        .ok_or_else(|| {
            BackendError::Parse(format!(
                "No BUY/SELL/HOLD in decision reply: {:?}",
                raw.chars().take(80).collect::<String>()
            ))
        })
}
