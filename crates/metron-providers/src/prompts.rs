use metron_models::{AnalysisBundle, Candle, PortfolioContext};

/// Candles sent to the model for pattern reads. Wider than the cache window.
pub const PATTERN_PROMPT_CANDLES: usize = 20;

/// System message for chat-style providers.
pub fn analyst_system_prompt() -> String {
    "You are a trading analyst inside an automated crypto trading system. \
     Answer with exactly the format requested and nothing else. \
     When JSON is requested, reply with one JSON object and no commentary."
        .to_string()
}

pub fn sentiment_prompt(text: &str) -> String {
    format!(
        "Analyze the sentiment of this crypto news/tweet: \"{text}\".\n\
         Return ONLY a JSON object with keys:\n\
         - \"score\": float from -1.0 (very negative) to 1.0 (very positive)\n\
         - \"label\": one of \"Positive\", \"Negative\", \"Neutral\""
    )
}

/// Compact `[timestamp, open, high, low, close, volume]` rows.
fn candle_rows(candles: &[Candle]) -> String {
    let start = candles.len().saturating_sub(PATTERN_PROMPT_CANDLES);
    let rows: Vec<String> = candles[start..]
        .iter()
        .map(|c| {
            format!(
                "[\"{}\",{},{},{},{},{}]",
                c.timestamp.to_rfc3339(),
                c.open,
                c.high,
                c.low,
                c.close,
                c.volume
            )
        })
        .collect();
    format!("[{}]", rows.join(","))
}

pub fn pattern_prompt(candles: &[Candle]) -> String {
    format!(
        "Act as a Technical Analyst. Here is the recent OHLCV data, oldest first, \
         as [timestamp, open, high, low, close, volume]:\n{}\n\
         Identify any candlestick pattern. Return ONLY a JSON object:\n\
         {{\"pattern\": \"<pattern name or Unknown>\", \"signal\": \"bullish\" | \"bearish\" | \"none\"}}",
        candle_rows(candles)
    )
}

pub fn risk_prompt(context: &PortfolioContext) -> String {
    let context_json = serde_json::to_string_pretty(context).unwrap_or_default();
    format!(
        "Act as a Risk Officer. Portfolio context:\n{context_json}\n\
         Should we approve the proposed trade? Consider position sizing relative to equity, \
         concentration in existing positions and available cash.\n\
         Return ONLY a JSON object: {{\"approved\": true | false, \"reason\": \"<one sentence>\"}}"
    )
}

pub fn decision_prompt(bundle: &AnalysisBundle) -> String {
    let bundle_json = serde_json::to_string_pretty(bundle).unwrap_or_default();
    format!(
        "Based on this analysis:\n{bundle_json}\n\
         what is the signal? Return ONLY one word: BUY, SELL, or HOLD."
    )
}
