use std::fmt;

use metron_models::{AnalysisBundle, Candle, PortfolioContext};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::CacheError;

/// Number of trailing candles that identify a pattern request.
///
/// Older candles can churn without forcing a cache miss.
pub const PATTERN_WINDOW: usize = 5;

/// SHA-256 of the semantic content of a request.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        Self(digest.into())
    }

    /// Hash of the canonical JSON form of `value`.
    pub fn of_json<T: Serialize + ?Sized>(value: &T) -> Result<Self, CacheError> {
        let bytes = serde_json::to_vec(value)?;
        Ok(Self::from_bytes(&bytes))
    }

    /// Sentiment requests: the exact text.
    pub fn text(text: &str) -> Self {
        Self::from_bytes(text.as_bytes())
    }

    /// Pattern requests: only the last [`PATTERN_WINDOW`] candles.
    pub fn candles(candles: &[Candle]) -> Result<Self, CacheError> {
        let start = candles.len().saturating_sub(PATTERN_WINDOW);
        Self::of_json(&candles[start..])
    }

    pub fn portfolio(context: &PortfolioContext) -> Result<Self, CacheError> {
        Self::of_json(context)
    }

    pub fn bundle(bundle: &AnalysisBundle) -> Result<Self, CacheError> {
        Self::of_json(bundle)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
