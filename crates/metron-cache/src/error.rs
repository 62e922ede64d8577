use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Fingerprint serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
