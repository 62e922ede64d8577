pub mod error;
pub mod fingerprint;
pub mod memory;

pub use error::CacheError;
pub use fingerprint::{Fingerprint, PATTERN_WINDOW};
pub use memory::{CacheEntry, CacheKey, Cached, ResultCache};
