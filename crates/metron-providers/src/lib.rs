pub mod backend;
pub mod cached;
pub mod deepseek;
pub mod error;
pub mod gemini;
pub mod http;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod router;

pub mod test_support;

pub use backend::AnalysisBackend;
pub use cached::AnalysisCache;
pub use deepseek::DeepSeekBackend;
pub use error::BackendError;
pub use gemini::GeminiBackend;
pub use pipeline::DecisionPipeline;
pub use router::{RoleAssignment, RoleRouter};
