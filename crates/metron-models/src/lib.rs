pub mod analysis;
pub mod config;
pub mod market;
pub mod pipeline;
pub mod role;

pub use analysis::{
    AnalysisBundle, Decision, PatternAnalysis, RiskVerdict, Sentiment, SentimentLabel, Signal,
};
pub use config::{
    BackendConfig, BackendsConfig, CacheConfig, MetronConfig, PipelineConfig, RolesConfig,
};
pub use market::{Candle, OrderSide, PortfolioContext, PositionSnapshot, ProposedOrder};
pub use pipeline::{PipelineInput, PipelineResult, Stage, StageOutcome, StageReport};
pub use role::{Operation, Role};
