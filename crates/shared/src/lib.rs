// Public modules
pub mod cache;
pub mod cluster;
pub mod config;
pub mod dedup;
pub mod io;
pub mod models;
pub mod news;
pub mod pipeline;
pub mod synthesis;
pub mod text;
pub mod video;

// Re-export commonly used types
pub use cache::{MemoryCache, ResultCache};
pub use cluster::{KeywordEntitySimilarity, Similarity};
pub use config::{default_feeds, Config, FeedConfig, SynthesizerConfig};
pub use models::{
    Category, ClusterSummary, Item, Momentum, PipelineStats, Source, SynthesisResult, TrendCluster,
};
pub use news::{NewsSource, RssNewsSource};
pub use pipeline::{apply_view_filter, AlertSink, Enhancer, Pipeline};
pub use video::{VideoSource, YouTubeVideoSource};
