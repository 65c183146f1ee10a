use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::cache::ResultCache;
use crate::cluster::{cluster_items, KeywordEntitySimilarity, Similarity};
use crate::config::{default_feeds, FeedConfig, SynthesizerConfig};
use crate::dedup::{deduplicate, duplicates_suppressed};
use crate::models::{Category, ClusterSummary, PipelineStats, SynthesisResult};
use crate::news::{fetch_all_feeds, NewsSource};
use crate::synthesis::{group_by_category, rank_and_filter, synthesize};
use crate::video::{fetch_trending_videos, VideoSource};

/// Trend score above which a cluster is worth alerting on.
const ALERT_SCORE_THRESHOLD: u32 = 75;

/// Point-in-time reading of a high-scoring cluster, shaped for alert
/// consumers that track opportunity metrics on a 0-100 scale.
#[derive(Debug, Clone)]
pub struct ClusterSnapshot {
    pub niche_id: String,
    pub keyword: String,
    pub captured_at: chrono::DateTime<Utc>,
    pub opportunity_index: u32,
    pub radar_score: u32,
    pub monetization_score: u32,
    pub competition_score: u32,
    pub demand_score: u32,
    pub growth_score: u32,
    pub saturation_score: u32,
}

impl ClusterSnapshot {
    pub fn from_summary(summary: &ClusterSummary) -> Self {
        let velocity_pct = (summary.velocity_score * 100.0).round() as u32;
        Self {
            niche_id: summary.cluster_id.clone(),
            keyword: summary.topic.clone(),
            captured_at: Utc::now(),
            opportunity_index: summary.trend_score,
            radar_score: velocity_pct,
            monetization_score: if summary.trend_score > 80 { 75 } else { 55 },
            competition_score: if summary.trend_score > 85 { 65 } else { 40 },
            demand_score: summary.trend_score,
            growth_score: velocity_pct,
            saturation_score: (100u32.saturating_sub(summary.trend_score)).max(10),
        }
    }
}

/// Post-processing hook over the full summary list, e.g. a language model
/// that rewrites summaries. Must return the same number of summaries.
#[async_trait]
pub trait Enhancer: Send + Sync {
    async fn enhance(&self, summaries: Vec<ClusterSummary>) -> Result<Vec<ClusterSummary>>;
}

/// Identity enhancer used when no enrichment backend is configured.
pub struct NoopEnhancer;

#[async_trait]
impl Enhancer for NoopEnhancer {
    async fn enhance(&self, summaries: Vec<ClusterSummary>) -> Result<Vec<ClusterSummary>> {
        Ok(summaries)
    }
}

/// Receiver for high-scoring cluster snapshots. Delivery failures are logged
/// by the pipeline and never affect the run's result.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, snapshots: &[ClusterSnapshot]) -> Result<()>;
}

pub struct NoopAlertSink;

#[async_trait]
impl AlertSink for NoopAlertSink {
    async fn deliver(&self, _snapshots: &[ClusterSnapshot]) -> Result<()> {
        Ok(())
    }
}

/// The full trend synthesis pipeline with its collaborators injected.
///
/// Every stage degrades instead of failing: a run always produces a
/// structurally complete `SynthesisResult`, in the worst case empty with
/// honest stats.
pub struct Pipeline {
    news: Arc<dyn NewsSource>,
    video: Option<Arc<dyn VideoSource>>,
    cache: Arc<dyn ResultCache>,
    enhancer: Arc<dyn Enhancer>,
    alert_sink: Arc<dyn AlertSink>,
    similarity: Arc<dyn Similarity>,
    feeds: Vec<FeedConfig>,
}

impl Pipeline {
    /// Video ingestion is skipped entirely when no video source is supplied
    /// (typically: no API key configured).
    pub fn new(
        news: Arc<dyn NewsSource>,
        video: Option<Arc<dyn VideoSource>>,
        cache: Arc<dyn ResultCache>,
    ) -> Self {
        Self {
            news,
            video,
            cache,
            enhancer: Arc::new(NoopEnhancer),
            alert_sink: Arc::new(NoopAlertSink),
            similarity: Arc::new(KeywordEntitySimilarity),
            feeds: default_feeds(),
        }
    }

    pub fn with_enhancer(mut self, enhancer: Arc<dyn Enhancer>) -> Self {
        self.enhancer = enhancer;
        self
    }

    pub fn with_alert_sink(mut self, alert_sink: Arc<dyn AlertSink>) -> Self {
        self.alert_sink = alert_sink;
        self
    }

    pub fn with_similarity(mut self, similarity: Arc<dyn Similarity>) -> Self {
        self.similarity = similarity;
        self
    }

    pub fn with_feeds(mut self, feeds: Vec<FeedConfig>) -> Self {
        self.feeds = feeds;
        self
    }

    /// Runs every stage in order. Infallible by construction: source
    /// failures yield empty stages, enhancement failures fall back to the
    /// unenhanced summaries, alert failures are logged and dropped.
    pub async fn run(&self, config_override: Option<SynthesizerConfig>) -> SynthesisResult {
        let started = Instant::now();
        let config = config_override.unwrap_or_default();

        let news_items = fetch_all_feeds(self.news.as_ref(), &self.feeds, &config).await;
        let news_items_fetched = news_items.len();
        info!(count = news_items_fetched, "Fetched news items");

        let video_items = match &self.video {
            Some(video) => fetch_trending_videos(video.as_ref(), &news_items, &config).await,
            None => Vec::new(),
        };
        let video_items_fetched = video_items.len();
        if self.video.is_some() {
            info!(count = video_items_fetched, "Fetched video items");
        }

        let mut all_items = news_items;
        all_items.extend(video_items);
        let before_dedup = all_items.len();

        let deduped = deduplicate(all_items);
        let suppressed = duplicates_suppressed(before_dedup, deduped.len());

        let clusters = cluster_items(&deduped, &config, self.similarity.as_ref(), Utc::now());
        let clusters_formed = clusters.len();
        info!(clusters = clusters_formed, "Formed clusters");

        let summaries = synthesize(&clusters);
        let summaries = match self.enhancer.enhance(summaries.clone()).await {
            Ok(enhanced) if enhanced.len() == summaries.len() => enhanced,
            Ok(_) => {
                warn!("Enhancer changed the summary count; using unenhanced summaries");
                summaries
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Enhancement failed; using unenhanced summaries");
                summaries
            }
        };

        let top_clusters = rank_and_filter(summaries.clone(), &config);
        let by_category = group_by_category(&summaries);
        let breaking_now: Vec<ClusterSummary> = summaries
            .iter()
            .filter(|s| {
                s.first_seen_hours_ago < config.breaking_news_window_hours && s.trend_score > 70
            })
            .cloned()
            .collect();
        let emerging_opportunities: Vec<ClusterSummary> =
            summaries.iter().filter(|s| s.trending_in_24h).cloned().collect();

        let result = SynthesisResult {
            generated_at: Utc::now(),
            total_clusters_found: clusters_formed,
            top_clusters,
            by_category,
            breaking_now,
            emerging_opportunities,
            pipeline_stats: PipelineStats {
                news_items_fetched,
                video_items_fetched,
                clusters_formed,
                duplicates_suppressed: suppressed,
                processing_time_ms: started.elapsed().as_millis() as u64,
            },
        };

        self.send_alerts(&result).await;
        result
    }

    async fn send_alerts(&self, result: &SynthesisResult) {
        let snapshots: Vec<ClusterSnapshot> = result
            .top_clusters
            .iter()
            .filter(|s| s.trend_score > ALERT_SCORE_THRESHOLD && s.trending_in_24h)
            .map(ClusterSnapshot::from_summary)
            .collect();
        if snapshots.is_empty() {
            return;
        }
        if let Err(e) = self.alert_sink.deliver(&snapshots).await {
            warn!(error = %format!("{e:#}"), "Alert delivery failed");
        }
    }

    /// Read-through wrapper around `run`. A fresh cached result is returned
    /// as-is; `force_refresh` bypasses the read but still stores the new
    /// result.
    pub async fn run_cached(
        &self,
        key: &str,
        config_override: Option<SynthesizerConfig>,
        force_refresh: bool,
    ) -> SynthesisResult {
        if !force_refresh {
            if let Some(hit) = self.cache.get(key) {
                info!(key, "Serving cached result");
                return hit;
            }
        }
        let result = self.run(config_override).await;
        self.cache.set(key, result.clone());
        result
    }
}

/// Narrows a result to one category and/or caps every summary list, leaving
/// stats and counts untouched.
pub fn apply_view_filter(
    mut result: SynthesisResult,
    category: Option<Category>,
    limit: Option<usize>,
) -> SynthesisResult {
    if let Some(category) = category {
        let matches = |s: &ClusterSummary| s.category == category;
        result.top_clusters.retain(matches);
        result.breaking_now.retain(matches);
        result.emerging_opportunities.retain(matches);
        for (key, summaries) in result.by_category.iter_mut() {
            if *key != category {
                summaries.clear();
            }
        }
    }
    if let Some(limit) = limit {
        result.top_clusters.truncate(limit);
        result.breaking_now.truncate(limit);
        result.emerging_opportunities.truncate(limit);
        for summaries in result.by_category.values_mut() {
            summaries.truncate(limit);
        }
    }
    result
}
