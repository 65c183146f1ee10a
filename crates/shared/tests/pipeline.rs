use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::{Arc, Mutex};

use shared::models::{url_to_id, ItemKind, PipelineStats, Source};
use shared::pipeline::{AlertSink, ClusterSnapshot, Enhancer};
use shared::text::extract_keywords;
use shared::{
    Category, ClusterSummary, FeedConfig, Item, MemoryCache, Momentum, NewsSource, Pipeline,
};

fn fresh_item(url: &str, title: &str) -> Item {
    Item {
        id: url_to_id(url),
        source: Source::News,
        title: title.to_string(),
        summary: String::new(),
        url: url.to_string(),
        published_at: Utc::now() - Duration::minutes(30),
        popularity: 1.0,
        topic: "election".to_string(),
        category: Category::Politics,
        keywords: extract_keywords(title),
        duplicate_count: 0,
        kind: ItemKind::News {
            publisher_name: url.to_string(),
            feed_category: Category::Politics,
        },
    }
}

struct FakeNews(Vec<Item>);

#[async_trait]
impl NewsSource for FakeNews {
    async fn fetch(&self, _feed: &FeedConfig) -> Result<Vec<Item>> {
        Ok(self.0.clone())
    }
}

struct BrokenNews;

#[async_trait]
impl NewsSource for BrokenNews {
    async fn fetch(&self, _feed: &FeedConfig) -> Result<Vec<Item>> {
        anyhow::bail!("total outage")
    }
}

fn one_feed() -> Vec<FeedConfig> {
    vec![FeedConfig {
        url: "https://example.com/feed".to_string(),
        category: Category::Politics,
        label: "Politics".to_string(),
        is_keyword_feed: false,
    }]
}

fn breaking_items() -> Vec<Item> {
    vec![
        fresh_item("https://a.com/1", "election results counted statewide tonight"),
        fresh_item("https://b.com/2", "election results spark protests downtown"),
        fresh_item("https://c.com/3", "disputed election results certified early"),
    ]
}

#[tokio::test]
async fn total_source_failure_yields_an_empty_result() {
    let pipeline = Pipeline::new(Arc::new(BrokenNews), None, Arc::new(MemoryCache::new()));
    let result = pipeline.run(None).await;
    assert_eq!(result.total_clusters_found, 0);
    assert!(result.top_clusters.is_empty());
    assert_eq!(result.pipeline_stats.news_items_fetched, 0);
    assert_eq!(result.pipeline_stats.video_items_fetched, 0);
    // Every category bucket is present even in the empty result.
    assert_eq!(result.by_category.len(), Category::ALL.len());
}

#[tokio::test]
async fn happy_path_forms_and_ranks_clusters() {
    let pipeline = Pipeline::new(
        Arc::new(FakeNews(breaking_items())),
        None,
        Arc::new(MemoryCache::new()),
    )
    .with_feeds(one_feed());

    let result = pipeline.run(None).await;
    assert_eq!(result.pipeline_stats.news_items_fetched, 3);
    assert_eq!(result.total_clusters_found, 1);
    assert_eq!(result.top_clusters.len(), 1);
    let top = &result.top_clusters[0];
    assert_eq!(top.category, Category::Politics);
    assert_eq!(top.momentum, Momentum::Emerging);
    // Fresh, popular, and breaking: shows up in both spotlight lists.
    assert_eq!(result.breaking_now.len(), 1);
    assert_eq!(result.emerging_opportunities.len(), 1);
}

struct FailingEnhancer;

#[async_trait]
impl Enhancer for FailingEnhancer {
    async fn enhance(&self, _summaries: Vec<ClusterSummary>) -> Result<Vec<ClusterSummary>> {
        anyhow::bail!("enhancement backend unreachable")
    }
}

#[tokio::test]
async fn enhancer_failure_falls_back_to_plain_summaries() {
    let pipeline = Pipeline::new(
        Arc::new(FakeNews(breaking_items())),
        None,
        Arc::new(MemoryCache::new()),
    )
    .with_feeds(one_feed())
    .with_enhancer(Arc::new(FailingEnhancer));

    let result = pipeline.run(None).await;
    assert_eq!(result.top_clusters.len(), 1);
    assert!(!result.top_clusters[0].summary.is_empty());
}

#[derive(Default)]
struct RecordingSink(Mutex<Vec<ClusterSnapshot>>);

#[async_trait]
impl AlertSink for RecordingSink {
    async fn deliver(&self, snapshots: &[ClusterSnapshot]) -> Result<()> {
        self.0.lock().unwrap().extend_from_slice(snapshots);
        Ok(())
    }
}

struct BrokenSink;

#[async_trait]
impl AlertSink for BrokenSink {
    async fn deliver(&self, _snapshots: &[ClusterSnapshot]) -> Result<()> {
        anyhow::bail!("alert backend unreachable")
    }
}

#[tokio::test]
async fn high_scoring_clusters_trigger_alerts() {
    let sink = Arc::new(RecordingSink::default());
    let pipeline = Pipeline::new(
        Arc::new(FakeNews(breaking_items())),
        None,
        Arc::new(MemoryCache::new()),
    )
    .with_feeds(one_feed())
    .with_alert_sink(Arc::clone(&sink) as Arc<dyn AlertSink>);

    let result = pipeline.run(None).await;
    let expected: Vec<&ClusterSummary> = result
        .top_clusters
        .iter()
        .filter(|s| s.trend_score > 75 && s.trending_in_24h)
        .collect();
    assert!(!expected.is_empty());

    let delivered = sink.0.lock().unwrap();
    assert_eq!(delivered.len(), expected.len());
    assert_eq!(delivered[0].keyword, expected[0].topic);
    assert_eq!(delivered[0].opportunity_index, expected[0].trend_score);
}

#[tokio::test]
async fn alert_failure_does_not_affect_the_result() {
    let pipeline = Pipeline::new(
        Arc::new(FakeNews(breaking_items())),
        None,
        Arc::new(MemoryCache::new()),
    )
    .with_feeds(one_feed())
    .with_alert_sink(Arc::new(BrokenSink));

    let result = pipeline.run(None).await;
    assert_eq!(result.top_clusters.len(), 1);
}

#[tokio::test]
async fn cached_runs_return_the_stored_result_verbatim() {
    let pipeline = Pipeline::new(
        Arc::new(FakeNews(breaking_items())),
        None,
        Arc::new(MemoryCache::new()),
    )
    .with_feeds(one_feed());

    let first = pipeline.run_cached("trends", None, false).await;
    let second = pipeline.run_cached("trends", None, false).await;
    // Cluster ids are random per run, so byte equality proves a hit.
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );

    let refreshed = pipeline.run_cached("trends", None, true).await;
    assert_ne!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&refreshed).unwrap()
    );
}

#[test]
fn empty_result_is_structurally_complete() {
    let result = shared::SynthesisResult::empty(PipelineStats::default());
    assert_eq!(result.by_category.len(), Category::ALL.len());
    assert!(result.top_clusters.is_empty());
    assert!(result.breaking_now.is_empty());
    assert!(result.emerging_opportunities.is_empty());
}
