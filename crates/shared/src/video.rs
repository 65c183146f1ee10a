use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use crate::config::SynthesizerConfig;
use crate::models::{url_to_id, Category, Item, ItemKind, Source, VideoStats};
use crate::text::{extract_keywords, truncate_chars, MAX_KEYWORDS};

const VIDEO_TIMEOUT_SECS: u64 = 15;
const SEARCH_WINDOW_HOURS: i64 = 48;
const TOPIC_BATCH_SIZE: usize = 5;
const STATS_BATCH_SIZE: usize = 50;
const TOP_TOPIC_COUNT: usize = 15;
const SUMMARY_MAX_CHARS: usize = 200;

/// Popularity normalization: 10k views/hour saturates the score.
const VIEWS_PER_HOUR_CEILING: f64 = 10_000.0;

/// A search topic derived from news keywords, carrying the category the
/// resulting videos will inherit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSeed {
    pub keyword: String,
    pub category: Category,
}

/// Raw video record as returned by the platform's stats endpoint.
#[derive(Debug, Clone)]
pub struct VideoRecord {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub channel_title: String,
    pub tags: Vec<String>,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
}

/// Search and stats calls either yield data or report quota exhaustion,
/// which halts further calls of that type for the run without discarding
/// anything already collected.
#[derive(Debug)]
pub enum SearchOutcome {
    Hits(Vec<String>),
    QuotaExceeded,
}

#[derive(Debug)]
pub enum StatsOutcome {
    Stats(Vec<VideoRecord>),
    QuotaExceeded,
}

#[async_trait]
pub trait VideoSource: Send + Sync {
    async fn search_topic(
        &self,
        seed: &TopicSeed,
        config: &SynthesizerConfig,
    ) -> Result<SearchOutcome>;

    async fn fetch_stats(&self, video_ids: &[String]) -> Result<StatsOutcome>;
}

/// Extracts the top news keywords by frequency, each tagged with its dominant
/// source category (ties prefer non-GENERAL so the global feed never swallows
/// a specialized topic).
pub fn extract_top_topics(news_items: &[Item], top_n: usize) -> Vec<TopicSeed> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut categories: HashMap<&str, HashMap<Category, usize>> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for item in news_items {
        for kw in &item.keywords {
            let count = counts.entry(kw).or_insert(0);
            if *count == 0 {
                order.push(kw);
            }
            *count += 1;
            *categories
                .entry(kw)
                .or_default()
                .entry(item.category)
                .or_insert(0) += 1;
        }
    }

    // Stable ranking: frequency descending, first-seen order breaking ties.
    let mut ranked: Vec<&str> = order;
    ranked.sort_by_key(|kw| std::cmp::Reverse(counts[kw]));

    ranked
        .into_iter()
        .take(top_n)
        .map(|kw| {
            let mut dominant = Category::General;
            let mut best = 0usize;
            for category in Category::ALL {
                let count = categories[kw].get(&category).copied().unwrap_or(0);
                let wins = count > best
                    || (count == best && best > 0 && dominant.is_general() && !category.is_general());
                if wins {
                    best = count;
                    dominant = category;
                }
            }
            TopicSeed {
                keyword: kw.to_string(),
                category: dominant,
            }
        })
        .collect()
}

/// Converts a raw platform record into a normalized video item.
fn normalize_record(record: VideoRecord, category: Category, now: DateTime<Utc>) -> Item {
    // 1-hour floor prevents division blow-up for just-published videos.
    let hours_since = ((now - record.published_at).num_milliseconds() as f64 / 3_600_000.0).max(1.0);

    let views_per_hour = record.view_count as f64 / hours_since;
    let like_velocity = record.like_count as f64 / hours_since;
    let comment_velocity = record.comment_count as f64 / hours_since;
    let popularity = (views_per_hour / VIEWS_PER_HOUR_CEILING).min(1.0);

    let tags: Vec<String> = record.tags.into_iter().take(MAX_KEYWORDS).collect();
    let mut keywords: Vec<String> = Vec::new();
    let mut seen = HashSet::new();
    for kw in tags
        .iter()
        .map(|t| t.to_lowercase())
        .chain(extract_keywords(&record.title))
    {
        if seen.insert(kw.clone()) {
            keywords.push(kw);
            if keywords.len() == MAX_KEYWORDS {
                break;
            }
        }
    }

    let topic = keywords.first().cloned().unwrap_or_else(|| {
        record
            .title
            .split_whitespace()
            .next()
            .unwrap_or("video")
            .to_lowercase()
    });

    let url = format!("https://www.youtube.com/watch?v={}", record.video_id);

    Item {
        id: url_to_id(&url),
        source: Source::Video,
        title: record.title,
        summary: truncate_chars(&record.description, SUMMARY_MAX_CHARS),
        url,
        published_at: record.published_at,
        popularity,
        topic,
        category,
        keywords,
        duplicate_count: 0,
        kind: ItemKind::Video(VideoStats {
            channel_name: record.channel_title,
            view_count: record.view_count,
            like_count: record.like_count,
            comment_count: record.comment_count,
            views_per_hour,
            like_velocity,
            comment_velocity,
            tags,
        }),
    }
}

/// Fan-out driver: searches topic batches concurrently, then batch-fetches
/// statistics for the collected ids. Quota exhaustion stops further calls
/// but keeps whatever was already gathered; individual failures degrade to
/// empty contributions.
pub async fn fetch_video_items(
    source: &dyn VideoSource,
    seeds: &[TopicSeed],
    config: &SynthesizerConfig,
) -> Vec<Item> {
    let quota_exhausted = AtomicBool::new(false);

    // Step 1: search per topic, batched, concurrent within a batch.
    let mut video_ids: Vec<String> = Vec::new();
    let mut seed_category: HashMap<String, Category> = HashMap::new();

    for batch in seeds.chunks(TOPIC_BATCH_SIZE) {
        if quota_exhausted.load(Ordering::Relaxed) {
            break;
        }

        let quota = &quota_exhausted;
        let outcomes: Vec<(TopicSeed, Option<Vec<String>>)> = stream::iter(batch)
            .map(|seed| async move {
                if quota.load(Ordering::Relaxed) {
                    return (seed.clone(), None);
                }
                match source.search_topic(seed, config).await {
                    Ok(SearchOutcome::Hits(ids)) => (seed.clone(), Some(ids)),
                    Ok(SearchOutcome::QuotaExceeded) => {
                        warn!("Video search quota exceeded, stopping further searches");
                        quota.store(true, Ordering::Relaxed);
                        (seed.clone(), None)
                    }
                    Err(e) => {
                        warn!(topic = %seed.keyword, error = %format!("{e:#}"), "Video search failed");
                        (seed.clone(), None)
                    }
                }
            })
            .buffer_unordered(TOPIC_BATCH_SIZE)
            .collect()
            .await;

        for (seed, ids) in outcomes {
            for id in ids.unwrap_or_default() {
                if !seed_category.contains_key(&id) {
                    seed_category.insert(id.clone(), seed.category);
                    video_ids.push(id);
                }
            }
        }
    }

    if video_ids.is_empty() {
        return Vec::new();
    }
    debug!(videos = video_ids.len(), "Collected video ids from search");

    // Step 2: batch-fetch statistics (<=50 ids per request).
    let now = Utc::now();
    let mut items = Vec::new();

    for id_batch in video_ids.chunks(STATS_BATCH_SIZE) {
        match source.fetch_stats(id_batch).await {
            Ok(StatsOutcome::Stats(records)) => {
                for record in records {
                    let category = seed_category
                        .get(&record.video_id)
                        .copied()
                        .unwrap_or(Category::General);
                    items.push(normalize_record(record, category, now));
                }
            }
            Ok(StatsOutcome::QuotaExceeded) => {
                warn!("Video stats quota exceeded, keeping data collected so far");
                break;
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Video stats batch failed");
            }
        }
    }

    items
}

/// Derives topic seeds and runs the full video ingestion stage. Returns an
/// empty list when no API key is configured.
pub async fn fetch_trending_videos(
    source: &dyn VideoSource,
    news_items: &[Item],
    config: &SynthesizerConfig,
) -> Vec<Item> {
    let seeds = extract_top_topics(news_items, TOP_TOPIC_COUNT);
    if seeds.is_empty() {
        return Vec::new();
    }
    fetch_video_items(source, &seeds, config).await
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoResource>,
}

#[derive(Debug, Deserialize)]
struct VideoResource {
    id: String,
    snippet: Snippet,
    #[serde(default)]
    statistics: Statistics,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "publishedAt")]
    published_at: DateTime<Utc>,
    #[serde(rename = "channelTitle", default)]
    channel_title: String,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Statistics {
    #[serde(rename = "viewCount", default)]
    view_count: Option<String>,
    #[serde(rename = "likeCount", default)]
    like_count: Option<String>,
    #[serde(rename = "commentCount", default)]
    comment_count: Option<String>,
}

fn parse_count(raw: &Option<String>) -> u64 {
    raw.as_deref().and_then(|s| s.parse().ok()).unwrap_or(0)
}

/// Live client for the YouTube Data API v3.
pub struct YouTubeVideoSource {
    client: Client,
    api_key: String,
}

impl YouTubeVideoSource {
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(VIDEO_TIMEOUT_SECS))
            .user_agent("trend-synthesizer/0.1")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, api_key })
    }
}

#[async_trait]
impl VideoSource for YouTubeVideoSource {
    async fn search_topic(
        &self,
        seed: &TopicSeed,
        config: &SynthesizerConfig,
    ) -> Result<SearchOutcome> {
        let published_after = (Utc::now() - Duration::hours(SEARCH_WINDOW_HOURS))
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string();

        let url = format!(
            "https://www.googleapis.com/youtube/v3/search?part=snippet&type=video&order=viewCount&q={}&publishedAfter={}&maxResults={}&key={}",
            urlencoding::encode(&seed.keyword),
            urlencoding::encode(&published_after),
            config.video_results_per_topic,
            self.api_key,
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Search request failed for \"{}\"", seed.keyword))?;

        if response.status() == reqwest::StatusCode::FORBIDDEN {
            return Ok(SearchOutcome::QuotaExceeded);
        }
        if !response.status().is_success() {
            anyhow::bail!(
                "Search for \"{}\" returned {}",
                seed.keyword,
                response.status()
            );
        }

        let body: SearchResponse = response
            .json()
            .await
            .context("Failed to parse video search response")?;

        let ids = body
            .items
            .into_iter()
            .filter_map(|item| item.id.video_id)
            .collect();

        Ok(SearchOutcome::Hits(ids))
    }

    async fn fetch_stats(&self, video_ids: &[String]) -> Result<StatsOutcome> {
        let url = format!(
            "https://www.googleapis.com/youtube/v3/videos?part=statistics,snippet&id={}&key={}",
            video_ids.join(","),
            self.api_key,
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Video stats request failed")?;

        if response.status() == reqwest::StatusCode::FORBIDDEN {
            return Ok(StatsOutcome::QuotaExceeded);
        }
        if !response.status().is_success() {
            anyhow::bail!("Video stats fetch returned {}", response.status());
        }

        let body: VideosResponse = response
            .json()
            .await
            .context("Failed to parse video stats response")?;

        let records = body
            .items
            .into_iter()
            .map(|video| VideoRecord {
                video_id: video.id,
                title: video.snippet.title,
                description: video.snippet.description,
                published_at: video.snippet.published_at,
                channel_title: video.snippet.channel_title,
                tags: video.snippet.tags,
                view_count: parse_count(&video.statistics.view_count),
                like_count: parse_count(&video.statistics.like_count),
                comment_count: parse_count(&video.statistics.comment_count),
            })
            .collect();

        Ok(StatsOutcome::Stats(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    fn news_item(url: &str, category: Category, keywords: &[&str]) -> Item {
        Item {
            id: url_to_id(url),
            source: Source::News,
            title: "title".to_string(),
            summary: String::new(),
            url: url.to_string(),
            published_at: Utc::now(),
            popularity: 0.6,
            topic: keywords.first().unwrap_or(&"general").to_string(),
            category,
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            duplicate_count: 0,
            kind: ItemKind::News {
                publisher_name: "Publisher".to_string(),
                feed_category: category,
            },
        }
    }

    #[test]
    fn top_topics_rank_by_frequency() {
        let items = vec![
            news_item("https://e.com/1", Category::Technology, &["chips", "nvidia"]),
            news_item("https://e.com/2", Category::Technology, &["chips"]),
            news_item("https://e.com/3", Category::Business, &["markets"]),
        ];
        let seeds = extract_top_topics(&items, 2);
        assert_eq!(seeds[0].keyword, "chips");
        assert_eq!(seeds[0].category, Category::Technology);
        assert_eq!(seeds.len(), 2);
    }

    #[test]
    fn top_topics_prefer_specialized_category_on_ties() {
        let items = vec![
            news_item("https://e.com/1", Category::General, &["election"]),
            news_item("https://e.com/2", Category::Politics, &["election"]),
        ];
        let seeds = extract_top_topics(&items, 5);
        assert_eq!(seeds[0].category, Category::Politics);
    }

    #[test]
    fn velocity_uses_one_hour_floor() {
        let now = Utc::now();
        let record = VideoRecord {
            video_id: "abc123def45".to_string(),
            title: "Fresh upload".to_string(),
            description: String::new(),
            published_at: now - Duration::minutes(5),
            channel_title: "Channel".to_string(),
            tags: vec![],
            view_count: 5000,
            like_count: 100,
            comment_count: 10,
        };
        let item = normalize_record(record, Category::Technology, now);
        let stats = item.video_stats().unwrap();
        assert!((stats.views_per_hour - 5000.0).abs() < 1e-9);
        assert!((item.popularity - 0.5).abs() < 1e-9);
    }

    #[test]
    fn popularity_saturates_at_one() {
        let now = Utc::now();
        let record = VideoRecord {
            video_id: "viral".to_string(),
            title: "Viral video".to_string(),
            description: String::new(),
            published_at: now - Duration::hours(2),
            channel_title: "Channel".to_string(),
            tags: vec![],
            view_count: 10_000_000,
            like_count: 0,
            comment_count: 0,
        };
        let item = normalize_record(record, Category::General, now);
        assert_eq!(item.popularity, 1.0);
    }

    #[test]
    fn keywords_merge_tags_and_title_without_duplicates() {
        let now = Utc::now();
        let record = VideoRecord {
            video_id: "kw".to_string(),
            title: "Quantum computing explained".to_string(),
            description: String::new(),
            published_at: now - Duration::hours(3),
            channel_title: "Channel".to_string(),
            tags: vec!["Quantum".to_string(), "science".to_string()],
            view_count: 100,
            like_count: 0,
            comment_count: 0,
        };
        let item = normalize_record(record, Category::Science, now);
        assert_eq!(
            item.keywords,
            vec!["quantum", "science", "computing", "explained"]
        );
    }

    struct QuotaAfterFirstBatch {
        searches: AtomicUsize,
    }

    #[async_trait]
    impl VideoSource for QuotaAfterFirstBatch {
        async fn search_topic(
            &self,
            seed: &TopicSeed,
            _config: &SynthesizerConfig,
        ) -> Result<SearchOutcome> {
            let n = self.searches.fetch_add(1, Ordering::SeqCst);
            if n >= TOPIC_BATCH_SIZE {
                return Ok(SearchOutcome::QuotaExceeded);
            }
            Ok(SearchOutcome::Hits(vec![format!("vid-{}", seed.keyword)]))
        }

        async fn fetch_stats(&self, video_ids: &[String]) -> Result<StatsOutcome> {
            let now = Utc::now();
            Ok(StatsOutcome::Stats(
                video_ids
                    .iter()
                    .map(|id| VideoRecord {
                        video_id: id.clone(),
                        title: format!("video {}", id),
                        description: String::new(),
                        published_at: now - Duration::hours(4),
                        channel_title: "Channel".to_string(),
                        tags: vec![],
                        view_count: 4000,
                        like_count: 40,
                        comment_count: 4,
                    })
                    .collect(),
            ))
        }
    }

    #[tokio::test]
    async fn quota_exhaustion_keeps_collected_data() {
        let seeds: Vec<TopicSeed> = (0..12)
            .map(|i| TopicSeed {
                keyword: format!("topic{i}"),
                category: Category::Technology,
            })
            .collect();
        let source = QuotaAfterFirstBatch {
            searches: AtomicUsize::new(0),
        };
        let items =
            fetch_video_items(&source, &seeds, &SynthesizerConfig::default()).await;
        // First batch of five searches succeeded before the quota tripped.
        assert_eq!(items.len(), TOPIC_BATCH_SIZE);
        // The batch that hit the quota may finish, but the third never starts.
        assert!(source.searches.load(Ordering::SeqCst) <= 2 * TOPIC_BATCH_SIZE);
    }

    struct FailingStats;

    #[async_trait]
    impl VideoSource for FailingStats {
        async fn search_topic(
            &self,
            seed: &TopicSeed,
            _config: &SynthesizerConfig,
        ) -> Result<SearchOutcome> {
            Ok(SearchOutcome::Hits(vec![format!("vid-{}", seed.keyword)]))
        }

        async fn fetch_stats(&self, _video_ids: &[String]) -> Result<StatsOutcome> {
            anyhow::bail!("stats backend down")
        }
    }

    #[tokio::test]
    async fn stats_failure_degrades_to_empty() {
        let seeds = vec![TopicSeed {
            keyword: "anything".to_string(),
            category: Category::General,
        }];
        let items =
            fetch_video_items(&FailingStats, &seeds, &SynthesizerConfig::default()).await;
        assert!(items.is_empty());
    }

    struct DuplicateHits {
        stats_ids: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl VideoSource for DuplicateHits {
        async fn search_topic(
            &self,
            _seed: &TopicSeed,
            _config: &SynthesizerConfig,
        ) -> Result<SearchOutcome> {
            Ok(SearchOutcome::Hits(vec!["same-video".to_string()]))
        }

        async fn fetch_stats(&self, video_ids: &[String]) -> Result<StatsOutcome> {
            self.stats_ids.lock().unwrap().extend(video_ids.iter().cloned());
            Ok(StatsOutcome::Stats(vec![]))
        }
    }

    #[tokio::test]
    async fn video_ids_are_deduplicated_before_stats() {
        let seeds: Vec<TopicSeed> = (0..3)
            .map(|i| TopicSeed {
                keyword: format!("topic{i}"),
                category: Category::General,
            })
            .collect();
        let source = DuplicateHits {
            stats_ids: Mutex::new(Vec::new()),
        };
        fetch_video_items(&source, &seeds, &SynthesizerConfig::default()).await;
        assert_eq!(*source.stats_ids.lock().unwrap(), vec!["same-video"]);
    }
}
