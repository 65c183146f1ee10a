use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::{FeedConfig, SynthesizerConfig};
use crate::models::{url_to_id, Category, Item, ItemKind, Source};
use crate::text::{extract_keywords, strip_html, truncate_chars};

const FEED_TIMEOUT_SECS: u64 = 10;
const FEED_CONCURRENCY: usize = 8;
const SUMMARY_MAX_CHARS: usize = 200;

/// A source of normalized news items. Abstracted so tests (and alternative
/// backends) can stand in for live syndication feeds.
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn fetch(&self, feed: &FeedConfig) -> Result<Vec<Item>>;
}

/// Recency ladder used as the popularity score for news items.
pub fn recency_score(published_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let hours_ago = (now - published_at).num_milliseconds() as f64 / 3_600_000.0;
    if hours_ago < 1.0 {
        1.0
    } else if hours_ago < 6.0 {
        0.8
    } else if hours_ago < 24.0 {
        0.6
    } else if hours_ago < 48.0 {
        0.3
    } else {
        0.1
    }
}

/// Live RSS/Atom implementation backed by reqwest + feed-rs.
pub struct RssNewsSource {
    client: Client,
}

impl RssNewsSource {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(FEED_TIMEOUT_SECS))
            .user_agent("trend-synthesizer/0.1")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl NewsSource for RssNewsSource {
    async fn fetch(&self, feed: &FeedConfig) -> Result<Vec<Item>> {
        let response = self
            .client
            .get(&feed.url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch feed \"{}\"", feed.label))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Feed \"{}\" returned {}", feed.label, status);
        }

        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read feed body for \"{}\"", feed.label))?;

        let parsed = feed_rs::parser::parse(&bytes[..])
            .with_context(|| format!("Failed to parse feed \"{}\"", feed.label))?;

        let now = Utc::now();
        let mut items = Vec::new();

        for entry in parsed.entries {
            // Skip entries missing a title or link rather than failing the feed.
            let Some(title) = entry.title.as_ref().map(|t| strip_html(&t.content)) else {
                continue;
            };
            if title.is_empty() {
                continue;
            }
            let Some(link) = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .or_else(|| entry.id.starts_with("http").then(|| entry.id.clone()))
            else {
                continue;
            };

            let published_at = entry.published.or(entry.updated).unwrap_or(now);
            let description = entry
                .summary
                .as_ref()
                .map(|t| strip_html(&t.content))
                .unwrap_or_default();
            let summary = truncate_chars(&description, SUMMARY_MAX_CHARS);

            let publisher_name = entry
                .source
                .clone()
                .filter(|s| !s.is_empty())
                .or_else(|| entry.authors.first().map(|p| p.name.clone()))
                .unwrap_or_else(|| feed.label.clone());

            let keywords = extract_keywords(&format!("{} {}", title, summary));
            let topic = keywords
                .first()
                .cloned()
                .unwrap_or_else(|| feed.label.to_lowercase());

            items.push(Item {
                id: url_to_id(&link),
                source: Source::News,
                title,
                summary,
                url: link,
                published_at,
                popularity: recency_score(published_at, now),
                topic,
                category: feed.category,
                keywords,
                duplicate_count: 0,
                kind: ItemKind::News {
                    publisher_name: strip_html(&publisher_name),
                    feed_category: feed.category,
                },
            });
        }

        debug!(feed = %feed.label, items = items.len(), "Parsed feed");
        Ok(items)
    }
}

/// Fetches every registered feed concurrently and settles them all: a feed
/// that fails or times out contributes an empty list, never an error. Items
/// older than the clustering window are dropped after the fan-in.
pub async fn fetch_all_feeds(
    source: &dyn NewsSource,
    feeds: &[FeedConfig],
    config: &SynthesizerConfig,
) -> Vec<Item> {
    let per_feed: Vec<Vec<Item>> = stream::iter(feeds)
        .map(|feed| async move {
            match source.fetch(feed).await {
                Ok(items) => items,
                Err(e) => {
                    warn!(feed = %feed.label, error = %format!("{e:#}"), "Feed fetch failed");
                    Vec::new()
                }
            }
        })
        .buffer_unordered(FEED_CONCURRENCY)
        .collect()
        .await;

    let cutoff = Utc::now() - Duration::hours(config.clustering_window_hours);
    per_feed
        .into_iter()
        .flatten()
        .filter(|item| item.published_at >= cutoff)
        .collect()
}
