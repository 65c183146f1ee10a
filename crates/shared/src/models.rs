use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use xxhash_rust::xxh3::xxh3_64;

/// Where an item was ingested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Source {
    News,
    Video,
}

/// Fixed topic taxonomy. Feeds are assigned a category up front; video items
/// inherit theirs from the seeding topic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Technology,
    Business,
    Politics,
    Health,
    Science,
    Entertainment,
    Sports,
    General,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Technology,
        Category::Business,
        Category::Politics,
        Category::Health,
        Category::Science,
        Category::Entertainment,
        Category::Sports,
        Category::General,
    ];

    pub fn is_general(&self) -> bool {
        matches!(self, Category::General)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Technology => "Technology",
            Category::Business => "Business",
            Category::Politics => "Politics",
            Category::Health => "Health",
            Category::Science => "Science",
            Category::Entertainment => "Entertainment",
            Category::Sports => "Sports",
            Category::General => "General",
        }
    }

    /// Cache-key / CLI spelling, e.g. "TECHNOLOGY".
    pub fn key(&self) -> &'static str {
        match self {
            Category::Technology => "TECHNOLOGY",
            Category::Business => "BUSINESS",
            Category::Politics => "POLITICS",
            Category::Health => "HEALTH",
            Category::Science => "SCIENCE",
            Category::Entertainment => "ENTERTAINMENT",
            Category::Sports => "SPORTS",
            Category::General => "GENERAL",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        Category::ALL
            .into_iter()
            .find(|c| c.key() == upper)
            .ok_or_else(|| format!("unknown category: {}", s))
    }
}

/// Lifecycle stage of a cluster, derived from age and score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Momentum {
    Emerging,
    Rising,
    Peak,
    Declining,
}

impl Momentum {
    pub fn label(&self) -> &'static str {
        match self {
            Momentum::Emerging => "emerging",
            Momentum::Rising => "rising",
            Momentum::Peak => "peak",
            Momentum::Declining => "declining",
        }
    }
}

/// Engagement metrics carried only by video items. Velocity fields are
/// count / max(hours since publish, 1); the floor keeps items published
/// minutes ago from blowing up the division.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoStats {
    pub channel_name: String,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    pub views_per_hour: f64,
    pub like_velocity: f64,
    pub comment_velocity: f64,
    pub tags: Vec<String>,
}

/// Source-specific item payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemKind {
    News {
        publisher_name: String,
        feed_category: Category,
    },
    Video(VideoStats),
}

/// A normalized news or video item flowing through the pipeline.
///
/// `id` is a stable hash of the canonical URL: the same URL always yields the
/// same id, which is what the identity dedup pass keys on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub source: Source,
    pub title: String,
    pub summary: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub popularity: f64,
    pub topic: String,
    pub category: Category,
    pub keywords: Vec<String>,
    pub duplicate_count: u32,
    pub kind: ItemKind,
}

impl Item {
    pub fn is_news(&self) -> bool {
        self.source == Source::News
    }

    pub fn is_video(&self) -> bool {
        self.source == Source::Video
    }

    pub fn publisher_name(&self) -> Option<&str> {
        match &self.kind {
            ItemKind::News { publisher_name, .. } => Some(publisher_name),
            ItemKind::Video(_) => None,
        }
    }

    pub fn video_stats(&self) -> Option<&VideoStats> {
        match &self.kind {
            ItemKind::Video(stats) => Some(stats),
            ItemKind::News { .. } => None,
        }
    }

    pub fn hours_since_publish(&self, now: DateTime<Utc>) -> f64 {
        (now - self.published_at).num_milliseconds() as f64 / 3_600_000.0
    }
}

/// Derives a stable item id from a URL. Fragments are stripped so trivially
/// different links to the same story hash identically.
pub fn url_to_id(url: &str) -> String {
    let canonical = match url::Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.trim().to_string(),
    };
    format!("{:016x}", xxh3_64(canonical.as_bytes()))
}

/// News vs video composition of a cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesMix {
    pub news_count: usize,
    pub video_count: usize,
    pub news_ratio: f64,
}

/// A group of deduplicated items judged to describe the same real-world topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendCluster {
    pub cluster_id: String,
    pub topic: String,
    pub category: Category,
    pub cluster_score: f64,
    pub momentum: Momentum,
    pub items: Vec<Item>,
    pub total_items: usize,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub first_seen_hours_ago: f64,
    pub publisher_count: usize,
    pub velocity_score: f64,
    pub sources_mix: SourcesMix,
    pub keywords: Vec<String>,
    pub trending_probability: f64,
}

impl TrendCluster {
    pub fn news_items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(|i| i.is_news())
    }

    pub fn video_items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(|i| i.is_video())
    }
}

/// Pointer to one representative item inside a summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopItem {
    pub source: Source,
    pub title: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub popularity: f64,
}

/// Externally-facing projection of a cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub cluster_id: String,
    pub topic: String,
    pub category: Category,
    pub trend_score: u32,
    pub momentum: Momentum,
    pub summary: String,
    pub why_it_matters: String,
    pub growth_signals: Vec<String>,
    pub trending_in_24h: bool,
    pub top_items: Vec<TopItem>,
    pub content_opportunity: String,
    pub first_seen_hours_ago: f64,
    pub velocity_score: f64,
}

/// How much data each stage actually gathered, so callers can present partial
/// results with honest provenance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineStats {
    pub news_items_fetched: usize,
    pub video_items_fetched: usize,
    pub clusters_formed: usize,
    pub duplicates_suppressed: usize,
    pub processing_time_ms: u64,
}

/// Top-level output of a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisResult {
    pub generated_at: DateTime<Utc>,
    pub total_clusters_found: usize,
    pub top_clusters: Vec<ClusterSummary>,
    pub by_category: BTreeMap<Category, Vec<ClusterSummary>>,
    pub breaking_now: Vec<ClusterSummary>,
    pub emerging_opportunities: Vec<ClusterSummary>,
    pub pipeline_stats: PipelineStats,
}

impl SynthesisResult {
    /// Structurally valid worst case: the pipeline returns this shape (with
    /// whatever stats were gathered) rather than an error.
    pub fn empty(stats: PipelineStats) -> Self {
        let by_category = Category::ALL.into_iter().map(|c| (c, Vec::new())).collect();
        Self {
            generated_at: Utc::now(),
            total_clusters_found: 0,
            top_clusters: Vec::new(),
            by_category,
            breaking_now: Vec::new(),
            emerging_opportunities: Vec::new(),
            pipeline_stats: stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_a_pure_function_of_url() {
        let a = url_to_id("https://example.com/story-1");
        let b = url_to_id("https://example.com/story-1");
        let c = url_to_id("https://example.com/story-2");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn id_ignores_url_fragments() {
        assert_eq!(
            url_to_id("https://example.com/a#section"),
            url_to_id("https://example.com/a")
        );
    }

    #[test]
    fn id_handles_unparseable_urls() {
        assert_eq!(url_to_id("not a url"), url_to_id("  not a url "));
    }

    #[test]
    fn category_parses_from_cli_spelling() {
        assert_eq!(
            "technology".parse::<Category>().unwrap(),
            Category::Technology
        );
        assert_eq!("SPORTS".parse::<Category>().unwrap(), Category::Sports);
        assert!("unknown".parse::<Category>().is_err());
    }

    #[test]
    fn category_serializes_screaming_snake() {
        let json = serde_json::to_string(&Category::Entertainment).unwrap();
        assert_eq!(json, "\"ENTERTAINMENT\"");
    }
}
