use serde::{Deserialize, Serialize};
use std::env;

use crate::models::Category;

/// One syndication feed in the registry.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub url: String,
    pub category: Category,
    pub label: String,
    pub is_keyword_feed: bool,
}

impl FeedConfig {
    fn new(url: &str, category: Category, label: &str, is_keyword_feed: bool) -> Self {
        Self {
            url: url.to_string(),
            category,
            label: label.to_string(),
            is_keyword_feed,
        }
    }
}

/// The static feed registry. Specialized category feeds come first and the
/// GENERAL global feed last, so specialized categories win ties during
/// dedup and clustering.
pub fn default_feeds() -> Vec<FeedConfig> {
    vec![
        FeedConfig::new(
            "https://news.google.com/rss/headlines/section/topic/TECHNOLOGY?hl=en-US&gl=US&ceid=US:en",
            Category::Technology,
            "Technology",
            false,
        ),
        FeedConfig::new(
            "https://news.google.com/rss/headlines/section/topic/BUSINESS?hl=en-US&gl=US&ceid=US:en",
            Category::Business,
            "Business",
            false,
        ),
        FeedConfig::new(
            "https://news.google.com/rss/headlines/section/topic/POLITICS?hl=en-US&gl=US&ceid=US:en",
            Category::Politics,
            "Politics",
            false,
        ),
        FeedConfig::new(
            "https://news.google.com/rss/headlines/section/topic/HEALTH?hl=en-US&gl=US&ceid=US:en",
            Category::Health,
            "Health",
            false,
        ),
        FeedConfig::new(
            "https://news.google.com/rss/headlines/section/topic/SCIENCE?hl=en-US&gl=US&ceid=US:en",
            Category::Science,
            "Science",
            false,
        ),
        FeedConfig::new(
            "https://news.google.com/rss/headlines/section/topic/ENTERTAINMENT?hl=en-US&gl=US&ceid=US:en",
            Category::Entertainment,
            "Entertainment",
            false,
        ),
        FeedConfig::new(
            "https://news.google.com/rss/headlines/section/topic/SPORTS?hl=en-US&gl=US&ceid=US:en",
            Category::Sports,
            "Sports",
            false,
        ),
        FeedConfig::new(
            "https://news.google.com/rss/search?q=artificial+intelligence&hl=en-US&gl=US&ceid=US:en",
            Category::Technology,
            "AI",
            true,
        ),
        FeedConfig::new(
            "https://news.google.com/rss/search?q=biotech+breakthrough&hl=en-US&gl=US&ceid=US:en",
            Category::Science,
            "Biotech",
            true,
        ),
        FeedConfig::new(
            "https://news.google.com/rss/search?q=mental+health+wellness&hl=en-US&gl=US&ceid=US:en",
            Category::Health,
            "Wellness",
            true,
        ),
        FeedConfig::new(
            "https://news.google.com/rss/search?q=streaming+war+netflix+disney&hl=en-US&gl=US&ceid=US:en",
            Category::Entertainment,
            "Streaming",
            true,
        ),
        // Global/general fallback last
        FeedConfig::new(
            "https://news.google.com/rss?hl=en-US&gl=US&ceid=US:en",
            Category::General,
            "Google News Global",
            false,
        ),
    ]
}

/// Tunable pipeline parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizerConfig {
    pub max_clusters_to_return: usize,
    pub min_items_per_cluster: usize,
    pub clustering_window_hours: i64,
    pub breaking_news_window_hours: f64,
    pub video_results_per_topic: u32,
    pub velocity_window_hours: i64,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            max_clusters_to_return: 10,
            min_items_per_cluster: 2,
            clustering_window_hours: 48,
            breaking_news_window_hours: 6.0,
            video_results_per_topic: 5,
            velocity_window_hours: 24,
        }
    }
}

/// Process environment configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Absent key disables video ingestion rather than failing the run.
    pub youtube_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::try_load_dotenv();

        Self {
            youtube_api_key: env::var("YOUTUBE_API_KEY").ok().filter(|k| !k.is_empty()),
        }
    }

    fn try_load_dotenv() {
        // Try locations in order of preference:

        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/trend-synthesizer/.env (standard config location)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("trend-synthesizer").join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env (home directory)
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }

        // If none found, that's okay - environment variables might be set system-wide
    }
}
