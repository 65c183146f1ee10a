use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

use crate::config::SynthesizerConfig;
use crate::models::{Category, Item, Momentum, SourcesMix, TrendCluster};
use crate::text::{capitalize, extract_named_entities, ENTITY_MIN_LEN, MAX_KEYWORDS};

/// Popularity threshold above which a singleton survives the minimum-size
/// filter.
const SINGLETON_KEEP_POPULARITY: f64 = 0.8;

/// Normalization ceiling shared with video popularity scoring.
const VIEWS_PER_HOUR_CEILING: f64 = 10_000.0;

/// Pluggable similarity predicate used by the greedy driver, so the matching
/// rule can be swapped or tested independently of the grouping loop.
pub trait Similarity: Send + Sync {
    fn similar(&self, a: &Item, b: &Item) -> bool;
}

/// Default predicate: two items are similar when they share at least two
/// keywords, or their titles share a named entity.
pub struct KeywordEntitySimilarity;

impl Similarity for KeywordEntitySimilarity {
    fn similar(&self, a: &Item, b: &Item) -> bool {
        let keywords_a: HashSet<&str> = a.keywords.iter().map(String::as_str).collect();
        let shared = b
            .keywords
            .iter()
            .filter(|kw| keywords_a.contains(kw.as_str()))
            .count();
        if shared >= 2 {
            return true;
        }

        let entities_a = extract_named_entities(&a.title, ENTITY_MIN_LEN);
        if entities_a.is_empty() {
            return false;
        }
        let entities_b: HashSet<String> =
            extract_named_entities(&b.title, ENTITY_MIN_LEN).into_iter().collect();
        entities_a.iter().any(|e| entities_b.contains(e))
    }
}

/// Ordered frequency count: keys ranked by count descending, first-seen order
/// breaking ties, so cluster labels are deterministic.
fn ranked_frequencies<'a, I>(values: I) -> Vec<(&'a str, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for value in values {
        let count = counts.entry(value).or_insert(0);
        if *count == 0 {
            order.push(value);
        }
        *count += 1;
    }
    order.sort_by_key(|v| std::cmp::Reverse(counts[v]));
    order.into_iter().map(|v| (v, counts[v])).collect()
}

/// A named entity present in at least half the members labels the cluster;
/// otherwise the most frequent merged keyword; otherwise "General".
fn topic_label(items: &[Item], entities_per_item: &[Vec<String>]) -> String {
    let threshold = (items.len() as f64 * 0.5).ceil() as usize;
    let all_entities = entities_per_item.iter().flatten().map(String::as_str);
    if let Some((entity, _)) = ranked_frequencies(all_entities)
        .into_iter()
        .find(|(entity, count)| *count >= threshold && entity.len() >= ENTITY_MIN_LEN)
    {
        return capitalize(entity);
    }

    let all_keywords = items.iter().flat_map(|i| i.keywords.iter().map(String::as_str));
    match ranked_frequencies(all_keywords).first() {
        Some((keyword, _)) => capitalize(keyword),
        None => "General".to_string(),
    }
}

/// Frequency vote weighted 2x toward specialized categories, so GENERAL
/// cannot swallow a cluster it only partially covers.
fn dominant_category(items: &[Item]) -> Category {
    let mut weights: HashMap<Category, usize> = HashMap::new();
    for item in items {
        let weight = if item.category.is_general() { 1 } else { 2 };
        *weights.entry(item.category).or_insert(0) += weight;
    }

    let mut entries: Vec<(Category, usize)> = weights.into_iter().collect();
    entries.sort_by_key(|(category, weight)| {
        (std::cmp::Reverse(*weight), category.is_general(), *category)
    });
    entries.first().map(|(c, _)| *c).unwrap_or(Category::General)
}

fn merged_keywords(items: &[Item]) -> Vec<String> {
    let all = items.iter().flat_map(|i| i.keywords.iter().map(String::as_str));
    ranked_frequencies(all)
        .into_iter()
        .take(MAX_KEYWORDS)
        .map(|(kw, _)| kw.to_string())
        .collect()
}

fn publisher_count(items: &[Item]) -> usize {
    items
        .iter()
        .filter_map(|i| i.publisher_name())
        .collect::<HashSet<_>>()
        .len()
}

/// Classifies momentum from age and score. The arms are evaluated in order
/// and are mutually exclusive: young clusters are Emerging/Rising regardless
/// of score, old ones split on score alone.
pub fn classify_momentum(first_seen_hours_ago: f64, cluster_score: f64) -> Momentum {
    if first_seen_hours_ago < 6.0 {
        Momentum::Emerging
    } else if first_seen_hours_ago < 24.0 {
        Momentum::Rising
    } else if cluster_score > 0.7 {
        Momentum::Peak
    } else {
        Momentum::Declining
    }
}

fn build_cluster(group: Vec<Item>, now: DateTime<Utc>) -> TrendCluster {
    let news_count = group.iter().filter(|i| i.is_news()).count();
    let video_count = group.len() - news_count;
    let total_items = group.len();

    let first_seen_at = group.iter().map(|i| i.published_at).min().unwrap_or(now);
    let last_seen_at = group.iter().map(|i| i.published_at).max().unwrap_or(now);
    let first_seen_hours_ago = (now - first_seen_at).num_milliseconds() as f64 / 3_600_000.0;

    let avg_popularity =
        group.iter().map(|i| i.popularity).sum::<f64>() / total_items as f64;

    // Velocity: mean video views/hour against the ceiling when videos exist,
    // else plain average popularity.
    let velocity_score = if video_count > 0 {
        let mean_vph = group
            .iter()
            .filter_map(|i| i.video_stats())
            .map(|s| s.views_per_hour)
            .sum::<f64>()
            / video_count as f64;
        (mean_vph / VIEWS_PER_HOUR_CEILING).min(1.0)
    } else {
        avg_popularity
    };

    let sources_mix_bonus = if news_count > 0 && video_count > 0 { 1.0 } else { 0.5 };
    let recency_bonus = if first_seen_hours_ago < 12.0 { 0.1 } else { 0.0 };
    let cluster_score = (avg_popularity * 0.4
        + velocity_score * 0.3
        + sources_mix_bonus * 0.2
        + recency_bonus)
        .min(1.0);

    let trending_probability = (cluster_score * 0.5
        + velocity_score * 0.3
        + if first_seen_hours_ago < 12.0 { 0.2 } else { 0.0 })
    .min(1.0);

    let entities_per_item: Vec<Vec<String>> = group
        .iter()
        .map(|i| extract_named_entities(&i.title, ENTITY_MIN_LEN))
        .collect();

    TrendCluster {
        cluster_id: Uuid::new_v4().to_string(),
        topic: topic_label(&group, &entities_per_item),
        category: dominant_category(&group),
        cluster_score,
        momentum: classify_momentum(first_seen_hours_ago, cluster_score),
        total_items,
        first_seen_at,
        last_seen_at,
        first_seen_hours_ago,
        publisher_count: publisher_count(&group),
        velocity_score,
        sources_mix: SourcesMix {
            news_count,
            video_count,
            news_ratio: news_count as f64 / total_items as f64,
        },
        keywords: merged_keywords(&group),
        trending_probability,
        items: group,
    }
}

/// Greedy single-pass clustering.
///
/// Items are taken in popularity order so high-signal items become seeds.
/// Each item is tested against the seed of every existing group and joins the
/// first match (O(n·g), seed-only). This deliberately under-merges when an
/// item matches a non-seed member but not the seed; that is the accepted
/// trade-off versus all-pairs comparison, not a bug.
pub fn cluster_items(
    items: &[Item],
    config: &SynthesizerConfig,
    similarity: &dyn Similarity,
    now: DateTime<Utc>,
) -> Vec<TrendCluster> {
    let mut sorted: Vec<Item> = items.to_vec();
    sorted.sort_by(|a, b| b.popularity.total_cmp(&a.popularity));

    let mut groups: Vec<Vec<Item>> = Vec::new();
    for item in sorted {
        let position = groups
            .iter()
            .position(|group| similarity.similar(&item, &group[0]));
        match position {
            Some(at) => groups[at].push(item),
            None => groups.push(vec![item]),
        }
    }

    let total_groups = groups.len();
    let mut clusters: Vec<TrendCluster> = groups
        .into_iter()
        .filter(|g| {
            g.len() >= config.min_items_per_cluster
                || (g.len() == 1 && g[0].popularity > SINGLETON_KEEP_POPULARITY)
        })
        .map(|g| build_cluster(g, now))
        .collect();

    clusters.sort_by(|a, b| b.cluster_score.total_cmp(&a.cluster_score));
    debug!(
        groups = total_groups,
        kept = clusters.len(),
        "Clustering complete"
    );
    clusters
}
