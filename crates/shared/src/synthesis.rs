use std::collections::{BTreeMap, HashSet};

use crate::config::SynthesizerConfig;
use crate::models::{
    Category, ClusterSummary, Momentum, Source, TopItem, TrendCluster,
};

const TOP_ITEMS_PER_CLUSTER: usize = 3;
const GROWTH_SIGNALS_MAX: usize = 4;
const TRENDING_IN_24H_THRESHOLD: f64 = 0.65;

fn why_it_matters(category: Category) -> String {
    match category {
        Category::Technology => {
            "Tech creators can capitalize on audience curiosity around this development"
        }
        Category::Business => {
            "Finance and business creators have a high-CPM audience actively searching for analysis"
        }
        Category::Health => {
            "Health creators can produce timely explainer content while search intent is elevated"
        }
        Category::Politics => {
            "News commentary creators can drive high engagement with rapid-response content"
        }
        Category::Entertainment => {
            "Entertainment creators can ride the virality wave with reaction or commentary content"
        }
        Category::Science => {
            "Science communicators have an opportunity to simplify this story for mass audiences"
        }
        Category::Sports => {
            "Sports creators can capture fan traffic with timely analysis and highlights coverage"
        }
        Category::General => {
            "Broad appeal topic — general lifestyle creators can connect this to their audience's interests"
        }
    }
    .to_string()
}

fn content_opportunity(cluster: &TrendCluster) -> String {
    let topic = &cluster.topic;
    match cluster.momentum {
        Momentum::Emerging => format!(
            "Be among the first to publish a breakdown of {topic} — early movers capture \
             disproportionate traffic before mainstream coverage peaks"
        ),
        Momentum::Rising => format!(
            "Publish a beginner explainer or reaction video about {topic} while search intent \
             is building toward peak"
        ),
        Momentum::Peak => format!(
            "React to the latest {topic} developments with your unique perspective within \
             24 hours to capture trending traffic"
        ),
        Momentum::Declining => match cluster.category {
            Category::Technology => format!(
                "Publish a retrospective or \"what we learned\" piece on {topic} to capture \
                 long-tail search traffic as hype settles"
            ),
            Category::Business => format!(
                "Produce an analysis of how {topic} affected markets — evergreen content that \
                 will rank as audiences research the aftermath"
            ),
            Category::Entertainment => format!(
                "Create a recap or \"everything you need to know\" summary video for \
                 late-arriving audiences still discovering {topic}"
            ),
            _ => format!(
                "Create a comprehensive summary of the {topic} story to serve audiences still \
                 discovering it"
            ),
        },
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Three fixed sentences: coverage breadth, momentum, and a score-banded
/// outlook.
fn build_summary(cluster: &TrendCluster) -> String {
    let mix = &cluster.sources_mix;
    let video_count = cluster.video_items().count();

    let videos_clause = if mix.video_count > 0 {
        format!(" and {} video{}", mix.video_count, plural(mix.video_count))
    } else {
        String::new()
    };
    let s1 = format!(
        "{} is being covered by {} news publisher{}{} in the last 48 hours.",
        cluster.topic,
        mix.news_count,
        plural(mix.news_count),
        videos_clause,
    );

    let s2 = if video_count > 0 {
        format!(
            "Momentum is {} with {} video{} published recently, accumulating views rapidly.",
            cluster.momentum.label(),
            video_count,
            plural(video_count),
        )
    } else {
        format!(
            "News momentum is {}, with content first surfacing {:.0} hours ago.",
            cluster.momentum.label(),
            cluster.first_seen_hours_ago,
        )
    };

    let s3 = if cluster.cluster_score > 0.7 {
        "This topic shows strong signals across multiple sources and is likely approaching or at its virality window."
    } else if cluster.cluster_score > 0.4 {
        "Creator opportunity exists now while the story expands before mainstream saturation."
    } else {
        "This story is settling; evergreen content can still capture residual search traffic."
    };

    format!("{s1} {s2} {s3}")
}

fn growth_signals(cluster: &TrendCluster) -> Vec<String> {
    let mut signals = Vec::new();

    let top_video = cluster
        .video_items()
        .filter_map(|i| i.video_stats().map(|s| s.views_per_hour))
        .max_by(f64::total_cmp);
    if cluster.velocity_score > 0.7 {
        if let Some(views_per_hour) = top_video {
            signals.push(format!(
                "High view velocity — {views_per_hour:.0} views/hour on top video"
            ));
        }
    }
    if cluster.sources_mix.news_count > 5 {
        signals.push(format!(
            "{} news publishers covering this story",
            cluster.sources_mix.news_count
        ));
    }
    if cluster.first_seen_hours_ago < 6.0 {
        signals.push(format!(
            "Breaking — first detected {:.1} hours ago",
            cluster.first_seen_hours_ago
        ));
    }
    if cluster.trending_probability > 0.7 {
        signals.push("High trending probability — likely to peak in 24–48 hours".to_string());
    }

    if signals.is_empty() {
        signals.push(format!(
            "{} items across {} source{}",
            cluster.total_items,
            cluster.publisher_count,
            plural(cluster.publisher_count),
        ));
        if cluster.first_seen_hours_ago < 24.0 {
            signals.push(format!(
                "Story emerged {:.0} hours ago",
                cluster.first_seen_hours_ago
            ));
        }
    }

    signals.truncate(GROWTH_SIGNALS_MAX);
    signals
}

/// Up to three representatives: the most popular news item, the most popular
/// video, then the most popular remaining items regardless of source.
fn top_items(cluster: &TrendCluster) -> Vec<TopItem> {
    let as_top = |item: &crate::models::Item| TopItem {
        source: item.source,
        title: item.title.clone(),
        url: item.url.clone(),
        published_at: item.published_at,
        popularity: item.popularity,
    };

    let mut items: Vec<TopItem> = Vec::new();
    if let Some(top_news) = cluster
        .news_items()
        .max_by(|a, b| a.popularity.total_cmp(&b.popularity))
    {
        items.push(as_top(top_news));
    }
    if let Some(top_video) = cluster
        .video_items()
        .max_by(|a, b| a.popularity.total_cmp(&b.popularity))
    {
        items.push(as_top(top_video));
    }

    if items.len() < TOP_ITEMS_PER_CLUSTER {
        let used: HashSet<&str> = items.iter().map(|i| i.url.as_str()).collect();
        let mut remaining: Vec<&crate::models::Item> = cluster
            .items
            .iter()
            .filter(|i| !used.contains(i.url.as_str()))
            .collect();
        remaining.sort_by(|a, b| b.popularity.total_cmp(&a.popularity));
        items.extend(
            remaining
                .into_iter()
                .take(TOP_ITEMS_PER_CLUSTER - items.len())
                .map(as_top),
        );
    }

    items.truncate(TOP_ITEMS_PER_CLUSTER);
    items
}

pub fn summarize_cluster(cluster: &TrendCluster) -> ClusterSummary {
    ClusterSummary {
        cluster_id: cluster.cluster_id.clone(),
        topic: cluster.topic.clone(),
        category: cluster.category,
        trend_score: (cluster.cluster_score * 100.0).round() as u32,
        momentum: cluster.momentum,
        summary: build_summary(cluster),
        why_it_matters: why_it_matters(cluster.category),
        growth_signals: growth_signals(cluster),
        trending_in_24h: cluster.trending_probability > TRENDING_IN_24H_THRESHOLD,
        top_items: top_items(cluster),
        content_opportunity: content_opportunity(cluster),
        first_seen_hours_ago: cluster.first_seen_hours_ago,
        velocity_score: cluster.velocity_score,
    }
}

/// Projects every cluster into its outward-facing summary.
pub fn synthesize(clusters: &[TrendCluster]) -> Vec<ClusterSummary> {
    clusters.iter().map(summarize_cluster).collect()
}

/// Sorts by trend score descending and keeps the configured top N.
pub fn rank_and_filter(
    mut summaries: Vec<ClusterSummary>,
    config: &SynthesizerConfig,
) -> Vec<ClusterSummary> {
    summaries.sort_by(|a, b| b.trend_score.cmp(&a.trend_score));
    summaries.truncate(config.max_clusters_to_return);
    summaries
}

/// Buckets summaries by category. Every category key is present, empty or not,
/// so consumers never need to special-case missing buckets.
pub fn group_by_category(summaries: &[ClusterSummary]) -> BTreeMap<Category, Vec<ClusterSummary>> {
    let mut grouped: BTreeMap<Category, Vec<ClusterSummary>> =
        Category::ALL.into_iter().map(|c| (c, Vec::new())).collect();
    for summary in summaries {
        grouped
            .entry(summary.category)
            .or_default()
            .push(summary.clone());
    }
    grouped
}
