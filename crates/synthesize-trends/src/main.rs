use anyhow::Result;
use clap::Parser;
use shared::{
    apply_view_filter, Category, Config, MemoryCache, Pipeline, RssNewsSource, SynthesisResult,
    VideoSource, YouTubeVideoSource,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const LIMIT_MIN: usize = 1;
const LIMIT_MAX: usize = 20;

#[derive(Parser)]
#[command(name = "synthesize-trends")]
#[command(about = "Synthesize trending topics from news feeds and YouTube")]
struct Args {
    /// Only show clusters in this category (e.g. technology, business)
    #[arg(short, long)]
    category: Option<String>,

    /// Maximum clusters per list (clamped to 1-20)
    #[arg(short, long)]
    limit: Option<usize>,

    /// Skip the result cache and force a fresh run
    #[arg(long)]
    no_cache: bool,

    /// Save the full result as JSON in the local data directory
    #[arg(short, long)]
    save: bool,

    /// List previously saved results instead of running the pipeline
    #[arg(long)]
    list: bool,

    /// Print a previously saved result instead of running the pipeline
    #[arg(long, value_name = "FILE")]
    load: Option<PathBuf>,
}

fn list_saved_results() -> Result<()> {
    let files = shared::io::list_result_files()?;
    if files.is_empty() {
        println!("No saved results found.");
        return Ok(());
    }

    println!("Saved results (newest first):");
    for (path, result) in &files {
        println!(
            "  {} — {} clusters, generated {}",
            path.display(),
            result.total_clusters_found,
            result.generated_at.format("%Y-%m-%d %H:%M UTC"),
        );
    }
    Ok(())
}

fn print_result(result: &SynthesisResult) {
    let stats = &result.pipeline_stats;
    println!(
        "\n✓ Processed {} news items and {} videos in {}ms",
        stats.news_items_fetched, stats.video_items_fetched, stats.processing_time_ms
    );
    println!(
        "✓ Formed {} clusters ({} duplicates suppressed)",
        stats.clusters_formed, stats.duplicates_suppressed
    );

    if result.top_clusters.is_empty() {
        println!("\nNo trending clusters found. Sources may be unreachable right now.");
        return;
    }

    println!("\n📈 Top trends:");
    for (rank, cluster) in result.top_clusters.iter().enumerate() {
        println!(
            "  {}. {} [{}] — score {} ({})",
            rank + 1,
            cluster.topic,
            cluster.category.label(),
            cluster.trend_score,
            cluster.momentum.label()
        );
        println!("     {}", cluster.summary);
        for signal in &cluster.growth_signals {
            println!("     • {}", signal);
        }
        for item in &cluster.top_items {
            println!("     → {} ({})", item.title, item.url);
        }
    }

    if !result.breaking_now.is_empty() {
        println!("\n🚨 Breaking now:");
        for cluster in &result.breaking_now {
            println!(
                "  {} — score {}, first seen {:.1}h ago",
                cluster.topic, cluster.trend_score, cluster.first_seen_hours_ago
            );
        }
    }

    if !result.emerging_opportunities.is_empty() {
        println!("\n🌱 Emerging opportunities:");
        for cluster in &result.emerging_opportunities {
            println!("  {} — {}", cluster.topic, cluster.content_opportunity);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::from_env();

    let category = match args.category.as_deref() {
        Some(raw) => Some(raw.parse::<Category>().map_err(|_| {
            anyhow::anyhow!(
                "Invalid category: {}. Use technology, business, politics, health, science, entertainment, sports, or general",
                raw
            )
        })?),
        None => None,
    };
    let limit = args.limit.map(|l| l.clamp(LIMIT_MIN, LIMIT_MAX));

    if args.list {
        return list_saved_results();
    }
    if let Some(path) = args.load {
        let result = shared::io::load_result(&path)?;
        let view = apply_view_filter(result, category, limit);
        print_result(&view);
        return Ok(());
    }

    let news = Arc::new(RssNewsSource::new()?);
    let video = match config.youtube_api_key {
        Some(key) => Some(Arc::new(YouTubeVideoSource::new(key)?) as Arc<dyn VideoSource>),
        None => {
            println!("⚠ No YouTube API key configured; skipping video ingestion.");
            None
        }
    };
    let pipeline = Pipeline::new(news, video, Arc::new(MemoryCache::new()));

    let cache_key = category.map(|c| c.key()).unwrap_or("ALL");

    println!("\n📰 Synthesizing trends from news feeds and YouTube...");
    let result = pipeline.run_cached(cache_key, None, args.no_cache).await;

    if args.save {
        let filename = format!("trends-{}.json", result.generated_at.format("%Y%m%d-%H%M%S"));
        let filepath = shared::io::save_result(&result, &filename)?;
        println!("✓ Saved result to: {}", filepath.display());
    }

    let view = apply_view_filter(result, category, limit);
    print_result(&view);

    Ok(())
}
