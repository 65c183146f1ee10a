use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::models::Item;
use crate::text::extract_keywords;

/// Window size for near-duplicate detection: two titles sharing any run of
/// this many consecutive keywords are treated as the same story.
const NGRAM_SIZE: usize = 4;

fn ngrams(keywords: &[String], n: usize) -> HashSet<String> {
    keywords.windows(n).map(|w| w.join(" ")).collect()
}

fn shares_consecutive_keywords(a: &[String], b: &[String], n: usize) -> bool {
    let grams_a = ngrams(a, n);
    if grams_a.is_empty() {
        return false;
    }
    let grams_b = ngrams(b, n);
    !grams_a.is_disjoint(&grams_b)
}

/// Replaces `kept` with `winner`, folding the loser's duplicate count (plus
/// one for the loser itself) into the winner.
fn replace_kept(kept: &mut Item, mut winner: Item) {
    winner.duplicate_count += kept.duplicate_count + 1;
    *kept = winner;
}

/// Collapses items referring to the same real-world story.
///
/// Pass order matters: identity first (cheap, exact), then near-duplicate
/// (expensive, fuzzy). Video items skip the second pass; they are already
/// distinct per video id.
pub fn deduplicate(items: Vec<Item>) -> Vec<Item> {
    let before = items.len();

    // Pass 1: identity by id. Keep the most popular item per id; on an exact
    // popularity tie a specialized category beats GENERAL. Every non-kept
    // item increments the kept item's duplicate count.
    let mut kept: Vec<Item> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        match index.get(&item.id) {
            None => {
                index.insert(item.id.clone(), kept.len());
                kept.push(item);
            }
            Some(&at) => {
                let existing = &mut kept[at];
                let wins = item.popularity > existing.popularity
                    || (item.popularity == existing.popularity
                        && !item.category.is_general()
                        && existing.category.is_general());
                if wins {
                    replace_kept(existing, item);
                } else {
                    existing.duplicate_count += 1;
                }
            }
        }
    }

    // Pass 2: near-duplicate titles, news only, within the same category.
    let (news, mut result): (Vec<Item>, Vec<Item>) =
        kept.into_iter().partition(|item| item.is_news());

    let mut kept_news: Vec<Item> = Vec::new();
    for item in news {
        let item_kw = extract_keywords(&item.title);
        let mut merged = false;

        for existing in kept_news.iter_mut() {
            if existing.category != item.category {
                continue;
            }
            let existing_kw = extract_keywords(&existing.title);
            if shares_consecutive_keywords(&item_kw, &existing_kw, NGRAM_SIZE) {
                if item.popularity > existing.popularity {
                    replace_kept(existing, item.clone());
                } else {
                    existing.duplicate_count += 1;
                }
                merged = true;
                break;
            }
        }

        if !merged {
            kept_news.push(item);
        }
    }

    result.extend(kept_news);
    debug!(before, after = result.len(), "Deduplication complete");
    result
}

/// Number of items suppressed by a dedup run.
pub fn duplicates_suppressed(before: usize, after: usize) -> usize {
    before.saturating_sub(after)
}
