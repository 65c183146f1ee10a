use std::collections::HashSet;
use std::sync::LazyLock;

/// Keyword cap shared by extraction and merging.
pub const MAX_KEYWORDS: usize = 10;

/// Minimum token length for the named-entity pass used in title matching.
pub const ENTITY_MIN_LEN: usize = 5;

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "the", "a", "an", "is", "are", "was", "were", "be", "been", "being", "have", "has",
        "had", "do", "does", "did", "will", "would", "could", "should", "may", "might",
        "shall", "can", "need", "dare", "ought", "used", "to", "of", "in", "for", "on",
        "with", "at", "by", "from", "up", "about", "into", "through", "during", "before",
        "after", "and", "but", "or", "nor", "so", "yet", "both", "not", "this", "that", "it",
    ]
    .into_iter()
    .collect()
});

/// Extracts up to ten meaningful keywords from a text string.
///
/// Pure and deterministic: lowercases, strips non-alphanumerics per token,
/// drops tokens shorter than four characters or in the stopword set, and
/// deduplicates preserving first-seen order. Clustering correctness depends
/// on this stability.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keywords = Vec::new();

    for raw in text.to_lowercase().split_whitespace() {
        let word: String = raw.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
        if word.len() < 4 || STOP_WORDS.contains(word.as_str()) {
            continue;
        }
        if seen.insert(word.clone()) {
            keywords.push(word);
            if keywords.len() == MAX_KEYWORDS {
                break;
            }
        }
    }

    keywords
}

/// Naive named-entity detection: a token at least `min_len` long that begins
/// with an uppercase letter counts as a candidate, lowercased on return so
/// matching is case-insensitive. The first word of each sentence is skipped
/// to avoid false positives from capitalized sentence starters.
pub fn extract_named_entities(text: &str, min_len: usize) -> Vec<String> {
    let mut entities = Vec::new();

    for sentence in text.split(['.', '!', '?']) {
        for (position, token) in sentence.split_whitespace().enumerate() {
            if position == 0 {
                continue;
            }
            if token.chars().count() < min_len {
                continue;
            }
            if !token.chars().next().is_some_and(|c| c.is_uppercase()) {
                continue;
            }
            let normalized: String = token
                .to_lowercase()
                .chars()
                .filter(|c| c.is_ascii_alphabetic())
                .collect();
            if !normalized.is_empty() {
                entities.push(normalized);
            }
        }
    }

    entities
}

/// Flattens an HTML fragment (feed descriptions are frequently tag soup)
/// into single-line plain text.
pub fn strip_html(html: &str) -> String {
    let text = html2text::from_read(html.as_bytes(), 500);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncates to at most `max` characters, respecting char boundaries.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Uppercases the first character, for turning a keyword into a topic label.
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_drop_stopwords_and_short_tokens() {
        let kw = extract_keywords("The quick brown fox is on a mission");
        assert_eq!(kw, vec!["quick", "brown", "mission"]);
    }

    #[test]
    fn keywords_strip_punctuation() {
        let kw = extract_keywords("Breaking: \"Quantum\" chips, launched!");
        assert_eq!(kw, vec!["breaking", "quantum", "chips", "launched"]);
    }

    #[test]
    fn keywords_dedupe_preserving_first_seen_order() {
        let kw = extract_keywords("election results election night results");
        assert_eq!(kw, vec!["election", "results", "night"]);
    }

    #[test]
    fn keywords_cap_at_ten() {
        let text = "alpha bravo charlie delta echo foxtrot golfing hotel india juliet kilogram lima";
        assert_eq!(extract_keywords(text).len(), MAX_KEYWORDS);
    }

    #[test]
    fn keywords_are_deterministic() {
        let text = "Senate Passes Sweeping Energy Bill After Marathon Debate";
        assert_eq!(extract_keywords(text), extract_keywords(text));
    }

    #[test]
    fn entities_skip_sentence_leading_words() {
        let ents = extract_named_entities("Apple unveils Vision headset. Tesla follows suit", 5);
        // "Apple" and "Tesla" lead their sentences; "Vision" is the only match
        // long enough that is not in first position.
        assert_eq!(ents, vec!["vision"]);
    }

    #[test]
    fn entities_respect_min_len() {
        let text = "Shares of AI firm Nvidia surged";
        assert_eq!(extract_named_entities(text, 5), vec!["nvidia"]);
        assert_eq!(extract_named_entities(text, 2), vec!["ai", "nvidia"]);
    }

    #[test]
    fn entities_lowercase_and_strip_non_letters() {
        let ents = extract_named_entities("Chipmaker launches Quantum-3 platform", 5);
        assert_eq!(ents, vec!["quantum"]);
    }

    #[test]
    fn entities_ignore_lowercase_tokens() {
        assert!(extract_named_entities("markets rally on strong earnings", 5).is_empty());
    }

    #[test]
    fn strip_html_flattens_markup() {
        let text = strip_html("<p>Hello <b>world</b></p>");
        assert!(text.contains("Hello"));
        assert!(text.contains("world"));
        assert!(!text.contains('<'));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn capitalize_first_letter() {
        assert_eq!(capitalize("nvidia"), "Nvidia");
        assert_eq!(capitalize(""), "");
    }
}
