use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use super::ImageMetadata;

/// Default cap on hashtags appended to one status.
pub const MAX_HASHTAGS: usize = 10;

/// Keywords too generic to be worth a hashtag.
const GENERIC_KEYWORDS: &[&str] = &[
    "photography",
    "photo",
    "photos",
    "image",
    "images",
    "picture",
    "pictures",
];

static PARENTHETICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(.*?\)").expect("valid regex"));
static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));

/// Build CamelCase hashtags from the image's subject keywords.
///
/// `WeightedFlatSubject` comes first (most important first), then any `Subject`
/// keywords not already seen. At most `max` tags are returned.
///
/// ```rust
/// use photo_tooter::exif::{ImageMetadata, hashtags_from_subjects};
///
/// let meta = ImageMetadata {
///     subject: vec!["Saguaro cactus (Carnegiea gigantea)".into(), "photo".into()],
///     ..Default::default()
/// };
/// assert_eq!(hashtags_from_subjects(&meta, 10), vec!["#SaguaroCactus"]);
/// ```
pub fn hashtags_from_subjects(meta: &ImageMetadata, max: usize) -> Vec<String> {
    let mut seen_raw = HashSet::new();
    let mut seen_tags = HashSet::new();
    let mut hashtags = Vec::new();

    let candidates = meta
        .weighted_flat_subject
        .iter()
        .chain(meta.subject.iter())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && seen_raw.insert(s.to_string()));

    for raw in candidates {
        if hashtags.len() >= max {
            break;
        }
        let Some(cleaned) = clean_keyword(raw) else {
            continue;
        };
        let tag = to_hashtag(&cleaned);
        if tag.is_empty() || !seen_tags.insert(tag.to_lowercase()) {
            continue;
        }
        hashtags.push(tag);
    }

    hashtags
}

/// Strip parentheticals and drop keywords that would make poor hashtags.
fn clean_keyword(raw: &str) -> Option<String> {
    let s = PARENTHETICAL.replace_all(raw.trim(), "");
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if GENERIC_KEYWORDS.contains(&s.to_lowercase().as_str()) {
        return None;
    }

    // Short single tokens (#at, #in) are noise
    if !s.contains(' ') && s.chars().count() <= 2 {
        return None;
    }

    Some(s.to_string())
}

/// `"Mt. Rainier"` → `"#MtRainier"`. Returns an empty string if nothing is left.
fn to_hashtag(keyword: &str) -> String {
    let cleaned = PUNCTUATION.replace_all(keyword, " ");
    let camel: String = cleaned.split_whitespace().map(capitalize).collect();
    if camel.is_empty() {
        String::new()
    } else {
        format!("#{camel}")
    }
}

/// Upper-case the first character, lower-case the rest.
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(weighted: &[&str], subject: &[&str]) -> ImageMetadata {
        ImageMetadata {
            weighted_flat_subject: weighted.iter().map(|s| s.to_string()).collect(),
            subject: subject.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    // ── clean_keyword ────────────────────────────────────────────────

    #[test]
    fn clean_removes_parenthetical() {
        assert_eq!(
            clean_keyword("Saguaro cactus (Carnegiea gigantea)").as_deref(),
            Some("Saguaro cactus")
        );
        assert_eq!(clean_keyword("(only latin)"), None);
    }

    #[test]
    fn clean_drops_generic_and_short() {
        assert_eq!(clean_keyword("Photography"), None);
        assert_eq!(clean_keyword("pictures"), None);
        assert_eq!(clean_keyword("at"), None);
        assert_eq!(clean_keyword("NY").as_deref(), None);
        assert_eq!(clean_keyword("a b").as_deref(), Some("a b"));
        assert_eq!(clean_keyword("Fog").as_deref(), Some("Fog"));
    }

    // ── to_hashtag ───────────────────────────────────────────────────

    #[test]
    fn hashtag_camel_cases_words() {
        assert_eq!(to_hashtag("golden gate bridge"), "#GoldenGateBridge");
        assert_eq!(to_hashtag("Mt. Rainier"), "#MtRainier");
        assert_eq!(to_hashtag("USA"), "#Usa");
        assert_eq!(to_hashtag("rock'n'roll"), "#RockNRoll");
    }

    #[test]
    fn hashtag_of_punctuation_only_is_empty() {
        assert_eq!(to_hashtag("..."), "");
    }

    // ── hashtags_from_subjects ───────────────────────────────────────

    #[test]
    fn weighted_subjects_come_first() {
        let tags = hashtags_from_subjects(&meta(&["Sunset"], &["Beach", "Sunset"]), MAX_HASHTAGS);
        assert_eq!(tags, vec!["#Sunset", "#Beach"]);
    }

    #[test]
    fn dedupes_case_insensitively() {
        let tags = hashtags_from_subjects(&meta(&[], &["new york", "New York", "NEW-YORK"]), MAX_HASHTAGS);
        assert_eq!(tags, vec!["#NewYork"]);
    }

    #[test]
    fn respects_max() {
        let subjects = ["alpha", "bravo", "charlie", "delta"];
        let tags = hashtags_from_subjects(&meta(&[], &subjects), 2);
        assert_eq!(tags, vec!["#Alpha", "#Bravo"]);
    }

    #[test]
    fn no_subjects_no_hashtags() {
        assert!(hashtags_from_subjects(&ImageMetadata::default(), MAX_HASHTAGS).is_empty());
    }
}
