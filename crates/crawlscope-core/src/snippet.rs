//! Boilerplate cleaning, sentence extraction, and preview assembly.
//!
//! Crawled chunks are Markdown with site chrome mixed in: "Next →" links,
//! image tags, "Was this page helpful?" footers. Cleaning runs as an
//! ordered list of pure text steps ([`LINE_STEPS`]), then the result is
//! whitespace-collapsed and split into sentences. Only sentences that pass
//! [`is_relevant_sentence`] are scored.
//!
//! # Preview assembly
//!
//! 1. Score each sentence against the query ([`score_sentence`]).
//! 2. Take the best-scoring sentences (ties by position), up to 5, while
//!    they fit the 700-char budget; stop once 3 are in and one doesn't fit.
//! 3. Fewer than 3? Backfill with unscored sentences nearest to the ones
//!    already picked.
//! 4. Nothing scored? Take the leading sentences that fit.
//! 5. Re-order to document order and join with spaces.
//!
//! With no relevant sentence at all, the first substantive cleaned line
//! is used, cut to 220 chars.

use regex::Regex;
use std::sync::OnceLock;

use crate::lexicon::{compile, Lexicon};
use crate::rerank::QueryTerms;

macro_rules! static_regex {
    ($pattern:expr) => {{
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| compile($pattern))
    }};
}

/// One cleaning step: a pure text transform.
pub type CleanStep = fn(&str, &Lexicon) -> String;

/// Cleaning steps that keep line structure, in the order they run.
pub const LINE_STEPS: [(&str, CleanStep); 9] = [
    ("boilerplate_lines", remove_boilerplate_lines),
    ("markdown_images", strip_markdown_images),
    ("empty_links", strip_empty_links),
    ("link_labels", unwrap_links),
    ("bare_urls", remove_bare_urls),
    ("heading_markers", strip_heading_markers),
    ("horizontal_rules", remove_horizontal_rules),
    ("list_markers", strip_list_markers),
    ("boilerplate_phrases", remove_boilerplate_phrases),
];

/// Drop lines that are only a navigation phrase ("Previous", "Menu", ...).
pub fn remove_boilerplate_lines(text: &str, lexicon: &Lexicon) -> String {
    text.lines()
        .filter(|line| !lexicon.is_nav_phrase(line))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn strip_markdown_images(text: &str, _lexicon: &Lexicon) -> String {
    static_regex!(r"!\[[^\]]*\]\([^)]*\)")
        .replace_all(text, "")
        .into_owned()
}

pub fn strip_empty_links(text: &str, _lexicon: &Lexicon) -> String {
    static_regex!(r"\[\s*\]\([^)]*\)")
        .replace_all(text, "")
        .into_owned()
}

/// `[label](url)` → `label`.
pub fn unwrap_links(text: &str, _lexicon: &Lexicon) -> String {
    static_regex!(r"\[([^\]]+)\]\([^)]*\)")
        .replace_all(text, "$1")
        .into_owned()
}

pub fn remove_bare_urls(text: &str, _lexicon: &Lexicon) -> String {
    static_regex!(r"(?:https?://|www\.)[^\s)\]>]+")
        .replace_all(text, "")
        .into_owned()
}

pub fn strip_heading_markers(text: &str, _lexicon: &Lexicon) -> String {
    static_regex!(r"(?m)^[ \t]*#{1,6}[ \t]*")
        .replace_all(text, "")
        .into_owned()
}

pub fn remove_horizontal_rules(text: &str, _lexicon: &Lexicon) -> String {
    static_regex!(r"(?m)^[ \t]*(?:[-*_][ \t]*){3,}$")
        .replace_all(text, "")
        .into_owned()
}

pub fn strip_list_markers(text: &str, _lexicon: &Lexicon) -> String {
    static_regex!(r"(?m)^[ \t]*(?:[-*+•]|\d{1,3}[.)])[ \t]+")
        .replace_all(text, "")
        .into_owned()
}

pub fn remove_boilerplate_phrases(text: &str, lexicon: &Lexicon) -> String {
    lexicon
        .boilerplate_phrases
        .replace_all(text, "")
        .into_owned()
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Run [`LINE_STEPS`] in order. Line breaks are preserved.
pub fn clean_lines(raw: &str, lexicon: &Lexicon) -> String {
    LINE_STEPS
        .iter()
        .fold(raw.to_string(), |text, (_, step)| step(&text, lexicon))
}

/// Fully cleaned, single-line plain text.
pub fn clean_text(raw: &str, lexicon: &Lexicon) -> String {
    collapse_whitespace(&clean_lines(raw, lexicon))
}

/// Split on `.`, `!`, or `?` followed by whitespace.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            if let Some(&(next_i, next_c)) = chars.peek() {
                if next_c.is_whitespace() {
                    let sentence = text[start..next_i].trim();
                    if !sentence.is_empty() {
                        sentences.push(sentence.to_string());
                    }
                    start = next_i;
                }
            }
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// [`is_relevant_sentence_with`] using the shared lexicon.
pub fn is_relevant_sentence(sentence: &str) -> bool {
    is_relevant_sentence_with(sentence, Lexicon::shared())
}

/// A sentence is worth scoring when it is at least 25 chars and 5 words,
/// has a letter, and is not a bare URL, a navigation phrase, or a lone
/// `@handle` / `#tag`.
pub fn is_relevant_sentence_with(sentence: &str, lexicon: &Lexicon) -> bool {
    let s = sentence.trim();
    if s.chars().count() < 25 {
        return false;
    }
    if s.split_whitespace().count() < 5 {
        return false;
    }
    if !s.chars().any(char::is_alphabetic) {
        return false;
    }
    if static_regex!(r"^(?:https?://|www\.)\S+$").is_match(s) {
        return false;
    }
    if lexicon.is_nav_phrase(s) {
        return false;
    }
    if static_regex!(r"^[@#][\w.-]+$").is_match(s) {
        return false;
    }
    s.chars().any(char::is_alphanumeric)
}

/// Cleaned chunk text and its relevant sentences.
#[derive(Debug, Clone, PartialEq)]
pub struct Snippet {
    pub cleaned: String,
    pub sentences: Vec<String>,
    /// First substantive cleaned line, for chunks with no relevant
    /// sentence. Already cut to the fallback length.
    pub fallback_line: Option<String>,
}

impl Snippet {
    pub fn cleaned_char_count(&self) -> usize {
        self.cleaned.chars().count()
    }
}

pub fn extract_snippet(raw: &str, lexicon: &Lexicon, params: &PreviewParams) -> Snippet {
    let lines = clean_lines(raw, lexicon);
    let cleaned = collapse_whitespace(&lines);
    let sentences = split_sentences(&cleaned)
        .into_iter()
        .filter(|s| is_relevant_sentence_with(s, lexicon))
        .collect();
    let fallback_line = lines
        .lines()
        .map(collapse_whitespace)
        .find(|l| l.chars().count() >= 20 && l.chars().any(char::is_alphabetic))
        .map(|l| truncate_chars(&l, params.fallback_chars));

    Snippet {
        cleaned,
        sentences,
        fallback_line,
    }
}

/// +2 for each distinct query term in the sentence.
pub fn term_hits_score(sentence_lower: &str, query: &QueryTerms) -> u32 {
    query
        .terms
        .iter()
        .filter(|t| sentence_lower.contains(t.as_str()))
        .count() as u32
        * 2
}

/// +4 when the whole query appears verbatim. Only for queries of at least
/// 6 chars with at least 2 terms.
pub fn exact_phrase_bonus(sentence_lower: &str, query: &QueryTerms) -> u32 {
    if query.lower.chars().count() >= 6
        && query.terms.len() >= 2
        && sentence_lower.contains(query.lower.as_str())
    {
        4
    } else {
        0
    }
}

pub fn score_sentence(sentence: &str, query: &QueryTerms) -> u32 {
    let lower = sentence.to_lowercase();
    term_hits_score(&lower, query) + exact_phrase_bonus(&lower, query)
}

/// Preview and preview-selection knobs.
///
/// The richness caps were tuned by hand; treat them as a tuning surface.
#[derive(Debug, Clone, Copy)]
pub struct PreviewParams {
    /// Hard ceiling on the preview length in chars.
    pub max_chars: usize,
    pub min_sentences: usize,
    pub max_sentences: usize,
    /// Length of the fallback line when no sentence is relevant.
    pub fallback_chars: usize,
    /// Chunks considered per source by the preview selector.
    pub max_candidates: usize,
    /// Multiplier on summed sentence relevance.
    pub relevance_weight: f64,
    /// Sentence count cap in the richness score.
    pub richness_sentence_cap: usize,
    /// Cleaned length cap (chars) in the richness score.
    pub richness_char_cap: usize,
}

impl Default for PreviewParams {
    fn default() -> Self {
        Self {
            max_chars: 700,
            min_sentences: 3,
            max_sentences: 5,
            fallback_chars: 220,
            max_candidates: 8,
            relevance_weight: 10.0,
            richness_sentence_cap: 5,
            richness_char_cap: 500,
        }
    }
}

/// Assemble a preview from relevant sentences.
pub fn build_preview(sentences: &[String], query: &QueryTerms, params: &PreviewParams) -> String {
    if sentences.is_empty() || params.max_chars == 0 {
        return String::new();
    }

    let lens: Vec<usize> = sentences.iter().map(|s| s.chars().count()).collect();
    let scores: Vec<u32> = sentences.iter().map(|s| score_sentence(s, query)).collect();

    let mut picked: Vec<usize> = Vec::new();
    let mut total = 0usize;
    // Joined length if sentence `i` is added (one space between sentences).
    let added = |picked: &[usize], i: usize| lens[i] + usize::from(!picked.is_empty());

    let mut ranked: Vec<usize> = (0..sentences.len()).filter(|&i| scores[i] > 0).collect();

    if !ranked.is_empty() {
        ranked.sort_by(|&a, &b| scores[b].cmp(&scores[a]).then(a.cmp(&b)));
        for i in ranked {
            if picked.len() >= params.max_sentences {
                break;
            }
            let add = added(&picked, i);
            if total + add > params.max_chars {
                if picked.len() >= params.min_sentences {
                    break;
                }
                continue;
            }
            total += add;
            picked.push(i);
        }

        if picked.len() < params.min_sentences {
            let anchors = picked.clone();
            let distance = |i: usize| {
                anchors
                    .iter()
                    .map(|&a| a.abs_diff(i))
                    .min()
                    .unwrap_or(i)
            };
            let mut backfill: Vec<usize> = (0..sentences.len())
                .filter(|&i| scores[i] == 0)
                .collect();
            backfill.sort_by_key(|&i| (distance(i), i));
            for i in backfill {
                if picked.len() >= params.min_sentences {
                    break;
                }
                let add = added(&picked, i);
                if total + add > params.max_chars {
                    break;
                }
                total += add;
                picked.push(i);
            }
        }
    } else {
        for i in 0..sentences.len() {
            if picked.len() >= params.max_sentences {
                break;
            }
            let add = added(&picked, i);
            if total + add > params.max_chars {
                break;
            }
            total += add;
            picked.push(i);
        }
    }

    if picked.is_empty() {
        // Every candidate is longer than the budget on its own.
        let best = (0..sentences.len())
            .max_by(|&a, &b| scores[a].cmp(&scores[b]).then(b.cmp(&a)))
            .unwrap_or(0);
        return truncate_chars(&sentences[best], params.max_chars);
    }

    picked.sort_unstable();
    picked
        .iter()
        .map(|&i| sentences[i].as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Preview for a whole snippet, falling back to its first substantive
/// line when no sentence is relevant.
pub fn preview_for(snippet: &Snippet, query: &QueryTerms, params: &PreviewParams) -> String {
    if snippet.sentences.is_empty() {
        return snippet.fallback_line.clone().unwrap_or_default();
    }
    build_preview(&snippet.sentences, query, params)
}

/// Cut to at most `limit` chars, marking the cut with `...`.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    if limit <= 3 {
        return text.chars().take(limit).collect();
    }
    let kept: String = text.chars().take(limit - 3).collect();
    format!("{}...", kept.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex() -> &'static Lexicon {
        Lexicon::shared()
    }

    fn q(query: &str) -> QueryTerms {
        QueryTerms::new(query, lex())
    }

    fn s(text: &str) -> String {
        text.to_string()
    }

    // ── cleaning steps ──

    #[test]
    fn test_remove_boilerplate_lines() {
        let out = remove_boilerplate_lines("Intro text\n← Previous\nNext →\nMenu\nBody", lex());
        assert_eq!(out, "Intro text\nBody");
    }

    #[test]
    fn test_strip_markdown_images() {
        assert_eq!(strip_markdown_images("a ![logo](/img.png) b", lex()), "a  b");
    }

    #[test]
    fn test_strip_empty_links() {
        assert_eq!(strip_empty_links("x [](https://a.dev) [ ](#top) y", lex()), "x   y");
    }

    #[test]
    fn test_unwrap_links() {
        assert_eq!(
            unwrap_links("see [the guide](https://a.dev/guide) now", lex()),
            "see the guide now"
        );
    }

    #[test]
    fn test_remove_bare_urls() {
        assert_eq!(
            remove_bare_urls("go to https://a.dev/x?y=1 or www.b.dev today", lex()),
            "go to  or  today"
        );
    }

    #[test]
    fn test_strip_heading_markers() {
        assert_eq!(strip_heading_markers("## Setup\n### Next", lex()), "Setup\nNext");
    }

    #[test]
    fn test_remove_horizontal_rules() {
        assert_eq!(remove_horizontal_rules("a\n---\n* * *\nb", lex()), "a\n\n\nb");
    }

    #[test]
    fn test_strip_list_markers() {
        assert_eq!(
            strip_list_markers("- one\n* two\n3. three\n10) ten", lex()),
            "one\ntwo\nthree\nten"
        );
    }

    #[test]
    fn test_remove_boilerplate_phrases() {
        assert_eq!(
            remove_boilerplate_phrases("End. Was this page helpful? Table of Contents", lex()),
            "End.  "
        );
    }

    #[test]
    fn test_images_removed_before_links_unwrapped() {
        let out = clean_text("![alt text](a.png) [Docs](https://x.dev)", lex());
        assert_eq!(out, "Docs");
    }

    #[test]
    fn test_clean_text_full_pipeline() {
        let raw = "# Install\n\n- Run [the installer](https://x.dev/i).\n\n---\n\nPrevious\n\nWas this page helpful?";
        assert_eq!(clean_text(raw, lex()), "Install Run the installer.");
    }

    #[test]
    fn test_clean_text_empty() {
        assert_eq!(clean_text("", lex()), "");
    }

    // ── sentences ──

    #[test]
    fn test_split_sentences() {
        let out = split_sentences("One here. Two here! Three? Version 1.2 stays. Tail");
        assert_eq!(
            out,
            vec!["One here.", "Two here!", "Three?", "Version 1.2 stays.", "Tail"]
        );
    }

    #[test]
    fn test_is_relevant_sentence_rejects() {
        assert!(!is_relevant_sentence("prev"));
        assert!(!is_relevant_sentence("Too short"));
        assert!(!is_relevant_sentence("12345 67890"));
        assert!(!is_relevant_sentence("https://example.com/some/very/long/path/here"));
        assert!(!is_relevant_sentence("1234 5678 9012 3456 7890 1234"));
        assert!(!is_relevant_sentence("#averyveryverylonghashtagwithoutspaces"));
    }

    #[test]
    fn test_is_relevant_sentence_accepts() {
        assert!(is_relevant_sentence(
            "Subagents run focused tasks in their own context window."
        ));
    }

    // ── scoring ──

    #[test]
    fn test_score_sentence_terms() {
        let query = q("claude subagents");
        assert_eq!(score_sentence("Nothing relevant in here at all.", &query), 0);
        assert_eq!(score_sentence("Claude is mentioned once.", &query), 2);
        assert_eq!(score_sentence("Subagents and claude, apart.", &query), 4);
        assert_eq!(score_sentence("Use Claude Subagents for this.", &query), 8);
    }

    #[test]
    fn test_exact_phrase_needs_two_terms() {
        let single = q("hooks");
        assert_eq!(exact_phrase_bonus("configure hooks here", &single), 0);
        let short = q("ab cd");
        assert_eq!(exact_phrase_bonus("ab cd", &short), 0);
    }

    #[test]
    fn test_score_sentence_empty_query() {
        assert_eq!(score_sentence("Anything at all goes here.", &q("")), 0);
    }

    // ── preview assembly ──

    #[test]
    fn test_preview_orders_by_document_position() {
        let sentences = vec![
            s("Alpha sentence about nothing in particular here."),
            s("Bravo sentence talking about deploy pipelines today."),
            s("Charlie sentence about something unrelated here."),
            s("Delta sentence says deploy again for the pipelines."),
        ];
        let preview = build_preview(&sentences, &q("deploy pipelines"), &PreviewParams::default());
        // Both scored sentences plus one backfilled neighbour, in order.
        assert_eq!(
            preview,
            "Alpha sentence about nothing in particular here. \
             Bravo sentence talking about deploy pipelines today. \
             Delta sentence says deploy again for the pipelines."
        );
    }

    #[test]
    fn test_preview_unscored_takes_leading_sentences() {
        let sentences: Vec<String> = (0..8)
            .map(|i| format!("Sentence number {} has enough words in it.", i))
            .collect();
        let preview = build_preview(&sentences, &q("zebra"), &PreviewParams::default());
        assert!(preview.starts_with("Sentence number 0"));
        assert!(preview.ends_with("Sentence number 4 has enough words in it."));
    }

    #[test]
    fn test_preview_caps_at_five() {
        let sentences: Vec<String> = (0..9)
            .map(|i| format!("Deploy note {} for the release train.", i))
            .collect();
        let preview = build_preview(&sentences, &q("deploy"), &PreviewParams::default());
        assert_eq!(split_sentences(&preview).len(), 5);
    }

    #[test]
    fn test_preview_never_exceeds_budget() {
        let long = "word ".repeat(100);
        let sentences: Vec<String> = (0..6)
            .map(|i| format!("Deploy {} {}.", i, long.trim()))
            .collect();
        let params = PreviewParams::default();
        let preview = build_preview(&sentences, &q("deploy"), &params);
        assert!(preview.chars().count() <= params.max_chars);
        assert!(!preview.is_empty());
    }

    #[test]
    fn test_preview_single_oversized_sentence_truncated() {
        let sentences = vec![format!("Deploy {}.", "x".repeat(900))];
        let params = PreviewParams::default();
        let preview = build_preview(&sentences, &q("deploy"), &params);
        assert_eq!(preview.chars().count(), params.max_chars);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn test_preview_fallback_line() {
        let snippet = extract_snippet(
            "Menu\nWidgetFactory::configure_all_options\nNext",
            lex(),
            &PreviewParams::default(),
        );
        assert!(snippet.sentences.is_empty());
        assert_eq!(
            preview_for(&snippet, &q("widgets"), &PreviewParams::default()),
            "WidgetFactory::configure_all_options"
        );
    }

    #[test]
    fn test_fallback_line_truncated() {
        let raw = format!("Heading {}", "word".repeat(100));
        let snippet = extract_snippet(&raw, lex(), &PreviewParams::default());
        let line = snippet.fallback_line.unwrap();
        assert_eq!(line.chars().count(), 220);
        assert!(line.ends_with("..."));
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("héllo wörld", 20), "héllo wörld");
        assert_eq!(truncate_chars("héllo wörld", 8), "héllo...");
    }
}
