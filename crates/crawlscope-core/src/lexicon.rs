//! Word lists and URL path patterns used by the heuristics.
//!
//! A [`Lexicon`] is an immutable bundle of everything the scorer, cleaner,
//! and canonicalizer match against. Call sites take it by reference, so
//! tests can build an alternate lexicon instead of patching globals:
//!
//! ```rust
//! use crawlscope_core::lexicon::Lexicon;
//!
//! let mut lexicon = Lexicon::default();
//! lexicon.stop_words.insert("widget".to_string());
//! assert!(lexicon.is_stop_word("widget"));
//! ```
//!
//! [`Lexicon::shared`] returns a process-wide default instance so the regex
//! set is compiled once.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

const STOP_WORDS: &[&str] = &[
    "about", "after", "all", "also", "and", "any", "are", "been", "before", "but", "can",
    "could", "did", "does", "doing", "done", "for", "from", "get", "give", "had", "has",
    "have", "her", "him", "his", "how", "into", "its", "just", "let", "like", "may", "more",
    "most", "not", "now", "off", "one", "only", "other", "our", "out", "over", "please",
    "she", "should", "show", "some", "such", "tell", "than", "that", "the", "their",
    "them", "then", "there", "these", "they", "this", "those", "too", "use", "using", "very",
    "was", "way", "were", "what", "when", "where", "which", "while", "who", "why", "will",
    "with", "would", "you", "your",
    // Time words carry the temporal scope, not topical relevance.
    "today", "tonight", "yesterday", "week", "month",
];

const NAV_PHRASES: &[&str] = &[
    "prev", "previous", "next", "menu", "home", "search", "close", "copy", "share", "print",
    "navigation", "breadcrumb", "theme", "light", "dark", "system", "feedback",
    "skip to content", "skip to main content", "on this page", "back to top",
    "edit this page", "edit on github", "copy page", "copy link", "toggle navigation",
    "toggle menu", "open menu", "close menu", "sign in", "sign up", "log in", "login",
    "previous page", "next page", "table of contents", "was this page helpful",
    "was this helpful", "ask ai",
];

const BOILERPLATE_PHRASES: &[&str] = &[
    "was this page helpful?",
    "was this helpful?",
    "table of contents",
    "skip to main content",
    "skip to content",
    "edit this page on github",
    "edit this page",
    "back to top",
];

const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "dclid", "gbraid", "wbraid", "msclkid", "yclid", "twclid", "igshid",
    "mc_cid", "mc_eid", "_ga", "_gl", "_hsenc", "_hsmi", "ref_src", "li_fat_id", "srsltid",
];

const TRACKING_PARAM_PREFIXES: &[&str] = &["utm_"];

/// Stop words, phrase lists, and path patterns.
#[derive(Debug, Clone)]
pub struct Lexicon {
    /// Lowercase words dropped from query terms.
    pub stop_words: HashSet<String>,
    /// Lowercase navigation phrases; a line or sentence equal to one of
    /// these (ignoring surrounding punctuation) is boilerplate.
    pub nav_phrases: HashSet<String>,
    /// Phrases removed wherever they appear (case-insensitive).
    pub boilerplate_phrases: Regex,
    /// Exact query parameter names dropped during canonicalization.
    pub tracking_params: HashSet<String>,
    /// Query parameter name prefixes dropped during canonicalization.
    pub tracking_param_prefixes: Vec<String>,
    /// URL paths that look like documentation.
    pub docs_path: Regex,
    /// Hosts that serve documentation (`docs.`, `developer.`, ...).
    pub docs_host: Regex,
    /// Redirect and marketing paths (pricing, careers, blog, ...).
    pub low_value_path: Regex,
    /// An English locale path segment (`en`, `en-us`).
    pub english_locale_path: Regex,
    /// A non-English locale code, matched against a single path segment.
    pub foreign_locale_segment: Regex,
    /// Session, log, and journal style paths.
    pub session_log_path: Regex,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self {
            stop_words: to_set(STOP_WORDS),
            nav_phrases: to_set(NAV_PHRASES),
            boilerplate_phrases: phrase_regex(BOILERPLATE_PHRASES),
            tracking_params: to_set(TRACKING_PARAMS),
            tracking_param_prefixes: TRACKING_PARAM_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
            docs_path: compile(
                r"(?i)(^|/)(docs?|documentation|guides?|reference|api|manual|tutorials?|learn|handbook|kb|help|getting-started|quickstart)(/|$)",
            ),
            docs_host: compile(r"(?i)^(docs|developers?|help|learn|support)\."),
            low_value_path: compile(
                r"(?i)(^|/)(pricing|plans|careers|jobs|blog|news|press|about|about-us|company|contact|contact-us|customers|case-studies|events|webinars|partners|legal|privacy|terms|login|signin|sign-in|signup|sign-up|register|redirect|go|out|r)(/|$)",
            ),
            english_locale_path: compile(r"(?i)(^|/)en([-_][a-z]{2})?(/|$)"),
            foreign_locale_segment: compile(
                r"(?i)^(ar|bg|cs|da|de|el|es|et|fa|fi|fr|he|hi|hu|id|it|ja|ko|lt|lv|nb|nl|no|pl|pt|ro|ru|sk|sl|sr|sv|th|tr|uk|vi|zh)([-_][a-z]{2,4})?$",
            ),
            session_log_path: compile(
                r"(?i)(^|[/_.-])(sessions?|logs?|journal|daily|diary|standups?|transcripts?|changelog|history)([/_.-]|$)",
            ),
        }
    }
}

impl Lexicon {
    /// Process-wide default lexicon.
    pub fn shared() -> &'static Lexicon {
        static SHARED: OnceLock<Lexicon> = OnceLock::new();
        SHARED.get_or_init(Lexicon::default)
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    /// True when `text` is exactly a navigation phrase once lowercased,
    /// trimmed of surrounding punctuation/arrows, and whitespace-collapsed.
    pub fn is_nav_phrase(&self, text: &str) -> bool {
        let normalized = normalize_phrase(text);
        !normalized.is_empty() && self.nav_phrases.contains(&normalized)
    }

    /// True when a query parameter name is on the tracking denylist.
    pub fn is_tracking_param(&self, name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        self.tracking_params.contains(&lower)
            || self
                .tracking_param_prefixes
                .iter()
                .any(|p| lower.starts_with(p.as_str()))
    }
}

fn normalize_phrase(text: &str) -> String {
    text.trim()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn to_set(words: &[&str]) -> HashSet<String> {
    words.iter().map(|w| w.to_string()).collect()
}

/// Build a case-insensitive alternation, longest phrase first so that
/// "edit this page on github" wins over "edit this page".
fn phrase_regex(phrases: &[&str]) -> Regex {
    let mut sorted: Vec<&str> = phrases.to_vec();
    sorted.sort_by_key(|p| std::cmp::Reverse(p.len()));
    let alternation = sorted
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join("|");
    compile(&format!("(?i){}", alternation))
}

pub(crate) fn compile(pattern: &str) -> Regex {
    // Patterns are compile-time constants covered by the tests below.
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {pattern}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_patterns_compile() {
        let lex = Lexicon::default();
        assert!(lex.docs_path.is_match("/docs/intro"));
        assert!(lex.docs_host.is_match("docs.example.com"));
        assert!(lex.low_value_path.is_match("/pricing"));
        assert!(lex.english_locale_path.is_match("/en-us/docs/intro"));
        assert!(lex.foreign_locale_segment.is_match("pt-br"));
        assert!(lex.session_log_path.is_match("/notes/sessions/2026-10-18.md"));
    }

    #[test]
    fn test_nav_phrase_ignores_arrows_and_case() {
        let lex = Lexicon::shared();
        assert!(lex.is_nav_phrase("← Previous"));
        assert!(lex.is_nav_phrase("Next →"));
        assert!(lex.is_nav_phrase("  Skip   to content "));
        assert!(!lex.is_nav_phrase("Next steps for deploying the service"));
        assert!(!lex.is_nav_phrase("---"));
    }

    #[test]
    fn test_tracking_params() {
        let lex = Lexicon::shared();
        assert!(lex.is_tracking_param("utm_source"));
        assert!(lex.is_tracking_param("UTM_Campaign"));
        assert!(lex.is_tracking_param("fbclid"));
        assert!(!lex.is_tracking_param("x"));
        assert!(!lex.is_tracking_param("page"));
    }

    #[test]
    fn test_low_value_path_segment_boundaries() {
        let lex = Lexicon::shared();
        assert!(lex.low_value_path.is_match("/blog/2024/launch"));
        assert!(!lex.low_value_path.is_match("/docs/blogging-platform"));
        assert!(!lex.low_value_path.is_match("/docs/routing"));
    }

    #[test]
    fn test_substituted_stop_words() {
        let mut lex = Lexicon::default();
        lex.stop_words.clear();
        assert!(!lex.is_stop_word("the"));
        assert!(Lexicon::shared().is_stop_word("the"));
    }
}
