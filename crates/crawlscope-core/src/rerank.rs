//! Query tokenization and lexical score adjustments.
//!
//! The vector score decides most of the ranking. The functions here add
//! small, capped adjustments on top of it so that a candidate whose URL,
//! title, or heading actually names the query terms can overtake a
//! near-tie, and so that localized or marketing pages sink.
//!
//! Every heuristic is its own pure function; [`lexical_adjustment`] sums
//! them and [`rerank`] sorts by `score + adjustment`.
//!
//! | Heuristic | Range (default weights) |
//! |-----------|-------------------------|
//! | [`term_location_bonus`] | `0.0 ..= 0.12` |
//! | [`docs_path_bonus`] | `0.0` or `+0.03` |
//! | [`low_value_path_penalty`] | `0.0` or `-0.05` |
//! | [`locale_adjustment`] | `+0.02`, `0.0`, or `-0.06` |
//! | [`temporal_path_bonus`] | `0.0 ..= 0.11` |

use serde::Serialize;
use url::Url;

use crate::lexicon::Lexicon;
use crate::models::ScoredMatch;
use crate::temporal::TemporalScope;

/// Tunable weights for the lexical heuristics.
#[derive(Debug, Clone, Copy)]
pub struct RerankWeights {
    pub path_term: f64,
    pub title_term: f64,
    pub header_term: f64,
    pub body_term: f64,
    /// Ceiling for the summed per-term location bonus.
    pub term_cap: f64,
    pub docs_bonus: f64,
    pub low_value_penalty: f64,
    pub english_docs_bonus: f64,
    pub foreign_locale_penalty: f64,
    pub scope_date_bonus: f64,
    pub session_log_bonus: f64,
}

impl Default for RerankWeights {
    fn default() -> Self {
        Self {
            path_term: 0.03,
            title_term: 0.025,
            header_term: 0.02,
            body_term: 0.01,
            term_cap: 0.12,
            docs_bonus: 0.03,
            low_value_penalty: 0.05,
            english_docs_bonus: 0.02,
            foreign_locale_penalty: 0.06,
            scope_date_bonus: 0.08,
            session_log_bonus: 0.03,
        }
    }
}

/// A query split into scoring terms plus its normalized full form.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTerms {
    /// Distinct lowercase terms, in query order.
    pub terms: Vec<String>,
    /// The whole query, lowercased and whitespace-collapsed.
    pub lower: String,
}

impl QueryTerms {
    pub fn new(query: &str, lexicon: &Lexicon) -> Self {
        Self {
            terms: tokenize_query(query, lexicon),
            lower: query
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Split a query into lowercase alphanumeric tokens of at least three
/// characters, dropping stop words and duplicates.
pub fn tokenize_query(query: &str, lexicon: &Lexicon) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for raw in query.split(|c: char| !c.is_alphanumeric()) {
        if raw.chars().count() < 3 {
            continue;
        }
        let token = raw.to_lowercase();
        if lexicon.is_stop_word(&token) || terms.contains(&token) {
            continue;
        }
        terms.push(token);
    }
    terms
}

/// Lowercased host and path of a candidate URL.
#[derive(Debug, Clone, Default)]
pub struct UrlParts {
    pub host: String,
    pub path: String,
}

impl UrlParts {
    pub fn parse(raw: &str) -> Self {
        match Url::parse(raw.trim()) {
            Ok(url) => Self {
                host: url.host_str().unwrap_or_default().to_lowercase(),
                path: url.path().to_lowercase(),
            },
            Err(_) => Self {
                host: String::new(),
                path: raw.trim().to_lowercase(),
            },
        }
    }
}

/// Location-weighted bonus for query terms found in the URL path, title,
/// section header, and body. Each location counts once per term; the sum
/// is capped at `weights.term_cap`.
pub fn term_location_bonus(
    terms: &[String],
    path: &str,
    title: &str,
    header: &str,
    body: &str,
    weights: &RerankWeights,
) -> f64 {
    if terms.is_empty() {
        return 0.0;
    }
    let title = title.to_lowercase();
    let header = header.to_lowercase();
    let body = body.to_lowercase();

    let mut bonus = 0.0;
    for term in terms {
        let t = term.as_str();
        if path.contains(t) {
            bonus += weights.path_term;
        }
        if title.contains(t) {
            bonus += weights.title_term;
        }
        if header.contains(t) {
            bonus += weights.header_term;
        }
        if body.contains(t) {
            bonus += weights.body_term;
        }
    }
    bonus.min(weights.term_cap)
}

/// True for documentation-looking URLs (docs path or docs host).
pub fn is_docs_like(parts: &UrlParts, lexicon: &Lexicon) -> bool {
    lexicon.docs_path.is_match(&parts.path) || lexicon.docs_host.is_match(&parts.host)
}

pub fn docs_path_bonus(parts: &UrlParts, lexicon: &Lexicon, weights: &RerankWeights) -> f64 {
    if is_docs_like(parts, lexicon) {
        weights.docs_bonus
    } else {
        0.0
    }
}

/// Penalty for redirect and non-instructional marketing paths.
pub fn low_value_path_penalty(
    parts: &UrlParts,
    lexicon: &Lexicon,
    weights: &RerankWeights,
) -> f64 {
    if lexicon.low_value_path.is_match(&parts.path) {
        -weights.low_value_penalty
    } else {
        0.0
    }
}

/// Bonus for English-localized docs, larger penalty for other locales.
///
/// Only documentation URLs are considered; locale codes are matched
/// against the first three path segments.
pub fn locale_adjustment(parts: &UrlParts, lexicon: &Lexicon, weights: &RerankWeights) -> f64 {
    if !is_docs_like(parts, lexicon) {
        return 0.0;
    }
    let foreign = parts
        .path
        .split('/')
        .filter(|s| !s.is_empty())
        .take(3)
        .any(|segment| lexicon.foreign_locale_segment.is_match(segment));
    if foreign {
        return -weights.foreign_locale_penalty;
    }
    if lexicon.english_locale_path.is_match(&parts.path) {
        return weights.english_docs_bonus;
    }
    0.0
}

/// Bonus for sources whose path encodes the scope's date, plus a smaller
/// one for session/log style paths. Zero without a scope.
pub fn temporal_path_bonus(
    source_path: &str,
    scope: Option<&TemporalScope>,
    lexicon: &Lexicon,
    weights: &RerankWeights,
) -> f64 {
    let Some(scope) = scope else {
        return 0.0;
    };
    let path = source_path.to_lowercase();
    let mut bonus = 0.0;

    if let Some(ymd) = scope.primary_date_ymd.as_deref() {
        if date_variants(ymd).iter().any(|v| path.contains(v.as_str())) {
            bonus += weights.scope_date_bonus;
        }
    }
    if lexicon.session_log_path.is_match(&path) {
        bonus += weights.session_log_bonus;
    }
    bonus
}

/// `2026-10-18` → `["2026-10-18", "2026/10/18", "2026_10_18", "20261018"]`.
fn date_variants(ymd: &str) -> Vec<String> {
    let parts: Vec<&str> = ymd.split('-').collect();
    if parts.len() != 3 {
        return vec![ymd.to_string()];
    }
    vec![
        ymd.to_string(),
        parts.join("/"),
        parts.join("_"),
        parts.concat(),
    ]
}

/// Sum of all lexical adjustments for one candidate.
pub fn lexical_adjustment(
    query: &QueryTerms,
    m: &ScoredMatch,
    scope: Option<&TemporalScope>,
    lexicon: &Lexicon,
    weights: &RerankWeights,
) -> f64 {
    let parts = UrlParts::parse(&m.url);
    let source_path = m.source_path_rel.as_deref().unwrap_or(&parts.path);

    term_location_bonus(
        &query.terms,
        &parts.path,
        &m.title,
        m.section_header.as_deref().unwrap_or_default(),
        &m.chunk_text,
        weights,
    ) + docs_path_bonus(&parts, lexicon, weights)
        + low_value_path_penalty(&parts, lexicon, weights)
        + locale_adjustment(&parts, lexicon, weights)
        + temporal_path_bonus(source_path, scope, lexicon, weights)
}

/// A match with its lexical adjustment.
#[derive(Debug, Clone, Serialize)]
pub struct RankedMatch {
    #[serde(flatten)]
    pub item: ScoredMatch,
    pub adjustment: f64,
}

impl RankedMatch {
    pub fn rank_score(&self) -> f64 {
        self.item.score + self.adjustment
    }
}

/// Rerank by `score + lexical_adjustment`, descending. The sort is stable,
/// so equal keys keep their input order.
pub fn rerank(
    matches: Vec<ScoredMatch>,
    query: &str,
    scope: Option<&TemporalScope>,
    lexicon: &Lexicon,
    weights: &RerankWeights,
) -> Vec<RankedMatch> {
    let terms = QueryTerms::new(query, lexicon);
    let mut ranked: Vec<RankedMatch> = matches
        .into_iter()
        .map(|m| {
            let adjustment = lexical_adjustment(&terms, &m, scope, lexicon, weights);
            RankedMatch {
                item: m,
                adjustment,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.rank_score()
            .partial_cmp(&a.rank_score())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}

/// [`rerank`] with the shared lexicon and default weights, dropping the
/// adjustments.
pub fn rerank_matches(
    matches: Vec<ScoredMatch>,
    query: &str,
    scope: Option<&TemporalScope>,
) -> Vec<ScoredMatch> {
    rerank(
        matches,
        query,
        scope,
        Lexicon::shared(),
        &RerankWeights::default(),
    )
    .into_iter()
    .map(|r| r.item)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::make_match;
    use crate::temporal::ScopeKind;

    fn lex() -> &'static Lexicon {
        Lexicon::shared()
    }

    #[test]
    fn test_tokenize_filters_and_dedupes() {
        let terms = tokenize_query("How do I use the Claude API? claude, API!", lex());
        assert_eq!(terms, vec!["claude", "api"]);
    }

    #[test]
    fn test_tokenize_empty_and_short() {
        assert!(tokenize_query("", lex()).is_empty());
        assert!(tokenize_query("a b c de", lex()).is_empty());
    }

    #[test]
    fn test_query_terms_lower_collapses_whitespace() {
        let q = QueryTerms::new("  Claude   Subagents ", lex());
        assert_eq!(q.lower, "claude subagents");
        assert_eq!(q.terms, vec!["claude", "subagents"]);
    }

    #[test]
    fn test_term_location_weights_ordered() {
        let w = RerankWeights::default();
        let terms = vec!["hooks".to_string()];
        let path = term_location_bonus(&terms, "/docs/hooks", "", "", "", &w);
        let title = term_location_bonus(&terms, "", "Hooks", "", "", &w);
        let header = term_location_bonus(&terms, "", "", "Hooks", "", &w);
        let body = term_location_bonus(&terms, "", "", "", "about hooks", &w);
        assert!(path > title && title > header && header > body && body > 0.0);
    }

    #[test]
    fn test_term_location_capped() {
        let w = RerankWeights::default();
        let terms: Vec<String> = ["alpha", "beta", "gamma", "delta"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let text = "alpha beta gamma delta";
        let bonus = term_location_bonus(&terms, "/alpha/beta/gamma/delta", text, text, text, &w);
        assert!((bonus - w.term_cap).abs() < 1e-12);
    }

    #[test]
    fn test_term_location_empty_terms() {
        let w = RerankWeights::default();
        assert_eq!(term_location_bonus(&[], "/x", "x", "x", "x", &w), 0.0);
    }

    #[test]
    fn test_docs_and_low_value_paths() {
        let w = RerankWeights::default();
        let docs = UrlParts::parse("https://example.com/docs/setup");
        let docs_host = UrlParts::parse("https://docs.example.com/setup");
        let pricing = UrlParts::parse("https://example.com/pricing");
        assert_eq!(docs_path_bonus(&docs, lex(), &w), w.docs_bonus);
        assert_eq!(docs_path_bonus(&docs_host, lex(), &w), w.docs_bonus);
        assert_eq!(docs_path_bonus(&pricing, lex(), &w), 0.0);
        assert_eq!(low_value_path_penalty(&pricing, lex(), &w), -w.low_value_penalty);
        assert_eq!(low_value_path_penalty(&docs, lex(), &w), 0.0);
    }

    #[test]
    fn test_locale_adjustment() {
        let w = RerankWeights::default();
        let en = UrlParts::parse("https://example.com/en/docs/setup");
        let de = UrlParts::parse("https://example.com/de/docs/setup");
        let pt_br = UrlParts::parse("https://docs.example.com/pt-br/setup");
        let plain = UrlParts::parse("https://example.com/docs/setup");
        let marketing_de = UrlParts::parse("https://example.com/de/pricing");
        assert_eq!(locale_adjustment(&en, lex(), &w), w.english_docs_bonus);
        assert_eq!(locale_adjustment(&de, lex(), &w), -w.foreign_locale_penalty);
        assert_eq!(locale_adjustment(&pt_br, lex(), &w), -w.foreign_locale_penalty);
        assert_eq!(locale_adjustment(&plain, lex(), &w), 0.0);
        assert_eq!(locale_adjustment(&marketing_de, lex(), &w), 0.0);
        assert!(w.foreign_locale_penalty > w.english_docs_bonus);
    }

    #[test]
    fn test_temporal_path_bonus() {
        let w = RerankWeights::default();
        let scope = TemporalScope {
            kind: ScopeKind::Today,
            label: "today".to_string(),
            start_ms: 0,
            end_ms: 1,
            strict: true,
            primary_date_ymd: Some("2026-10-18".to_string()),
        };
        let slashed = temporal_path_bonus("notes/2026/10/18.md", Some(&scope), lex(), &w);
        assert!((slashed - w.scope_date_bonus).abs() < 1e-12);
        let other_day = temporal_path_bonus("notes/2026-10-17.md", Some(&scope), lex(), &w);
        assert_eq!(other_day, 0.0);
        let dated = temporal_path_bonus("notes/2026-10-18.md", Some(&scope), lex(), &w);
        assert!((dated - w.scope_date_bonus).abs() < 1e-12);
        let compact = temporal_path_bonus("notes/20261018-standup.md", Some(&scope), lex(), &w);
        assert!((compact - (w.scope_date_bonus + w.session_log_bonus)).abs() < 1e-12);
        let session = temporal_path_bonus("logs/session-a.md", Some(&scope), lex(), &w);
        assert!((session - w.session_log_bonus).abs() < 1e-12);
        assert!(w.session_log_bonus < w.scope_date_bonus);
        assert_eq!(temporal_path_bonus("notes/2026-10-18.md", None, lex(), &w), 0.0);
    }

    #[test]
    fn test_rerank_promotes_exact_topic() {
        let mut general = make_match(
            "https://example.com/docs/overview",
            0.81,
            "This page covers general configuration of the product.",
        );
        general.title = "General docs".to_string();
        let mut guide = make_match(
            "https://example.com/docs/agents/guide",
            0.79,
            "Claude subagents let you delegate focused tasks to specialized helpers.",
        );
        guide.title = "Claude subagents guide".to_string();

        let ranked = rerank_matches(vec![general, guide], "claude subagents", None);
        assert_eq!(ranked[0].title, "Claude subagents guide");
        assert_eq!(ranked[1].title, "General docs");
    }

    #[test]
    fn test_rerank_stable_on_ties() {
        let a = make_match("https://example.com/a", 0.5, "first");
        let b = make_match("https://example.com/b", 0.5, "second");
        let ranked = rerank_matches(vec![a, b], "zzz", None);
        assert_eq!(ranked[0].chunk_text, "first");
        assert_eq!(ranked[1].chunk_text, "second");
    }

    #[test]
    fn test_rerank_demotes_localized_docs() {
        let en = make_match("https://example.com/docs/install", 0.70, "install steps");
        let ja = make_match("https://example.com/ja/docs/install", 0.74, "install steps");
        let ranked = rerank_matches(vec![ja, en], "install", None);
        assert_eq!(ranked[0].url, "https://example.com/docs/install");
    }
}
