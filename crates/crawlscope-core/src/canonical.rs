//! URL canonicalization and grouping by canonical URL.
//!
//! Two chunks belong to the same source when their URLs canonicalize to
//! the same key. The key drops the fragment, tracking query parameters,
//! a default port, repeated path slashes, and one trailing slash.
//!
//! # Example
//!
//! ```rust
//! use crawlscope_core::canonical::canonicalize;
//!
//! assert_eq!(
//!     canonicalize("https://example.com:443/docs///?utm_source=test&x=1&fbclid=abc#intro"),
//!     "https://example.com/docs?x=1"
//! );
//! ```

use std::collections::HashMap;
use url::Url;

use crate::lexicon::Lexicon;
use crate::models::ScoredMatch;

/// Canonicalize with the shared default [`Lexicon`].
pub fn canonicalize(raw: &str) -> String {
    canonicalize_with(raw, Lexicon::shared())
}

/// Canonicalize a URL into a stable grouping key.
///
/// Idempotent for every input. Never fails: strings that do not parse as
/// absolute URLs are cleaned with plain string operations instead.
pub fn canonicalize_with(raw: &str, lexicon: &Lexicon) -> String {
    let trimmed = raw.trim();
    let mut url = match Url::parse(trimmed) {
        Ok(u) => u,
        Err(_) => return fallback_clean(trimmed),
    };

    url.set_fragment(None);

    if let Some(query) = url.query() {
        let kept = strip_tracking_params(query, lexicon);
        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&kept));
        }
    }

    if url.cannot_be_a_base() {
        return url.to_string();
    }

    if url.port().is_some() && url.port() == default_port(url.scheme()) {
        // Url::parse already elides known default ports; this only matters
        // for schemes the url crate does not know.
        let _ = url.set_port(None);
    }

    let path = normalize_path(url.path());
    url.set_path(&path);

    url.to_string()
}

/// Keep the raw `name=value` segments whose name is not a tracking
/// parameter, preserving their original encoding.
fn strip_tracking_params(query: &str, lexicon: &Lexicon) -> String {
    query
        .split('&')
        .filter(|segment| !segment.is_empty())
        .filter(|segment| {
            let name = segment.split('=').next().unwrap_or_default();
            !lexicon.is_tracking_param(name)
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn normalize_path(path: &str) -> String {
    let mut collapsed = String::with_capacity(path.len());
    let mut prev_slash = false;
    for c in path.chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        collapsed.push(c);
    }

    if collapsed.len() > 1 && collapsed.ends_with('/') {
        collapsed.pop();
    }
    if collapsed.is_empty() {
        collapsed.push('/');
    }
    collapsed
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" | "ws" => Some(80),
        "https" | "wss" => Some(443),
        "ftp" => Some(21),
        _ => None,
    }
}

/// String-only cleanup for input that is not a parseable URL.
fn fallback_clean(raw: &str) -> String {
    let without_fragment = raw.split('#').next().unwrap_or_default();
    without_fragment.trim_end_matches('/').to_string()
}

/// Chunks that share one canonical URL, in ranked order.
#[derive(Debug, Clone)]
pub struct CanonicalGroup<'a> {
    pub key: String,
    pub matches: Vec<&'a ScoredMatch>,
}

impl CanonicalGroup<'_> {
    /// The group's top-ranked match.
    pub fn first(&self) -> Option<&ScoredMatch> {
        self.matches.first().copied()
    }

    /// Highest vector score in the group.
    pub fn best_score(&self) -> f64 {
        self.matches
            .iter()
            .map(|m| m.score)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Partition matches by canonical URL in a single pass.
///
/// Groups come out in order of first appearance; each group keeps its
/// members' input order.
pub fn group_by_canonical<'a>(matches: &'a [ScoredMatch]) -> Vec<CanonicalGroup<'a>> {
    group_by_canonical_with(matches, Lexicon::shared())
}

pub fn group_by_canonical_with<'a>(
    matches: &'a [ScoredMatch],
    lexicon: &Lexicon,
) -> Vec<CanonicalGroup<'a>> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<CanonicalGroup<'a>> = Vec::new();

    for m in matches {
        let key = canonicalize_with(&m.url, lexicon);
        match index.get(&key) {
            Some(&slot) => groups[slot].matches.push(m),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(CanonicalGroup {
                    key,
                    matches: vec![m],
                });
            }
        }
    }

    groups
}
