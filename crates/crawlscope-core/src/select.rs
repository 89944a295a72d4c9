//! Source-level selection: top-N deduplication for search, and
//! per-source-capped diversity selection for question answering.
//!
//! Both operate on canonical URLs, so `https://a.dev/x/` and
//! `https://a.dev/x#intro` count as the same source.

use std::collections::{HashMap, HashSet};

use crate::canonical::canonicalize_with;
use crate::lexicon::Lexicon;
use crate::models::ScoredMatch;

/// Every chunk of the first `limit` distinct canonical URLs, in ranked
/// order.
pub fn dedupe_top_urls(matches: &[ScoredMatch], limit: usize) -> Vec<ScoredMatch> {
    dedupe_top_urls_with(matches, limit, Lexicon::shared())
}

pub fn dedupe_top_urls_with(
    matches: &[ScoredMatch],
    limit: usize,
    lexicon: &Lexicon,
) -> Vec<ScoredMatch> {
    let mut kept_urls: HashSet<String> = HashSet::new();
    let mut out = Vec::new();

    for m in matches {
        let key = canonicalize_with(&m.url, lexicon);
        if kept_urls.contains(&key) {
            out.push(m.clone());
        } else if kept_urls.len() < limit {
            kept_urls.insert(key);
            out.push(m.clone());
        }
    }

    out
}

/// Spread `target` picks across sources, at most `max_per_url` per source
/// until the third pass.
///
/// 1. First chunk of each source not seen yet.
/// 2. Further chunks while a source is under `max_per_url`.
/// 3. Anything left, in pool order.
///
/// Output is in selection order. A pool no larger than `target` comes back
/// unchanged.
pub fn select_diverse(pool: &[ScoredMatch], target: usize, max_per_url: usize) -> Vec<ScoredMatch> {
    select_diverse_with(pool, target, max_per_url, Lexicon::shared())
}

pub fn select_diverse_with(
    pool: &[ScoredMatch],
    target: usize,
    max_per_url: usize,
    lexicon: &Lexicon,
) -> Vec<ScoredMatch> {
    if pool.len() <= target {
        return pool.to_vec();
    }

    let keys: Vec<String> = pool
        .iter()
        .map(|m| canonicalize_with(&m.url, lexicon))
        .collect();

    let mut picks = Picks::new(target);

    // Pass 1: one chunk per unseen source.
    for (i, m) in pool.iter().enumerate() {
        if picks.is_full() {
            break;
        }
        if picks.count_for(&keys[i]) == 0 {
            picks.take(i, m, &keys[i]);
        }
    }

    // Pass 2: fill up to the per-source cap.
    for (i, m) in pool.iter().enumerate() {
        if picks.is_full() {
            break;
        }
        if !picks.has_taken(i, m) && picks.count_for(&keys[i]) < max_per_url {
            picks.take(i, m, &keys[i]);
        }
    }

    // Pass 3: anything left.
    for (i, m) in pool.iter().enumerate() {
        if picks.is_full() {
            break;
        }
        if !picks.has_taken(i, m) {
            picks.take(i, m, &keys[i]);
        }
    }

    picks.out
}

/// Selection state shared by the three passes.
struct Picks<'a> {
    target: usize,
    seen: HashSet<(usize, &'a str)>,
    per_url: HashMap<&'a str, usize>,
    out: Vec<ScoredMatch>,
}

impl<'a> Picks<'a> {
    fn new(target: usize) -> Self {
        Self {
            target,
            seen: HashSet::new(),
            per_url: HashMap::new(),
            out: Vec::with_capacity(target),
        }
    }

    fn is_full(&self) -> bool {
        self.out.len() >= self.target
    }

    fn count_for(&self, key: &str) -> usize {
        self.per_url.get(key).copied().unwrap_or(0)
    }

    fn has_taken(&self, index: usize, item: &ScoredMatch) -> bool {
        self.seen.contains(&(index, item.url.as_str()))
    }

    fn take(&mut self, index: usize, item: &'a ScoredMatch, key: &'a str) {
        if self.seen.insert((index, item.url.as_str())) {
            *self.per_url.entry(key).or_insert(0) += 1;
            self.out.push(item.clone());
        }
    }
}
