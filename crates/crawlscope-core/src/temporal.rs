//! Natural-language time scopes ("today", "this week", ...).
//!
//! A question such as "what did I change yesterday?" should only be
//! answered from content whose timestamp falls on that day. This module
//! detects the phrase, turns it into a half-open millisecond window in the
//! caller's time zone, and filters candidates against it.
//!
//! # Detection order
//!
//! The first phrase found wins:
//!
//! | Phrase | Window | Strict |
//! |--------|--------|--------|
//! | `yesterday` | previous local calendar day | yes |
//! | `today`, `tonight` | current local calendar day | yes |
//! | `this week` | Monday-start local week | no |
//! | `this month` | local calendar month | no |
//!
//! Strict scopes fail when nothing matches. Non-strict scopes fall back to
//! the unfiltered pool and report that they did.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;

use crate::models::{FailureKind, PipelineFailure, ScoredMatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Yesterday,
    Today,
    ThisWeek,
    ThisMonth,
}

/// A detected time window, `[start_ms, end_ms)` in Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemporalScope {
    pub kind: ScopeKind,
    /// The phrase as it should be shown to the user ("today", "this week").
    pub label: String,
    pub start_ms: i64,
    pub end_ms: i64,
    pub strict: bool,
    /// `YYYY-MM-DD` of the scoped day, for single-day scopes.
    pub primary_date_ymd: Option<String>,
}

impl TemporalScope {
    pub fn contains_ms(&self, ts_ms: i64) -> bool {
        ts_ms >= self.start_ms && ts_ms < self.end_ms
    }

    /// `"today (2026-10-18 00:00 → 2026-10-19 00:00)"`, rendered in `tz`.
    pub fn describe<Tz: TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        let fmt = |ms: i64| {
            DateTime::from_timestamp_millis(ms)
                .map(|dt| dt.with_timezone(tz).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| ms.to_string())
        };
        format!(
            "{} ({} → {})",
            self.label,
            fmt(self.start_ms),
            fmt(self.end_ms)
        )
    }
}

/// Detect a time scope in `query`, relative to `now` in `now`'s time zone.
pub fn detect_temporal_scope<Tz: TimeZone>(query: &str, now: &DateTime<Tz>) -> Option<TemporalScope> {
    let normalized = query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let tz = now.timezone();
    let today = now.date_naive();

    if contains_phrase(&normalized, "yesterday") {
        let day = today.pred_opt()?;
        return day_scope(&tz, day, ScopeKind::Yesterday, "yesterday");
    }
    for word in ["today", "tonight"] {
        if contains_phrase(&normalized, word) {
            return day_scope(&tz, today, ScopeKind::Today, word);
        }
    }
    if contains_phrase(&normalized, "this week") {
        let start = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
        let end = start + Duration::days(7);
        return Some(TemporalScope {
            kind: ScopeKind::ThisWeek,
            label: "this week".to_string(),
            start_ms: local_midnight_ms(&tz, start)?,
            end_ms: local_midnight_ms(&tz, end)?,
            strict: false,
            primary_date_ymd: None,
        });
    }
    if contains_phrase(&normalized, "this month") {
        let start = NaiveDate::from_ymd_opt(today.year(), today.month(), 1)?;
        let end = if today.month() == 12 {
            NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)?
        };
        return Some(TemporalScope {
            kind: ScopeKind::ThisMonth,
            label: "this month".to_string(),
            start_ms: local_midnight_ms(&tz, start)?,
            end_ms: local_midnight_ms(&tz, end)?,
            strict: false,
            primary_date_ymd: None,
        });
    }
    None
}

fn day_scope<Tz: TimeZone>(
    tz: &Tz,
    day: NaiveDate,
    kind: ScopeKind,
    label: &str,
) -> Option<TemporalScope> {
    Some(TemporalScope {
        kind,
        label: label.to_string(),
        start_ms: local_midnight_ms(tz, day)?,
        end_ms: local_midnight_ms(tz, day.succ_opt()?)?,
        strict: true,
        primary_date_ymd: Some(day.format("%Y-%m-%d").to_string()),
    })
}

/// Milliseconds of local midnight on `day`. When midnight falls in a DST
/// gap the first valid instant of the following hour is used.
fn local_midnight_ms<Tz: TimeZone>(tz: &Tz, day: NaiveDate) -> Option<i64> {
    (0..3).find_map(|hour| {
        let naive = day.and_hms_opt(hour, 0, 0)?;
        tz.from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.timestamp_millis())
    })
}

/// Whole-word (or whole-phrase) containment.
fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    haystack.match_indices(phrase).any(|(start, _)| {
        let end = start + phrase.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

/// Parse an ISO-8601 timestamp to Unix milliseconds. Timestamps without a
/// zone are taken as UTC; a bare date is midnight UTC.
pub fn parse_timestamp_ms(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.timestamp_millis());
        }
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive).timestamp_millis());
        }
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    let naive = date.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&naive).timestamp_millis())
}

/// What the scope filter did to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeOutcome {
    /// No scope was active; the pool is unchanged.
    Unscoped,
    /// The pool was narrowed to the scope's window.
    Scoped { kept: usize, dropped: usize },
    /// A non-strict scope matched nothing; the full pool is returned.
    Fallback,
}

#[derive(Debug, Clone)]
pub struct ScopedPool {
    pub matches: Vec<ScoredMatch>,
    pub outcome: ScopeOutcome,
}

impl ScopedPool {
    pub fn fallback_used(&self) -> bool {
        self.outcome == ScopeOutcome::Fallback
    }
}

/// Narrow `matches` to `scope`, keeping their order.
///
/// A candidate is in scope when its best parsable timestamp
/// ([`ScoredMatch::timestamp_ms`]) lies in the window;
/// candidates without a usable timestamp are out of scope.
pub fn apply_temporal_scope(
    matches: Vec<ScoredMatch>,
    scope: Option<&TemporalScope>,
) -> Result<ScopedPool, PipelineFailure> {
    let Some(scope) = scope else {
        return Ok(ScopedPool {
            matches,
            outcome: ScopeOutcome::Unscoped,
        });
    };

    let total = matches.len();
    let in_scope: Vec<ScoredMatch> = matches
        .iter()
        .filter(|m| {
            m.timestamp_ms()
                .is_some_and(|ts| scope.contains_ms(ts))
        })
        .cloned()
        .collect();

    if !in_scope.is_empty() {
        let kept = in_scope.len();
        return Ok(ScopedPool {
            matches: in_scope,
            outcome: ScopeOutcome::Scoped {
                kept,
                dropped: total - kept,
            },
        });
    }

    if scope.strict {
        let day = scope
            .primary_date_ymd
            .as_deref()
            .map(|d| format!(" ({})", d))
            .unwrap_or_default();
        return Err(PipelineFailure::new(
            FailureKind::EmptyStrictScope,
            format!(
                "No indexed content is dated {}{}. Ask about a wider range such as \"this week\", or drop the time reference.",
                scope.label, day
            ),
        ));
    }

    Ok(ScopedPool {
        matches,
        outcome: ScopeOutcome::Fallback,
    })
}
