//! Offline inspection commands: `scope` and `canonicalize`.
//!
//! Neither touches the network or the config file, which makes them handy
//! for checking how a question or URL will be treated before running
//! `ask` or `search`.

use anyhow::Result;
use chrono::{DateTime, Local, TimeZone};
use crawlscope_core::canonical::canonicalize;
use crawlscope_core::temporal::detect_temporal_scope;

/// One line describing the time scope of `query` as of `now`.
pub fn describe_scope<Tz: TimeZone>(query: &str, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match detect_temporal_scope(query, now) {
        Some(scope) => format!(
            "{} [{}]",
            scope.describe(&now.timezone()),
            if scope.strict { "strict" } else { "fallback allowed" }
        ),
        None => "no temporal scope".to_string(),
    }
}

pub fn run_scope(query: &str) -> Result<()> {
    println!("{}", describe_scope(query, &Local::now()));
    Ok(())
}

pub fn run_canonicalize(urls: &[String]) -> Result<()> {
    for url in urls {
        println!("{}", canonicalize(url));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 15, 30, 0).unwrap()
    }

    #[test]
    fn test_describe_strict_scope() {
        assert_eq!(
            describe_scope("what did I read yesterday?", &now()),
            "yesterday (2026-10-17 00:00 → 2026-10-18 00:00) [strict]"
        );
    }

    #[test]
    fn test_describe_lenient_scope() {
        assert_eq!(
            describe_scope("releases this month", &now()),
            "this month (2026-10-01 00:00 → 2026-11-01 00:00) [fallback allowed]"
        );
    }

    #[test]
    fn test_describe_no_scope() {
        assert_eq!(describe_scope("how do hooks work", &now()), "no temporal scope");
    }
}
