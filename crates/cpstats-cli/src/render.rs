//! Plain-text summaries printed to stdout.

use std::fmt::Write;
use std::time::Duration;

use chrono::NaiveDate;
use cpstats_core::HandlesFile;
use cpstats_scraper::{ExtractorRegistry, FetchStatus};
use cpstats_store::Snapshot;

use crate::update::{Resolution, RunReport};

/// Format an optional date for display, returning `"—"` when `None`.
fn fmt_date(date: Option<NaiveDate>) -> String {
    date.map_or_else(
        || "\u{2014}".to_string(),
        |d| d.format("%Y-%m-%d").to_string(),
    )
}

fn fmt_count(count: Option<u32>) -> String {
    count.map_or_else(|| "\u{2014}".to_string(), |c| c.to_string())
}

fn fmt_status(status: &FetchStatus) -> &'static str {
    match status {
        FetchStatus::Success { .. } => "ok",
        FetchStatus::NoMatch => "no match",
        FetchStatus::NetworkError { .. } => "network error",
        FetchStatus::InvalidCount { .. } => "invalid count",
    }
}

/// Summary of one update run.
pub(crate) fn run_summary(report: &RunReport, slow_after: Duration, stagnant_days: i64) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{:<13}{:<18}{:>7}  {:<12}{:<7}{:<11}{:<10}LIVE",
        "PLATFORM", "USERNAME", "COUNT", "DATE", "FRESH", "MODE", "SOURCE"
    );
    for p in &report.platforms {
        let source = match p.resolution {
            Resolution::Fresh => "live",
            Resolution::Fallback => "cached",
            Resolution::Missing => "missing",
        };
        let mode = p.mode.map(|m| m.to_string()).unwrap_or_default();
        let _ = writeln!(
            out,
            "{:<13}{:<18}{:>7}  {:<12}{:<7}{:<11}{:<10}{} ({:.1}s)",
            p.platform,
            p.username,
            fmt_count(p.count),
            fmt_date(p.date),
            if p.fresh { "yes" } else { "no" },
            mode,
            source,
            fmt_status(&p.status),
            p.elapsed.as_secs_f64()
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Total solved: {} ({} live, {} cached, {} missing)",
        report.total,
        report.fresh_count(),
        report.cached_count(),
        report.missing_count()
    );

    let missing: Vec<&str> = report.missing().map(|p| p.platform.as_str()).collect();
    if !missing.is_empty() {
        let _ = writeln!(
            out,
            "No data for: {} (record one with `cpstats record`)",
            missing.join(", ")
        );
    }

    let slow = report.slow_platforms(slow_after);
    if !slow.is_empty() {
        let _ = writeln!(
            out,
            "Slow to fetch (>= {}s), consider manual updates:",
            slow_after.as_secs()
        );
        for p in slow {
            let _ = writeln!(out, "  {:<13}{:.1}s", p.platform, p.elapsed.as_secs_f64());
        }
    }

    if let (Some((platform, date)), Some(days)) =
        (&report.last_activity, report.days_since_activity())
    {
        let _ = writeln!(out, "Last solved: {date} on {platform} ({days} days ago)");
        if report.is_stagnant(stagnant_days) {
            let _ = writeln!(out, "No new solves in over {stagnant_days} days.");
        }
    }

    out
}

/// Table of the persisted snapshot.
pub(crate) fn snapshot_table(snapshot: &Snapshot, today: NaiveDate) -> String {
    if snapshot.is_empty() {
        return "no snapshot yet; run `cpstats run` first\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<13}{:>7}  {:<12}{:<11}{:<13}USERNAME",
        "PLATFORM", "COUNT", "DATE", "MODE", "LAST SOLVED"
    );
    let mut total: u64 = 0;
    for (platform, entry) in snapshot.iter() {
        total += u64::from(entry.count);
        let age = (today - entry.date).num_days();
        let date = if age == 0 {
            fmt_date(Some(entry.date))
        } else {
            format!("{} ({age}d)", fmt_date(Some(entry.date)))
        };
        let _ = writeln!(
            out,
            "{:<13}{:>7}  {:<12}{:<11}{:<13}{}",
            platform,
            entry.count,
            date,
            entry.mode.to_string(),
            fmt_date(entry.last_solved),
            entry.username.as_deref().unwrap_or("\u{2014}")
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Total: {total}");

    for (platform, rating) in snapshot.ratings() {
        let _ = writeln!(out, "{platform} rating: {rating}");
    }
    out
}

/// Table of known platforms and which of them are configured.
pub(crate) fn platforms_table(
    registry: &ExtractorRegistry,
    handles: Option<&HandlesFile>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<13}{:<5}{:>9}  {:<16}USERNAME",
        "PLATFORM", "API", "PATTERNS", "BOUNDS"
    );
    for spec in registry.specs() {
        let handle = handles.and_then(|h| h.find(&spec.name));
        let bounds = handle
            .and_then(|h| h.max_count)
            .map_or(spec.bounds, |max| spec.bounds.with_max(max));
        let _ = writeln!(
            out,
            "{:<13}{:<5}{:>9}  {:<16}{}",
            spec.name,
            if spec.uses_api() { "yes" } else { "no" },
            spec.patterns.len(),
            bounds.to_string(),
            handle.map_or("\u{2014}", |h| h.username.as_str())
        );
    }
    out
}
