//! Period-identifier parsing and ISO-week date arithmetic.
//!
//! Papers are labeled with a period identifier that is either an ISO week
//! (`2026-03`) or a calendar day (`2026-01-15`). Week-shaped identifiers
//! expand to the seven Monday-to-Sunday dates of that ISO week so that
//! queries match records stored under either labeling scheme.

use anyhow::{Context, Result};
use chrono::{Datelike, Duration, Local, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

static WEEK_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}$").unwrap());

/// Whether `period_id` is week-shaped (`YYYY-WW`) rather than a date
/// (`YYYY-MM-DD`).
pub fn is_week_id(period_id: &str) -> bool {
    WEEK_ID_RE.is_match(period_id)
}

/// Split a week identifier like `2026-03` into `(year, week)`.
pub fn parse_week_id(week_id: &str) -> Result<(i32, u32)> {
    let (year, week) = week_id
        .split_once('-')
        .with_context(|| format!("malformed week id: {week_id}"))?;
    let year: i32 = year
        .parse()
        .with_context(|| format!("malformed week id: {week_id}"))?;
    let week: u32 = week
        .parse()
        .with_context(|| format!("malformed week id: {week_id}"))?;
    Ok((year, week))
}

/// All seven dates (`YYYY-MM-DD`, Monday through Sunday) of an ISO week.
///
/// Returns an empty vector when the identifier is malformed or names a week
/// the year does not have (e.g. week 53 of a 52-week year).
pub fn dates_for_week(week_id: &str) -> Vec<String> {
    let Ok((year, week)) = parse_week_id(week_id) else {
        return Vec::new();
    };
    let Some(monday) = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon) else {
        return Vec::new();
    };
    (0..7)
        .map(|i| (monday + Duration::days(i)).format("%Y-%m-%d").to_string())
        .collect()
}

/// Convert `2026-03` to the ISO week label `2026-W03` used in listing URLs.
pub fn iso_week_label(week_id: &str) -> Result<String> {
    let (year, week) = parse_week_id(week_id)?;
    Ok(format!("{year}-W{week:02}"))
}

/// The current local ISO week as a `YYYY-WW` identifier.
pub fn current_week_id() -> String {
    let iso = Local::now().date_naive().iso_week();
    format!("{}-{:02}", iso.year(), iso.week())
}

/// Year and week number for a period identifier of either shape. Day-shaped
/// identifiers report the ISO week containing that date.
pub fn year_and_week(period_id: &str) -> Result<(i32, u32)> {
    if is_week_id(period_id) {
        parse_week_id(period_id)
    } else {
        let date = NaiveDate::parse_from_str(period_id, "%Y-%m-%d")
            .with_context(|| format!("malformed period id: {period_id}"))?;
        let iso = date.iso_week();
        Ok((iso.year(), iso.week()))
    }
}
