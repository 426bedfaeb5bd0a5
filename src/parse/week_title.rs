use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::model::WeekRange;

static WEEK_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)月(\d+)日\s*-\s*(\d+)月(\d+)日").expect("week title pattern is valid")
});

/// Month/day pairs of a week title, as written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TitleDates {
    pub start_month: u32,
    pub start_day: u32,
    pub end_month: u32,
    pub end_day: u32,
}

/// Whether `text` contains a `M月D日 - M月D日` range
pub fn is_week_title(text: &str) -> bool {
    WEEK_TITLE_RE.is_match(text)
}

/// Whether `text` is a `M月D日 - M月D日` range and nothing else
pub fn is_bare_week_title(text: &str) -> bool {
    WEEK_TITLE_RE
        .find(text)
        .is_some_and(|m| m.start() == 0 && m.end() == text.len())
}

/// Extract the four numbers of a week title. Digit runs too long for a
/// `u32` yield `None`.
pub fn parse_week_title(text: &str) -> Option<TitleDates> {
    let caps = WEEK_TITLE_RE.captures(text)?;
    let num = |i: usize| caps.get(i)?.as_str().parse::<u32>().ok();
    Some(TitleDates {
        start_month: num(1)?,
        start_day: num(2)?,
        end_month: num(3)?,
        end_day: num(4)?,
    })
}

/// Resolve a week title to calendar dates relative to `today`.
///
/// Titles carry no year. Both ends are placed in today's year, except when
/// the range wraps over New Year (end month before start month): the end
/// moves to next year, or, if today is already in the early months up to the
/// end month, the start moves to last year.
///
/// Returns `None` for dates that don't exist (`2月30日`) or a range that
/// ends before it starts.
pub fn resolve_range(text: &str, today: NaiveDate) -> Option<WeekRange> {
    let dates = parse_week_title(text)?;
    let mut start_year = today.year();
    let mut end_year = today.year();
    if dates.end_month < dates.start_month {
        if today.month() <= dates.end_month {
            start_year -= 1;
        } else {
            end_year += 1;
        }
    }
    let start = NaiveDate::from_ymd_opt(start_year, dates.start_month, dates.start_day)?;
    let end = NaiveDate::from_ymd_opt(end_year, dates.end_month, dates.end_day)?;
    if end < start {
        return None;
    }
    Some(WeekRange { start, end })
}

/// `10月12日 - 10月18日`, without zero padding
pub fn format_week_title(range: &WeekRange) -> String {
    format!(
        "{}月{}日 - {}月{}日",
        range.start.month(),
        range.start.day(),
        range.end.month(),
        range.end.day()
    )
}
