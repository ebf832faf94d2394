//! Date-vs-text classification of operator operands.
//!
//! An operand is a date when it matches the ISO-8601 grammar below and names
//! a real instant. Calendar dates may use the extended (`2020-01-01`) or the
//! basic (`20200101`) form; a year (`2020`), a month (`2020-06`), a week date
//! (`2020-W01`, `2020-W01-3`) and an ordinal date (`2020-123`) are dates too.
//! A time may follow after `T` or whitespace: `HH`, `HH:MM`, `HH:MM:SS`, the
//! same without colons, with a `.`/`,` fraction of the last unit, and with a
//! `Z`, `±HH`, `±HHMM` or `±HH:MM` designator.
//!
//! Values without a designator are read as UTC. `24:00` is not a time and an
//! out-of-range calendar value (`2020-02-30`, `2021-366`) stays text. Plain
//! numbers of other lengths are never coerced.

use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday,
};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use datacat_core::Scalar;

static ISO_8601: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(?P<year>[+-]?\d{4})",
        r"(?:(?P<sep>-?)",
        r"(?:(?P<month>0[1-9]|1[0-2])(?:(?P<day_sep>-?)(?P<day>0[1-9]|[12]\d|3[01]))?",
        r"|W(?P<week>[0-4]\d|5[0-2])(?:-?(?P<weekday>[1-7]))?",
        r"|(?P<ordinal>00[1-9]|0[1-9]\d|[12]\d{2}|3[0-5]\d|36[0-6]))",
        r"(?:(?P<designator>[T\s])(?P<hour>[01]\d|2[0-3])",
        r"(?:(?P<minute_sep>:?)(?P<minute>[0-5]\d)(?:(?P<second_sep>:?)(?P<second>[0-5]\d))?)?",
        r"(?:[.,](?P<fraction>\d+))?",
        r"(?P<zone>[zZ]|[+-](?:[01]\d|2[0-3])(?::?[0-5]\d)?)?)?",
        r")?$",
    ))
    .expect("ISO-8601 grammar must compile")
});

/// Classifies a raw operand as a date when it is ISO-8601, else text.
#[must_use]
pub fn classify(raw: &str) -> Scalar {
    parse_iso8601(raw).map_or_else(|| Scalar::Text(raw.to_string()), Scalar::Date)
}

/// Parses an ISO-8601 date or date-time into UTC.
#[must_use]
pub fn parse_iso8601(raw: &str) -> Option<DateTime<Utc>> {
    let caps = ISO_8601.captures(raw)?;
    let date = parse_date(&caps)?;

    let Some(hour) = caps.name("hour") else {
        return Some(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
    };
    let naive = date.and_time(NaiveTime::MIN) + Duration::hours(number(hour.as_str())?);
    let naive = add_time(&caps, naive)?;

    match caps.name("zone").map(|m| m.as_str()) {
        None => Some(Utc.from_utc_datetime(&naive)),
        Some(zone) => parse_zone(zone)?
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc)),
    }
}

fn number<T: std::str::FromStr>(text: &str) -> Option<T> {
    text.trim_start_matches('+').parse().ok()
}

fn parse_date(caps: &Captures<'_>) -> Option<NaiveDate> {
    let year: i32 = number(caps.name("year")?.as_str())?;
    let sep = caps.name("sep").map_or("", |m| m.as_str());

    if let Some(month) = caps.name("month") {
        let month: u32 = number(month.as_str())?;
        return match caps.name("day") {
            Some(day) => {
                // Both separators are present or both are absent.
                if caps.name("day_sep").map_or("", |m| m.as_str()) != sep {
                    return None;
                }
                NaiveDate::from_ymd_opt(year, month, number(day.as_str())?)
            }
            // `YYYYMM` alone reads as a truncated basic date, not a month.
            None if sep.is_empty() && !followed_by_t(caps) => None,
            None => NaiveDate::from_ymd_opt(year, month, 1),
        };
    }
    if let Some(week) = caps.name("week") {
        let weekday = match caps.name("weekday").map_or("1", |m| m.as_str()) {
            "1" => Weekday::Mon,
            "2" => Weekday::Tue,
            "3" => Weekday::Wed,
            "4" => Weekday::Thu,
            "5" => Weekday::Fri,
            "6" => Weekday::Sat,
            _ => Weekday::Sun,
        };
        return NaiveDate::from_isoywd_opt(year, number(week.as_str())?, weekday);
    }
    if let Some(ordinal) = caps.name("ordinal") {
        return NaiveDate::from_yo_opt(year, number(ordinal.as_str())?);
    }
    NaiveDate::from_ymd_opt(year, 1, 1)
}

fn followed_by_t(caps: &Captures<'_>) -> bool {
    caps.name("designator").is_some_and(|m| m.as_str() == "T")
}

/// Adds minutes, seconds and the fraction of the smallest unit given.
fn add_time(caps: &Captures<'_>, naive: NaiveDateTime) -> Option<NaiveDateTime> {
    let mut naive = naive;
    let mut unit_seconds = 3600;

    if let Some(minute) = caps.name("minute") {
        naive += Duration::minutes(number(minute.as_str())?);
        unit_seconds = 60;
    }
    if let Some(second) = caps.name("second") {
        let minute_sep = caps.name("minute_sep").map_or("", |m| m.as_str());
        if caps.name("second_sep").map_or("", |m| m.as_str()) != minute_sep {
            return None;
        }
        naive += Duration::seconds(number(second.as_str())?);
        unit_seconds = 1;
    }
    if let Some(fraction) = caps.name("fraction") {
        let digits: String = fraction.as_str().chars().take(9).collect();
        let nanos: i64 = number(&format!("{digits:0<9}"))?;
        naive = naive.checked_add_signed(Duration::nanoseconds(nanos * unit_seconds))?;
    }
    Some(naive)
}

fn parse_zone(zone: &str) -> Option<FixedOffset> {
    if zone.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }
    let sign = if zone.starts_with('-') { -1 } else { 1 };
    let digits: String = zone[1..].chars().filter(char::is_ascii_digit).collect();
    let hours: i32 = number(digits.get(..2)?)?;
    let minutes: i32 = match digits.get(2..) {
        Some("") | None => 0,
        Some(minutes) => number(minutes)?,
    };
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
