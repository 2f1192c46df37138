//! Keyword types and value canonicalisation.
//!
//! Every keyword has a type that decides how its values are spelled in
//! canonical form and how `from/to/to/by/step` ranges are expanded. Values are
//! canonicalised both in requests and in record keys, so matching is a plain
//! string comparison afterwards.

use chrono::{Duration, NaiveDate};

use crate::error::{RequestError, Result};

/// Type of a request keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordType {
    /// Calendar date, canonical `YYYYMMDD`.
    Date,
    /// Time of day, canonical `HHMM`.
    Time,
    /// Integer without leading zeros (`step`, `number`, `levelist`, ...).
    Integer,
    /// Experiment version, four characters, zero padded when numeric.
    Expver,
    /// Free text, lower-cased.
    Text,
}

/// Default range step for dates, in days.
const DEFAULT_DATE_STEP_DAYS: i64 = 1;
/// Default range step for times, in hours.
const DEFAULT_TIME_STEP_HOURS: i64 = 6;
/// Default range step for integers.
const DEFAULT_INTEGER_STEP: i64 = 1;
/// Upper bound on the number of values a single range may expand to.
const MAX_RANGE_VALUES: usize = 100_000;

impl KeywordType {
    /// Look up the type of a (lower-case) keyword.
    pub fn for_keyword(keyword: &str) -> Self {
        match keyword {
            "date" | "refdate" | "hdate" => Self::Date,
            "time" | "anoffset" => Self::Time,
            "step" | "number" | "levelist" | "iteration" | "frequency" | "direction" | "fcmonth" => {
                Self::Integer
            }
            "expver" => Self::Expver,
            _ => Self::Text,
        }
    }

    /// Canonicalise a single value of `keyword`.
    pub fn canonicalise(&self, keyword: &str, value: &str) -> Result<String> {
        let value = value.trim();
        if value.is_empty() {
            return Err(RequestError::invalid_value(keyword, value, "empty value"));
        }

        match self {
            Self::Date => parse_date(keyword, value).map(|d| d.format("%Y%m%d").to_string()),
            Self::Time => parse_time_minutes(keyword, value).map(format_time),
            Self::Integer => parse_integer(keyword, value).map(|n| n.to_string()),
            Self::Expver => {
                if value.len() <= 4 && value.chars().all(|c| c.is_ascii_digit()) {
                    Ok(format!("{:0>4}", value))
                } else {
                    Ok(value.to_lowercase())
                }
            }
            Self::Text => Ok(value.to_lowercase()),
        }
    }

    /// Expand `from/to/to[/by/step]` into canonical values (inclusive bounds).
    pub fn expand_range(
        &self,
        keyword: &str,
        from: &str,
        to: &str,
        by: Option<&str>,
    ) -> Result<Vec<String>> {
        let step = match by {
            Some(s) => Some(parse_integer(keyword, s)?),
            None => None,
        };
        if matches!(step, Some(s) if s <= 0) {
            return Err(RequestError::invalid_range(keyword, "step must be positive"));
        }

        match self {
            Self::Date => {
                let start = parse_date(keyword, from)?;
                let end = parse_date(keyword, to)?;
                let step = Duration::try_days(step.unwrap_or(DEFAULT_DATE_STEP_DAYS))
                    .ok_or_else(|| RequestError::invalid_range(keyword, "date step too large"))?;
                check_order(keyword, start <= end)?;

                let mut values = Vec::new();
                let mut current = start;
                while current <= end {
                    values.push(current.format("%Y%m%d").to_string());
                    check_len(keyword, values.len())?;
                    current = current.checked_add_signed(step).ok_or_else(|| {
                        RequestError::invalid_range(keyword, "date range leaves the calendar")
                    })?;
                }
                Ok(values)
            }
            Self::Time => {
                let start = parse_time_minutes(keyword, from)?;
                let end = parse_time_minutes(keyword, to)?;
                let step = step
                    .unwrap_or(DEFAULT_TIME_STEP_HOURS)
                    .checked_mul(60)
                    .ok_or_else(|| RequestError::invalid_range(keyword, "time step too large"))?;
                check_order(keyword, start <= end)?;

                Ok((start..=end)
                    .step_by(step as usize)
                    .map(format_time)
                    .collect())
            }
            Self::Integer => {
                let start = parse_integer(keyword, from)?;
                let end = parse_integer(keyword, to)?;
                let step = step.unwrap_or(DEFAULT_INTEGER_STEP);
                check_order(keyword, start <= end)?;
                let count = end
                    .checked_sub(start)
                    .and_then(|span| (span / step).checked_add(1))
                    .and_then(|count| usize::try_from(count).ok())
                    .ok_or_else(|| RequestError::invalid_range(keyword, "integer range too wide"))?;
                check_len(keyword, count)?;

                Ok((start..=end)
                    .step_by(step as usize)
                    .map(|n| n.to_string())
                    .collect())
            }
            Self::Expver | Self::Text => Err(RequestError::invalid_range(
                keyword,
                "ranges are only supported for date, time and integer keywords",
            )),
        }
    }
}

fn check_order(keyword: &str, ordered: bool) -> Result<()> {
    if ordered {
        Ok(())
    } else {
        Err(RequestError::invalid_range(keyword, "range end precedes range start"))
    }
}

fn check_len(keyword: &str, len: usize) -> Result<()> {
    if len > MAX_RANGE_VALUES {
        Err(RequestError::invalid_range(
            keyword,
            format!("range expands to more than {} values", MAX_RANGE_VALUES),
        ))
    } else {
        Ok(())
    }
}

fn parse_date(keyword: &str, value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    let invalid = || RequestError::invalid_value(keyword, value, "expected YYYY-MM-DD or YYYYMMDD");

    if value.len() == 8 && value.chars().all(|c| c.is_ascii_digit()) {
        let year: i32 = value[0..4].parse().map_err(|_| invalid())?;
        let month: u32 = value[4..6].parse().map_err(|_| invalid())?;
        let day: u32 = value[6..8].parse().map_err(|_| invalid())?;
        return NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid);
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())
}

/// Parse a time of day into minutes after midnight.
fn parse_time_minutes(keyword: &str, value: &str) -> Result<i64> {
    let digits: String = value.trim().chars().filter(|c| *c != ':').collect();
    if digits.is_empty() || digits.len() > 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(RequestError::invalid_value(keyword, value, "expected H, HH, HHMM or HH:MM"));
    }

    let n: i64 = digits
        .parse()
        .map_err(|_| RequestError::invalid_value(keyword, value, "not a number"))?;
    let (hours, minutes) = if digits.len() <= 2 { (n, 0) } else { (n / 100, n % 100) };

    if hours >= 24 || minutes >= 60 {
        return Err(RequestError::invalid_value(keyword, value, "time of day out of range"));
    }
    Ok(hours * 60 + minutes)
}

fn format_time(minutes: i64) -> String {
    format!("{:02}{:02}", minutes / 60, minutes % 60)
}

fn parse_integer(keyword: &str, value: &str) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| RequestError::invalid_value(keyword, value, "expected an integer"))
}
