use std::str::FromStr;

use serde::Deserialize;
use time::{macros::format_description, Date, Duration, Month};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Daily,
    /// Monday through Sunday.
    Weekly,
    /// First through last day of a calendar month.
    Monthly,
}

impl FromStr for Period {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(AppError::bad_request(format!(
                "unknown period {other:?}, expected daily, weekly or monthly"
            ))),
        }
    }
}

/// Inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: Date,
    pub end: Date,
}

impl DateRange {
    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn single_day(&self) -> Option<Date> {
        (self.start == self.end).then_some(self.start)
    }
}

/// Query string of the aggregation endpoint: either a reference `date` or an
/// explicit `start_date`/`end_date` pair, all `YYYY-MM-DD`.
#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    pub date: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

pub fn parse_date(value: &str, field: &str) -> Result<Date, AppError> {
    Date::parse(value, format_description!("[year]-[month]-[day]")).map_err(|_| {
        AppError::bad_request(format!("invalid {field} {value:?}, expected YYYY-MM-DD"))
    })
}

fn out_of_range() -> AppError {
    AppError::bad_request("date out of supported range")
}

pub fn week_containing(date: Date) -> Result<DateRange, AppError> {
    let back = i64::from(date.weekday().number_days_from_monday());
    let start = date
        .checked_sub(Duration::days(back))
        .ok_or_else(out_of_range)?;
    let end = start.checked_add(Duration::days(6)).ok_or_else(out_of_range)?;
    Ok(DateRange { start, end })
}

pub fn month_containing(date: Date) -> Result<DateRange, AppError> {
    let start = Date::from_calendar_date(date.year(), date.month(), 1).map_err(|_| out_of_range())?;
    let (year, month) = match date.month() {
        Month::December => (date.year() + 1, Month::January),
        m => (date.year(), m.next()),
    };
    let end = Date::from_calendar_date(year, month, 1)
        .ok()
        .and_then(Date::previous_day)
        .ok_or_else(out_of_range)?;
    Ok(DateRange { start, end })
}

/// Turns a period plus query into the dates to aggregate over.
///
/// Daily buckets use `date` (or `today`) and ignore any explicit range.
/// Weekly and monthly buckets take an explicit range verbatim when both ends
/// are given, otherwise they derive the week or month around `date`.
pub fn resolve_range(period: Period, query: &PeriodQuery, today: Date) -> Result<DateRange, AppError> {
    let reference = || -> Result<Date, AppError> {
        query
            .date
            .as_deref()
            .map_or(Ok(today), |d| parse_date(d, "date"))
    };

    if period == Period::Daily {
        let day = reference()?;
        return Ok(DateRange { start: day, end: day });
    }

    match (query.start_date.as_deref(), query.end_date.as_deref()) {
        (Some(start), Some(end)) => {
            let range = DateRange {
                start: parse_date(start, "start_date")?,
                end: parse_date(end, "end_date")?,
            };
            if range.start > range.end {
                return Err(AppError::bad_request("start_date is after end_date"));
            }
            Ok(range)
        }
        (None, None) => {
            let day = reference()?;
            match period {
                Period::Weekly => week_containing(day),
                _ => month_containing(day),
            }
        }
        _ => Err(AppError::bad_request(
            "start_date and end_date must be given together",
        )),
    }
}
