use crate::error::AcisError;
use crate::types::interval::{Interval, Precision};
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A calendar date rendered at year, month or day precision.
///
/// Labels are always zero padded (`YYYY`, `YYYY-MM`, `YYYY-MM-DD`); the fields
/// below the precision are pinned to `01`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct DateLabel {
    date: NaiveDate,
    precision: Precision,
}

impl DateLabel {
    pub fn new(date: NaiveDate, precision: Precision) -> Self {
        Self {
            date: pin(date, precision),
            precision,
        }
    }

    /// Parses `YYYY[-MM[-DD]]`; the precision follows the number of fields given.
    pub fn parse(s: &str) -> Result<Self, AcisError> {
        let (year, month, day) = split_fields(s)?;
        let precision = match (month, day) {
            (None, _) => Precision::Year,
            (Some(_), None) => Precision::Month,
            (Some(_), Some(_)) => Precision::Day,
        };
        let date = NaiveDate::from_ymd_opt(year, month.unwrap_or(1), day.unwrap_or(1))
            .ok_or_else(|| AcisError::InvalidDate(s.to_string()))?;
        Ok(Self { date, precision })
    }

    pub fn date(self) -> NaiveDate {
        self.date
    }

    pub fn precision(self) -> Precision {
        self.precision
    }

    pub fn truncate(self, precision: Precision) -> Self {
        Self::new(self.date, precision)
    }
}

fn pin(date: NaiveDate, precision: Precision) -> NaiveDate {
    let (month, day) = match precision {
        Precision::Year => (1, 1),
        Precision::Month => (date.month(), 1),
        Precision::Day => (date.month(), date.day()),
    };
    NaiveDate::from_ymd_opt(date.year(), month, day).unwrap_or(date)
}

impl Display for DateLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let d = self.date;
        match self.precision {
            Precision::Year => write!(f, "{:04}", d.year()),
            Precision::Month => write!(f, "{:04}-{:02}", d.year(), d.month()),
            Precision::Day => write!(f, "{:04}-{:02}-{:02}", d.year(), d.month(), d.day()),
        }
    }
}

impl FromStr for DateLabel {
    type Err = AcisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DateLabel::parse(s)
    }
}

lazy_static::lazy_static! {
    /// `YYYY[[-]MM[[-]DD]]`: four year digits, then up to two two-digit
    /// fields, each optionally preceded by a hyphen.
    static ref DATE_PATTERN: Regex =
        Regex::new(r"^([0-9]{4})(?:-?([0-9]{2})(?:-?([0-9]{2}))?)?$").expect("valid date pattern");
}

fn split_fields(s: &str) -> Result<(i32, Option<u32>, Option<u32>), AcisError> {
    let invalid = || AcisError::InvalidDate(s.to_string());
    let caps = DATE_PATTERN.captures(s).ok_or_else(invalid)?;
    let field = |i: usize| caps.get(i).map(|m| m.as_str().parse::<u32>());
    let year = caps[1].parse::<i32>().map_err(|_| invalid())?;
    let month = field(2).transpose().map_err(|_| invalid())?;
    let day = field(3).transpose().map_err(|_| invalid())?;
    Ok((year, month, day))
}

/// Converts an ACIS date string (`YYYY[-MM[-DD]]`, hyphens optional) to a date.
/// Missing month and day fields default to 1.
///
/// # Examples
///
/// ```
/// use acis::date_object;
/// use chrono::NaiveDate;
///
/// assert_eq!(date_object("201112").unwrap(), NaiveDate::from_ymd_opt(2011, 12, 1).unwrap());
/// assert!(date_object("11-11-11").is_err());
/// ```
pub fn date_object(s: &str) -> Result<NaiveDate, AcisError> {
    DateLabel::parse(s).map(DateLabel::date)
}

/// Formats a date as a zero-padded `YYYY-MM-DD` string.
pub fn date_string(date: NaiveDate) -> String {
    DateLabel::new(date, Precision::Day).to_string()
}

/// Reduces a full or partial date string to the precision dictated by `interval`.
///
/// ```
/// use acis::{date_trunc, Interval};
///
/// assert_eq!(date_trunc("20111215", &Interval::Monthly).unwrap(), "2011-12");
/// assert_eq!(date_trunc("2011", &Interval::Monthly).unwrap(), "2011-01");
/// assert_eq!(date_trunc("2011-12-05", &Interval::Yearly).unwrap(), "2011");
/// ```
pub fn date_trunc(s: &str, interval: &Interval) -> Result<String, AcisError> {
    Ok(DateLabel::parse(s)?
        .truncate(interval.precision())
        .to_string())
}
