use crate::error::AcisError;
use crate::types::date_label::DateLabel;
use crate::types::interval::{Interval, Precision};
use chrono::{Days, Months, NaiveDate};
use std::iter::FusedIterator;

/// An iterator over the period labels from a start through an end label
/// (inclusive) at a given [`Interval`].
///
/// Created by [`date_range`]. Each call to `date_range` produces a fresh,
/// independent sequence.
#[derive(Debug, Clone)]
pub struct DateRange {
    next: Option<NaiveDate>,
    end: NaiveDate,
    delta: (u32, u32, u32),
    precision: Precision,
}

impl DateRange {
    fn new(start: DateLabel, end: DateLabel, interval: &Interval) -> Self {
        let precision = interval.precision();
        Self {
            next: Some(start.truncate(precision).date()),
            end: end.truncate(precision).date(),
            delta: interval.delta(),
            precision,
        }
    }
}

/// Adds a calendar offset the way a relative delta does: years and months
/// first (clamping the day to the end of the month), then days.
fn advance(date: NaiveDate, (years, months, days): (u32, u32, u32)) -> Option<NaiveDate> {
    let total_months = years.checked_mul(12)?.checked_add(months)?;
    date.checked_add_months(Months::new(total_months))?
        .checked_add_days(Days::new(u64::from(days)))
}

impl Iterator for DateRange {
    type Item = DateLabel;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.filter(|date| *date <= self.end)?;
        // A zero step cannot advance; it yields the start label once.
        self.next = if self.delta == (0, 0, 0) {
            None
        } else {
            advance(current, self.delta)
        };
        Some(DateLabel::new(current, self.precision))
    }
}

impl FusedIterator for DateRange {}

/// Produces the ascending, inclusive sequence of period labels between
/// `start` and `end` at `interval`.
///
/// Both endpoints are truncated to the interval's precision before iterating.
/// Without an `end` the sequence holds the single `start` label.
///
/// # Errors
///
/// Returns [`AcisError::InvalidDate`] if either endpoint is malformed. No
/// label is produced in that case.
///
/// # Examples
///
/// ```
/// use acis::{date_range, Interval};
///
/// let labels: Vec<String> = date_range("20111215", Some("2012-02-15"), &Interval::Monthly)?
///     .map(|label| label.to_string())
///     .collect();
/// assert_eq!(labels, ["2011-12", "2012-01", "2012-02"]);
/// # Ok::<(), acis::AcisError>(())
/// ```
pub fn date_range(
    start: &str,
    end: Option<&str>,
    interval: &Interval,
) -> Result<DateRange, AcisError> {
    let start = DateLabel::parse(start)?;
    let end = match end {
        Some(end) => DateLabel::parse(end)?,
        None => start,
    };
    Ok(DateRange::new(start, end, interval))
}
