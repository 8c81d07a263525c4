//! Defines the reporting cadence of ACIS data and the rules that derive a date
//! step and a label precision from it.

use crate::error::AcisError;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The precision a date label is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Precision {
    /// `YYYY`
    Year,
    /// `YYYY-MM`
    Month,
    /// `YYYY-MM-DD`
    Day,
}

/// Represents the reporting interval of an ACIS data request.
///
/// An interval is either one of the named cadences (`"dly"`, `"mly"`, `"yly"`)
/// or an explicit `(years, months, days)` step. Steps are always stored in
/// normalized form: only the least-significant nonzero component is kept, so
/// `(1, 1, 0)` becomes a monthly step `(0, 1, 0)` and `(1, 0, 1)` a daily
/// step `(0, 0, 1)`.
///
/// # Examples
///
/// ```
/// use acis::Interval;
///
/// assert_eq!("MLY".parse::<Interval>().unwrap(), Interval::Monthly);
/// assert_eq!(Interval::step(1, 1, 1).unwrap().delta(), (0, 0, 1));
/// assert_eq!(Interval::Yearly.to_string(), "yly");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Interval {
    /// One value per day.
    #[default]
    Daily,
    /// One value per month.
    Monthly,
    /// One value per year.
    Yearly,
    /// An explicit step. Always normalized, see [`Interval::step`].
    Step { years: u32, months: u32, days: u32 },
}

impl Interval {
    /// Builds a normalized step interval.
    ///
    /// Components are scanned from days to years; the first nonzero one keeps
    /// its magnitude and every more-significant component is forced to zero.
    /// An all-zero step is accepted and means "no advancement".
    ///
    /// # Errors
    ///
    /// Returns [`AcisError::InvalidInterval`] if any component is negative.
    pub fn step(years: i64, months: i64, days: i64) -> Result<Self, AcisError> {
        let component = |value: i64| {
            u32::try_from(value).map_err(|_| {
                AcisError::InvalidInterval(format!("[{}, {}, {}]", years, months, days))
            })
        };
        let (mut years, mut months, days) = (component(years)?, component(months)?, component(days)?);
        if days > 0 {
            months = 0;
        }
        if months > 0 || days > 0 {
            years = 0;
        }
        Ok(Interval::Step {
            years,
            months,
            days,
        })
    }

    /// Interprets an interval the way it appears in request parameters: a
    /// cadence name or a three-element array of integers (numeric strings are
    /// accepted as integers).
    pub fn from_value(value: &Value) -> Result<Self, AcisError> {
        match value {
            Value::String(name) => name.parse(),
            Value::Array(items) if items.len() == 3 => {
                let mut parts = [0i64; 3];
                for (part, item) in parts.iter_mut().zip(items) {
                    *part = match item {
                        Value::Number(n) => n.as_i64(),
                        Value::String(s) => s.trim().parse().ok(),
                        _ => None,
                    }
                    .ok_or_else(|| AcisError::InvalidInterval(value.to_string()))?;
                }
                Interval::step(parts[0], parts[1], parts[2])
            }
            other => Err(AcisError::InvalidInterval(other.to_string())),
        }
    }

    /// The `(years, months, days)` offset between consecutive periods.
    pub fn delta(&self) -> (u32, u32, u32) {
        match *self {
            Interval::Daily => (0, 0, 1),
            Interval::Monthly => (0, 1, 0),
            Interval::Yearly => (1, 0, 0),
            Interval::Step {
                years,
                months,
                days,
            } => (years, months, days),
        }
    }

    /// Label precision: yearly data gets `YYYY`, monthly data `YYYY-MM`, and
    /// everything else, explicit steps included, `YYYY-MM-DD`.
    pub fn precision(&self) -> Precision {
        match self {
            Interval::Yearly => Precision::Year,
            Interval::Monthly => Precision::Month,
            _ => Precision::Day,
        }
    }

    pub(crate) fn name(&self) -> Option<&'static str> {
        match self {
            Interval::Daily => Some("dly"),
            Interval::Monthly => Some("mly"),
            Interval::Yearly => Some("yly"),
            Interval::Step { .. } => None,
        }
    }

    /// The wire form used in request parameters.
    pub fn to_value(&self) -> Value {
        match self.name() {
            Some(name) => Value::from(name),
            None => {
                let (y, m, d) = self.delta();
                Value::from(vec![y, m, d])
            }
        }
    }
}

impl FromStr for Interval {
    type Err = AcisError;

    /// Parses a cadence name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dly" => Ok(Interval::Daily),
            "mly" => Ok(Interval::Monthly),
            "yly" => Ok(Interval::Yearly),
            _ => Err(AcisError::InvalidInterval(format!("unknown interval name '{}'", s))),
        }
    }
}

impl TryFrom<&Value> for Interval {
    type Error = AcisError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        Interval::from_value(value)
    }
}

impl TryFrom<(i64, i64, i64)> for Interval {
    type Error = AcisError;

    fn try_from((years, months, days): (i64, i64, i64)) -> Result<Self, Self::Error> {
        Interval::step(years, months, days)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => {
                let (y, m, d) = self.delta();
                write!(f, "[{}, {}, {}]", y, m, d)
            }
        }
    }
}

impl Serialize for Interval {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}
