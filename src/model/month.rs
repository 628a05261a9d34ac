//! The `Month` key, a calendar month written as `YYYY-MM`.
//!
//! Months are labels, not instants: there is no time zone and no day component. All balance and
//! distribution tracking is keyed on them.

use chrono::{Datelike, Local};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// An error produced when a string is not a well-formed `YYYY-MM` month key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid month '{0}', expected the format YYYY-MM")]
pub struct MonthError(String);

impl MonthError {
    /// The offending input.
    pub fn input(&self) -> &str {
        &self.0
    }
}

/// A calendar month. Ordering is chronological.
///
/// ```
/// # use fintrack::model::Month;
/// # use std::str::FromStr;
/// let jan = Month::from_str("2024-01").unwrap();
/// assert_eq!(jan.previous().unwrap().to_string(), "2023-12");
/// assert!(jan < Month::from_str("2024-02").unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    /// Creates a month from its parts. The year must fit in four digits and cannot be zero.
    pub fn new(year: i32, month: u32) -> Result<Self, MonthError> {
        if !(1..=9999).contains(&year) || !(1..=12).contains(&month) {
            return Err(MonthError(format!("{year:04}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    /// The month containing today's local date.
    pub fn current() -> Self {
        let today = Local::now().date_naive();
        Self {
            year: today.year(),
            month: today.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The month before this one, rolling the year back at January. Returns `None` only for
    /// `0001-01`, which has no representable predecessor.
    pub fn previous(&self) -> Option<Self> {
        if self.month == 1 {
            Month::new(self.year - 1, 12).ok()
        } else {
            Some(Self {
                year: self.year,
                month: self.month - 1,
            })
        }
    }
}

/// Computes the previous month of a `YYYY-MM` string.
///
/// # Errors
/// Fails on malformed input rather than producing a wrong date.
pub fn previous_month(month: &str) -> Result<String, MonthError> {
    let parsed = Month::from_str(month)?;
    parsed
        .previous()
        .map(|m| m.to_string())
        .ok_or_else(|| MonthError(month.to_string()))
}

impl FromStr for Month {
    type Err = MonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || MonthError(s.to_string());
        let (year, month) = s.split_once('-').ok_or_else(err)?;
        if year.len() != 4
            || month.len() != 2
            || !year.bytes().all(|b| b.is_ascii_digit())
            || !month.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(err());
        }
        let year: i32 = year.parse().map_err(|_| err())?;
        let month: u32 = month.parse().map_err(|_| err())?;
        Month::new(year, month).map_err(|_| err())
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for Month {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Month::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(s: &str) -> Month {
        Month::from_str(s).unwrap()
    }

    #[test]
    fn test_previous_month_rolls_year_back() {
        assert_eq!(previous_month("2024-01").unwrap(), "2023-12");
    }

    #[test]
    fn test_previous_month_same_year() {
        assert_eq!(previous_month("2024-07").unwrap(), "2024-06");
    }

    #[test]
    fn test_previous_month_rejects_malformed() {
        for bad in [
            "", "2024", "2024-1", "2024-13", "2024-00", "24-01", "2024/01", "2024-01-15", "abcd-ef",
            "+024-01", "2024--1",
        ] {
            let err = previous_month(bad).unwrap_err();
            assert_eq!(err.input(), bad);
        }
    }

    #[test]
    fn test_previous_of_first_representable_month() {
        assert!(m("0001-01").previous().is_none());
        assert!(previous_month("0001-01").is_err());
    }

    #[test]
    fn test_ordering_is_chronological() {
        assert!(m("2023-12") < m("2024-01"));
        assert!(m("2024-02") > m("2024-01"));
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&m("2024-03")).unwrap();
        assert_eq!(json, "\"2024-03\"");
        let back: Month = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m("2024-03"));
        assert!(serde_json::from_str::<Month>("\"March\"").is_err());
    }
}
