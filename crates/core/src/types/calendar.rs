//! Calendar month arithmetic for monthly views and reporting windows.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`YearMonth`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum YearMonthError {
    /// Not in `YYYY-MM` form.
    #[error("month must be formatted as YYYY-MM")]
    Format,
    /// Month number outside 1..=12 or year outside the supported range.
    #[error("month is out of range")]
    OutOfRange,
}

/// A calendar month, e.g. `2024-02`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

impl YearMonth {
    /// Create a month.
    ///
    /// # Errors
    ///
    /// Returns [`YearMonthError::OutOfRange`] if `month` is not 1..=12 or the
    /// year cannot be represented as a date.
    pub fn new(year: i32, month: u32) -> Result<Self, YearMonthError> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|_| Self { year, month })
            .ok_or(YearMonthError::OutOfRange)
    }

    /// The month containing `date`.
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    /// First calendar day of the month.
    #[must_use]
    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Move `delta` months forward (or backward when negative).
    #[must_use]
    pub fn shift(self, delta: i32) -> Self {
        let first = self.first_day();
        let shifted = if delta >= 0 {
            first.checked_add_months(Months::new(delta.unsigned_abs()))
        } else {
            first.checked_sub_months(Months::new(delta.unsigned_abs()))
        };
        shifted.map_or(self, Self::of)
    }

    #[must_use]
    pub fn next(self) -> Self {
        self.shift(1)
    }

    #[must_use]
    pub fn previous(self) -> Self {
        self.shift(-1)
    }

    /// Number of days in the month (28..=31).
    #[must_use]
    pub fn days_in_month(self) -> u32 {
        let days = self.next().first_day() - self.first_day();
        u32::try_from(days.num_days()).unwrap_or(0)
    }

    /// Every calendar day of the month, in order.
    pub fn days(self) -> impl Iterator<Item = NaiveDate> {
        self.first_day()
            .iter_days()
            .take(self.days_in_month() as usize)
    }

    /// Human label such as `"Mar 2024"`.
    #[must_use]
    pub fn label(self) -> String {
        let index = usize::try_from(self.month.saturating_sub(1)).unwrap_or(0);
        let name = MONTH_ABBREVIATIONS.get(index).copied().unwrap_or("???");
        format!("{name} {}", self.year)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = YearMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s.trim().split_once('-').ok_or(YearMonthError::Format)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(YearMonthError::Format);
        }
        let year = year.parse::<i32>().map_err(|_| YearMonthError::Format)?;
        let month = month.parse::<u32>().map_err(|_| YearMonthError::Format)?;
        Self::new(year, month)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let ym: YearMonth = "2024-02".parse().unwrap();
        assert_eq!(ym.year(), 2024);
        assert_eq!(ym.month(), 2);
        assert_eq!(ym.to_string(), "2024-02");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!("2024/02".parse::<YearMonth>(), Err(YearMonthError::Format));
        assert_eq!("24-02".parse::<YearMonth>(), Err(YearMonthError::Format));
        assert_eq!("2024-2".parse::<YearMonth>(), Err(YearMonthError::Format));
        assert_eq!(
            "2024-13".parse::<YearMonth>(),
            Err(YearMonthError::OutOfRange)
        );
        assert_eq!(
            "2024-00".parse::<YearMonth>(),
            Err(YearMonthError::OutOfRange)
        );
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!("2024-02".parse::<YearMonth>().unwrap().days_in_month(), 29);
        assert_eq!("2023-02".parse::<YearMonth>().unwrap().days_in_month(), 28);
        assert_eq!("2024-04".parse::<YearMonth>().unwrap().days_in_month(), 30);
        assert_eq!("2024-12".parse::<YearMonth>().unwrap().days_in_month(), 31);
    }

    #[test]
    fn test_days_iterates_whole_month() {
        let days: Vec<_> = "2024-02".parse::<YearMonth>().unwrap().days().collect();
        assert_eq!(days.len(), 29);
        assert_eq!(days.first().unwrap().to_string(), "2024-02-01");
        assert_eq!(days.last().unwrap().to_string(), "2024-02-29");
    }

    #[test]
    fn test_shift_crosses_year_boundaries() {
        let jan = YearMonth::new(2024, 1).unwrap();
        assert_eq!(jan.previous(), YearMonth::new(2023, 12).unwrap());
        assert_eq!(jan.shift(-5), YearMonth::new(2023, 8).unwrap());
        assert_eq!(jan.shift(12), YearMonth::new(2025, 1).unwrap());
        assert_eq!(YearMonth::new(2024, 12).unwrap().next(), YearMonth::new(2025, 1).unwrap());
    }

    #[test]
    fn test_label() {
        assert_eq!(YearMonth::new(2024, 3).unwrap().label(), "Mar 2024");
        assert_eq!(YearMonth::new(2023, 12).unwrap().label(), "Dec 2023");
    }
}
