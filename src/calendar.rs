//! Bloom calendar: the set of observed bloom-onset dates.
//!
//! The calendar answers one question, "when is the next bloom strictly after
//! this date?", treating the recorded events as a yearly-recurring series.
//! Both target labeling and evaluation go through [`BloomCalendar`] so that
//! training labels and evaluation ground truth can never drift apart.
//!
//! # Example
//!
//! ```
//! use bloomcast::calendar::BloomCalendar;
//! use chrono::NaiveDate;
//!
//! let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).expect("valid date");
//! let calendar = BloomCalendar::new([date(2025, 4, 10), date(2025, 9, 5)]).expect("non-empty");
//!
//! assert_eq!(calendar.next_bloom_after(date(2025, 3, 1)).expect("in year"), date(2025, 4, 10));
//! // Past the last event: wrap to the earliest event one year later.
//! assert_eq!(calendar.next_bloom_after(date(2025, 9, 10)).expect("wraps"), date(2026, 4, 10));
//! ```

use crate::error::{BloomError, Result};
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Sorted, de-duplicated, non-empty set of bloom event dates.
///
/// Serializes as a plain list of dates; deserialization goes through
/// [`BloomCalendar::new`], so an empty list is rejected and unsorted input
/// is normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<NaiveDate>", into = "Vec<NaiveDate>")]
pub struct BloomCalendar {
    events: Vec<NaiveDate>,
}

impl BloomCalendar {
    /// Builds a calendar from an unordered collection of bloom dates.
    ///
    /// # Errors
    ///
    /// Returns [`BloomError::CalendarUnderflow`] if no dates are given.
    pub fn new<I>(dates: I) -> Result<Self>
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let mut events: Vec<NaiveDate> = dates.into_iter().collect();
        if events.is_empty() {
            return Err(BloomError::calendar_underflow(
                "bloom event set is empty",
            ));
        }
        events.sort_unstable();
        events.dedup();
        Ok(Self { events })
    }

    /// Bloom events in ascending order.
    #[must_use]
    pub fn events(&self) -> &[NaiveDate] {
        &self.events
    }

    /// Number of distinct bloom events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Always false: construction rejects empty sets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Earliest recorded bloom.
    #[must_use]
    pub fn earliest(&self) -> NaiveDate {
        self.events[0]
    }

    /// Latest recorded bloom.
    #[must_use]
    pub fn latest(&self) -> NaiveDate {
        self.events[self.events.len() - 1]
    }

    /// Returns the first bloom event strictly after `reference`.
    ///
    /// When every recorded event is on or before `reference`, the earliest
    /// event is advanced by one calendar year (Feb 29 becomes Feb 28) and
    /// returned instead.
    ///
    /// # Errors
    ///
    /// Returns [`BloomError::CalendarUnderflow`] if the year-advanced earliest
    /// event is still not after `reference`.
    pub fn next_bloom_after(&self, reference: NaiveDate) -> Result<NaiveDate> {
        let idx = self.events.partition_point(|&event| event <= reference);
        if let Some(&next) = self.events.get(idx) {
            return Ok(next);
        }

        let earliest = self.earliest();
        let wrapped = earliest
            .checked_add_months(Months::new(12))
            .ok_or_else(|| {
                BloomError::calendar_underflow(format!(
                    "cannot advance earliest bloom {earliest} by one year"
                ))
            })?;

        if wrapped <= reference {
            return Err(BloomError::calendar_underflow(format!(
                "no bloom after {reference}: latest event is {}, wrapped earliest event {wrapped} \
                 is not later",
                self.latest()
            )));
        }
        Ok(wrapped)
    }

    /// Whole days from `reference` to the next bloom (always >= 1).
    ///
    /// # Errors
    ///
    /// Propagates [`BloomCalendar::next_bloom_after`] failures.
    pub fn days_until_next_bloom(&self, reference: NaiveDate) -> Result<i64> {
        let next = self.next_bloom_after(reference)?;
        Ok((next - reference).num_days())
    }
}

impl TryFrom<Vec<NaiveDate>> for BloomCalendar {
    type Error = BloomError;

    fn try_from(dates: Vec<NaiveDate>) -> Result<Self> {
        Self::new(dates)
    }
}

impl From<BloomCalendar> for Vec<NaiveDate> {
    fn from(calendar: BloomCalendar) -> Self {
        calendar.events
    }
}

/// Day-of-year ordinal (1..=366).
#[must_use]
pub fn day_of_year(date: NaiveDate) -> u32 {
    date.ordinal()
}

/// Converts a year and day-of-year ordinal into a calendar date.
///
/// # Errors
///
/// Returns a configuration error if `doy` is outside the year's range.
///
/// # Example
///
/// ```
/// use bloomcast::calendar::date_from_day_of_year;
///
/// let date = date_from_day_of_year(2024, 60).expect("leap year has day 60");
/// assert_eq!(date.to_string(), "2024-02-29");
/// ```
pub fn date_from_day_of_year(year: i32, doy: u32) -> Result<NaiveDate> {
    NaiveDate::from_yo_opt(year, doy).ok_or_else(|| {
        BloomError::configuration(format!("day-of-year {doy} is out of range for {year}"))
    })
}
