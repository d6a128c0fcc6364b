//! Target labeling: capped "days until next bloom" for each observation.
//!
//! The label of an observation sampled on `d` is the number of days from `d`
//! to [`BloomCalendar::next_bloom_after`]`(d)`, capped at
//! [`MAX_TARGET_DAYS`] so sparse bloom records cannot produce extreme
//! regression targets.

use crate::calendar::BloomCalendar;
use crate::error::Result;
use crate::primitives::Vector;
use chrono::NaiveDate;
use tracing::debug;

/// Upper bound of the regression target (and of clamped predictions).
pub const MAX_TARGET_DAYS: u32 = 365;

/// Labels observation dates against a bloom calendar.
///
/// # Example
///
/// ```
/// use bloomcast::calendar::BloomCalendar;
/// use bloomcast::labeling::TargetLabeler;
/// use chrono::NaiveDate;
///
/// let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).expect("valid date");
/// let calendar = BloomCalendar::new([date(2025, 4, 10)]).expect("non-empty");
///
/// let labels = TargetLabeler::new(&calendar)
///     .label(&[date(2025, 4, 1), date(2025, 4, 9)])
///     .expect("calendar covers both dates");
/// assert_eq!(labels, vec![9, 1]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TargetLabeler<'a> {
    calendar: &'a BloomCalendar,
}

impl<'a> TargetLabeler<'a> {
    /// Creates a labeler reading from `calendar`.
    #[must_use]
    pub fn new(calendar: &'a BloomCalendar) -> Self {
        Self { calendar }
    }

    /// Capped days until the next bloom for a single reference date.
    ///
    /// # Errors
    ///
    /// Returns a calendar underflow error if no later bloom can be derived.
    pub fn target_days(&self, reference: NaiveDate) -> Result<u32> {
        let days = self.calendar.days_until_next_bloom(reference)?;
        Ok(cap_days(days))
    }

    /// Labels every reference date, preserving order.
    ///
    /// # Errors
    ///
    /// Fails on the first date the calendar cannot serve.
    pub fn label(&self, reference_dates: &[NaiveDate]) -> Result<Vec<u32>> {
        let labels = reference_dates
            .iter()
            .map(|&date| self.target_days(date))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            rows = labels.len(),
            capped = labels.iter().filter(|&&d| d == MAX_TARGET_DAYS).count(),
            "labeled observations"
        );
        Ok(labels)
    }

    /// Labels every reference date into a regression target vector.
    ///
    /// # Errors
    ///
    /// See [`TargetLabeler::label`].
    pub fn label_vector(&self, reference_dates: &[NaiveDate]) -> Result<Vector> {
        Ok(self
            .label(reference_dates)?
            .into_iter()
            .map(f64::from)
            .collect())
    }
}

/// Capped days until next bloom for each date (free-function form).
///
/// # Errors
///
/// See [`TargetLabeler::label`].
pub fn label(reference_dates: &[NaiveDate], calendar: &BloomCalendar) -> Result<Vec<u32>> {
    TargetLabeler::new(calendar).label(reference_dates)
}

fn cap_days(days: i64) -> u32 {
    // next_bloom_after is strictly later, so days >= 1
    u32::try_from(days.max(0))
        .unwrap_or(MAX_TARGET_DAYS)
        .min(MAX_TARGET_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BloomError;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    #[test]
    fn test_label_preserves_order() {
        let calendar = BloomCalendar::new([date(2025, 4, 10), date(2025, 9, 5)]).expect("non-empty");
        let labels = label(
            &[date(2025, 9, 1), date(2025, 3, 1), date(2025, 4, 10)],
            &calendar,
        )
        .expect("all dates labelable");
        assert_eq!(labels, vec![4, 40, 148]);
    }

    #[test]
    fn test_label_wraps_to_next_year() {
        let calendar = BloomCalendar::new([date(2025, 4, 10), date(2025, 9, 5)]).expect("non-empty");
        let labels = label(&[date(2025, 9, 10)], &calendar).expect("wraps");
        assert_eq!(labels, vec![212]);
    }

    #[test]
    fn test_label_is_capped() {
        // Gap between blooms longer than a year
        let calendar = BloomCalendar::new([date(2020, 1, 1), date(2022, 6, 1)]).expect("non-empty");
        let labels = label(&[date(2020, 1, 2)], &calendar).expect("in range");
        assert_eq!(labels, vec![MAX_TARGET_DAYS]);
    }

    #[test]
    fn test_label_propagates_underflow() {
        let calendar = BloomCalendar::new([date(2020, 4, 1), date(2023, 4, 1)]).expect("non-empty");
        let result = label(&[date(2023, 1, 1), date(2023, 5, 1)], &calendar);
        assert!(matches!(result, Err(BloomError::CalendarUnderflow { .. })));
    }

    #[test]
    fn test_label_vector() {
        let calendar = BloomCalendar::new([date(2025, 4, 10)]).expect("non-empty");
        let y = TargetLabeler::new(&calendar)
            .label_vector(&[date(2025, 4, 1)])
            .expect("in range");
        assert_eq!(y.as_slice(), &[9.0]);
    }

    #[test]
    fn test_cap_days_bounds() {
        assert_eq!(cap_days(1), 1);
        assert_eq!(cap_days(365), 365);
        assert_eq!(cap_days(366), 365);
        assert_eq!(cap_days(-3), 0);
    }
}
