//! Property-based tests using proptest.
//!
//! These tests verify invariants of labeling, splitting and scaling.

use bloomcast::calendar::BloomCalendar;
use bloomcast::evaluation::clamp_days;
use bloomcast::labeling::{TargetLabeler, MAX_TARGET_DAYS};
use bloomcast::model_selection::{split_and_scale, split_index, KFold};
use bloomcast::preprocessing::ScalerKind;
use bloomcast::primitives::{Matrix, Vector};
use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).expect("valid base date")
}

// Bloom events as day offsets from 2000-01-01, spread over ~30 years
fn calendar_strategy() -> impl Strategy<Value = BloomCalendar> {
    proptest::collection::vec(0i64..11_000, 1..12).prop_map(|offsets| {
        BloomCalendar::new(offsets.into_iter().map(|o| base_date() + Duration::days(o)))
            .expect("non-empty calendar")
    })
}

fn matrix_strategy(rows: usize, cols: usize) -> impl Strategy<Value = Matrix> {
    proptest::collection::vec(-100.0f64..100.0, rows * cols).prop_map(move |data| {
        Matrix::from_vec(rows, cols, data).expect("Test data should be valid")
    })
}

fn scaler_strategy() -> impl Strategy<Value = ScalerKind> {
    prop_oneof![Just(ScalerKind::MinMax), Just(ScalerKind::Standard)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Calendar properties
    #[test]
    fn next_bloom_is_strictly_later(calendar in calendar_strategy(), offset in -2_000i64..11_000) {
        let reference = base_date() + Duration::days(offset);
        prop_assume!(reference < calendar.latest());

        let next = calendar.next_bloom_after(reference).expect("covered by a recorded event");
        prop_assert!(next > reference);
        prop_assert!(calendar.events().contains(&next));
        // No recorded event falls strictly between reference and next
        prop_assert!(!calendar.events().iter().any(|&e| e > reference && e < next));
    }

    #[test]
    fn wrap_around_is_earliest_plus_a_year(calendar in calendar_strategy(), gap in 0i64..400) {
        let reference = calendar.latest() + Duration::days(gap);
        match calendar.next_bloom_after(reference) {
            Ok(next) => {
                prop_assert!(next > reference);
                prop_assert_eq!(next, calendar.earliest() + chrono::Months::new(12));
            }
            Err(err) => {
                let is_underflow = matches!(err, bloomcast::BloomError::CalendarUnderflow { .. });
                prop_assert!(is_underflow);
            }
        }
    }

    // Labeling properties
    #[test]
    fn targets_are_capped_day_counts(calendar in calendar_strategy(), offset in -2_000i64..11_000) {
        let reference = base_date() + Duration::days(offset);
        prop_assume!(reference < calendar.latest());

        let days = calendar.days_until_next_bloom(reference).expect("covered");
        let target = TargetLabeler::new(&calendar).target_days(reference).expect("covered");
        prop_assert!(target <= MAX_TARGET_DAYS);
        prop_assert!(target >= 1);
        prop_assert_eq!(i64::from(target), days.min(i64::from(MAX_TARGET_DAYS)));
    }

    #[test]
    fn clamp_stays_in_label_range(raw in -1e6f64..1e6) {
        let clamped = clamp_days(raw);
        prop_assert!((0.0..=365.0).contains(&clamped));
        if (0.0..=365.0).contains(&raw) {
            prop_assert_eq!(clamped, raw);
        }
    }

    // Split properties
    #[test]
    fn split_is_contiguous_prefix_and_suffix(
        x in matrix_strategy(20, 3),
        test_fraction in 0.05f64..0.95,
        kind in scaler_strategy(),
    ) {
        let y: Vector = (0..20).map(f64::from).collect();
        let split = split_and_scale(&x, &y, test_fraction, kind).expect("both slices non-empty");
        let expected = split_index(20, test_fraction).expect("valid fraction");

        prop_assert_eq!(split.split_index, expected);
        prop_assert_eq!(split.n_train() + split.n_test(), 20);
        prop_assert_eq!(&split.train_labels, &y.slice(0..expected));
        prop_assert_eq!(&split.test_labels, &y.slice(expected..20));
    }

    #[test]
    fn scaler_ignores_test_rows(
        x in matrix_strategy(10, 2),
        replacement in matrix_strategy(2, 2),
        kind in scaler_strategy(),
    ) {
        let y = Vector::zeros(10);
        let mut altered = x.clone();
        for row in 0..2 {
            for col in 0..2 {
                altered.set(8 + row, col, replacement.get(row, col) * 1000.0);
            }
        }

        let original = split_and_scale(&x, &y, 0.2, kind).expect("8/2 split");
        let changed = split_and_scale(&altered, &y, 0.2, kind).expect("8/2 split");
        prop_assert_eq!(&original.scaler, &changed.scaler);
        prop_assert_eq!(&original.train_features, &changed.train_features);
    }

    #[test]
    fn minmax_train_features_in_unit_range(x in matrix_strategy(12, 4)) {
        let y = Vector::zeros(12);
        let split = split_and_scale(&x, &y, 0.25, ScalerKind::MinMax).expect("9/3 split");
        for &value in split.train_features.as_slice() {
            prop_assert!((-1e-12..=1.0 + 1e-12).contains(&value));
        }
    }

    // Cross-validation properties
    #[test]
    fn kfold_partitions_every_index(n in 4usize..60, k in 2usize..5, seed in any::<u64>()) {
        prop_assume!(k <= n);
        let folds = KFold::new(k).with_random_state(seed).split(n).expect("k <= n");
        prop_assert_eq!(folds.len(), k);

        let mut seen = vec![0usize; n];
        for (train, test) in &folds {
            prop_assert_eq!(train.len() + test.len(), n);
            for &i in test {
                seen[i] += 1;
            }
        }
        prop_assert!(seen.iter().all(|&count| count == 1));
    }
}
