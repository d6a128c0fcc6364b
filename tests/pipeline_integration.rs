//! Integration tests for bloomcast.
//!
//! These tests verify end-to-end workflows combining multiple components.

use bloomcast::config::PipelineConfig;
use bloomcast::data::{FeatureSchema, FeatureTable};
use bloomcast::evaluation::{Evaluator, OutputFormat};
use bloomcast::linear_model::ModelKind;
use bloomcast::prelude::*;
use bloomcast::training::run_pipeline;
use chrono::NaiveDate;
use std::fs;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

#[test]
fn test_label_split_evaluate_workflow() {
    // Ten monthly observations across two bloom cycles
    let calendar = BloomCalendar::new([date(2020, 4, 15), date(2021, 4, 10)]).expect("non-empty");
    let dates: Vec<NaiveDate> = [
        (2020, 1, 1),
        (2020, 2, 1),
        (2020, 3, 1),
        (2020, 5, 1),
        (2020, 7, 1),
        (2020, 9, 1),
        (2020, 11, 1),
        (2021, 1, 1),
        (2021, 3, 1),
        (2021, 3, 31),
    ]
    .iter()
    .map(|&(y, m, d)| date(y, m, d))
    .collect();

    let labels = TargetLabeler::new(&calendar).label_vector(&dates).expect("covered");
    assert_eq!(labels[0], 105.0);
    assert_eq!(labels[3], 344.0);
    assert_eq!(labels[9], 10.0);

    // Feature = day of year, so the split has something to scale
    let features: Vec<f64> = dates
        .iter()
        .map(|d| f64::from(bloomcast::calendar::day_of_year(*d)))
        .collect();
    let x = Matrix::from_vec(10, 1, features).expect("10x1");

    let split = split_and_scale(&x, &labels, 0.2, ScalerKind::MinMax).expect("8/2 split");
    assert_eq!(split.n_train(), 8);
    assert_eq!(split.n_test(), 2);

    let mut model = LinearRegression::new();
    model
        .fit(&split.train_features, &split.train_labels)
        .expect("fits");
    let predictions = model.predict(&split.test_features).expect("same width");

    let evaluation = Evaluator::new(&calendar)
        .evaluate(&dates[8..], &predictions)
        .expect("covered");
    assert_eq!(evaluation.records.len(), 2);

    let last = &evaluation.records[1];
    assert_eq!(last.reference_date, date(2021, 3, 31));
    assert_eq!(last.true_bloom_date, date(2021, 4, 10));
    assert_eq!(last.true_days_until_bloom, 10);
    assert!((0.0..=365.0).contains(&last.pred_days));
    assert!((last.abs_error - (10.0 - last.pred_days).abs()).abs() < 1e-9);
}

#[test]
fn test_predictions_are_clamped() {
    let calendar = BloomCalendar::new([date(2025, 6, 1)]).expect("non-empty");
    let evaluation = Evaluator::new(&calendar)
        .evaluate(
            &[date(2025, 1, 1), date(2025, 1, 2)],
            &Vector::from_slice(&[400.0, -5.0]),
        )
        .expect("covered");

    let high = &evaluation.records[0];
    assert_eq!(high.pred_days, 365.0);
    assert_eq!(high.pred_bloom_date, date(2026, 1, 1));

    let low = &evaluation.records[1];
    assert_eq!(low.pred_days, 0.0);
    assert_eq!(low.pred_bloom_date, date(2025, 1, 2));
    assert_eq!(low.abs_error, 150.0);
}

#[test]
fn test_csv_tables_feed_the_labeler() {
    let dir = tempfile::tempdir().expect("tempdir");
    let features = dir.path().join("merged.csv");
    let blooms = dir.path().join("bloom_dates.csv");
    fs::write(
        &features,
        "date,EVI,tmax,site\n2023-01-01,0.21,5.5,a\n2023-02-01,0.25,7.0,a\n2023-03-01 00:00:00,0.31,11.2,a\n",
    )
    .expect("write");
    fs::write(&blooms, "bloom_date,site\n2023-04-02,a\n2022-04-10,a\n").expect("write");

    let schema = FeatureSchema::with_features(["EVI", "tmax"]).expect("valid");
    let table = FeatureTable::from_csv_path(&features, schema).expect("parses");
    let calendar = bloomcast::data::load_bloom_calendar(&blooms, "bloom_date").expect("parses");
    assert_eq!(calendar.earliest(), date(2022, 4, 10));

    let targets = TargetLabeler::new(&calendar)
        .label(&table.reference_dates())
        .expect("covered");
    assert_eq!(targets, vec![91, 60, 32]);

    let mut out = Vec::new();
    table.write_labeled_csv(&mut out, &targets).expect("writes");
    let text = String::from_utf8(out).expect("utf8");
    assert_eq!(text.lines().next(), Some("date,EVI,tmax,target"));
    assert!(text.contains("2023-03-01,0.31,11.2,32"));
}

#[test]
fn test_run_pipeline_end_to_end() {
    let dir = tempfile::tempdir().expect("tempdir");
    let features = dir.path().join("merged.csv");
    let blooms = dir.path().join("bloom_dates.csv");

    let bloom_days = [(2018, 4, 5), (2019, 4, 5), (2020, 4, 5), (2021, 4, 5), (2022, 4, 5)];
    let calendar =
        BloomCalendar::new(bloom_days.iter().map(|&(y, m, d)| date(y, m, d))).expect("non-empty");

    // Biweekly rows; `warmth` rises toward each bloom
    let mut csv = String::from("date,warmth,rain\n");
    let mut day = date(2018, 4, 20);
    let mut i = 0u32;
    while day < date(2022, 3, 1) {
        let days = calendar.days_until_next_bloom(day).expect("covered") as f64;
        csv.push_str(&format!("{day},{:.3},{}\n", 400.0 - days, i % 7));
        day += chrono::Duration::days(14);
        i += 1;
    }
    fs::write(&features, csv).expect("write");
    let mut bloom_csv = String::from("bloom_date\n");
    for event in calendar.events() {
        bloom_csv.push_str(&format!("{event}\n"));
    }
    fs::write(&blooms, bloom_csv).expect("write");

    let config = PipelineConfig {
        feature_file: features,
        bloom_file: blooms,
        output_dir: dir.path().join("out"),
        features: vec!["warmth".into(), "rain".into()],
        models: vec![ModelKind::Ridge, ModelKind::Lasso, ModelKind::ElasticNet],
        cv_folds: 3,
        ..PipelineConfig::default()
    };

    let run = run_pipeline(&config).expect("pipeline runs");
    assert!(run.artifact_path.is_file());
    assert!(run.results_path.is_file());
    assert_eq!(run.outcome.candidates.len(), 3);
    assert!(run.outcome.best().test.mae < 30.0);

    let saved: Vec<serde_json::Value> =
        serde_json::from_str(&fs::read_to_string(&run.results_path).expect("read")).expect("json");
    assert_eq!(saved.len(), run.outcome.evaluation.records.len());

    // Reloaded artifact reproduces the stored evaluation
    let artifact = ModelArtifact::load(&run.artifact_path).expect("loads");
    let table = FeatureTable::from_csv_path(&config.feature_file, artifact.schema().expect("schema"))
        .expect("parses");
    let calendar =
        bloomcast::data::load_bloom_calendar(&config.bloom_file, "bloom_date").expect("parses");
    let evaluation = artifact
        .evaluate(&table, &calendar, config.test_size)
        .expect("same split");
    assert_eq!(evaluation.records, run.outcome.evaluation.records);

    let mut jsonl = Vec::new();
    bloomcast::evaluation::write_records(&mut jsonl, &evaluation.records, OutputFormat::JsonLines)
        .expect("writes");
    assert_eq!(
        String::from_utf8(jsonl).expect("utf8").lines().count(),
        evaluation.records.len()
    );
}
