//! `bloomcast train`: run the full pipeline from a JSON config.

use crate::commands::Presentation;
use crate::error::{require_file, Result};
use crate::output;
use bloomcast::config::PipelineConfig;
use bloomcast::preprocessing::ScalerKind;
use bloomcast::training::run_pipeline;
use bloomcast::BloomError;
use std::path::PathBuf;

/// Config file plus command-line overrides.
pub(crate) struct TrainArgs {
    pub config: PathBuf,
    pub test_size: Option<f64>,
    pub scaler: Option<ScalerKind>,
    pub output_dir: Option<PathBuf>,
}

/// Reads the config, applies the overrides, then validates once.
pub(crate) fn resolve_config(args: &TrainArgs) -> Result<PipelineConfig> {
    require_file(&args.config)?;
    let mut config = PipelineConfig::read(&args.config)?;
    if let Some(test_size) = args.test_size {
        config.test_size = test_size;
    }
    if let Some(scaler) = args.scaler {
        config.scaler = scaler;
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir.clone_from(dir);
    }
    config.validate()?;
    Ok(config)
}

pub(crate) fn run(args: &TrainArgs, presentation: Presentation) -> Result<()> {
    let config = resolve_config(args)?;
    let run = run_pipeline(&config)?;
    let outcome = &run.outcome;

    if presentation.json {
        let summary = serde_json::json!({
            "best": outcome.best(),
            "candidates": outcome.candidates,
            "summary": outcome.evaluation.summary,
            "artifact": run.artifact_path,
            "results": run.results_path,
        });
        println!("{}", serde_json::to_string_pretty(&summary).map_err(BloomError::from)?);
    } else if presentation.human() {
        output::candidates(&outcome.candidates);
        output::summary(&outcome.evaluation.summary);
        output::section("Outputs");
        output::kv("Model", run.artifact_path.display());
        output::kv("Predictions", run.results_path.display());
        output::success(&format!("best model: {}", outcome.best().kind.display_name()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use std::fs;

    #[test]
    fn test_overrides_apply_after_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "test_size": 0.3, "scaler": "minmax" }"#).expect("write");

        let config = resolve_config(&TrainArgs {
            config: path,
            test_size: Some(0.25),
            scaler: Some(ScalerKind::Standard),
            output_dir: Some(PathBuf::from("out")),
        })
        .expect("valid");
        assert_eq!(config.test_size, 0.25);
        assert_eq!(config.scaler, ScalerKind::Standard);
        assert_eq!(config.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_override_replaces_invalid_file_value() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "test_size": 1.5 }"#).expect("write");

        let config = resolve_config(&TrainArgs {
            config: path.clone(),
            test_size: Some(0.25),
            scaler: None,
            output_dir: None,
        })
        .expect("override wins");
        assert_eq!(config.test_size, 0.25);

        let err = resolve_config(&TrainArgs {
            config: path,
            test_size: None,
            scaler: None,
            output_dir: None,
        })
        .expect_err("file value still invalid");
        assert!(matches!(err, CliError::Bloom(BloomError::Configuration { .. })));
    }

    #[test]
    fn test_invalid_override_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(&path, "{}").expect("write");

        let err = resolve_config(&TrainArgs {
            config: path,
            test_size: Some(1.5),
            scaler: None,
            output_dir: None,
        })
        .expect_err("out of range");
        assert!(matches!(err, CliError::Bloom(BloomError::Configuration { .. })));
    }
}
