//! `bloomcast evaluate`: re-score a saved model on the trailing test slice.

use crate::commands::Presentation;
use crate::error::{require_file, Result};
use crate::output;
use bloomcast::data::{load_bloom_calendar, FeatureTable};
use bloomcast::evaluation::{write_records_to, OutputFormat};
use bloomcast::training::ModelArtifact;
use bloomcast::BloomError;
use std::path::PathBuf;

pub(crate) struct EvaluateArgs {
    pub model: PathBuf,
    pub features: PathBuf,
    pub blooms: PathBuf,
    pub bloom_column: String,
    /// Falls back to the fraction stored in the artifact.
    pub test_size: Option<f64>,
    pub format: OutputFormat,
    /// Records file; records go to stdout when absent.
    pub output: Option<PathBuf>,
}

pub(crate) fn run(args: &EvaluateArgs, presentation: Presentation) -> Result<()> {
    require_file(&args.model)?;
    require_file(&args.features)?;
    require_file(&args.blooms)?;

    let artifact = ModelArtifact::load(&args.model)?;
    let table = FeatureTable::from_csv_path(&args.features, artifact.schema()?)?;
    let calendar = load_bloom_calendar(&args.blooms, &args.bloom_column)?;
    let test_size = args.test_size.unwrap_or(artifact.test_fraction);

    let evaluation = artifact.evaluate(&table, &calendar, test_size)?;
    write_records_to(args.output.as_deref(), &evaluation.records, args.format)?;

    // Stdout carries the records themselves when no output file is given
    let Some(path) = &args.output else {
        return Ok(());
    };
    if presentation.json {
        let summary = serde_json::json!({
            "model": artifact.kind(),
            "test_size": test_size,
            "summary": evaluation.summary,
            "output": path,
        });
        println!("{}", serde_json::to_string_pretty(&summary).map_err(BloomError::from)?);
    } else if presentation.human() {
        output::section("Model");
        output::kv("Kind", artifact.kind().display_name());
        output::kv("Test size", test_size);
        output::summary(&evaluation.summary);
        output::success(&format!("wrote {}", path.display()));
    }
    Ok(())
}
