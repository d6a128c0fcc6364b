//! `bloomcast predict`: forecast bloom dates for new observations.

use crate::commands::Presentation;
use crate::error::{require_file, Result};
use crate::output;
use bloomcast::data::FeatureTable;
use bloomcast::evaluation::{write_records_to, OutputFormat};
use bloomcast::training::ModelArtifact;
use bloomcast::BloomError;
use std::path::PathBuf;

pub(crate) struct PredictArgs {
    pub model: PathBuf,
    pub features: PathBuf,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
}

pub(crate) fn run(args: &PredictArgs, presentation: Presentation) -> Result<()> {
    require_file(&args.model)?;
    require_file(&args.features)?;

    let artifact = ModelArtifact::load(&args.model)?;
    let table = FeatureTable::from_csv_path(&args.features, artifact.schema()?)?;
    let forecasts = artifact.forecast(&table)?;
    write_records_to(args.output.as_deref(), &forecasts, args.format)?;

    let Some(path) = &args.output else {
        return Ok(());
    };
    if presentation.json {
        let summary = serde_json::json!({
            "model": artifact.kind(),
            "forecasts": forecasts.len(),
            "output": path,
        });
        println!("{}", serde_json::to_string_pretty(&summary).map_err(BloomError::from)?);
    } else if presentation.human() {
        output::section("Forecast");
        output::kv("Model", artifact.kind().display_name());
        output::kv("Observations", forecasts.len());
        if let Some(next) = forecasts.iter().map(|f| f.pred_bloom_date).min() {
            output::kv("Earliest predicted bloom", next);
        }
        output::success(&format!("wrote {}", path.display()));
    }
    Ok(())
}
