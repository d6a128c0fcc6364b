//! `bloomcast label`: attach days-until-bloom targets to a feature table.

use crate::commands::Presentation;
use crate::error::{require_file, Result};
use crate::output;
use bloomcast::config::PipelineConfig;
use bloomcast::data::{load_bloom_calendar, FeatureSchema, FeatureTable};
use bloomcast::labeling::TargetLabeler;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;

/// Inputs of one labeling run.
pub(crate) struct LabelArgs {
    pub features: PathBuf,
    pub blooms: PathBuf,
    pub date_column: String,
    pub bloom_column: String,
    /// Feature keys; the default key list when empty.
    pub feature_keys: Vec<String>,
    /// Output CSV; stdout when absent.
    pub output: Option<PathBuf>,
}

pub(crate) fn run(args: &LabelArgs, presentation: Presentation) -> Result<()> {
    require_file(&args.features)?;
    require_file(&args.blooms)?;

    let keys = if args.feature_keys.is_empty() {
        PipelineConfig::default().features
    } else {
        args.feature_keys.clone()
    };
    let schema = FeatureSchema::new(args.date_column.clone(), keys)?;
    let table = FeatureTable::from_csv_path(&args.features, schema)?;
    let calendar = load_bloom_calendar(&args.blooms, &args.bloom_column)?;

    let targets = TargetLabeler::new(&calendar).label(&table.reference_dates())?;

    match &args.output {
        Some(path) => {
            table.write_labeled_csv(BufWriter::new(File::create(path)?), &targets)?;
            info!(path = %path.display(), rows = targets.len(), "wrote labeled table");
            report(path, &targets, calendar.len(), presentation)?;
        }
        None => table.write_labeled_csv(io::stdout().lock(), &targets)?,
    }
    Ok(())
}

fn report(path: &Path, targets: &[u32], n_blooms: usize, presentation: Presentation) -> Result<()> {
    let max_target = targets.iter().copied().max().unwrap_or(0);
    if presentation.json {
        let summary = serde_json::json!({
            "rows": targets.len(),
            "bloom_events": n_blooms,
            "max_target": max_target,
            "output": path,
        });
        println!("{}", serde_json::to_string_pretty(&summary).map_err(bloomcast::BloomError::from)?);
    } else if presentation.human() {
        output::section("Labeled");
        output::kv("Rows", targets.len());
        output::kv("Bloom events", n_blooms);
        output::kv("Max target (days)", max_target);
        output::success(&format!("wrote {}", path.display()));
    }
    Ok(())
}
