//! bloomcast - days-until-bloom forecasting CLI
//!
//! Usage:
//!   bloomcast label --features merged.csv --blooms bloom_dates.csv -o labeled.csv
//!   bloomcast train --config pipeline.json
//!   bloomcast evaluate --model saved_models/best_model.bin --features merged.csv --blooms bloom_dates.csv
//!   bloomcast predict --model saved_models/best_model.bin --features new.csv --format csv

use bloomcast::data::{DEFAULT_BLOOM_COLUMN, DEFAULT_DATE_COLUMN};
use bloomcast::evaluation::OutputFormat;
use bloomcast::preprocessing::ScalerKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;

use commands::{evaluate, label, predict, train, Presentation};

/// bloomcast - forecast the number of days until the next bloom
#[derive(Parser)]
#[command(name = "bloomcast")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Attach days-until-next-bloom targets to a feature table
    Label {
        /// Feature table CSV
        #[arg(long, value_name = "FILE")]
        features: PathBuf,

        /// Bloom date list CSV
        #[arg(long, value_name = "FILE")]
        blooms: PathBuf,

        /// Reference-date column of the feature table
        #[arg(long, default_value = DEFAULT_DATE_COLUMN)]
        date_column: String,

        /// Date column of the bloom list
        #[arg(long, default_value = DEFAULT_BLOOM_COLUMN)]
        bloom_column: String,

        /// Feature key to keep (repeatable; defaults to the standard climate set)
        #[arg(long = "feature", value_name = "KEY")]
        feature_keys: Vec<String>,

        /// Output CSV (stdout if omitted)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Train, compare and save models from a pipeline config
    Train {
        /// Pipeline config (JSON)
        #[arg(long, value_name = "FILE")]
        config: PathBuf,

        /// Override the held-out fraction
        #[arg(long)]
        test_size: Option<f64>,

        /// Override the scaler (minmax, standard)
        #[arg(long)]
        scaler: Option<ScalerKind>,

        /// Override the output directory
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Re-evaluate a saved model on the trailing test slice
    Evaluate {
        /// Saved model artifact
        #[arg(long, value_name = "FILE")]
        model: PathBuf,

        /// Feature table CSV
        #[arg(long, value_name = "FILE")]
        features: PathBuf,

        /// Bloom date list CSV
        #[arg(long, value_name = "FILE")]
        blooms: PathBuf,

        /// Date column of the bloom list
        #[arg(long, default_value = DEFAULT_BLOOM_COLUMN)]
        bloom_column: String,

        /// Held-out fraction (defaults to the one used in training)
        #[arg(long)]
        test_size: Option<f64>,

        /// Record format (json, jsonl, csv)
        #[arg(long, default_value = "json")]
        format: OutputFormat,

        /// Output file (stdout if omitted)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Forecast bloom dates for new observations
    Predict {
        /// Saved model artifact
        #[arg(long, value_name = "FILE")]
        model: PathBuf,

        /// Feature table CSV
        #[arg(long, value_name = "FILE")]
        features: PathBuf,

        /// Record format (json, jsonl, csv)
        #[arg(long, default_value = "json")]
        format: OutputFormat,

        /// Output file (stdout if omitted)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

/// Logs go to stderr so stdout stays clean for records. `RUST_LOG` takes
/// precedence over the verbosity flags.
fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let presentation = Presentation {
        json: cli.json,
        quiet: cli.quiet,
    };

    let result = match cli.command {
        Commands::Label {
            features,
            blooms,
            date_column,
            bloom_column,
            feature_keys,
            output,
        } => label::run(
            &label::LabelArgs {
                features,
                blooms,
                date_column,
                bloom_column,
                feature_keys,
                output,
            },
            presentation,
        ),

        Commands::Train {
            config,
            test_size,
            scaler,
            output_dir,
        } => train::run(
            &train::TrainArgs {
                config,
                test_size,
                scaler,
                output_dir,
            },
            presentation,
        ),

        Commands::Evaluate {
            model,
            features,
            blooms,
            bloom_column,
            test_size,
            format,
            output,
        } => evaluate::run(
            &evaluate::EvaluateArgs {
                model,
                features,
                blooms,
                bloom_column,
                test_size,
                format,
                output,
            },
            presentation,
        ),

        Commands::Predict {
            model,
            features,
            format,
            output,
        } => predict::run(
            &predict::PredictArgs {
                model,
                features,
                format,
                output,
            },
            presentation,
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&e.to_string());
            e.exit_code()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_repeated_feature_flags() {
        let cli = Cli::try_parse_from([
            "bloomcast", "label", "--features", "f.csv", "--blooms", "b.csv", "--feature", "EVI",
            "--feature", "tmax", "--json",
        ])
        .expect("valid args");
        assert!(cli.json);
        match cli.command {
            Commands::Label {
                feature_keys,
                date_column,
                ..
            } => {
                assert_eq!(feature_keys, vec!["EVI", "tmax"]);
                assert_eq!(date_column, "date");
            }
            _ => panic!("expected label"),
        }
    }

    #[test]
    fn test_rejects_unknown_format() {
        let result = Cli::try_parse_from([
            "bloomcast", "predict", "--model", "m.bin", "--features", "f.csv", "--format", "xml",
        ]);
        assert!(result.is_err());
    }
}
