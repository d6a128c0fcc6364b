//! Error types for the bloomcast CLI.

use bloomcast::BloomError;
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

/// Result type alias for CLI operations
pub(crate) type Result<T> = std::result::Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug)]
pub(crate) enum CliError {
    /// Input file not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// IO error outside the library (stdout, output files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Library error
    #[error(transparent)]
    Bloom(#[from] BloomError),
}

impl CliError {
    /// Get exit code for this error
    pub(crate) fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    fn code(&self) -> u8 {
        match self {
            Self::FileNotFound(_) | Self::Io(_) => 7,
            Self::Bloom(err) => match err {
                BloomError::Configuration { .. } => 2,
                BloomError::InsufficientData { .. } => 3,
                BloomError::CalendarUnderflow { .. } => 4,
                BloomError::MalformedRow { .. } | BloomError::Csv(_) | BloomError::Json(_) => 5,
                BloomError::Artifact { .. } => 6,
                BloomError::Io(_) => 7,
                BloomError::DimensionMismatch { .. }
                | BloomError::SingularMatrix
                | BloomError::NotFitted { .. } => 1,
            },
        }
    }
}

/// Fails with [`CliError::FileNotFound`] unless `path` is an existing file.
pub(crate) fn require_file(path: &std::path::Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(CliError::FileNotFound(path.to_path_buf()))
    }
}
