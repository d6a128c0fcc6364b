//! Subcommand implementations.

pub(crate) mod evaluate;
pub(crate) mod label;
pub(crate) mod predict;
pub(crate) mod train;

/// Global presentation flags shared by every subcommand.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Presentation {
    /// Print machine-readable summaries.
    pub json: bool,
    /// Suppress human-readable summaries.
    pub quiet: bool,
}

impl Presentation {
    /// Human summaries are printed unless JSON or quiet mode is on.
    pub(crate) fn human(self) -> bool {
        !self.json && !self.quiet
    }
}
