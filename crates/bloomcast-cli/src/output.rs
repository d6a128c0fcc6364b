//! Output formatting utilities

use bloomcast::evaluation::ErrorSummary;
use bloomcast::training::CandidateReport;
use colored::Colorize;

/// Print a section header
pub(crate) fn section(title: &str) {
    println!("\n{}", format!("=== {title} ===").cyan().bold());
}

/// Print a key-value pair
pub(crate) fn kv(key: &str, value: impl std::fmt::Display) {
    println!("  {}: {}", key.white().bold(), value);
}

/// Print a success message
pub(crate) fn success(msg: &str) {
    println!("{} {}", "[PASS]".green().bold(), msg);
}

/// Print an error message
pub(crate) fn error(msg: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), msg);
}

/// One row of the candidate table.
pub(crate) fn candidate_row(rank: usize, report: &CandidateReport) -> String {
    let params = if report.kind.uses_l1_ratio() {
        format!("alpha={} l1_ratio={}", report.params.alpha, report.params.l1_ratio)
    } else if report.kind.uses_alpha() {
        format!("alpha={}", report.params.alpha)
    } else {
        "-".to_string()
    };
    format!(
        "{rank:>2}. {:<12} {:<28} MAE {:>8.3}  RMSE {:>8.3}  R² {:>7.4}",
        report.kind.display_name(),
        params,
        report.test.mae,
        report.test.rmse,
        report.test.r2
    )
}

/// Print the ranked candidate table, best first and highlighted.
pub(crate) fn candidates(reports: &[CandidateReport]) {
    section("Candidates");
    for (i, report) in reports.iter().enumerate() {
        let row = candidate_row(i + 1, report);
        if i == 0 {
            println!("  {}", row.green().bold());
        } else {
            println!("  {row}");
        }
    }
}

/// Print an error summary block.
pub(crate) fn summary(summary: &ErrorSummary) {
    section("Test Errors");
    kv("Records", summary.count);
    kv("Mean abs error (days)", format!("{:.2}", summary.mean_abs_error));
    kv("Max abs error (days)", format!("{:.2}", summary.max_abs_error));
    kv("Min abs error (days)", format!("{:.2}", summary.min_abs_error));
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloomcast::linear_model::{ModelKind, Params};
    use bloomcast::metrics::RegressionReport;

    fn report(kind: ModelKind) -> CandidateReport {
        CandidateReport {
            kind,
            params: Params::with_alpha(0.1),
            cv_score: None,
            test: RegressionReport {
                mae: 12.5,
                rmse: 15.0,
                r2: 0.75,
            },
        }
    }

    #[test]
    fn test_row_shows_relevant_params() {
        let row = candidate_row(1, &report(ModelKind::Ridge));
        assert!(row.contains("alpha=0.1"));
        assert!(!row.contains("l1_ratio"));
        assert!(row.contains("12.500"));

        let row = candidate_row(2, &report(ModelKind::ElasticNet));
        assert!(row.contains("l1_ratio=0.5"));

        let row = candidate_row(3, &report(ModelKind::Linear));
        assert!(!row.contains("alpha"));
    }
}
