//! Formatted terminal output for run summaries.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (important for future snapshot tests)

use crate::domain::{FitResult, FittedCurve, RunConfig, TimeSeries};

/// Format the full run summary (dataset stats + per-region fit diagnostics).
pub fn format_run_summary(
    prepared: &[TimeSeries],
    fits: &[FitResult],
    config: &RunConfig,
) -> String {
    let mut out = String::new();

    out.push_str("=== pandemic - case-count curve fit ===\n");
    out.push_str(&format!("Column: {}\n", config.column.header()));
    out.push_str(&format!("Model : {}\n", config.model.display_name()));
    out.push_str(&format!("Regions: {}\n", prepared.len()));

    for s in prepared {
        let span = match (s.start_date(), s.end_date()) {
            (Some(a), Some(b)) => format!("{a}..{b}"),
            _ => "(empty)".to_string(),
        };
        out.push_str(&format!(
            "- {:<24} n={:<5} span={span}\n",
            s.region(),
            s.len()
        ));
    }

    if !fits.is_empty() {
        out.push_str("\nFit diagnostics:\n");
        for f in fits {
            out.push_str(&format!(
                "- {:<24} {}: {}\n",
                f.region,
                f.model.kind.display_name(),
                fmt_params(&f.model)
            ));
            out.push_str(&format!(
                "  SSE={:.3} RMSE={:.3} n={} iters={}\n",
                f.quality.sse, f.quality.rmse, f.quality.n, f.quality.iterations
            ));
        }
    }

    out
}

fn fmt_params(model: &FittedCurve) -> String {
    model
        .named_params()
        .iter()
        .map(|(name, value)| format!("{name}={value:.4}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        CountColumn, FitQuality, GapFill, ModelKind, Observation, RunMode, SeriesKind,
    };
    use chrono::NaiveDate;

    fn config() -> RunConfig {
        RunConfig {
            mode: RunMode::All,
            data_dir: "data".into(),
            out_dir: "out".into(),
            region: None,
            column: CountColumn::Confirmed,
            gap_fill: GapFill::LinearInterpolate,
            daily: false,
            model: ModelKind::Logistic,
            max_iters: 200,
            tol: 1e-8,
            initial_guess: None,
            plot_width: 800,
            plot_height: 600,
            export_prepared: None,
            export_fit: None,
        }
    }

    #[test]
    fn summary_names_regions_and_diagnostics() {
        let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let obs = vec![
            Observation { date: start, count: 10.0 },
            Observation {
                date: start + chrono::Duration::days(1),
                count: 20.0,
            },
        ];
        let series = TimeSeries::new("USA".into(), SeriesKind::Cumulative, obs).unwrap();
        let fit = FitResult {
            region: "USA".into(),
            start_date: start,
            span_days: 1.0,
            model: FittedCurve {
                kind: ModelKind::Logistic,
                params: vec![100.0, 0.5, 2.0],
            },
            quality: FitQuality {
                sse: 0.25,
                rmse: 0.35,
                n: 2,
                iterations: 9,
            },
        };

        let text = format_run_summary(&[series], &[fit], &config());
        assert!(text.contains("USA"));
        assert!(text.contains("L=100.0000"));
        assert!(text.contains("SSE=0.250"));
        assert!(text.contains("2020-03-01..2020-03-02"));
    }

    #[test]
    fn summary_without_fits_omits_diagnostics() {
        let text = format_run_summary(&[], &[], &config());
        assert!(!text.contains("Fit diagnostics"));
    }
}
