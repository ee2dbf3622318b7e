//! Export prepared series (CSV) and fit results (JSON).
//!
//! Exports are meant to be easy to consume in spreadsheets or downstream
//! scripts; the fit JSON also carries a precomputed fitted grid so that
//! external tools can replot a curve without reimplementing the models.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{CountColumn, FitResult, TimeSeries};
use crate::error::AppError;
use crate::models::predict;

/// A saved fit file (JSON): run metadata plus one record per region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitFile {
    pub tool: String,
    pub column: CountColumn,
    pub fits: Vec<FitRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitRecord {
    pub result: FitResult,
    pub grid: FitGrid,
}

/// Fitted curve sampled on a dense day grid for quick replotting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitGrid {
    pub days: Vec<f64>,
    pub fitted: Vec<f64>,
}

/// Write prepared series to a CSV file.
pub fn write_prepared_csv(path: &Path, series: &[TimeSeries]) -> Result<(), AppError> {
    let mut file = File::create(path).map_err(|e| {
        AppError::Render(format!(
            "failed to create prepared CSV '{}': {e}",
            path.display()
        ))
    })?;

    writeln!(file, "region,date,count")
        .map_err(|e| AppError::Render(format!("failed to write prepared CSV header: {e}")))?;

    for s in series {
        for o in s.observations() {
            writeln!(file, "{},{},{:.4}", s.region(), o.date, o.count)
                .map_err(|e| AppError::Render(format!("failed to write prepared CSV row: {e}")))?;
        }
    }

    Ok(())
}

/// Write fit results (with sampled grids) to a JSON file.
pub fn write_fit_json(
    path: &Path,
    column: CountColumn,
    results: &[FitResult],
) -> Result<(), AppError> {
    let fits = results
        .iter()
        .map(|r| FitRecord {
            result: r.clone(),
            grid: build_grid(r, 201),
        })
        .collect();

    let file = FitFile {
        tool: "pandemic".to_string(),
        column,
        fits,
    };

    let out = File::create(path).map_err(|e| {
        AppError::Render(format!(
            "failed to create fit JSON '{}': {e}",
            path.display()
        ))
    })?;
    serde_json::to_writer_pretty(out, &file)
        .map_err(|e| AppError::Render(format!("failed to write fit JSON: {e}")))?;

    Ok(())
}

fn build_grid(result: &FitResult, n: usize) -> FitGrid {
    let n = n.max(2);
    let t_max = if result.span_days.is_finite() && result.span_days > 0.0 {
        result.span_days
    } else {
        1.0
    };

    let mut days = Vec::with_capacity(n);
    let mut fitted = Vec::with_capacity(n);
    for i in 0..n {
        let u = i as f64 / (n as f64 - 1.0);
        let t = u * t_max;
        days.push(t);
        fitted.push(predict(result.model.kind, t, &result.model.params));
    }

    FitGrid { days, fitted }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitQuality, FittedCurve, ModelKind, Observation, SeriesKind};
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pandemic_curves_export_{}_{name}", std::process::id()))
    }

    fn sample_result() -> FitResult {
        FitResult {
            region: "USA".into(),
            start_date: NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
            span_days: 10.0,
            model: FittedCurve {
                kind: ModelKind::Logistic,
                params: vec![1000.0, 0.3, 5.0],
            },
            quality: FitQuality {
                sse: 1.5,
                rmse: 0.37,
                n: 11,
                iterations: 12,
            },
        }
    }

    #[test]
    fn prepared_csv_has_one_row_per_observation() {
        let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let obs = (0..3)
            .map(|i| Observation {
                date: start + chrono::Duration::days(i),
                count: (i * 10) as f64,
            })
            .collect();
        let series = TimeSeries::new("USA".into(), SeriesKind::Cumulative, obs).unwrap();

        let path = temp_path("prepared.csv");
        write_prepared_csv(&path, std::slice::from_ref(&series)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 4);
        assert!(text.starts_with("region,date,count"));
        assert!(text.contains("USA,2020-03-02,10.0000"));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn fit_json_round_trips() {
        let path = temp_path("fit.json");
        write_fit_json(&path, CountColumn::Confirmed, &[sample_result()]).unwrap();

        let file = File::open(&path).unwrap();
        let parsed: FitFile = serde_json::from_reader(file).unwrap();
        assert_eq!(parsed.tool, "pandemic");
        assert_eq!(parsed.fits.len(), 1);
        assert_eq!(parsed.fits[0].result.region, "USA");
        assert_eq!(parsed.fits[0].grid.days.len(), 201);
        assert_eq!(parsed.fits[0].grid.days.len(), parsed.fits[0].grid.fitted.len());
        // Grid endpoints cover the fitted span.
        assert_eq!(parsed.fits[0].grid.days[0], 0.0);
        assert_eq!(*parsed.fits[0].grid.days.last().unwrap(), 10.0);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn unwritable_export_path_is_a_render_error() {
        let err =
            write_fit_json(Path::new("/nonexistent/dir/fit.json"), CountColumn::Confirmed, &[])
                .unwrap_err();
        assert!(matches!(err, AppError::Render(_)), "got {err:?}");
    }
}
