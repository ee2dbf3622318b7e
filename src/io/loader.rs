//! Raw CSV ingest.
//!
//! Turns a directory of surveillance-dashboard snapshot CSVs (columns like
//! `Place, Region, Confirmed, Deaths, Recovered, Last Update`) into one
//! cumulative `TimeSeries` per region.
//!
//! Design goals:
//! - **Strict schema** for required columns, fail-fast on malformed rows
//!   (errors name the file and line)
//! - **Deterministic behavior**: files are visited in sorted order and
//!   duplicate region/date rows resolve to the larger count
//! - **Separation of concerns**: no preparation or fitting logic here

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use tracing::info;

use crate::domain::{CountColumn, Observation, SeriesKind, TimeSeries};
use crate::error::AppError;

/// Load every `*.csv` in `data_dir` and build one series per region.
///
/// Counts are tagged `SeriesKind::Cumulative`: dashboard snapshots report
/// running totals, not daily increments.
pub fn load_series(data_dir: &Path, column: CountColumn) -> Result<Vec<TimeSeries>, AppError> {
    let files = list_csv_files(data_dir)?;
    if files.is_empty() {
        return Err(AppError::Load(format!(
            "no CSV files found in '{}'",
            data_dir.display()
        )));
    }

    // region -> date -> count. BTreeMaps keep both regions and dates in
    // deterministic sorted order, which also guarantees the
    // strictly-increasing date invariant per series.
    let mut by_region: BTreeMap<String, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
    for path in &files {
        load_file(path, column, &mut by_region)?;
    }

    let series = by_region
        .into_iter()
        .map(|(region, dated)| {
            let observations = dated
                .into_iter()
                .map(|(date, count)| Observation { date, count })
                .collect();
            TimeSeries::new(region.clone(), SeriesKind::Cumulative, observations)
                .map_err(|msg| AppError::Load(format!("region '{region}': {msg}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    info!(
        files = files.len(),
        regions = series.len(),
        column = column.header(),
        "loaded case-count data"
    );
    Ok(series)
}

fn list_csv_files(data_dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let entries = std::fs::read_dir(data_dir).map_err(|e| {
        AppError::Load(format!(
            "failed to read data directory '{}': {e}",
            data_dir.display()
        ))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            AppError::Load(format!(
                "failed to read data directory '{}': {e}",
                data_dir.display()
            ))
        })?;
        let path = entry.path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn load_file(
    path: &Path,
    column: CountColumn,
    by_region: &mut BTreeMap<String, BTreeMap<NaiveDate, f64>>,
) -> Result<(), AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::Load(format!("failed to open '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::Load(format!("'{}': failed to read headers: {e}", path.display())))?
        .clone();
    let header_map = build_header_map(&headers);

    let region_idx = find_column(&header_map, &["place", "region", "country"]).ok_or_else(|| {
        AppError::Load(format!(
            "'{}': missing a region column (`place`, `region`, or `country`)",
            path.display()
        ))
    })?;
    let date_idx = find_column(&header_map, &["last update", "last_update", "date"]).ok_or_else(
        || {
            AppError::Load(format!(
                "'{}': missing a date column (`last update` or `date`)",
                path.display()
            ))
        },
    )?;
    let count_idx = find_column(&header_map, &[column.header()]).ok_or_else(|| {
        AppError::Load(format!(
            "'{}': missing `{}` column",
            path.display(),
            column.header()
        ))
    })?;

    for (idx, result) in reader.records().enumerate() {
        // +2 because:
        // - records() starts at line 1 after headers
        // - CSV is 1-based line numbers
        let line = idx + 2;
        let record = result
            .map_err(|e| AppError::Load(format!("'{}' line {line}: {e}", path.display())))?;

        let (region, date, count) = parse_row(&record, region_idx, date_idx, count_idx)
            .map_err(|msg| AppError::Load(format!("'{}' line {line}: {msg}", path.display())))?;

        // Snapshots taken within the same day supersede earlier ones; for
        // cumulative totals the larger value wins.
        by_region
            .entry(region)
            .or_default()
            .entry(date)
            .and_modify(|c| {
                if count > *c {
                    *c = count;
                }
            })
            .or_insert(count);
    }

    Ok(())
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on
    // the first header (e.g. "﻿place"). If we don't strip it, schema
    // validation will incorrectly report missing columns.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn find_column(header_map: &HashMap<String, usize>, aliases: &[&str]) -> Option<usize> {
    aliases
        .iter()
        .find_map(|alias| header_map.get(*alias).copied())
}

fn parse_row(
    record: &StringRecord,
    region_idx: usize,
    date_idx: usize,
    count_idx: usize,
) -> Result<(String, NaiveDate, f64), String> {
    let region = record
        .get(region_idx)
        .filter(|s| !s.is_empty())
        .ok_or("missing region value")?
        .to_string();
    let date = parse_date(record.get(date_idx).ok_or("missing date value")?)?;
    let count = parse_count(record.get(count_idx).ok_or("missing count value")?)?;
    Ok((region, date, count))
}

/// Parse the handful of date formats seen in dashboard exports.
fn parse_date(s: &str) -> Result<NaiveDate, String> {
    for fmt in ["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    for fmt in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%m/%d/%Y %H:%M",
        "%m/%d/%y %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    Err(format!("unparseable date '{s}'"))
}

/// Parse a count cell, tolerating `,` thousands separators.
fn parse_count(s: &str) -> Result<f64, String> {
    let cleaned = s.replace(',', "");
    let v: f64 = cleaned
        .parse()
        .map_err(|_| format!("unparseable count '{s}'"))?;
    if !v.is_finite() || v < 0.0 {
        return Err(format!("negative or non-finite count '{s}'"));
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_data_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "pandemic_curves_loader_{tag}_{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_file(dir: &Path, name: &str, contents: &str) {
        let mut f = File::create(dir.join(name)).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn loads_sorted_series_per_region() {
        let dir = temp_data_dir("sorted");
        write_file(
            &dir,
            "snapshot_0.csv",
            "Place,Region,Confirmed,Deaths,Recovered,Last Update\n\
             USA,North America,\"1,234\",10,5,2020-03-15 23:53\n\
             Italy,Europe,900,30,20,2020-03-15 22:00\n",
        );
        write_file(
            &dir,
            "snapshot_1.csv",
            "Place,Region,Confirmed,Deaths,Recovered,Last Update\n\
             USA,North America,2500,20,9,2020-03-16 23:10\n\
             Italy,Europe,1500,60,40,2020-03-16 21:30\n",
        );

        let series = load_series(&dir, CountColumn::Confirmed).unwrap();
        assert_eq!(series.len(), 2);

        let usa = series.iter().find(|s| s.region() == "USA").unwrap();
        let (ts, ys) = usa.days_and_counts();
        assert_eq!(ts, vec![0.0, 1.0]);
        assert_eq!(ys, vec![1234.0, 2500.0]);
        assert_eq!(usa.kind(), SeriesKind::Cumulative);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn duplicate_dates_keep_the_larger_count() {
        let dir = temp_data_dir("dupes");
        write_file(
            &dir,
            "a.csv",
            "place,confirmed,last update\nUSA,500,2020-03-15\nUSA,800,2020-03-15\n",
        );
        write_file(
            &dir,
            "b.csv",
            "place,confirmed,last update\nUSA,600,2020-03-15\nUSA,900,2020-03-16\n",
        );

        let series = load_series(&dir, CountColumn::Confirmed).unwrap();
        let (_, ys) = series[0].days_and_counts();
        assert_eq!(ys, vec![800.0, 900.0]);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn selectable_count_column() {
        let dir = temp_data_dir("column");
        write_file(
            &dir,
            "a.csv",
            "place,confirmed,deaths,last update\nUSA,500,42,2020-03-15\n",
        );

        let series = load_series(&dir, CountColumn::Deaths).unwrap();
        let (_, ys) = series[0].days_and_counts();
        assert_eq!(ys, vec![42.0]);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn malformed_count_is_a_load_error() {
        let dir = temp_data_dir("badcount");
        write_file(
            &dir,
            "a.csv",
            "place,confirmed,last update\nUSA,not-a-number,2020-03-15\n",
        );

        let err = load_series(&dir, CountColumn::Confirmed).unwrap_err();
        assert!(matches!(err, AppError::Load(_)), "got {err:?}");
        assert!(err.to_string().contains("line 2"), "got {err}");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn malformed_date_is_a_load_error() {
        let dir = temp_data_dir("baddate");
        write_file(
            &dir,
            "a.csv",
            "place,confirmed,last update\nUSA,500,someday\n",
        );

        let err = load_series(&dir, CountColumn::Confirmed).unwrap_err();
        assert!(err.to_string().contains("unparseable date"), "got {err}");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_directory_is_a_load_error() {
        let err = load_series(Path::new("/nonexistent/pandemic-data"), CountColumn::Confirmed)
            .unwrap_err();
        assert!(matches!(err, AppError::Load(_)), "got {err:?}");
    }

    #[test]
    fn empty_directory_is_a_load_error() {
        let dir = temp_data_dir("empty");
        let err = load_series(&dir, CountColumn::Confirmed).unwrap_err();
        assert!(err.to_string().contains("no CSV files"), "got {err}");
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
