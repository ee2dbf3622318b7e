//! Series preparation: gap filling and cumulative-to-daily conversion.
//!
//! Preparation never reorders dates and is idempotent: a prepared series run
//! through the same options again comes back unchanged. Gap filling makes
//! the date axis contiguous (policy permitting) and the `SeriesKind` tag on
//! the series makes the daily conversion a no-op the second time around.

use chrono::Duration;
use tracing::warn;

use crate::domain::{GapFill, Observation, SeriesKind, TimeSeries};
use crate::error::AppError;

/// Shortest series worth preparing; anything smaller cannot be fitted or
/// meaningfully interpolated.
pub const MIN_SERIES_LEN: usize = 2;

#[derive(Debug, Clone)]
pub struct PrepareOptions {
    pub gap_fill: GapFill,
    /// Convert cumulative totals to daily deltas.
    pub daily: bool,
}

/// Produce a cleaned series according to the options.
pub fn prepare_series(series: &TimeSeries, opts: &PrepareOptions) -> Result<TimeSeries, AppError> {
    if series.len() < MIN_SERIES_LEN {
        return Err(AppError::Prepare(format!(
            "region '{}': series has {} point(s), need at least {MIN_SERIES_LEN}",
            series.region(),
            series.len()
        )));
    }

    let filled = fill_gaps(series.observations(), opts.gap_fill);

    let (kind, observations) = if opts.daily && series.kind() == SeriesKind::Cumulative {
        (SeriesKind::Daily, to_daily(series.region(), &filled))
    } else {
        (series.kind(), filled)
    };

    TimeSeries::new(series.region().to_string(), kind, observations)
        .map_err(|msg| AppError::Prepare(format!("region '{}': {msg}", series.region())))
}

/// Fill missing dates between consecutive observations per the policy.
///
/// Input dates are strictly increasing (series invariant), so inserted dates
/// keep the output strictly increasing as well.
fn fill_gaps(obs: &[Observation], policy: GapFill) -> Vec<Observation> {
    if matches!(policy, GapFill::Drop) || obs.len() < 2 {
        return obs.to_vec();
    }

    let mut out = Vec::with_capacity(obs.len());
    out.push(obs[0]);
    for w in obs.windows(2) {
        let (a, b) = (w[0], w[1]);
        let span = (b.date - a.date).num_days();
        for offset in 1..span {
            let date = a.date + Duration::days(offset);
            let count = match policy {
                GapFill::ZeroFill => 0.0,
                GapFill::LinearInterpolate => {
                    let u = offset as f64 / span as f64;
                    a.count + u * (b.count - a.count)
                }
                GapFill::Drop => unreachable!("drop policy returns early"),
            };
            out.push(Observation { date, count });
        }
        out.push(b);
    }
    out
}

/// Convert cumulative totals to daily deltas. The first daily value is the
/// first cumulative count itself.
fn to_daily(region: &str, obs: &[Observation]) -> Vec<Observation> {
    let mut out = Vec::with_capacity(obs.len());
    let mut prev = 0.0;
    let mut clamped = 0usize;
    for o in obs {
        let mut delta = o.count - prev;
        if delta < 0.0 {
            // Upstream data corrections occasionally lower a cumulative
            // total; a negative daily count is meaningless, so clamp.
            delta = 0.0;
            clamped += 1;
        }
        out.push(Observation {
            date: o.date,
            count: delta,
        });
        prev = o.count;
    }
    if clamped > 0 {
        warn!(region, clamped, "negative daily deltas clamped to zero");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, day).unwrap()
    }

    fn series(pairs: &[(u32, f64)]) -> TimeSeries {
        let obs = pairs
            .iter()
            .map(|&(day, count)| Observation {
                date: d(day),
                count,
            })
            .collect();
        TimeSeries::new("USA".into(), SeriesKind::Cumulative, obs).unwrap()
    }

    #[test]
    fn zero_fill_inserts_zero_counts() {
        let opts = PrepareOptions {
            gap_fill: GapFill::ZeroFill,
            daily: false,
        };
        let out = prepare_series(&series(&[(1, 10.0), (4, 40.0)]), &opts).unwrap();
        let counts: Vec<f64> = out.observations().iter().map(|o| o.count).collect();
        assert_eq!(counts, vec![10.0, 0.0, 0.0, 40.0]);
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn linear_interpolation_fills_intermediate_values() {
        let opts = PrepareOptions {
            gap_fill: GapFill::LinearInterpolate,
            daily: false,
        };
        let out = prepare_series(&series(&[(1, 10.0), (4, 40.0)]), &opts).unwrap();
        let counts: Vec<f64> = out.observations().iter().map(|o| o.count).collect();
        assert_eq!(counts, vec![10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn drop_policy_leaves_gaps() {
        let opts = PrepareOptions {
            gap_fill: GapFill::Drop,
            daily: false,
        };
        let out = prepare_series(&series(&[(1, 10.0), (4, 40.0)]), &opts).unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn preparation_is_idempotent() {
        for gap_fill in [GapFill::ZeroFill, GapFill::LinearInterpolate, GapFill::Drop] {
            for daily in [false, true] {
                let opts = PrepareOptions { gap_fill, daily };
                let input = series(&[(1, 5.0), (2, 8.0), (5, 20.0)]);
                let once = prepare_series(&input, &opts).unwrap();
                let twice = prepare_series(&once, &opts).unwrap();
                assert_eq!(once, twice, "gap_fill={gap_fill:?} daily={daily}");
            }
        }
    }

    #[test]
    fn daily_conversion_takes_deltas() {
        let opts = PrepareOptions {
            gap_fill: GapFill::Drop,
            daily: true,
        };
        let out = prepare_series(&series(&[(1, 5.0), (2, 8.0), (3, 8.0), (4, 20.0)]), &opts)
            .unwrap();
        let counts: Vec<f64> = out.observations().iter().map(|o| o.count).collect();
        assert_eq!(counts, vec![5.0, 3.0, 0.0, 12.0]);
        assert_eq!(out.kind(), SeriesKind::Daily);
    }

    #[test]
    fn daily_conversion_clamps_corrections() {
        let opts = PrepareOptions {
            gap_fill: GapFill::Drop,
            daily: true,
        };
        let out = prepare_series(&series(&[(1, 10.0), (2, 8.0)]), &opts).unwrap();
        let counts: Vec<f64> = out.observations().iter().map(|o| o.count).collect();
        assert_eq!(counts, vec![10.0, 0.0]);
    }

    #[test]
    fn short_series_is_rejected() {
        let opts = PrepareOptions {
            gap_fill: GapFill::ZeroFill,
            daily: false,
        };
        let err = prepare_series(&series(&[(1, 10.0)]), &opts).unwrap_err();
        assert!(matches!(err, AppError::Prepare(_)), "got {err:?}");
    }

    #[test]
    fn dates_are_never_reordered() {
        let opts = PrepareOptions {
            gap_fill: GapFill::LinearInterpolate,
            daily: true,
        };
        let out = prepare_series(&series(&[(2, 1.0), (6, 9.0), (9, 12.0)]), &opts).unwrap();
        let dates: Vec<_> = out.observations().iter().map(|o| o.date).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(dates, sorted);
    }
}
