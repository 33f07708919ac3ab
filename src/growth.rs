//! Exponential growth estimation.
//!
//! Both estimators fit `ln(value) = slope * t + intercept` by ordinary least
//! squares over integer steps `t = 0..days_fit-1`:
//!
//! - `fit_trailing` fits the last `days_fit` values once and reports a doubling
//!   time plus a two-point curve extrapolated past the window
//! - `rate_curve` slides the same fit along the whole series and reports
//!   `slope / ln 2` (doublings per day) per window
//!
//! Inputs are already derived per `MetricDefinition`; nothing here touches a
//! `Dataset`.

use std::f64::consts::LN_2;

use chrono::{Duration, NaiveDate};

use crate::domain::{GrowthFit, RateSample};
use crate::error::FitError;
use crate::math::fit_line;

/// Trailing-window fit used when the caller has no preference.
pub const DEFAULT_DAYS_FIT: usize = 7;

/// Extrapolation horizon past the fit window.
pub const DEFAULT_DAYS_EXTRAPOLATE: usize = 7;

/// Slopes at or above this (per day) are treated as noise in the rate curve.
pub const DEFAULT_RATE_THRESHOLD: f64 = 10.0;

/// Fit the last `days_fit` values.
///
/// The returned curve starts at the first day of the window and ends
/// `days_fit + days_extrapolate` days later. A negative slope gives a negative
/// doubling time (a halving time).
pub fn fit_trailing(
    dates: &[NaiveDate],
    values: &[f64],
    days_fit: usize,
    days_extrapolate: usize,
) -> Result<GrowthFit, FitError> {
    if days_fit < 2 {
        return Err(FitError::InvalidWindow { days_fit });
    }
    let n = dates.len().min(values.len());
    if n < days_fit {
        return Err(FitError::TooShort {
            needed: days_fit,
            got: n,
        });
    }

    let start = n - days_fit;
    let (intercept, slope) = fit_log_linear(&values[start..n], start)?;

    let horizon = (days_fit + days_extrapolate) as f64;
    let anchor = dates[start];
    let end = anchor + Duration::days((days_fit + days_extrapolate) as i64);

    Ok(GrowthFit {
        curve_dates: [anchor, end],
        curve_values: [intercept.exp(), (slope * horizon + intercept).exp()],
        slope,
        intercept,
        doubling_time: LN_2 / slope,
    })
}

/// Sliding-window growth rate.
///
/// For a series of length `M` this yields `M - days_fit` samples (none when
/// `M <= days_fit`): window `k` covers `values[k..k + days_fit]` and is dated
/// at its last day. Windows with non-positive values, or whose slope reaches
/// `threshold`, give `rate: None`.
pub fn rate_curve(dates: &[NaiveDate], values: &[f64], days_fit: usize, threshold: f64) -> Vec<RateSample> {
    let n = dates.len().min(values.len());
    if days_fit < 2 || n <= days_fit {
        return Vec::new();
    }

    (0..n - days_fit)
        .map(|k| {
            let rate = fit_log_linear(&values[k..k + days_fit], k)
                .ok()
                .and_then(|(_, slope)| (slope < threshold).then_some(slope / LN_2));
            RateSample {
                date: dates[k + days_fit - 1],
                rate,
            }
        })
        .collect()
}

/// OLS of `ln(window[t])` on `t`. `offset` only locates errors in the full series.
fn fit_log_linear(window: &[f64], offset: usize) -> Result<(f64, f64), FitError> {
    let mut ts = Vec::with_capacity(window.len());
    let mut logs = Vec::with_capacity(window.len());
    for (t, &value) in window.iter().enumerate() {
        if !(value.is_finite() && value > 0.0) {
            return Err(FitError::NonPositive {
                index: offset + t,
                value,
            });
        }
        ts.push(t as f64);
        logs.push(value.ln());
    }

    fit_line(&ts, &logs).ok_or(FitError::Singular)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        (0..n).map(|i| start + Duration::days(i as i64)).collect()
    }

    fn doubling_every(days: f64, n: usize) -> Vec<f64> {
        (0..n).map(|t| 100.0 * 2f64.powf(t as f64 / days)).collect()
    }

    #[test]
    fn exponential_series_doubles_in_five_days() {
        let values = doubling_every(5.0, 20);
        let fit = fit_trailing(&dates(20), &values, 7, 7).unwrap();
        assert!((fit.doubling_time - 5.0).abs() < 1e-6, "doubling={}", fit.doubling_time);
        assert!((fit.slope - LN_2 / 5.0).abs() < 1e-9);
    }

    #[test]
    fn decaying_series_has_negative_doubling_time() {
        let values: Vec<f64> = (0..10).map(|t| 1000.0 * 0.5f64.powf(t as f64 / 4.0)).collect();
        let fit = fit_trailing(&dates(10), &values, 5, 0).unwrap();
        assert!(fit.doubling_time < 0.0);
        assert!((fit.doubling_time + 4.0).abs() < 1e-6, "doubling={}", fit.doubling_time);
    }

    #[test]
    fn curve_is_anchored_at_window_start() {
        let d = dates(12);
        let values = doubling_every(5.0, 12);
        let fit = fit_trailing(&d, &values, 5, 3).unwrap();

        assert_eq!(fit.curve_dates[0], d[7]);
        assert_eq!(fit.curve_dates[1], d[7] + Duration::days(8));
        assert!((fit.curve_values[0] - values[7]).abs() < 1e-6);
        let expected_end = values[7] * 2f64.powf(8.0 / 5.0);
        assert!((fit.curve_values[1] - expected_end).abs() < 1e-6);
    }

    #[test]
    fn non_positive_window_is_domain_error() {
        let values = vec![5.0, 4.0, 0.0, 3.0, 2.0];
        let err = fit_trailing(&dates(5), &values, 4, 2).unwrap_err();
        assert_eq!(err, FitError::NonPositive { index: 2, value: 0.0 });
    }

    #[test]
    fn zeros_before_the_window_are_ignored() {
        let mut values = vec![0.0, 0.0, 0.0];
        values.extend(doubling_every(3.0, 6));
        let fit = fit_trailing(&dates(9), &values, 6, 0).unwrap();
        assert!((fit.doubling_time - 3.0).abs() < 1e-6);
    }

    #[test]
    fn too_short_and_invalid_windows() {
        assert_eq!(
            fit_trailing(&dates(3), &[1.0, 2.0, 3.0], 5, 0).unwrap_err(),
            FitError::TooShort { needed: 5, got: 3 }
        );
        assert_eq!(
            fit_trailing(&dates(3), &[1.0, 2.0, 3.0], 1, 0).unwrap_err(),
            FitError::InvalidWindow { days_fit: 1 }
        );
    }

    #[test]
    fn flat_series_has_infinite_doubling_time() {
        let fit = fit_trailing(&dates(5), &[7.0; 5], 5, 0).unwrap();
        assert!(fit.slope.abs() < 1e-12);
        assert!(fit.doubling_time.is_infinite() || fit.doubling_time.abs() > 1e9);
    }

    #[test]
    fn rate_curve_length_is_m_minus_f() {
        let values = doubling_every(5.0, 15);
        let curve = rate_curve(&dates(15), &values, 5, DEFAULT_RATE_THRESHOLD);
        assert_eq!(curve.len(), 10);
        for sample in &curve {
            let rate = sample.rate.unwrap();
            assert!((rate - 0.2).abs() < 1e-9, "rate={rate}");
        }
        assert_eq!(curve[0].date, dates(15)[4]);
        assert_eq!(curve[9].date, dates(15)[13]);
    }

    #[test]
    fn rate_curve_short_series_is_empty() {
        assert!(rate_curve(&dates(3), &[1.0, 2.0, 4.0], 5, DEFAULT_RATE_THRESHOLD).is_empty());
        assert!(rate_curve(&dates(5), &[1.0; 5], 5, DEFAULT_RATE_THRESHOLD).is_empty());
    }

    #[test]
    fn rate_curve_marks_wild_and_undefined_windows() {
        // Window 0 is a jump from 1 to e^30 in one step; window 1 hits a zero.
        let values = vec![1.0, 30f64.exp(), 0.0, 5.0, 6.0, 7.0];
        let curve = rate_curve(&dates(6), &values, 2, DEFAULT_RATE_THRESHOLD);
        assert_eq!(curve.len(), 4);
        assert_eq!(curve[0].rate, None);
        assert_eq!(curve[1].rate, None);
        assert_eq!(curve[2].rate, None);
        let expected = (6.0f64 / 5.0).ln() / LN_2;
        assert!((curve[3].rate.unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn slope_equal_to_threshold_is_undefined() {
        let values = vec![1.0, 2.0, 4.0];
        let slope = fit_trailing(&dates(2), &values[..2], 2, 0).unwrap().slope;
        assert!((slope - LN_2).abs() < 1e-9);

        let at = rate_curve(&dates(3), &values, 2, slope);
        assert_eq!(at.len(), 1);
        assert_eq!(at[0].rate, None);

        let above = rate_curve(&dates(3), &values, 2, slope + 1e-9);
        assert!((above[0].rate.unwrap() - 1.0).abs() < 1e-9);
    }
}
