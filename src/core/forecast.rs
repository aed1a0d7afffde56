//! Forecasting abstractions and a baseline linear-trend model

use crate::core::nav::Series;
use anyhow::{Result, bail};
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use tracing::debug;

pub const MIN_HORIZON_DAYS: u32 = 30;
pub const MAX_HORIZON_DAYS: u32 = 180;
pub const DEFAULT_HORIZON_DAYS: u32 = 90;

/// z-score of a two-sided 95% interval.
const INTERVAL_Z: f64 = 1.96;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastOptions {
    pub horizon_days: u32,
    pub weekly_seasonality: bool,
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self {
            horizon_days: DEFAULT_HORIZON_DAYS,
            weekly_seasonality: false,
        }
    }
}

impl ForecastOptions {
    /// Horizon is clamped to the supported range.
    pub fn new(horizon_days: u32, weekly_seasonality: bool) -> Self {
        Self {
            horizon_days: horizon_days.clamp(MIN_HORIZON_DAYS, MAX_HORIZON_DAYS),
            weekly_seasonality,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

pub trait Forecaster: Send + Sync {
    /// Fits the model on a fund's raw NAV series and predicts every calendar
    /// day after its last observation up to the horizon.
    fn fit_predict(&self, series: &Series, options: &ForecastOptions)
    -> Result<Vec<ForecastPoint>>;
}

/// Ordinary least squares on days since the first observation, with an
/// optional additive weekday effect.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinearTrendForecaster;

impl Forecaster for LinearTrendForecaster {
    fn fit_predict(
        &self,
        series: &Series,
        options: &ForecastOptions,
    ) -> Result<Vec<ForecastPoint>> {
        let points: Vec<(NaiveDate, f64)> = series.values().collect();
        let (Some((origin, _)), Some((last, _))) = (points.first(), points.last()) else {
            bail!("Cannot forecast an empty series");
        };
        if points.len() < 2 {
            bail!("Need at least two observations to forecast, got {}", points.len());
        }
        let (origin, last) = (*origin, *last);

        let xs: Vec<f64> = points
            .iter()
            .map(|(date, _)| (*date - origin).num_days() as f64)
            .collect();
        let ys: Vec<f64> = points.iter().map(|(_, nav)| *nav).collect();
        let (slope, intercept) = least_squares(&xs, &ys);

        let trend = |x: f64| intercept + slope * x;
        let residuals: Vec<f64> = xs.iter().zip(&ys).map(|(x, y)| y - trend(*x)).collect();

        let mut weekday_effect = [0.0; 7];
        if options.weekly_seasonality {
            let mut sums = [0.0; 7];
            let mut counts = [0usize; 7];
            for ((date, _), residual) in points.iter().zip(&residuals) {
                let day = date.weekday().num_days_from_monday() as usize;
                sums[day] += residual;
                counts[day] += 1;
            }
            for day in 0..7 {
                if counts[day] > 0 {
                    weekday_effect[day] = sums[day] / counts[day] as f64;
                }
            }
        }

        let fitted_residuals: Vec<f64> = points
            .iter()
            .zip(&residuals)
            .map(|((date, _), r)| r - weekday_effect[date.weekday().num_days_from_monday() as usize])
            .collect();
        let sigma = (fitted_residuals.iter().map(|r| r * r).sum::<f64>()
            / fitted_residuals.len() as f64)
            .sqrt();

        debug!(slope, intercept, sigma, "Fitted linear trend");

        Ok((1..=i64::from(options.horizon_days))
            .map(|offset| {
                let date = last + Duration::days(offset);
                let x = (date - origin).num_days() as f64;
                let yhat =
                    trend(x) + weekday_effect[date.weekday().num_days_from_monday() as usize];
                ForecastPoint {
                    date,
                    yhat,
                    yhat_lower: yhat - INTERVAL_Z * sigma,
                    yhat_upper: yhat + INTERVAL_Z * sigma,
                }
            })
            .collect())
    }
}

/// Returns `(slope, intercept)` of the least-squares line through the points.
fn least_squares(xs: &[f64], ys: &[f64]) -> (f64, f64) {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        sxy += (x - mean_x) * (y - mean_y);
        sxx += (x - mean_x) * (x - mean_x);
    }

    let slope = if sxx == 0.0 { 0.0 } else { sxy / sxx };
    (slope, mean_y - slope * mean_x)
}
