//! Point-to-point returns over lookback periods.

use crate::core::table::AlignedTable;
use anyhow::{Result, anyhow};
use chrono::{Duration, Months, NaiveDate};
use rust_decimal::{Decimal, prelude::*};
use rust_finprim::rate::cagr;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum LookbackPeriod {
    OneWeek,
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    ThreeYears,
    FiveYears,
}

impl LookbackPeriod {
    pub const ALL: [LookbackPeriod; 7] = [
        LookbackPeriod::OneWeek,
        LookbackPeriod::OneMonth,
        LookbackPeriod::ThreeMonths,
        LookbackPeriod::SixMonths,
        LookbackPeriod::OneYear,
        LookbackPeriod::ThreeYears,
        LookbackPeriod::FiveYears,
    ];

    /// Calendar date this period reaches back to from `latest`. Month
    /// arithmetic clamps to the end of shorter months.
    pub fn anchor_from(&self, latest: NaiveDate) -> Option<NaiveDate> {
        match self {
            LookbackPeriod::OneWeek => latest.checked_sub_signed(Duration::days(7)),
            LookbackPeriod::OneMonth => latest.checked_sub_months(Months::new(1)),
            LookbackPeriod::ThreeMonths => latest.checked_sub_months(Months::new(3)),
            LookbackPeriod::SixMonths => latest.checked_sub_months(Months::new(6)),
            LookbackPeriod::OneYear => latest.checked_sub_months(Months::new(12)),
            LookbackPeriod::ThreeYears => latest.checked_sub_months(Months::new(36)),
            LookbackPeriod::FiveYears => latest.checked_sub_months(Months::new(60)),
        }
    }
}

impl Display for LookbackPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                LookbackPeriod::OneWeek => "1-W",
                LookbackPeriod::OneMonth => "1-M",
                LookbackPeriod::ThreeMonths => "3-M",
                LookbackPeriod::SixMonths => "6-M",
                LookbackPeriod::OneYear => "1-Y",
                LookbackPeriod::ThreeYears => "3-Y",
                LookbackPeriod::FiveYears => "5-Y",
            }
        )
    }
}

impl FromStr for LookbackPeriod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace('-', "").as_str() {
            "1W" => Ok(LookbackPeriod::OneWeek),
            "1M" => Ok(LookbackPeriod::OneMonth),
            "3M" => Ok(LookbackPeriod::ThreeMonths),
            "6M" => Ok(LookbackPeriod::SixMonths),
            "1Y" => Ok(LookbackPeriod::OneYear),
            "3Y" => Ok(LookbackPeriod::ThreeYears),
            "5Y" => Ok(LookbackPeriod::FiveYears),
            _ => Err(anyhow!("Invalid lookback period: {}", s)),
        }
    }
}

/// Labelled anchor dates for `periods`, measured back from `latest`.
pub fn anchors_from(latest: NaiveDate, periods: &[LookbackPeriod]) -> Vec<(String, NaiveDate)> {
    periods
        .iter()
        .filter_map(|p| p.anchor_from(latest).map(|anchor| (p.to_string(), anchor)))
        .collect()
}

/// Returns of every fund for one anchor. `None` means not available.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodReturn {
    pub label: String,
    pub anchor: NaiveDate,
    pub returns: BTreeMap<String, Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReturnsTable {
    pub periods: Vec<PeriodReturn>,
}

impl ReturnsTable {
    pub fn get(&self, label: &str, fund: &str) -> Option<f64> {
        self.periods
            .iter()
            .find(|p| p.label == label)
            .and_then(|p| p.returns.get(fund).copied().flatten())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.periods.iter().map(|p| p.label.as_str())
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn pct_change(from: Option<f64>, to: Option<f64>) -> Option<f64> {
    match (from, to) {
        (Some(from), Some(to)) if from != 0.0 => Some(round2((to / from - 1.0) * 100.0)),
        _ => None,
    }
}

/// Index of the most recent row dated on or before `anchor`, if any.
fn row_at_or_before(table: &AlignedTable, anchor: NaiveDate) -> Option<usize> {
    table.dates().partition_point(|d| *d <= anchor).checked_sub(1)
}

/// Percentage change from each anchor to the latest row, per fund, rounded
/// to two decimals.
///
/// Anchors may fall on non-trading days; the most recent row on or before the
/// anchor is used as the start price. An anchor before the first row is not
/// available for any fund.
pub fn period_returns(table: &AlignedTable, anchors: &[(String, NaiveDate)]) -> ReturnsTable {
    let latest_idx = table.len().checked_sub(1);

    let periods = anchors
        .iter()
        .map(|(label, anchor)| {
            let start_idx = row_at_or_before(table, *anchor);
            let returns = table
                .columns()
                .iter()
                .map(|(fund, column)| {
                    let change = match (start_idx, latest_idx) {
                        (Some(start), Some(latest)) => pct_change(column[start], column[latest]),
                        _ => None,
                    };
                    (fund.clone(), change)
                })
                .collect();
            PeriodReturn {
                label: label.clone(),
                anchor: *anchor,
                returns,
            }
        })
        .collect();

    ReturnsTable { periods }
}

/// Compound annual growth rate in percent for anchors at least a year
/// before the latest row. Shorter anchors are left out.
pub fn annualised_returns(
    table: &AlignedTable,
    anchors: &[(String, NaiveDate)],
) -> Result<ReturnsTable> {
    let Some(latest_date) = table.last_date() else {
        return Ok(ReturnsTable::default());
    };
    let latest_idx = table.len() - 1;

    let mut periods = Vec::new();
    for (label, anchor) in anchors {
        let Some(start_idx) = row_at_or_before(table, *anchor) else {
            continue;
        };
        let years = (latest_date - table.dates()[start_idx]).num_days() as f64 / 365.0;
        if years < 1.0 {
            continue;
        }

        let mut returns = BTreeMap::new();
        for (fund, column) in table.columns() {
            let rate = match (column[start_idx], column[latest_idx]) {
                (Some(begin), Some(end)) if begin > 0.0 => Some(annualise(begin, end, years)?),
                _ => None,
            };
            returns.insert(fund.clone(), rate);
        }
        periods.push(PeriodReturn {
            label: label.clone(),
            anchor: *anchor,
            returns,
        });
    }

    Ok(ReturnsTable { periods })
}

fn annualise(begin: f64, end: f64, years: f64) -> Result<f64> {
    let begin_bal = Decimal::from_f64(begin).ok_or_else(|| anyhow!("Invalid starting NAV"))?;
    let end_bal = Decimal::from_f64(end).ok_or_else(|| anyhow!("Invalid latest NAV"))?;
    let n_years = Decimal::from_f64(years).ok_or_else(|| anyhow!("Invalid duration"))?;

    let rate = cagr(begin_bal, end_bal, n_years);
    let percentage = (rate * Decimal::from(100))
        .to_f64()
        .ok_or_else(|| anyhow!("CAGR percentage conversion failed"))?;
    debug!("cagr: {begin_bal}, {end_bal}, {n_years} = {rate}");
    Ok(round2(percentage))
}

/// Latest NAV of a fund and its change against the previous row.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestNav {
    pub fund: String,
    pub date: NaiveDate,
    pub nav: Option<f64>,
    pub one_day_change: Option<f64>,
}

pub fn latest_navs(table: &AlignedTable) -> Vec<LatestNav> {
    let Some(date) = table.last_date() else {
        return Vec::new();
    };
    let latest_idx = table.len() - 1;
    let previous_idx = latest_idx.checked_sub(1);

    table
        .columns()
        .iter()
        .map(|(fund, column)| LatestNav {
            fund: fund.clone(),
            date,
            nav: column[latest_idx],
            one_day_change: previous_idx.and_then(|p| pct_change(column[p], column[latest_idx])),
        })
        .collect()
}
