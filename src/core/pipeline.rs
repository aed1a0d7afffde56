//! Fetch → align → window → normalise, with the terminal outcomes a caller
//! has to render instead of a table.

use crate::core::align::align;
use crate::core::config::{AppConfig, FundRef};
use crate::core::nav::{NavFetch, NavHistory, NavSource, Series};
use crate::core::normalize::normalize;
use crate::core::returns::{
    LatestNav, LookbackPeriod, ReturnsTable, anchors_from, annualised_returns, latest_navs,
    period_returns,
};
use crate::core::stats::{CorrelationMatrix, correlation_matrix};
use crate::core::table::AlignedTable;
use crate::core::window::{WindowSelection, select, select_common};
use anyhow::Result;
use chrono::{Duration, NaiveDate};
use futures::future::join_all;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Histories of the funds that returned data, keyed by display name, plus
/// the funds that had none.
#[derive(Debug, Default)]
pub struct FetchedFunds {
    pub histories: BTreeMap<String, NavHistory>,
    pub skipped: Vec<FundRef>,
}

impl FetchedFunds {
    pub fn series(&self) -> BTreeMap<String, Series> {
        self.histories
            .iter()
            .map(|(name, h)| (name.clone(), h.series.clone()))
            .collect()
    }
}

/// Fetches every fund concurrently. Funds without data are collected in
/// `skipped`; any fetch error fails the whole call.
pub async fn fetch_funds(
    source: &dyn NavSource,
    funds: &[FundRef],
    on_fetched: &(dyn Fn() + Sync),
) -> Result<FetchedFunds> {
    let futures = funds.iter().map(|fund| async move {
        let result = source.fetch_history(&fund.code).await;
        on_fetched();
        (fund, result)
    });

    let mut fetched = FetchedFunds::default();
    for (fund, result) in join_all(futures).await {
        match result? {
            NavFetch::Data(history) => {
                let mut name = fund.name.clone().unwrap_or_else(|| history.scheme_name.clone());
                if fetched.histories.contains_key(&name) {
                    name = format!("{name} ({})", fund.code);
                }
                fetched.histories.insert(name, history);
            }
            NavFetch::NoData => {
                warn!("No NAV data for scheme {}, skipping", fund.code);
                fetched.skipped.push(fund.clone());
            }
        }
    }
    Ok(fetched)
}

#[derive(Debug, Clone)]
pub struct CompareRequest {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Base-100 date; defaults to the first row of the window.
    pub reference: Option<NaiveDate>,
    pub lookback_days: u32,
    pub require_common_start: bool,
    pub periods: Vec<LookbackPeriod>,
}

impl CompareRequest {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            start: None,
            end: None,
            reference: None,
            lookback_days: config.window.lookback_days,
            require_common_start: config.window.require_common_start,
            periods: LookbackPeriod::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Comparison {
    /// Aligned NAVs inside the effective window.
    pub window: AlignedTable,
    pub normalized: AlignedTable,
    pub reference_date: NaiveDate,
    pub requested_start: NaiveDate,
    pub end: NaiveDate,
    pub adjusted: bool,
    pub effective_start: NaiveDate,
    /// Period returns over the full history, not just the window.
    pub returns: ReturnsTable,
    pub annualised: ReturnsTable,
    pub latest: Vec<LatestNav>,
    pub correlation: CorrelationMatrix,
    pub skipped: Vec<FundRef>,
}

#[derive(Debug, Clone)]
pub enum ComparisonOutcome {
    Ready(Box<Comparison>),
    /// Every selected fund came back without data.
    AllFundsEmpty { skipped: Vec<FundRef> },
    /// The funds never have data together inside the requested window.
    EmptyWindow {
        start: NaiveDate,
        end: NaiveDate,
        skipped: Vec<FundRef>,
    },
}

/// Runs the comparison over already fetched funds.
pub fn compare_fetched(fetched: FetchedFunds, request: &CompareRequest) -> Result<ComparisonOutcome> {
    let FetchedFunds { histories, skipped } = fetched;
    if histories.is_empty() {
        return Ok(ComparisonOutcome::AllFundsEmpty { skipped });
    }

    let series = histories
        .into_iter()
        .map(|(name, h)| (name, h.series))
        .collect();
    let aligned = align(&series);
    let Some(last) = aligned.last_date() else {
        return Ok(ComparisonOutcome::AllFundsEmpty { skipped });
    };

    let end = request.end.unwrap_or(last);
    let start = request
        .start
        .unwrap_or_else(|| {
            end.checked_sub_signed(Duration::days(i64::from(request.lookback_days)))
                .unwrap_or(NaiveDate::MIN)
        });

    let WindowSelection {
        table: window,
        adjusted,
        effective_start,
    } = if request.require_common_start {
        select_common(&aligned, start, end)
    } else {
        select(&aligned, start, end)
    };
    let (Some(effective_start), Some(first_row)) = (effective_start, window.first_date()) else {
        return Ok(ComparisonOutcome::EmptyWindow {
            start,
            end,
            skipped,
        });
    };
    if adjusted {
        warn!(%start, %effective_start, "Comparison window adjusted");
    }

    let reference_date = request
        .reference
        .filter(|r| window.position(*r).is_some())
        .unwrap_or(first_row);
    let normalized = normalize(&window, reference_date);

    let anchors = anchors_from(last, &request.periods);
    let returns = period_returns(&aligned, &anchors);
    let annualised = annualised_returns(&aligned, &anchors)?;
    let latest = latest_navs(&aligned);
    let correlation = correlation_matrix(&window);

    debug!(
        rows = window.len(),
        %reference_date,
        "Comparison ready"
    );
    Ok(ComparisonOutcome::Ready(Box::new(Comparison {
        window,
        normalized,
        reference_date,
        requested_start: start,
        end,
        adjusted,
        effective_start,
        returns,
        annualised,
        latest,
        correlation,
        skipped,
    })))
}

pub async fn compare(
    source: &dyn NavSource,
    funds: &[FundRef],
    request: &CompareRequest,
    on_fetched: &(dyn Fn() + Sync),
) -> Result<ComparisonOutcome> {
    let fetched = fetch_funds(source, funds, on_fetched).await?;
    compare_fetched(fetched, request)
}
