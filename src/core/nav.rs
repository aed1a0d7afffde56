//! NAV observations and the abstractions used to source them

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single NAV data point for one fund. The value may be absent when the
/// source published a date without a usable NAV.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub nav: Option<f64>,
}

impl Observation {
    pub fn new(date: NaiveDate, nav: f64) -> Self {
        Self {
            date,
            nav: Some(nav),
        }
    }
}

/// Date-ordered observations for one fund, with unique dates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    observations: Vec<Observation>,
}

impl Series {
    /// Builds a series from observations in any order. Observations are sorted
    /// by date and, when a date repeats, the last one supplied wins.
    pub fn from_observations(mut observations: Vec<Observation>) -> Self {
        observations.reverse();
        observations.sort_by_key(|o| o.date);
        observations.dedup_by_key(|o| o.date);
        Self { observations }
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.date)
    }

    /// Observations that carry a value, as plain `(date, nav)` pairs.
    pub fn values(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.observations
            .iter()
            .filter_map(|o| o.nav.map(|nav| (o.date, nav)))
    }
}

impl FromIterator<(NaiveDate, f64)> for Series {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, f64)>>(iter: I) -> Self {
        Self::from_observations(
            iter.into_iter()
                .map(|(date, nav)| Observation::new(date, nav))
                .collect(),
        )
    }
}

/// Fund metadata together with its NAV history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavHistory {
    pub scheme_code: String,
    pub scheme_name: String,
    pub fund_house: Option<String>,
    pub category: Option<String>,
    pub series: Series,
}

/// Result of asking a source for a fund's history. A fund without any
/// published NAV is a normal outcome, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NavFetch {
    Data(NavHistory),
    NoData,
}

/// An entry of the fund catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundListing {
    pub scheme_code: String,
    pub scheme_name: String,
}

#[async_trait]
pub trait NavSource: Send + Sync {
    async fn fetch_history(&self, scheme_code: &str) -> Result<NavFetch>;
}

#[async_trait]
pub trait FundCatalog: Send + Sync {
    async fn list_funds(&self) -> Result<Vec<FundListing>>;

    /// Case-insensitive substring search over scheme names and codes.
    async fn search(&self, query: &str) -> Result<Vec<FundListing>> {
        let needle = query.to_lowercase();
        Ok(self
            .list_funds()
            .await?
            .into_iter()
            .filter(|f| {
                f.scheme_name.to_lowercase().contains(&needle) || f.scheme_code == query
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_series_sorts_and_keeps_last_duplicate() {
        let series = Series::from_observations(vec![
            Observation::new(d("2024-01-03"), 12.0),
            Observation::new(d("2024-01-01"), 10.0),
            Observation::new(d("2024-01-03"), 13.0),
        ]);

        assert_eq!(series.len(), 2);
        assert_eq!(series.first_date(), Some(d("2024-01-01")));
        assert_eq!(series.observations()[1].nav, Some(13.0));
    }

    #[test]
    fn test_values_skip_absent_navs() {
        let series = Series::from_observations(vec![
            Observation::new(d("2024-01-01"), 10.0),
            Observation {
                date: d("2024-01-02"),
                nav: None,
            },
        ]);

        let values: Vec<_> = series.values().collect();
        assert_eq!(values, vec![(d("2024-01-01"), 10.0)]);
    }

    struct StaticCatalog;

    #[async_trait]
    impl FundCatalog for StaticCatalog {
        async fn list_funds(&self) -> Result<Vec<FundListing>> {
            Ok(vec![
                FundListing {
                    scheme_code: "100".to_string(),
                    scheme_name: "Alpha Bluechip Fund".to_string(),
                },
                FundListing {
                    scheme_code: "200".to_string(),
                    scheme_name: "Beta Liquid Fund".to_string(),
                },
            ])
        }
    }

    #[tokio::test]
    async fn test_catalog_search_matches_name_and_code() {
        let catalog = StaticCatalog;

        let by_name = catalog.search("bluechip").await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].scheme_code, "100");

        let by_code = catalog.search("200").await.unwrap();
        assert_eq!(by_code[0].scheme_name, "Beta Liquid Fund");
    }
}
