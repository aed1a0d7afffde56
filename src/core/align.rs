//! Merges per-fund NAV series onto one forward-filled date axis.

use crate::core::nav::Series;
use crate::core::table::AlignedTable;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Aligns every series on the union of their dates.
///
/// Each fund carries its last seen value forward into dates it has no value
/// for. Cells before a fund's first real observation stay absent, and a fund
/// without observations contributes an all-absent column. When every series
/// is empty the result has no rows.
pub fn align(series_by_fund: &BTreeMap<String, Series>) -> AlignedTable {
    let dates: Vec<NaiveDate> = series_by_fund
        .values()
        .flat_map(|s| s.observations().iter().map(|o| o.date))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let columns = series_by_fund
        .iter()
        .map(|(fund, series)| (fund.clone(), forward_fill(&dates, series)))
        .collect();

    debug!(
        rows = dates.len(),
        funds = series_by_fund.len(),
        "Aligned NAV series"
    );
    AlignedTable::from_parts(dates, columns)
}

/// Single sweep over the date axis with a cursor into the (sorted) series.
fn forward_fill(dates: &[NaiveDate], series: &Series) -> Vec<Option<f64>> {
    let observations = series.observations();
    let mut cursor = 0;
    let mut last_seen = None;

    dates
        .iter()
        .map(|date| {
            while cursor < observations.len() && observations[cursor].date <= *date {
                if let Some(nav) = observations[cursor].nav {
                    last_seen = Some(nav);
                }
                cursor += 1;
            }
            last_seen
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::nav::Observation;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn series(points: &[(&str, f64)]) -> Series {
        points.iter().map(|(date, nav)| (d(date), *nav)).collect()
    }

    #[test]
    fn test_dates_are_sorted_union_without_duplicates() {
        let input = BTreeMap::from([
            (
                "A".to_string(),
                series(&[("2024-01-01", 1.0), ("2024-01-03", 3.0)]),
            ),
            (
                "B".to_string(),
                series(&[("2024-01-02", 2.0), ("2024-01-03", 3.0)]),
            ),
        ]);

        let table = align(&input);
        assert_eq!(
            table.dates(),
            &[d("2024-01-01"), d("2024-01-02"), d("2024-01-03")]
        );
        assert!(table.dates().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_forward_fill_never_backfills() {
        let input = BTreeMap::from([
            (
                "A".to_string(),
                series(&[("2024-01-01", 100.0), ("2024-01-10", 110.0)]),
            ),
            (
                "B".to_string(),
                series(&[("2024-01-05", 50.0), ("2024-01-10", 55.0)]),
            ),
        ]);

        let table = align(&input);
        assert_eq!(table.column("A").unwrap(), &[Some(100.0), Some(100.0), Some(110.0)]);
        assert_eq!(table.column("B").unwrap(), &[None, Some(50.0), Some(55.0)]);
    }

    #[test]
    fn test_absent_observation_is_filled_from_previous_value() {
        let input = BTreeMap::from([(
            "A".to_string(),
            Series::from_observations(vec![
                Observation::new(d("2024-01-01"), 10.0),
                Observation {
                    date: d("2024-01-02"),
                    nav: None,
                },
                Observation::new(d("2024-01-03"), 12.0),
            ]),
        )]);

        let table = align(&input);
        assert_eq!(table.column("A").unwrap(), &[Some(10.0), Some(10.0), Some(12.0)]);
    }

    #[test]
    fn test_empty_series_contributes_absent_column() {
        let input = BTreeMap::from([
            ("A".to_string(), series(&[("2024-01-01", 1.0)])),
            ("Empty".to_string(), Series::default()),
        ]);

        let table = align(&input);
        assert_eq!(table.column("Empty").unwrap(), &[None]);
    }

    #[test]
    fn test_all_empty_series_give_zero_rows() {
        let input = BTreeMap::from([
            ("A".to_string(), Series::default()),
            ("B".to_string(), Series::default()),
        ]);

        let table = align(&input);
        assert!(table.is_empty());
        assert_eq!(table.funds().count(), 2);
    }

    #[test]
    fn test_realigning_aligned_table_is_a_no_op() {
        let input = BTreeMap::from([
            (
                "A".to_string(),
                series(&[("2024-01-01", 100.0), ("2024-01-10", 110.0)]),
            ),
            (
                "B".to_string(),
                series(&[("2024-01-05", 50.0), ("2024-01-12", 55.0)]),
            ),
        ]);

        let table = align(&input);
        let realigned = align(&table.to_series());
        assert_eq!(realigned, table);
    }
}
