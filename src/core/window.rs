//! Date-range selection over an aligned table, with automatic adjustment
//! to the first date on which every fund has data.

use crate::core::table::AlignedTable;
use chrono::NaiveDate;
use tracing::debug;

/// Outcome of restricting a table to a date range.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSelection {
    pub table: AlignedTable,
    /// True when the returned rows are not the plain `[start, end]` slice.
    pub adjusted: bool,
    /// Start date the returned rows were cut from. `None` only when no
    /// recovery was possible and the table is empty.
    pub effective_start: Option<NaiveDate>,
}

impl WindowSelection {
    /// No fund has data inside the requested range, even after adjustment.
    pub fn is_unrecoverable(&self) -> bool {
        self.effective_start.is_none()
    }

    fn unrecoverable(table: &AlignedTable) -> Self {
        Self {
            table: table.slice(NaiveDate::MAX, NaiveDate::MIN),
            adjusted: true,
            effective_start: None,
        }
    }
}

/// Latest of the per-fund first real observation dates: the earliest date on
/// which every fund that has any data at all has a value.
pub fn common_start(table: &AlignedTable) -> Option<NaiveDate> {
    table
        .funds()
        .filter_map(|fund| table.first_value_date(fund))
        .max()
}

/// Restricts `table` to `[start, end]`.
///
/// A non-empty slice is returned verbatim. Otherwise the range is retried
/// from [`common_start`]; when that lies after `end` (or no fund has data)
/// the selection is empty with no effective start.
pub fn select(table: &AlignedTable, start: NaiveDate, end: NaiveDate) -> WindowSelection {
    let sliced = table.slice(start, end);
    if !sliced.is_empty() {
        return WindowSelection {
            table: sliced,
            adjusted: false,
            effective_start: Some(start),
        };
    }

    match common_start(table) {
        Some(effective) if effective <= end => {
            debug!(%start, %end, %effective, "Requested window empty, moved start");
            WindowSelection {
                table: table.slice(effective, end),
                adjusted: true,
                effective_start: Some(effective),
            }
        }
        _ => {
            debug!(%start, %end, "No overlapping data for requested window");
            WindowSelection::unrecoverable(table)
        }
    }
}

/// Like [`select`], but additionally moves the start forward when some fund
/// has no real data yet at the first selected row, so every fund has a value
/// from the first row on.
pub fn select_common(table: &AlignedTable, start: NaiveDate, end: NaiveDate) -> WindowSelection {
    let selection = select(table, start, end);
    let Some(first_row) = selection.table.first_date() else {
        return selection;
    };

    match common_start(table) {
        Some(effective) if effective > first_row => {
            if effective > end {
                debug!(%start, %end, %effective, "Funds never overlap in requested window");
                return WindowSelection::unrecoverable(table);
            }
            debug!(%start, %end, %effective, "Moved window start to common start");
            WindowSelection {
                table: table.slice(effective, end),
                adjusted: true,
                effective_start: Some(effective),
            }
        }
        _ => selection,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::align::align;
    use crate::core::nav::Series;
    use std::collections::BTreeMap;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn series(points: &[(&str, f64)]) -> Series {
        points.iter().map(|(date, nav)| (d(date), *nav)).collect()
    }

    fn three_funds() -> AlignedTable {
        align(&BTreeMap::from([
            (
                "A".to_string(),
                series(&[("2024-01-01", 1.0), ("2024-01-12", 2.0)]),
            ),
            (
                "B".to_string(),
                series(&[("2024-01-05", 1.0), ("2024-01-12", 2.0)]),
            ),
            (
                "C".to_string(),
                series(&[("2024-01-10", 1.0), ("2024-01-12", 2.0)]),
            ),
        ]))
    }

    #[test]
    fn test_non_empty_slice_is_returned_verbatim() {
        let table = three_funds();

        let selection = select(&table, d("2024-01-01"), d("2024-01-10"));
        assert!(!selection.adjusted);
        assert_eq!(selection.table, table.slice(d("2024-01-01"), d("2024-01-10")));
        assert_eq!(selection.effective_start, Some(d("2024-01-01")));
    }

    #[test]
    fn test_empty_slice_moves_to_latest_first_observation() {
        let table = three_funds();

        let selection = select(&table, d("2024-01-02"), d("2024-01-11"));
        assert!(!selection.adjusted);
        assert_eq!(selection.table.dates(), &[d("2024-01-05"), d("2024-01-10")]);

        // Nothing after the 12th, so the range is retried from the 10th.
        let selection = select(&table, d("2024-01-13"), d("2024-01-31"));
        assert!(selection.adjusted);
        assert_eq!(selection.effective_start, Some(d("2024-01-10")));
        assert_eq!(selection.table.dates(), &[d("2024-01-10"), d("2024-01-12")]);
    }

    #[test]
    fn test_common_start_after_end_is_unrecoverable() {
        let table = three_funds();

        let selection = select(&table, d("2023-06-01"), d("2023-12-31"));
        assert!(selection.adjusted);
        assert!(selection.is_unrecoverable());
        assert!(selection.table.is_empty());

        let table = align(&BTreeMap::from([
            ("A".to_string(), series(&[("2024-03-01", 1.0)])),
            ("B".to_string(), series(&[("2024-03-05", 1.0)])),
        ]));
        let selection = select(&table, d("2024-03-02"), d("2024-03-04"));
        assert!(selection.adjusted);
        assert!(selection.is_unrecoverable());
    }

    #[test]
    fn test_adjusted_start_is_day_of_last_fund_to_start() {
        let table = three_funds();
        assert_eq!(common_start(&table), Some(d("2024-01-10")));

        let selection = select_common(&table, d("2023-12-25"), d("2024-01-31"));
        assert!(selection.adjusted);
        assert_eq!(selection.effective_start, Some(d("2024-01-10")));
        assert_eq!(selection.table.first_date(), Some(d("2024-01-10")));
    }

    #[test]
    fn test_select_common_reports_no_overlap() {
        let table = three_funds();
        let selection = select_common(&table, d("2024-01-01"), d("2024-01-06"));
        assert!(selection.adjusted);
        assert!(selection.is_unrecoverable());
    }

    #[test]
    fn test_empty_table_is_unrecoverable() {
        let table = align(&BTreeMap::from([("A".to_string(), Series::default())]));
        let selection = select(&table, d("2024-01-01"), d("2024-12-31"));
        assert!(selection.adjusted);
        assert!(selection.is_unrecoverable());
    }

    #[test]
    fn test_select_common_keeps_window_when_all_funds_present() {
        let table = three_funds();
        let selection = select_common(&table, d("2024-01-11"), d("2024-01-31"));
        assert!(!selection.adjusted);
        assert_eq!(selection.table.first_date(), Some(d("2024-01-12")));
    }
}
