//! Base-100 rescaling for cross-fund comparison.

use crate::core::table::AlignedTable;
use chrono::NaiveDate;
use tracing::debug;

pub const BASE: f64 = 100.0;

/// Rescales every column so its value at `reference_date` becomes 100.
///
/// A reference date that is not a row of the table falls back to the first
/// row. A fund without a usable value at the reference row gets an
/// all-absent column.
pub fn normalize(table: &AlignedTable, reference_date: NaiveDate) -> AlignedTable {
    if table.is_empty() {
        return table.clone();
    }

    let reference_idx = table.position(reference_date).unwrap_or_else(|| {
        debug!(%reference_date, "Reference date not in table, using first row");
        0
    });

    table.map_columns(|fund, column| match column[reference_idx] {
        Some(base) if base != 0.0 => column.iter().map(|v| v.map(|v| v / base * BASE)).collect(),
        _ => {
            debug!(fund, "No reference value, normalised column left empty");
            vec![None; column.len()]
        }
    })
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

    fn table() -> AlignedTable {
        align(&BTreeMap::from([
            (
                "A".to_string(),
                series(&[("2024-01-01", 37.13), ("2024-01-02", 40.0), ("2024-01-03", 41.7)]),
            ),
            (
                "B".to_string(),
                series(&[("2024-01-02", 0.3), ("2024-01-03", 0.6)]),
            ),
        ]))
    }

    #[test]
    fn test_reference_row_is_exactly_base() {
        let table = table();
        let reference = d("2024-01-02");

        let normalized = normalize(&table, reference);
        assert_eq!(normalized.value(reference, "A"), Some(100.0));
        assert_eq!(normalized.value(reference, "B"), Some(100.0));
        assert_eq!(normalized.value(d("2024-01-03"), "B"), Some(200.0));
    }

    #[test]
    fn test_missing_reference_falls_back_to_first_row() {
        let table = table();

        let normalized = normalize(&table, d("2030-01-01"));
        assert_eq!(normalized, normalize(&table, d("2024-01-01")));
        assert_eq!(normalized.value(d("2024-01-01"), "A"), Some(100.0));
    }

    #[test]
    fn test_absent_reference_value_blanks_column() {
        let table = table();

        let normalized = normalize(&table, d("2024-01-01"));
        assert_eq!(normalized.column("B").unwrap(), &[None, None, None]);
        assert!(normalized.column("A").unwrap().iter().all(Option::is_some));
    }

    #[test]
    fn test_empty_table_is_unchanged() {
        let table = align(&BTreeMap::new());
        assert_eq!(normalize(&table, d("2024-01-01")), table);
    }
}
