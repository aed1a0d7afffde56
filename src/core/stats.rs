//! Correlation of daily returns between funds.

use crate::core::table::AlignedTable;

#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub funds: Vec<String>,
    /// Row-major, `funds.len()` x `funds.len()`, symmetric.
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.funds.iter().position(|f| f == a)?;
        let j = self.funds.iter().position(|f| f == b)?;
        self.values[i][j]
    }
}

/// Day-over-day fractional change of a column. A day is absent when either
/// side is absent or the previous value is zero.
fn daily_returns(column: &[Option<f64>]) -> Vec<Option<f64>> {
    column
        .windows(2)
        .map(|w| match (w[0], w[1]) {
            (Some(prev), Some(curr)) if prev != 0.0 => Some(curr / prev - 1.0),
            _ => None,
        })
        .collect()
}

/// Pearson correlation over the days both series have a value.
fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

/// Pairwise correlation of daily returns for every fund in the table.
pub fn correlation_matrix(table: &AlignedTable) -> CorrelationMatrix {
    let funds: Vec<String> = table.funds().map(str::to_string).collect();
    let returns: Vec<Vec<Option<f64>>> = table
        .columns()
        .values()
        .map(|c| daily_returns(c))
        .collect();

    let mut values = vec![vec![None; funds.len()]; funds.len()];
    for i in 0..funds.len() {
        for j in i..funds.len() {
            let r = pearson(&returns[i], &returns[j]);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    CorrelationMatrix { funds, values }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::align::align;
    use crate::core::nav::Series;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn series(navs: &[f64]) -> Series {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        navs.iter()
            .enumerate()
            .map(|(i, nav)| (start + chrono::Duration::days(i as i64), *nav))
            .collect()
    }

    #[test]
    fn test_co_moving_funds_correlate_fully() {
        let table = align(&BTreeMap::from([
            ("A".to_string(), series(&[10.0, 11.0, 10.5, 12.0, 11.0])),
            ("B".to_string(), series(&[20.0, 22.0, 21.0, 24.0, 22.0])),
            ("C".to_string(), series(&[5.0, 4.5, 4.8, 4.1, 4.6])),
        ]));

        let matrix = correlation_matrix(&table);
        assert!((matrix.get("A", "B").unwrap() - 1.0).abs() < 1e-9);
        assert!((matrix.get("A", "A").unwrap() - 1.0).abs() < 1e-9);
        assert!(matrix.get("A", "C").unwrap() < 0.0);
        assert_eq!(matrix.get("A", "C"), matrix.get("C", "A"));
    }

    #[test]
    fn test_flat_or_short_series_have_no_correlation() {
        let table = align(&BTreeMap::from([
            ("A".to_string(), series(&[10.0, 11.0, 12.0])),
            ("Flat".to_string(), series(&[5.0, 5.0, 5.0])),
            ("Empty".to_string(), Series::default()),
        ]));

        let matrix = correlation_matrix(&table);
        assert_eq!(matrix.get("A", "Flat"), None);
        assert_eq!(matrix.get("A", "Empty"), None);
        assert_eq!(matrix.get("Flat", "Flat"), None);
    }
}
