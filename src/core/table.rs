//! Date-indexed table of per-fund values shared by the comparison stages.

use crate::core::nav::{Observation, Series};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::io::Write;

/// Values for several funds on a common, strictly increasing date axis.
///
/// Columns are keyed by fund name in an ordered map so rendering and CSV
/// export always see the same column order. Every column has exactly one
/// cell per date; `None` marks an absent value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedTable {
    dates: Vec<NaiveDate>,
    columns: BTreeMap<String, Vec<Option<f64>>>,
}

/// A borrowed view of one table row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row<'a> {
    pub date: NaiveDate,
    pub values: Vec<(&'a str, Option<f64>)>,
}

impl AlignedTable {
    /// Assembles a table from parts. Callers guarantee the date axis is
    /// strictly increasing and every column matches its length.
    pub(crate) fn from_parts(
        dates: Vec<NaiveDate>,
        columns: BTreeMap<String, Vec<Option<f64>>>,
    ) -> Self {
        debug_assert!(dates.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(columns.values().all(|c| c.len() == dates.len()));
        Self { dates, columns }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn funds(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn columns(&self) -> &BTreeMap<String, Vec<Option<f64>>> {
        &self.columns
    }

    pub fn column(&self, fund: &str) -> Option<&[Option<f64>]> {
        self.columns.get(fund).map(Vec::as_slice)
    }

    /// Index of `date` on the axis, if it is a row of the table.
    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    pub fn value(&self, date: NaiveDate, fund: &str) -> Option<f64> {
        let idx = self.position(date)?;
        self.columns.get(fund).and_then(|c| c[idx])
    }

    /// Date of the first present cell in a fund's column.
    pub fn first_value_date(&self, fund: &str) -> Option<NaiveDate> {
        let column = self.columns.get(fund)?;
        column
            .iter()
            .position(Option::is_some)
            .map(|idx| self.dates[idx])
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.dates.iter().enumerate().map(|(idx, date)| Row {
            date: *date,
            values: self
                .columns
                .iter()
                .map(|(fund, column)| (fund.as_str(), column[idx]))
                .collect(),
        })
    }

    /// Rows whose date lies in `[start, end]`. Columns are kept even when no
    /// row survives.
    pub fn slice(&self, start: NaiveDate, end: NaiveDate) -> Self {
        let from = self.dates.partition_point(|d| *d < start);
        let to = self.dates.partition_point(|d| *d <= end).max(from);
        Self {
            dates: self.dates[from..to].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|(fund, column)| (fund.clone(), column[from..to].to_vec()))
                .collect(),
        }
    }

    /// Applies `f` to every cell of every column, keeping the date axis.
    pub(crate) fn map_columns<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&str, &[Option<f64>]) -> Vec<Option<f64>>,
    {
        Self {
            dates: self.dates.clone(),
            columns: self
                .columns
                .iter()
                .map(|(fund, column)| (fund.clone(), f(fund, column)))
                .collect(),
        }
    }

    /// Re-expresses the table as one series per fund, holding only the
    /// present cells.
    pub fn to_series(&self) -> BTreeMap<String, Series> {
        self.columns
            .iter()
            .map(|(fund, column)| {
                let observations = self
                    .dates
                    .iter()
                    .zip(column)
                    .filter_map(|(date, value)| value.map(|nav| Observation::new(*date, nav)))
                    .collect();
                (fund.clone(), Series::from_observations(observations))
            })
            .collect()
    }

    /// Writes the table as delimited text: a `date` column followed by one
    /// column per fund. Absent cells are written as empty fields.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);

        let mut header = vec!["date"];
        header.extend(self.funds());
        wtr.write_record(&header)
            .context("Failed to write CSV header")?;

        for row in self.rows() {
            let mut record = Vec::with_capacity(row.values.len() + 1);
            record.push(row.date.format("%Y-%m-%d").to_string());
            record.extend(
                row.values
                    .iter()
                    .map(|(_, v)| v.map(|v| v.to_string()).unwrap_or_default()),
            );
            wtr.write_record(&record)
                .with_context(|| format!("Failed to write CSV row for {}", row.date))?;
        }

        wtr.flush().context("Failed to flush CSV output")?;
        Ok(())
    }
}
