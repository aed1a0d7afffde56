use super::{returns, ui};
use crate::core::config::FundRef;
use crate::core::pipeline::{Comparison, CompareRequest, ComparisonOutcome, compare};
use crate::core::returns::LatestNav;
use crate::core::stats::CorrelationMatrix;
use crate::core::{AlignedTable, NavSource};
use anyhow::{Context, Result};
use comfy_table::Cell;
use std::fs::File;
use std::path::Path;
use tracing::info;

pub async fn run(
    source: &dyn NavSource,
    funds: &[FundRef],
    request: &CompareRequest,
    export: Option<&Path>,
    raw: bool,
) -> Result<()> {
    info!("Comparing {} funds", funds.len());

    let pb = ui::new_progress_bar(funds.len() as u64);
    let pb_clone = pb.clone();
    let outcome = compare(source, funds, request, &move || pb_clone.inc(1)).await;
    pb.finish_and_clear();

    match outcome? {
        ComparisonOutcome::AllFundsEmpty { skipped } => {
            print_skipped(&skipped);
            println!(
                "{}",
                ui::style_text(
                    "None of the selected funds have NAV data.",
                    ui::StyleType::Error
                )
            );
        }
        ComparisonOutcome::EmptyWindow {
            start,
            end,
            skipped,
        } => {
            print_skipped(&skipped);
            println!(
                "{}",
                ui::style_text(
                    &format!("The selected funds have no overlapping data between {start} and {end}."),
                    ui::StyleType::Error
                )
            );
        }
        ComparisonOutcome::Ready(comparison) => {
            print_skipped(&comparison.skipped);
            display_comparison(&comparison);

            if let Some(path) = export {
                let table = if raw {
                    &comparison.window
                } else {
                    &comparison.normalized
                };
                export_csv(table, path)?;
                println!(
                    "\n{}",
                    ui::style_text(
                        &format!("Exported {} rows to {}", table.len(), path.display()),
                        ui::StyleType::Subtle
                    )
                );
            }
        }
    }

    Ok(())
}

pub fn export_csv(table: &AlignedTable, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create export file: {}", path.display()))?;
    table
        .write_csv(file)
        .with_context(|| format!("Failed to export CSV to {}", path.display()))
}

fn print_skipped(skipped: &[FundRef]) {
    for fund in skipped {
        println!(
            "{}",
            ui::style_text(
                &format!("No NAV data for scheme {}, skipped.", fund.code),
                ui::StyleType::Warning
            )
        );
    }
}

fn display_comparison(comparison: &Comparison) {
    let mut window_line = format!(
        "Window: {} to {}, base = 100 at {}",
        comparison.effective_start, comparison.end, comparison.reference_date
    );
    if comparison.adjusted {
        window_line.push_str(&format!(
            " (start moved from {} to the first date all funds have data)",
            comparison.requested_start
        ));
    }
    println!(
        "\n{}",
        ui::style_text("Normalized NAV Comparison", ui::StyleType::Title)
    );
    let style_type = if comparison.adjusted {
        ui::StyleType::Warning
    } else {
        ui::StyleType::Subtle
    };
    println!("{}", ui::style_text(&window_line, style_type));
    println!("{}", normalized_summary(&comparison.normalized));

    println!(
        "\n{}",
        ui::style_text("Latest NAV & 1-day change", ui::StyleType::Title)
    );
    println!("{}", latest_table(&comparison.latest));

    println!("\n{}", ui::style_text("Returns", ui::StyleType::Title));
    println!("{}", returns::returns_table(&comparison.returns));

    if !comparison.annualised.periods.is_empty() {
        println!(
            "\n{}",
            ui::style_text("Annualised returns (CAGR)", ui::StyleType::Title)
        );
        println!("{}", returns::returns_table(&comparison.annualised));
    }

    if comparison.correlation.funds.len() > 1 {
        println!(
            "\n{}",
            ui::style_text("Correlation of daily returns", ui::StyleType::Title)
        );
        println!("{}", correlation_table(&comparison.correlation));
    }
}

/// Per fund: first and latest normalised value in the window, with the range
/// covered in between.
fn normalized_summary(normalized: &AlignedTable) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Fund"),
        ui::header_cell("Start"),
        ui::header_cell("Latest"),
        ui::header_cell("Low"),
        ui::header_cell("High"),
    ]);

    for (fund, column) in normalized.columns() {
        let present: Vec<f64> = column.iter().flatten().copied().collect();
        let low = present.iter().copied().reduce(f64::min);
        let high = present.iter().copied().reduce(f64::max);

        table.add_row(vec![
            Cell::new(fund),
            ui::format_optional_cell(present.first().copied(), |v| format!("{v:.2}")),
            ui::format_optional_cell(present.last().copied(), |v| format!("{v:.2}")),
            ui::format_optional_cell(low, |v| format!("{v:.2}")),
            ui::format_optional_cell(high, |v| format!("{v:.2}")),
        ]);
    }

    table.to_string()
}

pub(crate) fn latest_table(latest: &[LatestNav]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Fund"),
        ui::header_cell("Date"),
        ui::header_cell("Latest NAV"),
        ui::header_cell("1-day %"),
    ]);

    for nav in latest {
        table.add_row(vec![
            Cell::new(&nav.fund),
            Cell::new(nav.date.format("%Y-%m-%d")),
            ui::format_optional_cell(nav.nav, |v| format!("{v:.4}")),
            ui::optional_change_cell(nav.one_day_change),
        ]);
    }

    table.to_string()
}

fn correlation_table(matrix: &CorrelationMatrix) -> String {
    let mut table = ui::new_styled_table();
    let mut header = vec![ui::header_cell("")];
    header.extend(matrix.funds.iter().map(|f| ui::header_cell(f)));
    table.set_header(header);

    for (fund, row) in matrix.funds.iter().zip(&matrix.values) {
        let mut cells = vec![Cell::new(fund)];
        cells.extend(
            row.iter()
                .map(|v| ui::format_optional_cell(*v, |c| format!("{c:.2}"))),
        );
        table.add_row(cells);
    }

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::align::align;
    use crate::core::normalize::normalize;
    use crate::core::returns::latest_navs;
    use crate::core::stats::correlation_matrix;
    use crate::core::Series;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn table() -> AlignedTable {
        let a: Series = [(d("2024-01-01"), 10.0), (d("2024-01-02"), 12.0), (d("2024-01-03"), 9.0)]
            .into_iter()
            .collect();
        let b: Series = [(d("2024-01-02"), 5.0), (d("2024-01-03"), 6.0)]
            .into_iter()
            .collect();
        align(&BTreeMap::from([
            ("Alpha".to_string(), a),
            ("Beta".to_string(), b),
        ]))
    }

    #[test]
    fn test_normalized_summary_lists_every_fund() {
        let normalized = normalize(&table(), d("2024-01-01"));
        let rendered = normalized_summary(&normalized);

        assert!(rendered.contains("Alpha"));
        assert!(rendered.contains("120.00"));
        assert!(rendered.contains("90.00"));
        // Beta has no value at the base date.
        assert!(rendered.contains("Beta"));
        assert!(rendered.contains("N/A"));
    }

    #[test]
    fn test_latest_table_shows_nav_and_change() {
        let rendered = latest_table(&latest_navs(&table()));
        assert!(rendered.contains("2024-01-03"));
        assert!(rendered.contains("9.0000"));
        assert!(rendered.contains("-25.00%"));
        assert!(rendered.contains("20.00%"));
    }

    #[test]
    fn test_correlation_table_has_matrix_shape() {
        let rendered = correlation_table(&correlation_matrix(&table()));
        assert!(rendered.contains("Alpha"));
        assert!(rendered.contains("Beta"));
    }

    #[test]
    fn test_export_csv_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nav.csv");

        export_csv(&table(), &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("date,Alpha,Beta\n2024-01-01,10,\n"));
    }
}
