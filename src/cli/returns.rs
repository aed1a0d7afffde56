use super::{compare, ui};
use crate::core::NavSource;
use crate::core::align::align;
use crate::core::config::FundRef;
use crate::core::pipeline::fetch_funds;
use crate::core::returns::{
    LookbackPeriod, ReturnsTable, anchors_from, annualised_returns, latest_navs, period_returns,
};
use anyhow::Result;
use comfy_table::Cell;
use std::collections::BTreeSet;
use tracing::info;

pub async fn run(
    source: &dyn NavSource,
    funds: &[FundRef],
    periods: &[LookbackPeriod],
) -> Result<()> {
    info!("Calculating returns for {} funds", funds.len());

    let pb = ui::new_progress_bar(funds.len() as u64);
    let pb_clone = pb.clone();
    let fetched = fetch_funds(source, funds, &move || pb_clone.inc(1)).await;
    pb.finish_and_clear();
    let fetched = fetched?;

    for fund in &fetched.skipped {
        println!(
            "{}",
            ui::style_text(
                &format!("No NAV data for scheme {}, skipped.", fund.code),
                ui::StyleType::Warning
            )
        );
    }

    let aligned = align(&fetched.series());
    let Some(latest) = aligned.last_date() else {
        println!(
            "{}",
            ui::style_text(
                "None of the selected funds have NAV data.",
                ui::StyleType::Error
            )
        );
        return Ok(());
    };

    let anchors = anchors_from(latest, periods);
    let returns = period_returns(&aligned, &anchors);
    let annualised = annualised_returns(&aligned, &anchors)?;

    println!(
        "\n{}",
        ui::style_text(&format!("Returns as of {latest}"), ui::StyleType::Title)
    );
    println!("{}", returns_table(&returns));

    if !annualised.periods.is_empty() {
        println!(
            "\n{}",
            ui::style_text("Annualised returns (CAGR)", ui::StyleType::Title)
        );
        println!("{}", returns_table(&annualised));
    }

    println!(
        "\n{}",
        ui::style_text("Latest NAV & 1-day change", ui::StyleType::Title)
    );
    println!("{}", compare::latest_table(&latest_navs(&aligned)));

    Ok(())
}

/// One row per fund, one column per lookback label.
pub fn returns_table(returns: &ReturnsTable) -> String {
    let mut table = ui::new_styled_table();
    let mut header = vec![ui::header_cell("Fund")];
    header.extend(returns.labels().map(ui::header_cell));
    table.set_header(header);

    let funds: BTreeSet<&str> = returns
        .periods
        .iter()
        .flat_map(|p| p.returns.keys().map(String::as_str))
        .collect();

    for fund in funds {
        let mut row = vec![Cell::new(fund)];
        row.extend(
            returns
                .labels()
                .map(|label| ui::optional_change_cell(returns.get(label, fund))),
        );
        table.add_row(row);
    }

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::returns::PeriodReturn;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    #[test]
    fn test_returns_table_renders_labels_and_values() {
        let anchor = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let returns = ReturnsTable {
            periods: vec![
                PeriodReturn {
                    label: "1-M".to_string(),
                    anchor,
                    returns: BTreeMap::from([
                        ("Alpha".to_string(), Some(2.5)),
                        ("Beta".to_string(), None),
                    ]),
                },
                PeriodReturn {
                    label: "1-Y".to_string(),
                    anchor,
                    returns: BTreeMap::from([
                        ("Alpha".to_string(), Some(-4.0)),
                        ("Beta".to_string(), Some(11.25)),
                    ]),
                },
            ],
        };

        let rendered = returns_table(&returns);
        for expected in ["1-M", "1-Y", "Alpha", "Beta", "2.50%", "-4.00%", "11.25%", "N/A"] {
            assert!(rendered.contains(expected), "missing {expected}");
        }
    }
}
