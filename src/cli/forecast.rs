use super::ui;
use crate::core::NavSource;
use crate::core::config::FundRef;
use crate::core::forecast::{ForecastOptions, ForecastPoint, Forecaster, LinearTrendForecaster};
use crate::core::pipeline::fetch_funds;
use anyhow::Result;
use comfy_table::Cell;
use tracing::info;

/// Every n-th forecast day is shown, plus the last one.
const DISPLAY_STEP: usize = 7;

pub async fn run(source: &dyn NavSource, fund: &FundRef, options: &ForecastOptions) -> Result<()> {
    info!(
        "Forecasting scheme {} for {} days",
        fund.code, options.horizon_days
    );

    let fetched = fetch_funds(source, std::slice::from_ref(fund), &|| {}).await?;
    let Some((name, history)) = fetched.histories.into_iter().next() else {
        println!(
            "{}",
            ui::style_text(
                &format!("No NAV data for scheme {}.", fund.code),
                ui::StyleType::Error
            )
        );
        return Ok(());
    };

    let forecast = LinearTrendForecaster.fit_predict(&history.series, options)?;

    println!(
        "\n{}",
        ui::style_text(
            &format!("{name}: {} day forecast", options.horizon_days),
            ui::StyleType::Title
        )
    );
    if let Some((date, nav)) = history.series.values().last() {
        println!(
            "{}",
            ui::style_text(
                &format!("Last NAV {nav:.4} on {date}"),
                ui::StyleType::Subtle
            )
        );
    }
    println!("{}", forecast_table(&forecast));
    Ok(())
}

fn forecast_table(points: &[ForecastPoint]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Forecast"),
        ui::header_cell("Lower"),
        ui::header_cell("Upper"),
    ]);

    let last = points.len().saturating_sub(1);
    for (i, point) in points.iter().enumerate() {
        if i % DISPLAY_STEP != DISPLAY_STEP - 1 && i != last {
            continue;
        }
        table.add_row(vec![
            Cell::new(point.date.format("%Y-%m-%d")),
            Cell::new(format!("{:.4}", point.yhat)),
            Cell::new(format!("{:.4}", point.yhat_lower)),
            Cell::new(format!("{:.4}", point.yhat_upper)),
        ]);
    }
    table.to_string()
}
