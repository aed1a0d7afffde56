use super::ui;
use crate::core::FundCatalog;
use crate::core::nav::FundListing;
use anyhow::Result;
use comfy_table::Cell;

pub async fn run(catalog: &dyn FundCatalog, query: &str, limit: usize) -> Result<()> {
    let matches = catalog.search(query).await?;

    if matches.is_empty() {
        println!(
            "{}",
            ui::style_text(&format!("No funds match '{query}'"), ui::StyleType::Warning)
        );
        return Ok(());
    }

    println!("{}", listing_table(&matches, limit));
    if matches.len() > limit {
        println!(
            "{}",
            ui::style_text(
                &format!("Showing {limit} of {} matches", matches.len()),
                ui::StyleType::Subtle
            )
        );
    }
    Ok(())
}

fn listing_table(listings: &[FundListing], limit: usize) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Code"), ui::header_cell("Scheme")]);
    for listing in listings.iter().take(limit) {
        table.add_row(vec![
            Cell::new(&listing.scheme_code),
            Cell::new(&listing.scheme_name),
        ]);
    }
    table.to_string()
}
