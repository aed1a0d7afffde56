pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::{AppConfig, FundRef};
use crate::core::forecast::ForecastOptions;
use crate::core::pipeline::CompareRequest;
use crate::core::returns::LookbackPeriod;
use crate::providers::mfapi::MfApiProvider;
use crate::store::KeyValueStore;
use anyhow::Result;
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct CompareArgs {
    pub codes: Vec<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub reference: Option<NaiveDate>,
    pub export: Option<PathBuf>,
    pub raw: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Search { query: String, limit: usize },
    Compare(CompareArgs),
    Returns { codes: Vec<String> },
    Forecast { code: String, days: u32, weekly: bool },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fundsight starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let store = match config.default_data_path() {
        Ok(data_path) => KeyValueStore::open(&data_path),
        Err(e) => {
            warn!("{e:#}. NAV responses will only be cached in memory");
            KeyValueStore::in_memory()
        }
    };
    let provider = MfApiProvider::new(config.providers.mfapi_base_url(), &store)?;

    match command {
        AppCommand::Search { query, limit } => cli::search::run(&provider, &query, limit).await,
        AppCommand::Compare(args) => {
            let funds = cli::resolve_funds(&args.codes, &config);
            if funds.is_empty() {
                println!(
                    "{}",
                    cli::ui::style_text("Select at least one fund", cli::ui::StyleType::Warning)
                );
                return Ok(());
            }
            let request = CompareRequest {
                start: args.from,
                end: args.to,
                reference: args.reference,
                ..CompareRequest::from_config(&config)
            };
            cli::compare::run(
                &provider,
                &funds,
                &request,
                args.export.as_deref(),
                args.raw,
            )
            .await
        }
        AppCommand::Returns { codes } => {
            let funds = cli::resolve_funds(&codes, &config);
            if funds.is_empty() {
                println!(
                    "{}",
                    cli::ui::style_text("Select at least one fund", cli::ui::StyleType::Warning)
                );
                return Ok(());
            }
            cli::returns::run(&provider, &funds, &LookbackPeriod::ALL).await
        }
        AppCommand::Forecast { code, days, weekly } => {
            let fund = cli::resolve_funds(std::slice::from_ref(&code), &config)
                .into_iter()
                .next()
                .unwrap_or(FundRef { code, name: None });
            cli::forecast::run(&provider, &fund, &ForecastOptions::new(days, weekly)).await
        }
    }
}
