pub mod compare;
pub mod forecast;
pub mod returns;
pub mod search;
pub mod setup;
pub mod ui;

use crate::core::config::{AppConfig, FundRef};

/// Funds named on the command line, or the configured watchlist when none
/// are given. Codes found in the watchlist keep their display name.
pub fn resolve_funds(codes: &[String], config: &AppConfig) -> Vec<FundRef> {
    if codes.is_empty() {
        return config.funds.clone();
    }
    codes
        .iter()
        .map(|code| {
            config
                .funds
                .iter()
                .find(|f| &f.code == code)
                .cloned()
                .unwrap_or_else(|| FundRef {
                    code: code.clone(),
                    name: None,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            funds: vec![
                FundRef {
                    code: "100".to_string(),
                    name: Some("Alpha".to_string()),
                },
                FundRef {
                    code: "200".to_string(),
                    name: None,
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_no_codes_uses_watchlist() {
        assert_eq!(resolve_funds(&[], &config()), config().funds);
    }

    #[test]
    fn test_codes_keep_configured_names() {
        let funds = resolve_funds(&["100".to_string(), "300".to_string()], &config());
        assert_eq!(funds[0].name.as_deref(), Some("Alpha"));
        assert_eq!(
            funds[1],
            FundRef {
                code: "300".to_string(),
                name: None
            }
        );
    }
}
