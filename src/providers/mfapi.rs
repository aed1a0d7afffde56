use crate::core::cache::{KeyValueCollection, Store};
use crate::core::nav::{FundCatalog, FundListing, NavFetch, NavHistory, NavSource, Observation, Series};
use crate::providers::util::{USER_AGENT, get_text};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

pub const DEFAULT_BASE_URL: &str = "https://api.mfapi.in";

const NAV_TTL: Duration = Duration::from_secs(60 * 60);
const CATALOG_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const CATALOG_KEY: &[u8] = b"all";

/// NAV histories and the scheme list from mfapi.in.
pub struct MfApiProvider {
    base_url: String,
    client: reqwest::Client,
    nav_cache: Arc<dyn KeyValueCollection>,
    catalog_cache: Arc<dyn KeyValueCollection>,
}

impl MfApiProvider {
    pub fn new(base_url: &str, store: &dyn Store) -> Result<Self> {
        let nav_cache = store
            .get_collection("mfapi_nav", true, true)
            .context("Failed to open NAV cache")?;
        let catalog_cache = store
            .get_collection("mfapi_catalog", true, true)
            .context("Failed to open catalog cache")?;
        Self::with_collections(base_url, nav_cache, catalog_cache)
    }

    pub(crate) fn with_collections(
        base_url: &str,
        nav_cache: Arc<dyn KeyValueCollection>,
        catalog_cache: Arc<dyn KeyValueCollection>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            nav_cache,
            catalog_cache,
        })
    }
}

/// mfapi reports scheme codes as numbers in the list and as either numbers
/// or strings in scheme metadata.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SchemeCode {
    Number(u64),
    Text(String),
}

impl SchemeCode {
    fn into_string(self) -> String {
        match self {
            SchemeCode::Number(n) => n.to_string(),
            SchemeCode::Text(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SchemeListing {
    #[serde(rename = "schemeCode")]
    scheme_code: SchemeCode,
    #[serde(rename = "schemeName")]
    scheme_name: String,
}

#[derive(Debug, Deserialize)]
struct NavResponse {
    #[serde(default)]
    meta: Option<NavMeta>,
    #[serde(default)]
    data: Vec<NavRow>,
}

#[derive(Debug, Default, Deserialize)]
struct NavMeta {
    scheme_name: Option<String>,
    fund_house: Option<String>,
    scheme_category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NavRow {
    date: String,
    nav: String,
}

/// Rows with an unreadable date are dropped; an unreadable NAV keeps the
/// date with an absent value.
fn parse_rows(scheme_code: &str, rows: Vec<NavRow>) -> Series {
    let observations = rows
        .into_iter()
        .filter_map(|row| {
            let date = match NaiveDate::parse_from_str(&row.date, "%d-%m-%Y") {
                Ok(date) => date,
                Err(e) => {
                    debug!("Skipping NAV row for {}: bad date '{}' ({})", scheme_code, row.date, e);
                    return None;
                }
            };
            let nav = row.nav.trim().parse::<f64>().ok().filter(|v| v.is_finite());
            Some(Observation { date, nav })
        })
        .collect();
    Series::from_observations(observations)
}

impl MfApiProvider {
    async fn fetch_uncached(&self, scheme_code: &str) -> Result<NavFetch> {
        let url = format!("{}/mf/{}", self.base_url, scheme_code);
        let response_text = get_text(&self.client, &url)
            .await
            .with_context(|| format!("Failed to fetch NAV history for scheme: {scheme_code}"))?;

        if response_text.trim().is_empty() {
            return Err(anyhow!("Received empty response for scheme: {}", scheme_code));
        }

        let response: NavResponse = serde_json::from_str(&response_text).with_context(|| {
            format!("Failed to parse NAV response for scheme: {scheme_code}. Response: '{response_text}'")
        })?;

        let series = parse_rows(scheme_code, response.data);
        if series.values().next().is_none() {
            debug!("No NAV data for scheme {}", scheme_code);
            return Ok(NavFetch::NoData);
        }

        let meta = response.meta.unwrap_or_default();
        debug!(
            "Fetched {} NAV points for scheme {} ({:?} to {:?})",
            series.len(),
            scheme_code,
            series.first_date(),
            series.last_date()
        );
        Ok(NavFetch::Data(NavHistory {
            scheme_code: scheme_code.to_string(),
            scheme_name: meta.scheme_name.unwrap_or_else(|| scheme_code.to_string()),
            fund_house: meta.fund_house,
            category: meta.scheme_category,
            series,
        }))
    }
}

#[async_trait]
impl NavSource for MfApiProvider {
    #[instrument(name = "MfApiNavFetch", skip(self), fields(scheme_code = %scheme_code))]
    async fn fetch_history(&self, scheme_code: &str) -> Result<NavFetch> {
        if let Some(cached) = self.nav_cache.get(scheme_code.as_bytes()).await {
            match serde_json::from_slice(&cached) {
                Ok(fetch) => return Ok(fetch),
                Err(e) => {
                    debug!("Dropping unreadable cached NAV for {}: {}", scheme_code, e);
                    self.nav_cache.remove(scheme_code.as_bytes()).await;
                }
            }
        }

        let fetch = self.fetch_uncached(scheme_code).await?;
        self.nav_cache
            .put(
                scheme_code.as_bytes(),
                &serde_json::to_vec(&fetch)?,
                Some(NAV_TTL),
            )
            .await;
        Ok(fetch)
    }
}

#[async_trait]
impl FundCatalog for MfApiProvider {
    async fn list_funds(&self) -> Result<Vec<FundListing>> {
        if let Some(cached) = self.catalog_cache.get(CATALOG_KEY).await {
            match serde_json::from_slice(&cached) {
                Ok(funds) => return Ok(funds),
                Err(e) => {
                    debug!("Dropping unreadable cached catalog: {}", e);
                    self.catalog_cache.remove(CATALOG_KEY).await;
                }
            }
        }

        let url = format!("{}/mf", self.base_url);
        let response_text = get_text(&self.client, &url)
            .await
            .context("Failed to fetch fund list")?;
        let listings: Vec<SchemeListing> = serde_json::from_str(&response_text)
            .context("Failed to parse fund list response")?;

        let funds: Vec<FundListing> = listings
            .into_iter()
            .map(|l| FundListing {
                scheme_code: l.scheme_code.into_string(),
                scheme_name: l.scheme_name,
            })
            .collect();
        debug!("Fetched {} funds from catalog", funds.len());

        self.catalog_cache
            .put(CATALOG_KEY, &serde_json::to_vec(&funds)?, Some(CATALOG_TTL))
            .await;
        Ok(funds)
    }
}
