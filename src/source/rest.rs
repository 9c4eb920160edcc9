//! PostgREST client for the hosted table store.
//!
//! Every fetch is a single unfiltered `select=*` read. No pagination or
//! retries; a failure is reported once and the caller decides what to do.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;
use url::Url;

use super::{rows_from_value, Row, Table, TableSource};
use crate::config::StoreConfig;
use crate::error::{Error, Result};

const REST_PATH: &str = "rest/v1/";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ERROR_BODY: usize = 200;

pub struct RestSource {
    http: Client,
    base: Url,
}

impl RestSource {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(&config.key)?);
        headers.insert(
            AUTHORIZATION,
            header_value(&format!("Bearer {}", config.key))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            base: rest_base(&config.url)?,
        })
    }

    /// The URL a table is read from.
    pub fn table_url(&self, table: Table) -> Result<Url> {
        let mut url = self.base.join(table.name())?;
        url.query_pairs_mut().append_pair("select", "*");
        Ok(url)
    }
}

impl TableSource for RestSource {
    async fn fetch_table(&self, table: Table) -> Result<Vec<Row>> {
        let url = self.table_url(table)?;
        log::debug!("GET {url}");

        let response = self.http.get(url).send().await.map_err(|e| Error::Fetch {
            table: table.name().to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Backend {
                table: table.name().to_string(),
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let body: serde_json::Value = response.json().await.map_err(|e| Error::Fetch {
            table: table.name().to_string(),
            message: format!("failed to parse response: {e}"),
        })?;

        let rows = rows_from_value(table, body)?;
        log::info!("Fetched {} rows from {table}", rows.len());
        Ok(rows)
    }
}

/// `https://x.supabase.co` and `https://x.supabase.co/` both become
/// `https://x.supabase.co/rest/v1/`.
fn rest_base(url: &Url) -> Result<Url> {
    let mut base = url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join(REST_PATH)?)
}

fn header_value(raw: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(raw)
        .map_err(|_| Error::Config("store key contains invalid header characters".into()))?;
    value.set_sensitive(true);
    Ok(value)
}
