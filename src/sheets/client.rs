// Spreadsheet HTTP client.
// Builds CSV export URLs for a sheet tab and converts HTTP failures into errors.

use reqwest::{
    Client, Response, Url,
    header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT},
};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{DashError, Result};

use super::source::TabularSource;

/// Client for the spreadsheet CSV export endpoint.
pub struct SheetsClient {
    client: Client,
    base_url: String,
    sheet_id: String,
}

impl SheetsClient {
    /// Create a client for the sheet and timeout in `config`.
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/csv"));
        headers.insert(USER_AGENT, HeaderValue::from_static("sensordash"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.fetch_timeout())
            .build()
            .map_err(DashError::Fetch)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            sheet_id: config.sheet_id.clone(),
        })
    }

    /// URL of the CSV export for one tab.
    pub fn tab_url(&self, tab: &str) -> Result<Url> {
        let endpoint = format!("{}/{}/gviz/tq", self.base_url, self.sheet_id);
        Url::parse_with_params(&endpoint, &[("tqx", "out:csv"), ("sheet", tab)])
            .map_err(|e| DashError::Config(format!("invalid sheet URL '{}': {}", endpoint, e)))
    }

    /// Make a GET request and return the successful response.
    async fn get(&self, url: Url) -> Result<Response> {
        debug!(%url, "GET");
        let response = self.client.get(url).send().await.map_err(DashError::Fetch)?;
        self.check_response(response)
    }

    /// Check response status and convert errors.
    fn check_response(&self, response: Response) -> Result<Response> {
        match response.status() {
            status if status.is_success() => Ok(response),
            status => Err(DashError::HttpStatus {
                status: status.as_u16(),
                url: response.url().to_string(),
            }),
        }
    }
}

impl TabularSource for SheetsClient {
    async fn fetch_csv(&self, tab: &str) -> Result<String> {
        let url = self.tab_url(tab)?;
        let response = self.get(url).await?;
        let body = response.text().await?;
        info!(tab, bytes = body.len(), "fetched sheet");
        Ok(body)
    }
}
