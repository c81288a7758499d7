use super::types::{BingResponse, RawResult};
use super::SearchProvider;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

pub const BING_ENDPOINT: &str = "https://api.bing.microsoft.com/v7.0/search";

pub struct Bing {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl Bing {
    pub fn new(client: Client, endpoint: &str, api_key: String) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl SearchProvider for Bing {
    fn name(&self) -> &str {
        "bing"
    }

    async fn results(&self, query: &str, max_results: usize) -> Result<Vec<RawResult>> {
        let count = max_results.to_string();
        let resp = self
            .client
            .get(&self.endpoint)
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .query(&[("q", query), ("count", count.as_str()), ("mkt", "en-US")])
            .send()
            .await
            .context("bing request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("bing ({}): {}", status, body);
        }

        let data: BingResponse = resp.json().await.context("failed to parse bing JSON")?;
        let pages = data.web_pages.map(|p| p.value).unwrap_or_default();
        Ok(pages
            .into_iter()
            .take(max_results)
            .map(|p| RawResult {
                link: p.url,
                snippet: p.snippet,
                title: p.name,
            })
            .collect())
    }
}
