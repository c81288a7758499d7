use super::types::{RawResult, SearxngResponse};
use super::SearchProvider;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

/// Self-hosted SearXNG instance queried through its JSON output format.
pub struct Searxng {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl Searxng {
    pub fn new(client: Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl SearchProvider for Searxng {
    fn name(&self) -> &str {
        "searxng"
    }

    async fn results(&self, query: &str, max_results: usize) -> Result<Vec<RawResult>> {
        let url = format!("{}/search", self.base_url);
        let mut req = self
            .client
            .get(&url)
            .query(&[("q", query), ("format", "json")]);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.context("searxng request failed")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("searxng ({}): {}", status, body);
        }

        let data: SearxngResponse = resp.json().await.context("failed to parse searxng JSON")?;
        Ok(data
            .results
            .into_iter()
            .filter(|r| !r.url.is_empty())
            .take(max_results)
            .map(|r| RawResult {
                link: r.url,
                snippet: r.content,
                title: r.title,
            })
            .collect())
    }
}
