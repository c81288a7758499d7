use super::types::{RawResult, YouResponse};
use super::SearchProvider;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

pub const YOU_ENDPOINT: &str = "https://api.ydc-index.io/search";

/// You.com web search index.
pub struct You {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl You {
    pub fn new(client: Client, endpoint: &str, api_key: String) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl SearchProvider for You {
    fn name(&self) -> &str {
        "yourdm"
    }

    async fn results(&self, query: &str, max_results: usize) -> Result<Vec<RawResult>> {
        let resp = self
            .client
            .get(&self.endpoint)
            .header("X-API-Key", &self.api_key)
            .query(&[("query", query)])
            .send()
            .await
            .context("you.com request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("you.com ({}): {}", status, body);
        }

        let data: YouResponse = resp.json().await.context("failed to parse you.com JSON")?;
        Ok(data
            .hits
            .into_iter()
            .take(max_results)
            .map(|hit| {
                // Hits carry a short description plus longer snippets.
                let snippet = if hit.snippets.is_empty() {
                    hit.description
                } else {
                    hit.snippets.join(" ")
                };
                RawResult {
                    link: hit.url,
                    snippet,
                    title: hit.title,
                }
            })
            .collect())
    }
}
