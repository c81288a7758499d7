pub mod adapter;
pub mod arxiv;
pub mod bing;
pub mod blocklist;
pub mod content;
pub mod duckduckgo;
pub mod searxng;
pub mod types;
pub mod you;

pub use adapter::SearchAdapter;
pub use blocklist::Blocklist;
pub use types::{Queries, RawResult, SearchResult};

use crate::config::{env_key, SearchConfig};
use crate::settings::{Engine, SearchOptions};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub const BING_KEY_ENV: &str = "BING_SEARCH_API_KEY";
pub const YOU_KEY_ENV: &str = "YDC_API_KEY";
pub const SEARXNG_URL_ENV: &str = "SEARXNG_BASE_URL";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn results(&self, query: &str, max_results: usize) -> Result<Vec<RawResult>>;
}

pub fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .context("failed to build HTTP client")
}

fn searxng_base_url(options: &SearchOptions) -> Option<String> {
    options
        .engine_setting(Engine::Searxng, "base_url")
        .or_else(|| env_key(SEARXNG_URL_ENV))
}

fn api_key(options: &SearchOptions, engine: Engine, env: &str) -> Option<String> {
    options.engine_setting(engine, "api_key").or_else(|| env_key(env))
}

/// Construct the provider for `engine` from settings and environment.
pub fn build_provider(
    engine: Engine,
    options: &SearchOptions,
    config: &SearchConfig,
) -> Result<Box<dyn SearchProvider>> {
    let client = http_client(Duration::from_millis(config.request_timeout_ms))?;
    let provider: Box<dyn SearchProvider> = match engine {
        Engine::Duckduckgo => Box::new(duckduckgo::DuckDuckGo::new(client, &config.duckduckgo_url)),
        Engine::Searxng => {
            let base_url = searxng_base_url(options)
                .context("searxng requires engine_settings.searxng.base_url")?;
            let key = options.engine_setting(Engine::Searxng, "api_key");
            Box::new(searxng::Searxng::new(client, &base_url, key))
        }
        Engine::Bing => {
            let key = api_key(options, Engine::Bing, BING_KEY_ENV)
                .with_context(|| format!("bing requires an api_key or {}", BING_KEY_ENV))?;
            Box::new(bing::Bing::new(client, bing::BING_ENDPOINT, key))
        }
        Engine::Yourdm => {
            let key = api_key(options, Engine::Yourdm, YOU_KEY_ENV)
                .with_context(|| format!("yourdm requires an api_key or {}", YOU_KEY_ENV))?;
            Box::new(you::You::new(client, you::YOU_ENDPOINT, key))
        }
        Engine::Arxiv => Box::new(arxiv::Arxiv::new(client, arxiv::ARXIV_ENDPOINT)),
    };
    Ok(provider)
}

/// Engines whose credentials are present in settings or the environment.
pub fn available_engines(options: &SearchOptions) -> Vec<Engine> {
    Engine::ALL
        .into_iter()
        .filter(|engine| match engine {
            Engine::Duckduckgo | Engine::Arxiv => true,
            Engine::Searxng => searxng_base_url(options).is_some(),
            Engine::Bing => api_key(options, Engine::Bing, BING_KEY_ENV).is_some(),
            Engine::Yourdm => api_key(options, Engine::Yourdm, YOU_KEY_ENV).is_some(),
        })
        .collect()
}
