use super::blocklist::Blocklist;
use super::content::fetch_page_text;
use super::types::{Queries, RawResult, SearchResult};
use super::{build_provider, http_client, SearchProvider};
use crate::config::SearchConfig;
use crate::settings::SearchOptions;
use futures_util::future::join_all;
use reqwest::Client;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Retrieval front-end for the article pipeline.
///
/// Wraps a primary provider (and optionally a fallback), drops results from
/// blocklisted or excluded URLs, and caps the merged list at `k`.
pub struct SearchAdapter {
    provider: Option<Box<dyn SearchProvider>>,
    fallback: Option<Box<dyn SearchProvider>>,
    blocklist: Blocklist,
    k: usize,
    fetch_content: bool,
    fetch_timeout: Duration,
    client: Client,
}

impl SearchAdapter {
    pub fn new(provider: Option<Box<dyn SearchProvider>>, blocklist: Blocklist, k: usize) -> Self {
        Self {
            provider,
            fallback: None,
            blocklist,
            k,
            fetch_content: false,
            fetch_timeout: Duration::from_secs(120),
            client: Client::new(),
        }
    }

    pub fn with_fallback(mut self, fallback: Option<Box<dyn SearchProvider>>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Replace provider snippets with the fetched page text.
    pub fn with_content_fetch(mut self, client: Client, timeout: Duration) -> Self {
        self.fetch_content = true;
        self.fetch_timeout = timeout;
        self.client = client;
        self
    }

    /// Build from persisted search options. Provider construction errors are
    /// logged and leave the adapter without that provider.
    pub fn from_settings(options: &SearchOptions, config: &SearchConfig) -> Self {
        let blocklist = match &config.blocklist_path {
            Some(path) => Blocklist::load(path),
            None => {
                tracing::warn!("no blocklist configured, domain restrictions will not be applied");
                Blocklist::default()
            }
        };

        let primary = build_provider(options.primary_engine, options, config)
            .map_err(|e| {
                tracing::warn!(engine = %options.primary_engine, error = %e, "primary search engine unavailable");
            })
            .ok();

        let fallback = options
            .fallback_engine
            .filter(|engine| *engine != options.primary_engine)
            .and_then(|engine| {
                build_provider(engine, options, config)
                    .map_err(|e| {
                        tracing::warn!(engine = %engine, error = %e, "fallback search engine unavailable");
                    })
                    .ok()
            });

        let mut adapter = Self::new(primary, blocklist, options.search_top_k).with_fallback(fallback);
        if config.fetch_content {
            let timeout = Duration::from_secs(config.fetch_timeout_s);
            match http_client(timeout) {
                Ok(client) => adapter = adapter.with_content_fetch(client, timeout),
                Err(e) => tracing::warn!(error = %e, "page fetching disabled"),
            }
        }
        adapter
    }

    /// Convenience for callers that hold a blocklist path rather than config.
    pub fn with_blocklist_file(mut self, path: &Path) -> Self {
        self.blocklist = Blocklist::load(path);
        self
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_some() || self.fallback.is_some()
    }

    pub fn is_valid_source(&self, url: &str) -> bool {
        self.blocklist.is_valid_source(url)
    }

    /// Search every query in order and return at most `k` filtered results.
    pub async fn forward(&self, queries: impl Into<Queries>, exclude_urls: &[String]) -> Vec<SearchResult> {
        let queries = queries.into();
        if queries.is_empty() || self.k == 0 {
            return Vec::new();
        }
        if !self.is_available() {
            tracing::warn!("no search provider available, returning no results");
            return Vec::new();
        }

        let excluded: HashSet<&str> = exclude_urls.iter().map(String::as_str).collect();
        let mut collected: Vec<RawResult> = Vec::new();

        for query in queries.iter() {
            let hits = self.search_one(query).await;
            collected.extend(
                hits.into_iter()
                    .filter(|r| !excluded.contains(r.link.as_str()))
                    .filter(|r| self.blocklist.is_valid_source(&r.link)),
            );
        }
        collected.truncate(self.k);

        if !self.fetch_content {
            return collected
                .into_iter()
                .map(|raw| {
                    let reference = raw.snippet.clone();
                    SearchResult::from_raw(raw, reference)
                })
                .collect();
        }

        let pages = join_all(
            collected
                .iter()
                .map(|raw| fetch_page_text(&self.client, &raw.link, self.fetch_timeout)),
        )
        .await;

        collected
            .into_iter()
            .zip(pages)
            .map(|(raw, page)| {
                let reference = match page {
                    Ok(text) if !text.is_empty() => text,
                    Ok(_) => raw.snippet.clone(),
                    Err(e) => {
                        tracing::warn!(url = %raw.link, error = %e, "page fetch failed, using snippet");
                        raw.snippet.clone()
                    }
                };
                SearchResult::from_raw(raw, reference)
            })
            .collect()
    }

    async fn search_one(&self, query: &str) -> Vec<RawResult> {
        if let Some(provider) = &self.provider {
            match provider.results(query, self.k).await {
                Ok(hits) => return hits,
                Err(e) => {
                    tracing::warn!(engine = provider.name(), query, error = %e, "search failed");
                }
            }
        }
        let Some(fallback) = &self.fallback else {
            return Vec::new();
        };
        match fallback.results(query, self.k).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(engine = fallback.name(), query, error = %e, "fallback search failed");
                Vec::new()
            }
        }
    }
}
