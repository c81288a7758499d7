// Integration tests for the search adapter: filtering, truncation, fallback

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use async_trait::async_trait;
    use mockito::Matcher;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use storm_wiki::search::searxng::Searxng;
    use storm_wiki::search::{http_client, Blocklist, RawResult, SearchAdapter, SearchProvider};

    /// Returns a fixed list of hits (or an error) and counts calls.
    struct FakeProvider {
        hits: Vec<RawResult>,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    impl FakeProvider {
        fn ok(links: &[&str]) -> (Box<dyn SearchProvider>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let hits = links
                .iter()
                .map(|l| RawResult {
                    link: l.to_string(),
                    snippet: format!("snippet for {}", l),
                    title: format!("title for {}", l),
                })
                .collect();
            (Box::new(Self { hits, fail: false, calls: calls.clone() }), calls)
        }

        fn failing() -> (Box<dyn SearchProvider>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (Box::new(Self { hits: Vec::new(), fail: true, calls: calls.clone() }), calls)
        }
    }

    #[async_trait]
    impl SearchProvider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        async fn results(&self, _query: &str, max_results: usize) -> Result<Vec<RawResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("provider down");
            }
            Ok(self.hits.iter().take(max_results).cloned().collect())
        }
    }

    const BLOCKLIST: &str = r#"<tr class="s-b" id="spam_site">"#;

    #[tokio::test]
    async fn test_empty_queries_return_nothing() {
        let (provider, calls) = FakeProvider::ok(&["https://a.com"]);
        let adapter = SearchAdapter::new(Some(provider), Blocklist::default(), 3);
        let results = adapter.forward(Vec::<String>::new(), &[]).await;
        assert!(results.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_provider_returns_nothing() {
        let adapter = SearchAdapter::new(None, Blocklist::default(), 3);
        assert!(!adapter.is_available());
        assert!(adapter.forward("rust", &[]).await.is_empty());
    }

    #[tokio::test]
    async fn test_excluded_and_blocklisted_urls_are_dropped() {
        let (provider, _) = FakeProvider::ok(&[
            "https://a.com/1",
            "https://www.spam_site.com/x",
            "https://b.com/2",
            "https://c.com/3",
        ]);
        let adapter = SearchAdapter::new(Some(provider), Blocklist::from_html(BLOCKLIST), 5);
        let results = adapter.forward("rust", &["https://b.com/2".to_string()]).await;

        let urls: Vec<&str> = results.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.com/1", "https://c.com/3"]);
        assert_eq!(results[0].snippets, vec!["snippet for https://a.com/1".to_string()]);
        assert_eq!(results[0].description, "snippet for https://a.com/1");
    }

    #[tokio::test]
    async fn test_results_truncated_across_queries() {
        let (provider, calls) = FakeProvider::ok(&["https://a.com", "https://b.com"]);
        let adapter = SearchAdapter::new(Some(provider), Blocklist::default(), 3);
        let results = adapter.forward(["q1", "q2", "q3"], &[]).await;

        // Every query is searched even once k is reached
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(results.len(), 3);
        assert_eq!(results[2].url, "https://a.com");
    }

    #[tokio::test]
    async fn test_fallback_used_when_primary_fails() {
        let (primary, primary_calls) = FakeProvider::failing();
        let (fallback, fallback_calls) = FakeProvider::ok(&["https://backup.org"]);
        let adapter = SearchAdapter::new(Some(primary), Blocklist::default(), 3).with_fallback(Some(fallback));

        let results = adapter.forward("rust", &[]).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://backup.org");
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_both_providers_failing_yields_empty() {
        let (primary, _) = FakeProvider::failing();
        let (fallback, _) = FakeProvider::failing();
        let adapter = SearchAdapter::new(Some(primary), Blocklist::default(), 3).with_fallback(Some(fallback));
        assert!(adapter.forward("rust", &[]).await.is_empty());
    }

    #[tokio::test]
    async fn test_searxng_provider_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "tokio runtime".into()),
                Matcher::UrlEncoded("format".into(), "json".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"results": [
                    {"url": "https://tokio.rs", "title": "Tokio", "content": "An async runtime"},
                    {"url": "", "title": "Empty", "content": "dropped"},
                    {"url": "https://docs.rs/tokio", "title": "docs", "content": "API docs"}
                ]}"#,
            )
            .create_async()
            .await;

        let client = http_client(Duration::from_secs(5)).unwrap();
        let provider = Searxng::new(client, &server.url(), None);
        let hits = provider.results("tokio runtime", 10).await.unwrap();

        mock.assert_async().await;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].link, "https://tokio.rs");
        assert_eq!(hits[0].snippet, "An async runtime");
    }

    #[tokio::test]
    async fn test_searxng_error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = http_client(Duration::from_secs(5)).unwrap();
        let provider = Searxng::new(client, &server.url(), None);
        let err = provider.results("q", 3).await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_page_text_replaces_snippet_and_failures_keep_snippet() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/good")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html><body><p>Full page text</p></body></html>")
            .create_async()
            .await;
        server
            .mock("GET", "/bad")
            .with_status(404)
            .create_async()
            .await;

        let good = format!("{}/good", server.url());
        let bad = format!("{}/bad", server.url());
        let (provider, _) = FakeProvider::ok(&[good.as_str(), bad.as_str()]);
        let client = http_client(Duration::from_secs(5)).unwrap();
        let adapter = SearchAdapter::new(Some(provider), Blocklist::default(), 5)
            .with_content_fetch(client, Duration::from_secs(5));

        let results = adapter.forward("rust", &[]).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].snippets, vec!["Full page text".to_string()]);
        assert_eq!(results[1].snippets, vec![format!("snippet for {}", bad)]);
    }
}
