use super::types::RawResult;
use super::SearchProvider;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use scraper::{Html, Selector};

/// DuckDuckGo through its keyless HTML endpoint.
pub struct DuckDuckGo {
    client: Client,
    endpoint: String,
}

impl DuckDuckGo {
    pub fn new(client: Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGo {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    async fn results(&self, query: &str, max_results: usize) -> Result<Vec<RawResult>> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await
            .context("duckduckgo request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("duckduckgo ({}): {}", status, body);
        }

        let html = resp.text().await.context("failed to read duckduckgo response")?;
        Ok(parse_results(&html, max_results))
    }
}

/// Pull result links, titles and snippets out of the HTML results page.
pub fn parse_results(html: &str, max_results: usize) -> Vec<RawResult> {
    let document = Html::parse_document(html);
    let (Ok(result_sel), Ok(link_sel), Ok(snippet_sel)) = (
        Selector::parse("div.result"),
        Selector::parse("a.result__a"),
        Selector::parse(".result__snippet"),
    ) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for result in document.select(&result_sel) {
        let Some(anchor) = result.select(&link_sel).next() else { continue };
        let Some(href) = anchor.value().attr("href") else { continue };
        let Some(link) = resolve_link(href) else { continue };

        let title = anchor.text().collect::<String>().trim().to_string();
        let snippet = result
            .select(&snippet_sel)
            .next()
            .map(|s| s.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        out.push(RawResult { link, snippet, title });
        if out.len() >= max_results {
            break;
        }
    }
    out
}

/// Unwrap `//duckduckgo.com/l/?uddg=<target>` redirect links.
fn resolve_link(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };
    let url = Url::parse(&absolute).ok()?;
    if url.path().starts_with("/l/") {
        return url
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned());
    }
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"
    <html><body>
      <div class="result results_links web-result">
        <h2><a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fa&rut=abc">Example <b>Title</b></a></h2>
        <a class="result__snippet" href="#">Example snippet</a>
      </div>
      <div class="result">
        <h2><a class="result__a" href="https://test.com/">Test Title</a></h2>
        <div class="result__snippet">Test snippet</div>
      </div>
      <div class="result"><span>no link here</span></div>
    </body></html>"##;

    #[test]
    fn test_parse_results() {
        let results = parse_results(PAGE, 10);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].link, "https://example.com/a");
        assert_eq!(results[0].title, "Example Title");
        assert_eq!(results[0].snippet, "Example snippet");
        assert_eq!(results[1].link, "https://test.com/");
    }

    #[test]
    fn test_parse_results_respects_limit() {
        assert_eq!(parse_results(PAGE, 1).len(), 1);
    }

    #[test]
    fn test_resolve_link_rejects_non_http() {
        assert_eq!(resolve_link("javascript:void(0)"), None);
    }
}
