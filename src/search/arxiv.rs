use super::types::RawResult;
use super::SearchProvider;
use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::{Captures, Regex};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::borrow::Cow;
use std::sync::OnceLock;

pub const ARXIV_ENDPOINT: &str = "http://export.arxiv.org/api/query";

/// arXiv paper search over the Atom export API.
pub struct Arxiv {
    client: Client,
    endpoint: String,
}

impl Arxiv {
    pub fn new(client: Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl SearchProvider for Arxiv {
    fn name(&self) -> &str {
        "arxiv"
    }

    async fn results(&self, query: &str, max_results: usize) -> Result<Vec<RawResult>> {
        let search_query = format!("all:{}", query);
        let max = max_results.to_string();
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("search_query", search_query.as_str()), ("max_results", max.as_str())])
            .send()
            .await
            .context("arxiv request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("arxiv ({}): {}", status, body);
        }

        let feed = resp.text().await.context("failed to read arxiv feed")?;
        Ok(parse_feed(&feed, max_results))
    }
}

/// Entries of an Atom feed as raw results: id as link, summary as snippet.
///
/// Parsed with the HTML parser, which decodes named and numeric entities.
/// CDATA sections are escaped into plain text first.
pub fn parse_feed(feed: &str, max_results: usize) -> Vec<RawResult> {
    let document = Html::parse_document(&unwrap_cdata(feed));
    let (Ok(entry_sel), Ok(id_sel), Ok(title_sel), Ok(summary_sel)) = (
        Selector::parse("entry"),
        Selector::parse("id"),
        Selector::parse("title"),
        Selector::parse("summary"),
    ) else {
        return Vec::new();
    };

    let field = |entry: ElementRef, sel: &Selector| {
        entry
            .select(sel)
            .next()
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .unwrap_or_default()
    };

    document
        .select(&entry_sel)
        .filter_map(|entry| {
            let link = field(entry, &id_sel);
            (!link.is_empty()).then(|| RawResult {
                link,
                snippet: field(entry, &summary_sel),
                title: field(entry, &title_sel),
            })
        })
        .take(max_results)
        .collect()
}

fn unwrap_cdata(feed: &str) -> Cow<'_, str> {
    static CDATA: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = CDATA
        .get_or_init(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").ok())
        .as_ref()
    else {
        return Cow::Borrowed(feed);
    };
    re.replace_all(feed, |caps: &Captures| {
        caps[1].replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
    })
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query</title>
  <entry>
    <id>http://arxiv.org/abs/2402.14207v1</id>
    <title>Assisting in Writing Wikipedia-like
      Articles From Scratch</title>
    <summary>  We study how to apply large language models &amp; retrieval.
    </summary>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <title>Attention Is All You Need</title>
    <summary>Transformers.</summary>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_feed() {
        let results = parse_feed(FEED, 10);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].link, "http://arxiv.org/abs/2402.14207v1");
        assert_eq!(
            results[0].title,
            "Assisting in Writing Wikipedia-like Articles From Scratch"
        );
        assert_eq!(
            results[0].snippet,
            "We study how to apply large language models & retrieval."
        );
    }

    #[test]
    fn test_parse_feed_decodes_entities_and_cdata() {
        let feed = r#"<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <entry>
    <id>http://arxiv.org/abs/2401.00001v1</id>
    <title>Rust &#x2014; Fearless &#233;tudes</title>
    <summary><![CDATA[Uses <b>tags</b> & ampersands]]></summary>
    <arxiv:primary_category term="cs.PL"/>
    <link href="http://arxiv.org/abs/2401.00001v1" rel="alternate"/>
  </entry>
  <entry>
    <title>No id here</title>
  </entry>
</feed>"#;
        let results = parse_feed(feed, 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Rust \u{2014} Fearless \u{e9}tudes");
        assert_eq!(results[0].snippet, "Uses <b>tags</b> & ampersands");
    }

    #[test]
    fn test_parse_feed_limit() {
        assert_eq!(parse_feed(FEED, 1).len(), 1);
    }
}
