use serde::{Deserialize, Serialize};

/// One hit as returned by a search provider, before filtering.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawResult {
    pub link: String,
    pub snippet: String,
    pub title: String,
}

/// Normalized result handed to the article pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub description: String,
    pub snippets: Vec<String>,
    pub title: String,
    pub url: String,
}

impl SearchResult {
    /// Build from a provider hit, using `reference` as the sole snippet.
    pub fn from_raw(raw: RawResult, reference: String) -> Self {
        Self {
            description: raw.snippet,
            snippets: vec![reference],
            title: raw.title,
            url: raw.link,
        }
    }
}

/// One query or an ordered list of queries.
#[derive(Debug, Clone, PartialEq)]
pub struct Queries(pub Vec<String>);

impl Queries {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<&str> for Queries {
    fn from(q: &str) -> Self {
        Self(vec![q.to_string()])
    }
}

impl From<String> for Queries {
    fn from(q: String) -> Self {
        Self(vec![q])
    }
}

impl From<Vec<String>> for Queries {
    fn from(qs: Vec<String>) -> Self {
        Self(qs)
    }
}

impl From<&[&str]> for Queries {
    fn from(qs: &[&str]) -> Self {
        Self(qs.iter().map(|q| q.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Queries {
    fn from(qs: [&str; N]) -> Self {
        Self(qs.iter().map(|q| q.to_string()).collect())
    }
}

// ── Provider wire formats ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SearxngResponse {
    #[serde(default)]
    pub results: Vec<SearxngResult>,
}

#[derive(Debug, Deserialize)]
pub struct SearxngResult {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BingResponse {
    pub web_pages: Option<BingWebPages>,
}

#[derive(Debug, Deserialize)]
pub struct BingWebPages {
    #[serde(default)]
    pub value: Vec<BingWebPage>,
}

#[derive(Debug, Deserialize)]
pub struct BingWebPage {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Deserialize)]
pub struct YouResponse {
    #[serde(default)]
    pub hits: Vec<YouHit>,
}

#[derive(Debug, Deserialize)]
pub struct YouHit {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub snippets: Vec<String>,
}
