//! Reliability blocklist parsed from a saved copy of the perennial-sources page.

use regex::Regex;
use reqwest::Url;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct Blocklist {
    pub generally_unreliable: HashSet<String>,
    pub deprecated: HashSet<String>,
    pub blacklisted: HashSet<String>,
}

impl Blocklist {
    /// Load from `path`. Any failure yields an empty list, so nothing is filtered.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let list = Self::from_html(&content);
                tracing::info!(
                    path = %path.display(),
                    unreliable = list.generally_unreliable.len(),
                    deprecated = list.deprecated.len(),
                    blacklisted = list.blacklisted.len(),
                    "loaded source blocklist"
                );
                list
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    path = %path.display(),
                    "sources file not found, domain restrictions will not be applied"
                );
                Self::default()
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "error reading sources file");
                Self::default()
            }
        }
    }

    /// Extract row ids for the three source classes.
    pub fn from_html(content: &str) -> Self {
        Self {
            generally_unreliable: extract_ids(content, "s-gu"),
            deprecated: extract_ids(content, "s-d"),
            blacklisted: extract_ids(content, "s-b"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.generally_unreliable.is_empty() && self.deprecated.is_empty() && self.blacklisted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.generally_unreliable.len() + self.deprecated.len() + self.blacklisted.len()
    }

    fn contains(&self, name: &str) -> bool {
        self.generally_unreliable.contains(name)
            || self.deprecated.contains(name)
            || self.blacklisted.contains(name)
    }

    /// False when the URL's domain is on any of the three lists.
    ///
    /// Both the registrable domain (`evil.com`) and its leading label (`evil`)
    /// are checked. URLs without a dotted host cannot be judged and pass.
    pub fn is_valid_source(&self, url: &str) -> bool {
        let Some((registrable, label)) = domain_parts(url) else {
            return true;
        };
        !(self.contains(&registrable) || self.contains(&label))
    }
}

fn extract_ids(content: &str, class: &str) -> HashSet<String> {
    let pattern = format!(r#"<tr class="{}"[^>]*id="([^"]+)""#, regex::escape(class));
    let Ok(re) = Regex::new(&pattern) else {
        return HashSet::new();
    };
    re.captures_iter(content)
        .map(|cap| {
            let id = cap[1].replace("&#39;", "'");
            let root = id.split("_(").next().unwrap_or(&id);
            root.to_lowercase()
        })
        .collect()
}

/// `(registrable domain, second-level label)` for a URL's host.
fn domain_parts(url: &str) -> Option<(String, String)> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.trim_end_matches('.').to_lowercase();
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() < 2 {
        return None;
    }
    let label = labels[labels.len() - 2];
    let tld = labels[labels.len() - 1];
    Some((format!("{label}.{tld}"), label.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <tr class="s-gu" id="unreliable_source">
        <tr class="s-d" id="deprecated_source">
        <tr class="s-b" id="blacklisted_source">
        <tr class="s-gu" data-x="1" id="Breitbart_(news)">
        <tr class="s-d" id="O&#39;Reilly">
        <tr class="s-gr" id="reliable_source">
    "#;

    #[test]
    fn test_parses_three_classes() {
        let list = Blocklist::from_html(SAMPLE);
        assert!(list.generally_unreliable.contains("unreliable_source"));
        assert!(list.generally_unreliable.contains("breitbart"));
        assert!(list.deprecated.contains("deprecated_source"));
        assert!(list.deprecated.contains("o'reilly"));
        assert!(list.blacklisted.contains("blacklisted_source"));
        assert_eq!(list.len(), 5);
    }

    #[test]
    fn test_is_valid_source() {
        let list = Blocklist::from_html(SAMPLE);
        assert!(list.is_valid_source("https://en.wikipedia.org/wiki/Test"));
        assert!(!list.is_valid_source("https://unreliable_source.com"));
        assert!(!list.is_valid_source("https://deprecated_source.org"));
        assert!(!list.is_valid_source("https://www.blacklisted_source.net/page"));
    }

    #[test]
    fn test_registrable_domain_match() {
        let mut list = Blocklist::default();
        list.blacklisted.insert("evil.com".to_string());
        assert!(!list.is_valid_source("https://evil.com/page"));
        assert!(list.is_valid_source("https://good.com/page"));
    }

    #[test]
    fn test_urls_without_domain_are_valid() {
        let mut list = Blocklist::default();
        list.blacklisted.insert("localhost".to_string());
        assert!(list.is_valid_source("http://localhost:8080/x"));
        assert!(list.is_valid_source("not a url"));
        assert!(list.is_valid_source(""));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let list = Blocklist::load(Path::new("/definitely/not/here.html"));
        assert!(list.is_empty());
    }
}
