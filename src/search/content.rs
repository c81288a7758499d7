//! Full-page text extraction for search results.

use anyhow::{Context, Result};
use reqwest::Client;
use scraper::{ElementRef, Html, Node, Selector};
use std::time::Duration;

/// Download `url` and reduce it to readable text.
pub async fn fetch_page_text(client: &Client, url: &str, timeout: Duration) -> Result<String> {
    let resp = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .with_context(|| format!("request to {} failed", url))?;

    let status = resp.status();
    if !status.is_success() {
        anyhow::bail!("{} returned {}", url, status);
    }

    let body = resp.text().await.context("failed to read page body")?;
    Ok(html_to_text(&body))
}

/// Visible text of an HTML document, one block element per line.
pub fn html_to_text(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let document = Html::parse_document(html);
    let root = Selector::parse("body")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .unwrap_or_else(|| document.root_element());

    let mut out = String::new();
    collect_text(root, &mut out, 0);

    out.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(element: ElementRef, out: &mut String, depth: usize) {
    // Malformed documents can nest absurdly deep.
    if depth > 50 {
        return;
    }
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                if !out.is_empty() && !out.ends_with(' ') && !out.ends_with('\n') {
                    out.push(' ');
                }
                out.push_str(text);
            }
            Node::Element(el) => {
                let tag = el.name();
                if matches!(tag, "script" | "style" | "noscript" | "head") {
                    continue;
                }
                let block = matches!(
                    tag,
                    "div" | "p" | "br" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "li"
                        | "ul" | "ol" | "blockquote" | "pre" | "table" | "tr" | "section" | "article"
                );
                if block && !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out, depth + 1);
                }
                if block && !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text_skips_scripts() {
        let html = "<html><head><title>t</title></head><body><h1>Title</h1>\
                    <script>var x = 1;</script><p>First <b>bold</b> para.</p>\
                    <div>Second</div></body></html>";
        assert_eq!(html_to_text(html), "Title\nFirst bold para.\nSecond");
    }

    #[test]
    fn test_html_to_text_empty() {
        assert_eq!(html_to_text(""), "");
    }
}
