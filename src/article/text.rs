//! Text transformations applied to generated articles before display.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub url: String,
    pub title: String,
    pub snippets: Vec<String>,
}

/// Citation index → source, as referenced by `[n]` markers in the article.
pub type CitationDict = BTreeMap<usize, Citation>;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UrlInfo {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippets: Vec<String>,
}

/// Shape of the pipeline's `url_to_info.json`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UrlToInfo {
    #[serde(default)]
    pub url_to_unified_index: BTreeMap<String, usize>,
    #[serde(default)]
    pub url_to_info: BTreeMap<String, UrlInfo>,
}

impl UrlToInfo {
    pub fn citation_dict(&self) -> CitationDict {
        self.url_to_unified_index
            .iter()
            .map(|(url, index)| {
                let info = self.url_to_info.get(url).cloned().unwrap_or_default();
                (
                    *index,
                    Citation {
                        url: url.clone(),
                        title: info.title,
                        snippets: info.snippets,
                    },
                )
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DialogueTurn {
    #[serde(default)]
    pub user_utterance: String,
    #[serde(default)]
    pub agent_utterance: String,
}

/// One persona's entry in `conversation_log.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConversationLogEntry {
    #[serde(default)]
    pub perspective: String,
    #[serde(default)]
    pub dlg_turns: Vec<DialogueTurn>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersonaConversation {
    pub name: String,
    pub description: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TocEntry {
    pub level: usize,
    pub title: String,
    pub anchor: String,
}

fn cached(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

/// Strip `[n]` markers and table separators from a sentence.
pub fn remove_citations(sent: &str) -> String {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let stripped = match cached(&RE, r" ?\[\d+") {
        Some(re) => re.replace_all(sent, "").into_owned(),
        None => sent.to_string(),
    };
    stripped.replace(" |", "").replace(']', "")
}

/// Drop quoted titles from reference lines: `[1]: "Title" http://…` → `[1]: http://…`.
pub fn strip_reference_titles(text: &str) -> String {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    match cached(&RE, r#"\]:\s+"(.*?)"\s+http"#) {
        Some(re) => re.replace_all(text, "]: http").into_owned(),
        None => text.to_string(),
    }
}

/// Turn every `[n]` into a markdown link to the cited URL (`#` if unknown).
pub fn add_inline_citation_links(article: &str, citations: &CitationDict) -> String {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = cached(&RE, r"\[(\d+)\]") else {
        return article.to_string();
    };
    re.replace_all(article, |caps: &Captures| {
        let index = &caps[1];
        let url = index
            .parse::<usize>()
            .ok()
            .and_then(|i| citations.get(&i))
            .map(|c| c.url.as_str())
            .unwrap_or("#");
        format!("[[{}]]({})", index, url)
    })
    .into_owned()
}

/// Markdown reference list ordered by citation index.
pub fn construct_bibliography(info: &UrlToInfo) -> String {
    let mut entries: Vec<(&String, &usize)> = info.url_to_unified_index.iter().collect();
    entries.sort_by_key(|(_, index)| **index);
    let lines: Vec<String> = entries
        .into_iter()
        .map(|(url, index)| {
            let title = info.url_to_info.get(url).map(|i| i.title.as_str()).unwrap_or("");
            format!("[{}]: [{}]({})", index, title, url)
        })
        .collect();
    format!("# References\n\n{}", lines.join("\n\n"))
}

/// Split each perspective into name and description and flatten its turns
/// into alternating user/assistant messages.
pub fn parse_conversation_history(log: &[ConversationLogEntry]) -> Vec<PersonaConversation> {
    log.iter()
        .map(|entry| {
            let (name, description) = entry
                .perspective
                .split_once(": ")
                .or_else(|| entry.perspective.split_once("- "))
                .map(|(n, d)| (n.to_string(), d.to_string()))
                .unwrap_or_else(|| (String::new(), entry.perspective.clone()));

            let messages = entry
                .dlg_turns
                .iter()
                .flat_map(|turn| {
                    [
                        Message {
                            role: Role::User,
                            content: turn.user_utterance.clone(),
                        },
                        Message {
                            role: Role::Assistant,
                            content: remove_citations(&turn.agent_utterance),
                        },
                    ]
                })
                .collect();

            PersonaConversation { name, description, messages }
        })
        .collect()
}

/// Table of contents from markdown headings.
pub fn generate_toc(markdown: &str) -> Vec<TocEntry> {
    markdown
        .lines()
        .filter(|line| line.starts_with('#'))
        .map(|line| {
            let level = line.chars().take_while(|c| *c == '#').count();
            let title = line.trim_start_matches('#').trim().to_string();
            let anchor = anchor_for(&title);
            TocEntry { level, title, anchor }
        })
        .filter(|entry| !entry.title.is_empty())
        .collect()
}

fn anchor_for(title: &str) -> String {
    let dashed: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    dashed.trim_matches('-').to_string()
}
