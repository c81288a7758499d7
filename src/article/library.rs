use super::text::{strip_reference_titles, CitationDict, ConversationLogEntry, UrlToInfo};
use crate::settings::{SettingsStore, UNCATEGORIZED};
use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const POLISHED_ARTICLE: &str = "storm_gen_article_polished.md";
pub const ARTICLE: &str = "storm_gen_article.md";
pub const URL_TO_INFO: &str = "url_to_info.json";
pub const CONVERSATION_LOG: &str = "conversation_log.json";

pub const MOD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// File name → absolute path for one article folder.
pub type ArticleFiles = BTreeMap<String, PathBuf>;

/// Folder name for a topic: trimmed, spaces to underscores, no trailing `_`.
pub fn sanitize_title(title: &str) -> String {
    title.trim().replace(' ', "_").trim_end_matches('_').to_string()
}

/// Map each subdirectory of `root` to its files. A missing root is empty.
pub fn read_structure(root: &Path) -> Result<BTreeMap<String, ArticleFiles>> {
    let mut structure = BTreeMap::new();
    if !root.is_dir() {
        return Ok(structure);
    }
    for entry in fs::read_dir(root).with_context(|| format!("failed to list {}", root.display()))? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        structure.insert(name, read_files(&path)?);
    }
    Ok(structure)
}

fn read_files(dir: &Path) -> Result<ArticleFiles> {
    let mut files = ArticleFiles::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            let abs = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
            files.insert(name.to_string(), abs);
        }
    }
    Ok(files)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArticleEntry {
    pub category: String,
    pub name: String,
    pub path: PathBuf,
    pub files: ArticleFiles,
    pub modified: DateTime<Local>,
}

impl ArticleEntry {
    /// Display title: underscores back to spaces.
    pub fn title(&self) -> String {
        self.name.replace('_', " ")
    }
}

/// Articles under each category folder, newest first.
///
/// Top-level folders that are not categories (layouts from before
/// categories existed) are listed as uncategorized.
pub fn list_articles(output_dir: &Path, categories: &[String]) -> Result<Vec<ArticleEntry>> {
    let mut entries = Vec::new();
    for (dir_name, files) in read_structure(output_dir)? {
        let dir = output_dir.join(&dir_name);
        if categories.iter().any(|c| c == &dir_name) {
            for (name, files) in read_structure(&dir)? {
                let path = dir.join(&name);
                entries.push(ArticleEntry {
                    category: dir_name.clone(),
                    modified: latest_modification_time(&path),
                    name,
                    path,
                    files,
                });
            }
        } else if !files.is_empty() {
            entries.push(ArticleEntry {
                category: UNCATEGORIZED.to_string(),
                modified: latest_modification_time(&dir),
                name: dir_name,
                path: dir,
                files,
            });
        }
    }
    entries.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
    Ok(entries)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArticleData {
    pub article: String,
    pub citations: Option<CitationDict>,
    pub url_to_info: Option<UrlToInfo>,
    pub conversation_log: Option<Vec<ConversationLogEntry>>,
}

impl ArticleData {
    /// Leading prose for list previews, skipping headings and date lines.
    pub fn preview(&self, max_chars: usize) -> String {
        let body: String = self
            .article
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with("Last Modified:"))
            .filter(|l| NaiveDate::parse_from_str(l, "%Y-%m-%d").is_err())
            .collect::<Vec<_>>()
            .join(" ");
        body.chars().take(max_chars).collect()
    }
}

/// Load an article's text plus its citations and conversation log.
///
/// Prefers the polished article, then the unpolished one, then a finalized
/// `<name>.md`. Returns `None` when the folder has none of them.
pub fn assemble_article(name: &str, files: &ArticleFiles) -> Result<Option<ArticleData>> {
    let finalized = format!("{}.md", name);
    let article = if let Some(path) = files.get(POLISHED_ARTICLE).or_else(|| files.get(ARTICLE)) {
        let content = read_text(path)?;
        let today = Local::now().format("%Y-%m-%d");
        strip_reference_titles(&format!("{}\n\n{}", today, content))
    } else if let Some(path) = files.get(&finalized) {
        strip_reference_titles(&read_text(path)?)
    } else {
        return Ok(None);
    };

    let url_to_info = match files.get(URL_TO_INFO) {
        Some(path) => Some(read_json::<UrlToInfo>(path)?),
        None => None,
    };
    let conversation_log = match files.get(CONVERSATION_LOG) {
        Some(path) => Some(read_json::<Vec<ConversationLogEntry>>(path)?),
        None => None,
    };

    Ok(Some(ArticleData {
        article,
        citations: url_to_info.as_ref().map(UrlToInfo::citation_dict),
        url_to_info,
        conversation_log,
    }))
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = read_text(path)?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// Newest mtime of `path` or any file beneath it; now if there are no files.
pub fn latest_modification_time(path: &Path) -> DateTime<Local> {
    fn walk(path: &Path, latest: &mut Option<DateTime<Local>>) {
        if path.is_dir() {
            let Ok(entries) = fs::read_dir(path) else { return };
            for entry in entries.flatten() {
                walk(&entry.path(), latest);
            }
        } else if let Ok(modified) = fs::metadata(path).and_then(|m| m.modified()) {
            let modified = DateTime::<Local>::from(modified);
            if latest.map_or(true, |l| modified > l) {
                *latest = Some(modified);
            }
        }
    }

    let mut latest = None;
    walk(path, &mut latest);
    latest.unwrap_or_else(Local::now)
}

/// Ensure the `Uncategorized` category exists and move every top-level
/// folder that is not a category into it. Returns the number moved.
pub fn migrate_existing_articles(output_dir: &Path, store: &SettingsStore) -> Result<usize> {
    let mut categories = store.load_categories()?;
    if !categories.iter().any(|c| c == UNCATEGORIZED) {
        categories.push(UNCATEGORIZED.to_string());
        store.save_categories(&categories)?;
    }

    let target = output_dir.join(UNCATEGORIZED);
    fs::create_dir_all(&target).with_context(|| format!("failed to create {}", target.display()))?;

    let mut moved = 0;
    for name in read_structure(output_dir)?.into_keys() {
        if categories.contains(&name) {
            continue;
        }
        let from = output_dir.join(&name);
        let to = target.join(&name);
        if to.exists() {
            tracing::warn!(article = %name, "already present in {}, skipping", UNCATEGORIZED);
            continue;
        }
        fs::rename(&from, &to).with_context(|| format!("failed to move {}", from.display()))?;
        moved += 1;
    }
    tracing::info!(moved, "migration complete");
    Ok(moved)
}

/// Create a category folder and register it in settings.
pub fn add_category(output_dir: &Path, store: &SettingsStore, name: &str) -> Result<Vec<String>> {
    let name = name.trim();
    anyhow::ensure!(!name.is_empty(), "category name cannot be empty");
    let mut categories = store.load_categories()?;
    if !categories.iter().any(|c| c == name) {
        categories.push(name.to_string());
        store.save_categories(&categories)?;
    }
    fs::create_dir_all(output_dir.join(name))?;
    Ok(categories)
}

/// Move an article folder into another category.
pub fn move_article(output_dir: &Path, article: &ArticleEntry, category: &str) -> Result<PathBuf> {
    let target_dir = output_dir.join(category);
    fs::create_dir_all(&target_dir)?;
    let to = target_dir.join(&article.name);
    anyhow::ensure!(!to.exists(), "{} already exists in {}", article.name, category);
    fs::rename(&article.path, &to).with_context(|| format!("failed to move {}", article.path.display()))?;
    Ok(to)
}

/// One page of a paginated list; `number` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub total_pages: usize,
    pub start: usize,
    pub end: usize,
}

impl Page {
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// Slice bounds for `page` (clamped into range) of `len` items.
pub fn paginate(len: usize, page_size: usize, page: usize) -> Page {
    let page_size = page_size.max(1);
    let total_pages = len.div_ceil(page_size).max(1);
    let number = page.clamp(1, total_pages);
    let start = ((number - 1) * page_size).min(len);
    let end = (start + page_size).min(len);
    Page { number, total_pages, start, end }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("  Quantum computing  "), "Quantum_computing");
        assert_eq!(sanitize_title("Trailing space _"), "Trailing_space");
        assert_eq!(sanitize_title(""), "");
    }

    #[test]
    fn test_paginate() {
        let p = paginate(30, 12, 3);
        assert_eq!((p.start, p.end, p.total_pages), (24, 30, 3));
        assert_eq!(paginate(30, 12, 99).number, 3);
        assert_eq!(paginate(0, 12, 1).range(), 0..0);
        assert_eq!(paginate(5, 12, 0).number, 1);
    }

    #[test]
    fn test_read_structure_missing_root() {
        assert!(read_structure(Path::new("/no/such/root")).unwrap().is_empty());
    }

    #[test]
    fn test_preview_skips_date_and_headings() {
        let data = ArticleData {
            article: "2024-01-01\n\n# Title\n\nFirst paragraph here.\n## Section\nMore.".to_string(),
            citations: None,
            url_to_info: None,
            conversation_log: None,
        };
        assert_eq!(data.preview(15), "First paragraph");
    }
}
