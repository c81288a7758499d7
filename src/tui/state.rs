use super::settings_view::SettingsViewState;
use crate::article::{
    add_inline_citation_links, construct_bibliography, generate_toc, parse_conversation_history, ArticleData,
    ArticleEntry, PersonaConversation, TocEntry,
};
use crate::settings::GeneralSettings;
use crate::theme::{Palette, Theme};
use std::collections::VecDeque;

const MAX_LOGS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    MyArticles,
    CreateArticle,
    Settings,
}

impl Page {
    pub const ALL: [Page; 3] = [Page::MyArticles, Page::CreateArticle, Page::Settings];

    pub fn title(&self) -> &'static str {
        match self {
            Page::MyArticles => "My Articles",
            Page::CreateArticle => "Create Article",
            Page::Settings => "Settings",
        }
    }

    pub fn index(&self) -> usize {
        Page::ALL.iter().position(|p| p == self).unwrap_or(0)
    }
}

/// Progress of the Create Article page.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateState {
    NotStarted,
    Running { topic: String, step: usize, total: usize },
    Completed { topic: String },
    Failed(String),
}

/// An article opened for reading.
#[derive(Debug, Clone)]
pub struct ArticleView {
    pub title: String,
    pub body: String,
    pub references: Option<String>,
    pub toc: Vec<TocEntry>,
    pub conversations: Vec<PersonaConversation>,
    pub show_conversations: bool,
    pub scroll: u16,
}

impl ArticleView {
    pub fn new(title: String, data: &ArticleData) -> Self {
        let body = match &data.citations {
            Some(citations) => add_inline_citation_links(&data.article, citations),
            None => data.article.clone(),
        };
        Self {
            title,
            toc: generate_toc(&body),
            references: data.url_to_info.as_ref().map(construct_bibliography),
            conversations: data
                .conversation_log
                .as_deref()
                .map(parse_conversation_history)
                .unwrap_or_default(),
            body,
            show_conversations: false,
            scroll: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub page: Page,
    pub articles: Vec<ArticleEntry>,
    pub previews: Vec<String>,
    pub selected_article: usize,
    pub page_number: usize,
    pub general: GeneralSettings,
    pub viewing: Option<ArticleView>,
    pub topic_input: String,
    pub create: CreateState,
    pub settings: SettingsViewState,
    pub palette: Palette,
    pub logs: VecDeque<LogEntry>,
    pub status: Option<String>,
}

impl AppState {
    pub fn new(general: GeneralSettings, theme: &Theme, settings: SettingsViewState) -> Self {
        Self {
            page: Page::MyArticles,
            articles: Vec::new(),
            previews: Vec::new(),
            selected_article: 0,
            page_number: 1,
            general,
            viewing: None,
            topic_input: String::new(),
            create: CreateState::NotStarted,
            settings,
            palette: theme.palette(),
            logs: VecDeque::with_capacity(MAX_LOGS),
            status: None,
        }
    }

    pub fn push_log(&mut self, level: &str, message: String) {
        let time = chrono::Local::now().format("%H:%M:%S").to_string();
        if self.logs.len() >= MAX_LOGS {
            self.logs.pop_front();
        }
        self.logs.push_back(LogEntry {
            time,
            level: level.to_string(),
            message,
        });
    }

    pub fn set_articles(&mut self, articles: Vec<ArticleEntry>, previews: Vec<String>) {
        self.articles = articles;
        self.previews = previews;
        self.selected_article = self.selected_article.min(self.articles.len().saturating_sub(1));
        self.page_number = self.selected_article / self.general.page_size.max(1) + 1;
    }

    pub fn is_running(&self) -> bool {
        matches!(self.create, CreateState::Running { .. })
    }

    pub fn next_page(&mut self) {
        let idx = (self.page.index() + 1) % Page::ALL.len();
        self.page = Page::ALL[idx];
    }

    /// Move the article cursor by `delta`, keeping the visible page in step.
    pub fn move_selection(&mut self, delta: isize) {
        if self.articles.is_empty() {
            return;
        }
        let max = self.articles.len() - 1;
        let next = (self.selected_article as isize + delta).clamp(0, max as isize);
        self.selected_article = next as usize;
        self.page_number = self.selected_article / self.general.page_size.max(1) + 1;
    }
}
