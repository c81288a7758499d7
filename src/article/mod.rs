//! Generated-article storage: folder layout, assembly for display, text helpers.

pub mod library;
pub mod text;

pub use library::{
    add_category, assemble_article, latest_modification_time, list_articles, migrate_existing_articles,
    move_article, paginate, read_structure, sanitize_title, ArticleData, ArticleEntry, ArticleFiles, Page,
};
pub use text::{
    add_inline_citation_links, construct_bibliography, generate_toc, parse_conversation_history,
    remove_citations, Citation, CitationDict, PersonaConversation, Role, TocEntry, UrlToInfo,
};
