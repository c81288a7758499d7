// Integration tests for finalizing, listing and migrating articles

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use storm_wiki::article::{self, assemble_article, list_articles, migrate_existing_articles};
    use storm_wiki::runner::finalize_article;
    use storm_wiki::settings::{SettingsStore, UNCATEGORIZED};

    const URL_TO_INFO: &str = r#"{
        "url_to_unified_index": {"https://a.com": 1, "https://b.com": 2},
        "url_to_info": {
            "https://a.com": {"url": "https://a.com", "title": "Alpha", "snippets": ["first"], "description": ""},
            "https://b.com": {"url": "https://b.com", "title": "Beta", "snippets": ["second"], "description": ""}
        }
    }"#;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_finalize_then_list_and_assemble() {
        let root = tempfile::tempdir().unwrap();
        let category = root.path().join(UNCATEGORIZED);
        let raw = category.join("Rust_language_");
        write(&raw.join("storm_gen_article_polished.txt"), "# Rust\n\nRust is fast [1][2].");
        write(&raw.join("storm_gen_article.txt"), "draft");
        write(&raw.join("url_to_info.json"), URL_TO_INFO);

        let dir = finalize_article(&category, "Rust_language").unwrap();
        assert_eq!(dir, category.join("Rust_language"));
        assert!(!raw.exists());
        assert!(dir.join("Rust_language.md").exists());
        assert!(!dir.join("storm_gen_article_polished.md").exists());
        assert!(!dir.join("storm_gen_article.md").exists());

        let finalized = fs::read_to_string(dir.join("Rust_language.md")).unwrap();
        assert!(finalized.starts_with("Last Modified: "));

        let entries = list_articles(root.path(), &[UNCATEGORIZED.to_string()]).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title(), "Rust language");
        assert_eq!(entries[0].category, UNCATEGORIZED);

        let data = assemble_article(&entries[0].name, &entries[0].files).unwrap().unwrap();
        assert!(data.article.contains("Rust is fast"));
        let citations = data.citations.as_ref().expect("citations from url_to_info");
        assert_eq!(citations.len(), 2);

        let linked = article::add_inline_citation_links(&data.article, citations);
        assert!(linked.contains("https://a.com"));
        assert!(data.preview(200).starts_with("Rust is fast"));
    }

    #[test]
    fn test_folder_without_article_text_is_skipped() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join(UNCATEGORIZED).join("Empty");
        write(&dir.join("url_to_info.json"), URL_TO_INFO);

        let entries = list_articles(root.path(), &[UNCATEGORIZED.to_string()]).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(assemble_article(&entries[0].name, &entries[0].files).unwrap().is_none());
    }

    #[test]
    fn test_migrate_moves_legacy_folders() {
        let root = tempfile::tempdir().unwrap();
        let store = SettingsStore::open(root.path().join("settings.db")).unwrap();
        store.save_categories(&["Science".to_string()]).unwrap();

        write(&root.path().join("Old_topic").join("Old_topic.md"), "old");
        write(&root.path().join("Science").join("Physics").join("Physics.md"), "physics");

        // Legacy folders show up before migration
        let categories = store.load_categories().unwrap();
        let before = list_articles(root.path(), &categories).unwrap();
        assert!(before.iter().any(|a| a.name == "Old_topic" && a.category == UNCATEGORIZED));

        let moved = migrate_existing_articles(root.path(), &store).unwrap();
        assert_eq!(moved, 1);
        assert!(root.path().join(UNCATEGORIZED).join("Old_topic").join("Old_topic.md").exists());
        assert!(root.path().join("Science").join("Physics").exists());

        let categories = store.load_categories().unwrap();
        assert!(categories.contains(&UNCATEGORIZED.to_string()));
        assert!(categories.contains(&"Science".to_string()));

        // Nothing left to move
        assert_eq!(migrate_existing_articles(root.path(), &store).unwrap(), 0);
    }

    #[test]
    fn test_add_category_and_move_article() {
        let root = tempfile::tempdir().unwrap();
        let store = SettingsStore::open(root.path().join("settings.db")).unwrap();
        write(&root.path().join(UNCATEGORIZED).join("Topic").join("Topic.md"), "text");

        let categories = article::add_category(root.path(), &store, "History").unwrap();
        assert_eq!(categories, vec![UNCATEGORIZED.to_string(), "History".to_string()]);

        let entry = list_articles(root.path(), &categories).unwrap().remove(0);
        let moved = article::move_article(root.path(), &entry, "History").unwrap();
        assert_eq!(moved, root.path().join("History").join("Topic"));

        let entries = list_articles(root.path(), &categories).unwrap();
        assert_eq!(entries[0].category, "History");
    }
}
