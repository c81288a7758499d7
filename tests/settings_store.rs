// Integration tests for the SQLite settings store

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use storm_wiki::settings::{
        Engine, GeneralSettings, LlmSettings, ModelProvider, SearchOptions, SettingsError, SettingsStore,
        SEARCH_OPTIONS_KEY, LLM_SETTINGS_KEY,
    };
    use storm_wiki::theme::{find_builtin, Theme};

    fn store() -> (tempfile::TempDir, SettingsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open(dir.path().join("nested").join("settings.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_values_survive_reopen() {
        let (dir, store) = store();
        store.save("custom", &json!({"a": [1, 2, 3]})).unwrap();

        let reopened = SettingsStore::open(dir.path().join("nested").join("settings.db")).unwrap();
        assert_eq!(reopened.load_raw("custom").unwrap(), Some(json!({"a": [1, 2, 3]})));
    }

    #[test]
    fn test_full_search_options_load_back_unchanged() {
        let (_dir, store) = store();
        let stored = json!({
            "primary_engine": "bing",
            "fallback_engine": null,
            "search_top_k": 5,
            "retrieve_top_k": 3,
            "engine_settings": {}
        });
        store.save(SEARCH_OPTIONS_KEY, &stored).unwrap();

        let options = store.load_search_options().unwrap();
        assert_eq!(options.primary_engine, Engine::Bing);
        assert_eq!(options.fallback_engine, None);
        assert!(options.engine_settings.is_empty());
        assert_eq!(serde_json::to_value(&options).unwrap(), stored);
    }

    #[test]
    fn test_bools_nulls_and_nested_values_round_trip() {
        let (_dir, store) = store();
        let value = json!({
            "enabled": true,
            "disabled": false,
            "missing": null,
            "nested": {"deeper": {"list": [1, "two", {"three": 3.5}], "flag": true}}
        });
        store.save("mixed", &value).unwrap();
        assert_eq!(store.load::<Value>("mixed").unwrap(), Some(value));

        store.save("flag", &false).unwrap();
        assert_eq!(store.load::<bool>("flag").unwrap(), Some(false));
    }

    #[test]
    fn test_defaults_when_nothing_stored() {
        let (_dir, store) = store();
        assert_eq!(store.load_search_options().unwrap(), SearchOptions::default());
        assert_eq!(store.load_llm_settings().unwrap(), LlmSettings::default());
        assert_eq!(store.load_general_settings().unwrap(), GeneralSettings::default());
        assert_eq!(store.load_theme().unwrap(), Theme::default());
    }

    #[test]
    fn test_partial_search_options_are_filled_from_defaults() {
        let (_dir, store) = store();
        store
            .save(SEARCH_OPTIONS_KEY, &json!({"primary_engine": "bing", "search_top_k": 7, "custom_flag": true}))
            .unwrap();

        let options = store.load_search_options().unwrap();
        assert_eq!(options.primary_engine, Engine::Bing);
        assert_eq!(options.search_top_k, 7);
        assert_eq!(options.retrieve_top_k, 3);
        assert!(options.engine_settings.contains_key("searxng"));
        assert_eq!(options.extra.get("custom_flag"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_update_search_option_top_level_and_nested() {
        let (_dir, store) = store();
        store.update_search_option("search_top_k", json!(10)).unwrap();
        store
            .update_search_option("engine_settings.searxng.base_url", json!("http://searx.local"))
            .unwrap();
        let updated = store
            .update_search_option("engine_settings.brave.api_key", json!("secret"))
            .unwrap();

        assert_eq!(updated.search_top_k, 10);
        assert_eq!(updated.engine_setting(Engine::Searxng, "base_url").as_deref(), Some("http://searx.local"));
        assert_eq!(updated.engine_settings["brave"]["api_key"], json!("secret"));

        // Persisted, not just returned
        assert_eq!(store.load_search_options().unwrap(), updated);
    }

    #[test]
    fn test_update_search_option_rejects_bad_keys() {
        let (_dir, store) = store();
        for key in ["engine_settings.searxng", "a.b.c.d", "", "engine_settings..x"] {
            let err = store.update_search_option(key, json!(1)).unwrap_err();
            assert!(matches!(err, SettingsError::InvalidKeyFormat(_)), "{key}: {err}");
        }
        assert_eq!(store.load_raw(SEARCH_OPTIONS_KEY).unwrap(), None);
    }

    #[test]
    fn test_llm_settings_backfill_missing_providers() {
        let (_dir, store) = store();
        store
            .save(
                LLM_SETTINGS_KEY,
                &json!({
                    "primary_model": "anthropic",
                    "model_settings": {"anthropic": {"model": "claude-custom", "max_tokens": 900}}
                }),
            )
            .unwrap();

        let llm = store.load_llm_settings().unwrap();
        assert_eq!(llm.primary_model, ModelProvider::Anthropic);
        assert_eq!(llm.fallback_model, None);
        assert_eq!(llm.model_for(ModelProvider::Anthropic).model, "claude-custom");
        assert_eq!(llm.model_for(ModelProvider::Openai).model, "gpt-4o-mini");
        assert!(llm.model_settings.contains_key("ollama"));
    }

    #[test]
    fn test_theme_round_trip_through_store() {
        let (_dir, store) = store();
        let theme = find_builtin("Solarized Light").unwrap_or_default();
        store.save_theme(&theme).unwrap();
        assert_eq!(store.load_theme().unwrap(), theme);
    }
}
