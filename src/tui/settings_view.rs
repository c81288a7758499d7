use crate::search::available_engines;
use crate::settings::{
    GeneralSettings, LlmSettings, ModelProvider, PhoenixSettings, SearchOptions, SettingsStore,
    PAGE_SIZE_OPTIONS,
};
use crate::theme::{builtin_themes, find_builtin, Theme, ThemeMode};
use anyhow::{Context, Result};
use serde_json::{Map, Value};

#[derive(Debug, Clone)]
pub struct SettingsField {
    pub label: String,
    pub value: String,
    pub field_type: FieldType,
    /// `<section>.<dotted path>` used when persisting the edit.
    pub path: String,
    pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Usize,
    Bool,
    String,
    Secret,
    Enum(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct SettingsTab {
    pub label: String,
    pub fields: Vec<SettingsField>,
}

#[derive(Debug, Clone)]
pub struct SettingsViewState {
    pub tabs: Vec<SettingsTab>,
    pub active_tab: usize,
    pub selected_field: usize,
    pub editing: bool,
    pub edit_buffer: String,
}

impl SettingsViewState {
    pub fn new(tabs: Vec<SettingsTab>) -> Self {
        Self {
            tabs,
            active_tab: 0,
            selected_field: 0,
            editing: false,
            edit_buffer: String::new(),
        }
    }

    /// Swap in freshly built tabs, keeping the cursor where it was.
    pub fn refresh(&mut self, tabs: Vec<SettingsTab>) {
        self.tabs = tabs;
        self.active_tab = self.active_tab.min(self.tabs.len().saturating_sub(1));
        let len = self.tabs.get(self.active_tab).map_or(0, |t| t.fields.len());
        self.selected_field = self.selected_field.min(len.saturating_sub(1));
    }

    pub fn selected(&self) -> Option<&SettingsField> {
        self.tabs.get(self.active_tab)?.fields.get(self.selected_field)
    }

    pub fn next_tab(&mut self) {
        if !self.tabs.is_empty() {
            self.active_tab = (self.active_tab + 1) % self.tabs.len();
            self.selected_field = 0;
        }
    }

    pub fn prev_tab(&mut self) {
        if !self.tabs.is_empty() {
            self.active_tab = (self.active_tab + self.tabs.len() - 1) % self.tabs.len();
            self.selected_field = 0;
        }
    }

    pub fn next_field(&mut self) {
        let len = self.tabs.get(self.active_tab).map_or(0, |t| t.fields.len());
        if self.selected_field + 1 < len {
            self.selected_field += 1;
        }
    }

    pub fn prev_field(&mut self) {
        self.selected_field = self.selected_field.saturating_sub(1);
    }
}

/// Current persisted settings, loaded together for building the tabs.
#[derive(Debug, Clone)]
pub struct SettingsSnapshot {
    pub search: SearchOptions,
    pub llm: LlmSettings,
    pub general: GeneralSettings,
    pub phoenix: PhoenixSettings,
    pub theme: Theme,
}

impl SettingsSnapshot {
    pub fn load(store: &SettingsStore) -> Result<Self> {
        Ok(Self {
            search: store.load_search_options()?,
            llm: store.load_llm_settings()?,
            general: store.load_general_settings()?,
            phoenix: store.load_phoenix_settings()?,
            theme: store.load_theme()?,
        })
    }
}

fn field(label: &str, value: impl ToString, field_type: FieldType, path: &str) -> SettingsField {
    SettingsField {
        label: label.to_string(),
        value: value.to_string(),
        field_type,
        path: path.to_string(),
        read_only: false,
    }
}

fn read_only(label: &str, value: impl ToString) -> SettingsField {
    SettingsField {
        read_only: true,
        ..field(label, value, FieldType::String, "")
    }
}

fn optional_choices<I: IntoIterator<Item = String>>(options: I) -> Vec<String> {
    std::iter::once("none".to_string()).chain(options).collect()
}

pub fn build_settings_tabs(snapshot: &SettingsSnapshot) -> Vec<SettingsTab> {
    vec![
        SettingsTab {
            label: "Search".to_string(),
            fields: build_search_fields(&snapshot.search),
        },
        SettingsTab {
            label: "LLM".to_string(),
            fields: build_llm_fields(&snapshot.llm),
        },
        SettingsTab {
            label: "General".to_string(),
            fields: build_general_fields(&snapshot.general),
        },
        SettingsTab {
            label: "Phoenix".to_string(),
            fields: build_phoenix_fields(&snapshot.phoenix),
        },
        SettingsTab {
            label: "Theme".to_string(),
            fields: build_theme_fields(&snapshot.theme),
        },
    ]
}

fn build_search_fields(search: &SearchOptions) -> Vec<SettingsField> {
    let engines: Vec<String> = available_engines(search).iter().map(|e| e.to_string()).collect();
    let mut primary_choices = engines.clone();
    if !primary_choices.contains(&search.primary_engine.to_string()) {
        primary_choices.push(search.primary_engine.to_string());
    }
    let fallback_choices = optional_choices(
        engines.into_iter().filter(|e| *e != search.primary_engine.as_str()),
    );

    let mut fields = vec![
        field("Primary engine", search.primary_engine, FieldType::Enum(primary_choices), "search.primary_engine"),
        field(
            "Fallback engine",
            search.fallback_engine.map_or("none".to_string(), |e| e.to_string()),
            FieldType::Enum(fallback_choices),
            "search.fallback_engine",
        ),
        field("Search top k", search.search_top_k, FieldType::Usize, "search.search_top_k"),
        field("Retrieve top k", search.retrieve_top_k, FieldType::Usize, "search.retrieve_top_k"),
    ];

    for (group, settings) in &search.engine_settings {
        for (name, value) in settings {
            let text = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
            let kind = if name.contains("key") { FieldType::Secret } else { FieldType::String };
            fields.push(field(
                &format!("{}.{}", group, name),
                text,
                kind,
                &format!("search.engine_settings.{}.{}", group, name),
            ));
        }
    }
    fields
}

fn build_llm_fields(llm: &LlmSettings) -> Vec<SettingsField> {
    let providers: Vec<String> = ModelProvider::ALL.iter().map(|p| p.to_string()).collect();
    let mut fields = vec![
        field("Primary model", llm.primary_model, FieldType::Enum(providers.clone()), "llm.primary_model"),
        field(
            "Fallback model",
            llm.fallback_model.map_or("none".to_string(), |p| p.to_string()),
            FieldType::Enum(optional_choices(providers)),
            "llm.fallback_model",
        ),
    ];
    for provider in ModelProvider::ALL {
        let settings = llm.model_for(provider);
        fields.push(field(
            &format!("{} model", provider),
            settings.model,
            FieldType::String,
            &format!("llm.model_settings.{}.model", provider),
        ));
        fields.push(field(
            &format!("{} max tokens", provider),
            settings.max_tokens,
            FieldType::Usize,
            &format!("llm.model_settings.{}.max_tokens", provider),
        ));
    }
    fields
}

fn build_general_fields(general: &GeneralSettings) -> Vec<SettingsField> {
    vec![
        field(
            "Items per page",
            general.page_size,
            FieldType::Enum(PAGE_SIZE_OPTIONS.iter().map(|n| n.to_string()).collect()),
            "general.page_size",
        ),
        field(
            "Columns",
            general.num_columns,
            FieldType::Enum((1..=4).map(|n: usize| n.to_string()).collect()),
            "general.num_columns",
        ),
        read_only("Categories", general.categories.join(", ")),
    ]
}

fn build_phoenix_fields(phoenix: &PhoenixSettings) -> Vec<SettingsField> {
    vec![
        field("Enabled", phoenix.enabled, FieldType::Bool, "phoenix.enabled"),
        field("Project name", &phoenix.project_name, FieldType::String, "phoenix.project_name"),
        field(
            "Collector endpoint",
            &phoenix.collector_endpoint,
            FieldType::String,
            "phoenix.collector_endpoint",
        ),
    ]
}

fn build_theme_fields(theme: &Theme) -> Vec<SettingsField> {
    let names: Vec<String> = [ThemeMode::Dark, ThemeMode::Light]
        .into_iter()
        .flat_map(builtin_themes)
        .map(|(name, _)| name.to_string())
        .collect();
    let current = [ThemeMode::Dark, ThemeMode::Light]
        .into_iter()
        .flat_map(builtin_themes)
        .find(|(_, t)| t == theme)
        .map_or("Custom".to_string(), |(name, _)| name.to_string());

    vec![
        field("Theme", current, FieldType::Enum(names), "theme.name"),
        field("Primary color", &theme.primary_color, FieldType::String, "theme.primaryColor"),
        field("Background color", &theme.background_color, FieldType::String, "theme.backgroundColor"),
        field(
            "Secondary background",
            &theme.secondary_background_color,
            FieldType::String,
            "theme.secondaryBackgroundColor",
        ),
        field("Text color", &theme.text_color, FieldType::String, "theme.textColor"),
    ]
}

/// Next (or previous) option of an enum field, wrapping around.
pub fn cycle_enum(field: &SettingsField, forward: bool) -> Option<String> {
    let FieldType::Enum(options) = &field.field_type else {
        return None;
    };
    if options.is_empty() {
        return None;
    }
    let len = options.len();
    let idx = options.iter().position(|o| *o == field.value).unwrap_or(0);
    let next = if forward { (idx + 1) % len } else { (idx + len - 1) % len };
    Some(options[next].clone())
}

/// Convert edited text into the JSON value stored for this field.
pub fn parse_value(field_type: &FieldType, raw: &str) -> Result<Value> {
    let raw = raw.trim();
    match field_type {
        FieldType::Usize => {
            let n: u64 = raw.parse().with_context(|| format!("'{}' is not a whole number", raw))?;
            Ok(Value::from(n))
        }
        FieldType::Bool => match raw {
            "true" | "yes" | "on" => Ok(Value::Bool(true)),
            "false" | "no" | "off" => Ok(Value::Bool(false)),
            _ => anyhow::bail!("'{}' is not true/false", raw),
        },
        FieldType::String | FieldType::Secret => Ok(Value::String(raw.to_string())),
        FieldType::Enum(options) => {
            anyhow::ensure!(options.iter().any(|o| o == raw), "'{}' is not a valid choice", raw);
            if raw == "none" {
                Ok(Value::Null)
            } else if let Ok(n) = raw.parse::<u64>() {
                Ok(Value::from(n))
            } else {
                Ok(Value::String(raw.to_string()))
            }
        }
    }
}

fn set_path(target: &mut Value, dotted: &str, value: Value) -> Result<()> {
    let mut current = target;
    let mut segments = dotted.split('.').peekable();
    while let Some(segment) = segments.next() {
        let obj = current
            .as_object_mut()
            .with_context(|| format!("cannot descend into '{}'", segment))?;
        if segments.peek().is_none() {
            obj.insert(segment.to_string(), value);
            return Ok(());
        }
        current = obj
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    anyhow::bail!("empty settings path")
}

fn update_typed<T>(current: T, dotted: &str, value: Value) -> Result<T>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    let mut json = serde_json::to_value(current)?;
    set_path(&mut json, dotted, value)?;
    serde_json::from_value(json).with_context(|| format!("invalid value for {}", dotted))
}

/// Validate and persist an edit to `field`.
pub fn apply_edit(store: &SettingsStore, field: &SettingsField, raw: &str) -> Result<()> {
    anyhow::ensure!(!field.read_only, "{} is read-only", field.label);
    let value = parse_value(&field.field_type, raw)?;
    let (section, rest) = field
        .path
        .split_once('.')
        .with_context(|| format!("bad settings path '{}'", field.path))?;

    match section {
        "search" => {
            store.update_search_option(rest, value)?;
        }
        "llm" => store.save_llm_settings(&update_typed(store.load_llm_settings()?, rest, value)?)?,
        "general" => store.save_general_settings(&update_typed(store.load_general_settings()?, rest, value)?)?,
        "phoenix" => store.save_phoenix_settings(&update_typed(store.load_phoenix_settings()?, rest, value)?)?,
        "theme" if rest == "name" => {
            let theme = find_builtin(raw).with_context(|| format!("unknown theme '{}'", raw))?;
            store.save_theme(&theme)?;
        }
        "theme" => store.save_theme(&update_typed(store.load_theme()?, rest, value)?)?,
        other => anyhow::bail!("unknown settings section '{}'", other),
    }
    tracing::info!(path = %field.path, "setting updated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Engine;

    fn store() -> (tempfile::TempDir, SettingsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open(dir.path().join("settings.db")).unwrap();
        (dir, store)
    }

    fn find<'a>(tabs: &'a [SettingsTab], path: &str) -> &'a SettingsField {
        tabs.iter()
            .flat_map(|t| t.fields.iter())
            .find(|f| f.path == path)
            .unwrap()
    }

    #[test]
    fn test_tabs_cover_every_section() {
        let (_dir, store) = store();
        let tabs = build_settings_tabs(&SettingsSnapshot::load(&store).unwrap());
        let labels: Vec<_> = tabs.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, ["Search", "LLM", "General", "Phoenix", "Theme"]);
        assert_eq!(find(&tabs, "search.primary_engine").value, "duckduckgo");
        assert_eq!(find(&tabs, "llm.model_settings.ollama.max_tokens").value, "500");
        assert_eq!(find(&tabs, "theme.name").value, "Dracula Soft Dark");
    }

    #[test]
    fn test_apply_nested_search_edit() {
        let (_dir, store) = store();
        let tabs = build_settings_tabs(&SettingsSnapshot::load(&store).unwrap());
        apply_edit(&store, find(&tabs, "search.engine_settings.bing.api_key"), "secret").unwrap();
        apply_edit(&store, find(&tabs, "search.search_top_k"), "7").unwrap();
        let opts = store.load_search_options().unwrap();
        assert_eq!(opts.engine_setting(Engine::Bing, "api_key").as_deref(), Some("secret"));
        assert_eq!(opts.search_top_k, 7);
    }

    #[test]
    fn test_apply_llm_and_general_edits() {
        let (_dir, store) = store();
        let tabs = build_settings_tabs(&SettingsSnapshot::load(&store).unwrap());
        apply_edit(&store, find(&tabs, "llm.fallback_model"), "openai").unwrap();
        apply_edit(&store, find(&tabs, "general.page_size"), "48").unwrap();
        assert_eq!(store.load_llm_settings().unwrap().fallback_model, Some(ModelProvider::Openai));
        assert_eq!(store.load_general_settings().unwrap().page_size, 48);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let (_dir, store) = store();
        let tabs = build_settings_tabs(&SettingsSnapshot::load(&store).unwrap());
        assert!(apply_edit(&store, find(&tabs, "search.search_top_k"), "many").is_err());
        assert!(apply_edit(&store, find(&tabs, "general.page_size"), "13").is_err());
    }

    #[test]
    fn test_theme_switch() {
        let (_dir, store) = store();
        let tabs = build_settings_tabs(&SettingsSnapshot::load(&store).unwrap());
        apply_edit(&store, find(&tabs, "theme.name"), "GitHub Light").unwrap();
        assert_eq!(store.load_theme().unwrap().background_color, "#ffffff");
    }

    #[test]
    fn test_cycle_enum_wraps() {
        let f = field("x", "b", FieldType::Enum(vec!["a".into(), "b".into()]), "p");
        assert_eq!(cycle_enum(&f, true).as_deref(), Some("a"));
        assert_eq!(cycle_enum(&f, false).as_deref(), Some("a"));
        assert_eq!(cycle_enum(&field("y", "1", FieldType::Usize, "p"), true), None);
    }
}
