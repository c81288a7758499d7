use super::path::SearchOptionPath;
use super::types::{GeneralSettings, LlmSettings, PhoenixSettings, SearchOptions, UNCATEGORIZED};
use super::{
    Result, SettingsError, GENERAL_SETTINGS_KEY, LLM_SETTINGS_KEY, PHOENIX_SETTINGS_KEY,
    SEARCH_OPTIONS_KEY, THEME_KEY,
};
use crate::theme::Theme;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// SQLite-backed settings table. Holds only the database path; connections
/// are opened per operation and closed when it returns.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Open (creating if needed) the settings database at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self { path: path.into() };
        let conn = store.connect()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT
            );",
        )?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!(path = %parent.display(), error = %e, "failed to create settings directory");
            }
        }
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(conn)
    }

    /// Insert or replace `key` with the JSON encoding of `value`.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        let conn = self.connect()?;
        conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, json],
        )?;
        Ok(())
    }

    /// The raw JSON stored under `key`, or `None` when no row exists.
    pub fn load_raw(&self, key: &str) -> Result<Option<Value>> {
        let conn = self.connect()?;
        let text: Option<Option<String>> = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        match text.flatten() {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.load_raw(key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub fn load_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T> {
        Ok(self.load(key)?.unwrap_or(default))
    }

    /// Like `load_raw`, but a stored JSON `null` counts as absent.
    fn load_present(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.load_raw(key)?.filter(|v| !v.is_null()))
    }

    // ── Search options ──────────────────────────────────────────────────

    pub fn save_search_options(&self, options: &SearchOptions) -> Result<()> {
        self.save(SEARCH_OPTIONS_KEY, options)
    }

    pub fn load_search_options(&self) -> Result<SearchOptions> {
        let merged = self.search_options_value()?;
        Ok(serde_json::from_value(Value::Object(merged))?)
    }

    /// Stored search options with missing or malformed top-level fields
    /// taken from defaults.
    fn search_options_value(&self) -> Result<Map<String, Value>> {
        let defaults = object_of(SEARCH_OPTIONS_KEY, serde_json::to_value(SearchOptions::default())?)?;
        match self.load_present(SEARCH_OPTIONS_KEY)? {
            Some(Value::Object(mut stored)) => {
                fill_missing(&mut stored, defaults.clone());
                repair_search_options(&mut stored, &defaults);
                Ok(stored)
            }
            Some(other) => {
                tracing::warn!(found = %other, "stored search options are not an object, using defaults");
                Ok(defaults)
            }
            None => Ok(defaults),
        }
    }

    /// Set one search option addressed by a dotted key.
    ///
    /// One segment replaces a top-level field; three segments drill into
    /// `<section>.<group>.<field>`, creating the intermediate maps.
    pub fn update_search_option(&self, key: &str, value: Value) -> Result<SearchOptions> {
        let path: SearchOptionPath = key.parse()?;
        let mut options = self.search_options_value()?;

        match &path {
            SearchOptionPath::Field(field) => {
                options.insert(field.clone(), value);
            }
            SearchOptionPath::Nested { section, group, field } => {
                let section_map = child_object(&mut options, section, key)?;
                let group_map = child_object(section_map, group, key)?;
                group_map.insert(field.clone(), value);
            }
        }

        let updated: SearchOptions = serde_json::from_value(Value::Object(options))?;
        self.save_search_options(&updated)?;
        tracing::debug!(key = %path, "updated search option");
        Ok(updated)
    }

    // ── LLM settings ────────────────────────────────────────────────────

    pub fn save_llm_settings(&self, settings: &LlmSettings) -> Result<()> {
        self.save(LLM_SETTINGS_KEY, settings)?;
        tracing::info!(
            settings = %serde_json::to_string(settings).unwrap_or_default(),
            "saved LLM settings"
        );
        Ok(())
    }

    /// Stored LLM settings, backfilling missing fields and missing providers.
    pub fn load_llm_settings(&self) -> Result<LlmSettings> {
        let defaults = LlmSettings::default();
        let Some(stored) = self.load_present(LLM_SETTINGS_KEY)? else {
            return Ok(defaults);
        };
        let mut stored = object_of(LLM_SETTINGS_KEY, stored)?;
        let default_models = defaults.model_settings.clone();
        fill_missing(&mut stored, object_of(LLM_SETTINGS_KEY, serde_json::to_value(&defaults)?)?);

        let mut settings: LlmSettings = serde_json::from_value(Value::Object(stored))?;
        for (name, model) in default_models {
            settings.model_settings.entry(name).or_insert(model);
        }
        Ok(settings)
    }

    // ── General, tracing and theme ──────────────────────────────────────

    pub fn save_general_settings(&self, settings: &GeneralSettings) -> Result<()> {
        self.save(GENERAL_SETTINGS_KEY, settings)
    }

    pub fn load_general_settings(&self) -> Result<GeneralSettings> {
        match self.load_present(GENERAL_SETTINGS_KEY)? {
            Some(v) => Ok(serde_json::from_value(v)?),
            None => Ok(GeneralSettings::default()),
        }
    }

    pub fn load_categories(&self) -> Result<Vec<String>> {
        let mut categories = self.load_general_settings()?.categories;
        if categories.is_empty() {
            categories.push(UNCATEGORIZED.to_string());
        }
        Ok(categories)
    }

    pub fn save_categories(&self, categories: &[String]) -> Result<()> {
        let mut general = self.load_general_settings()?;
        general.categories = categories.to_vec();
        self.save_general_settings(&general)
    }

    pub fn save_phoenix_settings(&self, settings: &PhoenixSettings) -> Result<()> {
        self.save(PHOENIX_SETTINGS_KEY, settings)
    }

    pub fn load_phoenix_settings(&self) -> Result<PhoenixSettings> {
        match self.load_present(PHOENIX_SETTINGS_KEY)? {
            Some(v) => Ok(serde_json::from_value(v)?),
            None => Ok(PhoenixSettings::default()),
        }
    }

    pub fn save_theme(&self, theme: &Theme) -> Result<()> {
        self.save(THEME_KEY, theme)
    }

    pub fn load_theme(&self) -> Result<Theme> {
        match self.load_present(THEME_KEY)? {
            Some(v) => Ok(serde_json::from_value(v)?),
            None => Ok(Theme::default()),
        }
    }
}

fn object_of(key: &str, value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(SettingsError::NotAnObject { key: key.to_string() }),
    }
}

/// Copy every top-level entry of `defaults` that `target` lacks.
fn fill_missing(target: &mut Map<String, Value>, defaults: Map<String, Value>) {
    for (key, value) in defaults {
        target.entry(key).or_insert(value);
    }
}

/// Drop engine groups that are not maps and reset any top-level field that
/// fails to deserialize, so one bad value does not hide the rest.
fn repair_search_options(stored: &mut Map<String, Value>, defaults: &Map<String, Value>) {
    if let Some(Value::Object(groups)) = stored.get_mut("engine_settings") {
        groups.retain(|group, settings| {
            let valid = settings.is_object();
            if !valid {
                tracing::warn!(group = %group, "dropping malformed engine settings");
            }
            valid
        });
    }
    if serde_json::from_value::<SearchOptions>(Value::Object(stored.clone())).is_ok() {
        return;
    }
    for (key, default) in defaults {
        let Some(value) = stored.get(key) else { continue };
        let mut candidate = defaults.clone();
        candidate.insert(key.clone(), value.clone());
        if serde_json::from_value::<SearchOptions>(Value::Object(candidate)).is_err() {
            tracing::warn!(field = %key, "malformed search option, using default");
            stored.insert(key.clone(), default.clone());
        }
    }
}

fn child_object<'a>(
    parent: &'a mut Map<String, Value>,
    name: &str,
    full_key: &str,
) -> Result<&'a mut Map<String, Value>> {
    let slot = parent
        .entry(name.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if slot.is_null() {
        *slot = Value::Object(Map::new());
    }
    slot.as_object_mut()
        .ok_or_else(|| SettingsError::NotAnObject { key: full_key.to_string() })
}
