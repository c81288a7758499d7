use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A named external search provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Duckduckgo,
    Searxng,
    Bing,
    Yourdm,
    Arxiv,
}

impl Engine {
    pub const ALL: [Engine; 5] = [
        Engine::Duckduckgo,
        Engine::Searxng,
        Engine::Bing,
        Engine::Yourdm,
        Engine::Arxiv,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Duckduckgo => "duckduckgo",
            Engine::Searxng => "searxng",
            Engine::Bing => "bing",
            Engine::Yourdm => "yourdm",
            Engine::Arxiv => "arxiv",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named language-model backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    Ollama,
    Openai,
    Anthropic,
}

impl ModelProvider {
    pub const ALL: [ModelProvider; 3] = [
        ModelProvider::Ollama,
        ModelProvider::Openai,
        ModelProvider::Anthropic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelProvider::Ollama => "ollama",
            ModelProvider::Openai => "openai",
            ModelProvider::Anthropic => "anthropic",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
    }

    /// Env var holding the API key, if the provider needs one.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            ModelProvider::Ollama => None,
            ModelProvider::Openai => Some("OPENAI_API_KEY"),
            ModelProvider::Anthropic => Some("ANTHROPIC_API_KEY"),
        }
    }
}

impl fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type EngineSettings = BTreeMap<String, BTreeMap<String, Value>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub primary_engine: Engine,
    pub fallback_engine: Option<Engine>,
    pub search_top_k: usize,
    pub retrieve_top_k: usize,
    pub engine_settings: EngineSettings,
    /// Top-level fields this build does not know about, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        let mut engine_settings = EngineSettings::new();
        engine_settings.insert(
            "searxng".to_string(),
            BTreeMap::from([
                ("base_url".to_string(), Value::String(String::new())),
                ("api_key".to_string(), Value::String(String::new())),
            ]),
        );
        for engine in ["bing", "yourdm"] {
            engine_settings.insert(
                engine.to_string(),
                BTreeMap::from([("api_key".to_string(), Value::String(String::new()))]),
            );
        }
        Self {
            primary_engine: Engine::Duckduckgo,
            fallback_engine: None,
            search_top_k: 3,
            retrieve_top_k: 3,
            engine_settings,
            extra: Map::new(),
        }
    }
}

impl SearchOptions {
    /// A string credential for `engine`, treating empty strings as unset.
    pub fn engine_setting(&self, engine: Engine, field: &str) -> Option<String> {
        self.engine_settings
            .get(engine.as_str())
            .and_then(|m| m.get(field))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    pub model: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmSettings {
    pub primary_model: ModelProvider,
    pub fallback_model: Option<ModelProvider>,
    pub model_settings: BTreeMap<String, ModelSettings>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        let model_settings = BTreeMap::from([
            (
                "ollama".to_string(),
                ModelSettings {
                    model: "jaigouk/hermes-2-theta-llama-3:latest".to_string(),
                    max_tokens: 500,
                },
            ),
            (
                "openai".to_string(),
                ModelSettings { model: "gpt-4o-mini".to_string(), max_tokens: 500 },
            ),
            (
                "anthropic".to_string(),
                ModelSettings {
                    model: "claude-3-haiku-20240307".to_string(),
                    max_tokens: 500,
                },
            ),
        ]);
        Self {
            primary_model: ModelProvider::Ollama,
            fallback_model: None,
            model_settings,
        }
    }
}

impl LlmSettings {
    /// Settings for `provider`, falling back to the built-in defaults.
    pub fn model_for(&self, provider: ModelProvider) -> ModelSettings {
        self.model_settings
            .get(provider.as_str())
            .cloned()
            .or_else(|| {
                LlmSettings::default()
                    .model_settings
                    .remove(provider.as_str())
            })
            .unwrap_or(ModelSettings { model: String::new(), max_tokens: 500 })
    }
}

pub const UNCATEGORIZED: &str = "Uncategorized";
pub const PAGE_SIZE_OPTIONS: [usize; 4] = [12, 24, 48, 96];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralSettings {
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
    #[serde(default = "default_num_columns")]
    pub num_columns: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_categories() -> Vec<String> {
    vec![UNCATEGORIZED.to_string()]
}
fn default_num_columns() -> usize { 2 }
fn default_page_size() -> usize { 12 }

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            num_columns: default_num_columns(),
            page_size: default_page_size(),
        }
    }
}

/// Trace collector settings for the pipeline process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixSettings {
    #[serde(default = "default_project_name")]
    pub project_name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_collector_endpoint")]
    pub collector_endpoint: String,
}

fn default_project_name() -> String { "storm-wiki".to_string() }
fn default_collector_endpoint() -> String { "localhost:6006".to_string() }

impl Default for PhoenixSettings {
    fn default() -> Self {
        Self {
            project_name: default_project_name(),
            enabled: false,
            collector_endpoint: default_collector_endpoint(),
        }
    }
}

impl PhoenixSettings {
    /// OTLP trace endpoint, only when tracing is enabled.
    pub fn traces_endpoint(&self) -> Option<String> {
        self.enabled
            .then(|| format!("http://{}/v1/traces", self.collector_endpoint))
    }
}
