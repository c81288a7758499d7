use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const ENV_FILE: &str = ".env";

/// Env var that overrides `storage.output_dir`.
pub const OUTPUT_DIR_ENV: &str = "STREAMLIT_OUTPUT_DIR";
/// Env var that overrides `storage.db_path`.
pub const DB_PATH_ENV: &str = "DB_PATH";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("DEMO_WORKING_DIR")
}

fn default_db_path() -> PathBuf {
    PathBuf::from("settings.db")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            db_path: default_db_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Saved copy of the perennial-sources reference page.
    pub blocklist_path: Option<PathBuf>,
    /// Fetch every result page instead of trusting the provider snippet.
    #[serde(default)]
    pub fetch_content: bool,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_s: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_duckduckgo_url")]
    pub duckduckgo_url: String,
}

fn default_fetch_timeout() -> u64 { 120 }
fn default_request_timeout() -> u64 { 10_000 }
fn default_duckduckgo_url() -> String {
    "https://html.duckduckgo.com/html/".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            blocklist_path: None,
            fetch_content: false,
            fetch_timeout_s: default_fetch_timeout(),
            request_timeout_ms: default_request_timeout(),
            duckduckgo_url: default_duckduckgo_url(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RunnerConfig {
    /// Program that hosts the external generation pipeline.
    #[serde(default = "default_runner_command")]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Wall-clock limit for one full provider attempt.
    #[serde(default = "default_runner_timeout")]
    pub timeout_s: u64,
    #[serde(default = "default_three")]
    pub max_conv_turn: u32,
    #[serde(default = "default_three")]
    pub max_perspective: u32,
}

fn default_runner_command() -> String { "python3".to_string() }
fn default_runner_timeout() -> u64 { 300 }
fn default_three() -> u32 { 3 }

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            command: default_runner_command(),
            args: Vec::new(),
            timeout_s: default_runner_timeout(),
            max_conv_turn: 3,
            max_perspective: 3,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub url: String,
    #[serde(default = "default_ollama_port")]
    pub port: u16,
}

fn default_ollama_url() -> String { "http://localhost".to_string() }
fn default_ollama_port() -> u16 { 11434 }

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            port: default_ollama_port(),
        }
    }
}

/// Storage locations, resolved once at startup and passed down explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct StoragePaths {
    pub output_dir: PathBuf,
    pub db_path: PathBuf,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| "Failed to parse config TOML")?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load .env file into process environment. Real env vars take precedence.
    pub fn load_env_file() {
        let path = Path::new(ENV_FILE);
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return,
        };
        // Strip BOM if present (common on Windows-created files)
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
        for line in content.lines() {
            let line = line.trim().trim_matches('\r');
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"').trim_matches('\'');
                if std::env::var(key).is_err() {
                    std::env::set_var(key, value);
                }
            }
        }
    }

    /// Resolve storage paths: env overrides win over the config file.
    pub fn storage_paths(&self) -> StoragePaths {
        self.storage_paths_with(|key| std::env::var(key).ok())
    }

    pub fn storage_paths_with(&self, lookup: impl Fn(&str) -> Option<String>) -> StoragePaths {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        StoragePaths {
            output_dir: non_empty(OUTPUT_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| self.storage.output_dir.clone()),
            db_path: non_empty(DB_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| self.storage.db_path.clone()),
        }
    }
}

/// Read a credential from the environment, ignoring empty values.
pub fn env_key(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(key) if !key.trim().is_empty() => Some(sanitize_key(&key)),
        _ => None,
    }
}

/// Strip carriage returns, BOM, and other invisible chars from a key/path value.
fn sanitize_key(raw: &str) -> String {
    raw.replace(['\r', '\u{feff}', '\u{200b}'], "")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parses() {
        let config = Config::load(Path::new("config.toml")).unwrap();
        assert_eq!(config.runner.timeout_s, 300);
        assert_eq!(config.runner.max_conv_turn, 3);
        assert_eq!(config.ollama.port, 11434);
        assert!(!config.search.fetch_content);
        assert_eq!(config.storage.db_path, PathBuf::from("settings.db"));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.search.fetch_timeout_s, 120);
        assert_eq!(config.runner.command, "python3");
        assert_eq!(config.storage.output_dir, PathBuf::from("DEMO_WORKING_DIR"));
    }

    #[test]
    fn test_env_overrides_storage_paths() {
        let config = Config::default();
        let paths = config.storage_paths_with(|key| match key {
            OUTPUT_DIR_ENV => Some("/tmp/articles".to_string()),
            DB_PATH_ENV => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(paths.output_dir, PathBuf::from("/tmp/articles"));
        assert_eq!(paths.db_path, PathBuf::from("settings.db"));
    }

    #[test]
    fn test_sanitize_key_strips_invisible_chars() {
        assert_eq!(sanitize_key("\u{feff}abc\r\n"), "abc");
    }
}
