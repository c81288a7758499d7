use crate::article::sanitize_title;
use crate::config::{Config, StoragePaths};
use crate::runner::command::CommandPipelineFactory;
use crate::runner::finalize::convert_txt_to_md;
use crate::runner::{finalize_article, RunEvent, RunOutcome, Runner};
use crate::search::SearchAdapter;
use crate::settings::{SettingsStore, UNCATEGORIZED};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Everything resolved once at startup and shared by the CLI and dashboard.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: Config,
    pub paths: StoragePaths,
    pub store: SettingsStore,
}

impl AppContext {
    pub fn init(config: Config) -> Result<Self> {
        let paths = config.storage_paths();
        Self::with_paths(config, paths)
    }

    pub fn with_paths(config: Config, paths: StoragePaths) -> Result<Self> {
        std::fs::create_dir_all(&paths.output_dir)
            .with_context(|| format!("failed to create {}", paths.output_dir.display()))?;
        let store = SettingsStore::open(&paths.db_path)
            .with_context(|| format!("failed to open settings at {}", paths.db_path.display()))?;

        let converted = convert_txt_to_md(&paths.output_dir)?;
        if converted > 0 {
            tracing::info!(converted, "converted legacy txt articles");
        }
        Ok(Self { config, paths, store })
    }

    pub fn category_dir(&self, category: &str) -> PathBuf {
        self.paths.output_dir.join(category)
    }

    pub fn search_adapter(&self) -> Result<SearchAdapter> {
        let options = self.store.load_search_options()?;
        Ok(SearchAdapter::from_settings(&options, &self.config.search))
    }

    pub fn runner(&self) -> Result<Runner> {
        let factory = CommandPipelineFactory {
            runner: self.config.runner.clone(),
            search: self.store.load_search_options()?,
            phoenix: self.store.load_phoenix_settings()?,
        };
        Ok(Runner::new(
            Box::new(factory),
            self.store.load_llm_settings()?,
            self.config.ollama.clone(),
            Duration::from_secs(self.config.runner.timeout_s),
        ))
    }

    /// Generate an article for `topic` into `category` and finalize it.
    /// Returns the article folder.
    pub async fn generate(
        &self,
        topic: &str,
        category: Option<&str>,
        progress: Option<&UnboundedSender<RunEvent>>,
    ) -> Result<PathBuf> {
        let name = sanitize_title(topic);
        anyhow::ensure!(!name.is_empty(), "Topic could not be empty");

        let working_dir = self.category_dir(category.unwrap_or(UNCATEGORIZED));
        std::fs::create_dir_all(&working_dir)?;

        let runner = self.runner()?;
        match runner.run_with_fallback(topic.trim(), &working_dir, progress).await {
            RunOutcome::Completed { provider, .. } => {
                tracing::info!(topic, provider = %provider, "article generated");
                finalize_article(&working_dir, &name)
            }
            RunOutcome::Failed { primary_error, fallback_error } => match fallback_error {
                Some(fallback) => anyhow::bail!(
                    "Failed to generate the article: {} (fallback: {})",
                    primary_error,
                    fallback
                ),
                None => anyhow::bail!("Failed to generate the article: {}", primary_error),
            },
        }
    }
}
