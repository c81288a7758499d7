use super::{ArticlePipeline, LmConfigs, PhaseFlags, PipelineFactory};
use crate::config::{env_key, RunnerConfig};
use crate::settings::{ModelProvider, PhoenixSettings, SearchOptions};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Runs the generation pipeline as an external process, one invocation per
/// phase. Model and search configuration travel in `STORM_*` env vars.
pub struct CommandPipeline {
    command: String,
    args: Vec<String>,
    output_dir: PathBuf,
    env: Vec<(String, String)>,
}

impl CommandPipeline {
    pub fn new(runner: &RunnerConfig, lm: &LmConfigs, output_dir: &Path) -> Self {
        let mut env = lm.env_vars();
        env.push(("STORM_MAX_CONV_TURN".to_string(), runner.max_conv_turn.to_string()));
        env.push(("STORM_MAX_PERSPECTIVE".to_string(), runner.max_perspective.to_string()));
        Self {
            command: runner.command.clone(),
            args: runner.args.clone(),
            output_dir: output_dir.to_path_buf(),
            env,
        }
    }

    pub fn with_env(mut self, key: &str, value: impl Into<String>) -> Self {
        self.env.push((key.to_string(), value.into()));
        self
    }

    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    async fn invoke(&self, extra: &[&str]) -> Result<()> {
        let output = Command::new(&self.command)
            .args(&self.args)
            .arg("--output-dir")
            .arg(&self.output_dir)
            .args(extra)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to launch pipeline command '{}'", self.command))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("pipeline exited with {}: {}", output.status, stderr.trim());
        }
        Ok(())
    }
}

#[async_trait]
impl ArticlePipeline for CommandPipeline {
    async fn run(&self, topic: &str, phases: PhaseFlags) -> Result<()> {
        for phase in phases.phases() {
            tracing::debug!(topic, phase = %phase, "invoking pipeline");
            self.invoke(&["--topic", topic, "--phase", phase.as_str()]).await?;
        }
        Ok(())
    }

    async fn post_run(&self) -> Result<()> {
        self.invoke(&["--post-run"]).await
    }

    fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

/// Builds [`CommandPipeline`]s for the configured command.
pub struct CommandPipelineFactory {
    pub runner: RunnerConfig,
    pub search: SearchOptions,
    pub phoenix: PhoenixSettings,
}

impl CommandPipelineFactory {
    /// Configure a pipeline for `provider`, reading its API key through `lookup`.
    pub fn command_for(
        &self,
        provider: ModelProvider,
        lm: &LmConfigs,
        output_dir: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<CommandPipeline> {
        let mut pipeline = CommandPipeline::new(&self.runner, lm, output_dir)
            .with_env("STORM_SEARCH_ENGINE", self.search.primary_engine.as_str())
            .with_env("STORM_SEARCH_TOP_K", self.search.search_top_k.to_string())
            .with_env("STORM_RETRIEVE_TOP_K", self.search.retrieve_top_k.to_string());

        if let Some(fallback) = self.search.fallback_engine {
            pipeline = pipeline.with_env("STORM_SEARCH_FALLBACK_ENGINE", fallback.as_str());
        }
        if let Some(endpoint) = self.phoenix.traces_endpoint() {
            pipeline = pipeline
                .with_env("STORM_PHOENIX_PROJECT", self.phoenix.project_name.clone())
                .with_env("STORM_PHOENIX_ENDPOINT", endpoint);
        }
        if let Some(var) = provider.api_key_env() {
            let key = lookup(var).with_context(|| format!("{} is not set", var))?;
            pipeline = pipeline.with_env(var, key);
        }
        Ok(pipeline)
    }
}

impl PipelineFactory for CommandPipelineFactory {
    fn build(&self, provider: ModelProvider, lm: &LmConfigs, output_dir: &Path) -> Result<Box<dyn ArticlePipeline>> {
        Ok(Box::new(self.command_for(provider, lm, output_dir, env_key)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OllamaConfig;
    use crate::settings::{Engine, LlmSettings};

    fn lm() -> LmConfigs {
        LmConfigs::for_provider(ModelProvider::Ollama, &LlmSettings::default(), &OllamaConfig::default())
    }

    fn factory() -> CommandPipelineFactory {
        CommandPipelineFactory {
            runner: RunnerConfig::default(),
            search: SearchOptions::default(),
            phoenix: PhoenixSettings::default(),
        }
    }

    fn env_value<'a>(pipeline: &'a CommandPipeline, key: &str) -> Option<&'a str> {
        pipeline
            .env()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn no_keys(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_factory_exports_search_settings() {
        let mut factory = factory();
        factory.search.primary_engine = Engine::Bing;
        factory.search.fallback_engine = Some(Engine::Arxiv);
        factory.search.search_top_k = 7;
        factory.search.retrieve_top_k = 4;

        let pipeline = factory
            .command_for(ModelProvider::Ollama, &lm(), Path::new("/tmp/out"), no_keys)
            .unwrap();
        assert_eq!(env_value(&pipeline, "STORM_SEARCH_ENGINE"), Some("bing"));
        assert_eq!(env_value(&pipeline, "STORM_SEARCH_FALLBACK_ENGINE"), Some("arxiv"));
        assert_eq!(env_value(&pipeline, "STORM_SEARCH_TOP_K"), Some("7"));
        assert_eq!(env_value(&pipeline, "STORM_RETRIEVE_TOP_K"), Some("4"));
        assert_eq!(env_value(&pipeline, "STORM_MAX_CONV_TURN"), Some("3"));
        assert_eq!(env_value(&pipeline, "STORM_LM_PROVIDER"), Some("ollama"));
        assert_eq!(env_value(&pipeline, "STORM_PHOENIX_ENDPOINT"), None);
        assert_eq!(pipeline.output_dir(), Path::new("/tmp/out"));
    }

    #[test]
    fn test_factory_without_fallback_engine_omits_it() {
        let pipeline = factory()
            .command_for(ModelProvider::Ollama, &lm(), Path::new("/tmp/out"), no_keys)
            .unwrap();
        assert_eq!(env_value(&pipeline, "STORM_SEARCH_ENGINE"), Some("duckduckgo"));
        assert_eq!(env_value(&pipeline, "STORM_SEARCH_FALLBACK_ENGINE"), None);
    }

    #[test]
    fn test_factory_exports_phoenix_when_enabled() {
        let mut factory = factory();
        factory.phoenix.enabled = true;
        factory.phoenix.project_name = "wiki-traces".to_string();
        factory.phoenix.collector_endpoint = "collector:6006".to_string();

        let pipeline = factory
            .command_for(ModelProvider::Ollama, &lm(), Path::new("/tmp/out"), no_keys)
            .unwrap();
        assert_eq!(env_value(&pipeline, "STORM_PHOENIX_PROJECT"), Some("wiki-traces"));
        assert_eq!(
            env_value(&pipeline, "STORM_PHOENIX_ENDPOINT"),
            Some("http://collector:6006/v1/traces")
        );
    }

    #[test]
    fn test_factory_passes_provider_api_key() {
        let openai = LmConfigs::for_provider(ModelProvider::Openai, &LlmSettings::default(), &OllamaConfig::default());
        let lookup = |var: &str| (var == "OPENAI_API_KEY").then(|| "sk-test".to_string());

        let pipeline = factory()
            .command_for(ModelProvider::Openai, &openai, Path::new("/tmp/out"), lookup)
            .unwrap();
        assert_eq!(env_value(&pipeline, "OPENAI_API_KEY"), Some("sk-test"));
        assert_eq!(env_value(&pipeline, "STORM_LM_PROVIDER"), Some("openai"));
    }

    #[test]
    fn test_factory_missing_api_key_is_an_error() {
        let openai = LmConfigs::for_provider(ModelProvider::Openai, &LlmSettings::default(), &OllamaConfig::default());
        let err = factory()
            .command_for(ModelProvider::Openai, &openai, Path::new("/tmp/out"), no_keys)
            .err().expect("expected an error");
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[tokio::test]
    async fn test_missing_command_is_an_error() {
        let runner = RunnerConfig {
            command: "/nonexistent/storm-pipeline".to_string(),
            ..RunnerConfig::default()
        };
        let pipeline = CommandPipeline::new(&runner, &lm(), Path::new("/tmp/out"));
        assert!(pipeline.run("Topic", PhaseFlags::only(super::super::Phase::Research)).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_carries_stderr() {
        let runner = RunnerConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), "echo boom >&2; exit 3".to_string(), "sh".to_string()],
            ..RunnerConfig::default()
        };
        let pipeline = CommandPipeline::new(&runner, &lm(), Path::new("/tmp/out"));
        let err = pipeline.post_run().await.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
