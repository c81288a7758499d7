use super::{ArticlePipeline, LmConfigs, OutputKind, Phase, PhaseFlags, PipelineFactory, RunEvent};
use crate::config::OllamaConfig;
use crate::settings::{LlmSettings, ModelProvider};
use anyhow::{Context, Result};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;

/// Result of a generation run across primary and fallback providers.
pub enum RunOutcome {
    Completed {
        provider: ModelProvider,
        pipeline: Box<dyn ArticlePipeline>,
    },
    Failed {
        primary_error: String,
        fallback_error: Option<String>,
    },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }
}

pub struct Runner {
    factory: Box<dyn PipelineFactory>,
    llm: LlmSettings,
    ollama: OllamaConfig,
    timeout: Duration,
}

impl Runner {
    pub fn new(factory: Box<dyn PipelineFactory>, llm: LlmSettings, ollama: OllamaConfig, timeout: Duration) -> Self {
        Self {
            factory,
            llm,
            ollama,
            timeout,
        }
    }

    /// Run every phase on the primary provider; on error or timeout redo the
    /// whole sequence once on the fallback provider.
    pub async fn run_with_fallback(
        &self,
        topic: &str,
        working_dir: &Path,
        progress: Option<&UnboundedSender<RunEvent>>,
    ) -> RunOutcome {
        let primary = self.llm.primary_model;
        emit(progress, RunEvent::Info("Initializing language models...".to_string()));

        let primary_error = match self.attempt(primary, topic, working_dir, progress).await {
            Ok(pipeline) => return RunOutcome::Completed { provider: primary, pipeline },
            Err(e) => {
                tracing::warn!(provider = %primary, topic, error = %e, "generation failed");
                emit(progress, RunEvent::ProviderFailed { provider: primary, error: e.to_string() });
                e.to_string()
            }
        };

        let Some(fallback) = self.llm.fallback_model.filter(|f| *f != primary) else {
            return RunOutcome::Failed { primary_error, fallback_error: None };
        };

        emit(progress, RunEvent::Info(format!("Falling back to {}...", fallback)));
        match self.attempt(fallback, topic, working_dir, progress).await {
            Ok(pipeline) => RunOutcome::Completed { provider: fallback, pipeline },
            Err(e) => {
                tracing::warn!(provider = %fallback, topic, error = %e, "fallback generation failed");
                emit(progress, RunEvent::ProviderFailed { provider: fallback, error: e.to_string() });
                RunOutcome::Failed {
                    primary_error,
                    fallback_error: Some(e.to_string()),
                }
            }
        }
    }

    async fn attempt(
        &self,
        provider: ModelProvider,
        topic: &str,
        working_dir: &Path,
        progress: Option<&UnboundedSender<RunEvent>>,
    ) -> Result<Box<dyn ArticlePipeline>> {
        let lm = LmConfigs::for_provider(provider, &self.llm, &self.ollama);
        let pipeline = self
            .factory
            .build(provider, &lm, working_dir)
            .with_context(|| format!("failed to set up {} pipeline", provider))?;

        let started = Instant::now();
        let total = Phase::ALL.len();
        let sequence = async {
            for (i, phase) in Phase::ALL.into_iter().enumerate() {
                emit(progress, RunEvent::Step { provider, index: i + 1, total, phase });
                run_step(pipeline.as_ref(), phase, topic).await?;
            }
            pipeline.post_run().await.context("post-run failed")
        };

        match tokio::time::timeout(self.timeout, sequence).await {
            Ok(result) => result?,
            Err(_) => anyhow::bail!("{} run timed out after {}s", provider, self.timeout.as_secs()),
        }

        let elapsed_secs = started.elapsed().as_secs_f64();
        tracing::info!(provider = %provider, topic, elapsed_secs, "generation completed");
        emit(progress, RunEvent::Completed { provider, elapsed_secs });
        Ok(pipeline)
    }
}

fn emit(progress: Option<&UnboundedSender<RunEvent>>, event: RunEvent) {
    tracing::info!("{}", event);
    if let Some(tx) = progress {
        let _ = tx.send(event);
    }
}

/// Run a single phase on an existing pipeline.
pub async fn run_step(pipeline: &dyn ArticlePipeline, phase: Phase, topic: &str) -> Result<()> {
    pipeline
        .run(topic, PhaseFlags::only(phase))
        .await
        .with_context(|| format!("error during {} step", phase))
}

/// Contents of one pipeline artifact, or `None` if that phase has not run.
pub fn read_output(dir: &Path, kind: OutputKind) -> Option<String> {
    let path = dir.join(kind.file_name());
    match std::fs::read_to_string(&path) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "pipeline output not available");
            None
        }
    }
}
