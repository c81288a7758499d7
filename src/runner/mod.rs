//! Orchestration of the external article-generation pipeline.
//!
//! The pipeline itself is a black box behind [`ArticlePipeline`]; this module
//! sequences its phases, applies the per-attempt timeout and retries once on
//! the fallback model provider.

pub mod command;
pub mod finalize;
pub mod lm_config;
pub mod orchestrator;

pub use command::CommandPipeline;
pub use finalize::finalize_article;
pub use lm_config::{LmConfigs, LmRole, RoleConfig};
pub use orchestrator::{read_output, run_step, RunOutcome, Runner};

use crate::settings::ModelProvider;
use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Research,
    Outline,
    Article,
    Polish,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Research, Phase::Outline, Phase::Article, Phase::Polish];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Research => "research",
            Phase::Outline => "outline",
            Phase::Article => "article",
            Phase::Polish => "polish",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == s.trim().to_lowercase())
    }

    /// Progress line shown while the phase runs.
    pub fn description(&self) -> &'static str {
        match self {
            Phase::Research => "Conducting research",
            Phase::Outline => "Generating outline",
            Phase::Article => "Writing article",
            Phase::Polish => "Polishing article",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which phases a single pipeline invocation should execute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseFlags {
    pub do_research: bool,
    pub do_generate_outline: bool,
    pub do_generate_article: bool,
    pub do_polish_article: bool,
}

impl PhaseFlags {
    pub fn only(phase: Phase) -> Self {
        let mut flags = Self::default();
        match phase {
            Phase::Research => flags.do_research = true,
            Phase::Outline => flags.do_generate_outline = true,
            Phase::Article => flags.do_generate_article = true,
            Phase::Polish => flags.do_polish_article = true,
        }
        flags
    }

    pub fn all() -> Self {
        Self {
            do_research: true,
            do_generate_outline: true,
            do_generate_article: true,
            do_polish_article: true,
        }
    }

    pub fn phases(&self) -> Vec<Phase> {
        Phase::ALL
            .into_iter()
            .filter(|p| match p {
                Phase::Research => self.do_research,
                Phase::Outline => self.do_generate_outline,
                Phase::Article => self.do_generate_article,
                Phase::Polish => self.do_polish_article,
            })
            .collect()
    }
}

/// Progress notifications emitted while a run is in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Info(String),
    Step {
        provider: ModelProvider,
        index: usize,
        total: usize,
        phase: Phase,
    },
    ProviderFailed {
        provider: ModelProvider,
        error: String,
    },
    Completed {
        provider: ModelProvider,
        elapsed_secs: f64,
    },
}

impl fmt::Display for RunEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunEvent::Info(msg) => f.write_str(msg),
            RunEvent::Step { provider, index, total, phase } => {
                write!(f, "[{}/{}] {} with {}...", index, total, phase.description(), provider)
            }
            RunEvent::ProviderFailed { provider, error } => {
                write!(f, "{} process failed: {}", provider, error)
            }
            RunEvent::Completed { provider, elapsed_secs } => {
                write!(f, "{} process completed in {:.2} seconds.", provider, elapsed_secs)
            }
        }
    }
}

/// Intermediate and final pipeline artifacts in the working directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Outline,
    Article,
    PolishedArticle,
}

impl OutputKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            OutputKind::Outline => "outline.txt",
            OutputKind::Article => "storm_gen_article.md",
            OutputKind::PolishedArticle => "storm_gen_article_polished.md",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "outline" => Some(OutputKind::Outline),
            "article" => Some(OutputKind::Article),
            "polished_article" | "polished" => Some(OutputKind::PolishedArticle),
            _ => None,
        }
    }
}

#[async_trait]
pub trait ArticlePipeline: Send + Sync {
    /// Execute the flagged phases for `topic`.
    async fn run(&self, topic: &str, phases: PhaseFlags) -> Result<()>;
    /// Persist run metadata once every phase has finished.
    async fn post_run(&self) -> Result<()>;
    fn output_dir(&self) -> &Path;
}

/// Builds a pipeline bound to one model provider.
pub trait PipelineFactory: Send + Sync {
    fn build(&self, provider: ModelProvider, lm: &LmConfigs, output_dir: &Path) -> Result<Box<dyn ArticlePipeline>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_flags_only_sets_one() {
        let flags = PhaseFlags::only(Phase::Outline);
        assert!(flags.do_generate_outline);
        assert!(!flags.do_research && !flags.do_generate_article && !flags.do_polish_article);
        assert_eq!(flags.phases(), vec![Phase::Outline]);
    }

    #[test]
    fn test_all_phases_in_order() {
        assert_eq!(PhaseFlags::all().phases(), Phase::ALL.to_vec());
    }

    #[test]
    fn test_phase_parse() {
        assert_eq!(Phase::parse("Polish"), Some(Phase::Polish));
        assert_eq!(Phase::parse("publish"), None);
    }

    #[test]
    fn test_output_kind_files() {
        assert_eq!(OutputKind::parse("polished_article").unwrap().file_name(), "storm_gen_article_polished.md");
        assert_eq!(OutputKind::Outline.file_name(), "outline.txt");
        assert_eq!(OutputKind::parse("summary"), None);
    }
}
