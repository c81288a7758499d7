use crate::config::OllamaConfig;
use crate::settings::{LlmSettings, ModelProvider};
use std::collections::BTreeMap;

/// Token budget for the polishing role when running on a local model.
const OLLAMA_POLISH_MAX_TOKENS: u32 = 4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LmRole {
    ConvSimulator,
    QuestionAsker,
    OutlineGen,
    ArticleGen,
    ArticlePolish,
}

impl LmRole {
    pub const ALL: [LmRole; 5] = [
        LmRole::ConvSimulator,
        LmRole::QuestionAsker,
        LmRole::OutlineGen,
        LmRole::ArticleGen,
        LmRole::ArticlePolish,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LmRole::ConvSimulator => "conv_simulator",
            LmRole::QuestionAsker => "question_asker",
            LmRole::OutlineGen => "outline_gen",
            LmRole::ArticleGen => "article_gen",
            LmRole::ArticlePolish => "article_polish",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoleConfig {
    pub model: String,
    pub max_tokens: u32,
}

/// Model assignment for every pipeline role, bound to one provider.
#[derive(Debug, Clone, PartialEq)]
pub struct LmConfigs {
    pub provider: ModelProvider,
    /// Only set for local providers.
    pub base_url: Option<String>,
    pub roles: BTreeMap<LmRole, RoleConfig>,
}

impl LmConfigs {
    pub fn for_provider(provider: ModelProvider, settings: &LlmSettings, ollama: &OllamaConfig) -> Self {
        let model = settings.model_for(provider);
        let roles = LmRole::ALL
            .into_iter()
            .map(|role| {
                let max_tokens = match (provider, role) {
                    (ModelProvider::Ollama, LmRole::ArticlePolish) => OLLAMA_POLISH_MAX_TOKENS,
                    _ => model.max_tokens,
                };
                (role, RoleConfig { model: model.model.clone(), max_tokens })
            })
            .collect();
        let base_url = (provider == ModelProvider::Ollama)
            .then(|| format!("{}:{}", ollama.url.trim_end_matches('/'), ollama.port));
        Self { provider, base_url, roles }
    }

    pub fn role(&self, role: LmRole) -> Option<&RoleConfig> {
        self.roles.get(&role)
    }

    /// `(KEY, value)` pairs describing this configuration to a child process.
    pub fn env_vars(&self) -> Vec<(String, String)> {
        let mut vars = vec![("STORM_LM_PROVIDER".to_string(), self.provider.as_str().to_string())];
        if let Some(url) = &self.base_url {
            vars.push(("STORM_LM_BASE_URL".to_string(), url.clone()));
        }
        for (role, cfg) in &self.roles {
            let prefix = format!("STORM_LM_{}", role.as_str().to_uppercase());
            vars.push((format!("{}_MODEL", prefix), cfg.model.clone()));
            vars.push((format!("{}_MAX_TOKENS", prefix), cfg.max_tokens.to_string()));
        }
        vars
    }
}
