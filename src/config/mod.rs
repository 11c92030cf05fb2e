mod file_config;

pub use file_config::{FileConfig, LlmConfig};

use crate::agent::llm::{
    ApiKeySource, CompletionOptions, LlmProvider, OllamaProvider, OpenAIProvider,
};
use crate::server::RequestsLoggingLevel;
use crate::vibe::SessionSettings;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::sync::Arc;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub public_url: Option<String>,
    pub session_idle_timeout_secs: u64,
    pub session_prune_interval_secs: u64,
    pub quiz_advance_delay_ms: u64,
    pub llm_provider: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub public_url: Option<String>,

    pub session_idle_timeout_secs: u64,
    pub session_prune_interval_secs: u64,
    pub quiz_advance_delay_ms: u64,

    pub llm: LlmSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LlmProviderKind {
    Ollama,
    #[value(name = "openai")]
    OpenAI,
}

impl LlmProviderKind {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            LlmProviderKind::Ollama => "http://localhost:11434",
            LlmProviderKind::OpenAI => "https://api.openai.com/v1",
        }
    }
}

/// Settings for the LLM provider backing the flows.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: LlmProviderKind,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub api_key_command: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
}

impl LlmSettings {
    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: Duration::from_secs(self.timeout_secs),
            ..CompletionOptions::default()
        }
    }

    pub fn build_provider(&self) -> Arc<dyn LlmProvider> {
        match self.provider {
            LlmProviderKind::Ollama => {
                Arc::new(OllamaProvider::new(self.base_url.clone(), self.model.clone()))
            }
            LlmProviderKind::OpenAI => {
                let api_key_source = match (&self.api_key, &self.api_key_command) {
                    (Some(key), _) => ApiKeySource::Static(key.clone()),
                    (None, Some(cmd)) => ApiKeySource::Command(cmd.clone()),
                    (None, None) => ApiKeySource::None,
                };
                Arc::new(OpenAIProvider::new(
                    self.base_url.clone(),
                    self.model.clone(),
                    api_key_source,
                ))
            }
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);
        if port == metrics_port {
            bail!("port and metrics_port must differ (both are {})", port);
        }

        let logging_level = match file.logging_level {
            Some(s) => match parse_logging_level(&s) {
                Some(level) => level,
                None => bail!("Unknown logging_level: {:?}", s),
            },
            None => cli.logging_level.clone(),
        };

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());
        let public_url = file
            .public_url
            .or_else(|| cli.public_url.clone())
            .map(|url| url.trim_end_matches('/').to_string());

        let session_idle_timeout_secs = file
            .session_idle_timeout_secs
            .unwrap_or(cli.session_idle_timeout_secs);
        if session_idle_timeout_secs == 0 {
            bail!("session_idle_timeout_secs must be greater than 0");
        }
        let session_prune_interval_secs = file
            .session_prune_interval_secs
            .unwrap_or(cli.session_prune_interval_secs);
        if session_prune_interval_secs == 0 {
            bail!("session_prune_interval_secs must be greater than 0");
        }
        let quiz_advance_delay_ms = file
            .quiz_advance_delay_ms
            .unwrap_or(cli.quiz_advance_delay_ms);

        let llm = resolve_llm(cli, file.llm.unwrap_or_default())?;

        Ok(Self {
            port,
            metrics_port,
            logging_level,
            frontend_dir_path,
            public_url,
            session_idle_timeout_secs,
            session_prune_interval_secs,
            quiz_advance_delay_ms,
            llm,
        })
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            idle_timeout: Duration::from_secs(self.session_idle_timeout_secs),
            public_url: self.public_url.clone(),
            quiz_advance_delay: Duration::from_millis(self.quiz_advance_delay_ms),
        }
    }

    pub fn session_prune_interval(&self) -> Duration {
        Duration::from_secs(self.session_prune_interval_secs)
    }
}

fn resolve_llm(cli: &CliConfig, file: LlmConfig) -> Result<LlmSettings> {
    let provider = match file.provider.or_else(|| cli.llm_provider.clone()) {
        Some(s) => match LlmProviderKind::from_str(&s, true) {
            Ok(kind) => kind,
            Err(_) => bail!("Unknown LLM provider {:?}, expected ollama or openai", s),
        },
        None => LlmProviderKind::Ollama,
    };

    let base_url = file
        .base_url
        .or_else(|| cli.llm_base_url.clone())
        .unwrap_or_else(|| provider.default_base_url().to_string());

    let model = match file.model.or_else(|| cli.llm_model.clone()) {
        Some(model) if !model.trim().is_empty() => model,
        _ => bail!("LLM model must be specified via --llm-model or [llm].model in config file"),
    };

    let api_key = file.api_key.or_else(|| cli.llm_api_key.clone());
    let api_key_command = file.api_key_command;
    if provider == LlmProviderKind::Ollama && (api_key.is_some() || api_key_command.is_some()) {
        bail!("api_key and api_key_command are only supported by the openai provider");
    }
    if api_key.is_some() && api_key_command.is_some() {
        bail!("Only one of api_key and api_key_command may be set");
    }

    let temperature = file.temperature.unwrap_or(0.7);
    if !(0.0..=2.0).contains(&temperature) {
        bail!("LLM temperature must be between 0.0 and 2.0, got {}", temperature);
    }

    let timeout_secs = file.timeout_secs.unwrap_or(60);
    if timeout_secs == 0 {
        bail!("LLM timeout_secs must be greater than 0");
    }

    Ok(LlmSettings {
        provider,
        base_url,
        model,
        api_key,
        api_key_command,
        temperature,
        max_tokens: file.max_tokens,
        timeout_secs,
    })
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
