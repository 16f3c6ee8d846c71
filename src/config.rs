use crate::catalog::SurveyCatalog;
use crate::conversation::SurveyLimits;
use crate::matcher::DEFAULT_SHORT_KEYWORD_LEN;
use serde::{Deserialize, Serialize};

/// Main configuration structure loaded from conference_bot.toml and environment variables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub survey: SurveyConfig,
    pub runtime: RuntimeConfig,
    pub rephrase: RephraseConfig,
}

/// Survey wording and input limits
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SurveyConfig {
    pub bot_name: String,
    pub max_candidates: usize,
    pub short_keyword_len: usize,
    pub name_max_chars: usize,
    pub detail_max_chars: usize,
    pub insights_max_chars: usize,
    /// Category catalog; the bundled catalog is used when unset
    pub categories_path: Option<String>,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        let limits = SurveyLimits::default();
        Self {
            bot_name: "ConferenceBot".to_string(),
            max_candidates: limits.max_candidates,
            short_keyword_len: DEFAULT_SHORT_KEYWORD_LEN,
            name_max_chars: limits.name_max_chars,
            detail_max_chars: limits.detail_max_chars,
            insights_max_chars: limits.insights_max_chars,
            categories_path: None,
        }
    }
}

impl SurveyConfig {
    pub fn limits(&self) -> SurveyLimits {
        SurveyLimits {
            max_candidates: self.max_candidates,
            short_keyword_len: self.short_keyword_len,
            name_max_chars: self.name_max_chars,
            detail_max_chars: self.detail_max_chars,
            insights_max_chars: self.insights_max_chars,
        }
    }

    pub fn load_catalog(&self) -> crate::error::Result<SurveyCatalog> {
        match &self.categories_path {
            Some(path) => SurveyCatalog::load(path),
            None => SurveyCatalog::bundled(),
        }
    }

    pub fn validate(&mut self) -> anyhow::Result<()> {
        if self.bot_name.trim().is_empty() {
            anyhow::bail!("survey.bot_name must not be empty");
        }
        if self.max_candidates == 0 {
            tracing::warn!("survey.max_candidates is 0, clamping to 1");
            self.max_candidates = 1;
        } else if self.max_candidates > 9 {
            tracing::warn!(
                "survey.max_candidates {} exceeds max 9, clamping to 9",
                self.max_candidates
            );
            self.max_candidates = 9;
        }
        if self.name_max_chars == 0 || self.detail_max_chars == 0 || self.insights_max_chars == 0
        {
            anyhow::bail!("survey character limits must be greater than 0");
        }
        Ok(())
    }
}

/// Host settings for the CLI and web front-ends
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub log_level: String,
    pub http_bind: String,
    pub session_capacity: usize,
    pub session_ttl_sec: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: "conference_bot=info,tower_http=info".to_string(),
            http_bind: "127.0.0.1:8787".to_string(),
            session_capacity: 1024,
            session_ttl_sec: 900,
        }
    }
}

/// Optional LLM rephrasing of bot messages
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RephraseConfig {
    pub enable: bool,
    pub endpoint: String,
    pub model: String,
    pub timeout_ms: u64,
    /// Only ever read from OPENAI_API_KEY
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for RephraseConfig {
    fn default() -> Self {
        Self {
            enable: false,
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_ms: 15_000,
            api_key: None,
        }
    }
}

impl RephraseConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.enable {
            return Ok(());
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            anyhow::bail!("rephrase.endpoint must be an http(s) URL");
        }
        if self.timeout_ms == 0 {
            anyhow::bail!("rephrase.timeout_ms must be > 0");
        }
        if self.api_key.is_none() {
            tracing::warn!("Rephrasing enabled but OPENAI_API_KEY is not set");
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.trim(), "1" | "true" | "yes" | "on"))
}

impl Config {
    /// Load configuration from TOML file and environment variables
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(env_path) = std::env::var("CONF_BOT_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::from_path(".env");
        }

        let config_path = std::env::var("CONFERENCE_BOT_CONFIG")
            .unwrap_or_else(|_| "conference_bot.toml".to_string());

        let mut config: Config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            toml::from_str(&content)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Env-first overrides for survey and runtime settings
    pub fn apply_env_overrides(&mut self) {
        if let Ok(name) = std::env::var("CONF_BOT_NAME") {
            self.survey.bot_name = name;
        }
        if let Some(n) = env_parse("CONF_BOT_MAX_CANDIDATES") {
            self.survey.max_candidates = n;
        }
        if let Some(n) = env_parse("CONF_BOT_SHORT_KEYWORD_LEN") {
            self.survey.short_keyword_len = n;
        }
        if let Some(n) = env_parse("CONF_BOT_NAME_MAX_CHARS") {
            self.survey.name_max_chars = n;
        }
        if let Some(n) = env_parse("CONF_BOT_DETAIL_MAX_CHARS") {
            self.survey.detail_max_chars = n;
        }
        if let Some(n) = env_parse("CONF_BOT_INSIGHTS_MAX_CHARS") {
            self.survey.insights_max_chars = n;
        }
        if let Ok(path) = std::env::var("CONF_BOT_CATEGORIES") {
            self.survey.categories_path = Some(path);
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            self.runtime.log_level = level;
        }
        if let Ok(bind) = std::env::var("CONF_BOT_HTTP_BIND") {
            self.runtime.http_bind = bind;
        }
        if let Some(n) = env_parse("CONF_BOT_SESSION_CAPACITY") {
            self.runtime.session_capacity = n;
        }
        if let Some(n) = env_parse("CONF_BOT_SESSION_TTL_SEC") {
            self.runtime.session_ttl_sec = n;
        }
        if let Some(enable) = env_flag("CONF_BOT_REPHRASE") {
            self.rephrase.enable = enable;
        }
        if let Ok(model) = std::env::var("CONF_BOT_REPHRASE_MODEL") {
            self.rephrase.model = model;
        }
        self.rephrase.api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
    }

    pub fn validate(&mut self) -> anyhow::Result<()> {
        self.survey.validate()?;
        if self.runtime.session_capacity == 0 {
            anyhow::bail!("runtime.session_capacity must be > 0");
        }
        if self.runtime.session_ttl_sec == 0 {
            anyhow::bail!("runtime.session_ttl_sec must be > 0");
        }
        self.rephrase.validate()?;
        Ok(())
    }
}
