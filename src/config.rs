use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::Severity;

pub const DEFAULT_CONFIG_FILE: &str = "abt-audit.toml";
pub const ENV_PREFIX: &str = "ABT_AUDIT_";
pub const API_KEY_FALLBACK_ENV: &str = "ANTHROPIC_API_KEY";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub rules: RuleConfig,
    #[serde(default)]
    pub audience: AudienceConfig,
    #[serde(default)]
    pub ui: UiMatchConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub judge: JudgeConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub max_words: usize,
    pub max_avg_sentence_len: f64,
    pub stale_ui_phrases: Vec<String>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            max_words: 600,
            max_avg_sentence_len: 25.0,
            stale_ui_phrases: [
                "gear icon",
                "go to your shop",
                "direct checkout",
                "alchemy",
                "your shop dashboard",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudienceConfig {
    pub buyer_terms: Vec<String>,
    pub seller_terms: Vec<String>,
    pub min_signal: usize,
    pub dominance_ratio: f64,
}

impl Default for AudienceConfig {
    fn default() -> Self {
        Self {
            buyer_terms: [
                "your order",
                "your purchase",
                "checkout",
                "track your package",
                "your cart",
                "purchases and reviews",
                "contact the seller",
                "buyer",
                "refund",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            seller_terms: [
                "your shop",
                "shop manager",
                "listing fee",
                "listing fees",
                "your listings",
                "order fulfillment",
                "payment account",
                "shipping label",
                "seller",
                "payout",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            min_signal: 1,
            dominance_ratio: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiMatchConfig {
    pub fuzzy_max_edit_distance: usize,
    pub min_substring_len: usize,
}

impl Default for UiMatchConfig {
    fn default() -> Self {
        Self {
            fuzzy_max_edit_distance: 2,
            min_substring_len: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityPenalties {
    pub info: u32,
    pub minor: u32,
    pub major: u32,
    pub critical: u32,
}

impl SeverityPenalties {
    pub fn for_severity(&self, severity: Severity) -> u32 {
        match severity {
            Severity::Info => self.info,
            Severity::Minor => self.minor,
            Severity::Major => self.major,
            Severity::Critical => self.critical,
        }
    }
}

impl Default for SeverityPenalties {
    fn default() -> Self {
        Self {
            info: 0,
            minor: 3,
            major: 10,
            critical: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingBreakpoints {
    pub excellent: u32,
    pub good: u32,
    pub needs_work: u32,
}

impl Default for RatingBreakpoints {
    fn default() -> Self {
        Self {
            excellent: 85,
            good: 65,
            needs_work: 40,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub penalties: SeverityPenalties,
    #[serde(default)]
    pub breakpoints: RatingBreakpoints,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeConfig {
    pub base_url: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub max_content_chars: usize,
}

impl JudgeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key: None,
            max_tokens: 4096,
            timeout_secs: 60,
            max_content_chars: 15_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub source: Option<String>,
    pub cache_ttl_secs: u64,
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            source: None,
            cache_ttl_secs: 300,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    pub concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}

impl AuditConfig {
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            if !path.is_file() {
                return Err(ConfigError::InvalidValue {
                    field: "config",
                    reason: format!("config file not found: {}", path.display()),
                });
            }
        }

        let mut config: Self = Self::figment(config_path).extract()?;
        if config.judge.api_key.is_none() {
            config.judge.api_key = std::env::var(API_KEY_FALLBACK_ENV)
                .ok()
                .filter(|value| !value.trim().is_empty());
        }
        config.validate()?;
        Ok(config)
    }

    pub fn figment(config_path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        let file = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        figment = figment.merge(Toml::file(file));

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rules.max_words == 0 {
            return Err(invalid("rules.max_words", "must be greater than zero"));
        }
        if !(self.rules.max_avg_sentence_len > 0.0) {
            return Err(invalid(
                "rules.max_avg_sentence_len",
                "must be a positive number",
            ));
        }
        if !(self.audience.dominance_ratio >= 1.0) {
            return Err(invalid(
                "audience.dominance_ratio",
                "must be at least 1.0",
            ));
        }

        let breakpoints = &self.scoring.breakpoints;
        if breakpoints.excellent > 100 {
            return Err(invalid("scoring.breakpoints.excellent", "must not exceed 100"));
        }
        if !(breakpoints.excellent > breakpoints.good && breakpoints.good > breakpoints.needs_work)
        {
            return Err(invalid(
                "scoring.breakpoints",
                "must be strictly descending: excellent > good > needs_work",
            ));
        }

        let penalties = &self.scoring.penalties;
        if !(penalties.info <= penalties.minor
            && penalties.minor <= penalties.major
            && penalties.major <= penalties.critical)
        {
            return Err(invalid(
                "scoring.penalties",
                "must not decrease as severity increases",
            ));
        }

        if self.judge.timeout_secs == 0 {
            return Err(invalid("judge.timeout_secs", "must be greater than zero"));
        }
        if self.catalog.timeout_secs == 0 {
            return Err(invalid("catalog.timeout_secs", "must be greater than zero"));
        }
        if self.batch.concurrency == 0 {
            return Err(invalid("batch.concurrency", "must be greater than zero"));
        }

        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}
