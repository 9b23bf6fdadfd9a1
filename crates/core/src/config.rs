//! Typed configuration sections and environment-variable resolution.
//!
//! The YAML loading, two-layer deep-merge and validation live in `pulse-config`;
//! this module only defines the shapes those layers populate, plus the
//! profiled env-var lookup helpers shared by every section that reads a secret.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load `.env` (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries `{PROFILE}_{KEY}` first, falls back to `{KEY}`.
pub fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

pub fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

/// Active profile, read from the `PROFILE` env var (uppercased; empty = default).
pub fn active_profile() -> String {
    env_opt("PROFILE").unwrap_or_default().to_uppercase()
}

// ── Credentials (env-only; never stored in YAML) ──────────────────────

/// Platform credentials required to establish a user session. See SPEC_FULL §6.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_id: i32,
    pub api_hash: String,
    pub phone: String,
    pub llm_api_key: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{0} must be a positive integer, got '{1}'")]
    InvalidApiId(&'static str, String),
    #[error("API_HASH must be exactly 32 characters")]
    InvalidApiHash,
    #[error("PHONE must be '+' followed by 10-15 digits")]
    InvalidPhone,
    #[error("LLM_API_KEY must be at least 20 characters")]
    InvalidLlmApiKey,
}

impl Credentials {
    /// Resolve and validate required credentials from the environment,
    /// honoring the active profile prefix.
    pub fn from_env(profile: &str) -> Result<Self, CredentialsError> {
        let api_id_raw = profiled_env_opt(profile, "API_ID")
            .ok_or(CredentialsError::Missing("API_ID"))?;
        let api_id: i32 = api_id_raw
            .parse()
            .ok()
            .filter(|v| *v > 0)
            .ok_or_else(|| CredentialsError::InvalidApiId("API_ID", api_id_raw.clone()))?;

        let api_hash =
            profiled_env_opt(profile, "API_HASH").ok_or(CredentialsError::Missing("API_HASH"))?;
        if api_hash.len() != 32 {
            return Err(CredentialsError::InvalidApiHash);
        }

        let phone = profiled_env_opt(profile, "PHONE").ok_or(CredentialsError::Missing("PHONE"))?;
        if !is_valid_phone(&phone) {
            return Err(CredentialsError::InvalidPhone);
        }

        let llm_api_key = profiled_env_opt(profile, "LLM_API_KEY")
            .ok_or(CredentialsError::Missing("LLM_API_KEY"))?;
        if llm_api_key.len() < 20 {
            return Err(CredentialsError::InvalidLlmApiKey);
        }

        Ok(Self {
            api_id,
            api_hash,
            phone,
            llm_api_key,
        })
    }
}

fn is_valid_phone(phone: &str) -> bool {
    let Some(digits) = phone.strip_prefix('+') else {
        return false;
    };
    let len = digits.chars().count();
    (10..=15).contains(&len) && digits.chars().all(|c| c.is_ascii_digit())
}

// ── YAML-backed sections (SPEC_FULL §6) ────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct AggregatorConfig {
    pub paths: PathsConfig,
    pub database: DatabaseConfig,
    pub listener: ListenerConfig,
    pub filters: FiltersConfig,
    pub processor: ProcessorConfig,
    pub embeddings: EmbeddingsConfig,
    pub moderation: ModerationConfig,
    pub publication: PublicationConfig,
    pub llm: LlmSectionConfig,
    pub cleanup: CleanupConfig,
    pub logging: LoggingConfig,
    pub categories: Vec<CategoryConfig>,
    pub status_reporter: StatusReporterConfig,
}

/// One named quota bucket the selection stage fills (SPEC_FULL §4.E). Not
/// named as a top-level section in the distilled config enumeration, which
/// only specifies `select_by_categories`'s *inputs* (`category_counts`,
/// `category_descriptions`) without saying where they come from; grounded on
/// `news_processor.py`'s dynamic `channels.*.category_counts` reading and its
/// per-marketplace `Category` records, generalized here into one ordinary
/// config list instead of a marketplace-specific sub-tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryConfig {
    pub name: String,
    pub description: String,
    pub quota: u32,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            database: DatabaseConfig::default(),
            listener: ListenerConfig::default(),
            filters: FiltersConfig::default(),
            processor: ProcessorConfig::default(),
            embeddings: EmbeddingsConfig::default(),
            moderation: ModerationConfig::default(),
            publication: PublicationConfig::default(),
            llm: LlmSectionConfig::default(),
            cleanup: CleanupConfig::default(),
            logging: LoggingConfig::default(),
            categories: vec![CategoryConfig {
                name: "general".to_string(),
                description: "Important news relevant to a broad audience.".to_string(),
                quota: 15,
            }],
            status_reporter: StatusReporterConfig::default(),
        }
    }
}

/// The orchestrator's second wall-clock job (SPEC_FULL §5: "every N minutes
/// (configurable) trigger the status reporter"). Not named as its own
/// section in the distilled config enumeration, which only specifies the
/// behavior, not where its interval is configured; grounded on
/// `services/status_reporter.py`'s own polling cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct StatusReporterConfig {
    pub interval_minutes: u32,
}

impl Default for StatusReporterConfig {
    fn default() -> Self {
        Self { interval_minutes: 60 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub sessions_dir: PathBuf,
    pub db_file_pattern: String,
    pub log_file_pattern: String,
    pub session_file_pattern: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            logs_dir: PathBuf::from("logs"),
            sessions_dir: PathBuf::from("sessions"),
            db_file_pattern: "{data_dir}/{profile}.db".into(),
            log_file_pattern: "{logs_dir}/{profile}.log".into(),
            session_file_pattern: "{sessions_dir}/{profile}.session".into(),
        }
    }
}

impl PathsConfig {
    /// Expand a pattern string against this config's directories and the given profile.
    pub fn expand(&self, pattern: &str, profile: &str) -> String {
        pattern
            .replace("{profile}", if profile.is_empty() { "default" } else { profile })
            .replace("{data_dir}", &self.data_dir.to_string_lossy())
            .replace("{logs_dir}", &self.logs_dir.to_string_lossy())
            .replace("{sessions_dir}", &self.sessions_dir.to_string_lossy())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    pub timeout_seconds: u32,
    pub busy_timeout_ms: u32,
    pub retry: RetryConfig,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            busy_timeout_ms: 30_000,
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_seconds: f64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_seconds: 0.5,
            backoff_multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerMode {
    Subscriptions,
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct ListenerConfig {
    pub mode: ListenerMode,
    pub min_message_length: u32,
    pub channel_whitelist: Vec<String>,
    pub channel_blacklist: Vec<String>,
    pub manual_channels: Vec<String>,
    pub healthcheck: HealthcheckConfig,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            mode: ListenerMode::Subscriptions,
            min_message_length: 50,
            channel_whitelist: Vec::new(),
            channel_blacklist: Vec::new(),
            manual_channels: Vec::new(),
            healthcheck: HealthcheckConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct HealthcheckConfig {
    pub heartbeat_path: PathBuf,
    pub interval_seconds: u64,
    pub max_age_seconds: u64,
}

impl Default for HealthcheckConfig {
    fn default() -> Self {
        Self {
            heartbeat_path: PathBuf::from("data/heartbeat"),
            interval_seconds: 60,
            max_age_seconds: 180,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct FiltersConfig {
    pub exclude_keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct ProcessorConfig {
    pub schedule_time: String,
    pub timezone: String,
    pub duplicate_threshold: f32,
    pub top_n: u32,
    pub exclude_count: u32,
    pub use_dbscan: bool,
    pub dbscan_eps: Option<f32>,
    pub dbscan_min_samples: usize,
    pub duplicate_time_window_days: u32,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            schedule_time: "09:00".into(),
            timezone: "UTC".into(),
            duplicate_threshold: 0.78,
            top_n: 15,
            exclude_count: 0,
            use_dbscan: false,
            dbscan_eps: None,
            dbscan_min_samples: 2,
            duplicate_time_window_days: 60,
        }
    }
}

impl ProcessorConfig {
    /// `eps = 1 - duplicate_threshold` unless explicitly overridden.
    pub fn dbscan_eps(&self) -> f32 {
        self.dbscan_eps.unwrap_or(1.0 - self.duplicate_threshold)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingsConfig {
    pub model: String,
    pub local_path: Option<String>,
    pub enable_fallback: bool,
    pub allow_remote_download: bool,
    pub normalization: NormalizationConfig,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            model: "nomic-embed-text".into(),
            local_path: None,
            enable_fallback: false,
            allow_remote_download: false,
            normalization: NormalizationConfig::default(),
        }
    }
}

/// Text-normalization toggles applied before encoding (SPEC_FULL §4.B).
/// Whitespace collapsing and trimming are unconditional; everything else is
/// opt-in since it is lossy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct NormalizationConfig {
    pub strip_urls: bool,
    pub strip_emoji: bool,
    pub strip_source_attribution: bool,
    pub source_attribution_patterns: Vec<String>,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            strip_urls: true,
            strip_emoji: false,
            strip_source_attribution: true,
            source_attribution_patterns: vec![
                r"(?i)^\s*источник:\s*\S+".to_string(),
                r"(?i)\S+\s+сообщает:".to_string(),
                r"(?i)по данным \S+,".to_string(),
                r"(?i)\S+\s+заявил:".to_string(),
                r"(?i)согласно \S+,".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct ModerationConfig {
    pub auto: bool,
    pub enabled: bool,
    pub final_top_n: u32,
    pub timeout_hours: u32,
    pub cancel_keywords: Vec<String>,
    pub publish_all_keywords: Vec<String>,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            auto: true,
            enabled: true,
            final_top_n: 15,
            timeout_hours: 2,
            cancel_keywords: vec!["отмена".into(), "cancel".into()],
            publish_all_keywords: vec!["0".into(), "все".into(), "all".into()],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct PublicationConfig {
    pub channel: String,
    pub preview_channel: Option<String>,
    pub header_template: String,
    pub footer_template: String,
    pub notify_account: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct LlmSectionConfig {
    pub provider: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub chunk_size: u32,
    pub prompts: std::collections::HashMap<String, String>,
}

impl Default for LlmSectionConfig {
    fn default() -> Self {
        Self {
            provider: "generative".into(),
            model: String::new(),
            max_tokens: 4096,
            temperature: 0.1,
            chunk_size: 200,
            prompts: std::collections::HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct CleanupConfig {
    pub raw_messages_days: u32,
    pub published_days: u32,
    pub run_weekly: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            raw_messages_days: 14,
            published_days: 60,
            run_weekly: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub datefmt: String,
    pub file: Option<String>,
    pub rotate: RotateConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "%(asctime)s %(levelname)s %(name)s: %(message)s".into(),
            datefmt: "%Y-%m-%d %H:%M:%S".into(),
            file: None,
            rotate: RotateConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct RotateConfig {
    pub enabled: bool,
    pub max_bytes: u64,
    pub backup_count: u32,
}

impl Default for ListenerMode {
    fn default() -> Self {
        Self::Subscriptions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_yaml() {
        let cfg = AggregatorConfig::default();
        let yaml = serde_yaml_roundtrip(&cfg);
        assert!(yaml.contains("duplicate_threshold"));
    }

    fn serde_yaml_roundtrip(cfg: &AggregatorConfig) -> String {
        serde_json::to_string(cfg).unwrap()
    }

    #[test]
    fn phone_validation() {
        assert!(is_valid_phone("+15551234567"));
        assert!(!is_valid_phone("15551234567"));
        assert!(!is_valid_phone("+123"));
        assert!(!is_valid_phone("+abc1234567"));
    }

    #[test]
    fn dbscan_eps_defaults_from_threshold() {
        let mut cfg = ProcessorConfig::default();
        cfg.duplicate_threshold = 0.78;
        assert!((cfg.dbscan_eps() - 0.22).abs() < 1e-6);
    }

    #[test]
    fn path_pattern_expansion() {
        let paths = PathsConfig::default();
        let expanded = paths.expand("{data_dir}/{profile}.db", "PROD");
        assert_eq!(expanded, "data/PROD.db");
    }
}
