//! Path-annotated, fail-fast configuration validation.
//!
//! Every range/enum constraint named in SPEC_FULL §6 is checked here; a
//! violation becomes a [`ValidationError`] naming the offending YAML path so
//! a startup failure reads as a multi-line, actionable report rather than a
//! bare panic.

use pulse_core::config::AggregatorConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationResult {
    fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(ValidationError {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        });
    }

    fn error_with_suggestion(
        &mut self,
        path: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) {
        self.valid = false;
        self.errors.push(ValidationError {
            path: path.into(),
            message: message.into(),
            suggestion: Some(suggestion.into()),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            path: path.into(),
            message: message.into(),
        });
    }

    /// Render as the multi-line, path-annotated message the error taxonomy (§7)
    /// requires for `invalid_config`.
    pub fn to_report(&self) -> String {
        let mut lines = Vec::new();
        for e in &self.errors {
            match &e.suggestion {
                Some(s) => lines.push(format!("  {}: {} (did you mean: {})", e.path, e.message, s)),
                None => lines.push(format!("  {}: {}", e.path, e.message)),
            }
        }
        lines.join("\n")
    }
}

fn in_range_u32(result: &mut ValidationResult, path: &str, value: u32, min: u32, max: u32) {
    if value < min || value > max {
        result.error(path, format!("must be between {min} and {max}, got {value}"));
    }
}

fn in_range_f64(result: &mut ValidationResult, path: &str, value: f64, min: f64, max: f64) {
    if value < min || value > max {
        result.error(path, format!("must be between {min} and {max}, got {value}"));
    }
}

/// Validate a fully-merged [`AggregatorConfig`] against every constraint in
/// SPEC_FULL §6.
pub fn validate_config(cfg: &AggregatorConfig) -> ValidationResult {
    let mut result = ValidationResult::new();

    in_range_u32(
        &mut result,
        "database.timeout_seconds",
        cfg.database.timeout_seconds,
        1,
        300,
    );
    in_range_u32(
        &mut result,
        "database.busy_timeout_ms",
        cfg.database.busy_timeout_ms,
        1,
        60_000,
    );
    in_range_u32(
        &mut result,
        "database.retry.max_attempts",
        cfg.database.retry.max_attempts,
        1,
        20,
    );
    in_range_f64(
        &mut result,
        "database.retry.base_delay_seconds",
        cfg.database.retry.base_delay_seconds,
        0.1,
        10.0,
    );
    in_range_f64(
        &mut result,
        "database.retry.backoff_multiplier",
        cfg.database.retry.backoff_multiplier,
        1.0,
        5.0,
    );

    in_range_u32(
        &mut result,
        "listener.min_message_length",
        cfg.listener.min_message_length,
        10,
        1000,
    );

    in_range_f64(
        &mut result,
        "processor.duplicate_threshold",
        cfg.processor.duplicate_threshold as f64,
        0.5,
        1.0,
    );
    in_range_u32(&mut result, "processor.top_n", cfg.processor.top_n, 1, 100);
    in_range_u32(
        &mut result,
        "processor.exclude_count",
        cfg.processor.exclude_count,
        0,
        50,
    );
    in_range_u32(
        &mut result,
        "processor.duplicate_time_window_days",
        cfg.processor.duplicate_time_window_days,
        7,
        180,
    );
    if !is_hh_mm(&cfg.processor.schedule_time) {
        result.error_with_suggestion(
            "processor.schedule_time",
            format!("'{}' is not HH:MM", cfg.processor.schedule_time),
            "09:00",
        );
    }

    in_range_u32(
        &mut result,
        "moderation.timeout_hours",
        cfg.moderation.timeout_hours,
        1,
        24,
    );

    in_range_u32(
        &mut result,
        "llm.max_tokens",
        cfg.llm.max_tokens,
        128,
        8192,
    );
    in_range_f64(
        &mut result,
        "llm.temperature",
        cfg.llm.temperature as f64,
        0.0,
        2.0,
    );
    if cfg.llm.provider != "generative" && cfg.llm.provider != "chat" {
        result.error_with_suggestion(
            "llm.provider",
            format!("unknown provider '{}'", cfg.llm.provider),
            "generative or chat",
        );
    }

    const LOG_LEVELS: [&str; 5] = ["debug", "info", "warning", "error", "critical"];
    if !LOG_LEVELS.contains(&cfg.logging.level.to_lowercase().as_str()) {
        result.error_with_suggestion(
            "logging.level",
            format!("unknown level '{}'", cfg.logging.level),
            "DEBUG, INFO, WARNING, ERROR or CRITICAL",
        );
    }

    if cfg.publication.channel.is_empty() {
        result.warn("publication.channel", "no target channel configured");
    }

    if cfg.categories.is_empty() {
        result.error("categories", "at least one category must be configured");
    }
    let mut seen_names = std::collections::HashSet::new();
    for (idx, category) in cfg.categories.iter().enumerate() {
        let path = format!("categories[{idx}]");
        if category.name.trim().is_empty() {
            result.error(format!("{path}.name"), "category name must not be empty");
        } else if !seen_names.insert(category.name.to_lowercase()) {
            result.error(format!("{path}.name"), format!("duplicate category name '{}'", category.name));
        }
        if category.quota == 0 {
            result.error(format!("{path}.quota"), "quota must be greater than 0");
        }
    }

    in_range_u32(
        &mut result,
        "status_reporter.interval_minutes",
        cfg.status_reporter.interval_minutes,
        1,
        1440,
    );

    result
}

fn is_hh_mm(s: &str) -> bool {
    let Some((h, m)) = s.split_once(':') else {
        return false;
    };
    matches!((h.parse::<u32>(), m.parse::<u32>()), (Ok(h), Ok(m)) if h < 24 && m < 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = AggregatorConfig::default();
        let result = validate_config(&cfg);
        assert!(result.valid, "errors: {:?}", result.errors);
    }

    #[test]
    fn out_of_range_duplicate_threshold_is_rejected() {
        let mut cfg = AggregatorConfig::default();
        cfg.processor.duplicate_threshold = 0.1;
        let result = validate_config(&cfg);
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.path == "processor.duplicate_threshold"));
    }

    #[test]
    fn bad_schedule_time_names_its_path() {
        let mut cfg = AggregatorConfig::default();
        cfg.processor.schedule_time = "25:99".into();
        let result = validate_config(&cfg);
        assert!(!result.valid);
        let err = result.errors.iter().find(|e| e.path == "processor.schedule_time").unwrap();
        assert_eq!(err.suggestion.as_deref(), Some("09:00"));
    }

    #[test]
    fn invalid_log_level_is_rejected() {
        let mut cfg = AggregatorConfig::default();
        cfg.logging.level = "VERBOSE".into();
        let result = validate_config(&cfg);
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.path == "logging.level"));
    }

    #[test]
    fn log_level_check_is_case_insensitive() {
        let mut cfg = AggregatorConfig::default();
        cfg.logging.level = "WARNING".into();
        let result = validate_config(&cfg);
        assert!(result.valid, "errors: {:?}", result.errors);
    }

    #[test]
    fn unknown_llm_provider_is_rejected() {
        let mut cfg = AggregatorConfig::default();
        cfg.llm.provider = "bogus".into();
        let result = validate_config(&cfg);
        assert!(!result.valid);
    }

    #[test]
    fn empty_publication_channel_is_a_warning_not_an_error() {
        let cfg = AggregatorConfig::default();
        let result = validate_config(&cfg);
        assert!(result.valid);
        assert!(!result.warnings.is_empty());
    }
}
