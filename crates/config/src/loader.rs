//! Two-layer YAML config loading: a base file plus an optional per-profile
//! overlay, deep-merged so the overlay only needs to name what it changes.

use std::path::Path;

use pulse_core::config::AggregatorConfig;

use crate::error::ConfigError;

/// Deep-merge two YAML mappings: child keys win; non-map values replace
/// wholesale (arrays are not concatenated, matching the teacher's rule-loader
/// `extends` semantics).
pub fn deep_merge(base: &serde_yaml::Value, overlay: &serde_yaml::Value) -> serde_yaml::Value {
    match (base, overlay) {
        (serde_yaml::Value::Mapping(bm), serde_yaml::Value::Mapping(om)) => {
            let mut merged = bm.clone();
            for (key, overlay_val) in om {
                if let Some(base_val) = bm.get(key) {
                    merged.insert(key.clone(), deep_merge(base_val, overlay_val));
                } else {
                    merged.insert(key.clone(), overlay_val.clone());
                }
            }
            serde_yaml::Value::Mapping(merged)
        }
        (_, overlay) => overlay.clone(),
    }
}

/// Load the base config file and, if present, deep-merge a `{profile}.yaml`
/// overlay from the same directory. `profile` empty means base-only.
pub fn load(base_path: &Path, profile: &str) -> Result<AggregatorConfig, ConfigError> {
    let base_text = std::fs::read_to_string(base_path)?;
    let base_value: serde_yaml::Value = serde_yaml::from_str(&base_text)?;

    let merged = if profile.is_empty() {
        base_value
    } else {
        let overlay_path = base_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(format!("{}.yaml", profile.to_lowercase()));
        if overlay_path.exists() {
            let overlay_text = std::fs::read_to_string(&overlay_path)?;
            let overlay_value: serde_yaml::Value = serde_yaml::from_str(&overlay_text)?;
            deep_merge(&base_value, &overlay_value)
        } else {
            tracing::warn!(path = %overlay_path.display(), "profile overlay not found, using base config only");
            base_value
        }
    };

    let config: AggregatorConfig = serde_yaml::from_value(merged)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn child_scalar_wins() {
        let base = yaml("processor:\n  top_n: 15\n  timezone: UTC\n");
        let overlay = yaml("processor:\n  top_n: 30\n");
        let merged = deep_merge(&base, &overlay);
        assert_eq!(merged["processor"]["top_n"], Value::from(30));
        assert_eq!(merged["processor"]["timezone"], Value::from("UTC"));
    }

    #[test]
    fn nested_maps_merge_recursively() {
        let base = yaml("database:\n  retry:\n    max_attempts: 5\n    base_delay_seconds: 0.5\n");
        let overlay = yaml("database:\n  retry:\n    max_attempts: 10\n");
        let merged = deep_merge(&base, &overlay);
        assert_eq!(merged["database"]["retry"]["max_attempts"], Value::from(10));
        assert_eq!(
            merged["database"]["retry"]["base_delay_seconds"],
            Value::from(0.5)
        );
    }

    #[test]
    fn arrays_replace_wholesale() {
        let base = yaml("filters:\n  exclude_keywords: [a, b, c]\n");
        let overlay = yaml("filters:\n  exclude_keywords: [x]\n");
        let merged = deep_merge(&base, &overlay);
        let arr = merged["filters"]["exclude_keywords"].as_sequence().unwrap();
        assert_eq!(arr.len(), 1);
    }

    #[test]
    fn keys_absent_from_overlay_survive() {
        let base = yaml("paths:\n  data_dir: data\n  logs_dir: logs\n");
        let overlay = yaml("paths:\n  data_dir: /srv/data\n");
        let merged = deep_merge(&base, &overlay);
        assert_eq!(merged["paths"]["logs_dir"], Value::from("logs"));
    }

    #[test]
    fn unknown_key_in_strict_section_is_rejected() {
        let merged = yaml("database:\n  timeout_seconds: 10\n  bogus_key: 1\n");
        let result: Result<AggregatorConfig, serde_yaml::Error> = serde_yaml::from_value(merged);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("bogus_key"), "error should name the offending key: {err}");
    }

    #[test]
    fn unknown_top_level_section_is_rejected() {
        let merged = yaml("databse:\n  timeout_seconds: 10\n");
        let result: Result<AggregatorConfig, serde_yaml::Error> = serde_yaml::from_value(merged);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("databse"), "error should name the offending key: {err}");
    }
}
