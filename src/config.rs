use crate::errors::{AppError, AppResult};
use crate::models::AppSettings;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "KPI_DASHBOARD_CONFIG";
pub const ENV_TICK_INTERVAL: &str = "KPI_TICK_INTERVAL_MS";
pub const ENV_REFRESH_LATENCY: &str = "KPI_REFRESH_LATENCY_MS";

/// Defaults, overlaid by the JSON file named in `KPI_DASHBOARD_CONFIG`,
/// overlaid by the individual environment overrides.
pub fn load_settings() -> AppResult<AppSettings> {
    let path = std::env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from);
    load_settings_from(path.as_deref(), |key| std::env::var(key).ok())
}

pub fn load_settings_from<F>(path: Option<&Path>, lookup: F) -> AppResult<AppSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = AppSettings::default();

    if let Some(path) = path {
        let raw = std::fs::read_to_string(path)
            .map_err(|error| AppError::Config(format!("failed to read {}: {}", path.display(), error)))?;
        let update: serde_json::Value = serde_json::from_str(&raw)?;
        settings = merge_settings(&settings, update)?;
        tracing::info!(path = %path.display(), "loaded settings file");
    }

    if let Some(value) = lookup(ENV_TICK_INTERVAL) {
        settings.tick_interval_ms = parse_env_u64(ENV_TICK_INTERVAL, &value)?;
    }
    if let Some(value) = lookup(ENV_REFRESH_LATENCY) {
        settings.refresh_latency_ms = parse_env_u64(ENV_REFRESH_LATENCY, &value)?;
    }

    validate_settings(&settings)?;
    Ok(settings)
}

/// Applies a partial camelCase JSON update on top of `current`.
pub fn merge_settings(current: &AppSettings, update: serde_json::Value) -> AppResult<AppSettings> {
    let mut merged = serde_json::to_value(current)?;
    merge_json(&mut merged, update);
    let settings: AppSettings = serde_json::from_value(merged)?;
    validate_settings(&settings)?;
    Ok(settings)
}

pub fn validate_settings(settings: &AppSettings) -> AppResult<()> {
    if settings.tick_interval_ms == 0 {
        return Err(AppError::Config("tickIntervalMs must be positive".to_string()));
    }
    if settings.history_cap == 0 {
        return Err(AppError::Config("historyCap must be at least 1".to_string()));
    }
    for (name, variation) in [
        ("tickVariation", settings.tick_variation),
        ("refreshVariation", settings.refresh_variation),
        ("seedVariation", settings.seed_variation),
    ] {
        if !(0.0..1.0).contains(&variation) {
            return Err(AppError::Config(format!("{} must be within [0, 1), got {}", name, variation)));
        }
    }
    Ok(())
}

fn parse_env_u64(key: &str, value: &str) -> AppResult<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| AppError::Config(format!("{} must be an unsigned integer, got '{}'", key, value)))
}

fn merge_json(target: &mut serde_json::Value, update: serde_json::Value) {
    match (target, update) {
        (serde_json::Value::Object(target_map), serde_json::Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_json(target_map.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (target, update) => {
            *target = update;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{load_settings_from, merge_settings, ENV_REFRESH_LATENCY, ENV_TICK_INTERVAL};
    use crate::errors::AppError;
    use crate::models::AppSettings;
    use std::io::Write;

    #[test]
    fn defaults_without_sources() {
        let settings = load_settings_from(None, |_| None).expect("settings");
        assert_eq!(settings, AppSettings::default());
        assert_eq!(settings.tick_interval_ms, 30_000);
        assert_eq!(settings.history_cap, 30);
    }

    #[test]
    fn file_then_env_overrides() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, r#"{{"tickIntervalMs": 5000, "loginLatencyMs": 0}}"#).expect("write config");

        let settings = load_settings_from(Some(file.path()), |key| match key {
            ENV_TICK_INTERVAL => Some("250".to_string()),
            _ => None,
        })
        .expect("settings");

        assert_eq!(settings.tick_interval_ms, 250);
        assert_eq!(settings.login_latency_ms, 0);
        assert_eq!(settings.refresh_latency_ms, 1_500);
    }

    #[test]
    fn rejects_bad_env_value() {
        let result = load_settings_from(None, |key| (key == ENV_REFRESH_LATENCY).then(|| "soon".to_string()));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn merge_validates_result() {
        let current = AppSettings::default();
        let updated = merge_settings(&current, serde_json::json!({ "historyCap": 10 })).expect("merge");
        assert_eq!(updated.history_cap, 10);
        assert_eq!(updated.tick_variation, current.tick_variation);

        let err = merge_settings(&current, serde_json::json!({ "tickVariation": 1.5 })).expect_err("invalid");
        assert!(err.to_string().contains("tickVariation"));
        assert!(merge_settings(&current, serde_json::json!({ "historyCap": 0 })).is_err());
    }
}
