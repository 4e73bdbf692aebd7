use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use shared::domain::{ImageResolution, Language};
use tracing::warn;

use crate::{
    gemini::{DEFAULT_BASE_URL, DEFAULT_IMAGE_MODEL, DEFAULT_TEXT_MODEL},
    retry::DEFAULT_MAX_RETRIES,
};

pub const CONFIG_FILE: &str = "storyboard.toml";
const ENV_CONFIG_PATH: &str = "STORYBOARD_CONFIG";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub resolution: ImageResolution,
    /// `None` means detect from the process locale.
    pub language: Option<Language>,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
    pub request_timeout_secs: Option<u64>,
    pub output_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.into(),
            text_model: DEFAULT_TEXT_MODEL.into(),
            image_model: DEFAULT_IMAGE_MODEL.into(),
            resolution: ImageResolution::OneK,
            language: None,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: 2000,
            request_timeout_secs: None,
            output_dir: PathBuf::from("."),
        }
    }
}

/// Defaults, then `storyboard.toml` (or `$STORYBOARD_CONFIG`), then environment.
pub fn load_settings() -> Result<Settings> {
    let mut settings = Settings::default();

    let path = std::env::var(ENV_CONFIG_PATH)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(CONFIG_FILE));
    if path.exists() {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        apply_file(&mut settings, &raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
    }

    apply_env(&mut settings, |name| std::env::var(name).ok());
    Ok(settings)
}

pub fn apply_file(settings: &mut Settings, raw: &str) -> Result<()> {
    let table: toml::Table = toml::from_str(raw)?;
    for (key, value) in &table {
        let value = match value {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        apply_value(settings, key, &value);
    }
    Ok(())
}

/// Applies `STORYBOARD_*` variables, then their `APP__*` forms, which win.
pub fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    const KEYS: [&str; 9] = [
        "base_url",
        "text_model",
        "image_model",
        "resolution",
        "language",
        "max_retries",
        "retry_delay_ms",
        "request_timeout_secs",
        "output_dir",
    ];
    for prefix in ["STORYBOARD_", "APP__"] {
        for key in KEYS {
            let name = format!("{prefix}{}", key.to_ascii_uppercase());
            if let Some(value) = lookup(&name) {
                apply_value(settings, key, &value);
            }
        }
    }
}

fn apply_value(settings: &mut Settings, key: &str, value: &str) {
    let value = value.trim();
    match key {
        "base_url" | "api_base_url" => settings.api_base_url = value.to_string(),
        "text_model" => settings.text_model = value.to_string(),
        "image_model" => settings.image_model = value.to_string(),
        "resolution" => match value.parse() {
            Ok(resolution) => settings.resolution = resolution,
            Err(err) => warn!(%err, "config: ignoring resolution"),
        },
        "language" => match value.parse() {
            Ok(language) => settings.language = Some(language),
            Err(err) => warn!(%err, "config: ignoring language"),
        },
        "max_retries" => {
            if let Ok(parsed) = value.parse() {
                settings.max_retries = parsed;
            }
        }
        "retry_delay_ms" => {
            if let Ok(parsed) = value.parse() {
                settings.retry_delay_ms = parsed;
            }
        }
        "request_timeout_secs" => {
            settings.request_timeout_secs = value.parse().ok().filter(|secs| *secs > 0);
        }
        "output_dir" => settings.output_dir = PathBuf::from(value),
        other => warn!(key = other, "config: unknown setting"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn file_values_override_defaults() {
        let mut settings = Settings::default();
        apply_file(
            &mut settings,
            r#"
                base_url = "http://127.0.0.1:9000"
                resolution = "4K"
                language = "zh"
                retry_delay_ms = 10
                request_timeout_secs = 30
            "#,
        )
        .expect("parse");
        assert_eq!(settings.api_base_url, "http://127.0.0.1:9000");
        assert_eq!(settings.resolution, ImageResolution::FourK);
        assert_eq!(settings.language, Some(Language::Zh));
        assert_eq!(settings.retry_delay_ms, 10);
        assert_eq!(settings.request_timeout_secs, Some(30));
        assert_eq!(settings.text_model, DEFAULT_TEXT_MODEL);
    }

    #[test]
    fn app_prefixed_env_wins_over_storyboard_prefix() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("STORYBOARD_IMAGE_MODEL", "image-a"),
            ("APP__IMAGE_MODEL", "image-b"),
            ("STORYBOARD_MAX_RETRIES", "0"),
            ("STORYBOARD_RESOLUTION", "16K"),
        ]);
        let mut settings = Settings::default();
        apply_env(&mut settings, |name| env.get(name).map(|v| v.to_string()));
        assert_eq!(settings.image_model, "image-b");
        assert_eq!(settings.max_retries, 0);
        assert_eq!(settings.resolution, ImageResolution::OneK);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut settings = Settings::default();
        assert!(apply_file(&mut settings, "base_url = ").is_err());
    }
}
