use std::{
    fs, io,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::info;

pub const ENV_API_KEY: &str = "API_KEY";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
/// Key under which the manual credential is persisted.
pub const CREDENTIAL_KEY: &str = "gemini_api_key";
const CREDENTIAL_FILE: &str = "credentials.toml";
const APP_DIR: &str = "storyboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Environment,
    Manual,
    Stored,
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("API key is blank")]
    Blank,
    #[error("no config directory available on this platform")]
    NoConfigDir,
    #[error("credential file {path} could not be accessed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("credential file {path} is malformed: {message}")]
    Malformed { path: PathBuf, message: String },
}

/// File-backed store for a single manually entered API key.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_location() -> Result<Self, CredentialError> {
        let dir = dirs::config_dir().ok_or(CredentialError::NoConfigDir)?;
        Ok(Self::new(dir.join(APP_DIR).join(CREDENTIAL_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<String>, CredentialError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CredentialError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let table: toml::Table = toml::from_str(&raw).map_err(|e| CredentialError::Malformed {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        Ok(table
            .get(CREDENTIAL_KEY)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string))
    }

    /// Trims and persists `key`; blank input is rejected.
    pub fn save(&self, key: &str) -> Result<String, CredentialError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(CredentialError::Blank);
        }
        let io_err = |source| CredentialError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut table = toml::Table::new();
        table.insert(CREDENTIAL_KEY.to_string(), toml::Value::String(key.to_string()));
        fs::write(&self.path, table.to_string()).map_err(io_err)?;
        info!(path = %self.path.display(), "credentials: api key stored");
        Ok(key.to_string())
    }

    pub fn clear(&self) -> Result<bool, CredentialError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CredentialError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

pub fn env_api_key() -> Option<String> {
    [ENV_API_KEY, ENV_GEMINI_API_KEY]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

/// The ambient environment key wins, then a manual key, then the stored one.
pub fn resolve_api_key(
    env_key: Option<String>,
    manual_key: Option<&str>,
    stored_key: Option<String>,
) -> Option<(String, CredentialSource)> {
    let non_blank = |k: &str| {
        let k = k.trim();
        (!k.is_empty()).then(|| k.to_string())
    };
    env_key
        .as_deref()
        .and_then(non_blank)
        .map(|k| (k, CredentialSource::Environment))
        .or_else(|| manual_key.and_then(non_blank).map(|k| (k, CredentialSource::Manual)))
        .or_else(|| {
            stored_key
                .as_deref()
                .and_then(non_blank)
                .map(|k| (k, CredentialSource::Stored))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_key_takes_precedence() {
        let resolved = resolve_api_key(
            Some("env-key".into()),
            Some("manual-key"),
            Some("stored-key".into()),
        );
        assert_eq!(
            resolved,
            Some(("env-key".to_string(), CredentialSource::Environment))
        );
    }

    #[test]
    fn blank_sources_fall_through() {
        let resolved = resolve_api_key(Some("  ".into()), Some(""), Some(" stored ".into()));
        assert_eq!(resolved, Some(("stored".to_string(), CredentialSource::Stored)));
        assert_eq!(resolve_api_key(None, None, None), None);
    }

    #[test]
    fn store_round_trip_and_clear() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CredentialStore::new(dir.path().join("nested").join(CREDENTIAL_FILE));

        assert_eq!(store.load().expect("load empty"), None);
        assert_eq!(store.save("  secret-123 \n").expect("save"), "secret-123");
        assert_eq!(store.load().expect("load"), Some("secret-123".to_string()));

        let raw = fs::read_to_string(store.path()).expect("read");
        assert!(raw.contains(CREDENTIAL_KEY));

        assert!(store.clear().expect("clear"));
        assert!(!store.clear().expect("clear twice"));
        assert_eq!(store.load().expect("load cleared"), None);
    }

    #[test]
    fn blank_key_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CredentialStore::new(dir.path().join(CREDENTIAL_FILE));
        assert!(matches!(store.save("   "), Err(CredentialError::Blank)));
        assert!(!store.path().exists());
    }
}
