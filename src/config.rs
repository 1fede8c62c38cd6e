use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};
use crate::validation::DOWNLOAD_DIR_PROMPT;

pub const DEFAULT_AUTH_URL: &str =
    "https://authenticate.foundation.api.oneatlas.airbus.com/auth/realms/IDP/protocol/openid-connect/token";
pub const DEFAULT_DATA_URL: &str = "https://data.api.oneatlas.airbus.com/api/v1";
pub const DEFAULT_SEARCH_URL: &str =
    "https://search.foundation.api.oneatlas.airbus.com/api/v1/opensearch";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Token endpoint (OpenID Connect, `api_key` grant).
    pub auth_url: String,
    /// Data API base; the current-user record lives at `<data_url>/me`.
    pub data_url: String,
    /// OpenSearch catalog endpoint.
    pub search_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            auth_url: DEFAULT_AUTH_URL.to_string(),
            data_url: DEFAULT_DATA_URL.to_string(),
            search_url: DEFAULT_SEARCH_URL.to_string(),
        }
    }
}

/// Builds the endpoint configuration, letting `ONEATLAS_*_URL` variables override the
/// vendor defaults.
pub fn load_config() -> ClientConfig {
    let defaults = ClientConfig::default();
    ClientConfig {
        auth_url: std::env::var("ONEATLAS_AUTH_URL").unwrap_or(defaults.auth_url),
        data_url: std::env::var("ONEATLAS_DATA_URL").unwrap_or(defaults.data_url),
        search_url: std::env::var("ONEATLAS_SEARCH_URL").unwrap_or(defaults.search_url),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "apikey")]
    pub api_key: String,
    pub download_dir: String,
}

impl Credentials {
    /// The stored download directory, if it names an existing directory.
    ///
    /// Empty values and the dialog placeholder are never treated as paths.
    pub fn existing_download_dir(&self) -> Option<PathBuf> {
        let dir = self.download_dir.trim();
        if dir.is_empty() || dir == DOWNLOAD_DIR_PROMPT {
            return None;
        }
        let path = PathBuf::from(dir);
        path.is_dir().then_some(path)
    }
}

/// The flat JSON settings record `{"apikey": ..., "download_dir": ...}`.
///
/// Every save rewrites the whole file. There is no locking: one interactive session at a
/// time is assumed.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Resolves the settings file location:
    /// 1) `ONEATLAS_SETTINGS` (explicit)
    /// 2) `<config dir>/oneatlas/settings.json`
    /// 3) `./settings.json`
    pub fn locate() -> Self {
        if let Ok(p) = std::env::var("ONEATLAS_SETTINGS") {
            return Self::new(p);
        }
        match dirs::config_dir() {
            Some(dir) => Self::new(dir.join("oneatlas").join("settings.json")),
            None => Self::new("settings.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> Result<Credentials> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| self.error(e.to_string()))?;
        let creds: Credentials = serde_json::from_str(&text)
            .map_err(|e| self.error(format!("malformed settings: {}", e)))?;
        debug!(path = %self.path.display(), "loaded settings");
        Ok(Credentials {
            api_key: creds.api_key.trim().to_string(),
            download_dir: creds.download_dir,
        })
    }

    pub fn save(&self, creds: &Credentials) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| self.error(e.to_string()))?;
            }
        }
        let text = serde_json::to_string_pretty(creds)
            .map_err(|e| self.error(format!("cannot serialize settings: {}", e)))?;
        std::fs::write(&self.path, text).map_err(|e| self.error(e.to_string()))?;
        debug!(path = %self.path.display(), "saved settings");
        Ok(())
    }

    fn error(&self, detail: String) -> Error {
        Error::Persistence {
            path: self.path.clone(),
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_uses_vendor_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("nested").join("settings.json"));
        store
            .save(&Credentials {
                api_key: "ABC123".into(),
                download_dir: "/data".into(),
            })
            .unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"apikey\""));
        assert!(raw.contains("\"download_dir\""));
        assert_eq!(store.load().unwrap().api_key, "ABC123");
    }

    #[test]
    fn stored_key_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"apikey": " K1 \n", "download_dir": ""}"#).unwrap();
        assert_eq!(CredentialStore::new(path).load().unwrap().api_key, "K1");
    }

    #[test]
    fn missing_or_malformed_file_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("settings.json"));
        assert!(matches!(store.load(), Err(Error::Persistence { .. })));

        std::fs::write(store.path(), "{ not json").unwrap();
        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("malformed settings"));

        std::fs::write(store.path(), r#"{"apikey": "K"}"#).unwrap();
        assert!(matches!(store.load(), Err(Error::Persistence { .. })));
    }

    #[test]
    fn placeholder_or_missing_download_dir_is_unusable() {
        let dir = tempfile::tempdir().unwrap();
        let with_dir = |d: &str| Credentials {
            api_key: "K".into(),
            download_dir: d.into(),
        };

        assert_eq!(with_dir("").existing_download_dir(), None);
        assert_eq!(with_dir(DOWNLOAD_DIR_PROMPT).existing_download_dir(), None);
        let missing = dir.path().join("absent");
        assert_eq!(with_dir(missing.to_str().unwrap()).existing_download_dir(), None);
        assert_eq!(
            with_dir(dir.path().to_str().unwrap()).existing_download_dir(),
            Some(dir.path().to_path_buf())
        );
    }

    #[test]
    fn default_endpoints() {
        let cfg = ClientConfig::default();
        assert!(cfg.auth_url.ends_with("/openid-connect/token"));
        assert_eq!(format!("{}/me", cfg.data_url), "https://data.api.oneatlas.airbus.com/api/v1/me");
    }
}
