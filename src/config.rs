use crate::error::{ProxyError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit_mb")]
    pub body_limit_mb: usize,
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Extra source-model → provider-model mappings, applied over the built-in table.
    #[serde(default)]
    pub models: HashMap<String, String>,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_upload_url")]
    pub upload_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    #[serde(default = "default_block_none")]
    pub block_none: bool,
}

fn default_port() -> u16 {
    3333
}

fn default_body_limit_mb() -> usize {
    500
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_upload_url() -> String {
    "https://generativelanguage.googleapis.com/upload/v1beta/files".to_string()
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from(".temp")
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_poll_timeout_secs() -> u64 {
    600
}

fn default_block_none() -> bool {
    true
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            body_limit_mb: default_body_limit_mb(),
            provider: ProviderConfig::default(),
            models: HashMap::new(),
            media: MediaConfig::default(),
            safety: SafetyConfig::default(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            upload_url: default_upload_url(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            block_none: default_block_none(),
        }
    }
}

impl ProxyConfig {
    /// Load config from a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProxyError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Search standard locations for a config file.
    /// Priority: CLI arg > CWD > XDG config > home dir > built-in defaults
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path);
        }

        for candidate in &config_search_paths() {
            if candidate.exists() {
                tracing::info!(path = %candidate.display(), "Loading config");
                return Self::load(candidate);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn validate(&self) -> Result<()> {
        if self.body_limit_mb == 0 {
            return Err(ProxyError::config("body_limit_mb must be greater than zero"));
        }
        if self.media.poll_interval_ms == 0 {
            return Err(ProxyError::config(
                "media.poll_interval_ms must be greater than zero",
            ));
        }
        if !self.provider.base_url.starts_with("http") {
            return Err(ProxyError::config(format!(
                "provider.base_url '{}' is not an http(s) URL",
                self.provider.base_url
            )));
        }
        Ok(())
    }

    /// Provider base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.provider.base_url.trim_end_matches('/')
    }

    /// Prefix of URIs that already name a file hosted by the provider.
    #[must_use]
    pub fn hosted_files_prefix(&self) -> String {
        format!("{}/files/", self.base_url())
    }

    #[must_use]
    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_mb.saturating_mul(1024 * 1024)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.media.poll_interval_ms)
    }

    #[must_use]
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.media.poll_timeout_secs)
    }
}

pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // CWD
    paths.push(PathBuf::from("gemini-proxy.toml"));

    // XDG / platform config dir
    if cfg!(target_os = "macos") {
        if let Some(home) = dirs_path() {
            paths.push(
                home.join("Library")
                    .join("Application Support")
                    .join("gemini-proxy")
                    .join("config.toml"),
            );
        }
    } else {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg).join("gemini-proxy").join("config.toml"));
        }
        if let Some(home) = dirs_path() {
            paths.push(home.join(".config").join("gemini-proxy").join("config.toml"));
        }
    }

    // Home directory fallback
    if let Some(home) = dirs_path() {
        paths.push(home.join(".gemini-proxy.toml"));
    }

    paths
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(
            f,
            r#"
port = 5000

[provider]
base_url = "http://127.0.0.1:9000/v1beta/"

[models]
"gpt-4o" = "gemini-2.0-flash"

[media]
scratch_dir = "/tmp/scratch"
poll_timeout_secs = 30
"#
        )
        .unwrap();

        let config = ProxyConfig::load(f.path()).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.base_url(), "http://127.0.0.1:9000/v1beta");
        assert_eq!(
            config.hosted_files_prefix(),
            "http://127.0.0.1:9000/v1beta/files/"
        );
        assert_eq!(
            config.models.get("gpt-4o"),
            Some(&"gemini-2.0-flash".to_string())
        );
        assert_eq!(config.media.scratch_dir, PathBuf::from("/tmp/scratch"));
        assert_eq!(config.poll_timeout(), Duration::from_secs(30));
        // untouched sections keep their defaults
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert!(config.safety.block_none);
    }

    #[test]
    fn test_defaults_match_upstream_api() {
        let config = ProxyConfig::default();
        assert_eq!(config.port, 3333);
        assert_eq!(
            config.hosted_files_prefix(),
            "https://generativelanguage.googleapis.com/v1beta/files/"
        );
        assert_eq!(config.body_limit_bytes(), 500 * 1024 * 1024);
    }

    #[test]
    fn test_empty_file_is_all_defaults() {
        let f = NamedTempFile::new().unwrap();
        let config = ProxyConfig::load(f.path()).unwrap();
        assert_eq!(config.port, 3333);
        assert_eq!(config.media.scratch_dir, PathBuf::from(".temp"));
    }

    #[test]
    fn test_rejects_zero_poll_interval() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "[media]\npoll_interval_ms = 0").unwrap();
        let err = ProxyConfig::load(f.path()).unwrap_err();
        assert!(matches!(err, ProxyError::Config { .. }));
    }

    #[test]
    fn test_explicit_missing_path_is_error() {
        let err = ProxyConfig::find_and_load(Some(Path::new("/nonexistent/gemini-proxy.toml")))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
