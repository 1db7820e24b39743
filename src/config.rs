use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::metadata::cache::{DEFAULT_CAPACITY, DEFAULT_TTL};

const DEFAULT_LISTEN: &str = "0.0.0.0:8080";

/// Per-request timeout for a single URL variant
const DEFAULT_TIMEOUT_SECS: u64 = 8;
const DEFAULT_MAX_REDIRECTS: usize = 10;
/// Pages larger than this are cut off; metadata lives in `<head>` anyway
const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;
const DEFAULT_CACHE_TTL_SECS: u64 = DEFAULT_TTL.as_secs();
const DEFAULT_CACHE_CAPACITY: usize = DEFAULT_CAPACITY;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9,pt-BR;q=0.8,pt;q=0.7";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write default config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_yml::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_yml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl ServerConfig {
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("server.listen '{}': {e}", self.listen)))
    }
}

/// Outbound HTTP behaviour of the live page source.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScrapeConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    #[serde(default = "default_allowed_schemes")]
    pub allowed_schemes: Vec<String>,

    #[serde(default)]
    pub blocked_hosts: Vec<String>,

    /// Refuse hosts that resolve to loopback, private or link-local addresses
    #[serde(default = "default_true")]
    pub block_private_ips: bool,

    #[serde(default)]
    pub accept_invalid_certs: bool,

    /// e.g. `socks5://127.0.0.1:1080`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            allowed_schemes: default_allowed_schemes(),
            blocked_hosts: Vec::new(),
            block_private_ips: true,
            accept_invalid_certs: false,
            proxy: None,
        }
    }
}

impl ScrapeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_accept_language() -> String {
    DEFAULT_ACCEPT_LANGUAGE.to_string()
}

fn default_max_redirects() -> usize {
    DEFAULT_MAX_REDIRECTS
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

fn default_allowed_schemes() -> Vec<String> {
    vec!["http".to_string(), "https".to_string()]
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.listen_addr()?;

        let scrape = &self.scrape;
        if scrape.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "scrape.timeout_secs must be greater than 0".into(),
            ));
        }
        if scrape.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "scrape.max_body_bytes must be greater than 0".into(),
            ));
        }
        if scrape.allowed_schemes.is_empty() {
            return Err(ConfigError::Invalid(
                "scrape.allowed_schemes must not be empty".into(),
            ));
        }
        if let Some(scheme) = scrape
            .allowed_schemes
            .iter()
            .find(|s| *s != "http" && *s != "https")
        {
            return Err(ConfigError::Invalid(format!(
                "scrape.allowed_schemes: unsupported scheme '{scheme}'"
            )));
        }

        if self.cache.capacity == 0 {
            return Err(ConfigError::Invalid(
                "cache.capacity must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Read the YAML config at `path`. A missing file is created with the
    /// defaults so there is something to edit next time.
    pub fn load_with(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            log::info!("wrote default config to {}", path.display());
            return Ok(config);
        }

        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self =
            serde_yml::from_str(&config_str).map_err(|source| ConfigError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;

        config.validate()?;

        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let config_str = serde_yml::to_string(self)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }

        std::fs::write(path, config_str).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.scrape.timeout(), Duration::from_secs(8));
        assert_eq!(config.cache.ttl(), Duration::from_secs(86400));
        assert_eq!(config.server.listen_addr().unwrap().port(), 8080);
        assert!(config.scrape.block_private_ips);
    }

    #[test]
    fn test_cache_defaults_follow_cache_module() {
        let config = Config::default();
        assert_eq!(config.cache.ttl(), DEFAULT_TTL);
        assert_eq!(config.cache.capacity, DEFAULT_CAPACITY);

        let yaml = "cache:\n  enabled: true\n";
        let parsed: Config = serde_yml::from_str(yaml).unwrap();
        assert_eq!(parsed.cache.ttl(), DEFAULT_TTL);
        assert_eq!(parsed.cache.capacity, DEFAULT_CAPACITY);
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/folio.yaml");

        let config = Config::load_with(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.cache.capacity, 1024);

        // and loads back identically
        let again = Config::load_with(&path).unwrap();
        assert_eq!(again.scrape.user_agent, config.scrape.user_agent);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folio.yaml");
        std::fs::write(&path, "scrape:\n  timeout_secs: 3\n  blocked_hosts: [internal.test]\n")
            .unwrap();

        let config = Config::load_with(&path).unwrap();
        assert_eq!(config.scrape.timeout_secs, 3);
        assert_eq!(config.scrape.blocked_hosts, vec!["internal.test"]);
        assert_eq!(config.scrape.max_redirects, 10);
        assert!(config.cache.enabled);
        assert_eq!(config.server.listen, "0.0.0.0:8080");
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folio.yaml");
        std::fs::write(&path, "scrape:\n  timeout_secs: 0\n").unwrap();

        let err = Config::load_with(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
    }

    #[test]
    fn test_unknown_scheme_rejected() {
        let mut config = Config::default();
        config.scrape.allowed_schemes = vec!["ftp".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_listen_rejected() {
        let mut config = Config::default();
        config.server.listen = "not an address".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folio.yaml");
        std::fs::write(&path, "cache: [1, 2\n").unwrap();

        let err = Config::load_with(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }), "{err}");
    }
}
