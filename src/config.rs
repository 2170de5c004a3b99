//! TOML configuration with environment overrides.
//!
//! Every section is optional; a missing config file yields the defaults
//! below. After parsing, a few environment variables are applied on top
//! (usually loaded from `.env` by the binary):
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `PAGECHECK_DB_PATH` | `[db].path` |
//! | `PORT` | port part of `[server].bind` |
//! | `PAGECHECK_API_URL` | `[client].base_url` |

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub fact_check: FactCheckConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/pagecheck.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Built frontend to serve, with SPA fallback to `index.html`.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            static_dir: None,
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:3001".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_client_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_client_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3001".to_string()
}
fn default_client_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct EditorConfig {
    #[serde(default = "default_autosave_ms")]
    pub autosave_ms: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            autosave_ms: default_autosave_ms(),
        }
    }
}

impl EditorConfig {
    pub fn autosave_interval(&self) -> Duration {
        Duration::from_millis(self.autosave_ms)
    }
}

fn default_autosave_ms() -> u64 {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct FactCheckConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Simulated latency of the stub provider.
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for FactCheckConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            latency_ms: default_latency_ms(),
            endpoint: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_provider() -> String {
    "stub".to_string()
}
fn default_latency_ms() -> u64 {
    1500
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}

pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Config::default()
    };

    config.apply_overrides(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Applies `PAGECHECK_DB_PATH`, `PORT`, and `PAGECHECK_API_URL` as read
    /// through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(path) = lookup("PAGECHECK_DB_PATH") {
            self.db.path = PathBuf::from(path);
        }
        if let Some(port) = lookup("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a port number, got '{}'", port))?;
            let host = match self.server.bind.rsplit_once(':') {
                Some((host, _)) => host.to_string(),
                None => self.server.bind.clone(),
            };
            self.server.bind = format!("{}:{}", host, port);
        }
        if let Some(url) = lookup("PAGECHECK_API_URL") {
            self.client.base_url = url;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.bind.trim().is_empty() {
            bail!("server.bind must not be empty");
        }

        if !self.client.base_url.starts_with("http://")
            && !self.client.base_url.starts_with("https://")
        {
            bail!(
                "client.base_url must be an http(s) URL, got '{}'",
                self.client.base_url
            );
        }

        if self.editor.autosave_ms == 0 {
            bail!("editor.autosave_ms must be > 0");
        }

        match self.fact_check.provider.as_str() {
            "stub" => {}
            "http" => {
                if self.fact_check.endpoint.is_none() {
                    bail!("fact_check.endpoint must be specified when provider is 'http'");
                }
            }
            other => bail!(
                "Unknown fact-check provider: '{}'. Must be stub or http.",
                other
            ),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:3001");
        assert_eq!(config.editor.autosave_interval(), Duration::from_millis(1000));
        assert_eq!(config.fact_check.provider, "stub");
        assert_eq!(config.fact_check.latency_ms, 1500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_sections() {
        let config: Config = toml::from_str(
            r#"
[server]
bind = "127.0.0.1:8080"
static_dir = "./frontend/dist"

[editor]
autosave_ms = 250
"#,
        )
        .unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(
            config.server.static_dir,
            Some(PathBuf::from("./frontend/dist"))
        );
        assert_eq!(config.editor.autosave_ms, 250);
        assert_eq!(config.client.base_url, "http://localhost:3001");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PAGECHECK_DB_PATH", "/tmp/pages.sqlite"),
            ("PORT", "9000"),
            ("PAGECHECK_API_URL", "https://pages.example.com"),
        ]);
        let mut config = Config::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.db.path, PathBuf::from("/tmp/pages.sqlite"));
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.client.base_url, "https://pages.example.com");
    }

    #[test]
    fn test_bad_port_override() {
        let mut config = Config::default();
        assert!(config
            .apply_overrides(|k| (k == "PORT").then(|| "eighty".to_string()))
            .is_err());
    }

    #[test]
    fn test_http_provider_requires_endpoint() {
        let mut config = Config::default();
        config.fact_check.provider = "http".to_string();
        assert!(config.validate().is_err());
        config.fact_check.endpoint = Some("http://localhost:3001/api/fact-check".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_unknown_provider_and_zero_autosave() {
        let mut config = Config::default();
        config.fact_check.provider = "oracle".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.editor.autosave_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.fact_check.max_retries, 3);
    }
}
