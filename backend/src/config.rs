//! Configuration for the login backend.

use std::fmt;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub wechat: WechatConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound for a whole request, upstream call included.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Mini-program credentials and the identity provider endpoint.
#[derive(Clone, Deserialize)]
pub struct WechatConfig {
    pub app_id: String,
    pub app_secret: String,
    #[serde(default = "default_wechat_url")]
    pub base_url: String,
    /// Timeout for one `jscode2session` call.
    #[serde(default = "default_wechat_timeout")]
    pub timeout_secs: u64,
}

// The secret must never end up in logs.
impl fmt::Debug for WechatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WechatConfig")
            .field("app_id", &self.app_id)
            .field("app_secret", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `sqlite:<path>`, a bare path, or `:memory:`.
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// `*` or a comma-separated list of origins.
    #[serde(default = "default_cors_origins")]
    pub origins: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: default_cors_origins(),
        }
    }
}

impl CorsConfig {
    /// Explicit origins, or `None` when any origin is allowed.
    pub fn allowed_origins(&self) -> Option<Vec<String>> {
        if self.origins.trim() == "*" {
            return None;
        }

        Some(
            self.origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
        )
    }
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    15
}
fn default_wechat_url() -> String {
    "https://api.weixin.qq.com".to_string()
}
fn default_wechat_timeout() -> u64 {
    5
}
fn default_database_url() -> String {
    "sqlite:./data/users.db".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_cors_origins() -> String {
    "*".to_string()
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (MINI_LOGIN__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Same as [`Config::load`] with an explicit file name (extension optional).
    pub fn load_from(file_name: &str) -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("wechat.base_url", default_wechat_url())?
            .set_default("wechat.timeout_secs", default_wechat_timeout() as i64)?
            .set_default("database.url", default_database_url())?
            .set_default("logging.level", default_log_level())?
            .add_source(File::with_name(file_name).required(false))
            .add_source(
                Environment::with_prefix("MINI_LOGIN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.check_timeouts()?;
        Ok(config)
    }

    /// The upstream call has to fit inside the request timeout, otherwise
    /// slow exchanges are cut off before their own error can be reported.
    pub fn check_timeouts(&self) -> Result<(), ConfigError> {
        if self.server.request_timeout_secs <= self.wechat.timeout_secs {
            return Err(ConfigError::Message(format!(
                "server.request_timeout_secs ({}) must be greater than wechat.timeout_secs ({})",
                self.server.request_timeout_secs, self.wechat.timeout_secs
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_server_config() {
        let server = ServerConfig::default();
        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.port, 8080);
        assert_eq!(server.request_timeout_secs, 15);
    }

    #[test]
    fn test_wechat_debug_redacts_secret() {
        let wechat = WechatConfig {
            app_id: "wx123".to_string(),
            app_secret: "super-secret".to_string(),
            base_url: default_wechat_url(),
            timeout_secs: 5,
        };
        let debug = format!("{:?}", wechat);
        assert!(debug.contains("wx123"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_cors_wildcard_allows_any() {
        assert_eq!(CorsConfig::default().allowed_origins(), None);
    }

    #[test]
    fn test_cors_origin_list() {
        let cors = CorsConfig {
            origins: "https://a.example.com, https://b.example.com,".to_string(),
        };
        assert_eq!(
            cors.allowed_origins(),
            Some(vec![
                "https://a.example.com".to_string(),
                "https://b.example.com".to_string()
            ])
        );
    }

    #[test]
    fn test_load_from_file_fills_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[wechat]\napp_id = \"wx-file\"\napp_secret = \"s3cret\"\n\n[server]\nport = 9090"
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.wechat.app_id, "wx-file");
        assert_eq!(config.wechat.base_url, "https://api.weixin.qq.com");
        assert_eq!(config.wechat.timeout_secs, 5);
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.database.url, "sqlite:./data/users.db");
    }

    #[test]
    fn test_request_timeout_must_exceed_upstream_timeout() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[wechat]\napp_id = \"wx-file\"\napp_secret = \"s3cret\"\ntimeout_secs = 10\n\n[server]\nrequest_timeout_secs = 10"
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("request_timeout_secs"));
    }

    #[test]
    fn test_load_without_credentials_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent");
        assert!(Config::load_from(missing.to_str().unwrap()).is_err());
    }
}
