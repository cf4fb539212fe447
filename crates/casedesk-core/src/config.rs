use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// GatewayConfig
// ---------------------------------------------------------------------------

/// Runtime settings for the gateway.
///
/// Every field has a default so an empty YAML document is a valid config;
/// CLI flags and environment variables are layered on top by the binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Base URL of the backend REST API, without a trailing slash.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    /// Shared HMAC secret the backend signs session tokens with.
    #[serde(default)]
    pub jwt_secret: String,
    /// Page path prefixes that require a valid session.
    #[serde(default = "default_protected_prefixes")]
    pub protected_prefixes: Vec<String>,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// Adds `Secure` to every cookie the gateway sets.
    #[serde(default)]
    pub secure_cookies: bool,
    #[serde(default = "default_session_max_age")]
    pub session_max_age_secs: u64,
    /// Directory of pre-built pages served behind the guard.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Largest request body accepted from the browser, uploads included.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_port() -> u16 {
    3000
}

fn default_backend_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_protected_prefixes() -> Vec<String> {
    vec!["/dashboard".to_string()]
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_session_max_age() -> u64 {
    60 * 60 * 24 * 7
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            backend_url: default_backend_url(),
            jwt_secret: String::new(),
            protected_prefixes: default_protected_prefixes(),
            login_path: default_login_path(),
            secure_cookies: false,
            session_max_age_secs: default_session_max_age(),
            static_dir: None,
            request_timeout_secs: None,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl GatewayConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound(path.display().to_string()));
        }
        let data = std::fs::read_to_string(path)?;
        Self::from_yaml(&data)
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut config: Self = serde_yaml::from_str(data)?;
        if config.max_upload_bytes == 0 {
            return Err(CoreError::InvalidConfig(
                "max_upload_bytes must be greater than zero".to_string(),
            ));
        }
        config.backend_url = config.backend_url.trim_end_matches('/').to_string();
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Join a backend endpoint onto `backend_url`.
    pub fn backend_endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.backend_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.jwt_secret.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "jwt_secret is empty: every session would be rejected".to_string(),
            });
        }

        if !(self.backend_url.starts_with("http://") || self.backend_url.starts_with("https://")) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "backend_url '{}' must start with http:// or https://",
                    self.backend_url
                ),
            });
        }

        for prefix in &self.protected_prefixes {
            if !prefix.starts_with('/') {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("protected prefix '{prefix}' must start with '/'"),
                });
            }
        }

        if !self.login_path.starts_with('/') {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("login_path '{}' must start with '/'", self.login_path),
            });
        }

        if self
            .protected_prefixes
            .iter()
            .any(|p| self.login_path.starts_with(p.as_str()))
        {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "login_path '{}' is itself protected; unauthenticated users will loop",
                    self.login_path
                ),
            });
        }

        if !self.secure_cookies && self.backend_url.starts_with("https://") {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "secure_cookies is off while the backend uses https".to_string(),
            });
        }

        if let Some(dir) = &self.static_dir {
            if !dir.is_dir() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("static_dir '{}' is not a directory", dir.display()),
                });
            }
        }

        warnings
    }

    pub fn has_errors(warnings: &[ConfigWarning]) -> bool {
        warnings.iter().any(|w| w.level == WarnLevel::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let config = GatewayConfig::from_yaml("").unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.backend_url, "http://localhost:8000/api");
        assert_eq!(config.protected_prefixes, vec!["/dashboard"]);
        assert_eq!(config.session_max_age_secs, 604_800);
        assert_eq!(config.max_upload_bytes, 50 * 1024 * 1024);
    }

    #[test]
    fn zero_upload_limit_is_invalid() {
        let err = GatewayConfig::from_yaml("max_upload_bytes: 0\n").unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig(_)));
        assert!(err.to_string().contains("max_upload_bytes"));
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config = GatewayConfig::from_yaml(
            "backend_url: https://api.example.com/api/\njwt_secret: s3cret\n",
        )
        .unwrap();
        assert_eq!(config.backend_url, "https://api.example.com/api");
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.login_path, "/login");
    }

    #[test]
    fn backend_endpoint_joins_single_slash() {
        let config = GatewayConfig::default();
        assert_eq!(
            config.backend_endpoint("/case/7"),
            "http://localhost:8000/api/case/7"
        );
        assert_eq!(
            config.backend_endpoint("login"),
            "http://localhost:8000/api/login"
        );
    }

    #[test]
    fn load_missing_file_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = GatewayConfig::load(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, CoreError::ConfigNotFound(_)));
    }

    #[test]
    fn load_round_trips_through_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("casedesk.yaml");
        let mut config = GatewayConfig::default();
        config.port = 4100;
        config.jwt_secret = "abc".to_string();
        std::fs::write(&path, config.to_yaml().unwrap()).unwrap();

        let loaded = GatewayConfig::load(&path).unwrap();
        assert_eq!(loaded.port, 4100);
        assert_eq!(loaded.jwt_secret, "abc");
    }

    #[test]
    fn validate_flags_empty_secret_as_error() {
        let warnings = GatewayConfig::default().validate();
        assert!(GatewayConfig::has_errors(&warnings));
        assert!(warnings.iter().any(|w| w.message.contains("jwt_secret")));
    }

    #[test]
    fn validate_rejects_relative_prefix() {
        let mut config = GatewayConfig::default();
        config.jwt_secret = "x".to_string();
        config.protected_prefixes.push("cases".to_string());
        let warnings = config.validate();
        assert!(GatewayConfig::has_errors(&warnings));
    }

    #[test]
    fn validate_warns_when_login_is_protected() {
        let mut config = GatewayConfig::default();
        config.jwt_secret = "x".to_string();
        config.protected_prefixes = vec!["/".to_string()];
        let warnings = config.validate();
        assert!(!GatewayConfig::has_errors(&warnings));
        assert!(warnings.iter().any(|w| w.message.contains("loop")));
    }

    #[test]
    fn valid_config_has_no_errors() {
        let mut config = GatewayConfig::default();
        config.jwt_secret = "x".to_string();
        assert!(config.validate().is_empty());
    }
}
