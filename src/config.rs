use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::CorrelatorError;
use crate::resilience::{BreakerConfig, RetryPolicy};

/// Configuration file structure for buildlens.
///
/// Describes the upstreams the correlator talks to and how hard it tries.
/// Configuration files are loaded from the current directory, the user
/// config directory, or a specified path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Configured Jenkins hosts; the first CI-enabled one serves requests
    #[serde(default)]
    pub jenkins: Vec<JenkinsHost>,

    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub resilience: ResilienceConfig,

    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JenkinsHost {
    /// Stable identifier, used to key the circuit breaker
    pub name: String,

    pub address: String,

    pub username: Option<String>,

    pub password: Option<String>,

    #[serde(default)]
    pub ci_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitHubConfig {
    #[serde(default = "default_github_base_url")]
    pub base_url: String,

    /// GitHub personal access token
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RegistryConfig {
    /// Clouddriver base URL serving registry accounts and images
    #[serde(default = "default_clouddriver_base_url")]
    pub base_url: String,
}

/// Circuit breaker and retry tuning for build server calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResilienceConfig {
    /// Calls recorded in the breaker's sliding window
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Calls required before the failure rate is evaluated
    #[serde(default = "default_window_size")]
    pub minimum_calls: usize,

    /// Failure percentage at which the circuit opens
    #[serde(default = "default_failure_rate_threshold")]
    pub failure_rate_threshold: f64,

    /// Seconds the circuit stays open before probing
    #[serde(default = "default_open_wait_secs")]
    pub open_wait_secs: u64,

    /// Probe calls allowed while half-open
    #[serde(default = "default_half_open_calls")]
    pub half_open_calls: usize,

    /// Attempts for the git details lookup, including the first
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Fixed delay between git details attempts
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            base_url: default_github_base_url(),
            token: None,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: default_clouddriver_base_url(),
        }
    }
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            minimum_calls: default_window_size(),
            failure_rate_threshold: default_failure_rate_threshold(),
            open_wait_secs: default_open_wait_secs(),
            half_open_calls: default_half_open_calls(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_github_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_clouddriver_base_url() -> String {
    "http://localhost:7002".to_string()
}

fn default_window_size() -> usize {
    100
}

fn default_failure_rate_threshold() -> f64 {
    50.0
}

fn default_open_wait_secs() -> u64 {
    60
}

fn default_half_open_calls() -> usize {
    10
}

fn default_retry_attempts() -> u32 {
    10
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("buildlens/{}", env!("CARGO_PKG_VERSION"))
}

impl ResilienceConfig {
    pub fn breaker(&self) -> BreakerConfig {
        BreakerConfig {
            window_size: self.window_size,
            minimum_calls: self.minimum_calls,
            failure_rate_threshold: self.failure_rate_threshold,
            open_wait: Duration::from_secs(self.open_wait_secs),
            half_open_calls: self.half_open_calls,
        }
    }

    pub fn retry(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.retry_attempts,
            Duration::from_millis(self.retry_backoff_ms),
        )
    }
}

impl HttpConfig {
    pub fn client_builder(&self) -> reqwest::ClientBuilder {
        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(Duration::from_secs(self.timeout_secs))
    }
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./buildlens.toml
    /// 3. ./buildlens.json
    /// 4. ./buildlens.yaml
    /// 5. ./buildlens.yml
    /// 6. `{config_dir}/buildlens/config.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = [
            "buildlens.toml",
            "buildlens.json",
            "buildlens.yaml",
            "buildlens.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        if let Some(path) = user_config_path().filter(|p| p.exists()) {
            return Self::load_from_path(&path);
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// The Jenkins host that serves CI requests: the first CI-enabled entry.
    ///
    /// # Errors
    ///
    /// Returns [`CorrelatorError::Config`] when no host is CI-enabled.
    pub fn ci_host(&self) -> crate::error::Result<&JenkinsHost> {
        self.jenkins.iter().find(|h| h.ci_enabled).ok_or_else(|| {
            CorrelatorError::Config("No CI-enabled Jenkins host configured".to_string())
        })
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("buildlens").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn host(name: &str, ci_enabled: bool) -> JenkinsHost {
        JenkinsHost {
            name: name.to_string(),
            address: format!("https://{name}.example.com"),
            username: None,
            password: None,
            ci_enabled,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.jenkins.is_empty());
        assert_eq!(config.github.base_url, "https://api.github.com");
        assert_eq!(config.resilience.retry_attempts, 10);
        assert_eq!(config.resilience.retry_backoff_ms, 1000);
        assert_eq!(config.resilience.window_size, 100);
        assert_eq!(config.http.timeout_secs, 30);
    }

    #[test]
    fn test_load_toml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        let toml_content = r#"
[[jenkins]]
name = "legacy"
address = "https://legacy.example.com"

[[jenkins]]
name = "ci"
address = "https://ci.example.com"
username = "robot"
password = "secret"
ci-enabled = true

[github]
token = "ghp-test-token"

[registry]
base-url = "http://clouddriver:7002"

[resilience]
retry-attempts = 3
retry-backoff-ms = 250
"#;
        write!(temp_file, "{}", toml_content).unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.jenkins.len(), 2);
        assert_eq!(config.github.token, Some("ghp-test-token".to_string()));
        assert_eq!(config.github.base_url, "https://api.github.com");
        assert_eq!(config.registry.base_url, "http://clouddriver:7002");
        assert_eq!(config.resilience.retry_attempts, 3);
        assert_eq!(config.resilience.window_size, 100);

        let retry = config.resilience.retry();
        assert_eq!(retry.max_attempts(), 3);
        assert_eq!(retry.backoff(), Duration::from_millis(250));
    }

    #[test]
    fn test_load_yaml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        let yaml_content = r#"
jenkins:
  - name: ci
    address: https://ci.example.com
    ci-enabled: true
http:
  timeout-secs: 5
"#;
        write!(temp_file, "{}", yaml_content).unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.ci_host().unwrap().name, "ci");
        assert_eq!(config.http.timeout_secs, 5);
    }

    #[test]
    fn test_load_json_config() {
        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        let json_content = r#"{
  "github": {
    "base-url": "https://github.example.com/api/v3"
  }
}"#;
        write!(temp_file, "{}", json_content).unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.github.base_url, "https://github.example.com/api/v3");
    }

    #[test]
    fn test_load_nonexistent_config_fails() {
        let result = Config::load(Some(Path::new("nonexistent.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_first_ci_enabled_host_wins() {
        let config = Config {
            jenkins: vec![host("a", false), host("b", true), host("c", true)],
            ..Config::default()
        };
        assert_eq!(config.ci_host().unwrap().name, "b");
    }

    #[test]
    fn test_no_ci_enabled_host_is_config_error() {
        let config = Config {
            jenkins: vec![host("a", false)],
            ..Config::default()
        };
        assert!(matches!(config.ci_host(), Err(CorrelatorError::Config(_))));
    }
}
