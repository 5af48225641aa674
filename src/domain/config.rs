use crate::domain::error::{ProbeError, ProbeResult};
use crate::domain::model::RequiredLabels;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Rancher probe configuration as stored on disk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Management server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Login credentials
    #[serde(default)]
    pub credentials: CredentialsConfig,
    /// Polling and concurrency
    #[serde(default)]
    pub run: RunConfig,
    /// Node label audit
    #[serde(default)]
    pub audit: AuditConfig,
    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Management server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL, e.g. `https://rancher.example.internal:8443`
    #[serde(default)]
    pub url: String,
    /// Per-request deadline in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Skip server certificate verification
    #[serde(default)]
    pub insecure_skip_tls_verify: bool,
    /// Endpoint hit to obtain the CSRF cookie
    #[serde(default = "default_csrf_path")]
    pub csrf_path: String,
}

/// Login credentials
#[derive(Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Probe `/v3/users?me=true` after login
    #[serde(default = "default_validate_session")]
    pub validate_session: bool,
    /// Description sent with the login request
    #[serde(default = "default_description")]
    pub description: String,
}

/// Polling and concurrency settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Total run duration in seconds (0 = single pass)
    #[serde(default)]
    pub duration_secs: u64,
    /// Delay between passes in seconds
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Number of concurrent independent users
    #[serde(default = "default_users")]
    pub users: usize,
}

/// Node label audit settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// A node passes when it carries at least one of these label keys
    #[serde(default = "default_required_labels")]
    pub required_labels: Vec<String>,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_timeout_secs() -> u64 {
    30
}

fn default_csrf_path() -> String {
    "/v3".to_string()
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_validate_session() -> bool {
    true
}

fn default_description() -> String {
    "UI session".to_string()
}

fn default_interval_secs() -> u64 {
    5
}

fn default_users() -> usize {
    1
}

fn default_required_labels() -> Vec<String> {
    vec![
        "node-role.kubernetes.io/worker".to_string(),
        "node-role.kubernetes.io/etcd".to_string(),
        "node-role.kubernetes.io/control-plane".to_string(),
    ]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: default_timeout_secs(),
            insecure_skip_tls_verify: false,
            csrf_path: default_csrf_path(),
        }
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            username: default_username(),
            password: String::new(),
            validate_session: default_validate_session(),
            description: default_description(),
        }
    }
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("validate_session", &self.validate_session)
            .field("description", &self.description)
            .finish()
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            duration_secs: 0,
            interval_secs: default_interval_secs(),
            users: default_users(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            required_labels: default_required_labels(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ProbeConfig {
    /// Copy with the password replaced, safe to print.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if !config.credentials.password.is_empty() {
            config.credentials.password = "********".to_string();
        }
        config
    }

    /// Validate and convert into runtime settings.
    pub fn validate(&self) -> ProbeResult<ProbeSettings> {
        ProbeSettings::try_from(self)
    }
}

/// Validated runtime settings derived from a [`ProbeConfig`]
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub insecure_skip_tls_verify: bool,
    pub csrf_path: String,
    pub credentials: Credentials,
    pub validate_session: bool,
    pub login_description: String,
    pub duration: Duration,
    pub interval: Duration,
    pub users: usize,
    pub required_labels: RequiredLabels,
}

/// Username/password pair for the local auth provider
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl TryFrom<&ProbeConfig> for ProbeSettings {
    type Error = ProbeError;

    fn try_from(config: &ProbeConfig) -> ProbeResult<Self> {
        let url = config.server.url.trim().trim_end_matches('/');
        if url.is_empty() {
            return Err(ProbeError::config("server.url is required"));
        }
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| ProbeError::config(format!("server.url '{}' is invalid: {}", url, e)))?;
        if parsed.scheme() != "https" && parsed.scheme() != "http" {
            return Err(ProbeError::config(format!(
                "server.url must use http or https, got '{}'",
                parsed.scheme()
            )));
        }
        if config.server.timeout_secs == 0 {
            return Err(ProbeError::config("server.timeout_secs must be greater than 0"));
        }
        if !config.server.csrf_path.starts_with('/') {
            return Err(ProbeError::config("server.csrf_path must start with '/'"));
        }
        if config.credentials.username.trim().is_empty() {
            return Err(ProbeError::config("credentials.username is required"));
        }
        if config.credentials.password.is_empty() {
            return Err(ProbeError::config("credentials.password is required"));
        }
        if config.run.users == 0 {
            return Err(ProbeError::config("run.users must be at least 1"));
        }
        if config.run.duration_secs > 0 && config.run.interval_secs == 0 {
            return Err(ProbeError::config(
                "run.interval_secs must be greater than 0 when run.duration_secs is set",
            ));
        }
        let required_labels = RequiredLabels::new(&config.audit.required_labels)
            .ok_or_else(|| ProbeError::config("audit.required_labels must name at least one label"))?;

        Ok(Self {
            base_url: url.to_string(),
            timeout: Duration::from_secs(config.server.timeout_secs),
            insecure_skip_tls_verify: config.server.insecure_skip_tls_verify,
            csrf_path: config.server.csrf_path.clone(),
            credentials: Credentials::new(
                config.credentials.username.trim(),
                config.credentials.password.clone(),
            ),
            validate_session: config.credentials.validate_session,
            login_description: config.credentials.description.clone(),
            duration: Duration::from_secs(config.run.duration_secs),
            interval: Duration::from_secs(config.run.interval_secs),
            users: config.run.users,
            required_labels,
        })
    }
}
