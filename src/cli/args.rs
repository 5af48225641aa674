use crate::domain::config::ProbeConfig;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Command line arguments for rancher-probe
#[derive(Parser, Debug)]
#[command(
    name = "rancher-probe",
    version = env!("CARGO_PKG_VERSION"),
    about = "Session and node role label probe for Rancher management servers",
    long_about = "Logs into a Rancher management server the way the web UI does, then audits every downstream cluster's nodes for role labels or inspects project role binding principals."
)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Settings that override the configuration file
    #[command(flatten)]
    pub overrides: Overrides,

    /// Command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Establish a session and report the cookies obtained
    Login,
    /// Audit downstream cluster nodes for role labels
    Audit,
    /// Resolve principals behind project role template bindings
    Principals,
    /// Configuration management commands
    Config(ConfigArgs),
    /// Display version information
    Version,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
    /// Table output
    Table,
}

/// Per-invocation overrides layered over the loaded configuration
#[derive(ClapArgs, Debug, Default, Clone)]
pub struct Overrides {
    /// Management server base URL
    #[arg(long, env = "RANCHER_URL", global = true)]
    pub url: Option<String>,

    /// Local provider username
    #[arg(long, env = "RANCHER_USERNAME", global = true)]
    pub username: Option<String>,

    /// Local provider password
    #[arg(long, env = "RANCHER_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Keep polling for this many seconds (0 = single pass)
    #[arg(long, global = true)]
    pub duration: Option<u64>,

    /// Seconds between passes
    #[arg(long, global = true)]
    pub interval: Option<u64>,

    /// Number of concurrent users
    #[arg(long, global = true)]
    pub users: Option<usize>,

    /// Required node label key (repeatable, replaces the configured set)
    #[arg(long = "label", global = true)]
    pub labels: Vec<String>,

    /// Endpoint used to obtain the CSRF cookie
    #[arg(long, global = true)]
    pub csrf_path: Option<String>,

    /// Skip the post-login session check
    #[arg(long, global = true)]
    pub no_validate: bool,
}

impl Overrides {
    /// Apply every override that was given.
    pub fn apply(&self, config: &mut ProbeConfig) {
        if let Some(url) = &self.url {
            config.server.url = url.clone();
        }
        if let Some(username) = &self.username {
            config.credentials.username = username.clone();
        }
        if let Some(password) = &self.password {
            config.credentials.password = password.clone();
        }
        if self.insecure {
            config.server.insecure_skip_tls_verify = true;
        }
        if let Some(timeout) = self.timeout {
            config.server.timeout_secs = timeout;
        }
        if let Some(duration) = self.duration {
            config.run.duration_secs = duration;
        }
        if let Some(interval) = self.interval {
            config.run.interval_secs = interval;
        }
        if let Some(users) = self.users {
            config.run.users = users;
        }
        if !self.labels.is_empty() {
            config.audit.required_labels = self.labels.clone();
        }
        if let Some(csrf_path) = &self.csrf_path {
            config.server.csrf_path = csrf_path.clone();
        }
        if self.no_validate {
            config.credentials.validate_session = false;
        }
    }
}

/// Configuration management arguments
#[derive(ClapArgs, Debug)]
pub struct ConfigArgs {
    /// Configuration subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Validate configuration
    Validate {
        /// Configuration file path
        file: Option<String>,
    },
    /// Create default configuration
    Init {
        /// Output file path
        #[arg(long = "path")]
        path: Option<String>,
        /// Global configuration
        #[arg(short, long)]
        global: bool,
    },
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Table => write!(f, "table"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_audit_with_labels() {
        let args = Args::try_parse_from([
            "rancher-probe",
            "audit",
            "--url",
            "https://rancher.local",
            "--label",
            "a",
            "--label",
            "b",
            "-o",
            "json",
        ])
        .unwrap();
        assert!(matches!(args.command, Command::Audit));
        assert_eq!(args.output, OutputFormat::Json);
        assert_eq!(args.overrides.labels, vec!["a", "b"]);
    }

    #[test]
    fn test_overrides_apply() {
        let overrides = Overrides {
            url: Some("https://rancher.local".to_string()),
            password: Some("pw".to_string()),
            insecure: true,
            users: Some(4),
            labels: vec!["x".to_string()],
            no_validate: true,
            ..Overrides::default()
        };
        let mut config = ProbeConfig::default();
        overrides.apply(&mut config);

        assert_eq!(config.server.url, "https://rancher.local");
        assert_eq!(config.credentials.password, "pw");
        assert_eq!(config.credentials.username, "admin");
        assert!(config.server.insecure_skip_tls_verify);
        assert_eq!(config.run.users, 4);
        assert_eq!(config.audit.required_labels, vec!["x"]);
        assert!(!config.credentials.validate_session);
    }

    #[test]
    fn test_empty_overrides_leave_config_untouched() {
        let mut config = ProbeConfig::default();
        Overrides::default().apply(&mut config);
        assert_eq!(config.server.timeout_secs, 30);
        assert_eq!(config.audit.required_labels.len(), 3);
        assert!(config.credentials.validate_session);
    }
}
