use crate::core::audit::AuditReport;
use thiserror::Error;

/// Rancher probe unified error type
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Authentication error: {message}")]
    Auth { message: String },

    #[error("Query error on {endpoint}: {message}")]
    Query { endpoint: String, message: String },

    #[error(
        "Audit failed: {} of {} clusters not compliant",
        .report.failed_count(),
        .report.clusters.len()
    )]
    AuditFailed { report: Box<AuditReport> },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task error: {0}")]
    Task(String),
}

impl ProbeError {
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn query(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// The audit report carried by an [`ProbeError::AuditFailed`], if any.
    pub fn audit_report(&self) -> Option<&AuditReport> {
        match self {
            Self::AuditFailed { report } => Some(report),
            _ => None,
        }
    }
}

pub type ProbeResult<T> = Result<T, ProbeError>;
