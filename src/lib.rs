//! Rancher Probe Library
//!
//! Logs into a Rancher management server through the local auth provider
//! the way the web UI does, then audits downstream cluster nodes for role
//! labels or resolves project role binding principals.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use crate::core::audit::{AuditReport, ClusterOutcome, ClusterReport, NodeRoleAuditor};
pub use crate::core::principals::{PrincipalInspector, PrincipalReport};
pub use crate::core::session::{LoginOptions, Session, SessionEstablisher};
pub use crate::core::transport::{ApiRequest, ApiResponse, Transport};
pub use crate::domain::config::{Credentials, ProbeConfig, ProbeSettings};
pub use crate::domain::error::{ProbeError, ProbeResult};
pub use crate::domain::model::{ClusterId, NodeRecord, RequiredLabels};
pub use crate::infrastructure::http::HttpTransport;
