// Audit module - node role label coverage across downstream clusters
pub mod auditor;
pub mod compliance;
pub mod discovery;
pub mod report;

pub use auditor::NodeRoleAuditor;
pub use compliance::{evaluate_cluster, is_compliant, missing_labels};
pub use discovery::{cluster_ids, cluster_nodes_path, MANAGEMENT_NODES_PATH};
pub use report::{AuditReport, ClusterOutcome, ClusterReport, ComplianceViolation};
