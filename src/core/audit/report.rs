use crate::domain::error::{ProbeError, ProbeResult};
use crate::domain::model::ClusterId;
use serde::Serialize;
use std::collections::BTreeMap;

/// A node that carries none of the required labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceViolation {
    pub node: String,
    /// Every label the node currently has
    pub labels: BTreeMap<String, String>,
    /// Required labels absent from the node
    pub missing: Vec<String>,
}

/// Result of checking one cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClusterOutcome {
    Compliant {
        nodes_checked: usize,
    },
    NonCompliant {
        nodes_checked: usize,
        violations: Vec<ComplianceViolation>,
    },
    QueryFailed {
        error: String,
    },
}

impl ClusterOutcome {
    pub fn is_compliant(&self) -> bool {
        matches!(self, Self::Compliant { .. })
    }

    pub fn nodes_checked(&self) -> usize {
        match self {
            Self::Compliant { nodes_checked } | Self::NonCompliant { nodes_checked, .. } => {
                *nodes_checked
            }
            Self::QueryFailed { .. } => 0,
        }
    }

    pub fn violations(&self) -> &[ComplianceViolation] {
        match self {
            Self::NonCompliant { violations, .. } => violations,
            _ => &[],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Compliant { .. } => "compliant",
            Self::NonCompliant { .. } => "non-compliant",
            Self::QueryFailed { .. } => "query-failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterReport {
    pub cluster_id: ClusterId,
    #[serde(flatten)]
    pub outcome: ClusterOutcome,
}

/// Per-cluster outcomes of one audit pass, in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub clusters: Vec<ClusterReport>,
}

impl AuditReport {
    pub fn push(&mut self, cluster_id: ClusterId, outcome: ClusterOutcome) {
        self.clusters.push(ClusterReport { cluster_id, outcome });
    }

    pub fn cluster(&self, id: &str) -> Option<&ClusterReport> {
        self.clusters.iter().find(|c| c.cluster_id.as_str() == id)
    }

    pub fn is_compliant(&self) -> bool {
        self.clusters.iter().all(|c| c.outcome.is_compliant())
    }

    /// Clusters that were non-compliant or could not be queried
    pub fn failed_count(&self) -> usize {
        self.clusters
            .iter()
            .filter(|c| !c.outcome.is_compliant())
            .count()
    }

    pub fn nodes_checked(&self) -> usize {
        self.clusters.iter().map(|c| c.outcome.nodes_checked()).sum()
    }

    pub fn violation_count(&self) -> usize {
        self.clusters
            .iter()
            .map(|c| c.outcome.violations().len())
            .sum()
    }

    /// `Ok` when every cluster is compliant, otherwise
    /// [`ProbeError::AuditFailed`] carrying this report.
    pub fn into_result(self) -> ProbeResult<Self> {
        if self.is_compliant() {
            Ok(self)
        } else {
            Err(ProbeError::AuditFailed {
                report: Box::new(self),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AuditReport {
        let mut report = AuditReport::default();
        report.push("c-1".into(), ClusterOutcome::Compliant { nodes_checked: 3 });
        report.push(
            "c-2".into(),
            ClusterOutcome::NonCompliant {
                nodes_checked: 2,
                violations: vec![ComplianceViolation {
                    node: "n-2".to_string(),
                    labels: BTreeMap::new(),
                    missing: vec!["role/worker".to_string()],
                }],
            },
        );
        report.push(
            "c-3".into(),
            ClusterOutcome::QueryFailed {
                error: "status 503".to_string(),
            },
        );
        report
    }

    #[test]
    fn test_counts() {
        let report = sample();
        assert!(!report.is_compliant());
        assert_eq!(report.failed_count(), 2);
        assert_eq!(report.nodes_checked(), 5);
        assert_eq!(report.violation_count(), 1);
        assert_eq!(report.cluster("c-3").unwrap().outcome.label(), "query-failed");
    }

    #[test]
    fn test_into_result_keeps_report() {
        let err = sample().into_result().unwrap_err();
        assert_eq!(err.to_string(), "Audit failed: 2 of 3 clusters not compliant");
        let report = err.audit_report().unwrap();
        assert_eq!(report.clusters.len(), 3);
    }

    #[test]
    fn test_empty_report_is_compliant() {
        assert!(AuditReport::default().into_result().is_ok());
    }

    #[test]
    fn test_serializes_with_status_tag() {
        let value = serde_json::to_value(sample()).unwrap();
        let clusters = value["clusters"].as_array().unwrap();
        assert_eq!(clusters[0]["cluster_id"], "c-1");
        assert_eq!(clusters[0]["status"], "compliant");
        assert_eq!(clusters[1]["status"], "non_compliant");
        assert_eq!(clusters[1]["violations"][0]["node"], "n-2");
        assert_eq!(clusters[2]["error"], "status 503");
    }
}
