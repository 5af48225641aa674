use crate::core::audit::compliance::evaluate_cluster;
use crate::core::audit::discovery::{cluster_ids, cluster_nodes_path, MANAGEMENT_NODES_PATH};
use crate::core::audit::report::{AuditReport, ClusterOutcome};
use crate::core::session::Session;
use crate::core::transport::{ApiResponse, Transport};
use crate::domain::error::{ProbeError, ProbeResult};
use crate::domain::model::{ClusterId, ManagementNodeList, NodeList, NodeRecord, RequiredLabels};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

/// Checks that every node of every accessible cluster carries a role label.
pub struct NodeRoleAuditor<'a> {
    transport: &'a dyn Transport,
    required: RequiredLabels,
}

impl<'a> NodeRoleAuditor<'a> {
    pub fn new(transport: &'a dyn Transport, required: RequiredLabels) -> Self {
        Self {
            transport,
            required,
        }
    }

    pub fn required_labels(&self) -> &RequiredLabels {
        &self.required
    }

    /// Run one audit pass.
    ///
    /// Discovery failures abort the pass with [`ProbeError::Query`]. Per
    /// cluster failures are recorded and the pass moves on, so the returned
    /// [`ProbeError::AuditFailed`] always carries a result for every cluster.
    pub async fn audit(&self, session: &Session) -> ProbeResult<AuditReport> {
        let clusters = self.discover(session).await?;
        info!("Auditing {} clusters", clusters.len());

        let mut report = AuditReport::default();
        for cluster in clusters {
            let outcome = self.check_cluster(session, &cluster).await;
            match &outcome {
                ClusterOutcome::Compliant { nodes_checked } => {
                    info!("Cluster {}: all {} nodes carry a required role", cluster, nodes_checked)
                }
                ClusterOutcome::NonCompliant { violations, .. } => {
                    for v in violations {
                        warn!(
                            "Cluster {}: node {} is missing all required roles {:?}; labels {:?}",
                            cluster, v.node, v.missing, v.labels
                        );
                    }
                }
                ClusterOutcome::QueryFailed { error } => {
                    warn!("Cluster {}: node check failed: {}", cluster, error)
                }
            }
            report.push(cluster, outcome);
        }

        report.into_result()
    }

    /// Unique downstream cluster ids visible to the session.
    pub async fn discover(&self, session: &Session) -> ProbeResult<Vec<ClusterId>> {
        let inventory: ManagementNodeList = self.fetch_json(session, MANAGEMENT_NODES_PATH).await?;
        let ids = cluster_ids(&inventory);
        debug!(
            "Discovered {} clusters from {} management nodes",
            ids.len(),
            inventory.data.len()
        );
        Ok(ids)
    }

    pub async fn fetch_nodes(&self, session: &Session, cluster: &ClusterId) -> ProbeResult<Vec<NodeRecord>> {
        let list: NodeList = self.fetch_json(session, &cluster_nodes_path(cluster)).await?;
        Ok(list.items.into_iter().map(NodeRecord::from).collect())
    }

    async fn check_cluster(&self, session: &Session, cluster: &ClusterId) -> ClusterOutcome {
        match self.fetch_nodes(session, cluster).await {
            Ok(nodes) => evaluate_cluster(&nodes, &self.required),
            Err(e) => ClusterOutcome::QueryFailed {
                error: e.to_string(),
            },
        }
    }

    async fn fetch_json<T: DeserializeOwned>(&self, session: &Session, path: &str) -> ProbeResult<T> {
        let response: ApiResponse = self
            .transport
            .send(session.get(path))
            .await
            .map_err(|e| ProbeError::query(path, e.to_string()))?;

        if !response.is_ok() {
            return Err(ProbeError::query(
                path,
                format!("status {}: {}", response.status, response.body.trim()),
            ));
        }
        response
            .json()
            .map_err(|e| ProbeError::query(path, format!("failed to decode response: {}", e)))
    }
}
