use crate::domain::model::{ClusterId, ManagementNodeList};
use std::collections::HashSet;

/// Node inventory across every cluster the user can see.
pub const MANAGEMENT_NODES_PATH: &str =
    "/v1/management.cattle.io.nodes?pagesize=100000&exclude=metadata.managedFields";

/// Proxied node list path for one downstream cluster. The id comes from
/// server data and is encoded so it stays a single path segment.
pub fn cluster_nodes_path(cluster: &ClusterId) -> String {
    let segment: String = form_urlencoded::byte_serialize(cluster.as_str().as_bytes()).collect();
    format!("/k8s/clusters/{}/api/v1/nodes?page=1&pagesize=100", segment)
}

/// Cluster ids from a management node inventory.
///
/// Each management node lives in the namespace named after its cluster.
/// Empty namespaces and the local cluster are skipped; duplicates keep their
/// first position.
pub fn cluster_ids(inventory: &ManagementNodeList) -> Vec<ClusterId> {
    let mut seen = HashSet::new();
    inventory
        .data
        .iter()
        .map(|node| node.metadata.namespace.trim())
        .filter(|ns| !ns.is_empty())
        .map(ClusterId::from)
        .filter(|id| !id.is_local())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ManagementNode, ManagementNodeMetadata};

    fn inventory(namespaces: &[&str]) -> ManagementNodeList {
        ManagementNodeList {
            data: namespaces
                .iter()
                .map(|ns| ManagementNode {
                    metadata: ManagementNodeMetadata {
                        namespace: ns.to_string(),
                        ..Default::default()
                    },
                })
                .collect(),
        }
    }

    #[test]
    fn test_local_and_duplicates_removed_in_first_seen_order() {
        let ids = cluster_ids(&inventory(&["local", "c-1", "c-1", "c-2"]));
        assert_eq!(ids, vec![ClusterId::from("c-1"), ClusterId::from("c-2")]);
    }

    #[test]
    fn test_empty_namespace_skipped() {
        let ids = cluster_ids(&inventory(&["", "c-m-9", "local", "", "c-m-9"]));
        assert_eq!(ids, vec![ClusterId::from("c-m-9")]);
    }

    #[test]
    fn test_order_follows_inventory() {
        let ids = cluster_ids(&inventory(&["c-b", "c-a", "c-b", "c-c", "c-a"]));
        let ids: Vec<&str> = ids.iter().map(ClusterId::as_str).collect();
        assert_eq!(ids, vec!["c-b", "c-a", "c-c"]);
    }

    #[test]
    fn test_decodes_management_payload() {
        let json = r#"{"data":[
            {"metadata":{"namespace":"c-m-1","labels":{"a":"b"}}},
            {"metadata":{"namespace":"local"}},
            {"metadata":{}}
        ]}"#;
        let list: ManagementNodeList = serde_json::from_str(json).unwrap();
        assert_eq!(cluster_ids(&list), vec![ClusterId::from("c-m-1")]);
    }

    #[test]
    fn test_cluster_nodes_path() {
        assert_eq!(
            cluster_nodes_path(&ClusterId::from("c-m-1")),
            "/k8s/clusters/c-m-1/api/v1/nodes?page=1&pagesize=100"
        );
    }

    #[test]
    fn test_cluster_id_cannot_escape_its_segment() {
        assert_eq!(
            cluster_nodes_path(&ClusterId::from("c-1/../../v3/users?x=1#")),
            "/k8s/clusters/c-1%2F..%2F..%2Fv3%2Fusers%3Fx%3D1%23/api/v1/nodes?page=1&pagesize=100"
        );
    }
}
