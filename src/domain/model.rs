use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Namespace Rancher uses for the management cluster itself.
pub const LOCAL_CLUSTER_ID: &str = "local";

/// Handle naming one downstream cluster, e.g. `c-m-abc123`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(String);

impl ClusterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_local(&self) -> bool {
        self.0 == LOCAL_CLUSTER_ID
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClusterId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A node as seen through a cluster's proxied Kubernetes API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub name: String,
    pub labels: BTreeMap<String, String>,
}

impl NodeRecord {
    pub fn new<I, K, V>(name: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            labels: labels
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn has_label(&self, key: &str) -> bool {
        self.labels.contains_key(key)
    }
}

/// Ordered, de-duplicated, non-empty set of label keys a node must carry
/// at least one of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RequiredLabels(Vec<String>);

impl RequiredLabels {
    /// Returns `None` when no non-blank label remains after trimming.
    pub fn new<I, S>(labels: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut keys: Vec<String> = Vec::new();
        for label in labels {
            let label = label.as_ref().trim();
            if !label.is_empty() && !keys.iter().any(|k| k == label) {
                keys.push(label.to_string());
            }
        }
        if keys.is_empty() {
            None
        } else {
            Some(Self(keys))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|k| k == key)
    }
}

// Wire formats

/// Body of the local-provider login action.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    pub description: String,
    pub response_type: String,
    pub username: String,
    pub password: String,
}

/// `/v1/management.cattle.io.nodes` collection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManagementNodeList {
    #[serde(default)]
    pub data: Vec<ManagementNode>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManagementNode {
    #[serde(default)]
    pub metadata: ManagementNodeMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManagementNodeMetadata {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Kubernetes `NodeList` returned through the cluster proxy.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeList {
    #[serde(default)]
    pub items: Vec<NodeItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeItem {
    #[serde(default)]
    pub metadata: NodeMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeMetadata {
    #[serde(default)]
    pub name: String,
    // Kubernetes omits or nulls `labels` on unlabelled nodes
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: BTreeMap<String, String>,
}

impl From<NodeItem> for NodeRecord {
    fn from(item: NodeItem) -> Self {
        Self {
            name: item.metadata.name,
            labels: item.metadata.labels,
        }
    }
}

/// `/v3/projectroletemplatebindings` collection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BindingList {
    #[serde(default)]
    pub data: Vec<RoleBinding>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleBinding {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_principal_id: String,
}

/// `/v3/principals/{id}` detail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalDetail {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub login_name: String,
    #[serde(default)]
    pub principal_id: String,
    #[serde(default)]
    pub me: bool,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_labels_dedup_and_order() {
        let labels = RequiredLabels::new(["b", "a", " b ", "", "c"]).unwrap();
        assert_eq!(labels.iter().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        assert!(labels.contains("a"));
        assert!(!labels.contains("d"));
    }

    #[test]
    fn test_required_labels_rejects_empty() {
        assert!(RequiredLabels::new(Vec::<String>::new()).is_none());
        assert!(RequiredLabels::new(["  ", ""]).is_none());
    }

    #[test]
    fn test_node_list_tolerates_null_labels() {
        let json = r#"{"items":[{"metadata":{"name":"n1","labels":null}},{"metadata":{"name":"n2"}}]}"#;
        let list: NodeList = serde_json::from_str(json).unwrap();
        assert_eq!(list.items.len(), 2);
        assert!(list.items[0].metadata.labels.is_empty());
        assert!(list.items[1].metadata.labels.is_empty());
    }

    #[test]
    fn test_login_payload_is_camel_case() {
        let payload = LoginPayload {
            description: "UI session".to_string(),
            response_type: "cookie".to_string(),
            username: "admin".to_string(),
            password: "secret".to_string(),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["responseType"], "cookie");
        assert_eq!(value["username"], "admin");
    }

    #[test]
    fn test_binding_decodes_null_principal() {
        let json = r#"{"data":[{"id":"p-1:prtb-1","userId":"u-abc","userPrincipalId":null}]}"#;
        let list: BindingList = serde_json::from_str(json).unwrap();
        assert_eq!(list.data[0].user_id, "u-abc");
        assert_eq!(list.data[0].user_principal_id, "");
    }
}
