use crate::core::audit::report::{ClusterOutcome, ComplianceViolation};
use crate::domain::model::{NodeRecord, RequiredLabels};

/// A node passes when it has at least one required label key. Values are
/// ignored, and the required keys are alternatives rather than a checklist.
pub fn is_compliant(node: &NodeRecord, required: &RequiredLabels) -> bool {
    required.iter().any(|key| node.has_label(key))
}

/// Required labels the node does not carry, in configured order.
pub fn missing_labels(node: &NodeRecord, required: &RequiredLabels) -> Vec<String> {
    required
        .iter()
        .filter(|key| !node.has_label(key))
        .map(str::to_string)
        .collect()
}

pub fn check_node(node: &NodeRecord, required: &RequiredLabels) -> Option<ComplianceViolation> {
    if is_compliant(node, required) {
        return None;
    }
    Some(ComplianceViolation {
        node: node.name.clone(),
        labels: node.labels.clone(),
        missing: missing_labels(node, required),
    })
}

/// Evaluate every node of one cluster.
pub fn evaluate_cluster(nodes: &[NodeRecord], required: &RequiredLabels) -> ClusterOutcome {
    let violations: Vec<ComplianceViolation> = nodes
        .iter()
        .filter_map(|node| check_node(node, required))
        .collect();

    if violations.is_empty() {
        ClusterOutcome::Compliant {
            nodes_checked: nodes.len(),
        }
    } else {
        ClusterOutcome::NonCompliant {
            nodes_checked: nodes.len(),
            violations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn roles() -> RequiredLabels {
        RequiredLabels::new(["role/worker", "role/control-plane"]).unwrap()
    }

    #[test]
    fn test_any_required_label_is_enough() {
        let node = NodeRecord::new("n1", [("role/worker", "true")]);
        assert!(is_compliant(&node, &roles()));
        assert!(check_node(&node, &roles()).is_none());
    }

    #[test]
    fn test_label_value_is_ignored() {
        let node = NodeRecord::new("n1", [("role/control-plane", "")]);
        assert!(is_compliant(&node, &roles()));
    }

    #[test]
    fn test_unrelated_labels_fail_with_all_missing() {
        let node = NodeRecord::new("n2", [("zone", "us-east")]);
        let violation = check_node(&node, &roles()).unwrap();
        assert_eq!(violation.node, "n2");
        assert_eq!(violation.missing, vec!["role/worker", "role/control-plane"]);
        assert_eq!(violation.labels.get("zone").map(String::as_str), Some("us-east"));
    }

    #[test]
    fn test_cluster_lists_only_failing_nodes() {
        let nodes = vec![
            NodeRecord::new("ok", [("role/worker", "true")]),
            NodeRecord::new("bad-1", [("zone", "a")]),
            NodeRecord::new("bad-2", Vec::<(String, String)>::new()),
        ];
        match evaluate_cluster(&nodes, &roles()) {
            ClusterOutcome::NonCompliant {
                nodes_checked,
                violations,
            } => {
                assert_eq!(nodes_checked, 3);
                let names: Vec<_> = violations.iter().map(|v| v.node.as_str()).collect();
                assert_eq!(names, vec!["bad-1", "bad-2"]);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_empty_cluster_is_compliant() {
        assert_eq!(
            evaluate_cluster(&[], &roles()),
            ClusterOutcome::Compliant { nodes_checked: 0 }
        );
    }

    fn label_key() -> impl Strategy<Value = String> {
        prop::sample::select(vec!["a", "b", "c", "d", "e", "f"]).prop_map(str::to_string)
    }

    proptest! {
        #[test]
        fn prop_compliant_iff_keys_intersect(
            required in prop::collection::vec(label_key(), 1..4),
            keys in prop::collection::vec(label_key(), 0..6),
        ) {
            let required = RequiredLabels::new(&required).unwrap();
            let labels: BTreeMap<String, String> =
                keys.iter().map(|k| (k.clone(), "x".to_string())).collect();
            let node = NodeRecord { name: "n".to_string(), labels };

            let intersects = required.iter().any(|k| node.labels.contains_key(k));
            prop_assert_eq!(is_compliant(&node, &required), intersects);

            let expected_missing: Vec<String> = required
                .iter()
                .filter(|k| !node.labels.contains_key(*k))
                .map(str::to_string)
                .collect();
            prop_assert_eq!(missing_labels(&node, &required), expected_missing);
        }

        #[test]
        fn prop_cluster_compliant_iff_all_nodes_compliant(
            node_keys in prop::collection::vec(prop::collection::vec(label_key(), 0..3), 0..6),
        ) {
            let required = RequiredLabels::new(["a", "b"]).unwrap();
            let nodes: Vec<NodeRecord> = node_keys
                .iter()
                .enumerate()
                .map(|(i, keys)| NodeRecord::new(
                    format!("n{}", i),
                    keys.iter().map(|k| (k.clone(), String::new())),
                ))
                .collect();

            let failing = nodes.iter().filter(|n| !is_compliant(n, &required)).count();
            let outcome = evaluate_cluster(&nodes, &required);
            prop_assert_eq!(outcome.is_compliant(), failing == 0);
            prop_assert_eq!(outcome.violations().len(), failing);
            prop_assert_eq!(outcome.nodes_checked(), nodes.len());
        }
    }
}
