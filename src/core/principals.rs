use crate::core::session::Session;
use crate::core::transport::Transport;
use crate::domain::error::{ProbeError, ProbeResult};
use crate::domain::model::{BindingList, PrincipalDetail, RoleBinding};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

pub const BINDINGS_PATH: &str = "/v3/projectroletemplatebindings";

/// Built-in user that shows up in bindings but has no principal.
const SYSTEM_ADMIN_USER: &str = "system:admin";

/// Principal detail path; the id is form-encoded so `local://u-abc`
/// becomes `local%3A%2F%2Fu-abc`.
pub fn principal_path(principal_id: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(principal_id.as_bytes()).collect();
    format!("/v3/principals/{}", encoded)
}

/// Principal id a binding refers to, if any.
///
/// Bindings created for external providers carry `userPrincipalId`; local
/// users often only have `userId`, which maps to `local://<userId>`.
pub fn binding_principal(binding: &RoleBinding) -> Option<String> {
    if binding.user_id == SYSTEM_ADMIN_USER {
        return None;
    }
    if !binding.user_principal_id.is_empty() {
        return Some(binding.user_principal_id.clone());
    }
    if !binding.user_id.is_empty() {
        return Some(format!("local://{}", binding.user_id));
    }
    None
}

/// Unique principal ids across all bindings, first-seen order.
pub fn unique_principals(bindings: &[RoleBinding]) -> Vec<String> {
    let mut seen = HashSet::new();
    bindings
        .iter()
        .filter_map(binding_principal)
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LookupOutcome {
    Found { detail: PrincipalDetail },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrincipalLookup {
    pub principal_id: String,
    #[serde(flatten)]
    pub outcome: LookupOutcome,
}

/// Result of one principal inspection pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrincipalReport {
    pub bindings_seen: usize,
    pub lookups: Vec<PrincipalLookup>,
}

impl PrincipalReport {
    pub fn failed_count(&self) -> usize {
        self.lookups
            .iter()
            .filter(|l| matches!(l.outcome, LookupOutcome::Failed { .. }))
            .count()
    }

    pub fn is_complete(&self) -> bool {
        self.failed_count() == 0
    }
}

/// Resolves the principals behind project role template bindings.
pub struct PrincipalInspector<'a> {
    transport: &'a dyn Transport,
}

impl<'a> PrincipalInspector<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    pub async fn bindings(&self, session: &Session) -> ProbeResult<Vec<RoleBinding>> {
        let list: BindingList = self.fetch(session, BINDINGS_PATH).await?;
        Ok(list.data)
    }

    pub async fn lookup(&self, session: &Session, principal_id: &str) -> ProbeResult<PrincipalDetail> {
        self.fetch(session, &principal_path(principal_id)).await
    }

    /// List bindings and look up every principal they reference. A failed
    /// lookup is recorded and does not stop the pass.
    pub async fn inspect(&self, session: &Session) -> ProbeResult<PrincipalReport> {
        let bindings = self.bindings(session).await?;
        let principals = unique_principals(&bindings);
        info!(
            "Found {} bindings referencing {} principals",
            bindings.len(),
            principals.len()
        );

        let mut report = PrincipalReport {
            bindings_seen: bindings.len(),
            lookups: Vec::with_capacity(principals.len()),
        };
        for principal_id in principals {
            let outcome = match self.lookup(session, &principal_id).await {
                Ok(detail) => {
                    debug!("Principal {} is '{}'", principal_id, detail.display_name);
                    LookupOutcome::Found { detail }
                }
                Err(e) => {
                    warn!("Could not fetch principal {}: {}", principal_id, e);
                    LookupOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            report.lookups.push(PrincipalLookup {
                principal_id,
                outcome,
            });
        }
        Ok(report)
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, session: &Session, path: &str) -> ProbeResult<T> {
        let response = self
            .transport
            .send(session.get(path))
            .await
            .map_err(|e| ProbeError::query(path, e.to_string()))?;
        if !response.is_ok() {
            return Err(ProbeError::query(path, format!("status {}", response.status)));
        }
        response
            .json()
            .map_err(|e| ProbeError::query(path, format!("failed to decode response: {}", e)))
    }
}
