use crate::core::audit::{AuditReport, NodeRoleAuditor};
use crate::core::principals::{PrincipalInspector, PrincipalReport};
use crate::core::runner::{poll, run_users, PassRecord, PollSchedule, UserRun};
use crate::core::session::{LoginOptions, Session, SessionEstablisher};
use crate::core::transport::Transport;
use crate::domain::config::ProbeSettings;
use crate::domain::error::ProbeResult;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Builds a fresh transport for each user so no connection state is shared.
pub type TransportFactory = Arc<dyn Fn() -> ProbeResult<Arc<dyn Transport>> + Send + Sync>;

/// What a successful login left behind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginReport {
    pub username: String,
    pub csrf_token_issued: bool,
    pub cookies: Vec<String>,
}

impl LoginReport {
    fn from_session(username: &str, session: &Session) -> Self {
        Self {
            username: username.to_string(),
            csrf_token_issued: !session.csrf_token().is_empty(),
            cookies: session.cookies().keys().cloned().collect(),
        }
    }
}

async fn establish(transport: &dyn Transport, settings: &ProbeSettings) -> ProbeResult<Session> {
    SessionEstablisher::new(transport, LoginOptions::from(settings))
        .establish(&settings.credentials)
        .await
}

fn schedule(settings: &ProbeSettings) -> PollSchedule {
    PollSchedule::new(settings.duration, settings.interval)
}

/// Log in once per user.
pub async fn run_login(settings: Arc<ProbeSettings>, factory: TransportFactory) -> Vec<UserRun<LoginReport>> {
    run_users(settings.users, move |_| {
        let settings = Arc::clone(&settings);
        let factory = Arc::clone(&factory);
        async move {
            let transport = factory()?;
            let session = establish(transport.as_ref(), &settings).await?;
            Ok(vec![PassRecord {
                iteration: 1,
                started_after: Duration::ZERO,
                result: Ok(LoginReport::from_session(&settings.credentials.username, &session)),
            }])
        }
    })
    .await
}

/// Log in once per user, then audit node roles on the configured schedule.
pub async fn run_audit(settings: Arc<ProbeSettings>, factory: TransportFactory) -> Vec<UserRun<AuditReport>> {
    run_users(settings.users, move |_| {
        let settings = Arc::clone(&settings);
        let factory = Arc::clone(&factory);
        async move {
            let transport = factory()?;
            let session = establish(transport.as_ref(), &settings).await?;
            let auditor = NodeRoleAuditor::new(transport.as_ref(), settings.required_labels.clone());

            let (auditor, session) = (&auditor, &session);
            Ok(poll(schedule(&settings), move |_| auditor.audit(session)).await)
        }
    })
    .await
}

/// Log in once per user, then resolve binding principals on the configured
/// schedule.
pub async fn run_principals(
    settings: Arc<ProbeSettings>,
    factory: TransportFactory,
) -> Vec<UserRun<PrincipalReport>> {
    run_users(settings.users, move |_| {
        let settings = Arc::clone(&settings);
        let factory = Arc::clone(&factory);
        async move {
            let transport = factory()?;
            let session = establish(transport.as_ref(), &settings).await?;
            let inspector = PrincipalInspector::new(transport.as_ref());

            let (inspector, session) = (&inspector, &session);
            Ok(poll(schedule(&settings), move |_| inspector.inspect(session)).await)
        }
    })
    .await
}
