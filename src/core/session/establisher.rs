use crate::core::session::session::{Session, CSRF_COOKIE, SESSION_COOKIE};
use crate::core::transport::{ApiRequest, Transport};
use crate::domain::config::{Credentials, ProbeSettings};
use crate::domain::error::{ProbeError, ProbeResult};
use crate::domain::model::LoginPayload;
use reqwest::header::{CONTENT_TYPE, ORIGIN, REFERER};
use reqwest::Method;
use tracing::{debug, info, warn};

pub const LOGIN_PATH: &str = "/v3-public/localProviders/local?action=login";
pub const ME_PATH: &str = "/v3/users?me=true";

/// Login behaviour knobs
#[derive(Debug, Clone)]
pub struct LoginOptions {
    /// Endpoint hit first to obtain the `CSRF` cookie
    pub csrf_path: String,
    /// Confirm the session against `/v3/users?me=true`
    pub validate_session: bool,
    /// Description recorded by Rancher for the login token
    pub description: String,
}

impl Default for LoginOptions {
    fn default() -> Self {
        Self {
            csrf_path: "/v3".to_string(),
            validate_session: true,
            description: "UI session".to_string(),
        }
    }
}

impl From<&ProbeSettings> for LoginOptions {
    fn from(settings: &ProbeSettings) -> Self {
        Self {
            csrf_path: settings.csrf_path.clone(),
            validate_session: settings.validate_session,
            description: settings.login_description.clone(),
        }
    }
}

/// Runs the CSRF + local-provider login handshake.
pub struct SessionEstablisher<'a> {
    transport: &'a dyn Transport,
    options: LoginOptions,
}

impl<'a> SessionEstablisher<'a> {
    pub fn new(transport: &'a dyn Transport, options: LoginOptions) -> Self {
        Self { transport, options }
    }

    /// Log in and return a usable session.
    ///
    /// A missing CSRF cookie only produces a warning; a failed login or
    /// failed validation is an [`ProbeError::Auth`]. Nothing is retried.
    pub async fn establish(&self, credentials: &Credentials) -> ProbeResult<Session> {
        let mut session = Session::new();

        match self.fetch_csrf_token(&mut session).await {
            Ok(token) => {
                debug!("CSRF token obtained from {}", self.options.csrf_path);
                session.set_csrf_token(token);
            }
            Err(e) => warn!("Continuing login without CSRF token: {}", e),
        }

        self.login(&mut session, credentials).await?;

        if self.options.validate_session {
            self.validate(&session).await?;
        }

        info!(
            "Session established for '{}' on {}",
            credentials.username,
            self.transport.base_url()
        );
        Ok(session)
    }

    async fn fetch_csrf_token(&self, session: &mut Session) -> ProbeResult<String> {
        let request = session.get(self.options.csrf_path.clone()).header(
            REFERER,
            &format!("{}/dashboard/auth/login?logged-out", self.transport.base_url()),
        );
        let response = self.transport.send(request).await?;
        session.absorb(&response);

        if !response.is_ok() {
            return Err(ProbeError::query(
                self.options.csrf_path.clone(),
                format!("expected status 200, got {}", response.status),
            ));
        }

        response
            .cookie(CSRF_COOKIE)
            .map(str::to_string)
            .ok_or_else(|| {
                ProbeError::query(self.options.csrf_path.clone(), "CSRF cookie not found in response")
            })
    }

    async fn login(&self, session: &mut Session, credentials: &Credentials) -> ProbeResult<()> {
        let base = self.transport.base_url();
        let payload = LoginPayload {
            description: self.options.description.clone(),
            response_type: "cookie".to_string(),
            username: credentials.username.clone(),
            password: credentials.password.clone(),
        };

        let request: ApiRequest = session
            .request(Method::POST, LOGIN_PATH)
            .header(CONTENT_TYPE, "application/json")
            .header(REFERER, &format!("{}/dashboard/auth/login?logged-out", base))
            .header(ORIGIN, base)
            .json(serde_json::to_value(&payload)?);

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| ProbeError::auth(format!("login request failed: {}", e)))?;

        if !response.is_ok() {
            return Err(ProbeError::auth(format!(
                "login failed with status {}: {}",
                response.status,
                response.body.trim()
            )));
        }

        // R_SESS must come from this response, not from an earlier one
        if !response.cookie(SESSION_COOKIE).is_some_and(|v| !v.is_empty()) {
            return Err(ProbeError::auth(format!(
                "{} cookie missing after successful login",
                SESSION_COOKIE
            )));
        }
        session.absorb(&response);
        Ok(())
    }

    async fn validate(&self, session: &Session) -> ProbeResult<()> {
        let response = self
            .transport
            .send(session.get(ME_PATH))
            .await
            .map_err(|e| ProbeError::auth(format!("session validation request failed: {}", e)))?;

        if !response.is_ok() {
            return Err(ProbeError::auth(format!(
                "session validation failed with status {}",
                response.status
            )));
        }
        Ok(())
    }
}
