use crate::core::transport::{ApiRequest, ApiResponse};
use reqwest::header::{HeaderName, COOKIE};
use reqwest::Method;
use std::collections::BTreeMap;
use std::fmt;

/// Cookie carrying the anti-forgery token.
pub const CSRF_COOKIE: &str = "CSRF";
/// Cookie carrying the authenticated session.
pub const SESSION_COOKIE: &str = "R_SESS";
/// Header the anti-forgery token is echoed in.
pub const CSRF_HEADER: HeaderName = HeaderName::from_static("x-api-csrf");

/// UI preference cookies the dashboard always sends.
const DEFAULT_COOKIES: [(&str, &str); 3] = [
    ("R_PCS", "light"),
    ("R_REDIRECTED", "true"),
    ("R_LOCALE", "en-us"),
];

/// Authenticated (or authenticating) session against one management server.
///
/// The session is a plain value: every request is built from it, and every
/// response that sets cookies is folded back into it with [`Session::absorb`].
/// Nothing is stored on the transport.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    csrf_token: String,
    cookies: BTreeMap<String, String>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            csrf_token: String::new(),
            cookies: DEFAULT_COOKIES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Anti-forgery token, empty when the server never issued one.
    pub fn csrf_token(&self) -> &str {
        &self.csrf_token
    }

    pub fn set_csrf_token(&mut self, token: impl Into<String>) {
        self.csrf_token = token.into();
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn cookies(&self) -> &BTreeMap<String, String> {
        &self.cookies
    }

    pub fn is_authenticated(&self) -> bool {
        self.cookies.get(SESSION_COOKIE).is_some_and(|v| !v.is_empty())
    }

    /// Merge cookies set by a response. An empty value deletes the cookie,
    /// which is how Rancher expires `R_SESS` on logout.
    pub fn absorb(&mut self, response: &ApiResponse) {
        for (name, value) in &response.cookies {
            if value.is_empty() {
                self.cookies.remove(name);
            } else {
                self.cookies.insert(name.clone(), value.clone());
            }
        }
    }

    /// Build a request carrying this session's cookies and CSRF header.
    pub fn request(&self, method: Method, path: impl Into<String>) -> ApiRequest {
        let mut request = ApiRequest::new(method, path);
        if !self.cookies.is_empty() {
            request = request.header(COOKIE, &self.cookie_header());
        }
        if !self.csrf_token.is_empty() {
            request = request.header(CSRF_HEADER, &self.csrf_token);
        }
        request
    }

    pub fn get(&self, path: impl Into<String>) -> ApiRequest {
        self.request(Method::GET, path)
    }

    fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

// Cookie values are credentials
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("csrf_token", &if self.csrf_token.is_empty() { "<none>" } else { "<set>" })
            .field("cookies", &self.cookies.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_new_session_carries_ui_cookies() {
        let session = Session::new();
        assert_eq!(session.cookie("R_PCS"), Some("light"));
        assert_eq!(session.cookie("R_LOCALE"), Some("en-us"));
        assert!(!session.is_authenticated());
        assert_eq!(session.csrf_token(), "");
    }

    #[test]
    fn test_request_without_token_has_no_csrf_header() {
        let request = Session::new().get("/v3");
        assert!(request.headers.get(CSRF_HEADER).is_none());
        let cookie = request.headers.get(COOKIE).unwrap().to_str().unwrap();
        assert_eq!(cookie, "R_LOCALE=en-us; R_PCS=light; R_REDIRECTED=true");
    }

    #[test]
    fn test_absorb_and_request_headers() {
        let mut session = Session::new();
        let response = ApiResponse::new(StatusCode::OK, "")
            .with_cookie(CSRF_COOKIE, "tok")
            .with_cookie(SESSION_COOKIE, "sess");
        session.absorb(&response);
        session.set_csrf_token("tok");

        assert!(session.is_authenticated());
        let request = session.get("/v3/users?me=true");
        assert_eq!(request.headers.get(CSRF_HEADER).unwrap(), "tok");
        let cookie = request.headers.get(COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.contains("R_SESS=sess"));
        assert!(cookie.contains("CSRF=tok"));
    }

    #[test]
    fn test_empty_cookie_value_removes_it() {
        let mut session = Session::new();
        session.absorb(&ApiResponse::new(StatusCode::OK, "").with_cookie(SESSION_COOKIE, "sess"));
        session.absorb(&ApiResponse::new(StatusCode::OK, "").with_cookie(SESSION_COOKIE, ""));
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_debug_hides_cookie_values() {
        let mut session = Session::new();
        session.absorb(&ApiResponse::new(StatusCode::OK, "").with_cookie(SESSION_COOKIE, "topsecret"));
        let debug = format!("{:?}", session);
        assert!(!debug.contains("topsecret"));
        assert!(debug.contains("R_SESS"));
    }
}
