use crate::domain::error::ProbeResult;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;

/// A single request against the management API, relative to the base URL
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path plus query string, always starting with `/`
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Self {
            method,
            path: path.into(),
            headers,
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Adds a header; values that are not valid header text are dropped.
    pub fn header(mut self, name: HeaderName, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Response with the body fully read
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    /// `Set-Cookie` name/value pairs in arrival order
    pub cookies: Vec<(String, String)>,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            cookies: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    /// Rancher answers every successful read with 200, anything else is a failure.
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Transport to one management server
#[async_trait]
pub trait Transport: Send + Sync {
    /// Base URL requests are resolved against, without a trailing slash
    fn base_url(&self) -> &str;

    /// Send a request and read the whole response
    async fn send(&self, request: ApiRequest) -> ProbeResult<ApiResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_to_json_accept() {
        let request = ApiRequest::get("/v3");
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.headers.get(ACCEPT).unwrap(), "application/json");
        assert!(request.body.is_none());
    }

    #[test]
    fn test_invalid_header_value_is_dropped() {
        let request = ApiRequest::get("/v3").header(HeaderName::from_static("x-test"), "bad\nvalue");
        assert!(request.headers.get("x-test").is_none());
    }

    #[test]
    fn test_last_cookie_wins() {
        let response = ApiResponse::new(StatusCode::OK, "")
            .with_cookie("CSRF", "old")
            .with_cookie("CSRF", "new");
        assert_eq!(response.cookie("CSRF"), Some("new"));
        assert_eq!(response.cookie("R_SESS"), None);
    }

    #[test]
    fn test_only_200_is_ok() {
        assert!(ApiResponse::new(StatusCode::OK, "").is_ok());
        assert!(!ApiResponse::new(StatusCode::CREATED, "").is_ok());
        assert!(!ApiResponse::new(StatusCode::UNAUTHORIZED, "").is_ok());
    }
}
