// In-memory transport for unit tests
use crate::core::transport::{ApiRequest, ApiResponse, Transport};
use crate::domain::error::{ProbeError, ProbeResult};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::Mutex;

/// Answers requests from a fixed path → response table and records every
/// request it sees. Unknown paths get a 404.
pub struct ScriptedTransport {
    routes: HashMap<String, ApiResponse>,
    failing: Vec<String>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            failing: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn route(mut self, path: &str, response: ApiResponse) -> Self {
        self.routes.insert(path.to_string(), response);
        self
    }

    pub fn json(self, path: &str, body: serde_json::Value) -> Self {
        self.route(path, ApiResponse::new(StatusCode::OK, body.to_string()))
    }

    /// Requests to `path` fail at the transport level.
    pub fn fail(mut self, path: &str) -> Self {
        self.failing.push(path.to_string());
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.path).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn base_url(&self) -> &str {
        "https://rancher.test"
    }

    async fn send(&self, request: ApiRequest) -> ProbeResult<ApiResponse> {
        let path = request.path.clone();
        self.requests.lock().unwrap().push(request);

        if self.failing.contains(&path) {
            return Err(ProbeError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )));
        }
        Ok(self
            .routes
            .get(&path)
            .cloned()
            .unwrap_or_else(|| ApiResponse::new(StatusCode::NOT_FOUND, "404 page not found")))
    }
}
