use crate::core::probe::TransportFactory;
use crate::core::transport::{ApiRequest, ApiResponse, Transport};
use crate::domain::config::ProbeSettings;
use crate::domain::error::{ProbeError, ProbeResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// reqwest-backed transport to a Rancher management server.
///
/// Holds no cookie store: session cookies travel in the request headers
/// built from a [`Session`](crate::core::session::Session).
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration, insecure_skip_tls_verify: bool) -> ProbeResult<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url)
            .map_err(|e| ProbeError::config(format!("Invalid base URL '{}': {}", base_url, e)))?;

        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("rancher-probe/", env!("CARGO_PKG_VERSION")));

        if insecure_skip_tls_verify {
            warn!(
                "TLS certificate verification is DISABLED for {}; only use this against test servers",
                base_url
            );
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build()?;
        debug!("HTTP transport ready for {} (timeout {:?})", base_url, timeout);

        Ok(Self { base_url, client })
    }

    pub fn from_settings(settings: &ProbeSettings) -> ProbeResult<Self> {
        Self::new(
            &settings.base_url,
            settings.timeout,
            settings.insecure_skip_tls_verify,
        )
    }
}

/// Factory handing every user its own [`HttpTransport`] (own connection pool).
pub fn http_transport_factory(settings: Arc<ProbeSettings>) -> TransportFactory {
    Arc::new(move || -> ProbeResult<Arc<dyn Transport>> {
        Ok(Arc::new(HttpTransport::from_settings(&settings)?))
    })
}

#[async_trait]
impl Transport for HttpTransport {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, request: ApiRequest) -> ProbeResult<ApiResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        trace!("Sending request => method = {} uri = {}", request.method, url);

        let mut builder = self
            .client
            .request(request.method, &url)
            .headers(request.headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let cookies = response
            .cookies()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect();
        let body = response.text().await?;
        trace!("Status = {} for {}", status, url);

        Ok(ApiResponse {
            status,
            cookies,
            body,
        })
    }
}
