// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

use crate::config::HttpClientConfig;
use crate::error::HttpClientError;
use crate::request::HttpRequest;
use crate::response::HttpResponse;

/// The post daemon's HTTPS client. Builds a single `reqwest::Client` at
/// construction time and reuses it for every delivery attempt.
pub struct HttpClient {
    inner: reqwest::Client,
    config: HttpClientConfig,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self, HttpClientError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.total_timeout());

        if let Some(ca_path) = config.ca_bundle_path() {
            let pem = std::fs::read(ca_path)
                .map_err(|e| HttpClientError::InvalidConfig(format!("reading cainfo: {e}")))?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| HttpClientError::InvalidConfig(format!("parsing cainfo: {e}")))?;
            builder = builder.add_root_certificate(cert);
        }

        let inner = builder
            .build()
            .map_err(|e| HttpClientError::InvalidConfig(e.to_string()))?;

        Ok(HttpClient { inner, config })
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Sends one request asynchronously.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpClientError> {
        let mut builder = self.inner.request(request.method.to_reqwest(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        builder = builder.body(request.body);

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status_code = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response.bytes().await.map_err(map_reqwest_error)?;

        Ok(HttpResponse {
            status_code,
            headers,
            body,
        })
    }

    /// Posts a JSON body synchronously, for use inside the post daemon's
    /// single-threaded cooperative loop. Drives the async client on a
    /// dedicated current-thread Tokio runtime built fresh for this call,
    /// rather than requiring the whole daemon to become async.
    pub fn post_json_sync(
        &self,
        path: &str,
        body: Vec<u8>,
        extra_headers: &[(String, String)],
    ) -> Result<HttpResponse, HttpClientError> {
        let url = format!("{}{}", self.config.base_url(), path);
        let mut request = HttpRequest::new(crate::request::HttpMethod::Post, url)
            .with_header("Content-Type", "application/json")
            .with_body(body);
        if !self.config.tenant_id_header().is_empty() {
            request = request.with_header("X-Telemetry-TID", self.config.tenant_id_header());
        }
        for (name, value) in extra_headers {
            request = request.with_header(name.clone(), value.clone());
        }

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| HttpClientError::IoError(e.to_string()))?;
        rt.block_on(self.send(request))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> HttpClientError {
    if err.is_timeout() {
        HttpClientError::TimedOut
    } else if err.is_connect() {
        HttpClientError::ConnectionFailed(err.to_string())
    } else {
        HttpClientError::IoError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpClientBuilder;

    #[test]
    fn builder_requires_base_url() {
        let result = HttpClientBuilder::new().build();
        assert!(result.is_err());
    }

    #[test]
    fn client_construction_succeeds_with_minimal_config() {
        let config = HttpClientBuilder::new()
            .base_url("https://example.test")
            .build()
            .unwrap();
        assert!(HttpClient::new(config).is_ok());
    }
}
