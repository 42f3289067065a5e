// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use std::time::Duration;

use crate::error::HttpClientError;

/// Configuration for the post daemon's single outgoing HTTPS client.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    base_url: String,
    connect_timeout: Duration,
    total_timeout: Duration,
    ca_bundle_path: Option<PathBuf>,
    tenant_id_header: String,
}

impl HttpClientConfig {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn total_timeout(&self) -> Duration {
        self.total_timeout
    }

    pub fn ca_bundle_path(&self) -> Option<&PathBuf> {
        self.ca_bundle_path.as_ref()
    }

    pub fn tenant_id_header(&self) -> &str {
        &self.tenant_id_header
    }
}

/// Fluent builder, mirroring the connect/total-timeout and optional
/// CA-bundle knobs spec'd for HTTPS delivery.
#[derive(Debug, Clone, Default)]
pub struct HttpClientBuilder {
    base_url: Option<String>,
    connect_timeout: Option<Duration>,
    total_timeout: Option<Duration>,
    ca_bundle_path: Option<PathBuf>,
    tenant_id_header: Option<String>,
}

impl HttpClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn total_timeout(mut self, timeout: Duration) -> Self {
        self.total_timeout = Some(timeout);
        self
    }

    pub fn ca_bundle_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_bundle_path = Some(path.into());
        self
    }

    pub fn tenant_id_header(mut self, value: impl Into<String>) -> Self {
        self.tenant_id_header = Some(value.into());
        self
    }

    pub fn build(self) -> Result<HttpClientConfig, HttpClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| HttpClientError::InvalidConfig("base_url is required".to_string()))?;
        Ok(HttpClientConfig {
            base_url,
            connect_timeout: self.connect_timeout.unwrap_or(Duration::from_secs(5)),
            total_timeout: self.total_timeout.unwrap_or(Duration::from_secs(10)),
            ca_bundle_path: self.ca_bundle_path,
            tenant_id_header: self.tenant_id_header.unwrap_or_default(),
        })
    }
}
