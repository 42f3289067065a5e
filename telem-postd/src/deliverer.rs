// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

use telem_common::{Result, TelemetryError};
use telem_config::Config;
use telem_transport::HttpClient;
use telem_wire::StagedRecord;

/// Delivers one record to the configured HTTPS backend. Abstracted behind a
/// trait so the post daemon's retry/backoff logic can be exercised against a
/// recording fake without a live server.
pub trait Deliverer {
    fn deliver(&self, record: &StagedRecord) -> Result<()>;
}

pub struct HttpDeliverer {
    client: HttpClient,
    tenant_id_header: String,
}

impl HttpDeliverer {
    pub fn new(config: &Config) -> Result<HttpDeliverer> {
        let mut builder = telem_transport::HttpClientBuilder::new().base_url(&config.server);
        if let Some(ca) = &config.cainfo {
            builder = builder.ca_bundle_path(ca.clone());
        }
        if !config.tidheader.is_empty() {
            builder = builder.tenant_id_header(&config.tidheader);
        }
        let client_config = builder
            .build()
            .map_err(|e| TelemetryError::BackendError(e.to_string()))?;
        let client = HttpClient::new(client_config)
            .map_err(|e| TelemetryError::BackendError(e.to_string()))?;
        Ok(HttpDeliverer {
            client,
            tenant_id_header: config.tidheader.clone(),
        })
    }
}

impl Deliverer for HttpDeliverer {
    fn deliver(&self, record: &StagedRecord) -> Result<()> {
        let body = record_to_json(record).to_string().into_bytes();
        let extra_headers = if self.tenant_id_header.is_empty() {
            Vec::new()
        } else {
            vec![("X-Telemetry-TID".to_string(), self.tenant_id_header.clone())]
        };
        let response = self
            .client
            .post_json_sync("", body, &extra_headers)
            .map_err(|e| TelemetryError::BackendError(e.to_string()))?;

        if response.is_success() {
            Ok(())
        } else {
            Err(TelemetryError::BackendError(format!(
                "backend returned status {}",
                response.status_code
            )))
        }
    }
}

/// Builds the JSON body posted to the backend: every header plus the
/// payload, in header order, matching the record's on-wire shape.
pub fn record_to_json(record: &StagedRecord) -> serde_json::Value {
    let h = &record.headers;
    serde_json::json!({
        "record_format_version": h.record_format_version,
        "classification": h.classification,
        "severity": h.severity,
        "machine_id": h.machine_id,
        "creation_timestamp": h.creation_timestamp,
        "arch": h.arch,
        "host_type": h.host_type,
        "build": h.build,
        "kernel_version": h.kernel_version,
        "system_name": h.system_name,
        "board_name": h.board_name,
        "cpu_model": h.cpu_model,
        "bios_version": h.bios_version,
        "payload_format_version": h.payload_format_version,
        "event_id": h.event_id,
        "payload": String::from_utf8_lossy(&record.payload),
    })
}
