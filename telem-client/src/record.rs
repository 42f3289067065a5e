// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

use telem_common::constants::MACHINE_ID_PLACEHOLDER;
use telem_common::{Result, TelemetryError};
use telem_wire::headers::RecordHeaders;
use telem_wire::validate::{clamp_severity, validate_classification, validate_hex_id, validate_payload};
use telem_wire::Frame;

use crate::{host_info, opt_out};

const RECORD_FORMAT_VERSION: &str = "4";

/// A record under construction by a probe. Mirrors the teacher's
/// builder-then-freeze pattern: fields are filled in as they become known,
/// then `finish()` validates everything at once before handing back a wire
/// `Frame`.
pub struct Record {
    classification: String,
    severity: u8,
    payload_format_version: String,
    payload: Vec<u8>,
    event_id: Option<String>,
}

/// Builds a new record for `classification` at `severity`, tagged with
/// `payload_format_version`. Host info (arch, kernel, board, etc.) is
/// gathered eagerly here the way the teacher's probes snapshot machine
/// state at record-creation time rather than at send time.
pub fn create_record(classification: &str, severity: i32, payload_format_version: &str) -> Result<Record> {
    if opt_out::opted_out() {
        tracing::debug!(classification = %classification, "refusing to create record, telemetry opted out");
        return Err(TelemetryError::Refused("telemetry is opted out".into()));
    }
    validate_classification(classification)?;
    Ok(Record {
        classification: classification.to_string(),
        severity: clamp_severity(severity),
        payload_format_version: payload_format_version.to_string(),
        payload: Vec::new(),
        event_id: None,
    })
}

impl Record {
    pub fn set_payload(&mut self, payload: &[u8]) -> Result<()> {
        if opt_out::opted_out() {
            return Err(TelemetryError::Refused("telemetry is opted out".into()));
        }
        validate_payload(payload)?;
        self.payload = payload.to_vec();
        Ok(())
    }

    /// Overrides the event_id the probe generates for itself. Must be a
    /// 32-char lowercase hex string; without a call to this, `finish()`
    /// generates one via `uuid`.
    pub fn set_event_id(&mut self, event_id: &str) -> Result<()> {
        validate_hex_id(event_id, "event_id")?;
        self.event_id = Some(event_id.to_string());
        Ok(())
    }

    /// Freezes the record into a wire frame, generating an event_id if the
    /// caller never set one and stamping the machine_id placeholder the
    /// ingest daemon is responsible for rewriting.
    pub fn finish(self) -> Result<Frame> {
        if self.payload.is_empty() {
            return Err(TelemetryError::invalid("record has no payload"));
        }
        let event_id = self.event_id.unwrap_or_else(generate_event_id);
        let creation_timestamp = current_unix_timestamp()?;

        let headers = RecordHeaders {
            record_format_version: RECORD_FORMAT_VERSION.to_string(),
            classification: self.classification,
            severity: self.severity.to_string(),
            machine_id: MACHINE_ID_PLACEHOLDER.to_string(),
            creation_timestamp: creation_timestamp.to_string(),
            arch: host_info::arch(),
            host_type: host_info::host_type(),
            build: host_info::build(),
            kernel_version: host_info::kernel_version(),
            system_name: host_info::system_name(),
            board_name: host_info::board_name(),
            cpu_model: host_info::cpu_model(),
            bios_version: host_info::bios_version(),
            payload_format_version: self.payload_format_version,
            event_id,
        };

        Ok(Frame {
            headers,
            payload: self.payload,
        })
    }
}

fn generate_event_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn current_unix_timestamp() -> Result<u64> {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| TelemetryError::Fatal(e.to_string()))
}
