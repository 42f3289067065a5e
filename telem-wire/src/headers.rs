// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

use telem_common::{Result, TelemetryError};

/// The fixed, ordered set of header fields every record carries. Replaces
/// the original's `strtok`-over-a-string-array approach with a typed
/// struct; serialization always emits this order, and parsing rejects
/// anything out of order or unrecognized.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RecordHeaders {
    pub record_format_version: String,
    pub classification: String,
    pub severity: String,
    pub machine_id: String,
    pub creation_timestamp: String,
    pub arch: String,
    pub host_type: String,
    pub build: String,
    pub kernel_version: String,
    pub system_name: String,
    pub board_name: String,
    pub cpu_model: String,
    pub bios_version: String,
    pub payload_format_version: String,
    pub event_id: String,
}

/// Names in canonical header-block order. Used both for serialization and
/// for rejecting out-of-order input while parsing.
pub const HEADER_NAMES: [&str; 15] = [
    "record_format_version",
    "classification",
    "severity",
    "machine_id",
    "creation_timestamp",
    "arch",
    "host_type",
    "build",
    "kernel_version",
    "system_name",
    "board_name",
    "cpu_model",
    "bios_version",
    "payload_format_version",
    "event_id",
];

impl RecordHeaders {
    fn field(&self, name: &str) -> &str {
        match name {
            "record_format_version" => &self.record_format_version,
            "classification" => &self.classification,
            "severity" => &self.severity,
            "machine_id" => &self.machine_id,
            "creation_timestamp" => &self.creation_timestamp,
            "arch" => &self.arch,
            "host_type" => &self.host_type,
            "build" => &self.build,
            "kernel_version" => &self.kernel_version,
            "system_name" => &self.system_name,
            "board_name" => &self.board_name,
            "cpu_model" => &self.cpu_model,
            "bios_version" => &self.bios_version,
            "payload_format_version" => &self.payload_format_version,
            "event_id" => &self.event_id,
            _ => unreachable!("field() called with unknown header name"),
        }
    }

    /// Serializes the header block as ordered `name: value\n` ASCII lines.
    pub fn to_header_block(&self) -> String {
        let mut out = String::new();
        for name in HEADER_NAMES {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(self.field(name));
            out.push('\n');
        }
        out
    }

    /// Parses a header block, requiring the fields to appear in canonical
    /// order with an exact name match before the `:` (no prefix matching —
    /// `classification:` must not be confused with `classification_extra:`).
    pub fn parse_header_block(block: &str) -> Result<RecordHeaders> {
        let mut values: Vec<String> = Vec::with_capacity(HEADER_NAMES.len());
        let mut lines = block.lines();
        for expected in HEADER_NAMES {
            let line = lines.next().ok_or_else(|| {
                TelemetryError::corrupt(format!("missing header '{expected}'"))
            })?;
            let prefix = format!("{expected}: ");
            let value = line.strip_prefix(&prefix).ok_or_else(|| {
                TelemetryError::corrupt(format!("expected header '{expected}' in order"))
            })?;
            values.push(value.to_string());
        }
        if lines.next().is_some() {
            return Err(TelemetryError::corrupt("unexpected trailing header line"));
        }
        Ok(RecordHeaders {
            record_format_version: values[0].clone(),
            classification: values[1].clone(),
            severity: values[2].clone(),
            machine_id: values[3].clone(),
            creation_timestamp: values[4].clone(),
            arch: values[5].clone(),
            host_type: values[6].clone(),
            build: values[7].clone(),
            kernel_version: values[8].clone(),
            system_name: values[9].clone(),
            board_name: values[10].clone(),
            cpu_model: values[11].clone(),
            bios_version: values[12].clone(),
            payload_format_version: values[13].clone(),
            event_id: values[14].clone(),
        })
    }

    pub fn set_machine_id(&mut self, machine_id: &str) {
        self.machine_id = machine_id.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RecordHeaders {
        RecordHeaders {
            record_format_version: "4".into(),
            classification: "org.test/probe/sub".into(),
            severity: "1".into(),
            machine_id: "ffffffffffffffffffffffffffffffff".into(),
            creation_timestamp: "1000".into(),
            arch: "x86_64".into(),
            host_type: "unknown|unknown|unknown".into(),
            build: "unknown".into(),
            kernel_version: "6.1.0".into(),
            system_name: "unknown".into(),
            board_name: "unknown|unknown".into(),
            cpu_model: "unknown".into(),
            bios_version: "unknown".into(),
            payload_format_version: "1".into(),
            event_id: "0123456789abcdef0123456789abcdef".into(),
        }
    }

    #[test]
    fn round_trips_through_header_block() {
        let headers = sample();
        let block = headers.to_header_block();
        let parsed = RecordHeaders::parse_header_block(&block).unwrap();
        assert_eq!(headers, parsed);
    }

    #[test]
    fn rejects_out_of_order_headers() {
        let block = "classification: a/b/c\nrecord_format_version: 4\n".to_string()
            + &HEADER_NAMES[2..]
                .iter()
                .map(|n| format!("{n}: x\n"))
                .collect::<String>();
        assert!(RecordHeaders::parse_header_block(&block).is_err());
    }

    #[test]
    fn rejects_prefix_confusable_header_name() {
        let mut block = String::new();
        block.push_str("record_format_version: 4\n");
        block.push_str("classification_extra: not classification\n");
        for name in &HEADER_NAMES[2..] {
            block.push_str(&format!("{name}: x\n"));
        }
        assert!(RecordHeaders::parse_header_block(&block).is_err());
    }
}
