// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

use telem_common::constants::{
    EVENT_ID_LEN, MAX_CLASSIFICATION_BYTES, MAX_CLASSIFICATION_SEGMENT_BYTES, MAX_PAYLOAD_BYTES,
};
use telem_common::{Result, TelemetryError};

/// Validates a classification string: exactly two `/` separators, each of
/// the three segments 1..40 ASCII bytes, full string <= 122 bytes.
pub fn validate_classification(classification: &str) -> Result<()> {
    if !classification.is_ascii() {
        return Err(TelemetryError::invalid("classification must be ASCII"));
    }
    if classification.len() > MAX_CLASSIFICATION_BYTES {
        return Err(TelemetryError::invalid("classification too long"));
    }
    let segments: Vec<&str> = classification.split('/').collect();
    if segments.len() != 3 {
        return Err(TelemetryError::invalid(
            "classification must have exactly two '/' separators",
        ));
    }
    for segment in &segments {
        if segment.is_empty() || segment.len() > MAX_CLASSIFICATION_SEGMENT_BYTES {
            return Err(TelemetryError::invalid(
                "classification segment must be 1..40 bytes",
            ));
        }
    }
    Ok(())
}

/// A classification filter as accepted by the journal CLI: either an exact
/// match or a `prefix/*` match on the leading segment(s).
pub fn classification_matches(pattern: &str, candidate: &str) -> bool {
    match pattern.strip_suffix("/*") {
        Some(prefix) => candidate == prefix || candidate.starts_with(&format!("{prefix}/")),
        None => candidate == pattern,
    }
}

/// Validates a 32-char lowercase hex id (used for both event_id and
/// machine_id).
pub fn validate_hex_id(id: &str, what: &str) -> Result<()> {
    if id.len() != EVENT_ID_LEN {
        return Err(TelemetryError::invalid(format!(
            "{what} must be {EVENT_ID_LEN} characters"
        )));
    }
    if !id.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()) {
        return Err(TelemetryError::invalid(format!(
            "{what} must be lowercase hex"
        )));
    }
    Ok(())
}

/// Validates a payload: printable ASCII or whitespace, <= 8192 bytes.
pub fn validate_payload(payload: &[u8]) -> Result<()> {
    if payload.len() > MAX_PAYLOAD_BYTES {
        return Err(TelemetryError::invalid("payload exceeds 8192 bytes"));
    }
    if !payload
        .iter()
        .all(|&b| b.is_ascii_graphic() || b.is_ascii_whitespace() || b == b' ')
    {
        return Err(TelemetryError::invalid(
            "payload must be printable ASCII or whitespace",
        ));
    }
    Ok(())
}

/// Clamps severity into the 1..4 range the rest of the pipeline assumes.
pub fn clamp_severity(severity: i32) -> u8 {
    severity.clamp(1, 4) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_classification() {
        assert!(validate_classification("org.test/probe/sub").is_ok());
    }

    #[test]
    fn rejects_too_few_segments() {
        assert!(validate_classification("a/b").is_err());
    }

    #[test]
    fn rejects_too_many_segments() {
        assert!(validate_classification("a/b/c/d").is_err());
    }

    #[test]
    fn rejects_empty_segment() {
        assert!(validate_classification("a//b").is_err());
    }

    #[test]
    fn rejects_oversize_segment() {
        let long = "a".repeat(41);
        assert!(validate_classification(&format!("{long}/b/c")).is_err());
    }

    #[test]
    fn classification_prefix_filter_matches() {
        assert!(classification_matches("org/test/*", "org/test/sub"));
        assert!(classification_matches("org/test/*", "org/test"));
        assert!(!classification_matches("org/test/*", "org/other/sub"));
    }

    #[test]
    fn rejects_non_hex_event_id() {
        assert!(validate_hex_id("Xbc17766547776eb7fc478eb0eb43e43", "event_id").is_err());
    }

    #[test]
    fn payload_boundary_accepted_and_rejected() {
        let ok = vec![b'a'; 8192];
        assert!(validate_payload(&ok).is_ok());
        let too_big = vec![b'a'; 8193];
        assert!(validate_payload(&too_big).is_err());
    }

    #[test]
    fn severity_clamps_to_range() {
        assert_eq!(clamp_severity(0), 1);
        assert_eq!(clamp_severity(5), 4);
        assert_eq!(clamp_severity(2), 2);
    }
}
