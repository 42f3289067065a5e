// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

use telem_common::{Result, TelemetryError};
use telem_config::RateLimitStrategy;
use telem_ratelimit::RateLimiter;
use telem_wire::validate::{validate_classification, validate_hex_id, validate_payload};
use telem_wire::{Frame, StagedRecord};

/// What happened to an accepted frame.
#[derive(Debug, PartialEq, Eq)]
pub enum Disposition {
    Staged(StagedRecord),
    RateLimited,
}

/// Turns a frame freshly read off a client connection into a decision: stage
/// it, or drop it under rate limiting. Kept free of any I/O so it can be
/// tested directly without a socket or a spool directory.
pub fn handle_client_frame(
    mut frame: Frame,
    machine_id: &str,
    limiter: &mut RateLimiter,
    current_minute: usize,
    strategy: RateLimitStrategy,
) -> Result<Disposition> {
    validate_classification(&frame.headers.classification)?;
    validate_hex_id(&frame.headers.event_id, "event_id")?;
    validate_payload(&frame.payload)?;

    frame.headers.set_machine_id(machine_id);

    let payload_len = frame.payload.len() as i64;
    let within_limits = limiter.check(current_minute, payload_len);
    limiter.update(current_minute, payload_len);

    let staged = StagedRecord {
        override_config_path: None,
        headers: frame.headers,
        payload: frame.payload,
    };

    if !within_limits && strategy == RateLimitStrategy::Drop {
        return Ok(Disposition::RateLimited);
    }

    Ok(Disposition::Staged(staged))
}

pub fn reject_reason(err: &TelemetryError) -> &'static str {
    match err {
        TelemetryError::Invalid(_) => "invalid record",
        TelemetryError::Corrupt(_) => "corrupt frame",
        _ => "rejected",
    }
}
