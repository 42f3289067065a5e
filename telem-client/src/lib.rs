// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

//! Client library linked into probes: builds records, stamps host info, and
//! hands them to the ingest daemon over its local socket.

pub mod host_info;
pub mod opt_out;
pub mod record;
pub mod transport;

pub use opt_out::opted_out;
pub use record::{create_record, Record};
pub use telem_wire::Frame;
use telem_common::{Result, TelemetryError};

/// Builds, finishes, and sends a record in one call, the common case for a
/// probe that only ever creates and sends a single record per invocation.
/// Silently no-ops when the system has opted out, matching the original
/// client's "no error, just don't send" opt-out behavior.
pub fn send(record: Record) -> Result<()> {
    if opted_out() {
        return Ok(());
    }
    let frame = record.finish()?;
    transport::send_frame(&frame)
}

/// Same as `send`, but surfaces opt-out explicitly rather than swallowing
/// it, for callers (such as a CLI record generator) that want to report it.
pub fn send_strict(record: Record) -> Result<()> {
    if opted_out() {
        return Err(TelemetryError::Refused("telemetry is opted out".into()));
    }
    let frame = record.finish()?;
    transport::send_frame(&frame)
}
