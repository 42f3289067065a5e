// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

/// Errors this crate's HTTP client can return. Deliberately narrower than
/// `telem_common::TelemetryError` — the post daemon maps these onto
/// `BackendError`/`Timeout`/`IoError` at the call site.
#[derive(Debug, thiserror::Error)]
pub enum HttpClientError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("request timed out")]
    TimedOut,

    #[error("request failed with status {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),

    #[error("i/o error: {0}")]
    IoError(String),
}
