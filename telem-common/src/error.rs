// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

use std::io;

/// Error taxonomy shared by every crate in the telemetry pipeline.
///
/// Each daemon contains the blast radius of a given variant itself (a
/// connection gets dropped, a staged file gets removed or kept); this enum
/// only carries enough information to decide that containment.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("refused: {0}")]
    Refused(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("i/o error: {0}")]
    IoError(#[from] io::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("backend error: {0}")]
    BackendError(String),

    #[error("exhausted: {0}")]
    Exhausted(String),

    #[error("fatal: {0}")]
    Fatal(String),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;

impl TelemetryError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        TelemetryError::Invalid(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        TelemetryError::Corrupt(msg.into())
    }

    /// True if a staged file carrying this error should be removed rather
    /// than retried.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TelemetryError::Corrupt(_) | TelemetryError::Invalid(_)
        )
    }
}
