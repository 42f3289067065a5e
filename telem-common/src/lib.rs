// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

pub mod constants;
pub mod error;
pub mod logging;

pub use error::{Result, TelemetryError};
