// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

pub mod frame;
pub mod headers;
pub mod staged;
pub mod validate;

pub use frame::Frame;
pub use headers::{RecordHeaders, HEADER_NAMES};
pub use staged::StagedRecord;
