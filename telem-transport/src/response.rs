// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

/// An HTTP response received from the backend.
#[derive(Debug)]
pub struct HttpResponse {
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    pub body: bytes::Bytes,
}

impl HttpResponse {
    /// Per spec §4.5: 200 and 201 are the only success codes.
    pub fn is_success(&self) -> bool {
        matches!(self.status_code, 200 | 201)
    }
}
