// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use telem_common::constants::CFG_PREFIX_SENTINEL;
use telem_common::{Result, TelemetryError};

use crate::headers::RecordHeaders;

/// A record as written to a spool file: the same headers and payload as a
/// `Frame`, plus an optional per-record config override path carried on a
/// sentinel-prefixed first line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedRecord {
    pub override_config_path: Option<String>,
    pub headers: RecordHeaders,
    pub payload: Vec<u8>,
}

impl StagedRecord {
    /// Serializes to the on-disk staged-file text format:
    /// `[TCFG<path>\n]` + ordered header lines + payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        if let Some(path) = &self.override_config_path {
            out.extend_from_slice(CFG_PREFIX_SENTINEL);
            out.extend_from_slice(path.as_bytes());
            out.push(b'\n');
        }
        out.extend_from_slice(self.headers.to_header_block().as_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn write_to_path(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.encode())?;
        Ok(())
    }

    pub fn read_from_path(path: &Path) -> Result<StagedRecord> {
        let bytes = std::fs::read(path)?;
        Self::decode(&bytes)
    }

    /// Parses the staged-file format back into headers, payload, and an
    /// optional override config path. Any malformed input is reported as
    /// `Corrupt` — callers should remove such files rather than retry them.
    pub fn decode(bytes: &[u8]) -> Result<StagedRecord> {
        let (override_config_path, rest) = if bytes.starts_with(CFG_PREFIX_SENTINEL) {
            let after_sentinel = &bytes[CFG_PREFIX_SENTINEL.len()..];
            let newline = after_sentinel
                .iter()
                .position(|&b| b == b'\n')
                .ok_or_else(|| TelemetryError::corrupt("unterminated config override line"))?;
            let path = std::str::from_utf8(&after_sentinel[..newline])
                .map_err(|_| TelemetryError::corrupt("config override path is not UTF-8"))?
                .to_string();
            (Some(path), &after_sentinel[newline + 1..])
        } else {
            (None, bytes)
        };

        let text = std::str::from_utf8(rest)
            .map_err(|_| TelemetryError::corrupt("staged record is not valid UTF-8"))?;

        let mut header_end = 0;
        for _ in 0..crate::headers::HEADER_NAMES.len() {
            let newline = text[header_end..]
                .find('\n')
                .ok_or_else(|| TelemetryError::corrupt("staged record header block truncated"))?;
            header_end += newline + 1;
        }

        let headers = RecordHeaders::parse_header_block(&text[..header_end])?;
        let payload = rest[header_end..].to_vec();

        Ok(StagedRecord {
            override_config_path,
            headers,
            payload,
        })
    }
}
