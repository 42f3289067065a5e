// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

use std::io::{Read, Write};

use telem_common::{Result, TelemetryError};

use crate::headers::RecordHeaders;

/// A single framed record as it travels over the stream socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub headers: RecordHeaders,
    pub payload: Vec<u8>,
}

const U32_LEN: usize = 4;

impl Frame {
    /// Encodes this frame as `u32 total_size | u32 header_block_size |
    /// header block | payload`, little-endian.
    pub fn encode(&self) -> Vec<u8> {
        let header_block = self.headers.to_header_block();
        let header_bytes = header_block.as_bytes();
        let total_size = (header_bytes.len() + self.payload.len()) as u32;
        let header_block_size = header_bytes.len() as u32;

        let mut out = Vec::with_capacity(U32_LEN * 2 + total_size as usize);
        out.extend_from_slice(&total_size.to_le_bytes());
        out.extend_from_slice(&header_block_size.to_le_bytes());
        out.extend_from_slice(header_bytes);
        out.extend_from_slice(&self.payload);
        out
    }

    /// Writes the frame to `w`.
    pub fn write_to<W: Write>(&self, mut w: W) -> Result<()> {
        w.write_all(&self.encode())?;
        Ok(())
    }

    /// Reads one complete frame from `r`. Any short read, framing
    /// violation, or peer close mid-record surfaces as `Corrupt`/`IoError`
    /// so the caller can drop just this connection.
    pub fn read_from<R: Read>(mut r: R) -> Result<Frame> {
        let mut size_buf = [0u8; U32_LEN * 2];
        r.read_exact(&mut size_buf)
            .map_err(|_| TelemetryError::corrupt("peer closed before sending frame header"))?;

        let total_size = u32::from_le_bytes([size_buf[0], size_buf[1], size_buf[2], size_buf[3]]);
        let header_block_size =
            u32::from_le_bytes([size_buf[4], size_buf[5], size_buf[6], size_buf[7]]);

        if header_block_size as u64 > total_size as u64 {
            return Err(TelemetryError::corrupt(
                "header_block_size exceeds total_size",
            ));
        }

        let mut body = vec![0u8; total_size as usize];
        r.read_exact(&mut body)
            .map_err(|_| TelemetryError::corrupt("short read on frame body"))?;

        let (header_bytes, payload) = body.split_at(header_block_size as usize);
        let header_block = std::str::from_utf8(header_bytes)
            .map_err(|_| TelemetryError::corrupt("header block is not valid UTF-8"))?;
        let headers = RecordHeaders::parse_header_block(header_block)?;

        Ok(Frame {
            headers,
            payload: payload.to_vec(),
        })
    }
}
