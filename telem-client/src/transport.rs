// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;
use std::os::fd::{AsFd, AsRawFd, OwnedFd};
use std::os::unix::net::UnixStream;
use std::time::Duration;

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::socket::{connect, getsockopt, socket, sockopt::SocketError, AddressFamily, SockFlag, SockType, UnixAddr};

use telem_common::constants::DEFAULT_SOCKET_PATH;
use telem_common::{Result, TelemetryError};
use telem_wire::Frame;

const CONNECT_RETRY_TIMEOUT: Duration = Duration::from_secs(1);
const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Connects to the ingest daemon's listening socket and writes one framed
/// record. A connection refused (daemon not running, socket backlog full)
/// is reported to the caller as `Refused` so probes can decide for
/// themselves whether to drop the record or buffer it locally.
pub fn send_frame(frame: &Frame) -> Result<()> {
    send_frame_to(DEFAULT_SOCKET_PATH, frame)
}

pub fn send_frame_to(socket_path: &str, frame: &Frame) -> Result<()> {
    let mut stream = connect_with_timeout(socket_path, CONNECT_RETRY_TIMEOUT)?;
    stream
        .set_write_timeout(Some(WRITE_TIMEOUT))
        .map_err(TelemetryError::IoError)?;

    let encoded = frame.encode();
    stream
        .write_all(&encoded)
        .map_err(|e| TelemetryError::Timeout(format!("writing frame to {socket_path}: {e}")))?;
    Ok(())
}

/// Connects to `socket_path` without risking an unbounded block: the socket
/// is opened non-blocking, and a stalled connect (listener backlog full) is
/// bounded by polling for write-readiness up to `timeout` rather than
/// leaning on `std`'s blocking `connect(2)`, the way the daemons already
/// drive their own sockets through `nix::poll`.
fn connect_with_timeout(socket_path: &str, timeout: Duration) -> Result<UnixStream> {
    let addr = UnixAddr::new(socket_path)
        .map_err(|e| TelemetryError::Refused(format!("invalid socket path {socket_path}: {e}")))?;
    let fd = socket(AddressFamily::Unix, SockType::Stream, SockFlag::SOCK_NONBLOCK, None)
        .map_err(|e| TelemetryError::IoError(std::io::Error::from(e)))?;

    match connect(fd.as_raw_fd(), &addr) {
        Ok(()) => {}
        Err(Errno::EINPROGRESS) => wait_for_connect(&fd, socket_path, timeout)?,
        Err(e) if matches!(e, Errno::ECONNREFUSED | Errno::ENOENT) => {
            tracing::debug!(socket = %socket_path, error = %e, "ingest daemon not reachable");
            return Err(TelemetryError::Refused(format!("connecting to {socket_path}: {e}")));
        }
        Err(e) => return Err(TelemetryError::IoError(std::io::Error::from(e))),
    }

    let stream = UnixStream::from(fd);
    stream.set_nonblocking(false).map_err(TelemetryError::IoError)?;
    Ok(stream)
}

/// Waits for a non-blocking connect to finish, bounded by `timeout`, then
/// reads `SO_ERROR` to learn whether it actually succeeded.
fn wait_for_connect(fd: &OwnedFd, socket_path: &str, timeout: Duration) -> Result<()> {
    let mut fds = [PollFd::new(fd.as_fd(), PollFlags::POLLOUT)];
    let timeout_ms = timeout.as_millis().min(u16::MAX as u128) as u16;
    let poll_timeout = PollTimeout::try_from(timeout_ms).unwrap_or(PollTimeout::NONE);
    let ready =
        poll(&mut fds, poll_timeout).map_err(|e| TelemetryError::IoError(std::io::Error::from(e)))?;
    if ready == 0 {
        tracing::warn!(socket = %socket_path, ?timeout, "connect timed out waiting for listener");
        return Err(TelemetryError::Timeout(format!(
            "connecting to {socket_path} timed out after {timeout:?}"
        )));
    }

    match getsockopt(fd, SocketError) {
        Ok(0) => Ok(()),
        Ok(errno) => Err(TelemetryError::Refused(format!(
            "connecting to {socket_path}: {}",
            Errno::from_raw(errno)
        ))),
        Err(e) => Err(TelemetryError::IoError(std::io::Error::from(e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> Frame {
        let headers = telem_wire::headers::RecordHeaders {
            record_format_version: "4".into(),
            classification: "org.test/probe/sub".into(),
            severity: "1".into(),
            machine_id: "ffffffffffffffffffffffffffffffff".into(),
            creation_timestamp: "1000".into(),
            arch: "x86_64".into(),
            host_type: "unknown|unknown|unknown".into(),
            build: "unknown".into(),
            kernel_version: "6.1.0".into(),
            system_name: "unknown".into(),
            board_name: "unknown|unknown".into(),
            cpu_model: "unknown".into(),
            bios_version: "unknown".into(),
            payload_format_version: "1".into(),
            event_id: "0123456789abcdef0123456789abcdef".into(),
        };
        Frame { headers, payload: b"hi".to_vec() }
    }

    #[test]
    fn missing_socket_reports_refused() {
        let result = send_frame_to("/nonexistent/telem-test-socket", &sample_frame());
        assert!(matches!(result, Err(TelemetryError::Refused(_))));
    }

    #[test]
    fn connect_to_non_listening_path_does_not_hang() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-a-socket");
        std::fs::write(&path, b"").unwrap();
        let result = send_frame_to(path.to_str().unwrap(), &sample_frame());
        assert!(result.is_err());
    }
}
