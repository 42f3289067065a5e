// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

mod handler;
mod machine_id;
mod spool;

use std::collections::HashMap;
use std::io::Read;
use std::os::fd::{AsFd, AsRawFd, RawFd};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use clap::Parser;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::signal::{SigSet, Signal};
use nix::sys::signalfd::{SfdFlags, SignalFd};

use telem_common::constants::DAEMON_EXIT_TIME;
use telem_config::Config;
use telem_ratelimit::RateLimiter;
use telem_wire::Frame;

#[derive(Parser, Debug)]
#[command(name = "telem-ingestd", version, about = "Telemetry ingest daemon")]
struct Args {
    #[arg(short = 'f', long = "config", default_value = "/etc/telemetrics/telemetrics.conf")]
    config: PathBuf,

    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

const MACHINE_ID_STATE_PATH: &str = "/var/lib/telemetrics/machine-id";
const MACHINE_ID_OVERRIDE_PATH: &str = "/etc/telemetrics/machine-id-override";
const MAX_POLL_WAIT: Duration = Duration::from_secs(60);

struct ClientConn {
    stream: UnixStream,
    buf: Vec<u8>,
}

fn main() -> std::process::ExitCode {
    let args = Args::parse();
    telem_common::logging::init_logging_with_verbosity(args.verbose);
    telem_common::logging::force_c_locale();

    match run(args) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "ingest daemon exiting");
            std::process::ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> telem_common::Result<()> {
    let mut config = Config::load(&args.config).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "falling back to default config");
        Config::default()
    });

    spool::validate_spool_dir(&config.spool_dir)?;

    let mut machine_id = machine_id::MachineId::load(
        &PathBuf::from(MACHINE_ID_STATE_PATH),
        Some(&PathBuf::from(MACHINE_ID_OVERRIDE_PATH)).filter(|p| p.exists()),
    )?;

    let mut limiter = RateLimiter::new(
        config.rate_limit_enabled,
        config.record_burst_limit,
        config.record_window_length,
        config.byte_burst_limit,
        config.byte_window_length,
    );

    let _ = std::fs::remove_file(&config.socket_path);
    let listener = UnixListener::bind(&config.socket_path)?;
    listener.set_nonblocking(true)?;
    set_socket_mode(&config.socket_path)?;

    let mut signal_mask = SigSet::empty();
    for signal in [Signal::SIGINT, Signal::SIGTERM, Signal::SIGHUP, Signal::SIGPIPE] {
        signal_mask.add(signal);
    }
    signal_mask
        .thread_block()
        .map_err(|e| telem_common::TelemetryError::Fatal(format!("blocking signals: {e}")))?;
    let mut signal_fd = SignalFd::with_flags(&signal_mask, SfdFlags::SFD_NONBLOCK)
        .map_err(|e| telem_common::TelemetryError::Fatal(format!("signalfd: {e}")))?;

    let mut clients: HashMap<RawFd, ClientConn> = HashMap::new();
    let mut last_maintenance = Instant::now();
    let mut last_activity = Instant::now();

    tracing::info!(socket = %config.socket_path.display(), "ingest daemon listening");

    loop {
        let mut fds: Vec<PollFd> = Vec::with_capacity(clients.len() + 2);
        fds.push(PollFd::new(listener.as_fd(), PollFlags::POLLIN));
        fds.push(PollFd::new(signal_fd.as_fd(), PollFlags::POLLIN));
        let client_fds: Vec<RawFd> = clients.keys().copied().collect();
        for fd in &client_fds {
            let conn = &clients[fd];
            fds.push(PollFd::new(conn.stream.as_fd(), PollFlags::POLLIN));
        }

        let timeout = PollTimeout::try_from(MAX_POLL_WAIT.as_millis().min(u16::MAX as u128) as u16)
            .unwrap_or(PollTimeout::NONE);
        let ready = poll(&mut fds, timeout)
            .map_err(|e| telem_common::TelemetryError::Fatal(format!("poll: {e}")))?;

        // Snapshot readiness into owned bools before touching `listener`,
        // `signal_fd`, or `clients` mutably: `fds` holds borrows of all
        // three and must stop being read before those borrows can be used.
        let signal_ready = is_readable(&fds[1]);
        let listener_ready = is_readable(&fds[0]);
        let client_ready: Vec<(RawFd, bool)> = client_fds
            .iter()
            .enumerate()
            .map(|(i, fd)| (*fd, is_readable(&fds[i + 2])))
            .collect();
        drop(fds);

        if ready > 0 {
            if signal_ready {
                if handle_signals(&mut signal_fd)? {
                    tracing::info!("ingest daemon exiting on signal");
                    return Ok(());
                }
                config = reload_config(&args.config, config);
                spool::validate_spool_dir(&config.spool_dir)?;
            }

            if listener_ready {
                accept_clients(&listener, &mut clients);
                last_activity = Instant::now();
            }

            for (fd, ready) in client_ready {
                if ready
                    && service_client(fd, &mut clients, &config, &machine_id, &mut limiter)
                {
                    last_activity = Instant::now();
                }
            }
        }

        if last_maintenance.elapsed() >= Duration::from_secs(config.spool_process_time_secs) {
            last_maintenance = Instant::now();
            if let Err(err) = spool::validate_spool_dir(&config.spool_dir) {
                tracing::error!(error = %err, "spool directory became unusable");
            }
            if let Err(err) = machine_id.refresh_if_stale() {
                tracing::warn!(error = %err, "failed to refresh machine_id");
            }
        }

        if config.daemon_recycling_enabled
            && clients.is_empty()
            && last_activity.elapsed() >= DAEMON_EXIT_TIME
        {
            tracing::info!("ingest daemon exiting after idle period");
            return Ok(());
        }
    }
}

fn reload_config(path: &std::path::Path, previous: Config) -> Config {
    match Config::load(path) {
        Ok(config) => {
            tracing::info!("reloaded configuration on SIGHUP");
            config
        }
        Err(err) => {
            tracing::warn!(error = %err, "SIGHUP config reload failed, keeping previous config");
            previous
        }
    }
}

fn is_readable(fd: &PollFd) -> bool {
    fd.revents().is_some_and(|r| r.contains(PollFlags::POLLIN))
}

/// Drains every pending signal; returns true if a terminating signal
/// (SIGINT/SIGTERM) was among them.
fn handle_signals(signal_fd: &mut SignalFd) -> telem_common::Result<bool> {
    let mut terminate = false;
    loop {
        match signal_fd.read_signal() {
            Ok(Some(info)) => match Signal::try_from(info.ssi_signo as i32) {
                Ok(Signal::SIGINT) | Ok(Signal::SIGTERM) => terminate = true,
                _ => continue,
            },
            Ok(None) => return Ok(terminate),
            Err(nix::errno::Errno::EAGAIN) => return Ok(terminate),
            Err(e) => {
                return Err(telem_common::TelemetryError::Fatal(format!(
                    "reading signalfd: {e}"
                )))
            }
        }
    }
}

fn accept_clients(listener: &UnixListener, clients: &mut HashMap<RawFd, ClientConn>) {
    loop {
        match listener.accept() {
            Ok((stream, _addr)) => {
                let _ = stream.set_nonblocking(true);
                let _ = stream.set_read_timeout(Some(Duration::from_secs(10)));
                let fd = stream.as_raw_fd();
                clients.insert(fd, ClientConn { stream, buf: Vec::new() });
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
                break;
            }
        }
    }
}

/// Reads whatever is currently available from one client, and if a full
/// frame has arrived, processes and stages it, then drops the connection
/// (the protocol is one frame per connection). Returns true if any bytes
/// were read.
fn service_client(
    fd: RawFd,
    clients: &mut HashMap<RawFd, ClientConn>,
    config: &Config,
    machine_id: &machine_id::MachineId,
    limiter: &mut RateLimiter,
) -> bool {
    let mut read_any = false;
    let mut chunk = [0u8; 4096];
    let drop_connection;

    {
        let conn = clients.get_mut(&fd).expect("serviced fd must be tracked");
        loop {
            match conn.stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    conn.buf.extend_from_slice(&chunk[..n]);
                    read_any = true;
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(_) => break,
            }
        }

        drop_connection = match frame_completeness(&conn.buf) {
            FrameState::Incomplete => false,
            FrameState::Complete(needed) => {
                match Frame::read_from(&conn.buf[..needed]) {
                    Ok(frame) => stage_frame(frame, config, machine_id, limiter),
                    Err(err) => tracing::warn!(
                        reason = handler::reject_reason(&err),
                        error = %err,
                        "rejected frame"
                    ),
                }
                true
            }
            FrameState::Malformed => true,
        };
    }

    if drop_connection {
        clients.remove(&fd);
    }
    read_any
}

enum FrameState {
    Incomplete,
    Complete(usize),
    Malformed,
}

/// Peeks at the 8-byte size prefix to decide whether `buf` already holds a
/// whole frame, without consuming anything, so a partially-arrived frame is
/// never mistaken for a corrupt one.
fn frame_completeness(buf: &[u8]) -> FrameState {
    if buf.len() < 8 {
        return FrameState::Incomplete;
    }
    let total_size = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let header_block_size = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
    if header_block_size as u64 > total_size as u64 {
        return FrameState::Malformed;
    }
    let needed = 8usize.saturating_add(total_size as usize);
    if buf.len() < needed {
        FrameState::Incomplete
    } else {
        FrameState::Complete(needed)
    }
}

fn stage_frame(
    frame: Frame,
    config: &Config,
    machine_id: &machine_id::MachineId,
    limiter: &mut RateLimiter,
) {
    let current_minute = current_minute_of_hour();
    match handler::handle_client_frame(
        frame,
        machine_id.current(),
        limiter,
        current_minute,
        config.rate_limit_strategy,
    ) {
        Ok(handler::Disposition::Staged(record)) => {
            match spool::write_staged(&config.spool_dir, &record, config.spool_max_size_kib) {
                Ok(path) => tracing::debug!(path = %path.display(), "staged record"),
                Err(err) => tracing::warn!(error = %err, "failed to stage record"),
            }
        }
        Ok(handler::Disposition::RateLimited) => {
            tracing::info!("record dropped by rate limiter");
        }
        Err(err) => {
            tracing::warn!(reason = handler::reject_reason(&err), error = %err, "rejected frame");
        }
    }
}

fn current_minute_of_hour() -> usize {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    ((secs / 60) % 60) as usize
}

#[cfg(unix)]
fn set_socket_mode(path: &std::path::Path) -> telem_common::Result<()> {
    use std::fs::Permissions;
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, Permissions::from_mode(0o666))?;
    Ok(())
}
