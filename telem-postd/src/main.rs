// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

mod backoff;
mod deliverer;
mod processor;

use std::os::fd::AsFd;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use clap::Parser;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::inotify::{AddWatchFlags, InitFlags, Inotify};
use nix::sys::signal::{SigSet, Signal};
use nix::sys::signalfd::{SfdFlags, SignalFd};

use telem_common::constants::DAEMON_EXIT_TIME;
use telem_config::Config;
use telem_journal::Journal;
use telem_ratelimit::RateLimiter;
use telem_wire::StagedRecord;

use deliverer::{Deliverer, HttpDeliverer};
use processor::{process_staged_record, Metadata, Outcome};

#[derive(Parser, Debug)]
#[command(name = "telem-postd", version, about = "Telemetry post daemon")]
struct Args {
    #[arg(short = 'f', long = "config", default_value = "/etc/telemetrics/telemetrics.conf")]
    config: PathBuf,

    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

const DEFAULT_JOURNAL_TMP_DIR: &str = "/var/log/telemetry";

fn main() -> std::process::ExitCode {
    let args = Args::parse();
    telem_common::logging::init_logging_with_verbosity(args.verbose);
    telem_common::logging::force_c_locale();

    match run(args) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "post daemon exiting");
            std::process::ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> telem_common::Result<()> {
    let mut config = Config::load(&args.config).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "falling back to default config");
        Config::default()
    });

    let mut deliverer: Box<dyn Deliverer> = Box::new(HttpDeliverer::new(&config)?);
    let journal = Journal::open(&PathBuf::from(telem_common::constants::DEFAULT_JOURNAL_PATH))?;
    let mut limiter = RateLimiter::new(
        config.rate_limit_enabled,
        config.record_burst_limit,
        config.record_window_length,
        config.byte_burst_limit,
        config.byte_window_length,
    );

    let mut signal_mask = SigSet::empty();
    for signal in [Signal::SIGINT, Signal::SIGTERM, Signal::SIGHUP, Signal::SIGPIPE] {
        signal_mask.add(signal);
    }
    signal_mask
        .thread_block()
        .map_err(|e| telem_common::TelemetryError::Fatal(format!("blocking signals: {e}")))?;
    let mut signal_fd = SignalFd::with_flags(&signal_mask, SfdFlags::SFD_NONBLOCK)
        .map_err(|e| telem_common::TelemetryError::Fatal(format!("signalfd: {e}")))?;

    let mut inotify = Inotify::init(InitFlags::IN_NONBLOCK)
        .map_err(|e| telem_common::TelemetryError::Fatal(format!("inotify init: {e}")))?;
    inotify
        .add_watch(&config.spool_dir, AddWatchFlags::IN_CLOSE_WRITE)
        .map_err(|e| telem_common::TelemetryError::Fatal(format!("inotify watch: {e}")))?;

    let mut retry_attempt: u32 = 0;
    let mut last_failure: Option<SystemTime> = None;
    let mut last_activity = Instant::now();

    tracing::info!(spool = %config.spool_dir.display(), "post daemon watching spool");

    // Drain whatever already sits in the spool before waiting on inotify.
    let had_work = drain_spool(
        &config,
        &journal,
        deliverer.as_ref(),
        &mut limiter,
        &mut last_failure,
    );
    if had_work {
        retry_attempt = 0;
        last_activity = Instant::now();
    }

    loop {
        let cadence = backoff::retry_poll_secs(retry_attempt, config.spool_process_time_secs);
        let timeout_ms = Duration::from_secs(cadence).as_millis().min(u16::MAX as u128) as u16;
        let timeout = PollTimeout::try_from(timeout_ms).unwrap_or(PollTimeout::NONE);

        let mut fds = [
            PollFd::new(inotify.as_fd(), PollFlags::POLLIN),
            PollFd::new(signal_fd.as_fd(), PollFlags::POLLIN),
        ];
        let ready = poll(&mut fds, timeout)
            .map_err(|e| telem_common::TelemetryError::Fatal(format!("poll: {e}")))?;

        let inotify_ready = fds[0].revents().is_some_and(|r| r.contains(PollFlags::POLLIN));
        let signal_ready = fds[1].revents().is_some_and(|r| r.contains(PollFlags::POLLIN));

        if ready > 0 && signal_ready {
            if drain_signals(&mut signal_fd)? {
                tracing::info!("post daemon exiting on signal");
                return Ok(());
            }
            config = reload_config(&args.config, config);
            deliverer = match HttpDeliverer::new(&config) {
                Ok(d) => Box::new(d),
                Err(err) => {
                    tracing::warn!(error = %err, "failed to rebuild HTTPS client after reload");
                    deliverer
                }
            };
        }

        if ready > 0 && inotify_ready {
            let _ = inotify.read_events();
        }

        let had_work = drain_spool(
            &config,
            &journal,
            deliverer.as_ref(),
            &mut limiter,
            &mut last_failure,
        );

        if let Err(err) = journal.prune(
            Path::new(DEFAULT_JOURNAL_TMP_DIR),
            telem_common::constants::JOURNAL_RECORD_LIMIT,
            telem_common::constants::JOURNAL_DEVIATION,
            |entry| {
                let retained = Path::new(telem_common::constants::DEFAULT_RETENTION_DIR)
                    .join(&entry.record_id);
                let _ = std::fs::remove_file(retained);
            },
        ) {
            tracing::warn!(error = %err, "journal prune failed");
        }

        if had_work {
            if last_failure.is_some() {
                retry_attempt = (retry_attempt + 1).min(telem_common::constants::MAX_RETRY_ATTEMPTS + 1);
            } else {
                retry_attempt = 0;
            }
            last_activity = Instant::now();
        } else if backoff::retries_exhausted(retry_attempt) {
            retry_attempt = 0;
        }

        if config.daemon_recycling_enabled && last_activity.elapsed() >= DAEMON_EXIT_TIME {
            tracing::info!("post daemon exiting after idle period");
            return Ok(());
        }
    }
}

fn reload_config(path: &Path, previous: Config) -> Config {
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

fn drain_signals(signal_fd: &mut SignalFd) -> telem_common::Result<bool> {
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

/// Processes every closed-for-write file currently in the spool, oldest
/// first. Returns true if at least one file was present.
fn drain_spool(
    config: &Config,
    journal: &Journal,
    deliverer: &dyn Deliverer,
    limiter: &mut RateLimiter,
    last_failure: &mut Option<SystemTime>,
) -> bool {
    let mut entries: Vec<(PathBuf, std::fs::Metadata)> = match std::fs::read_dir(&config.spool_dir)
    {
        Ok(dir) => dir
            .filter_map(|e| e.ok())
            .filter_map(|e| e.metadata().ok().map(|m| (e.path(), m)))
            .filter(|(_, m)| m.is_file())
            .collect(),
        Err(err) => {
            tracing::error!(error = %err, "cannot read spool directory");
            return false;
        }
    };
    entries.sort_by_key(|(_, m)| m.modified().ok());

    let had_work = !entries.is_empty();
    for (path, metadata) in entries {
        process_one_file(&path, &metadata, config, journal, deliverer, limiter, last_failure);
    }
    had_work
}

fn process_one_file(
    path: &Path,
    metadata: &std::fs::Metadata,
    config: &Config,
    journal: &Journal,
    deliverer: &dyn Deliverer,
    limiter: &mut RateLimiter,
    last_failure: &mut Option<SystemTime>,
) {
    let record = match StagedRecord::read_from_path(path) {
        Ok(r) => r,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "removing malformed staged file");
            let _ = std::fs::remove_file(path);
            return;
        }
    };

    let override_deliverer: Option<HttpDeliverer> = match &record.override_config_path {
        Some(override_path) => match Config::load(Path::new(override_path))
            .and_then(|cfg| HttpDeliverer::new(&cfg))
        {
            Ok(d) => Some(d),
            Err(err) => {
                tracing::warn!(error = %err, "override config failed, treating record as delivered");
                let _ = std::fs::remove_file(path);
                return;
            }
        },
        None => None,
    };
    let active_deliverer: &dyn Deliverer = override_deliverer
        .as_ref()
        .map(|d| d as &dyn Deliverer)
        .unwrap_or(deliverer);

    let age = SystemTime::now()
        .duration_since(metadata.modified().unwrap_or(SystemTime::now()))
        .unwrap_or(Duration::ZERO);
    let owned_by_us = file_owned_by_current_user(metadata);

    let meta = Metadata { age, owned_by_us };
    let current_minute = current_minute_of_hour();

    let outcome = process_staged_record(
        &record,
        &meta,
        Duration::from_secs(config.record_expiry_minutes.max(0) as u64 * 60),
        config.record_server_delivery_enabled,
        config.record_retention_enabled,
        *last_failure,
        limiter,
        current_minute,
        config.rate_limit_strategy,
        active_deliverer,
        journal,
    );

    match &outcome {
        Outcome::Delivered => *last_failure = None,
        Outcome::KeptForRetry => *last_failure = Some(SystemTime::now()),
        _ => {}
    }

    if outcome.removes_file() {
        let _ = std::fs::remove_file(path);
    }
}

#[cfg(unix)]
fn file_owned_by_current_user(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    metadata.uid() == nix::unistd::getuid().as_raw()
}

fn current_minute_of_hour() -> usize {
    let secs = SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    ((secs / 60) % 60) as usize
}
