// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;
use std::process::Command;

use clap::{Parser, Subcommand};

use telem_common::constants::{DEFAULT_JOURNAL_PATH, OPT_OUT_MARKER_PATH};
use telem_journal::{Journal, JournalFilters};

const SERVICES: [&str; 2] = ["telem-ingestd.service", "telem-postd.service"];

#[derive(Parser, Debug)]
#[command(name = "telemctl", version, about = "Telemetry lifecycle control")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Starts the ingest and post daemons.
    Start,
    /// Stops the ingest and post daemons.
    Stop,
    /// Stops then starts both daemons.
    Restart,
    /// Reports whether both daemons are running.
    IsActive,
    /// Removes the opt-out marker and starts the daemons.
    OptIn,
    /// Creates the opt-out marker and stops the daemons.
    OptOut,
    /// Prints journal entries, optionally filtered.
    Journal {
        #[arg(short = 'r', long = "record-id")]
        record_id: Option<String>,
        #[arg(short = 'e', long = "event-id")]
        event_id: Option<String>,
        #[arg(short = 'c', long = "classification")]
        classification: Option<String>,
        #[arg(short = 'b', long = "boot-id")]
        boot_id: Option<String>,
        #[arg(short = 'V', long = "verbose")]
        verbose: bool,
    },
}

fn main() -> std::process::ExitCode {
    let args = Args::parse();
    telem_common::logging::init_logging();

    match args.command {
        Command::Start => systemctl_each("start"),
        Command::Stop => systemctl_each("stop"),
        Command::Restart => {
            let stop_ok = systemctl_all_ok("stop");
            let start_ok = systemctl_all_ok("start");
            if stop_ok && start_ok {
                std::process::ExitCode::SUCCESS
            } else {
                std::process::ExitCode::FAILURE
            }
        }
        Command::IsActive => is_active(),
        Command::OptIn => opt_in(),
        Command::OptOut => opt_out(),
        Command::Journal {
            record_id,
            event_id,
            classification,
            boot_id,
            verbose,
        } => {
            let filters = JournalFilters { record_id, event_id, classification, boot_id };
            print_journal(Path::new(DEFAULT_JOURNAL_PATH), &filters, verbose)
        }
    }
}

fn systemctl_each(action: &str) -> std::process::ExitCode {
    if systemctl_all_ok(action) {
        std::process::ExitCode::SUCCESS
    } else {
        std::process::ExitCode::FAILURE
    }
}

fn systemctl_all_ok(action: &str) -> bool {
    let mut ok = true;
    for service in SERVICES {
        match Command::new("systemctl").arg(action).arg(service).status() {
            Ok(status) if status.success() => {}
            Ok(status) => {
                eprintln!("systemctl {action} {service} exited with {status}");
                ok = false;
            }
            Err(err) => {
                eprintln!("could not run systemctl {action} {service}: {err}");
                ok = false;
            }
        }
    }
    ok
}

fn is_active() -> std::process::ExitCode {
    let mut all_active = true;
    for service in SERVICES {
        let active = Command::new("systemctl")
            .arg("is-active")
            .arg("--quiet")
            .arg(service)
            .status()
            .map(|s| s.success())
            .unwrap_or(false);
        println!("{service}: {}", if active { "active" } else { "inactive" });
        all_active &= active;
    }
    if all_active {
        std::process::ExitCode::SUCCESS
    } else {
        std::process::ExitCode::FAILURE
    }
}

fn set_opt_out_marker(marker: &Path) -> std::io::Result<()> {
    if let Some(parent) = marker.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(marker, b"")
}

fn clear_opt_out_marker(marker: &Path) -> std::io::Result<()> {
    if marker.exists() {
        std::fs::remove_file(marker)?;
    }
    Ok(())
}

fn opt_out() -> std::process::ExitCode {
    if let Err(err) = set_opt_out_marker(Path::new(OPT_OUT_MARKER_PATH)) {
        eprintln!("could not create {OPT_OUT_MARKER_PATH}: {err}");
        return std::process::ExitCode::FAILURE;
    }
    tracing::info!("telemetry opted out");
    systemctl_each("stop")
}

fn opt_in() -> std::process::ExitCode {
    if let Err(err) = clear_opt_out_marker(Path::new(OPT_OUT_MARKER_PATH)) {
        eprintln!("could not remove {OPT_OUT_MARKER_PATH}: {err}");
        return std::process::ExitCode::FAILURE;
    }
    tracing::info!("telemetry opted in");
    systemctl_each("start")
}

fn print_journal(journal_path: &Path, filters: &JournalFilters, verbose: bool) -> std::process::ExitCode {
    let journal = match Journal::open(journal_path) {
        Ok(j) => j,
        Err(err) => {
            eprintln!("cannot open journal: {err}");
            return std::process::ExitCode::FAILURE;
        }
    };

    let entries = match journal.print(filters) {
        Ok(entries) => entries,
        Err(err) => {
            eprintln!("cannot read journal: {err}");
            return std::process::ExitCode::FAILURE;
        }
    };

    for entry in &entries {
        if verbose {
            println!(
                "record_id={} timestamp={} classification={} event_id={} boot_id={}",
                entry.record_id, entry.timestamp, entry.classification, entry.event_id, entry.boot_id
            );
        } else {
            println!("{} {} {}", entry.timestamp, entry.classification, entry.record_id);
        }
    }

    std::process::ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn marker_round_trips_through_set_and_clear() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("opt-out");
        assert!(!marker.exists());
        set_opt_out_marker(&marker).unwrap();
        assert!(marker.exists());
        clear_opt_out_marker(&marker).unwrap();
        assert!(!marker.exists());
    }

    #[test]
    fn clearing_absent_marker_is_not_an_error() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("opt-out");
        assert!(clear_opt_out_marker(&marker).is_ok());
    }

    #[test]
    fn set_marker_creates_missing_parent_directories() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("etc").join("telemetrics").join("opt-out");
        set_opt_out_marker(&marker).unwrap();
        assert!(marker.exists());
    }

    #[test]
    fn missing_journal_directory_is_reported_as_failure() {
        let dir = tempdir().unwrap();
        let bogus = dir.path().join("missing-dir").join("journal");
        let code = print_journal(&bogus, &JournalFilters::default(), false);
        assert_eq!(format!("{code:?}"), format!("{:?}", std::process::ExitCode::FAILURE));
    }
}
