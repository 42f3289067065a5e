// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use clap::{Parser, Subcommand};

use telem_common::constants::DEFAULT_JOURNAL_PATH;
use telem_journal::{Journal, JournalEntry, JournalFilters};

#[derive(Parser, Debug)]
#[command(name = "telem-cli", version, about = "Telemetry journal viewer and record generator")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print journal entries, optionally filtered by record, event,
    /// classification, or boot id. This is also what runs with no
    /// subcommand given.
    Journal {
        #[arg(short = 'r', long = "record-id")]
        record_id: Option<String>,
        #[arg(short = 'e', long = "event-id")]
        event_id: Option<String>,
        /// Matches an exact classification or a `A/B/*` prefix.
        #[arg(short = 'c', long = "classification")]
        classification: Option<String>,
        #[arg(short = 'b', long = "boot-id")]
        boot_id: Option<String>,
        #[arg(short = 'V', long = "verbose")]
        verbose: bool,
    },
    /// Builds and sends one ad-hoc record, for manually exercising the
    /// pipeline end to end.
    Record {
        #[arg(long)]
        classification: String,
        #[arg(long, default_value_t = 1)]
        severity: i32,
        #[arg(long = "payload-format-version", default_value = "1")]
        payload_format_version: String,
        #[arg(long)]
        payload: String,
        #[arg(long = "event-id")]
        event_id: Option<String>,
    },
}

fn main() -> std::process::ExitCode {
    let args = Args::parse();
    telem_common::logging::init_logging();
    match args.command.unwrap_or(Command::Journal {
        record_id: None,
        event_id: None,
        classification: None,
        boot_id: None,
        verbose: false,
    }) {
        Command::Journal {
            record_id,
            event_id,
            classification,
            boot_id,
            verbose,
        } => {
            let filters = JournalFilters { record_id, event_id, classification, boot_id };
            run_journal(Path::new(DEFAULT_JOURNAL_PATH), &filters, verbose)
        }
        Command::Record {
            classification,
            severity,
            payload_format_version,
            payload,
            event_id,
        } => run_record(classification, severity, payload_format_version, payload, event_id),
    }
}

fn run_journal(journal_path: &Path, filters: &JournalFilters, verbose: bool) -> std::process::ExitCode {
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
        println!("{}", format_entry(entry, verbose));
    }

    std::process::ExitCode::SUCCESS
}

fn format_entry(entry: &JournalEntry, verbose: bool) -> String {
    if verbose {
        format!(
            "record_id={} timestamp={} classification={} event_id={} boot_id={}",
            entry.record_id, entry.timestamp, entry.classification, entry.event_id, entry.boot_id
        )
    } else {
        format!("{} {} {}", entry.timestamp, entry.classification, entry.record_id)
    }
}

fn build_record(
    classification: &str,
    severity: i32,
    payload_format_version: &str,
    payload: &str,
    event_id: Option<&str>,
) -> telem_common::Result<telem_client::Record> {
    let mut record = telem_client::create_record(classification, severity, payload_format_version)?;
    record.set_payload(payload.as_bytes())?;
    if let Some(event_id) = event_id {
        record.set_event_id(event_id)?;
    }
    Ok(record)
}

fn run_record(
    classification: String,
    severity: i32,
    payload_format_version: String,
    payload: String,
    event_id: Option<String>,
) -> std::process::ExitCode {
    let record = match build_record(
        &classification,
        severity,
        &payload_format_version,
        &payload,
        event_id.as_deref(),
    ) {
        Ok(record) => record,
        Err(err) => {
            eprintln!("could not build record: {err}");
            return std::process::ExitCode::FAILURE;
        }
    };

    tracing::debug!(classification = %classification, "sending ad-hoc record");
    match telem_client::send_strict(record) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(telem_common::TelemetryError::Refused(_)) => {
            eprintln!("telemetry is opted out; run `telemctl opt-in` to enable it");
            std::process::ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("could not send record: {err}");
            std::process::ExitCode::FAILURE
        }
    }
}
