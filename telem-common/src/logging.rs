// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

use tracing_subscriber::EnvFilter;

/// Initializes a `tracing` subscriber reading filter directives from
/// `RUST_LOG`, defaulting to `info`. Every binary in this workspace calls
/// this once at startup before doing anything else.
pub fn init_logging() {
    init_logging_with_verbosity(0);
}

/// Like `init_logging`, but `-v` flags (counted on the CLI) raise the
/// default floor one level per occurrence when `RUST_LOG` is unset.
/// `RUST_LOG`, when present, always wins.
pub fn init_logging_with_verbosity(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Forces `LC_ALL=C` so downstream parsing (of `/proc`, `/sys`, kernel log
/// text) doesn't depend on locale.
///
/// # Safety
/// Must be called before any other thread is spawned; this workspace's
/// daemons are single-threaded and call it first thing in `main`.
pub fn force_c_locale() {
    // SAFETY: called once, at startup, before any other thread exists.
    unsafe {
        std::env::set_var("LC_ALL", "C");
    }
}
