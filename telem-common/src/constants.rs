// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// How long a daemon can sit idle (empty spool / no inotify wake) before
/// exiting, if recycling is enabled. A supervisor is expected to restart it.
pub const DAEMON_EXIT_TIME: Duration = Duration::from_secs(2 * 60 * 60);

/// After an HTTPS delivery failure, how long the post daemon keeps staging
/// records directly instead of attempting delivery.
pub const NETWORK_BYPASS_DURATION: Duration = DAEMON_EXIT_TIME;

/// Number of per-minute slots in each rate-limit window array.
pub const RATE_LIMIT_SLOTS: usize = 60;

/// Journal prune hysteresis: prune only fires once record_count exceeds
/// record_count_limit + DEVIATION, and leaves record_count_limit entries.
pub const JOURNAL_DEVIATION: usize = 50;
pub const JOURNAL_RECORD_LIMIT: usize = 100;

/// Four-byte ASCII sentinel marking an optional per-record config override
/// path as the first line of a staged file. Chosen fixed-width so readers
/// never need to guess host endianness.
pub const CFG_PREFIX_SENTINEL: &[u8; 4] = b"TCFG";

/// Field separator used between journal entry columns (U+001E).
pub const JOURNAL_FIELD_SEP: char = '\u{1E}';

/// Maximum number of consecutive post-daemon delivery failures before the
/// retry loop gives up and resumes regular polling.
pub const MAX_RETRY_ATTEMPTS: u32 = 8;

pub const MAX_PAYLOAD_BYTES: usize = 8192;
pub const MAX_CLASSIFICATION_BYTES: usize = 122;
pub const MAX_CLASSIFICATION_SEGMENT_BYTES: usize = 40;
pub const EVENT_ID_LEN: usize = 32;
pub const MACHINE_ID_LEN: usize = 32;
pub const RECORD_ID_LEN: usize = 32;

pub const MIN_SEVERITY: u8 = 1;
pub const MAX_SEVERITY: u8 = 4;

pub const DEFAULT_SOCKET_PATH: &str = "/run/telem-0";
pub const DEFAULT_JOURNAL_PATH: &str = "/var/log/telemetry/journal";
pub const DEFAULT_RETENTION_DIR: &str = "/var/log/telemetry/records";
pub const OPT_OUT_MARKER_PATH: &str = "/etc/telemetrics/opt-out";

/// Presence of this file lifts the oops parser's register/address redaction.
pub const PRIVACY_FILTERS_OVERRIDE_PATH: &str = "/etc/telemetrics/privacy-filters-override";

/// Placeholder machine_id emitted by the client library; rewritten by the
/// ingest daemon before the record is staged.
pub const MACHINE_ID_PLACEHOLDER: &str = "ffffffffffffffffffffffffffffffff";
