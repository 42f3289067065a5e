// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

use std::time::{Duration, SystemTime};

use telem_common::constants::NETWORK_BYPASS_DURATION;
use telem_config::RateLimitStrategy;
use telem_journal::Journal;
use telem_ratelimit::RateLimiter;
use telem_wire::StagedRecord;

use crate::deliverer::Deliverer;

/// What happened to one staged file this pass. Callers use this to decide
/// whether to unlink the file.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Delivered,
    Dropped(&'static str),
    KeptForRetry,
    KeptByRateLimit,
    KeptByDirectSpoolWindow,
}

impl Outcome {
    pub fn removes_file(&self) -> bool {
        matches!(self, Outcome::Delivered | Outcome::Dropped(_))
    }
}

pub struct Metadata {
    pub age: Duration,
    pub owned_by_us: bool,
}

/// Decides the fate of one staged record and, if delivery is attempted,
/// performs it. Pure with respect to everything except the `deliverer` and
/// `journal` side effects, so retry/backoff/rate-limit decisions can be
/// tested without touching a filesystem or network.
#[allow(clippy::too_many_arguments)]
pub fn process_staged_record(
    record: &StagedRecord,
    meta: &Metadata,
    record_expiry: Duration,
    record_server_delivery_enabled: bool,
    record_retention_enabled: bool,
    last_failure: Option<SystemTime>,
    limiter: &mut RateLimiter,
    current_minute: usize,
    rate_limit_strategy: RateLimitStrategy,
    deliverer: &dyn Deliverer,
    journal: &Journal,
) -> Outcome {
    if !meta.owned_by_us {
        return Outcome::Dropped("not owned by this process");
    }
    if meta.age > record_expiry {
        return Outcome::Dropped("expired");
    }

    if !record_server_delivery_enabled {
        return finish_delivered(record, journal, record_retention_enabled);
    }

    if let Some(failed_at) = last_failure {
        if SystemTime::now()
            .duration_since(failed_at)
            .unwrap_or(Duration::ZERO)
            < NETWORK_BYPASS_DURATION
        {
            return Outcome::KeptByDirectSpoolWindow;
        }
    }

    let payload_len = record.payload.len() as i64;
    if !limiter.check(current_minute, payload_len) {
        limiter.update(current_minute, payload_len);
        return match rate_limit_strategy {
            RateLimitStrategy::Drop => Outcome::Dropped("rate limited"),
            RateLimitStrategy::Spool => Outcome::KeptByRateLimit,
        };
    }
    limiter.update(current_minute, payload_len);

    match deliverer.deliver(record) {
        Ok(()) => finish_delivered(record, journal, record_retention_enabled),
        Err(err) => {
            tracing::warn!(error = %err, "delivery failed");
            Outcome::KeptForRetry
        }
    }
}

fn finish_delivered(record: &StagedRecord, journal: &Journal, retention_enabled: bool) -> Outcome {
    let timestamp: i64 = record
        .headers
        .creation_timestamp
        .parse()
        .unwrap_or_default();
    match journal.append(&record.headers.classification, timestamp, &record.headers.event_id) {
        Ok(entry) if retention_enabled => {
            if let Err(err) = write_retention_copy(&entry.record_id, &record.payload) {
                tracing::warn!(error = %err, "failed to write retention copy");
            }
        }
        Ok(_) => {}
        Err(err) => tracing::warn!(error = %err, "failed to append journal entry"),
    }
    Outcome::Delivered
}

fn write_retention_copy(record_id: &str, payload: &[u8]) -> telem_common::Result<()> {
    let dir = std::path::Path::new(telem_common::constants::DEFAULT_RETENTION_DIR);
    std::fs::create_dir_all(dir)?;
    std::fs::write(dir.join(record_id), payload)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct AlwaysSucceeds;
    impl Deliverer for AlwaysSucceeds {
        fn deliver(&self, _record: &StagedRecord) -> telem_common::Result<()> {
            Ok(())
        }
    }

    struct AlwaysFails;
    impl Deliverer for AlwaysFails {
        fn deliver(&self, _record: &StagedRecord) -> telem_common::Result<()> {
            Err(telem_common::TelemetryError::BackendError("503".into()))
        }
    }

    fn sample_record() -> StagedRecord {
        StagedRecord {
            override_config_path: None,
            headers: telem_wire::headers::RecordHeaders {
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
            },
            payload: b"hello".to_vec(),
        }
    }

    fn journal_in(dir: &std::path::Path) -> Journal {
        Journal::open_with_boot_id(&dir.join("journal"), "boot-fixture".to_string()).unwrap()
    }

    #[test]
    fn delivers_and_journals_on_success() {
        let dir = tempdir().unwrap();
        let journal = journal_in(dir.path());
        let mut limiter = RateLimiter::new(true, 1000, 15, -1, 20);
        let outcome = process_staged_record(
            &sample_record(),
            &Metadata { age: Duration::from_secs(1), owned_by_us: true },
            Duration::from_secs(3600),
            true,
            false,
            None,
            &mut limiter,
            10,
            RateLimitStrategy::Spool,
            &AlwaysSucceeds,
            &journal,
        );
        assert_eq!(outcome, Outcome::Delivered);
        assert_eq!(journal.record_count().unwrap(), 1);
    }

    #[test]
    fn drops_expired_file_without_delivering() {
        let dir = tempdir().unwrap();
        let journal = journal_in(dir.path());
        let mut limiter = RateLimiter::new(true, 1000, 15, -1, 20);
        let outcome = process_staged_record(
            &sample_record(),
            &Metadata { age: Duration::from_secs(99999), owned_by_us: true },
            Duration::from_secs(60),
            true,
            false,
            None,
            &mut limiter,
            10,
            RateLimitStrategy::Spool,
            &AlwaysSucceeds,
            &journal,
        );
        assert_eq!(outcome, Outcome::Dropped("expired"));
        assert_eq!(journal.record_count().unwrap(), 0);
    }

    #[test]
    fn keeps_for_retry_on_delivery_failure() {
        let dir = tempdir().unwrap();
        let journal = journal_in(dir.path());
        let mut limiter = RateLimiter::new(true, 1000, 15, -1, 20);
        let outcome = process_staged_record(
            &sample_record(),
            &Metadata { age: Duration::from_secs(1), owned_by_us: true },
            Duration::from_secs(3600),
            true,
            false,
            None,
            &mut limiter,
            10,
            RateLimitStrategy::Spool,
            &AlwaysFails,
            &journal,
        );
        assert_eq!(outcome, Outcome::KeptForRetry);
    }

    #[test]
    fn direct_spool_window_keeps_record_without_delivering() {
        let dir = tempdir().unwrap();
        let journal = journal_in(dir.path());
        let mut limiter = RateLimiter::new(true, 1000, 15, -1, 20);
        let outcome = process_staged_record(
            &sample_record(),
            &Metadata { age: Duration::from_secs(1), owned_by_us: true },
            Duration::from_secs(3600),
            true,
            false,
            Some(SystemTime::now()),
            &mut limiter,
            10,
            RateLimitStrategy::Spool,
            &AlwaysFails,
            &journal,
        );
        assert_eq!(outcome, Outcome::KeptByDirectSpoolWindow);
    }

    #[test]
    fn disabled_delivery_treats_record_as_delivered() {
        let dir = tempdir().unwrap();
        let journal = journal_in(dir.path());
        let mut limiter = RateLimiter::new(true, 1000, 15, -1, 20);
        let outcome = process_staged_record(
            &sample_record(),
            &Metadata { age: Duration::from_secs(1), owned_by_us: true },
            Duration::from_secs(3600),
            false,
            false,
            None,
            &mut limiter,
            10,
            RateLimitStrategy::Spool,
            &AlwaysFails,
            &journal,
        );
        assert_eq!(outcome, Outcome::Delivered);
    }

    #[test]
    fn rate_limit_drop_strategy_drops_record() {
        let dir = tempdir().unwrap();
        let journal = journal_in(dir.path());
        let mut limiter = RateLimiter::new(true, 0, 15, -1, 20);
        let outcome = process_staged_record(
            &sample_record(),
            &Metadata { age: Duration::from_secs(1), owned_by_us: true },
            Duration::from_secs(3600),
            true,
            false,
            None,
            &mut limiter,
            10,
            RateLimitStrategy::Drop,
            &AlwaysSucceeds,
            &journal,
        );
        assert_eq!(outcome, Outcome::Dropped("rate limited"));
    }
}
