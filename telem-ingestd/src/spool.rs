// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use telem_common::{Result, TelemetryError};
use telem_wire::StagedRecord;

/// Sums the size in KiB of every regular file directly inside `dir`.
pub fn spool_size_kib(dir: &Path) -> Result<u64> {
    let mut total_bytes: u64 = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            total_bytes += entry.metadata()?.len();
        }
    }
    Ok(total_bytes / 1024)
}

/// Confirms `dir` exists, is a directory, and accepts a throwaway write.
pub fn validate_spool_dir(dir: &Path) -> Result<()> {
    let metadata = std::fs::metadata(dir).map_err(|e| {
        TelemetryError::Fatal(format!("spool dir {} is not accessible: {e}", dir.display()))
    })?;
    if !metadata.is_dir() {
        return Err(TelemetryError::Fatal(format!(
            "spool dir {} is not a directory",
            dir.display()
        )));
    }
    let probe = dir.join(format!(".probe-{}", std::process::id()));
    std::fs::write(&probe, b"")?;
    std::fs::remove_file(&probe)?;
    Ok(())
}

/// Writes `record` to a fresh file in `dir`, refusing if doing so would push
/// the directory over `max_size_kib`.
pub fn write_staged(dir: &Path, record: &StagedRecord, max_size_kib: i64) -> Result<PathBuf> {
    if max_size_kib >= 0 {
        let current = spool_size_kib(dir)?;
        let incoming_kib = (record.encode().len() as u64).div_ceil(1024);
        if current + incoming_kib > max_size_kib as u64 {
            return Err(TelemetryError::Exhausted("spool directory is full".into()));
        }
    }

    let name = format!(
        "telem-{}-{:x}",
        std::process::id(),
        fastrand::u64(..)
    );
    let path = dir.join(name);
    record.write_to_path(&path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_headers() -> telem_wire::headers::RecordHeaders {
        telem_wire::headers::RecordHeaders {
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
        }
    }

    #[test]
    fn write_staged_creates_a_readable_file() {
        let dir = tempdir().unwrap();
        let record = StagedRecord {
            override_config_path: None,
            headers: sample_headers(),
            payload: b"hello".to_vec(),
        };
        let path = write_staged(dir.path(), &record, -1).unwrap();
        let decoded = StagedRecord::read_from_path(&path).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn write_staged_refuses_when_over_budget() {
        let dir = tempdir().unwrap();
        let record = StagedRecord {
            override_config_path: None,
            headers: sample_headers(),
            payload: vec![b'a'; 4096],
        };
        let result = write_staged(dir.path(), &record, 0);
        assert!(matches!(result, Err(TelemetryError::Exhausted(_))));
    }

    #[test]
    fn validate_spool_dir_rejects_missing_path() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(validate_spool_dir(&missing).is_err());
    }
}
