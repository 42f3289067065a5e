// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use telem_common::constants::JOURNAL_FIELD_SEP;
use telem_common::{Result, TelemetryError};
use telem_wire::validate::{classification_matches, validate_classification, validate_hex_id};

const BOOT_ID_PATH: &str = "/proc/sys/kernel/random/boot_id";

/// One line of the journal: `record_id<SEP>timestamp<SEP>classification<SEP>event_id<SEP>boot_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub record_id: String,
    pub timestamp: i64,
    pub classification: String,
    pub event_id: String,
    pub boot_id: String,
}

impl JournalEntry {
    fn to_line(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}{sep}{}{sep}{}",
            self.record_id,
            self.timestamp,
            self.classification,
            self.event_id,
            self.boot_id,
            sep = JOURNAL_FIELD_SEP
        )
    }

    fn parse_line(line: &str) -> Result<JournalEntry> {
        let mut fields = line.split(JOURNAL_FIELD_SEP);
        let record_id = fields
            .next()
            .ok_or_else(|| TelemetryError::corrupt("journal line missing record_id"))?;
        let timestamp = fields
            .next()
            .ok_or_else(|| TelemetryError::corrupt("journal line missing timestamp"))?;
        let classification = fields
            .next()
            .ok_or_else(|| TelemetryError::corrupt("journal line missing classification"))?;
        let event_id = fields
            .next()
            .ok_or_else(|| TelemetryError::corrupt("journal line missing event_id"))?;
        let boot_id = fields
            .next()
            .ok_or_else(|| TelemetryError::corrupt("journal line missing boot_id"))?;
        if fields.next().is_some() {
            return Err(TelemetryError::corrupt("journal line has too many fields"));
        }
        let timestamp: i64 = timestamp
            .parse()
            .map_err(|_| TelemetryError::corrupt("journal line has non-numeric timestamp"))?;
        Ok(JournalEntry {
            record_id: record_id.to_string(),
            timestamp,
            classification: classification.to_string(),
            event_id: event_id.to_string(),
            boot_id: boot_id.to_string(),
        })
    }
}

/// Optional filters applied when listing journal entries.
#[derive(Debug, Clone, Default)]
pub struct JournalFilters {
    pub record_id: Option<String>,
    pub event_id: Option<String>,
    pub classification: Option<String>,
    pub boot_id: Option<String>,
}

impl JournalFilters {
    fn matches(&self, entry: &JournalEntry) -> bool {
        if let Some(record_id) = &self.record_id {
            if record_id != &entry.record_id {
                return false;
            }
        }
        if let Some(event_id) = &self.event_id {
            if event_id != &entry.event_id {
                return false;
            }
        }
        if let Some(boot_id) = &self.boot_id {
            if boot_id != &entry.boot_id {
                return false;
            }
        }
        if let Some(classification) = &self.classification {
            if !classification_matches(classification, &entry.classification) {
                return false;
            }
        }
        true
    }
}

/// An open journal file. Holds the boot_id read at open time and the
/// current record count, refreshed on each operation.
pub struct Journal {
    path: PathBuf,
    boot_id: String,
}

fn read_boot_id() -> Result<String> {
    std::fs::read_to_string(BOOT_ID_PATH)
        .map(|s| s.trim().to_string())
        .map_err(TelemetryError::from)
}

impl Journal {
    pub fn open(path: &Path) -> Result<Journal> {
        Self::open_with_boot_id(path, read_boot_id()?)
    }

    /// Opens with an explicit boot_id, bypassing `/proc`. Used by tests and
    /// by callers running in containers without a real boot_id file.
    pub fn open_with_boot_id(path: &Path, boot_id: String) -> Result<Journal> {
        OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Journal {
            path: path.to_path_buf(),
            boot_id,
        })
    }

    pub fn record_count(&self) -> Result<usize> {
        Ok(self.read_entries()?.len())
    }

    fn read_entries(&self) -> Result<Vec<JournalEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = std::fs::File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            entries.push(JournalEntry::parse_line(&line)?);
        }
        Ok(entries)
    }

    /// Appends a new entry for a just-delivered record, generating a fresh
    /// 32-char record_id. Returns the generated entry.
    pub fn append(
        &self,
        classification: &str,
        timestamp: i64,
        event_id: &str,
    ) -> Result<JournalEntry> {
        validate_classification(classification)?;
        validate_hex_id(event_id, "event_id")?;

        let record_id = uuid::Uuid::new_v4().simple().to_string();
        let entry = JournalEntry {
            record_id,
            timestamp,
            classification: classification.to_string(),
            event_id: event_id.to_string(),
            boot_id: self.boot_id.clone(),
        };

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", entry.to_line())?;
        file.flush()?;
        Ok(entry)
    }

    /// Returns every entry matching `filters`, oldest first.
    pub fn print(&self, filters: &JournalFilters) -> Result<Vec<JournalEntry>> {
        Ok(self
            .read_entries()?
            .into_iter()
            .filter(|entry| filters.matches(entry))
            .collect())
    }

    /// Prunes the journal once it holds more than `record_count_limit +
    /// deviation` entries, advancing past the oldest `record_count -
    /// record_count_limit` entries, calling `on_discard` for each one (used
    /// to delete the matching retention-directory copy), and atomically
    /// replacing the journal with the remainder written to `tmp_dir`.
    pub fn prune(
        &self,
        tmp_dir: &Path,
        record_count_limit: usize,
        deviation: usize,
        mut on_discard: impl FnMut(&JournalEntry),
    ) -> Result<()> {
        let entries = self.read_entries()?;
        if entries.len() <= record_count_limit + deviation {
            return Ok(());
        }

        let discard_count = entries.len() - record_count_limit;
        let (discarded, kept) = entries.split_at(discard_count);

        for entry in discarded {
            on_discard(entry);
        }

        let tmp_path = tmp_dir.join(".journal");
        {
            let mut tmp_file = std::fs::File::create(&tmp_path)?;
            for entry in kept {
                writeln!(tmp_file, "{}", entry.to_line())?;
            }
            tmp_file.flush()?;
        }
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn journal_in(dir: &Path) -> Journal {
        let path = dir.join("journal");
        Journal::open_with_boot_id(&path, "boot-id-fixture".to_string()).unwrap()
    }

    #[test]
    fn append_then_print_round_trips() {
        let dir = tempdir().unwrap();
        let journal = journal_in(dir.path());
        let entry = journal
            .append("org.test/probe/sub", 1234, "0123456789abcdef0123456789abcdef")
            .unwrap();
        let found = journal.print(&JournalFilters::default()).unwrap();
        assert_eq!(found, vec![entry]);
    }

    #[test]
    fn append_rejects_invalid_classification() {
        let dir = tempdir().unwrap();
        let journal = journal_in(dir.path());
        assert!(journal
            .append("bad", 1234, "0123456789abcdef0123456789abcdef")
            .is_err());
    }

    #[test]
    fn filters_by_classification_prefix() {
        let dir = tempdir().unwrap();
        let journal = journal_in(dir.path());
        journal
            .append("org.test/probe/a", 1, "0123456789abcdef0123456789abcdef")
            .unwrap();
        journal
            .append("org.other/probe/b", 2, "0123456789abcdef0123456789abcdef")
            .unwrap();
        let filters = JournalFilters {
            classification: Some("org.test/*".to_string()),
            ..Default::default()
        };
        let found = journal.print(&filters).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].classification, "org.test/probe/a");
    }

    #[test]
    fn prune_keeps_count_within_limit_plus_deviation() {
        let dir = tempdir().unwrap();
        let journal = journal_in(dir.path());
        for i in 0..200 {
            journal
                .append(
                    "org.test/probe/sub",
                    i,
                    "0123456789abcdef0123456789abcdef",
                )
                .unwrap();
        }
        let mut discarded = Vec::new();
        journal
            .prune(dir.path(), 100, 50, |entry| discarded.push(entry.clone()))
            .unwrap();
        let count = journal.record_count().unwrap();
        assert_eq!(count, 100);
        assert_eq!(discarded.len(), 100);
    }

    #[test]
    fn prune_is_noop_below_threshold() {
        let dir = tempdir().unwrap();
        let journal = journal_in(dir.path());
        for i in 0..120 {
            journal
                .append(
                    "org.test/probe/sub",
                    i,
                    "0123456789abcdef0123456789abcdef",
                )
                .unwrap();
        }
        journal.prune(dir.path(), 100, 50, |_| {}).unwrap();
        assert_eq!(journal.record_count().unwrap(), 120);
    }
}
