// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use telem_common::constants::MACHINE_ID_LEN;
use telem_common::{Result, TelemetryError};
use telem_wire::validate::validate_hex_id;

const MAX_AGE: Duration = Duration::from_secs(3 * 24 * 60 * 60);

/// Owns the machine identity file. An override file, if present, always
/// wins and is never rotated; otherwise a random id is generated and
/// persisted, regenerated once it is older than three days.
pub struct MachineId {
    state_path: PathBuf,
    override_path: Option<PathBuf>,
    current: String,
}

impl MachineId {
    pub fn load(state_path: &Path, override_path: Option<&Path>) -> Result<MachineId> {
        let override_path = override_path.map(|p| p.to_path_buf());
        let current = resolve(&state_path.to_path_buf(), override_path.as_deref())?;
        Ok(MachineId {
            state_path: state_path.to_path_buf(),
            override_path,
            current,
        })
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    /// Called periodically; regenerates and persists a new id if the stored
    /// one has aged past `MAX_AGE` and no override is in effect.
    pub fn refresh_if_stale(&mut self) -> Result<()> {
        if self.override_path.is_some() {
            return Ok(());
        }
        if file_age(&self.state_path)?.map(|age| age > MAX_AGE).unwrap_or(true) {
            self.current = generate_and_store(&self.state_path)?;
        }
        Ok(())
    }
}

fn resolve(state_path: &Path, override_path: Option<&Path>) -> Result<String> {
    if let Some(path) = override_path {
        if let Ok(text) = std::fs::read_to_string(path) {
            let id = text.trim().to_string();
            validate_hex_id(&id, "machine_id override")?;
            return Ok(id);
        }
    }

    match file_age(state_path)? {
        Some(age) if age <= MAX_AGE => {
            let text = std::fs::read_to_string(state_path)?;
            let id = text.trim().to_string();
            if validate_hex_id(&id, "machine_id").is_ok() {
                return Ok(id);
            }
        }
        _ => {}
    }

    generate_and_store(state_path)
}

fn file_age(path: &Path) -> Result<Option<Duration>> {
    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(TelemetryError::IoError(e)),
    };
    let modified = metadata.modified()?;
    Ok(Some(
        SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO),
    ))
}

fn generate_and_store(state_path: &Path) -> Result<String> {
    let id = uuid::Uuid::new_v4().simple().to_string();
    debug_assert_eq!(id.len(), MACHINE_ID_LEN);
    if let Some(parent) = state_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(state_path, format!("{id}\n"))?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn generates_and_persists_on_first_load() {
        let dir = tempdir().unwrap();
        let state_path = dir.path().join("machine-id");
        let machine_id = MachineId::load(&state_path, None).unwrap();
        assert_eq!(machine_id.current().len(), MACHINE_ID_LEN);
        assert!(state_path.exists());
    }

    #[test]
    fn reuses_existing_valid_id() {
        let dir = tempdir().unwrap();
        let state_path = dir.path().join("machine-id");
        let first = MachineId::load(&state_path, None).unwrap();
        let first_id = first.current().to_string();
        let second = MachineId::load(&state_path, None).unwrap();
        assert_eq!(first_id, second.current());
    }

    #[test]
    fn override_file_wins_over_state() {
        let dir = tempdir().unwrap();
        let state_path = dir.path().join("machine-id");
        let override_path = dir.path().join("machine-id-override");
        std::fs::write(&override_path, "abababababababababababababababab\n").unwrap();
        let machine_id = MachineId::load(&state_path, Some(&override_path)).unwrap();
        assert_eq!(machine_id.current(), "abababababababababababababababab");
        assert!(!state_path.exists());
    }

    #[test]
    fn refresh_is_noop_when_override_present() {
        let dir = tempdir().unwrap();
        let state_path = dir.path().join("machine-id");
        let override_path = dir.path().join("machine-id-override");
        std::fs::write(&override_path, "abababababababababababababababab\n").unwrap();
        let mut machine_id = MachineId::load(&state_path, Some(&override_path)).unwrap();
        machine_id.refresh_if_stale().unwrap();
        assert_eq!(machine_id.current(), "abababababababababababababababab");
    }
}
