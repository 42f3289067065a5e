// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use telem_common::{Result, TelemetryError};

/// What the ingest/post daemons do when a rate-limit window is exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitStrategy {
    Spool,
    Drop,
}

impl std::str::FromStr for RateLimitStrategy {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "spool" => Ok(RateLimitStrategy::Spool),
            "drop" => Ok(RateLimitStrategy::Drop),
            other => Err(TelemetryError::invalid(format!(
                "rate_limit_strategy must be 'spool' or 'drop', got '{other}'"
            ))),
        }
    }
}

/// The full typed configuration surface, with defaults matching the
/// original daemon's compiled-in constants.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub server: String,
    pub socket_path: PathBuf,
    pub spool_dir: PathBuf,
    pub rate_limit_strategy: RateLimitStrategy,
    pub cainfo: Option<PathBuf>,
    pub tidheader: String,
    pub record_expiry_minutes: i64,
    pub spool_max_size_kib: i64,
    pub spool_process_time_secs: u64,
    pub record_window_length: i64,
    pub byte_window_length: i64,
    pub record_burst_limit: i64,
    pub byte_burst_limit: i64,
    pub rate_limit_enabled: bool,
    pub daemon_recycling_enabled: bool,
    pub record_retention_enabled: bool,
    pub record_server_delivery_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: String::new(),
            socket_path: PathBuf::from(telem_common::constants::DEFAULT_SOCKET_PATH),
            spool_dir: PathBuf::from("/var/spool/telemetry"),
            rate_limit_strategy: RateLimitStrategy::Spool,
            cainfo: None,
            tidheader: String::new(),
            record_expiry_minutes: 1200,
            spool_max_size_kib: 5120,
            spool_process_time_secs: 120,
            record_window_length: 15,
            byte_window_length: 20,
            record_burst_limit: 1000,
            byte_burst_limit: -1,
            rate_limit_enabled: true,
            daemon_recycling_enabled: true,
            record_retention_enabled: false,
            record_server_delivery_enabled: true,
        }
    }
}

impl Config {
    /// Loads config from an INI file with a single `[settings]` section.
    /// Unrecognized keys are logged and ignored; missing keys keep their
    /// default; a malformed value for a recognized key is `Invalid` and
    /// fails the whole load rather than silently falling back.
    pub fn load(path: &Path) -> Result<Config> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Config> {
        let mut config = Config::default();
        let mut in_settings_section = false;

        for raw_line in text.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(['#', ';']) {
                continue;
            }
            if line.starts_with('[') {
                in_settings_section = line.eq_ignore_ascii_case("[settings]");
                continue;
            }
            if !in_settings_section {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(TelemetryError::invalid(format!(
                    "malformed config line: '{raw_line}'"
                )));
            };
            let key = key.trim();
            let value = value.trim();
            config.apply(key, value)?;
        }

        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "server" => self.server = value.to_string(),
            "socket_path" => self.socket_path = PathBuf::from(value),
            "spool_dir" => self.spool_dir = PathBuf::from(value),
            "rate_limit_strategy" => self.rate_limit_strategy = value.parse()?,
            "cainfo" => {
                self.cainfo = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                }
            }
            "tidheader" => self.tidheader = value.to_string(),
            "record_expiry" => self.record_expiry_minutes = parse_int(key, value)?,
            "spool_max_size" => self.spool_max_size_kib = parse_int(key, value)?,
            "spool_process_time" => {
                self.spool_process_time_secs = parse_int(key, value)?.clamp(120, 3600) as u64
            }
            "record_window_length" => self.record_window_length = parse_int(key, value)?,
            "byte_window_length" => self.byte_window_length = parse_int(key, value)?,
            "record_burst_limit" => self.record_burst_limit = parse_int(key, value)?,
            "byte_burst_limit" => self.byte_burst_limit = parse_int(key, value)?,
            "rate_limit_enabled" => self.rate_limit_enabled = parse_bool(key, value)?,
            "daemon_recycling_enabled" => {
                self.daemon_recycling_enabled = parse_bool(key, value)?
            }
            "record_retention_enabled" => {
                self.record_retention_enabled = parse_bool(key, value)?
            }
            "record_server_delivery_enabled" => {
                self.record_server_delivery_enabled = parse_bool(key, value)?
            }
            unknown => {
                tracing::warn!(key = unknown, "ignoring unrecognized config key");
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.record_window_length >= 60 || self.record_window_length < 1 {
            return Err(TelemetryError::invalid(
                "record_window_length must be 1..60",
            ));
        }
        if self.byte_window_length >= 60 || self.byte_window_length < 1 {
            return Err(TelemetryError::invalid("byte_window_length must be 1..60"));
        }
        Ok(())
    }
}

fn parse_int(key: &str, value: &str) -> Result<i64> {
    value
        .parse()
        .map_err(|_| TelemetryError::invalid(format!("'{key}' must be an integer, got '{value}'")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(TelemetryError::invalid(format!(
            "'{key}' must be a boolean, got '{value}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.record_expiry_minutes, 1200);
        assert_eq!(config.spool_max_size_kib, 5120);
        assert_eq!(config.spool_process_time_secs, 120);
        assert!(config.rate_limit_enabled);
        assert!(!config.record_retention_enabled);
        assert!(config.record_server_delivery_enabled);
    }

    #[test]
    fn parses_recognized_keys() {
        let text = "[settings]\nserver = https://example.test\nrate_limit_strategy = drop\nrecord_retention_enabled = true\n";
        let config = Config::parse(text).unwrap();
        assert_eq!(config.server, "https://example.test");
        assert_eq!(config.rate_limit_strategy, RateLimitStrategy::Drop);
        assert!(config.record_retention_enabled);
    }

    #[test]
    fn ignores_unrecognized_key() {
        let text = "[settings]\nnot_a_real_key = 1\n";
        assert!(Config::parse(text).is_ok());
    }

    #[test]
    fn rejects_malformed_integer() {
        let text = "[settings]\nrecord_expiry = not_a_number\n";
        assert!(Config::parse(text).is_err());
    }

    #[test]
    fn rejects_malformed_strategy() {
        let text = "[settings]\nrate_limit_strategy = sideways\n";
        assert!(Config::parse(text).is_err());
    }

    #[test]
    fn spool_process_time_is_clamped() {
        let text = "[settings]\nspool_process_time = 10\n";
        let config = Config::parse(text).unwrap();
        assert_eq!(config.spool_process_time_secs, 120);
    }

    #[test]
    fn ignores_keys_outside_settings_section() {
        let text = "[other]\nserver = wrong\n[settings]\nserver = right\n";
        let config = Config::parse(text).unwrap();
        assert_eq!(config.server, "right");
    }
}
