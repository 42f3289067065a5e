// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use telem_common::constants::OPT_OUT_MARKER_PATH;

/// True if the marker file is present, meaning probes must not send
/// anything. Checked fresh on every `send_record()` call rather than cached,
/// since opt-out/opt-in can flip at any time between sends.
pub fn opted_out() -> bool {
    Path::new(OPT_OUT_MARKER_PATH).exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_path_matches_documented_location() {
        assert_eq!(OPT_OUT_MARKER_PATH, "/etc/telemetrics/opt-out");
    }

    #[test]
    fn opted_out_is_false_when_marker_absent() {
        // The real marker path is a system path; in test environments it is
        // not expected to exist.
        if !Path::new(OPT_OUT_MARKER_PATH).exists() {
            assert!(!opted_out());
        }
    }
}
