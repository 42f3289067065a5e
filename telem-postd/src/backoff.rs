// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

use telem_common::constants::MAX_RETRY_ATTEMPTS;

/// Poll-loop wait, in seconds, while a retry is in progress. Attempt 0 means
/// "not retrying" and uses the caller's normal cadence; attempts 1..=8
/// follow `attempt^2`, giving 1, 4, 9, 16, 25, 36, 49, 64.
pub fn retry_poll_secs(retry_attempt: u32, normal_cadence_secs: u64) -> u64 {
    if retry_attempt == 0 {
        normal_cadence_secs
    } else {
        (retry_attempt as u64).pow(2)
    }
}

pub fn retries_exhausted(retry_attempt: u32) -> bool {
    retry_attempt > MAX_RETRY_ATTEMPTS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_sequence_matches_quadratic_growth() {
        let expected = [1, 4, 9, 16, 25, 36, 49, 64];
        for (attempt, &want) in (1u32..=8).zip(expected.iter()) {
            assert_eq!(retry_poll_secs(attempt, 120), want);
        }
    }

    #[test]
    fn gives_up_after_eight_consecutive_failures() {
        assert!(!retries_exhausted(8));
        assert!(retries_exhausted(9));
    }

    #[test]
    fn zero_attempt_uses_normal_cadence() {
        assert_eq!(retry_poll_secs(0, 120), 120);
    }
}
