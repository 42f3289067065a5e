// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

use once_cell::sync::Lazy;
use regex::Regex;

/// Severity levels a recognized oops pattern is tagged with. Mirrors the
/// two levels the kernel-log patterns below actually use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternSeverity {
    Medium = 2,
    Critical = 4,
}

enum Matcher {
    Literal(&'static str),
    Regex(Lazy<Regex>),
}

pub struct Pattern {
    matcher: Matcher,
    pub classification: &'static str,
    pub severity: PatternSeverity,
}

impl Pattern {
    pub fn matches(&self, line: &str) -> bool {
        match &self.matcher {
            Matcher::Literal(prefix) => line.starts_with(prefix),
            Matcher::Regex(re) => re.is_match(line),
        }
    }

    /// The ALSA regex pattern gets special treatment: while it is active,
    /// a secondary start-pattern match does not end the message.
    pub fn is_alsa_regex(&self) -> bool {
        self.classification == ALSA_CLASSIFICATION
    }
}

const ALSA_CLASSIFICATION: &str = "driver/sound/bug";

/// The table of recognized oops/crash start patterns, in match-priority
/// order. Each entry names the classification and severity a message
/// opened by that pattern is tagged with.
pub static PATTERNS: Lazy<Vec<Pattern>> = Lazy::new(|| {
    vec![
        Pattern {
            matcher: Matcher::Literal("NETDEV WATCHDOG: "),
            classification: "net/driver/warning",
            severity: PatternSeverity::Medium,
        },
        Pattern {
            matcher: Matcher::Literal("WARNING: "),
            classification: "kernel/core/warning",
            severity: PatternSeverity::Medium,
        },
        Pattern {
            matcher: Matcher::Literal("general protection fault: "),
            classification: "kernel/core/bug",
            severity: PatternSeverity::Critical,
        },
        Pattern {
            matcher: Matcher::Literal("BUG: unable to handle kernel "),
            classification: "kernel/core/bug",
            severity: PatternSeverity::Critical,
        },
        Pattern {
            matcher: Matcher::Literal("kernel BUG at"),
            classification: "kernel/core/bug",
            severity: PatternSeverity::Critical,
        },
        Pattern {
            matcher: Matcher::Literal("do_IRQ: stack overflow:"),
            classification: "kernel/core/stackoverflow",
            severity: PatternSeverity::Critical,
        },
        Pattern {
            matcher: Matcher::Literal("near stack overflow (cur:"),
            classification: "kernel/core/stackoverflow",
            severity: PatternSeverity::Critical,
        },
        Pattern {
            matcher: Matcher::Literal("RTNL: assertion failed"),
            classification: "net/core/warning",
            severity: PatternSeverity::Medium,
        },
        Pattern {
            matcher: Matcher::Literal("Eeek! page_mapcount(page) went negative!"),
            classification: "kernel/mm/bug",
            severity: PatternSeverity::Critical,
        },
        Pattern {
            matcher: Matcher::Literal("double fault"),
            classification: "kernel/core/bug",
            severity: PatternSeverity::Critical,
        },
        Pattern {
            matcher: Matcher::Literal("Badness"),
            classification: "kernel/core/warning",
            severity: PatternSeverity::Medium,
        },
        Pattern {
            matcher: Matcher::Literal("list_del corruption."),
            classification: "kernel/mm/bug",
            severity: PatternSeverity::Critical,
        },
        Pattern {
            matcher: Matcher::Literal("list_add corruption."),
            classification: "kernel/mm/bug",
            severity: PatternSeverity::Critical,
        },
        Pattern {
            matcher: Matcher::Literal("ACPI Error:"),
            classification: "kernel/acpi/warning",
            severity: PatternSeverity::Medium,
        },
        Pattern {
            matcher: Matcher::Regex(Lazy::new(|| {
                Regex::new(r"^ALSA (.*): BUG(.*)").expect("static ALSA regex is valid")
            })),
            classification: ALSA_CLASSIFICATION,
            severity: PatternSeverity::Critical,
        },
        Pattern {
            matcher: Matcher::Regex(Lazy::new(|| {
                Regex::new(r"irq \d+: nobody cared").expect("static irq regex is valid")
            })),
            classification: "kernel/core/warning",
            severity: PatternSeverity::Medium,
        },
    ]
});

/// Finds the first pattern matching `line`, if any.
pub fn match_start(line: &str) -> Option<usize> {
    PATTERNS.iter().position(|pattern| pattern.matches(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_literal_warning_pattern() {
        assert!(match_start("WARNING: CPU: 2 PID: 100 at foo.c:10").is_some());
    }

    #[test]
    fn matches_alsa_regex_pattern() {
        let idx = match_start("ALSA hda_codec: BUG: invalid widget").unwrap();
        assert!(PATTERNS[idx].is_alsa_regex());
    }

    #[test]
    fn matches_irq_nobody_cared_regex() {
        assert!(match_start("irq 42: nobody cared (try booting with the \"irqpoll\" option)").is_some());
    }

    #[test]
    fn unrelated_line_does_not_match() {
        assert!(match_start("everything is fine").is_none());
    }
}
