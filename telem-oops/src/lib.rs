// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

pub mod frames;
pub mod patterns;
pub mod payload;
pub mod registers;

use patterns::{match_start, PATTERNS};
use payload::synthesize_payload;

/// Message buffers longer than this are finished without the kernel ever
/// emitting an explicit end marker.
pub const MAX_LINES: usize = 100;

/// A fully captured and rendered oops/crash message, ready to become a
/// record payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OopsMessage {
    pub classification: String,
    pub severity: u8,
    pub payload: String,
}

struct ActiveMessage {
    lines: Vec<String>,
    pattern_idx: usize,
    in_stack_dump: bool,
}

/// Strips a kernel log-level prefix such as `<6>` from the start of a line.
fn strip_log_level(line: &str) -> &str {
    if let Some(rest) = line.strip_prefix('<') {
        if let Some(end) = rest.find('>') {
            if end <= 2 {
                return &rest[end + 1..];
            }
        }
    }
    line
}

/// Strips a kernel timestamp such as `[  123.456789] ` from the start of a
/// line, preserving any further indentation (which the stack-dump
/// detection below depends on).
fn strip_timestamp(line: &str) -> &str {
    if line.starts_with('[') {
        if let Some(end) = line.find(']') {
            let after = &line[end + 1..];
            return after.strip_prefix(' ').unwrap_or(after);
        }
    }
    line
}

fn preprocess(raw_line: &str) -> String {
    strip_timestamp(strip_log_level(raw_line)).to_string()
}

fn is_stack_dump_line(line: &str) -> bool {
    line.starts_with(' ')
        && line.len() >= 8
        && !line.contains("Code:")
        && !line.contains("Instruction Dump::")
}

/// A line-oriented state machine that turns raw kernel log lines into
/// finished oops/crash messages. Feed it lines one at a time; it returns a
/// message whenever one is completed (by an explicit end marker, a new
/// message starting, or the line-count cap being hit).
#[derive(Default)]
pub struct OopsParser {
    active: Option<ActiveMessage>,
}

impl OopsParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one raw log line into the state machine. `reveal_registers`
    /// should reflect whether the privacy-filter override marker is
    /// present at the time the message is rendered.
    pub fn feed_line(&mut self, raw_line: &str, reveal_registers: bool) -> Option<OopsMessage> {
        let line = preprocess(raw_line);

        let Some(active) = self.active.as_mut() else {
            if let Some(idx) = match_start(&line) {
                self.active = Some(ActiveMessage {
                    lines: vec![line],
                    pattern_idx: idx,
                    in_stack_dump: false,
                });
            }
            return None;
        };

        if line.contains("[ end trace") {
            let finished = self.active.take().unwrap();
            return Some(Self::render(finished, reveal_registers));
        }

        if active.lines.len() >= MAX_LINES {
            let finished = self.active.take().unwrap();
            let result = Self::render(finished, reveal_registers);
            if let Some(idx) = match_start(&line) {
                self.active = Some(ActiveMessage {
                    lines: vec![line],
                    pattern_idx: idx,
                    in_stack_dump: false,
                });
            }
            return Some(result);
        }

        if line.starts_with("Call Trace:") {
            active.in_stack_dump = true;
            active.lines.push(line);
            return None;
        }

        if active.in_stack_dump {
            if is_stack_dump_line(&line) {
                active.lines.push(line);
                return None;
            }
            active.in_stack_dump = false;
        }

        let current_is_alsa = PATTERNS[active.pattern_idx].is_alsa_regex();
        if !current_is_alsa {
            if let Some(idx) = match_start(&line) {
                let finished = self.active.take().unwrap();
                let result = Self::render(finished, reveal_registers);
                self.active = Some(ActiveMessage {
                    lines: vec![line],
                    pattern_idx: idx,
                    in_stack_dump: false,
                });
                return Some(result);
            }
        }

        active.lines.push(line);
        None
    }

    /// Finishes and returns any in-progress message, e.g. at end of input.
    pub fn finish(&mut self, reveal_registers: bool) -> Option<OopsMessage> {
        self.active
            .take()
            .map(|active| Self::render(active, reveal_registers))
    }

    fn render(active: ActiveMessage, reveal_registers: bool) -> OopsMessage {
        let pattern = &PATTERNS[active.pattern_idx];
        OopsMessage {
            classification: pattern.classification.to_string(),
            severity: pattern.severity as u8,
            payload: synthesize_payload(&active.lines, reveal_registers),
        }
    }
}

/// Convenience entry point for parsing a whole buffer (e.g. the contents
/// of a crash probe's captured log) in one call.
pub fn parse_buffer(text: &str, reveal_registers: bool) -> Vec<OopsMessage> {
    let mut parser = OopsParser::new();
    let mut messages = Vec::new();
    for line in text.lines() {
        if let Some(msg) = parser.feed_line(line, reveal_registers) {
            messages.push(msg);
        }
    }
    if let Some(msg) = parser.finish(reveal_registers) {
        messages.push(msg);
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_parser_ignores_unrelated_lines() {
        let mut parser = OopsParser::new();
        assert!(parser.feed_line("all is well", false).is_none());
        assert!(parser.finish(false).is_none());
    }

    #[test]
    fn captures_simple_warning_message() {
        let text = "WARNING: CPU: 0 PID: 1 at foo.c:10 foo+0x1/0x2\nModules linked in: ext4\n";
        let messages = parse_buffer(text, false);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].classification, "kernel/core/warning");
        assert_eq!(messages[0].severity, 2);
        assert!(messages[0].payload.contains("Modules : ext4"));
    }

    #[test]
    fn ends_message_on_end_trace_marker() {
        let text = "kernel BUG at mm/slab.c:100\nsome detail\n[ end trace 0123456789abcdef ]\nafter the trace, unrelated\n";
        let messages = parse_buffer(text, false);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].classification, "kernel/core/bug");
    }

    #[test]
    fn secondary_start_pattern_ends_current_message() {
        let text = "WARNING: first issue\nsome detail line\nWARNING: second issue\nmore detail\n";
        let messages = parse_buffer(text, false);
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn alsa_regex_message_is_not_split_by_warning_lines() {
        let text = "ALSA hda_codec: BUG: invalid widget\nWARNING: this is still part of the ALSA report in upstream logs\nmore\n";
        let messages = parse_buffer(text, false);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].classification, "driver/sound/bug");
    }

    #[test]
    fn stack_dump_ends_on_code_line() {
        let text = concat!(
            "kernel BUG at mm/slab.c:100\n",
            "Call Trace:\n",
            " [<ffffffffa1002128>] do_one_initcall+0xb8/0x1e0\n",
            "Code: 00 00 00 00\n",
            "[ end trace abc ]\n",
        );
        let messages = parse_buffer(text, false);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].payload.contains("#1 do_one_initcall - [kernel]"));
    }

    #[test]
    fn message_finished_at_max_lines_cap() {
        let mut text = String::from("Badness in driver\n");
        for i in 0..MAX_LINES {
            text.push_str(&format!("detail line {i}\n"));
        }
        let messages = parse_buffer(&text, false);
        assert_eq!(messages.len(), 1);
    }
}
