// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

use crate::frames::{parse_stack_frame, StackFrame};
use crate::registers::{format_register, parse_registers, RegisterValue};

fn strip_ci_prefix<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    if line.len() >= prefix.len() && line[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&line[prefix.len()..])
    } else {
        None
    }
}

fn parse_kernel_cpu_line(line: &str) -> (Option<String>, Option<String>) {
    if let Some(idx) = line.find("Not tainted ") {
        let version = line[idx + "Not tainted ".len()..].trim().to_string();
        return (Some(version), Some("Not tainted".to_string()));
    }
    if let Some(idx) = line.find("Tainted: ") {
        let rest = &line[idx + "Tainted: ".len()..];
        let mut parts = rest.splitn(2, char::is_whitespace);
        let flags = parts.next().unwrap_or("").to_string();
        let version = parts.next().unwrap_or("").trim().to_string();
        return (Some(version), Some(flags));
    }
    (None, None)
}

/// Walks a captured oops message bottom-up (mirroring the order stack
/// frames and register dumps actually appear relative to the crashing
/// line) and renders the final "Crash Report:" payload.
pub fn synthesize_payload(lines: &[String], reveal_registers: bool) -> String {
    let reason = lines.first().cloned().unwrap_or_default();

    let mut modules: Option<String> = None;
    let mut kernel_version: Option<String> = None;
    let mut tainted: Option<String> = None;
    let mut frames: Vec<StackFrame> = Vec::new();
    let mut registers: Vec<RegisterValue> = Vec::new();
    // Lines are walked from last to first: stack-trace frames appear after
    // `Call Trace:` in the original log, so they surface first here. Any
    // line that fails to parse as a frame while still inside the trace
    // (disassembly dumps, blank separators) is skipped rather than ending
    // the trace outright; only the `Call Trace:` marker itself does that.
    let mut in_trace = lines.iter().any(|line| line.starts_with("Call Trace:"));

    for line in lines.iter().skip(1).rev() {
        if in_trace {
            if line.starts_with("Call Trace:") {
                in_trace = false;
                continue;
            }
            if let Some(frame) = parse_stack_frame(line) {
                frames.push(frame);
            }
            continue;
        }

        if let Some(rest) = strip_ci_prefix(line, "Modules linked in: ") {
            modules.get_or_insert_with(|| rest.to_string());
            continue;
        }
        if line.starts_with("CPU:") || line.starts_with("PID:") {
            let (kv, tf) = parse_kernel_cpu_line(line);
            if kernel_version.is_none() {
                kernel_version = kv;
            }
            if tainted.is_none() {
                tainted = tf;
            }
            continue;
        }
        registers.extend(parse_registers(line));
    }
    frames.reverse();

    let mut payload = String::new();
    payload.push_str("Crash Report:\n");
    payload.push_str(&format!("Reason: {reason}\n"));
    if let Some(kv) = &kernel_version {
        payload.push_str(&format!("Kernel Version : {kv}\n"));
    }
    if let Some(t) = &tainted {
        payload.push_str(&format!("Tainted : {t}\n"));
    }
    if let Some(m) = &modules {
        payload.push_str(&format!("Modules : {m}\n"));
    }
    for reg in &registers {
        payload.push_str(&format_register(reg, reveal_registers));
        payload.push('\n');
    }
    if !frames.is_empty() {
        payload.push_str("Backtrace :\n");
    }
    for (i, frame) in frames.iter().enumerate() {
        payload.push_str(&format!(
            "#{} {} - [{}]\n",
            i + 1,
            frame.function.as_deref().unwrap_or("???"),
            frame.module
        ));
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesizes_minimal_report_without_backtrace() {
        let lines = vec!["WARNING: CPU: 0 PID: 1 at foo.c:10 foo+0x1/0x2".to_string()];
        let payload = synthesize_payload(&lines, false);
        assert!(payload.starts_with("Crash Report:\n"));
        assert!(payload.contains("Reason: WARNING:"));
        assert!(!payload.contains("Backtrace"));
    }

    #[test]
    fn synthesizes_full_report_with_frames_and_registers() {
        let lines = vec![
            "WARNING: CPU: 2 PID: 6429 at foo.c:42".to_string(),
            "Modules linked in: ext4 jbd2".to_string(),
            "CPU: 2 PID: 6429 Comm: insmod Tainted: P OE 3.19.0-18-generic #18-Ubuntu".to_string(),
            "RIP: 0010:[<ffffffff81051234>] do_something+0x10/0x20".to_string(),
            "Call Trace:".to_string(),
            " [<ffffffffa1002128>] do_one_initcall+0xb8/0x1e0".to_string(),
            " [<ffffffffa1002200>] load_module+0x1600/0x1a00".to_string(),
        ];
        let payload = synthesize_payload(&lines, false);
        assert!(payload.contains("Modules : ext4 jbd2"));
        assert!(payload.contains("Tainted : P"));
        assert!(payload.contains("3.19.0-18-generic"));
        assert!(payload.contains("Register RIP : Non-zero"));
        assert!(payload.contains("#1 do_one_initcall - [kernel]"));
        assert!(payload.contains("#2 load_module - [kernel]"));
    }

    #[test]
    fn reveals_register_values_when_requested() {
        let lines = vec![
            "WARNING: boom".to_string(),
            "RAX: 000000000000002a".to_string(),
        ];
        let payload = synthesize_payload(&lines, true);
        assert!(payload.contains("0x2a"));
    }
}
