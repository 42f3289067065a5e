// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

use once_cell::sync::Lazy;
use regex::Regex;

/// Register names recognized in kernel oops register dumps, in the order
/// the kernel itself tends to emit them.
pub const REGISTER_NAMES: &[&str] = &[
    "RIP", "RSP", "CR0", "CR2", "CR3", "CR4", "DR0", "DR1", "DR2", "DR3", "DR6", "DR7", "EFLAGS",
    "RAX", "RBX", "RCX", "RDX", "RSI", "RDI", "RBP", "R08", "R09", "R10", "R11", "R12", "R13",
    "R14", "R15", "FS", "GS", "knlGS", "CS", "ES",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterValue {
    pub name: String,
    pub value: u64,
}

static REGISTER_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    let alternation = REGISTER_NAMES.join("|");
    Regex::new(&format!(
        r"(?:^|\s)(?P<name>{alternation}):\s*(?:[0-9a-fA-F]{{4}}:)?\[?<?(?P<value>[0-9a-fA-F]+)>?\]?"
    ))
    .expect("static register regex is valid")
});

/// Extracts every recognized register assignment from a single log line.
/// A line may carry more than one register (e.g. `RSP: 0018:ffff... EFLAGS: 00010246`).
pub fn parse_registers(line: &str) -> Vec<RegisterValue> {
    REGISTER_LINE_RE
        .captures_iter(line)
        .filter_map(|caps| {
            let name = caps.name("name")?.as_str().to_string();
            let value = u64::from_str_radix(caps.name("value")?.as_str(), 16).ok()?;
            Some(RegisterValue { name, value })
        })
        .collect()
}

/// Formats a register value for the final report. Addresses and register
/// contents are redacted (`Zero`/`Non-zero`) unless `reveal` is set, which
/// callers tie to the presence of the privacy-filter override marker.
pub fn format_register(reg: &RegisterValue, reveal: bool) -> String {
    if reveal {
        format!("Register {} : {:#x}", reg.name, reg.value)
    } else if reg.value == 0 {
        format!("Register {} : Zero", reg.name)
    } else {
        format!("Register {} : Non-zero", reg.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_register() {
        let regs = parse_registers("RIP: 0010:[<ffffffff81051234>] do_something+0x10/0x20");
        assert_eq!(regs.len(), 1);
        assert_eq!(regs[0].name, "RIP");
    }

    #[test]
    fn parses_multiple_registers_on_one_line() {
        let regs = parse_registers("RSP: 0018:ffff88000badbeef  EFLAGS: 00010246");
        assert_eq!(regs.len(), 2);
        assert_eq!(regs[0].name, "RSP");
        assert_eq!(regs[1].name, "EFLAGS");
    }

    #[test]
    fn redacts_by_default() {
        let reg = RegisterValue {
            name: "RAX".to_string(),
            value: 0,
        };
        assert_eq!(format_register(&reg, false), "Register RAX : Zero");
        let reg2 = RegisterValue {
            name: "RAX".to_string(),
            value: 42,
        };
        assert_eq!(format_register(&reg2, false), "Register RAX : Non-zero");
    }

    #[test]
    fn reveals_when_privacy_override_set() {
        let reg = RegisterValue {
            name: "RAX".to_string(),
            value: 0x2a,
        };
        assert_eq!(format_register(&reg, true), "Register RAX : 0x2a");
    }
}
