// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

const FRAME_MARKERS: &[&str] = &["<IRQ>", "<NMI>", "<EOI>", "<<EOE>>"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub address: String,
    pub function: Option<String>,
    pub module: String,
}

/// Parses one stack-dump line, e.g.
/// ` [<ffffffffa1002128>] do_one_initcall+0xb8/0x1e0`, optionally preceded
/// by a marker such as `<IRQ>`. Returns `None` if the line doesn't carry a
/// recognizable `[<address>]` frame.
pub fn parse_stack_frame(line: &str) -> Option<StackFrame> {
    let mut rest = line.trim_start();
    for marker in FRAME_MARKERS {
        if let Some(stripped) = rest.strip_prefix(marker) {
            rest = stripped.trim_start();
        }
    }

    let rest = rest.strip_prefix('[')?;
    let close = rest.find(']')?;
    let bracketed = &rest[..close];
    let address = bracketed.trim_start_matches('<').trim_end_matches('>').to_string();
    if address.is_empty() || !address.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let tail = rest[close + 1..].trim_start();
    if tail.is_empty() {
        return Some(StackFrame {
            address,
            function: None,
            module: "kernel".to_string(),
        });
    }

    let function = match tail.split_once('+') {
        Some((name, _offset)) => name.to_string(),
        None => tail.split_whitespace().next().unwrap_or(tail).to_string(),
    };

    Some(StackFrame {
        address,
        function: Some(function),
        module: "kernel".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_frame() {
        let frame = parse_stack_frame(" [<ffffffffa1002128>] do_one_initcall+0xb8/0x1e0").unwrap();
        assert_eq!(frame.address, "ffffffffa1002128");
        assert_eq!(frame.function.as_deref(), Some("do_one_initcall"));
        assert_eq!(frame.module, "kernel");
    }

    #[test]
    fn strips_irq_marker() {
        let frame = parse_stack_frame(" <IRQ>  [<ffffffffa1002128>] handle_irq_event+0x20/0x40").unwrap();
        assert_eq!(frame.function.as_deref(), Some("handle_irq_event"));
    }

    #[test]
    fn address_only_frame_has_no_function() {
        let frame = parse_stack_frame(" [<ffffffffa1002128>]").unwrap();
        assert_eq!(frame.function, None);
    }

    #[test]
    fn rejects_line_without_frame() {
        assert!(parse_stack_frame("Modules linked in: ext4").is_none());
    }
}
