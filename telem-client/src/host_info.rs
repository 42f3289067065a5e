// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

use std::ffi::CStr;
use std::path::Path;

const UNKNOWN: &str = "unknown";
const BLANK: &str = "blank";

/// Raw `uname(2)` call, mirroring the teacher's own FFI-based host info
/// gathering. Returns `(sysname, release, machine)`.
fn uname() -> Option<(String, String, String)> {
    // SAFETY: `utsname` is a plain-old-data struct; `uname` only writes
    // into the buffer we provide.
    unsafe {
        let mut uts: libc::utsname = std::mem::zeroed();
        if libc::uname(&mut uts) != 0 {
            return None;
        }
        let sysname = CStr::from_ptr(uts.sysname.as_ptr()).to_string_lossy().into_owned();
        let release = CStr::from_ptr(uts.release.as_ptr()).to_string_lossy().into_owned();
        let machine = CStr::from_ptr(uts.machine.as_ptr()).to_string_lossy().into_owned();
        Some((sysname, release, machine))
    }
}

pub fn arch() -> String {
    uname().map(|(_, _, machine)| machine).unwrap_or_else(|| UNKNOWN.to_string())
}

pub fn kernel_version() -> String {
    uname().map(|(_, release, _)| release).unwrap_or_else(|| UNKNOWN.to_string())
}

fn read_dmi_field(name: &str) -> String {
    let path = Path::new("/sys/class/dmi/id").join(name);
    std::fs::read_to_string(&path)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("no_{name}_file"))
}

/// `vendor|product|product_version`
pub fn host_type() -> String {
    format!(
        "{}|{}|{}",
        read_dmi_field("sys_vendor"),
        read_dmi_field("product_name"),
        read_dmi_field("product_version"),
    )
}

/// `board_name|board_vendor`
pub fn board_name() -> String {
    format!("{}|{}", read_dmi_field("board_name"), read_dmi_field("board_vendor"))
}

pub fn bios_version() -> String {
    read_dmi_field("bios_version")
}

fn read_os_release_field(key: &str) -> Option<String> {
    for path in ["/etc/os-release", "/usr/lib/os-release"] {
        if let Ok(text) = std::fs::read_to_string(path) {
            for line in text.lines() {
                if let Some(value) = line.strip_prefix(&format!("{key}=")) {
                    return Some(value.trim_matches('"').to_string());
                }
            }
        }
    }
    None
}

pub fn system_name() -> String {
    read_os_release_field("NAME").unwrap_or_else(|| UNKNOWN.to_string())
}

pub fn build() -> String {
    read_os_release_field("VERSION_ID")
        .or_else(|| read_os_release_field("BUILD_ID"))
        .unwrap_or_else(|| UNKNOWN.to_string())
}

pub fn cpu_model() -> String {
    let Ok(text) = std::fs::read_to_string("/proc/cpuinfo") else {
        return UNKNOWN.to_string();
    };
    for line in text.lines() {
        if let Some((key, value)) = line.split_once(':') {
            if key.trim() == "model name" {
                let value = value.trim();
                if !value.is_empty() {
                    return value.to_string();
                }
            }
        }
    }
    BLANK.to_string()
}
