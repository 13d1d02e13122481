// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Device identity and coarse system information.
//!
//! [`DeviceInfo`] is attached to every error report; [`SystemInfo`] heads
//! benchmark exports.

use crate::sysfs::read_trimmed;
use crate::{MemoryInfo, MonitorError};
use serde::{Deserialize, Serialize};
use std::path::Path;

const KERNEL_BASE: &str = "/proc/sys/kernel";

/// Kernel and hardware identity (the `uname` fields).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub sysname: String,
    pub nodename: String,
    pub release: String,
    pub version: String,
    pub machine: String,
}

impl DeviceInfo {
    /// Captures the device identity. Unreadable fields are left as `"unknown"`.
    pub fn capture() -> Self {
        let field = |name: &str| {
            read_trimmed(&Path::new(KERNEL_BASE).join(name)).unwrap_or_else(|_| "unknown".into())
        };
        Self {
            sysname: field("ostype"),
            nodename: field("hostname"),
            release: field("osrelease"),
            version: field("version"),
            machine: std::env::consts::ARCH.to_string(),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} {} ({}) on {}",
            self.sysname, self.release, self.machine, self.nodename
        )
    }
}

/// Device identity plus RAM, load and uptime.
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    #[serde(flatten)]
    pub device: DeviceInfo,
    pub total_ram_mb: u64,
    pub free_ram_mb: u64,
    pub online_cores: u32,
    pub uptime_seconds: u64,
    pub load_1min: f64,
    pub load_5min: f64,
    pub load_15min: f64,
}

impl SystemInfo {
    /// Captures system information; memory is required, the rest is best effort.
    pub fn capture() -> Result<Self, MonitorError> {
        let memory = MemoryInfo::read()?;
        let [load_1min, load_5min, load_15min] = read_loadavg().unwrap_or([0.0; 3]);
        Ok(Self {
            device: DeviceInfo::capture(),
            total_ram_mb: memory.total_mb(),
            free_ram_mb: memory.available_mb(),
            online_cores: crate::cpu::read_online_cores().unwrap_or(1),
            uptime_seconds: read_uptime().unwrap_or(0),
            load_1min,
            load_5min,
            load_15min,
        })
    }
}

/// The three load averages from `/proc/loadavg`.
pub(crate) fn read_loadavg() -> Option<[f64; 3]> {
    let content = read_trimmed(Path::new("/proc/loadavg")).ok()?;
    parse_loadavg(&content)
}

fn parse_loadavg(content: &str) -> Option<[f64; 3]> {
    let mut it = content.split_whitespace().map(|f| f.parse::<f64>().ok());
    Some([it.next()??, it.next()??, it.next()??])
}

fn read_uptime() -> Option<u64> {
    let content = read_trimmed(Path::new("/proc/uptime")).ok()?;
    let secs: f64 = content.split_whitespace().next()?.parse().ok()?;
    Some(secs as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_loadavg() {
        assert_eq!(parse_loadavg("0.35 0.28 0.22 1/234 5678"), Some([0.35, 0.28, 0.22]));
        assert_eq!(parse_loadavg("0.35"), None);
    }

    #[test]
    fn test_capture_never_fails() {
        let info = DeviceInfo::capture();
        assert_eq!(info.machine, std::env::consts::ARCH);
        assert!(!info.sysname.is_empty());
    }

    #[test]
    fn test_summary() {
        let info = DeviceInfo {
            sysname: "Linux".into(),
            nodename: "pixel".into(),
            release: "5.10.43".into(),
            version: "#1 SMP PREEMPT".into(),
            machine: "aarch64".into(),
        };
        assert_eq!(info.summary(), "Linux 5.10.43 (aarch64) on pixel");
    }

    #[test]
    fn test_system_info_serialises_flat() {
        if Path::new("/proc/meminfo").exists() {
            let info = SystemInfo::capture().unwrap();
            let json = serde_json::to_value(&info).unwrap();
            assert!(json.get("sysname").is_some());
            assert!(json.get("total_ram_mb").is_some());
        }
    }
}
