// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Resource usage of the current process.
//!
//! Resident set size comes from `VmRSS` in `/proc/self/status`; CPU time from
//! the `utime`/`stime` fields of `/proc/self/stat`.

use crate::sysfs::{find_kb_field, read_trimmed};
use crate::MonitorError;
use std::path::Path;
use std::time::Instant;

const STATUS_PATH: &str = "/proc/self/status";
const STAT_PATH: &str = "/proc/self/stat";

/// Kernel clock ticks per second. 100 on every Linux/Android ABI in use.
const CLK_TCK: f64 = 100.0;

/// Process memory and CPU counters at one instant.
#[derive(Debug, Clone, Copy)]
pub struct ProcessStats {
    pub rss_kb: u64,
    /// `utime + stime` in clock ticks.
    pub cpu_ticks: u64,
    pub taken_at: Instant,
}

impl ProcessStats {
    pub fn read() -> Result<Self, MonitorError> {
        let status = read_trimmed(Path::new(STATUS_PATH))?;
        let rss_kb = find_kb_field(&status, "VmRSS:").ok_or_else(|| MonitorError::ParseError {
            path: STATUS_PATH.to_string(),
            detail: "VmRSS not found".to_string(),
        })?;
        let stat = read_trimmed(Path::new(STAT_PATH))?;
        let cpu_ticks = parse_cpu_ticks(&stat).ok_or_else(|| MonitorError::ParseError {
            path: STAT_PATH.to_string(),
            detail: "malformed stat line".to_string(),
        })?;
        Ok(Self {
            rss_kb,
            cpu_ticks,
            taken_at: Instant::now(),
        })
    }

    pub fn rss_mb(&self) -> f64 {
        self.rss_kb as f64 / 1024.0
    }

    /// Process CPU percentage between `earlier` and `self`.
    ///
    /// 100 means one full core; multi-threaded work can exceed it.
    pub fn cpu_percent_since(&self, earlier: &ProcessStats) -> f64 {
        let secs = self.taken_at.duration_since(earlier.taken_at).as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        let ticks = self.cpu_ticks.saturating_sub(earlier.cpu_ticks);
        ticks as f64 / CLK_TCK / secs * 100.0
    }
}

/// Extracts `utime + stime` from a `/proc/<pid>/stat` line.
///
/// The command name is parenthesised and may contain spaces, so fields are
/// counted from the last `") "`. `utime`/`stime` are fields 14 and 15 of
/// the full line, i.e. indices 11 and 12 after the name.
fn parse_cpu_ticks(stat: &str) -> Option<u64> {
    let (_, rest) = stat.rsplit_once(") ")?;
    let fields: Vec<&str> = rest.split_whitespace().collect();
    let utime: u64 = fields.get(11)?.parse().ok()?;
    let stime: u64 = fields.get(12)?.parse().ok()?;
    Some(utime + stime)
}
