// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! CPU frequency, load and utilisation.
//!
//! Reads CPU state from:
//! - `/sys/devices/system/cpu/cpu*/cpufreq/` — current and max frequency.
//! - `/sys/devices/system/cpu/online` — online core count.
//! - `/proc/loadavg` — 1-minute load average.
//! - `/proc/stat` — aggregate jiffy counters; utilisation is the busy share
//!   of the delta between two readings.
//!
//! Big.LITTLE phones report per-cluster frequencies; core 0 is used as the
//! representative value, which is usually the little cluster.

use crate::sysfs::read_trimmed;
use crate::MonitorError;
use std::path::Path;

const CPU_BASE: &str = "/sys/devices/system/cpu";
const PROC_STAT: &str = "/proc/stat";

/// CPU frequency and load information.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CpuInfo {
    /// Current frequency of core 0 in MHz.
    pub frequency_mhz: u32,
    /// Maximum frequency of core 0 in MHz.
    pub max_frequency_mhz: u32,
    /// 1-minute load average divided by online core count, clamped to `[0.0, 1.0]`.
    pub load_per_core: f32,
    /// Number of online cores.
    pub online_cores: u32,
}

impl CpuInfo {
    /// Reads current CPU information from sysfs and procfs.
    pub fn read() -> Result<Self, MonitorError> {
        let cur_freq_path = format!("{CPU_BASE}/cpu0/cpufreq/scaling_cur_freq");
        let max_freq_path = format!("{CPU_BASE}/cpu0/cpufreq/scaling_max_freq");

        let frequency_mhz = read_freq(Path::new(&cur_freq_path))?;
        let max_frequency_mhz = read_freq(Path::new(&max_freq_path))?;

        let online_cores = read_online_cores()?;
        let load_per_core = read_load_per_core(online_cores)?;

        Ok(Self {
            frequency_mhz,
            max_frequency_mhz,
            load_per_core,
            online_cores,
        })
    }

    /// Returns a reading with only the core count filled in.
    pub fn unknown() -> Self {
        Self {
            frequency_mhz: 0,
            max_frequency_mhz: 0,
            load_per_core: 0.0,
            online_cores: read_online_cores().unwrap_or(1),
        }
    }

    /// Returns `true` if core 0 runs below its maximum frequency.
    pub fn is_throttled(&self) -> bool {
        self.frequency_mhz < self.max_frequency_mhz
    }

    /// Returns `current / max`, in `[0.0, 1.0]`.
    pub fn frequency_ratio(&self) -> f32 {
        if self.max_frequency_mhz == 0 {
            return 0.0;
        }
        self.frequency_mhz as f32 / self.max_frequency_mhz as f32
    }
}

/// Aggregate CPU jiffy counters from the first line of `/proc/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    /// Jiffies spent doing work (everything except idle and iowait).
    pub busy: u64,
    /// All jiffies.
    pub total: u64,
}

impl CpuTimes {
    /// Reads the aggregate `cpu` line from `/proc/stat`.
    pub fn read() -> Result<Self, MonitorError> {
        let path = Path::new(PROC_STAT);
        let content = read_trimmed(path)?;
        Self::parse(&content).ok_or_else(|| MonitorError::ParseError {
            path: PROC_STAT.to_string(),
            detail: "missing or malformed aggregate cpu line".to_string(),
        })
    }

    /// Parses `/proc/stat` content.
    ///
    /// Format: `cpu  user nice system idle iowait irq softirq steal ...`
    pub(crate) fn parse(content: &str) -> Option<Self> {
        let line = content.lines().find(|l| l.starts_with("cpu "))?;
        let fields: Vec<u64> = line
            .split_whitespace()
            .skip(1)
            .map(|f| f.parse().ok())
            .collect::<Option<_>>()?;
        if fields.len() < 4 {
            return None;
        }
        let total: u64 = fields.iter().sum();
        let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
        Some(Self {
            busy: total.saturating_sub(idle),
            total,
        })
    }

    /// Busy percentage between `earlier` and `self`, in `[0, 100]`.
    ///
    /// Returns 0 if no time has elapsed or the counters went backwards.
    pub fn utilisation_since(&self, earlier: &CpuTimes) -> f64 {
        let total = self.total.saturating_sub(earlier.total);
        if total == 0 {
            return 0.0;
        }
        let busy = self.busy.saturating_sub(earlier.busy);
        (busy as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
    }
}

/// Reads a CPU frequency value from sysfs (reported in kHz, returned as MHz).
fn read_freq(path: &Path) -> Result<u32, MonitorError> {
    let content = read_trimmed(path)?;
    let khz: u64 = content.parse::<u64>().map_err(|_| MonitorError::ParseError {
        path: path.display().to_string(),
        detail: format!("expected integer kHz value, got '{content}'"),
    })?;
    Ok((khz / 1000) as u32)
}

/// Determines the number of online CPU cores.
///
/// Tries `/sys/devices/system/cpu/online` first, then counts `cpuN`
/// directories, then `available_parallelism()`.
pub(crate) fn read_online_cores() -> Result<u32, MonitorError> {
    let online_path = format!("{CPU_BASE}/online");
    if let Ok(content) = read_trimmed(Path::new(&online_path)) {
        if let Some(count) = parse_cpu_range(&content) {
            return Ok(count);
        }
    }

    if let Ok(entries) = std::fs::read_dir(CPU_BASE) {
        let count = entries
            .filter_map(|e| e.ok())
            .filter(|e| {
                let name = e.file_name();
                let name = name.to_string_lossy();
                name.len() > 3
                    && name.starts_with("cpu")
                    && name[3..].chars().all(|c| c.is_ascii_digit())
            })
            .count();
        if count > 0 {
            return Ok(count as u32);
        }
    }

    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .map_err(|e| MonitorError::ReadError {
            path: CPU_BASE.to_string(),
            source: e,
        })
}

/// Parses a CPU range list: `"0-3"` → 4, `"0"` → 1, `"0,2-3"` → 3.
fn parse_cpu_range(s: &str) -> Option<u32> {
    let mut total = 0u32;
    for part in s.split(',') {
        let part = part.trim();
        if let Some((start_s, end_s)) = part.split_once('-') {
            let start: u32 = start_s.trim().parse().ok()?;
            let end: u32 = end_s.trim().parse().ok()?;
            if end < start {
                return None;
            }
            total += end - start + 1;
        } else {
            let _: u32 = part.parse().ok()?;
            total += 1;
        }
    }
    (total > 0).then_some(total)
}

/// 1-minute load average per core, clamped to `[0.0, 1.0]`.
fn read_load_per_core(online_cores: u32) -> Result<f32, MonitorError> {
    let load_1m = match crate::device::read_loadavg() {
        Some([one, _, _]) => one as f32,
        None => return Ok(0.0),
    };
    let cores = online_cores.max(1) as f32;
    Ok((load_1m / cores).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_STAT: &str = "\
cpu  4705 150 1120 16250 520 0 45 0 0 0
cpu0 1393 41 310 4064 140 0 30 0 0 0
intr 1234567
ctxt 98765
";

    fn info(freq: u32, max_freq: u32) -> CpuInfo {
        CpuInfo {
            frequency_mhz: freq,
            max_frequency_mhz: max_freq,
            load_per_core: 0.5,
            online_cores: 8,
        }
    }

    #[test]
    fn test_parse_cpu_range() {
        assert_eq!(parse_cpu_range("0-3"), Some(4));
        assert_eq!(parse_cpu_range("0-7"), Some(8));
        assert_eq!(parse_cpu_range("0"), Some(1));
        assert_eq!(parse_cpu_range("0-1,3-5"), Some(5));
        assert_eq!(parse_cpu_range(""), None);
        assert_eq!(parse_cpu_range("3-1"), None);
    }

    #[test]
    fn test_is_throttled() {
        assert!(!info(2400, 2400).is_throttled());
        assert!(info(1200, 2400).is_throttled());
    }

    #[test]
    fn test_frequency_ratio_zero_max() {
        assert_eq!(info(0, 0).frequency_ratio(), 0.0);
        assert!((info(1200, 2400).frequency_ratio() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_parse_proc_stat() {
        let times = CpuTimes::parse(SAMPLE_STAT).unwrap();
        assert_eq!(times.total, 4705 + 150 + 1120 + 16250 + 520 + 45);
        assert_eq!(times.busy, times.total - 16250 - 520);
    }

    #[test]
    fn test_parse_proc_stat_without_aggregate() {
        assert!(CpuTimes::parse("cpu0 1 2 3 4\n").is_none());
    }

    #[test]
    fn test_utilisation_since() {
        let earlier = CpuTimes { busy: 100, total: 400 };
        let later = CpuTimes { busy: 175, total: 500 };
        assert!((later.utilisation_since(&earlier) - 75.0).abs() < 1e-9);
        assert_eq!(earlier.utilisation_since(&earlier), 0.0);
        assert_eq!(earlier.utilisation_since(&later), 0.0);
    }

    #[test]
    fn test_online_cores() {
        assert!(read_online_cores().unwrap() >= 1);
    }
}
