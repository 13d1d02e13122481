// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Aggregated point-in-time system snapshot.
//!
//! A [`SystemSnapshot`] combines every reader in this crate into a single
//! struct. The CLI `status` command prints it, and the inference engine
//! consults [`SystemSnapshot::is_resource_constrained`] before choosing a
//! backend.

use crate::{unix_millis, CpuInfo, GpuInfo, MemoryInfo, MonitorError, PowerInfo, ThermalInfo};

/// A complete point-in-time reading of all monitored system resources.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SystemSnapshot {
    pub cpu: CpuInfo,
    pub memory: MemoryInfo,
    pub thermal: ThermalInfo,
    /// `None` when no battery node is present.
    pub power: Option<PowerInfo>,
    /// `None` when no known GPU busy node is present.
    pub gpu: Option<GpuInfo>,
    /// Unix timestamp in milliseconds when the snapshot was taken.
    pub timestamp_ms: u64,
}

impl SystemSnapshot {
    /// Captures a new snapshot by reading all system metrics.
    ///
    /// Individual subsystem failures are handled gracefully:
    /// - **Thermal**: 0.0 °C if no thermal zone is readable.
    /// - **CPU frequency**: 0 MHz if cpufreq is unavailable.
    /// - **Power / GPU**: `None` if the node is missing.
    /// - **Memory**: this is the most critical reading and *must* succeed.
    pub fn capture() -> Result<Self, MonitorError> {
        let thermal = ThermalInfo::read().unwrap_or(ThermalInfo {
            cpu_temp_celsius: 0.0,
        });
        let cpu = CpuInfo::read().unwrap_or_else(|_| CpuInfo::unknown());
        let memory = MemoryInfo::read()?;

        Ok(Self {
            cpu,
            memory,
            thermal,
            power: PowerInfo::read().ok(),
            gpu: GpuInfo::read().ok(),
            timestamp_ms: unix_millis(),
        })
    }

    /// Returns a summary string suitable for logging or CLI display.
    ///
    /// # Example output
    /// ```text
    /// System: CPU 1804 MHz (8 cores, 75%), Mem 3814/7629 MB avail (50% used), Temp 54.3°C (throttle 0%), Power 2450 mW
    /// ```
    pub fn summary(&self) -> String {
        let freq_status = if self.cpu.max_frequency_mhz == 0 {
            "freq n/a".to_string()
        } else {
            format!("{}%", (self.cpu.frequency_ratio() * 100.0) as u32)
        };
        let power = self
            .power
            .as_ref()
            .map(|p| format!("{:.0} mW", p.power_mw))
            .unwrap_or_else(|| "n/a".to_string());

        format!(
            "System: CPU {} MHz ({} cores, {freq_status}), \
             Mem {}/{} MB avail ({:.0}% used), \
             Temp {:.1}°C (throttle {:.0}%), Power {power}",
            self.cpu.frequency_mhz,
            self.cpu.online_cores,
            self.memory.available_mb(),
            self.memory.total_mb(),
            self.memory.utilisation_percent(),
            self.thermal.cpu_temp_celsius,
            self.thermal.throttling_percent(),
        )
    }

    /// Returns `true` under resource pressure:
    ///
    /// - Thermal throttling is active.
    /// - Available memory is below 256 MB.
    /// - CPU load per core exceeds 0.9.
    pub fn is_resource_constrained(&self) -> bool {
        self.thermal.is_overheating()
            || self.memory.available_mb() < 256
            || self.cpu.load_per_core > 0.9
    }
}
