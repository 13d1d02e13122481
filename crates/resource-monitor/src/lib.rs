// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # resource-monitor
//!
//! Reads device metrics from `/sys/` and `/proc/` and samples them on a
//! background thread so the inference runtime (or whoever drives it) can
//! react to CPU, memory, thermal and power pressure.
//!
//! # Monitored Metrics
//! - **CPU utilisation** — `/proc/stat` deltas, plus frequency and load.
//! - **Memory** — `/proc/meminfo` and the process RSS from `/proc/self/status`.
//! - **GPU busy %** — vendor sysfs nodes (Adreno `kgsl`, Mali).
//! - **Power draw** — battery `power_now`, or `voltage_now × current_now`.
//! - **Temperature** — thermal zone 0, with all zones listable.
//! - **Network throughput** — `/proc/net/dev` byte counter deltas.
//!
//! # Graceful Degradation
//! Phones, dev boards and containers expose very different sysfs trees.
//! Every reader except `/proc/meminfo` falls back to a zero reading when its
//! node is missing, so sampling never stops because one sensor is absent.
//!
//! # Background Sampling
//! ```no_run
//! use resource_monitor::{MonitoringConfig, PerformanceMonitor};
//! use std::time::Duration;
//!
//! let mut monitor = PerformanceMonitor::new();
//! monitor.register_alert_callback(|alert| eprintln!("alert: {}", alert.message));
//! monitor.start_monitoring(MonitoringConfig::default().with_interval(Duration::from_millis(500)));
//! std::thread::sleep(Duration::from_secs(2));
//! monitor.stop_monitoring();
//! println!("avg cpu {:.1}%", monitor.average_cpu_usage());
//! ```

mod config;
mod cpu;
mod device;
mod error;
mod gpu;
mod memory;
mod monitor;
mod network;
mod power;
mod process;
mod sample;
mod sampler;
mod snapshot;
mod sysfs;
mod thermal;

pub use config::{AlertThresholds, MonitoringConfig};
pub use cpu::{CpuInfo, CpuTimes};
pub use device::{DeviceInfo, SystemInfo};
pub use error::MonitorError;
pub use gpu::GpuInfo;
pub use memory::MemoryInfo;
pub use monitor::{AlertCallback, PerformanceMonitor};
pub use network::NetCounters;
pub use power::{battery_properties, PowerInfo, PowerSource};
pub use process::ProcessStats;
pub use sample::{Alert, AlertKind, PerformanceReport, PerformanceSample};
pub use sampler::{SampleSource, SystemSampler};
pub use snapshot::SystemSnapshot;
pub use thermal::{ThermalInfo, ThermalZone};

use std::time::{SystemTime, UNIX_EPOCH};

/// Captures a point-in-time snapshot of all monitored system resources.
///
/// This is a convenience wrapper around [`SystemSnapshot::capture()`].
pub fn snapshot() -> Result<SystemSnapshot, MonitorError> {
    SystemSnapshot::capture()
}

/// Milliseconds since the Unix epoch, or 0 if the clock is before it.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
