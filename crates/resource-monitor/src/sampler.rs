// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Where samples come from.
//!
//! [`SystemSampler`] reads the real device; tests hand the monitor a
//! scripted [`SampleSource`] instead.

use crate::{
    unix_millis, CpuTimes, GpuInfo, MemoryInfo, MonitoringConfig, NetCounters, PerformanceSample,
    PowerInfo, ThermalInfo,
};
use tracing::trace;

/// Produces one [`PerformanceSample`] per call.
///
/// Implementations must leave metrics disabled in `config` at 0.
pub trait SampleSource: Send {
    fn sample(&mut self, config: &MonitoringConfig) -> PerformanceSample;
}

/// Samples the live system.
///
/// CPU utilisation and network throughput are deltas, so the first sample
/// reports 0 for both.
#[derive(Debug, Default)]
pub struct SystemSampler {
    last_cpu: Option<CpuTimes>,
    last_net: Option<NetCounters>,
}

impl SystemSampler {
    pub fn new() -> Self {
        Self::default()
    }

    fn cpu_percent(&mut self) -> f64 {
        let Ok(now) = CpuTimes::read() else {
            return 0.0;
        };
        let percent = self
            .last_cpu
            .map(|prev| now.utilisation_since(&prev))
            .unwrap_or(0.0);
        self.last_cpu = Some(now);
        percent
    }

    fn network_kbps(&mut self) -> f64 {
        let Ok(now) = NetCounters::read() else {
            return 0.0;
        };
        let kbps = self
            .last_net
            .map(|prev| now.kbps_since(&prev))
            .unwrap_or(0.0);
        self.last_net = Some(now);
        kbps
    }
}

impl SampleSource for SystemSampler {
    fn sample(&mut self, config: &MonitoringConfig) -> PerformanceSample {
        let mut sample = PerformanceSample {
            timestamp_ms: unix_millis(),
            ..Default::default()
        };
        if config.monitor_cpu {
            sample.cpu_percent = self.cpu_percent();
        }
        if config.monitor_memory {
            sample.memory_percent = MemoryInfo::read()
                .map(|m| m.utilisation_percent())
                .unwrap_or(0.0);
        }
        if config.monitor_gpu {
            sample.gpu_percent = GpuInfo::read().map(|g| g.busy_percent).unwrap_or(0.0);
        }
        if config.monitor_power {
            sample.power_mw = PowerInfo::read().map(|p| p.power_mw).unwrap_or(0.0);
        }
        if config.monitor_temperature {
            sample.temperature_celsius = ThermalInfo::read()
                .map(|t| t.cpu_temp_celsius as f64)
                .unwrap_or(0.0);
        }
        if config.monitor_network {
            sample.network_kbps = self.network_kbps();
        }
        trace!(?sample, "sampled system");
        sample
    }
}
