// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Monitor configuration, loadable as the `[monitoring]` table of the
//! runtime TOML file.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Which metrics the monitor samples, how often, and how many it keeps.
///
/// Disabled metrics read as 0 in every sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub monitor_cpu: bool,
    pub monitor_memory: bool,
    pub monitor_gpu: bool,
    pub monitor_power: bool,
    pub monitor_temperature: bool,
    pub monitor_network: bool,
    pub sampling_interval_ms: u64,
    /// Oldest samples are evicted beyond this count.
    pub max_history: usize,
    /// Sample history is exported here as JSON when monitoring stops.
    pub log_file: Option<PathBuf>,
    pub thresholds: AlertThresholds,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            monitor_cpu: true,
            monitor_memory: true,
            monitor_gpu: true,
            monitor_power: true,
            monitor_temperature: true,
            monitor_network: true,
            sampling_interval_ms: 1000,
            max_history: 3600,
            log_file: None,
            thresholds: AlertThresholds::default(),
        }
    }
}

impl MonitoringConfig {
    pub fn sampling_interval(&self) -> Duration {
        Duration::from_millis(self.sampling_interval_ms.max(1))
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.sampling_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }
}

/// Alert thresholds. A sample strictly above a threshold raises an alert.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub temperature_celsius: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            cpu_percent: 80.0,
            memory_percent: 90.0,
            temperature_celsius: 80.0,
        }
    }
}
