// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Sample, alert and report types produced by the performance monitor.

use crate::AlertThresholds;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One reading of every monitored metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSample {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub gpu_percent: f64,
    pub power_mw: f64,
    pub temperature_celsius: f64,
    pub network_kbps: f64,
    pub timestamp_ms: u64,
}

impl PerformanceSample {
    /// Returns one alert per threshold this sample is strictly above.
    pub fn alerts(&self, thresholds: &AlertThresholds) -> Vec<Alert> {
        [
            (AlertKind::Cpu, self.cpu_percent, thresholds.cpu_percent),
            (AlertKind::Memory, self.memory_percent, thresholds.memory_percent),
            (
                AlertKind::Temperature,
                self.temperature_celsius,
                thresholds.temperature_celsius,
            ),
        ]
        .into_iter()
        .filter(|(_, value, threshold)| value > threshold)
        .map(|(kind, value, threshold)| Alert {
            kind,
            value,
            threshold,
            message: format!("{kind} above threshold ({value:.1} > {threshold:.1})"),
            timestamp_ms: self.timestamp_ms,
        })
        .collect()
    }
}

/// The metric an alert fired for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Cpu,
    Memory,
    Temperature,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "CPU usage"),
            Self::Memory => write!(f, "Memory usage"),
            Self::Temperature => write!(f, "Temperature"),
        }
    }
}

/// A threshold crossing, delivered to every registered alert callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub value: f64,
    pub threshold: f64,
    pub message: String,
    pub timestamp_ms: u64,
}

/// Aggregates over the current sample history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub average_cpu_usage: f64,
    pub peak_memory_usage: f64,
    pub average_power_consumption: f64,
    pub total_samples: usize,
}

impl PerformanceReport {
    pub(crate) fn from_samples<'a, I>(samples: I) -> Self
    where
        I: ExactSizeIterator<Item = &'a PerformanceSample> + Clone,
    {
        let n = samples.len();
        if n == 0 {
            return Self {
                average_cpu_usage: 0.0,
                peak_memory_usage: 0.0,
                average_power_consumption: 0.0,
                total_samples: 0,
            };
        }
        let cpu: f64 = samples.clone().map(|s| s.cpu_percent).sum();
        let power: f64 = samples.clone().map(|s| s.power_mw).sum();
        let peak_memory = samples.map(|s| s.memory_percent).fold(0.0, f64::max);
        Self {
            average_cpu_usage: cpu / n as f64,
            peak_memory_usage: peak_memory,
            average_power_consumption: power / n as f64,
            total_samples: n,
        }
    }
}
