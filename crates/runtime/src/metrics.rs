// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-call inference metrics.
//!
//! [`InferenceMetrics`] is produced for every profiled call and handed back
//! to the caller; the engine does not retain it. Batch calls fold the
//! per-item metrics into [`InferenceMetrics::batch_total`] with
//! [`InferenceMetrics::accumulate`]: times add up, everything else keeps the
//! worst case.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Which route executed a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPath {
    #[default]
    Accelerator,
    CpuFallback,
    /// Served from the previous result without running a backend.
    Cached,
}

impl fmt::Display for ExecutionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Accelerator => "accelerator",
            Self::CpuFallback => "cpu fallback",
            Self::Cached => "cached",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceMetrics {
    /// Wall-clock time of the call.
    pub elapsed_ms: f64,
    /// Process resident set size after the call.
    pub memory_mb: f64,
    /// Process CPU over the call; 100 means one full core.
    pub cpu_percent: f64,
    /// Zero whenever the accelerator did not run the call.
    pub accelerator_utilization_percent: f64,
    pub estimated_power_mw: f64,
    pub path: ExecutionPath,
}

impl InferenceMetrics {
    pub fn elapsed(&self) -> Duration {
        Duration::from_secs_f64(self.elapsed_ms.max(0.0) / 1000.0)
    }

    /// Empty batch total. Its path reads `Cached` until an item that ran on
    /// a backend is folded in.
    pub fn batch_total() -> Self {
        Self {
            path: ExecutionPath::Cached,
            ..Self::default()
        }
    }

    /// Folds one batch item into `self`: summed time, worst-case rest.
    ///
    /// The path reads `CpuFallback` if any item fell back, else
    /// `Accelerator` if any item ran there.
    pub fn accumulate(&mut self, item: &InferenceMetrics) {
        self.elapsed_ms += item.elapsed_ms;
        self.memory_mb = self.memory_mb.max(item.memory_mb);
        self.cpu_percent = self.cpu_percent.max(item.cpu_percent);
        self.accelerator_utilization_percent = self
            .accelerator_utilization_percent
            .max(item.accelerator_utilization_percent);
        self.estimated_power_mw = self.estimated_power_mw.max(item.estimated_power_mw);
        self.path = match (self.path, item.path) {
            (ExecutionPath::CpuFallback, _) | (_, ExecutionPath::CpuFallback) => {
                ExecutionPath::CpuFallback
            }
            (ExecutionPath::Accelerator, _) | (_, ExecutionPath::Accelerator) => {
                ExecutionPath::Accelerator
            }
            (ExecutionPath::Cached, ExecutionPath::Cached) => ExecutionPath::Cached,
        };
    }

    /// Human-readable one-liner for CLI output.
    pub fn summary(&self) -> String {
        format!(
            "Inference via {}: {:.3}ms, {:.1} MB RSS, {:.1}% CPU, {:.1}% accelerator, {:.0} mW",
            self.path,
            self.elapsed_ms,
            self.memory_mb,
            self.cpu_percent,
            self.accelerator_utilization_percent,
            self.estimated_power_mw,
        )
    }
}
