// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! GPU busy percentage from vendor sysfs nodes.
//!
//! Probed in order:
//! 1. Adreno: `/sys/class/kgsl/kgsl-3d0/gpu_busy_percentage` (`"37 %"`)
//! 2. Generic: `/sys/kernel/gpu/gpu_busy`
//! 3. Mali: `/sys/devices/platform/mali.0/utilization`

use crate::sysfs::read_i64;
use crate::MonitorError;
use std::path::PathBuf;

const GPU_BUSY_NODES: [&str; 3] = [
    "/sys/class/kgsl/kgsl-3d0/gpu_busy_percentage",
    "/sys/kernel/gpu/gpu_busy",
    "/sys/devices/platform/mali.0/utilization",
];

/// GPU utilisation reading.
#[derive(Debug, Clone, serde::Serialize)]
pub struct GpuInfo {
    pub busy_percent: f64,
    /// Sysfs node the value was read from.
    pub node: String,
}

impl GpuInfo {
    /// Reads the first available GPU busy node.
    pub fn read() -> Result<Self, MonitorError> {
        let nodes: Vec<PathBuf> = GPU_BUSY_NODES.iter().map(PathBuf::from).collect();
        Self::read_first(&nodes)
    }

    pub(crate) fn read_first(nodes: &[PathBuf]) -> Result<Self, MonitorError> {
        for node in nodes {
            match read_i64(node) {
                Ok(v) => {
                    return Ok(Self {
                        busy_percent: (v as f64).clamp(0.0, 100.0),
                        node: node.display().to_string(),
                    })
                }
                Err(MonitorError::NotAvailable { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(MonitorError::NotAvailable {
            path: nodes
                .first()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        })
    }
}
