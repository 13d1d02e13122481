// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! System memory via `/proc/meminfo`.
//!
//! This is the one reading the monitor treats as mandatory: without it the
//! memory-limit check and the memory alert have nothing to work with.

use crate::sysfs::find_kb_field;
use crate::MonitorError;
use std::path::Path;

const MEMINFO_PATH: &str = "/proc/meminfo";

/// System memory state.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MemoryInfo {
    /// Total physical memory in bytes.
    pub total_bytes: u64,
    /// Memory the kernel estimates is available without swapping, in bytes.
    pub available_bytes: u64,
    /// `total - available`, in bytes.
    pub used_bytes: u64,
}

impl MemoryInfo {
    /// Reads current memory information from `/proc/meminfo`.
    pub fn read() -> Result<Self, MonitorError> {
        Self::read_from(Path::new(MEMINFO_PATH))
    }

    pub(crate) fn read_from(path: &Path) -> Result<Self, MonitorError> {
        let content = std::fs::read_to_string(path).map_err(|e| MonitorError::ReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    /// Parses `/proc/meminfo`-formatted content.
    pub(crate) fn parse(content: &str, source_path: &Path) -> Result<Self, MonitorError> {
        let missing = |field: &str| MonitorError::ParseError {
            path: source_path.display().to_string(),
            detail: format!("{field} not found"),
        };
        let total_kb = find_kb_field(content, "MemTotal:").ok_or_else(|| missing("MemTotal"))?;
        let available_kb =
            find_kb_field(content, "MemAvailable:").ok_or_else(|| missing("MemAvailable"))?;

        let total_bytes = total_kb * 1024;
        let available_bytes = available_kb * 1024;
        Ok(Self {
            total_bytes,
            available_bytes,
            used_bytes: total_bytes.saturating_sub(available_bytes),
        })
    }

    /// Used memory as a percentage in `[0, 100]`.
    pub fn utilisation_percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.used_bytes as f64 / self.total_bytes as f64 * 100.0
    }

    pub fn available_mb(&self) -> u64 {
        self.available_bytes / (1024 * 1024)
    }

    pub fn total_mb(&self) -> u64 {
        self.total_bytes / (1024 * 1024)
    }
}
