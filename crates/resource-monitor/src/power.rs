// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Battery power draw via `/sys/class/power_supply/battery/`.
//!
//! The kernel exposes either `power_now` (µW) directly, or `voltage_now`
//! (µV) and `current_now` (µA) from which power is derived. The sign of
//! `current_now` differs between vendors (charging vs discharging), so the
//! magnitude is used.

use crate::sysfs::{read_i64, read_trimmed};
use crate::MonitorError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const BATTERY_PATH: &str = "/sys/class/power_supply/battery";

/// Where a power reading came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerSource {
    PowerNow,
    VoltageCurrent,
}

/// Instantaneous battery power draw.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PowerInfo {
    pub power_mw: f64,
    pub source: PowerSource,
}

impl PowerInfo {
    /// Reads the battery power draw.
    ///
    /// Fails with [`MonitorError::NotAvailable`] on devices without a
    /// battery node (dev boards, containers).
    pub fn read() -> Result<Self, MonitorError> {
        Self::read_from(Path::new(BATTERY_PATH))
    }

    pub(crate) fn read_from(dir: &Path) -> Result<Self, MonitorError> {
        if let Ok(uw) = read_i64(&dir.join("power_now")) {
            return Ok(Self {
                power_mw: uw.unsigned_abs() as f64 / 1000.0,
                source: PowerSource::PowerNow,
            });
        }
        let microvolts = read_i64(&dir.join("voltage_now"))?;
        let microamps = read_i64(&dir.join("current_now"))?;
        // µV × µA = pW; / 1e9 → mW
        let power_mw = (microvolts as f64 * microamps as f64).abs() / 1e9;
        Ok(Self {
            power_mw,
            source: PowerSource::VoltageCurrent,
        })
    }
}

/// Reads every readable single-line attribute of the battery node.
///
/// Used by the CLI status view; returns an empty map without a battery.
pub fn battery_properties() -> BTreeMap<String, String> {
    properties_in(Path::new(BATTERY_PATH))
}

pub(crate) fn properties_in(dir: &Path) -> BTreeMap<String, String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return BTreeMap::new();
    };
    entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p: &PathBuf| p.is_file())
        .filter_map(|p| {
            let name = p.file_name()?.to_str()?.to_string();
            if name == "uevent" {
                return None;
            }
            let value = read_trimmed(&p).ok()?;
            (!value.contains('\n')).then_some((name, value))
        })
        .collect()
}
