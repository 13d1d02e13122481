// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Thermal monitoring via `/sys/class/thermal/`.
//!
//! Every `thermal_zoneN/temp` reports millidegrees Celsius. Zone 0 is taken
//! as the SoC temperature; [`ThermalInfo::zones`] lists all of them with
//! their `type` labels for the CLI status view.

use crate::sysfs::{read_i64, read_trimmed};
use crate::MonitorError;
use std::path::Path;

const THERMAL_BASE: &str = "/sys/class/thermal";

/// Above this temperature the device is considered fully throttled.
const FULL_THROTTLE_C: f32 = 80.0;
/// Throttling starts ramping up above this temperature.
const THROTTLE_ONSET_C: f32 = 60.0;

/// Thermal state of the SoC.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ThermalInfo {
    /// Zone 0 temperature in degrees Celsius.
    pub cpu_temp_celsius: f32,
}

/// One entry under `/sys/class/thermal`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ThermalZone {
    pub index: u32,
    /// Contents of the zone's `type` file, e.g. `"cpu-0-0-usr"`.
    pub kind: String,
    pub temp_celsius: f32,
}

impl ThermalInfo {
    /// Reads the zone 0 temperature.
    pub fn read() -> Result<Self, MonitorError> {
        let path = format!("{THERMAL_BASE}/thermal_zone0/temp");
        Self::read_from(Path::new(&path))
    }

    pub(crate) fn read_from(path: &Path) -> Result<Self, MonitorError> {
        Ok(Self {
            cpu_temp_celsius: read_millidegrees(path)?,
        })
    }

    /// Lists every readable thermal zone, sorted by index.
    ///
    /// Zones whose `temp` cannot be read are skipped. Returns an empty list
    /// when the thermal class is absent.
    pub fn zones() -> Vec<ThermalZone> {
        Self::zones_in(Path::new(THERMAL_BASE))
    }

    pub(crate) fn zones_in(base: &Path) -> Vec<ThermalZone> {
        let Ok(entries) = std::fs::read_dir(base) else {
            return Vec::new();
        };
        let mut zones: Vec<ThermalZone> = entries
            .filter_map(|e| e.ok())
            .filter_map(|entry| {
                let name = entry.file_name();
                let index: u32 = name.to_str()?.strip_prefix("thermal_zone")?.parse().ok()?;
                let dir = entry.path();
                let temp_celsius = read_millidegrees(&dir.join("temp")).ok()?;
                let kind = read_trimmed(&dir.join("type")).unwrap_or_else(|_| "unknown".into());
                Some(ThermalZone {
                    index,
                    kind,
                    temp_celsius,
                })
            })
            .collect();
        zones.sort_by_key(|z| z.index);
        zones
    }

    /// Estimated throttling percentage derived from the temperature.
    ///
    /// 100 above 80 °C, `(t - 60) × 5` between 60 and 80 °C, 0 otherwise.
    pub fn throttling_percent(&self) -> f32 {
        let t = self.cpu_temp_celsius;
        if t > FULL_THROTTLE_C {
            100.0
        } else if t > THROTTLE_ONSET_C {
            (t - THROTTLE_ONSET_C) * 5.0
        } else {
            0.0
        }
    }

    /// Returns `true` at or above the full-throttle temperature.
    pub fn is_overheating(&self) -> bool {
        self.cpu_temp_celsius >= FULL_THROTTLE_C
    }
}

fn read_millidegrees(path: &Path) -> Result<f32, MonitorError> {
    Ok(read_i64(path)? as f32 / 1000.0)
}
