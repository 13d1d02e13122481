// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Power profiles and their mapping onto vendor power levels.

use crate::AcceleratorError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Abstract operating point, mapped by each accelerator onto its own
/// power-level range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerProfile {
    LowPower,
    #[default]
    Balanced,
    HighPerformance,
}

impl fmt::Display for PowerProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::LowPower => "low_power",
            Self::Balanced => "balanced",
            Self::HighPerformance => "high_performance",
        };
        f.write_str(s)
    }
}

impl FromStr for PowerProfile {
    type Err = AcceleratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low_power" | "low-power" | "low" => Ok(Self::LowPower),
            "balanced" => Ok(Self::Balanced),
            "high_performance" | "high-performance" | "high" => Ok(Self::HighPerformance),
            other => Err(AcceleratorError::invalid(format!(
                "unknown power profile '{other}'"
            ))),
        }
    }
}

/// Inclusive vendor power-level range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerRange {
    pub min: u32,
    pub max: u32,
}

impl PowerRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, level: u32) -> bool {
        (self.min..=self.max).contains(&level)
    }

    /// Low → min, high → max, balanced → `(min + max) / 2`.
    pub fn level_for(&self, profile: PowerProfile) -> u32 {
        match profile {
            PowerProfile::LowPower => self.min,
            PowerProfile::Balanced => (self.min + self.max) / 2,
            PowerProfile::HighPerformance => self.max,
        }
    }

    /// The profile a directly-set level reads back as.
    pub fn profile_for(&self, level: u32) -> PowerProfile {
        if level <= self.min {
            PowerProfile::LowPower
        } else if level >= self.max {
            PowerProfile::HighPerformance
        } else {
            PowerProfile::Balanced
        }
    }

    /// Position of `level` within the range, in `[0.0, 1.0]`.
    pub fn fraction(&self, level: u32) -> f64 {
        if self.max <= self.min {
            return 1.0;
        }
        (level.saturating_sub(self.min)) as f64 / (self.max - self.min) as f64
    }
}

impl fmt::Display for PowerRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}
