// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Accelerator lifecycle states and the descriptor snapshot.
//!
//! ```text
//! Uninitialized ──initialize──▶ Initializing ──▶ Ready ⇄ Running
//!       ▲                            │             │
//!       │                            ▼             ▼
//!   (initialize)                   Error ◀──── failed call
//!       │                            │
//!   Released ◀──release──(any)       └──reset_state──▶ Ready
//! ```

use crate::{PowerProfile, PowerRange};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceleratorState {
    Uninitialized,
    Initializing,
    Ready,
    Running,
    Error,
    Released,
}

impl AcceleratorState {
    /// States from which `initialize` may start.
    pub fn can_initialize(self) -> bool {
        matches!(self, Self::Uninitialized | Self::Released)
    }

    /// States in which the device session is open.
    pub fn is_initialized(self) -> bool {
        matches!(self, Self::Ready | Self::Running | Self::Error)
    }
}

impl fmt::Display for AcceleratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Error => "error",
            Self::Released => "released",
        };
        f.write_str(s)
    }
}

/// Read-only snapshot describing an accelerator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceleratorDescriptor {
    /// Registry name, e.g. `"hexagon-dsp"`.
    pub name: String,
    /// Human-readable name, e.g. `"Qualcomm Hexagon DSP"`.
    pub display_name: String,
    pub supported_operations: Vec<String>,
    pub power_profile: PowerProfile,
    pub power_level: u32,
    pub power_range: PowerRange,
    pub state: AcceleratorState,
    pub driver_version: String,
    pub firmware_version: String,
}

impl AcceleratorDescriptor {
    pub fn summary(&self) -> String {
        format!(
            "{} ({}): state {}, power {} (level {} of {}), {} ops, driver {}, firmware {}",
            self.display_name,
            self.name,
            self.state,
            self.power_profile,
            self.power_level,
            self.power_range,
            self.supported_operations.len(),
            self.driver_version,
            self.firmware_version,
        )
    }
}
