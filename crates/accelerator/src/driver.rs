// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The vendor driver seam.
//!
//! A [`VendorDriver`] is the narrow contract with a vendor inference
//! runtime: open a session, set a power level, push a buffer in and get a
//! buffer (or a status code) back. Accelerators own one driver each and
//! layer the lifecycle, power-profile mapping and error reporting on top.
//!
//! [`SimulatedDriver`] is the in-tree implementation used on hosts without
//! the vendor SDKs and in tests.

use crate::{kernel, DriverError, PowerRange};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// One execution request handed to the driver.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionRequest<'a> {
    pub input: &'a [f32],
    pub power_level: u32,
    /// Worker threads the runtime may use; drivers without a thread knob ignore it.
    pub threads: usize,
}

/// Driver output plus what the device reported about the run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutput {
    pub values: Vec<f32>,
    pub utilization_percent: f64,
    pub power_mw: f64,
}

/// Vendor runtime contract. Implementations must not panic on bad input;
/// they return a [`DriverError`] instead.
pub trait VendorDriver: Send + fmt::Debug {
    /// Opens a device session.
    fn open(&mut self) -> Result<(), DriverError>;

    /// Closes the session. Safe to call when not open.
    fn close(&mut self);

    /// Whether the accelerator hardware exists on this device.
    fn device_present(&self) -> bool;

    fn apply_power_level(&mut self, level: u32) -> Result<(), DriverError>;

    fn execute(&mut self, request: ExecutionRequest<'_>) -> Result<ExecutionOutput, DriverError>;

    fn driver_version(&self) -> String;

    fn firmware_version(&self) -> String;
}

/// Status codes returned by [`SimulatedDriver`].
pub mod status {
    pub const NOT_OPEN: i32 = -1;
    pub const OPEN_FAILED: i32 = -2;
    pub const EXECUTION_FAILED: i32 = -3;
    pub const NO_DEVICE: i32 = -4;
    pub const BAD_LEVEL: i32 = -5;
    pub const POWER_FAILED: i32 = -6;
}

/// Host-side driver that runs the reference kernel.
///
/// Utilisation and power are derived from the applied power level:
/// utilisation `40% + 60% × fraction`, power `idle + span × fraction`.
#[derive(Debug, Clone)]
pub struct SimulatedDriver {
    range: PowerRange,
    idle_mw: f64,
    span_mw: f64,
    present: bool,
    fail_open: bool,
    fail_power_change: bool,
    levels_applied: usize,
    failing_executions: Option<usize>,
    open: bool,
    level: u32,
    executions: Arc<AtomicUsize>,
    version: &'static str,
}

impl SimulatedDriver {
    pub fn new(range: PowerRange) -> Self {
        Self {
            range,
            idle_mw: 150.0,
            span_mw: 1350.0,
            present: true,
            fail_open: false,
            fail_power_change: false,
            levels_applied: 0,
            failing_executions: Some(0),
            open: false,
            level: range.min,
            executions: Arc::new(AtomicUsize::new(0)),
            version: "sim-1.0",
        }
    }

    /// Power model in mW: draw at the lowest level and the extra at the highest.
    pub fn with_power_model(mut self, idle_mw: f64, span_mw: f64) -> Self {
        self.idle_mw = idle_mw;
        self.span_mw = span_mw;
        self
    }

    /// No hardware: opening works but the device is never present.
    pub fn absent(mut self) -> Self {
        self.present = false;
        self
    }

    /// `open` always fails.
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Only the level applied while opening a session succeeds; changing it
    /// afterwards fails. Re-applying the current level is accepted.
    pub fn failing_power_change(mut self) -> Self {
        self.fail_power_change = true;
        self
    }

    /// Every `execute` fails.
    pub fn failing_execute(mut self) -> Self {
        self.failing_executions = None;
        self
    }

    /// The first `n` executions fail, later ones succeed.
    pub fn failing_first(mut self, n: usize) -> Self {
        self.failing_executions = Some(n);
        self
    }

    /// Shared count of `execute` calls, readable after the driver is boxed.
    pub fn execution_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.executions)
    }
}

impl VendorDriver for SimulatedDriver {
    fn open(&mut self) -> Result<(), DriverError> {
        if self.fail_open {
            return Err(DriverError::new(status::OPEN_FAILED, "session open refused"));
        }
        self.open = true;
        self.levels_applied = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn device_present(&self) -> bool {
        self.present
    }

    fn apply_power_level(&mut self, level: u32) -> Result<(), DriverError> {
        if !self.range.contains(level) {
            return Err(DriverError::new(
                status::BAD_LEVEL,
                format!("power level {level} outside {}", self.range),
            ));
        }
        if self.fail_power_change && self.levels_applied > 0 && level != self.level {
            return Err(DriverError::new(status::POWER_FAILED, "power rail fault"));
        }
        self.levels_applied += 1;
        self.level = level;
        Ok(())
    }

    fn execute(&mut self, request: ExecutionRequest<'_>) -> Result<ExecutionOutput, DriverError> {
        let call = self.executions.fetch_add(1, Ordering::SeqCst);
        if !self.open {
            return Err(DriverError::new(status::NOT_OPEN, "session not open"));
        }
        if !self.present {
            return Err(DriverError::new(status::NO_DEVICE, "no device"));
        }
        let fails = match self.failing_executions {
            None => true,
            Some(n) => call < n,
        };
        if fails {
            return Err(DriverError::new(status::EXECUTION_FAILED, "execution aborted by device"));
        }

        let fraction = self.range.fraction(request.power_level);
        Ok(ExecutionOutput {
            values: kernel::execute_parallel(request.input, request.threads),
            utilization_percent: 40.0 + 60.0 * fraction,
            power_mw: self.idle_mw + self.span_mw * fraction,
        })
    }

    fn driver_version(&self) -> String {
        self.version.to_string()
    }

    fn firmware_version(&self) -> String {
        if self.present {
            "sim-fw-1".to_string()
        } else {
            "n/a".to_string()
        }
    }
}
