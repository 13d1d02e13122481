// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Generic-processor backend.
//!
//! Runs the host reference kernel through the same lifecycle as the vendor
//! backends. Levels 0–2 stand for little cores, mixed, and all cores.

use crate::device::{DeviceCore, DeviceSpec};
use crate::{
    kernel, Accelerator, AcceleratorError, AcceleratorMetrics, DriverError, ExecutionOutput,
    ExecutionRequest, PowerRange, VendorDriver,
};
use recovery::ErrorHandler;
use std::sync::Arc;

const SPEC: DeviceSpec = DeviceSpec {
    name: "cpu",
    display_name: "Generic CPU",
    range: PowerRange::new(0, 2),
    operations: &[
        "CONV_2D",
        "DEPTHWISE_CONV_2D",
        "FULLY_CONNECTED",
        "AVERAGE_POOL_2D",
        "MAX_POOL_2D",
        "SOFTMAX",
        "RELU",
        "ADD",
        "MUL",
        "RESHAPE",
        "CONCATENATION",
        "LSTM",
    ],
};

/// Estimated package draw at the lowest level, and the extra at the highest.
const IDLE_MW: f64 = 400.0;
const SPAN_MW: f64 = 1600.0;

/// The processor is always there; the session is bookkeeping only.
#[derive(Debug, Default)]
struct HostDriver {
    open: bool,
}

impl VendorDriver for HostDriver {
    fn open(&mut self) -> Result<(), DriverError> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn device_present(&self) -> bool {
        true
    }

    fn apply_power_level(&mut self, _level: u32) -> Result<(), DriverError> {
        Ok(())
    }

    fn execute(&mut self, request: ExecutionRequest<'_>) -> Result<ExecutionOutput, DriverError> {
        if !self.open {
            return Err(DriverError::new(crate::status::NOT_OPEN, "session not open"));
        }
        let fraction = SPEC.range.fraction(request.power_level);
        Ok(ExecutionOutput {
            values: kernel::execute_parallel(request.input, request.threads),
            utilization_percent: 40.0 + 60.0 * fraction,
            power_mw: IDLE_MW + SPAN_MW * fraction,
        })
    }

    fn driver_version(&self) -> String {
        "host".to_string()
    }

    fn firmware_version(&self) -> String {
        std::env::consts::ARCH.to_string()
    }
}

#[derive(Debug)]
pub struct CpuAccelerator {
    core: DeviceCore,
}

impl Default for CpuAccelerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuAccelerator {
    /// Runs on the host processor with every available core.
    pub fn new() -> Self {
        Self::with_driver(Box::new(HostDriver::default()))
    }

    pub fn with_driver(driver: Box<dyn VendorDriver>) -> Self {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            core: DeviceCore::new(SPEC, driver).with_default_threads(threads),
        }
    }

    pub fn with_error_handler(mut self, errors: Arc<ErrorHandler>) -> Self {
        self.core.set_error_handler(errors);
        self
    }

    pub fn thread_count(&self) -> usize {
        self.core.threads
    }
}

impl Accelerator for CpuAccelerator {
    delegate_to_core!();

    fn run_inference(
        &mut self,
        input: &[f32],
        output: &mut Vec<f32>,
        metrics: Option<&mut AcceleratorMetrics>,
    ) -> Result<(), AcceleratorError> {
        self.core.run(input, output, metrics).map(|_| ())
    }

    fn reset_state(&mut self) -> bool {
        self.core.reset()
    }

    fn set_thread_count(&mut self, threads: usize) -> bool {
        if threads == 0 || self.core.ensure_not_released().is_err() {
            return false;
        }
        self.core.threads = threads;
        true
    }
}
