// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! MediaTek NeuroPilot APU backend.
//!
//! Power levels 1–4. The APU runtime takes a worker thread count (1–8)
//! and can time each inference when profiling is on.

use crate::device::{DeviceCore, DeviceSpec};
use crate::{
    Accelerator, AcceleratorError, AcceleratorMetrics, PowerRange, SimulatedDriver, VendorDriver,
};
use recovery::ErrorHandler;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const SPEC: DeviceSpec = DeviceSpec {
    name: "neuropilot-apu",
    display_name: "MediaTek NeuroPilot APU",
    range: PowerRange::new(1, 4),
    operations: &[
        "CONV_2D",
        "DEPTHWISE_CONV_2D",
        "FULLY_CONNECTED",
        "AVERAGE_POOL_2D",
        "MAX_POOL_2D",
        "SOFTMAX",
        "RELU",
    ],
};

const MAX_THREADS: usize = 8;

#[derive(Debug)]
pub struct NeuroPilotApu {
    core: DeviceCore,
    profiling: bool,
    last_inference_time: Option<Duration>,
    last_error: Option<String>,
}

impl Default for NeuroPilotApu {
    fn default() -> Self {
        Self::new()
    }
}

impl NeuroPilotApu {
    pub fn new() -> Self {
        Self::with_driver(Box::new(
            SimulatedDriver::new(SPEC.range).with_power_model(90.0, 610.0),
        ))
    }

    pub fn with_driver(driver: Box<dyn VendorDriver>) -> Self {
        Self {
            core: DeviceCore::new(SPEC, driver),
            profiling: false,
            last_inference_time: None,
            last_error: None,
        }
    }

    pub fn with_error_handler(mut self, errors: Arc<ErrorHandler>) -> Self {
        self.core.set_error_handler(errors);
        self
    }

    pub fn power_range() -> PowerRange {
        SPEC.range
    }

    pub fn thread_count(&self) -> usize {
        self.core.threads
    }

    pub fn enable_profiling(&mut self, enabled: bool) {
        self.profiling = enabled;
        if !enabled {
            self.last_inference_time = None;
        }
    }

    /// Driver time of the last successful inference while profiling.
    pub fn last_inference_time(&self) -> Option<Duration> {
        self.last_inference_time
    }

    /// Message of the most recent failed inference, cleared on success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

impl Accelerator for NeuroPilotApu {
    delegate_to_core!();

    fn run_inference(
        &mut self,
        input: &[f32],
        output: &mut Vec<f32>,
        metrics: Option<&mut AcceleratorMetrics>,
    ) -> Result<(), AcceleratorError> {
        match self.core.run(input, output, metrics) {
            Ok(elapsed) => {
                self.last_error = None;
                if self.profiling {
                    self.last_inference_time = Some(elapsed);
                }
                Ok(())
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn reset_state(&mut self) -> bool {
        if self.core.ensure_not_released().is_err() {
            return false;
        }
        self.profiling = false;
        self.last_inference_time = None;
        self.last_error = None;
        self.core.reset()
    }

    fn set_thread_count(&mut self, threads: usize) -> bool {
        if !(1..=MAX_THREADS).contains(&threads) || self.core.ensure_not_released().is_err() {
            return false;
        }
        debug!(threads, "APU thread count set");
        self.core.threads = threads;
        true
    }
}
