// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Lifecycle shared by every driver-backed accelerator.
//!
//! [`DeviceCore`] owns the driver and enforces the state machine, the
//! power-level mapping and error reporting. The public accelerator types
//! wrap one and add their vendor knobs.

use crate::{
    AcceleratorDescriptor, AcceleratorError, AcceleratorMetrics, AcceleratorState,
    ExecutionRequest, PowerProfile, PowerRange, VendorDriver,
};
use recovery::{ErrorCategory, ErrorHandler, ErrorSeverity};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Static identity of an accelerator variant.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DeviceSpec {
    pub name: &'static str,
    pub display_name: &'static str,
    pub range: PowerRange,
    pub operations: &'static [&'static str],
}

#[derive(Debug)]
pub(crate) struct DeviceCore {
    spec: DeviceSpec,
    driver: Box<dyn VendorDriver>,
    state: AcceleratorState,
    profile: PowerProfile,
    level: u32,
    pub(crate) threads: usize,
    default_threads: usize,
    errors: Option<Arc<ErrorHandler>>,
}

impl DeviceCore {
    pub fn new(spec: DeviceSpec, driver: Box<dyn VendorDriver>) -> Self {
        let profile = PowerProfile::default();
        Self {
            level: spec.range.level_for(profile),
            spec,
            driver,
            state: AcceleratorState::Uninitialized,
            profile,
            threads: 1,
            default_threads: 1,
            errors: None,
        }
    }

    /// Sets the thread count the core starts with and returns to on reset.
    pub fn with_default_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self.default_threads = self.threads;
        self
    }

    pub fn set_error_handler(&mut self, errors: Arc<ErrorHandler>) {
        self.errors = Some(errors);
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub fn state(&self) -> AcceleratorState {
        self.state
    }

    pub fn profile(&self) -> PowerProfile {
        self.profile
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn operations(&self) -> &'static [&'static str] {
        self.spec.operations
    }

    fn report(&self, message: &str) {
        if let Some(errors) = &self.errors {
            errors.report(message, ErrorSeverity::Error, ErrorCategory::Hardware, self.spec.name);
        }
    }

    fn not_initialized(&self) -> AcceleratorError {
        AcceleratorError::NotInitialized {
            accelerator: self.spec.name.to_string(),
        }
    }

    fn hardware(&self, detail: impl Into<String>) -> AcceleratorError {
        AcceleratorError::HardwareError {
            accelerator: self.spec.name.to_string(),
            detail: detail.into(),
        }
    }

    // ── Lifecycle ──────────────────────────────────────────────

    pub fn initialize(&mut self) -> Result<(), AcceleratorError> {
        if !self.state.can_initialize() {
            return Err(AcceleratorError::InitializationFailed {
                accelerator: self.spec.name.to_string(),
                detail: "already initialized".to_string(),
            });
        }
        self.state = AcceleratorState::Initializing;
        if let Err(e) = self.open_session() {
            self.state = AcceleratorState::Error;
            let detail = e.to_string();
            self.report(&format!("initialization failed: {detail}"));
            return Err(AcceleratorError::InitializationFailed {
                accelerator: self.spec.name.to_string(),
                detail,
            });
        }
        self.state = AcceleratorState::Ready;
        info!(
            accelerator = self.spec.name,
            present = self.driver.device_present(),
            level = self.level,
            "accelerator initialized"
        );
        Ok(())
    }

    fn open_session(&mut self) -> Result<(), crate::DriverError> {
        self.driver.open()?;
        if let Err(e) = self.driver.apply_power_level(self.level) {
            self.driver.close();
            return Err(e);
        }
        Ok(())
    }

    pub fn is_available(&self) -> bool {
        self.state == AcceleratorState::Ready && self.driver.device_present()
    }

    /// Closes the session. Idempotent.
    pub fn release(&mut self) {
        if self.state.is_initialized() {
            self.driver.close();
        }
        if self.state != AcceleratorState::Released {
            info!(accelerator = self.spec.name, "accelerator released");
        }
        self.state = AcceleratorState::Released;
    }

    /// Closes and reopens the session with the default profile and thread
    /// count.
    pub fn reset(&mut self) -> bool {
        if self.state == AcceleratorState::Released {
            return false;
        }
        self.driver.close();
        self.profile = PowerProfile::default();
        self.level = self.spec.range.level_for(self.profile);
        self.threads = self.default_threads;
        self.state = AcceleratorState::Initializing;
        match self.open_session() {
            Ok(()) => {
                self.state = AcceleratorState::Ready;
                info!(accelerator = self.spec.name, "accelerator reset");
                true
            }
            Err(e) => {
                self.state = AcceleratorState::Error;
                warn!(accelerator = self.spec.name, error = %e, "accelerator reset failed");
                false
            }
        }
    }

    // ── Execution ──────────────────────────────────────────────

    /// Runs one inference. Returns the wall-clock time spent in the driver.
    pub fn run(
        &mut self,
        input: &[f32],
        output: &mut Vec<f32>,
        metrics: Option<&mut AcceleratorMetrics>,
    ) -> Result<Duration, AcceleratorError> {
        match self.state {
            AcceleratorState::Ready => {}
            AcceleratorState::Error => {
                return Err(self.hardware("accelerator in error state; reset required"))
            }
            _ => return Err(self.not_initialized()),
        }
        if !self.driver.device_present() {
            return Err(AcceleratorError::Unavailable {
                accelerator: self.spec.name.to_string(),
            });
        }
        if input.is_empty() {
            return Err(AcceleratorError::invalid("empty input buffer"));
        }

        self.state = AcceleratorState::Running;
        let start = Instant::now();
        let result = self.driver.execute(ExecutionRequest {
            input,
            power_level: self.level,
            threads: self.threads,
        });
        let elapsed = start.elapsed();

        match result {
            Ok(out) => {
                self.state = AcceleratorState::Ready;
                output.clear();
                output.extend_from_slice(&out.values);
                if let Some(m) = metrics {
                    m.elapsed = elapsed;
                    m.estimated_power_mw = out.power_mw;
                    m.utilization_percent = out.utilization_percent;
                }
                debug!(
                    accelerator = self.spec.name,
                    elapsed_us = elapsed.as_micros() as u64,
                    "inference complete"
                );
                Ok(elapsed)
            }
            Err(e) => {
                self.state = AcceleratorState::Error;
                let detail = e.to_string();
                warn!(accelerator = self.spec.name, error = %detail, "inference failed");
                self.report(&format!("execution failed: {detail}"));
                Err(self.hardware(detail))
            }
        }
    }

    // ── Power ──────────────────────────────────────────────────

    pub fn set_profile(&mut self, profile: PowerProfile) -> Result<(), AcceleratorError> {
        let level = self.spec.range.level_for(profile);
        self.apply_level(level)?;
        self.profile = profile;
        Ok(())
    }

    /// Sets a raw vendor level; the profile then reads back as the
    /// closest named profile.
    pub fn set_level(&mut self, level: u32) -> Result<(), AcceleratorError> {
        if !self.spec.range.contains(level) {
            return Err(AcceleratorError::invalid(format!(
                "{}: power level {level} outside {}",
                self.spec.name, self.spec.range
            )));
        }
        self.apply_level(level)?;
        self.profile = self.spec.range.profile_for(level);
        Ok(())
    }

    fn apply_level(&mut self, level: u32) -> Result<(), AcceleratorError> {
        match self.state {
            AcceleratorState::Released => return Err(self.not_initialized()),
            AcceleratorState::Ready | AcceleratorState::Running => {
                if let Err(e) = self.driver.apply_power_level(level) {
                    self.state = AcceleratorState::Error;
                    let detail = e.to_string();
                    warn!(
                        accelerator = self.spec.name,
                        level,
                        error = %detail,
                        "power level change failed"
                    );
                    self.report(&format!("power level change failed: {detail}"));
                    return Err(self.hardware(detail));
                }
            }
            // Applied when the session opens.
            AcceleratorState::Uninitialized
            | AcceleratorState::Initializing
            | AcceleratorState::Error => {}
        }
        debug!(accelerator = self.spec.name, level, "power level set");
        self.level = level;
        Ok(())
    }

    /// Fails with `NotInitialized` once released.
    pub fn ensure_not_released(&self) -> Result<(), AcceleratorError> {
        if self.state == AcceleratorState::Released {
            Err(self.not_initialized())
        } else {
            Ok(())
        }
    }

    pub fn descriptor(&self) -> AcceleratorDescriptor {
        AcceleratorDescriptor {
            name: self.spec.name.to_string(),
            display_name: self.spec.display_name.to_string(),
            supported_operations: self.spec.operations.iter().map(|s| s.to_string()).collect(),
            power_profile: self.profile,
            power_level: self.level,
            power_range: self.spec.range,
            state: self.state,
            driver_version: self.driver.driver_version(),
            firmware_version: self.driver.firmware_version(),
        }
    }
}
