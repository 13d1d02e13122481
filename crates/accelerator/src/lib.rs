// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # accelerator
//!
//! One capability interface over heterogeneous inference hardware.
//!
//! Every backend implements [`Accelerator`] and is used as
//! `Box<dyn Accelerator>`, so the inference engine never knows which vendor
//! it is talking to:
//!
//! ```text
//!                 Box<dyn Accelerator>
//!        ┌──────────────┼──────────────────┐
//!   HexagonDsp     NeuroPilotApu     CpuAccelerator
//!  (levels 0-5)    (levels 1-4)       (levels 0-2)
//!        │              │                  │
//!   dyn VendorDriver  dyn VendorDriver   host kernel
//! ```
//!
//! Vendor SDKs are reached only through [`VendorDriver`]; the
//! [`SimulatedDriver`] stands in for them on development hosts.
//! [`AcceleratorRegistry`] maps names such as `"hexagon-dsp"` to factories.

/// Forwards the lifecycle, power and query methods of [`Accelerator`] to a
/// `core: DeviceCore` field. `reset_state` stays with each backend, which
/// clears its own knobs before resetting the core.
macro_rules! delegate_to_core {
    () => {
        fn name(&self) -> &str {
            self.core.name()
        }

        fn descriptor(&self) -> $crate::AcceleratorDescriptor {
            self.core.descriptor()
        }

        fn state(&self) -> $crate::AcceleratorState {
            self.core.state()
        }

        fn initialize(&mut self) -> Result<(), $crate::AcceleratorError> {
            self.core.initialize()
        }

        fn is_available(&self) -> bool {
            self.core.is_available()
        }

        fn set_power_profile(
            &mut self,
            profile: $crate::PowerProfile,
        ) -> Result<(), $crate::AcceleratorError> {
            self.core.set_profile(profile)
        }

        fn power_profile(&self) -> $crate::PowerProfile {
            self.core.profile()
        }

        fn supported_operations(&self) -> &[&'static str] {
            self.core.operations()
        }

        fn release_resources(&mut self) {
            self.core.release()
        }
    };
}

mod cpu;
mod device;
mod driver;
mod error;
mod hexagon;
pub mod kernel;
mod neuropilot;
mod profile;
mod registry;
mod state;

pub use cpu::CpuAccelerator;
pub use driver::{status, ExecutionOutput, ExecutionRequest, SimulatedDriver, VendorDriver};
pub use error::{AcceleratorError, DriverError, ErrorCode};
pub use hexagon::HexagonDsp;
pub use neuropilot::NeuroPilotApu;
pub use profile::{PowerProfile, PowerRange};
pub use registry::{AcceleratorFactory, AcceleratorKind, AcceleratorRegistry};
pub use state::{AcceleratorDescriptor, AcceleratorState};

use std::fmt;
use std::time::Duration;

/// Per-call figures reported by an accelerator.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AcceleratorMetrics {
    pub elapsed: Duration,
    pub estimated_power_mw: f64,
    pub utilization_percent: f64,
}

/// Capability interface implemented by every inference backend.
///
/// # Lifecycle
/// `initialize` → (`run_inference` | `set_power_profile`)* →
/// `release_resources`. A failed call moves the accelerator to
/// [`AcceleratorState::Error`]; only [`reset_state`](Self::reset_state)
/// brings it back. A released accelerator may be initialized again.
pub trait Accelerator: Send + fmt::Debug {
    /// Registry name, e.g. `"neuropilot-apu"`.
    fn name(&self) -> &str;

    fn descriptor(&self) -> AcceleratorDescriptor;

    fn state(&self) -> AcceleratorState;

    /// Opens the device session and applies the configured power level.
    fn initialize(&mut self) -> Result<(), AcceleratorError>;

    /// `true` when ready and the hardware is present. Never has side effects.
    fn is_available(&self) -> bool;

    /// Runs one inference, replacing the contents of `output`.
    fn run_inference(
        &mut self,
        input: &[f32],
        output: &mut Vec<f32>,
        metrics: Option<&mut AcceleratorMetrics>,
    ) -> Result<(), AcceleratorError>;

    fn set_power_profile(&mut self, profile: PowerProfile) -> Result<(), AcceleratorError>;

    fn power_profile(&self) -> PowerProfile;

    fn supported_operations(&self) -> &[&'static str];

    fn supports_operation(&self, operation: &str) -> bool {
        self.supported_operations().iter().any(|op| *op == operation)
    }

    /// Closes the session. Idempotent.
    fn release_resources(&mut self);

    /// Tears down and reinitializes with the default configuration.
    ///
    /// Returns `false` after release or if the device cannot be reopened.
    fn reset_state(&mut self) -> bool;

    /// Sets the worker thread count. `false` if unsupported or out of range.
    fn set_thread_count(&mut self, _threads: usize) -> bool {
        false
    }

    /// Sets the on-device cache size. `false` if unsupported.
    fn configure_cache(&mut self, _bytes: usize) -> bool {
        false
    }
}
