// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Qualcomm Hexagon DSP backend.
//!
//! Power levels 0–5 map onto the DSP's clock/voltage corners. FastRPC and
//! the DSP-side cache are vendor knobs outside the common interface.

use crate::device::{DeviceCore, DeviceSpec};
use crate::{
    Accelerator, AcceleratorError, AcceleratorMetrics, PowerRange, SimulatedDriver, VendorDriver,
};
use recovery::ErrorHandler;
use std::sync::Arc;
use tracing::info;

const SPEC: DeviceSpec = DeviceSpec {
    name: "hexagon-dsp",
    display_name: "Qualcomm Hexagon DSP",
    range: PowerRange::new(0, 5),
    operations: &[
        "CONV_2D",
        "DEPTHWISE_CONV_2D",
        "FULLY_CONNECTED",
        "QUANTIZED_16_BIT_LSTM",
        "HASHTABLE_LOOKUP",
        "SOFTMAX",
        "AVERAGE_POOL_2D",
        "MAX_POOL_2D",
    ],
};

#[derive(Debug)]
pub struct HexagonDsp {
    core: DeviceCore,
    fast_rpc: bool,
    cache_bytes: usize,
}

impl Default for HexagonDsp {
    fn default() -> Self {
        Self::new()
    }
}

impl HexagonDsp {
    /// A DSP backed by the simulated driver.
    pub fn new() -> Self {
        Self::with_driver(Box::new(
            SimulatedDriver::new(SPEC.range).with_power_model(120.0, 880.0),
        ))
    }

    pub fn with_driver(driver: Box<dyn VendorDriver>) -> Self {
        Self {
            core: DeviceCore::new(SPEC, driver),
            fast_rpc: false,
            cache_bytes: 0,
        }
    }

    /// Reports initialization and execution failures to `errors`.
    pub fn with_error_handler(mut self, errors: Arc<ErrorHandler>) -> Self {
        self.core.set_error_handler(errors);
        self
    }

    pub fn power_range() -> PowerRange {
        SPEC.range
    }

    /// Sets the raw DSP power level (0–5).
    pub fn set_dsp_power_level(&mut self, level: u32) -> Result<(), AcceleratorError> {
        self.core.set_level(level)
    }

    pub fn dsp_power_level(&self) -> u32 {
        self.core.level()
    }

    /// Switches host↔DSP calls to the FastRPC transport.
    pub fn enable_fast_rpc(&mut self) -> Result<(), AcceleratorError> {
        self.core.ensure_not_released()?;
        self.fast_rpc = true;
        info!("hexagon FastRPC enabled");
        Ok(())
    }

    pub fn fast_rpc_enabled(&self) -> bool {
        self.fast_rpc
    }

    pub fn cache_size(&self) -> usize {
        self.cache_bytes
    }
}

impl Accelerator for HexagonDsp {
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
        if self.core.ensure_not_released().is_err() {
            return false;
        }
        self.fast_rpc = false;
        self.cache_bytes = 0;
        self.core.reset()
    }

    fn configure_cache(&mut self, bytes: usize) -> bool {
        if self.core.ensure_not_released().is_err() {
            return false;
        }
        self.cache_bytes = bytes;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AcceleratorState, ErrorCode, PowerProfile};
    use recovery::{ErrorCategory, ErrorSeverity};

    #[test]
    fn test_not_available_before_initialize() {
        let dsp = HexagonDsp::new();
        assert!(!dsp.is_available());
        assert_eq!(dsp.state(), AcceleratorState::Uninitialized);
    }

    #[test]
    fn test_run_before_initialize() {
        let mut dsp = HexagonDsp::new();
        let mut out = Vec::new();
        let err = dsp.run_inference(&[1.0], &mut out, None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotInitialized);
    }

    #[test]
    fn test_balanced_maps_to_level_two() {
        let mut dsp = HexagonDsp::new();
        dsp.initialize().unwrap();
        dsp.set_power_profile(PowerProfile::Balanced).unwrap();
        assert_eq!(dsp.dsp_power_level(), 2);
        assert_eq!(dsp.power_profile(), PowerProfile::Balanced);

        dsp.set_power_profile(PowerProfile::HighPerformance).unwrap();
        assert_eq!(dsp.dsp_power_level(), 5);
    }

    #[test]
    fn test_dsp_power_level_bounds() {
        let mut dsp = HexagonDsp::new();
        dsp.initialize().unwrap();
        assert_eq!(
            dsp.set_dsp_power_level(6).unwrap_err().code(),
            ErrorCode::InvalidArgument
        );
        dsp.set_dsp_power_level(0).unwrap();
        assert_eq!(dsp.power_profile(), PowerProfile::LowPower);
        dsp.set_dsp_power_level(4).unwrap();
        assert_eq!(dsp.power_profile(), PowerProfile::Balanced);
    }

    #[test]
    fn test_inference_fills_metrics() {
        let mut dsp = HexagonDsp::new();
        dsp.initialize().unwrap();
        assert!(dsp.is_available());

        let mut out = Vec::new();
        let mut metrics = AcceleratorMetrics::default();
        dsp.run_inference(&[0.5, 1.5], &mut out, Some(&mut metrics)).unwrap();
        assert_eq!(out, vec![0.5, 1.5]);
        assert!(metrics.utilization_percent > 0.0);
        assert!(metrics.estimated_power_mw > 0.0);
        assert_eq!(dsp.state(), AcceleratorState::Ready);
    }

    #[test]
    fn test_double_initialize_fails() {
        let mut dsp = HexagonDsp::new();
        dsp.initialize().unwrap();
        let err = dsp.initialize().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InitializationFailed);
        assert!(err.to_string().contains("already initialized"));
    }

    #[test]
    fn test_absent_hardware_unavailable() {
        let mut dsp = HexagonDsp::with_driver(Box::new(
            SimulatedDriver::new(HexagonDsp::power_range()).absent(),
        ));
        dsp.initialize().unwrap();
        assert!(!dsp.is_available());
        let err = dsp.run_inference(&[1.0], &mut Vec::new(), None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unavailable);
    }

    #[test]
    fn test_execution_failure_enters_error_until_reset() {
        let errors = Arc::new(ErrorHandler::new());
        errors.set_automatic_recovery(false);
        let mut dsp = HexagonDsp::with_driver(Box::new(
            SimulatedDriver::new(HexagonDsp::power_range()).failing_first(1),
        ))
        .with_error_handler(Arc::clone(&errors));
        dsp.initialize().unwrap();

        let mut out = Vec::new();
        let err = dsp.run_inference(&[1.0], &mut out, None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::HardwareError);
        assert_eq!(dsp.state(), AcceleratorState::Error);
        assert!(!dsp.is_available());

        // Still in error: rejected without touching the driver.
        let err = dsp.run_inference(&[1.0], &mut out, None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::HardwareError);

        assert!(dsp.reset_state());
        assert_eq!(dsp.state(), AcceleratorState::Ready);
        dsp.run_inference(&[1.0], &mut out, None).unwrap();

        let history = errors.error_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].category, ErrorCategory::Hardware);
        assert_eq!(history[0].severity, ErrorSeverity::Error);
        assert_eq!(history[0].component, "hexagon-dsp");
    }

    #[test]
    fn test_failing_open_reports() {
        let errors = Arc::new(ErrorHandler::new());
        errors.set_automatic_recovery(false);
        let mut dsp = HexagonDsp::with_driver(Box::new(
            SimulatedDriver::new(HexagonDsp::power_range()).failing_open(),
        ))
        .with_error_handler(Arc::clone(&errors));

        assert_eq!(dsp.initialize().unwrap_err().code(), ErrorCode::InitializationFailed);
        assert_eq!(dsp.state(), AcceleratorState::Error);
        assert!(!dsp.reset_state());
        assert_eq!(errors.error_history().len(), 1);
    }

    #[test]
    fn test_release_and_reinitialize() {
        let mut dsp = HexagonDsp::new();
        dsp.initialize().unwrap();
        dsp.release_resources();
        dsp.release_resources();
        assert_eq!(dsp.state(), AcceleratorState::Released);
        assert!(!dsp.is_available());
        assert!(!dsp.reset_state());
        assert!(!dsp.configure_cache(1 << 20));
        assert_eq!(
            dsp.set_power_profile(PowerProfile::LowPower).unwrap_err().code(),
            ErrorCode::NotInitialized
        );
        assert_eq!(
            dsp.run_inference(&[1.0], &mut Vec::new(), None).unwrap_err().code(),
            ErrorCode::NotInitialized
        );

        dsp.initialize().unwrap();
        assert!(dsp.is_available());
    }

    #[test]
    fn test_vendor_knobs() {
        let mut dsp = HexagonDsp::new();
        dsp.initialize().unwrap();
        dsp.enable_fast_rpc().unwrap();
        assert!(dsp.fast_rpc_enabled());
        assert!(dsp.configure_cache(2 << 20));
        assert_eq!(dsp.cache_size(), 2 << 20);
        assert!(!dsp.set_thread_count(4));
    }

    #[test]
    fn test_power_change_failure_enters_error() {
        let errors = Arc::new(ErrorHandler::new());
        errors.set_automatic_recovery(false);
        let mut dsp = HexagonDsp::with_driver(Box::new(
            SimulatedDriver::new(HexagonDsp::power_range()).failing_power_change(),
        ))
        .with_error_handler(Arc::clone(&errors));
        dsp.initialize().unwrap();
        assert_eq!(dsp.state(), AcceleratorState::Ready);

        let err = dsp.set_power_profile(PowerProfile::LowPower).unwrap_err();
        assert_eq!(err.code(), ErrorCode::HardwareError);
        assert_eq!(dsp.state(), AcceleratorState::Error);
        assert!(!dsp.is_available());
        assert_eq!(dsp.power_profile(), PowerProfile::Balanced);
        assert_eq!(dsp.dsp_power_level(), 2);

        let history = errors.error_history();
        assert_eq!(history.len(), 1);
        assert!(history[0].message.contains("power level change failed"));

        // Reopening applies the default level again, which the rail accepts.
        assert!(dsp.reset_state());
        assert!(dsp.is_available());
    }

    #[test]
    fn test_reset_clears_vendor_knobs() {
        let mut dsp = HexagonDsp::new();
        dsp.initialize().unwrap();
        dsp.enable_fast_rpc().unwrap();
        assert!(dsp.configure_cache(4 << 20));
        dsp.set_dsp_power_level(5).unwrap();

        assert!(dsp.reset_state());
        assert!(!dsp.fast_rpc_enabled());
        assert_eq!(dsp.cache_size(), 0);
        assert_eq!(dsp.dsp_power_level(), 2);
        assert_eq!(dsp.power_profile(), PowerProfile::Balanced);
    }

    #[test]
    fn test_supported_operations() {
        let dsp = HexagonDsp::new();
        assert!(dsp.supports_operation("QUANTIZED_16_BIT_LSTM"));
        assert!(!dsp.supports_operation("RELU"));
        assert_eq!(dsp.descriptor().supported_operations.len(), 8);
    }
}
