// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The inference engine with a type-state–enforced lifecycle.
//!
//! ```text
//! InferenceEngine<Idle>
//!     │  .initialize(Box<dyn Accelerator>)
//!     ▼
//! InferenceEngine<Ready> ── .load_model() / .run_inference() / .run_batch_inference()
//!     │  .release_resources()
//!     ▼
//! InferenceEngine<Idle>
//! ```
//!
//! The `Ready` state owns the accelerator, so an engine without one cannot
//! be asked to run anything.
//!
//! # Dispatch
//! A call goes to the accelerator only when hardware acceleration is
//! enabled and the accelerator reports itself available. If it fails, the
//! failure is reported as a Hardware error; when recovery succeeds the
//! accelerator is reset and tried once more. Anything else lands on the
//! [`CpuExecutor`].

use crate::{
    CpuExecutor, ExecutionPath, InferenceMetrics, LoadedModel, MemoryLimit, ModelConfig,
    ModelFormat, ModelOptimizer, RuntimeConfig, RuntimeError,
};
use accelerator::{Accelerator, AcceleratorDescriptor, AcceleratorMetrics, PowerProfile};
use recovery::{ErrorCategory, ErrorHandler, ErrorSeverity};
use resource_monitor::{PowerInfo, ProcessStats, SystemSnapshot};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Component name used in error reports.
const COMPONENT: &str = "inference-engine";

// ── Type-state markers ─────────────────────────────────────────

/// No accelerator held.
#[derive(Debug)]
pub struct Idle;

/// Holds an initialized accelerator and, once loaded, a model.
#[derive(Debug)]
pub struct Ready {
    accelerator: Box<dyn Accelerator>,
    model: Option<LoadedModel>,
    /// Last (input, output) pair, kept when the model enables caching.
    cache: Option<(Vec<f32>, Vec<f32>)>,
}

mod sealed {
    use accelerator::Accelerator;

    pub trait Sealed {
        fn accelerator_mut(&mut self) -> Option<&mut (dyn Accelerator + 'static)> {
            None
        }
    }
}

/// Sealed trait for engine states.
pub trait EngineState: sealed::Sealed + fmt::Debug {}

impl sealed::Sealed for Idle {}
impl sealed::Sealed for Ready {
    fn accelerator_mut(&mut self) -> Option<&mut (dyn Accelerator + 'static)> {
        Some(self.accelerator.as_mut())
    }
}
impl EngineState for Idle {}
impl EngineState for Ready {}

// ── Outputs ────────────────────────────────────────────────────

/// Result of one inference call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceOutput {
    pub values: Vec<f32>,
    /// Present when profiling is enabled.
    pub metrics: Option<InferenceMetrics>,
}

/// One failed item of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    pub index: usize,
    pub error: String,
}

/// Result of a batch call. Items that failed have `None` outputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutput {
    pub outputs: Vec<Option<Vec<f32>>>,
    pub failures: Vec<BatchFailure>,
    /// Summed time and worst-case resource figures over the successful items.
    pub metrics: Option<InferenceMetrics>,
}

impl BatchOutput {
    /// `true` when every item succeeded.
    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.outputs.iter().filter(|o| o.is_some()).count()
    }
}

// ── Engine ─────────────────────────────────────────────────────

/// The primary inference engine.
///
/// `S` is a type-state marker. Inference and model loading exist only on
/// `InferenceEngine<Ready>`; the compiler rejects them on an idle engine.
///
/// # Example
/// ```
/// use accelerator::CpuAccelerator;
/// use recovery::ErrorHandler;
/// use runtime::{InferenceEngine, ModelConfig, ModelFormat, RuntimeConfig};
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), runtime::RuntimeError> {
/// let errors = Arc::new(ErrorHandler::new());
/// let mut engine = InferenceEngine::new(RuntimeConfig::default(), errors)?
///     .initialize(Box::new(CpuAccelerator::new()))?;
/// engine.load_model_from_bytes("demo", vec![0; 64], ModelFormat::TfLite, ModelConfig::default())?;
///
/// let output = engine.run_inference(&[0.25, 0.5, 0.75])?;
/// assert_eq!(output.values.len(), 3);
/// # Ok(())
/// # }
/// ```
pub struct InferenceEngine<S: EngineState = Idle> {
    config: RuntimeConfig,
    errors: Arc<ErrorHandler>,
    memory_limit: Option<MemoryLimit>,
    executor: CpuExecutor,
    state: S,
}

// ── Any state: configuration ───────────────────────────────────

impl<S: EngineState> InferenceEngine<S> {
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The shared error subsystem this engine reports to.
    pub fn errors(&self) -> &Arc<ErrorHandler> {
        &self.errors
    }

    pub fn num_threads(&self) -> usize {
        self.executor.threads()
    }

    /// Sets the worker thread count for the fallback path and, where the
    /// accelerator supports it, the accelerator.
    pub fn set_num_threads(&mut self, threads: usize) -> Result<(), RuntimeError> {
        if threads == 0 {
            return Err(RuntimeError::InvalidConfig("num_threads must be at least 1".into()));
        }
        self.config.num_threads = Some(threads);
        self.executor.set_threads(threads);
        if let Some(acc) = self.state.accelerator_mut() {
            if !acc.set_thread_count(threads) {
                debug!(
                    accelerator = acc.name(),
                    threads,
                    "thread count not applied to accelerator"
                );
            }
        }
        Ok(())
    }

    pub fn enable_hardware_acceleration(&mut self, enabled: bool) {
        self.config.enable_hardware_acceleration = enabled;
    }

    pub fn hardware_acceleration_enabled(&self) -> bool {
        self.config.enable_hardware_acceleration
    }

    /// Sets the power profile, forwarding it to a held accelerator.
    pub fn set_power_profile(&mut self, profile: PowerProfile) -> Result<(), RuntimeError> {
        if let Some(acc) = self.state.accelerator_mut() {
            acc.set_power_profile(profile)?;
        }
        self.config.power_profile = profile;
        Ok(())
    }

    /// `None` removes the limit.
    pub fn set_memory_limit(&mut self, limit: Option<MemoryLimit>) {
        self.memory_limit = limit;
        self.config.memory_limit = limit.map(|l| l.to_string().replace(' ', ""));
    }

    pub fn memory_limit(&self) -> Option<MemoryLimit> {
        self.memory_limit
    }

    pub fn enable_profiling(&mut self, enabled: bool) {
        self.config.enable_profiling = enabled;
    }

    fn with_state<T: EngineState>(self, state: T) -> InferenceEngine<T> {
        InferenceEngine {
            config: self.config,
            errors: self.errors,
            memory_limit: self.memory_limit,
            executor: self.executor,
            state,
        }
    }

    fn report(&self, message: &str, severity: ErrorSeverity, category: ErrorCategory) {
        self.errors.report(message, severity, category, COMPONENT);
    }
}

// ── Idle → Ready ───────────────────────────────────────────────

impl InferenceEngine<Idle> {
    /// Creates an engine from a validated configuration.
    pub fn new(config: RuntimeConfig, errors: Arc<ErrorHandler>) -> Result<Self, RuntimeError> {
        config.validate()?;
        let memory_limit = config.parse_memory_limit()?;
        let executor = CpuExecutor::new(config.resolve_threads());
        info!(
            accelerator = %config.accelerator,
            threads = executor.threads(),
            "engine created"
        );
        Ok(Self {
            config,
            errors,
            memory_limit,
            executor,
            state: Idle,
        })
    }

    /// Takes ownership of `accelerator`, initializes it and applies the
    /// configured power profile and thread count.
    ///
    /// An initialization failure is reported as a Hardware error.
    pub fn initialize(
        self,
        mut accelerator: Box<dyn Accelerator>,
    ) -> Result<InferenceEngine<Ready>, RuntimeError> {
        if let Err(e) = accelerator.initialize() {
            self.report(
                &format!("accelerator initialization failed: {e}"),
                ErrorSeverity::Error,
                ErrorCategory::Hardware,
            );
            return Err(e.into());
        }
        if let Err(e) = accelerator.set_power_profile(self.config.power_profile) {
            self.report(
                &format!(
                    "applying power profile {} failed: {e}",
                    self.config.power_profile
                ),
                ErrorSeverity::Error,
                ErrorCategory::Hardware,
            );
            accelerator.release_resources();
            return Err(e.into());
        }
        if !accelerator.set_thread_count(self.executor.threads()) {
            debug!(accelerator = accelerator.name(), "accelerator has no thread knob");
        }

        info!(
            accelerator = accelerator.name(),
            available = accelerator.is_available(),
            profile = %accelerator.power_profile(),
            "engine ready"
        );
        warn_if_constrained();

        Ok(self.with_state(Ready {
            accelerator,
            model: None,
            cache: None,
        }))
    }
}

// ── Ready ──────────────────────────────────────────────────────

impl InferenceEngine<Ready> {
    // ── Model loading ──────────────────────────────────────────

    /// Loads a model file. `format` is detected from the extension when `None`.
    pub fn load_model(
        &mut self,
        path: &Path,
        format: Option<ModelFormat>,
        config: ModelConfig,
    ) -> Result<(), RuntimeError> {
        let format = match format {
            Some(f) => f,
            None => ModelFormat::from_path(path)?,
        };
        config.validate()?;

        let bytes = std::fs::read(path).map_err(|source| {
            self.report(
                &format!("cannot read model '{}': {source}", path.display()),
                ErrorSeverity::Error,
                ErrorCategory::Model,
            );
            RuntimeError::ModelLoad {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());
        self.install_model(LoadedModel {
            name,
            path: Some(path.to_path_buf()),
            format,
            bytes,
            config,
            optimization: None,
        })
    }

    /// Loads a model from an in-memory, already decrypted buffer.
    pub fn load_model_from_bytes(
        &mut self,
        name: &str,
        bytes: Vec<u8>,
        format: ModelFormat,
        config: ModelConfig,
    ) -> Result<(), RuntimeError> {
        config.validate()?;
        self.install_model(LoadedModel {
            name: name.to_string(),
            path: None,
            format,
            bytes,
            config,
            optimization: None,
        })
    }

    fn install_model(&mut self, mut model: LoadedModel) -> Result<(), RuntimeError> {
        if model.bytes.is_empty() {
            return Err(RuntimeError::InvalidInput(format!("model '{}' is empty", model.name)));
        }
        if model.config.enable_optimization {
            let optimization = model.config.optimization.clone().unwrap_or_default();
            let supported = self.state.accelerator.supported_operations();
            match ModelOptimizer::optimize(&model, &optimization, supported) {
                Ok(report) => model.optimization = Some(report),
                Err(e) => {
                    self.report(
                        &format!("optimizing '{}' failed: {e}", model.name),
                        ErrorSeverity::Error,
                        ErrorCategory::Model,
                    );
                    return Err(e);
                }
            }
        }

        info!("{}", model.summary());
        self.state.cache = None;
        self.state.model = Some(model);
        warn_if_constrained();
        Ok(())
    }

    pub fn model(&self) -> Option<&LoadedModel> {
        self.state.model.as_ref()
    }

    pub fn model_info(&self) -> String {
        self.state
            .model
            .as_ref()
            .map(LoadedModel::summary)
            .unwrap_or_else(|| "No model loaded".to_string())
    }

    // ── Accelerator ────────────────────────────────────────────

    pub fn accelerator(&self) -> &dyn Accelerator {
        self.state.accelerator.as_ref()
    }

    pub fn accelerator_descriptor(&self) -> AcceleratorDescriptor {
        self.state.accelerator.descriptor()
    }

    /// Brings a failed accelerator back to `Ready`.
    pub fn reset_accelerator(&mut self) -> bool {
        self.state.accelerator.reset_state()
    }

    // ── Inference ──────────────────────────────────────────────

    /// Runs one inference.
    ///
    /// Rejects empty input and over-limit calls before any backend runs.
    pub fn run_inference(&mut self, input: &[f32]) -> Result<InferenceOutput, RuntimeError> {
        if input.is_empty() {
            return Err(RuntimeError::InvalidInput("empty input buffer".into()));
        }
        let (model_bytes, caching) = match &self.state.model {
            Some(m) => (m.size_bytes(), m.config.enable_caching),
            None => return Err(RuntimeError::NoModelLoaded),
        };
        self.check_memory(model_bytes, input.len())?;

        let profiling = self.config.enable_profiling;
        let before = profiling.then(|| ProcessStats::read().ok()).flatten();
        let start = Instant::now();

        let mut values = Vec::with_capacity(input.len());
        let (path, accel) = match self.cached(caching, input) {
            Some(hit) => {
                values = hit;
                (ExecutionPath::Cached, None)
            }
            None => self.execute(input, &mut values),
        };
        let elapsed = start.elapsed();

        if caching && path != ExecutionPath::Cached {
            self.state.cache = Some((input.to_vec(), values.clone()));
        }

        let metrics = profiling.then(|| {
            let after = ProcessStats::read().ok();
            let (memory_mb, cpu_percent) = match (before, after) {
                (Some(b), Some(a)) => (a.rss_mb(), a.cpu_percent_since(&b)),
                (None, Some(a)) => (a.rss_mb(), 0.0),
                _ => (0.0, 0.0),
            };
            InferenceMetrics {
                elapsed_ms: elapsed.as_secs_f64() * 1000.0,
                memory_mb,
                cpu_percent,
                accelerator_utilization_percent: accel.map_or(0.0, |m| m.utilization_percent),
                estimated_power_mw: accel.map_or_else(battery_power_mw, |m| m.estimated_power_mw),
                path,
            }
        });
        if let Some(m) = &metrics {
            debug!("{}", m.summary());
        }
        Ok(InferenceOutput { values, metrics })
    }

    /// Runs every input in turn.
    ///
    /// The whole batch is rejected up front when it is empty, no model is
    /// loaded, or it exceeds the model's `max_batch_size`. Per-item failures
    /// are collected and the remaining items still run.
    pub fn run_batch_inference(
        &mut self,
        inputs: &[Vec<f32>],
    ) -> Result<BatchOutput, RuntimeError> {
        if inputs.is_empty() {
            return Err(RuntimeError::InvalidInput("empty batch".into()));
        }
        let max = match &self.state.model {
            Some(m) => m.config.max_batch_size,
            None => return Err(RuntimeError::NoModelLoaded),
        };
        if inputs.len() > max {
            return Err(RuntimeError::BatchTooLarge {
                size: inputs.len(),
                max,
            });
        }

        let mut outputs = Vec::with_capacity(inputs.len());
        let mut failures = Vec::new();
        let mut metrics = self.config.enable_profiling.then(InferenceMetrics::batch_total);

        for (index, input) in inputs.iter().enumerate() {
            match self.run_inference(input) {
                Ok(out) => {
                    if let (Some(total), Some(item)) = (metrics.as_mut(), out.metrics.as_ref()) {
                        total.accumulate(item);
                    }
                    outputs.push(Some(out.values));
                }
                Err(e) => {
                    warn!(index, error = %e, "batch item failed");
                    failures.push(BatchFailure {
                        index,
                        error: e.to_string(),
                    });
                    outputs.push(None);
                }
            }
        }

        Ok(BatchOutput {
            outputs,
            failures,
            metrics,
        })
    }

    // ── Release ────────────────────────────────────────────────

    /// Releases the accelerator, drops the model and restores the default
    /// configuration.
    pub fn release_resources(mut self) -> InferenceEngine<Idle> {
        self.state.accelerator.release_resources();
        info!(accelerator = self.state.accelerator.name(), "engine resources released");

        let config = RuntimeConfig::default();
        self.executor = CpuExecutor::new(config.resolve_threads());
        self.memory_limit = None;
        self.config = config;
        self.with_state(Idle)
    }

    // ── Private helpers ────────────────────────────────────────

    fn check_memory(&self, model_bytes: usize, input_len: usize) -> Result<(), RuntimeError> {
        let Some(limit) = self.memory_limit else {
            return Ok(());
        };
        // Input plus an output of the same shape.
        let buffers = input_len.saturating_mul(2 * std::mem::size_of::<f32>());
        let required = model_bytes.saturating_add(buffers);
        if limit.allows(required) {
            return Ok(());
        }
        self.report(
            &format!("inference needs {required} bytes, limit is {limit}"),
            ErrorSeverity::Error,
            ErrorCategory::Memory,
        );
        Err(RuntimeError::MemoryLimitExceeded { required, limit })
    }

    fn cached(&self, caching: bool, input: &[f32]) -> Option<Vec<f32>> {
        if !caching {
            return None;
        }
        match &self.state.cache {
            Some((last_input, last_output)) if last_input.as_slice() == input => {
                Some(last_output.clone())
            }
            _ => None,
        }
    }

    /// Runs `input` on the accelerator when possible, else on the CPU.
    fn execute(
        &mut self,
        input: &[f32],
        output: &mut Vec<f32>,
    ) -> (ExecutionPath, Option<AcceleratorMetrics>) {
        let acc = &mut self.state.accelerator;
        if !self.config.enable_hardware_acceleration {
            trace!("hardware acceleration disabled; running on CPU");
        } else if !acc.is_available() {
            debug!(
                accelerator = acc.name(),
                state = %acc.state(),
                "accelerator unavailable; running on CPU"
            );
        } else {
            let mut m = AcceleratorMetrics::default();
            match acc.run_inference(input, output, Some(&mut m)) {
                Ok(()) => return (ExecutionPath::Accelerator, Some(m)),
                Err(e) => {
                    let outcome = self.errors.report(
                        &format!("inference on {} failed: {e}", acc.name()),
                        ErrorSeverity::Error,
                        ErrorCategory::Hardware,
                        COMPONENT,
                    );
                    if outcome.is_recovered() && acc.reset_state() && acc.is_available() {
                        info!(accelerator = acc.name(), "accelerator recovered; retrying");
                        let mut m = AcceleratorMetrics::default();
                        match acc.run_inference(input, output, Some(&mut m)) {
                            Ok(()) => return (ExecutionPath::Accelerator, Some(m)),
                            Err(e) => warn!(
                                accelerator = acc.name(),
                                error = %e,
                                "retry after recovery failed"
                            ),
                        }
                    }
                    warn!(accelerator = acc.name(), "falling back to CPU");
                }
            }
        }
        self.executor.execute(input, output);
        (ExecutionPath::CpuFallback, None)
    }
}

impl<S: EngineState> fmt::Debug for InferenceEngine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("state", &std::any::type_name::<S>())
            .field("accelerator", &self.config.accelerator)
            .field("threads", &self.executor.threads())
            .field("hardware_acceleration", &self.config.enable_hardware_acceleration)
            .field("memory_limit", &self.memory_limit)
            .finish()
    }
}

/// Battery draw, or 0 on devices without a battery node.
fn battery_power_mw() -> f64 {
    PowerInfo::read().map(|p| p.power_mw).unwrap_or(0.0)
}

fn warn_if_constrained() {
    match SystemSnapshot::capture() {
        Ok(snapshot) if snapshot.is_resource_constrained() => {
            warn!("device under resource pressure: {}", snapshot.summary());
        }
        Ok(_) => {}
        Err(e) => debug!(error = %e, "system snapshot unavailable"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accelerator::{AcceleratorState, HexagonDsp, NeuroPilotApu, SimulatedDriver};
    use std::sync::atomic::Ordering;

    fn quiet_errors() -> Arc<ErrorHandler> {
        let errors = Arc::new(ErrorHandler::new());
        errors.set_automatic_recovery(false);
        errors
    }

    fn ready_with(acc: Box<dyn Accelerator>) -> InferenceEngine<Ready> {
        let mut engine = InferenceEngine::new(RuntimeConfig::default(), quiet_errors())
            .unwrap()
            .initialize(acc)
            .unwrap();
        engine
            .load_model_from_bytes("m", vec![1; 16], ModelFormat::TfLite, ModelConfig::default())
            .unwrap();
        engine
    }

    #[test]
    fn test_initialize_applies_profile() {
        let config = RuntimeConfig {
            power_profile: PowerProfile::HighPerformance,
            ..Default::default()
        };
        let engine = InferenceEngine::new(config, quiet_errors())
            .unwrap()
            .initialize(Box::new(HexagonDsp::new()))
            .unwrap();
        let desc = engine.accelerator_descriptor();
        assert_eq!(desc.power_level, 5);
        assert_eq!(desc.state, AcceleratorState::Ready);
    }

    #[test]
    fn test_initialize_failure_reported() {
        let errors = quiet_errors();
        let acc = HexagonDsp::with_driver(Box::new(
            SimulatedDriver::new(HexagonDsp::power_range()).failing_open(),
        ));
        let err = InferenceEngine::new(RuntimeConfig::default(), Arc::clone(&errors))
            .unwrap()
            .initialize(Box::new(acc))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Accelerator(_)));
        let history = errors.error_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].category, ErrorCategory::Hardware);
        assert_eq!(history[0].component, COMPONENT);
    }

    #[test]
    fn test_initialize_profile_failure_reported() {
        let errors = quiet_errors();
        let config = RuntimeConfig {
            power_profile: PowerProfile::HighPerformance,
            ..Default::default()
        };
        let acc = HexagonDsp::with_driver(Box::new(
            SimulatedDriver::new(HexagonDsp::power_range()).failing_power_change(),
        ));
        let err = InferenceEngine::new(config, Arc::clone(&errors))
            .unwrap()
            .initialize(Box::new(acc))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Accelerator(_)));
        let history = errors.error_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].category, ErrorCategory::Hardware);
        assert!(history[0].message.contains("power profile"));
    }

    #[test]
    fn test_failed_power_change_routes_to_cpu() {
        let driver = SimulatedDriver::new(HexagonDsp::power_range()).failing_power_change();
        let calls = driver.execution_counter();
        let mut engine = ready_with(Box::new(HexagonDsp::with_driver(Box::new(driver))));
        engine.run_inference(&[1.0]).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(engine.set_power_profile(PowerProfile::LowPower).is_err());
        assert_eq!(engine.accelerator().state(), AcceleratorState::Error);
        assert_eq!(engine.config().power_profile, PowerProfile::Balanced);

        let out = engine.run_inference(&[2.0]).unwrap();
        assert_eq!(out.values, vec![2.0]);
        assert_eq!(out.metrics.unwrap().path, ExecutionPath::CpuFallback);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_runs_on_accelerator() {
        let mut engine = ready_with(Box::new(NeuroPilotApu::new()));
        let out = engine.run_inference(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(out.values, vec![1.0, 2.0, 3.0]);
        let m = out.metrics.unwrap();
        assert_eq!(m.path, ExecutionPath::Accelerator);
        assert!(m.accelerator_utilization_percent > 0.0);
    }

    #[test]
    fn test_hardware_disabled_uses_fallback() {
        let mut engine = ready_with(Box::new(HexagonDsp::new()));
        engine.enable_hardware_acceleration(false);
        let out = engine.run_inference(&[4.0]).unwrap();
        let m = out.metrics.unwrap();
        assert_eq!(m.path, ExecutionPath::CpuFallback);
        assert_eq!(m.accelerator_utilization_percent, 0.0);
    }

    #[test]
    fn test_no_model_loaded() {
        let mut engine = InferenceEngine::new(RuntimeConfig::default(), quiet_errors())
            .unwrap()
            .initialize(Box::new(HexagonDsp::new()))
            .unwrap();
        assert!(matches!(engine.run_inference(&[1.0]), Err(RuntimeError::NoModelLoaded)));
        assert_eq!(engine.model_info(), "No model loaded");
    }

    #[test]
    fn test_failure_without_recovery_falls_back() {
        let errors = quiet_errors();
        let driver = SimulatedDriver::new(HexagonDsp::power_range()).failing_first(1);
        let calls = driver.execution_counter();
        let mut engine = InferenceEngine::new(RuntimeConfig::default(), Arc::clone(&errors))
            .unwrap()
            .initialize(Box::new(HexagonDsp::with_driver(Box::new(driver))))
            .unwrap();
        engine
            .load_model_from_bytes("m", vec![1; 4], ModelFormat::Onnx, ModelConfig::default())
            .unwrap();

        let out = engine.run_inference(&[1.0, 2.0]).unwrap();
        assert_eq!(out.values, vec![1.0, 2.0]);
        assert_eq!(out.metrics.unwrap().path, ExecutionPath::CpuFallback);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(errors.error_history()[0].category, ErrorCategory::Hardware);

        // The accelerator stays in error until reset.
        assert_eq!(engine.accelerator().state(), AcceleratorState::Error);
        engine.run_inference(&[1.0]).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(engine.reset_accelerator());
        let out = engine.run_inference(&[1.0]).unwrap();
        assert_eq!(out.metrics.unwrap().path, ExecutionPath::Accelerator);
    }

    #[test]
    fn test_recovery_retries_accelerator_once() {
        let errors = Arc::new(ErrorHandler::new());
        errors.set_base_delay(std::time::Duration::from_millis(1));
        errors.register_recovery_strategy(ErrorCategory::Hardware, |_| true);

        let driver = SimulatedDriver::new(HexagonDsp::power_range()).failing_first(1);
        let calls = driver.execution_counter();
        let mut engine = InferenceEngine::new(RuntimeConfig::default(), errors)
            .unwrap()
            .initialize(Box::new(HexagonDsp::with_driver(Box::new(driver))))
            .unwrap();
        engine
            .load_model_from_bytes("m", vec![1; 4], ModelFormat::Onnx, ModelConfig::default())
            .unwrap();

        let out = engine.run_inference(&[3.0]).unwrap();
        assert_eq!(out.metrics.unwrap().path, ExecutionPath::Accelerator);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_memory_limit() {
        let errors = quiet_errors();
        let mut engine = InferenceEngine::new(RuntimeConfig::default(), Arc::clone(&errors))
            .unwrap()
            .initialize(Box::new(HexagonDsp::new()))
            .unwrap();
        engine
            .load_model_from_bytes("m", vec![0; 100], ModelFormat::TfLite, ModelConfig::default())
            .unwrap();

        // 100 model bytes + 2 × 4 × 4 buffer bytes = 132.
        engine.set_memory_limit(Some(MemoryLimit::from_bytes(132)));
        engine.run_inference(&[0.0; 4]).unwrap();

        engine.set_memory_limit(Some(MemoryLimit::from_bytes(131)));
        let err = engine.run_inference(&[0.0; 4]).unwrap_err();
        assert!(matches!(err, RuntimeError::MemoryLimitExceeded { required: 132, .. }));
        assert_eq!(errors.error_history()[0].category, ErrorCategory::Memory);

        engine.set_memory_limit(None);
        assert!(engine.run_inference(&[0.0; 4]).is_ok());
    }

    #[test]
    fn test_caching() {
        let driver = SimulatedDriver::new(HexagonDsp::power_range());
        let calls = driver.execution_counter();
        let mut engine = InferenceEngine::new(RuntimeConfig::default(), quiet_errors())
            .unwrap()
            .initialize(Box::new(HexagonDsp::with_driver(Box::new(driver))))
            .unwrap();
        let config = ModelConfig {
            enable_caching: true,
            ..Default::default()
        };
        engine
            .load_model_from_bytes("m", vec![1; 4], ModelFormat::TfLite, config)
            .unwrap();

        engine.run_inference(&[1.0, 2.0]).unwrap();
        let out = engine.run_inference(&[1.0, 2.0]).unwrap();
        assert_eq!(out.values, vec![1.0, 2.0]);
        assert_eq!(out.metrics.unwrap().path, ExecutionPath::Cached);
        engine.run_inference(&[2.0, 1.0]).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let batch = engine
            .run_batch_inference(&[vec![2.0, 1.0], vec![2.0, 1.0]])
            .unwrap();
        assert!(batch.success());
        assert_eq!(batch.metrics.unwrap().path, ExecutionPath::Cached);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let batch = engine
            .run_batch_inference(&[vec![2.0, 1.0], vec![5.0]])
            .unwrap();
        assert_eq!(batch.metrics.unwrap().path, ExecutionPath::Accelerator);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_profiling_disabled() {
        let mut engine = ready_with(Box::new(HexagonDsp::new()));
        engine.enable_profiling(false);
        assert!(engine.run_inference(&[1.0]).unwrap().metrics.is_none());
    }

    #[test]
    fn test_setters() {
        let mut engine = ready_with(Box::new(NeuroPilotApu::new()));
        assert!(matches!(engine.set_num_threads(0), Err(RuntimeError::InvalidConfig(_))));
        engine.set_num_threads(2).unwrap();
        assert_eq!(engine.num_threads(), 2);

        engine.set_power_profile(PowerProfile::LowPower).unwrap();
        assert_eq!(engine.accelerator_descriptor().power_level, 1);
        assert_eq!(engine.config().power_profile, PowerProfile::LowPower);
    }

    #[test]
    fn test_optimization_on_load() {
        let mut engine = ready_with(Box::new(HexagonDsp::new()));
        let config =
            ModelConfig::default().with_optimization(crate::OptimizationConfig::LayerFusion);
        engine
            .load_model_from_bytes("fused", vec![0; 8], ModelFormat::TfLite, config)
            .unwrap();
        let report = engine.model().unwrap().optimization.clone().unwrap();
        assert!(report.applied);

        let bad = ModelConfig::default()
            .with_optimization(crate::OptimizationConfig::Pruning { threshold: 2.0 });
        assert!(matches!(
            engine.load_model_from_bytes("bad", vec![0; 8], ModelFormat::TfLite, bad),
            Err(RuntimeError::Optimization(_))
        ));
        assert_eq!(engine.model().unwrap().name, "fused");
    }

    #[test]
    fn test_release_resets_configuration() {
        let mut engine = ready_with(Box::new(HexagonDsp::new()));
        engine.enable_hardware_acceleration(false);
        engine.set_memory_limit(Some(MemoryLimit::from_mb(1)));
        let idle = engine.release_resources();
        assert!(idle.hardware_acceleration_enabled());
        assert!(idle.memory_limit().is_none());
        assert_eq!(idle.config(), &RuntimeConfig::default());
    }

    #[test]
    fn test_debug_format() {
        let engine = InferenceEngine::new(RuntimeConfig::default(), quiet_errors()).unwrap();
        let debug = format!("{engine:?}");
        assert!(debug.contains("InferenceEngine"));
        assert!(debug.contains("Idle"));
    }
}
