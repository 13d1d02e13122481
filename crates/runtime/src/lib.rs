// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # runtime
//!
//! The inference engine that sits between an application and whichever
//! accelerator the device offers.
//!
//! The runtime takes:
//! - A [`RuntimeConfig`] (TOML or programmatic).
//! - A shared [`recovery::ErrorHandler`] every failure is reported to.
//! - A `Box<dyn accelerator::Accelerator>`, usually built by the
//!   [`accelerator::AcceleratorRegistry`].
//!
//! It loads a model, optionally runs the [`ModelOptimizer`] over it, and
//! routes each call to the accelerator or, when that is disabled, missing
//! or failed, to the [`CpuExecutor`].
//!
//! # Type-State Lifecycle
//! ```text
//! InferenceEngine<Idle> → InferenceEngine<Ready> → InferenceEngine<Idle>
//! ```
//! Transitions are compile-time checked.
//!
//! # Example
//! ```
//! use accelerator::AcceleratorRegistry;
//! use recovery::ErrorHandler;
//! use runtime::{InferenceEngine, ModelFormat, RuntimeConfig};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), runtime::RuntimeError> {
//! let config = RuntimeConfig::from_toml("accelerator = \"neuropilot-apu\"\nnum_threads = 2")?;
//! let accelerator = config.create_accelerator(&AcceleratorRegistry::with_defaults())?;
//!
//! let mut engine = InferenceEngine::new(config.clone(), Arc::new(ErrorHandler::new()))?
//!     .initialize(accelerator)?;
//! engine.load_model_from_bytes("tiny", vec![0; 128], ModelFormat::Onnx, config.model_config())?;
//!
//! let batch = engine.run_batch_inference(&[vec![1.0; 4], vec![2.0; 4]])?;
//! assert!(batch.success());
//! # Ok(())
//! # }
//! ```

mod benchmark;
mod config;
mod engine;
mod error;
mod fallback;
mod limit;
mod metrics;
mod model;
mod optimizer;

pub use benchmark::{
    export_results, summarize, BenchmarkConfig, BenchmarkResult, BenchmarkRunner, BenchmarkSummary,
};
pub use config::RuntimeConfig;
pub use engine::{
    BatchFailure, BatchOutput, EngineState, Idle, InferenceEngine, InferenceOutput, Ready,
};
pub use error::RuntimeError;
pub use fallback::CpuExecutor;
pub use limit::MemoryLimit;
pub use metrics::{ExecutionPath, InferenceMetrics};
pub use model::{LoadedModel, ModelConfig, ModelFormat};
pub use optimizer::{
    round_trip_error, symmetric_scale, AccuracyDelta, ModelOptimizer, OptimizationConfig,
    OptimizationReport, QuantizationMode,
};
