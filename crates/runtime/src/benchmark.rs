// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmark sweep over batch sizes.
//!
//! [`BenchmarkRunner`] drives a ready engine through `num_runs` batches for
//! every configured batch size and records one [`BenchmarkResult`] row per
//! run. A failed or timed-out run is recorded as unsuccessful and the sweep
//! carries on. Inputs differ from run to run so result caching never
//! short-circuits a measurement.

use crate::{InferenceEngine, Ready, RuntimeError};
use resource_monitor::{unix_millis, GpuInfo, SystemInfo, ThermalInfo};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkConfig {
    pub num_runs: usize,
    pub warm_up: bool,
    /// Warm-up runs at batch size 1; not recorded.
    pub warm_up_runs: usize,
    pub batch_sizes: Vec<usize>,
    /// Elements per input buffer.
    pub input_len: usize,
    /// A run slower than this is recorded as failed. Checked after the run.
    pub run_timeout: Option<Duration>,
    pub measure_power: bool,
    pub measure_memory: bool,
    pub measure_thermal: bool,
    pub measure_utilization: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            num_runs: 100,
            warm_up: true,
            warm_up_runs: 10,
            batch_sizes: vec![1, 4, 8, 16],
            input_len: 1024,
            run_timeout: None,
            measure_power: true,
            measure_memory: true,
            measure_thermal: true,
            measure_utilization: true,
        }
    }
}

/// One (batch size, run) measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub batch_size: usize,
    pub run_index: usize,
    pub success: bool,
    pub failure: Option<String>,
    pub inference_time_ms: f64,
    pub memory_usage_mb: f64,
    pub power_usage_mw: f64,
    pub accelerator_type: String,
    pub model_format: String,
    pub enabled_optimizations: Vec<String>,
    pub thermal_throttling_percent: Option<f32>,
    pub cpu_utilization_percent: Option<f64>,
    pub gpu_utilization_percent: Option<f64>,
    pub timestamp_ms: u64,
}

/// Aggregate over the successful runs of one batch size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSummary {
    pub batch_size: usize,
    pub runs: usize,
    pub failures: usize,
    pub mean_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub p95_ms: f64,
    /// Inputs per second at the mean latency.
    pub throughput: f64,
    pub mean_power_mw: f64,
    pub peak_memory_mb: f64,
}

impl BenchmarkSummary {
    pub fn summary(&self) -> String {
        format!(
            "batch {:>3}: {}/{} ok, mean {:.3}ms (min {:.3}, p95 {:.3}, max {:.3}), {:.1} inf/s, {:.0} mW, {:.1} MB",
            self.batch_size,
            self.runs - self.failures,
            self.runs,
            self.mean_ms,
            self.min_ms,
            self.p95_ms,
            self.max_ms,
            self.throughput,
            self.mean_power_mw,
            self.peak_memory_mb,
        )
    }
}

pub struct BenchmarkRunner<'a> {
    engine: &'a mut InferenceEngine<Ready>,
    config: BenchmarkConfig,
}

impl<'a> BenchmarkRunner<'a> {
    pub fn new(engine: &'a mut InferenceEngine<Ready>, config: BenchmarkConfig) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Runs the sweep, calling `progress` after every recorded run.
    pub fn run<F>(&mut self, mut progress: F) -> Vec<BenchmarkResult>
    where
        F: FnMut(&BenchmarkResult),
    {
        let input_len = self.config.input_len.max(1);
        let mut seed = 0usize;

        if self.config.warm_up {
            debug!(runs = self.config.warm_up_runs, "warming up");
            for _ in 0..self.config.warm_up_runs {
                let input = make_input(input_len, seed);
                seed += 1;
                if let Err(e) = self.engine.run_inference(&input) {
                    warn!(error = %e, "warm-up run failed");
                }
            }
        }

        let (accelerator_type, model_format, enabled_optimizations) = match self.engine.model() {
            Some(m) => (
                self.engine.accelerator().name().to_string(),
                m.format.to_string(),
                m.enabled_optimizations(),
            ),
            None => (self.engine.accelerator().name().to_string(), String::new(), Vec::new()),
        };

        let total = self.config.batch_sizes.len() * self.config.num_runs;
        let mut results = Vec::with_capacity(total);
        info!(
            batch_sizes = ?self.config.batch_sizes,
            runs = self.config.num_runs,
            accelerator = %accelerator_type,
            "benchmark started"
        );

        for &batch_size in &self.config.batch_sizes {
            for run_index in 0..self.config.num_runs {
                let inputs: Vec<Vec<f32>> = (0..batch_size)
                    .map(|_| {
                        seed += 1;
                        make_input(input_len, seed)
                    })
                    .collect();

                let mut row = BenchmarkResult {
                    batch_size,
                    run_index,
                    success: false,
                    failure: None,
                    inference_time_ms: 0.0,
                    memory_usage_mb: 0.0,
                    power_usage_mw: 0.0,
                    accelerator_type: accelerator_type.clone(),
                    model_format: model_format.clone(),
                    enabled_optimizations: enabled_optimizations.clone(),
                    thermal_throttling_percent: None,
                    cpu_utilization_percent: None,
                    gpu_utilization_percent: None,
                    timestamp_ms: unix_millis(),
                };

                match self.engine.run_batch_inference(&inputs) {
                    Ok(batch) => {
                        let m = batch.metrics.unwrap_or_default();
                        row.inference_time_ms = m.elapsed_ms;
                        if self.config.measure_memory {
                            row.memory_usage_mb = m.memory_mb;
                        }
                        if self.config.measure_power {
                            row.power_usage_mw = m.estimated_power_mw;
                        }
                        if self.config.measure_utilization {
                            row.cpu_utilization_percent = Some(m.cpu_percent);
                            row.gpu_utilization_percent =
                                Some(GpuInfo::read().map(|g| g.busy_percent).unwrap_or(0.0));
                        }

                        let timed_out = self
                            .config
                            .run_timeout
                            .is_some_and(|limit| m.elapsed() > limit);
                        if timed_out {
                            row.failure = Some(format!("run exceeded {:.3}ms", m.elapsed_ms));
                        } else if let Some(f) = batch.failures.first() {
                            row.failure = Some(format!("item {}: {}", f.index, f.error));
                        } else {
                            row.success = true;
                        }
                    }
                    Err(e) => row.failure = Some(e.to_string()),
                }

                if self.config.measure_thermal {
                    row.thermal_throttling_percent =
                        ThermalInfo::read().ok().map(|t| t.throttling_percent());
                }
                if let Some(f) = &row.failure {
                    debug!(batch_size, run_index, failure = %f, "benchmark run failed");
                }

                progress(&row);
                results.push(row);
            }
        }

        info!(
            runs = results.len(),
            failed = results.iter().filter(|r| !r.success).count(),
            "benchmark complete"
        );
        results
    }
}

/// Deterministic input that differs for every `seed`.
fn make_input(len: usize, seed: usize) -> Vec<f32> {
    (0..len)
        .map(|i| ((i + seed * 31) % 251) as f32 / 251.0)
        .collect()
}

/// Groups rows by batch size, ascending.
pub fn summarize(results: &[BenchmarkResult]) -> Vec<BenchmarkSummary> {
    let mut groups: BTreeMap<usize, Vec<&BenchmarkResult>> = BTreeMap::new();
    for r in results {
        groups.entry(r.batch_size).or_default().push(r);
    }

    groups
        .into_iter()
        .map(|(batch_size, rows)| {
            let ok: Vec<&BenchmarkResult> = rows.iter().copied().filter(|r| r.success).collect();
            let mut times: Vec<f64> = ok.iter().map(|r| r.inference_time_ms).collect();
            times.sort_by(f64::total_cmp);

            let mean_ms = mean(&times);
            let p95_ms = if times.is_empty() {
                0.0
            } else {
                let rank = ((times.len() as f64) * 0.95).ceil() as usize;
                times[rank.clamp(1, times.len()) - 1]
            };
            let power: Vec<f64> = ok.iter().map(|r| r.power_usage_mw).collect();

            BenchmarkSummary {
                batch_size,
                runs: rows.len(),
                failures: rows.len() - ok.len(),
                mean_ms,
                min_ms: times.first().copied().unwrap_or(0.0),
                max_ms: times.last().copied().unwrap_or(0.0),
                p95_ms,
                throughput: if mean_ms > 0.0 {
                    batch_size as f64 * 1000.0 / mean_ms
                } else {
                    0.0
                },
                mean_power_mw: mean(&power),
                peak_memory_mb: ok.iter().map(|r| r.memory_usage_mb).fold(0.0, f64::max),
            }
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[derive(Serialize)]
struct BenchmarkExport<'a> {
    timestamp_ms: u64,
    system_info: Option<SystemInfo>,
    benchmarks: &'a [BenchmarkResult],
}

/// Writes `{ timestamp_ms, system_info, benchmarks }` as pretty JSON,
/// creating parent directories.
pub fn export_results(path: &Path, results: &[BenchmarkResult]) -> Result<(), RuntimeError> {
    let export = BenchmarkExport {
        timestamp_ms: unix_millis(),
        system_info: SystemInfo::capture().ok(),
        benchmarks: results,
    };
    let json = serde_json::to_string_pretty(&export)?;

    let io_err = |source| RuntimeError::Export {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, json).map_err(io_err)?;
    info!(path = %path.display(), rows = results.len(), "benchmark results exported");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ModelConfig, ModelFormat, RuntimeConfig};
    use accelerator::{HexagonDsp, SimulatedDriver};
    use recovery::ErrorHandler;
    use std::sync::Arc;

    fn engine(driver: SimulatedDriver, max_batch: usize) -> InferenceEngine<Ready> {
        let errors = Arc::new(ErrorHandler::new());
        errors.set_automatic_recovery(false);
        let mut engine = InferenceEngine::new(RuntimeConfig::default(), errors)
            .unwrap()
            .initialize(Box::new(HexagonDsp::with_driver(Box::new(driver))))
            .unwrap();
        let config = ModelConfig {
            enable_caching: true,
            ..ModelConfig::default().with_max_batch_size(max_batch)
        };
        engine
            .load_model_from_bytes("bench", vec![1; 32], ModelFormat::Onnx, config)
            .unwrap();
        engine
    }

    fn small_config() -> BenchmarkConfig {
        BenchmarkConfig {
            num_runs: 3,
            warm_up_runs: 2,
            batch_sizes: vec![1, 2],
            input_len: 8,
            measure_thermal: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_sweep_records_every_run() {
        let driver = SimulatedDriver::new(HexagonDsp::power_range());
        let calls = driver.execution_counter();
        let mut engine = engine(driver, 16);

        let mut seen = 0;
        let results = BenchmarkRunner::new(&mut engine, small_config()).run(|_| seen += 1);
        assert_eq!(results.len(), 6);
        assert_eq!(seen, 6);
        assert!(results.iter().all(|r| r.success));
        assert_eq!(results[0].accelerator_type, "hexagon-dsp");
        assert_eq!(results[0].model_format, "ONNX");
        assert!(results.iter().all(|r| r.power_usage_mw > 0.0));

        // 2 warm-up + 3×1 + 3×2, none served from the cache.
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 11);
    }

    #[test]
    fn test_oversized_batch_recorded_as_failure() {
        let mut engine = engine(SimulatedDriver::new(HexagonDsp::power_range()), 1);
        let results = BenchmarkRunner::new(&mut engine, small_config()).run(|_| {});
        let (ok, failed): (Vec<_>, Vec<_>) = results.iter().partition(|r| r.batch_size == 1);
        assert!(ok.iter().all(|r| r.success));
        assert!(failed.iter().all(|r| !r.success));
        assert!(failed[0].failure.as_deref().unwrap().contains("exceeds"));
    }

    #[test]
    fn test_timeout_marks_run_failed() {
        let mut engine = engine(SimulatedDriver::new(HexagonDsp::power_range()), 16);
        let config = BenchmarkConfig {
            run_timeout: Some(Duration::ZERO),
            warm_up: false,
            ..small_config()
        };
        let results = BenchmarkRunner::new(&mut engine, config).run(|_| {});
        assert!(results.iter().filter(|r| r.inference_time_ms > 0.0).all(|r| !r.success));
    }

    #[test]
    fn test_summarize() {
        let row = |batch_size, ms, success| BenchmarkResult {
            batch_size,
            run_index: 0,
            success,
            failure: None,
            inference_time_ms: ms,
            memory_usage_mb: ms * 10.0,
            power_usage_mw: 100.0,
            accelerator_type: "cpu".into(),
            model_format: "TFLite".into(),
            enabled_optimizations: vec![],
            thermal_throttling_percent: None,
            cpu_utilization_percent: None,
            gpu_utilization_percent: None,
            timestamp_ms: 0,
        };
        let results = vec![
            row(4, 2.0, true),
            row(1, 1.0, true),
            row(1, 3.0, true),
            row(1, 50.0, false),
        ];
        let summary = summarize(&results);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].batch_size, 1);
        assert_eq!(summary[0].runs, 3);
        assert_eq!(summary[0].failures, 1);
        assert_eq!(summary[0].mean_ms, 2.0);
        assert_eq!(summary[0].min_ms, 1.0);
        assert_eq!(summary[0].max_ms, 3.0);
        assert_eq!(summary[0].p95_ms, 3.0);
        assert_eq!(summary[0].peak_memory_mb, 30.0);
        assert_eq!(summary[1].throughput, 2000.0);
    }

    #[test]
    fn test_export_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/results.json");
        let mut engine = engine(SimulatedDriver::new(HexagonDsp::power_range()), 16);
        let results = BenchmarkRunner::new(
            &mut engine,
            BenchmarkConfig {
                num_runs: 1,
                batch_sizes: vec![1],
                warm_up: false,
                ..small_config()
            },
        )
        .run(|_| {});

        export_results(&path, &results).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(json["timestamp_ms"].as_u64().unwrap() > 0);
        assert_eq!(json["benchmarks"].as_array().unwrap().len(), 1);
        assert_eq!(json["benchmarks"][0]["batch_size"], 1);
    }
}
