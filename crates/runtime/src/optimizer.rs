// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Load-time model optimization.
//!
//! The optimizer does not rewrite model files; it decides whether an
//! optimization applies to the loaded model and the held accelerator, and
//! reports its expected effect. Compression ratios are nominal figures for
//! the chosen encoding. The quantization accuracy delta is measured when
//! calibration data is supplied and a fixed estimate otherwise.
//!
//! | Kind | Validation | Compression |
//! |------|-----------|-------------|
//! | Quantization | none | 2.0 (FP16), 4.0 (8-bit modes) |
//! | Pruning | threshold in (0, 1) | `1 / (1 - threshold)` |
//! | Layer fusion | accelerator supports `CONV_2D` and `FULLY_CONNECTED` | 1.0 |
//! | Memory optimization | target > 0 MB | 1.0 |

use crate::{LoadedModel, RuntimeError};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Accuracy impact assumed for quantization without calibration data, in percent.
const ESTIMATED_QUANTIZATION_DELTA_PERCENT: f64 = -0.5;

/// Operations an accelerator must run natively for fused conv/dense blocks.
const FUSION_OPS: [&str; 2] = ["CONV_2D", "FULLY_CONNECTED"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantizationMode {
    #[default]
    Int8,
    Fp16,
    Dynamic,
    PerChannel,
    PerTensor,
}

impl QuantizationMode {
    /// Width of the quantized representation.
    pub fn bits(self) -> u32 {
        match self {
            Self::Fp16 => 16,
            Self::Int8 | Self::Dynamic | Self::PerChannel | Self::PerTensor => 8,
        }
    }

    fn compression_ratio(self) -> f64 {
        32.0 / f64::from(self.bits())
    }
}

impl fmt::Display for QuantizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Int8 => "int8",
            Self::Fp16 => "fp16",
            Self::Dynamic => "dynamic",
            Self::PerChannel => "per-channel",
            Self::PerTensor => "per-tensor",
        };
        f.write_str(s)
    }
}

/// One optimization to run at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptimizationConfig {
    Quantization {
        #[serde(default)]
        mode: QuantizationMode,
        /// Representative input values; enables a measured accuracy delta.
        #[serde(default)]
        calibration: Vec<f32>,
    },
    Pruning {
        threshold: f32,
    },
    LayerFusion,
    MemoryOptimization {
        target_mb: u64,
    },
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self::Quantization {
            mode: QuantizationMode::default(),
            calibration: Vec::new(),
        }
    }
}

impl OptimizationConfig {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Quantization { .. } => "quantization",
            Self::Pruning { .. } => "pruning",
            Self::LayerFusion => "layer_fusion",
            Self::MemoryOptimization { .. } => "memory_optimization",
        }
    }
}

/// How the accuracy impact of an optimization was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum AccuracyDelta {
    /// Mean absolute quantize→dequantize error over the calibration data.
    Measured { mean_abs_error: f64 },
    /// Nominal figure, in percent.
    Estimated { percent: f64 },
    Unknown,
}

/// Outcome of one optimization pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub kind: String,
    /// `false` when the pass was skipped (e.g. fusion on an incapable accelerator).
    pub applied: bool,
    pub compression_ratio: f64,
    pub accuracy: AccuracyDelta,
    /// Quantization scale, when one was computed.
    pub scale: Option<f32>,
    pub memory_usage_mb: Option<u64>,
}

impl OptimizationReport {
    fn new(kind: &str, compression_ratio: f64) -> Self {
        Self {
            kind: kind.to_string(),
            applied: true,
            compression_ratio,
            accuracy: AccuracyDelta::Unknown,
            scale: None,
            memory_usage_mb: None,
        }
    }

    pub fn summary(&self) -> String {
        if !self.applied {
            return format!("{} skipped", self.kind);
        }
        let accuracy = match self.accuracy {
            AccuracyDelta::Measured { mean_abs_error } => {
                format!(", mean abs error {mean_abs_error:.6}")
            }
            AccuracyDelta::Estimated { percent } => {
                format!(", ~{percent:+.1}% accuracy (estimated)")
            }
            AccuracyDelta::Unknown => String::new(),
        };
        format!("{} {:.2}x{accuracy}", self.kind, self.compression_ratio)
    }
}

/// Symmetric scale for a signed `bits`-wide encoding of `values`.
pub fn symmetric_scale(values: &[f32], bits: u32) -> f32 {
    let range = values.iter().fold(0.0f32, |acc, v| acc.max(v.abs()));
    range / qmax(bits)
}

fn qmax(bits: u32) -> f32 {
    ((1u32 << (bits - 1)) - 1) as f32
}

/// Mean absolute error of quantizing then dequantizing `values` with `scale`.
pub fn round_trip_error(values: &[f32], scale: f32, bits: u32) -> f64 {
    if values.is_empty() || scale == 0.0 {
        return 0.0;
    }
    let limit = qmax(bits);
    let total: f64 = values
        .iter()
        .map(|&v| {
            let q = (v / scale).round().clamp(-limit, limit);
            f64::from((v - q * scale).abs())
        })
        .sum();
    total / values.len() as f64
}

/// Applies [`OptimizationConfig`]s to loaded models.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelOptimizer;

impl ModelOptimizer {
    /// Runs one optimization against `model` for an accelerator supporting
    /// `supported_ops`.
    pub fn optimize(
        model: &LoadedModel,
        config: &OptimizationConfig,
        supported_ops: &[&str],
    ) -> Result<OptimizationReport, RuntimeError> {
        let report = match config {
            OptimizationConfig::Quantization { mode, calibration } => {
                Self::quantize(model, *mode, calibration)
            }
            OptimizationConfig::Pruning { threshold } => {
                let t = *threshold;
                if !(t > 0.0 && t < 1.0) {
                    return Err(RuntimeError::Optimization(format!(
                        "pruning threshold {t} outside (0, 1)"
                    )));
                }
                OptimizationReport::new("pruning", 1.0 / (1.0 - f64::from(t)))
            }
            OptimizationConfig::LayerFusion => {
                let mut report = OptimizationReport::new("layer_fusion", 1.0);
                if !FUSION_OPS.iter().all(|op| supported_ops.contains(op)) {
                    warn!(
                        model = %model.name,
                        "accelerator cannot run fused blocks; layer fusion skipped"
                    );
                    report.applied = false;
                }
                report
            }
            OptimizationConfig::MemoryOptimization { target_mb } => {
                if *target_mb == 0 {
                    return Err(RuntimeError::Optimization(
                        "memory optimization target must be non-zero".into(),
                    ));
                }
                let mut report = OptimizationReport::new("memory_optimization", 1.0);
                report.memory_usage_mb = Some(*target_mb);
                report
            }
        };
        info!(model = %model.name, "{}", report.summary());
        Ok(report)
    }

    fn quantize(
        model: &LoadedModel,
        mode: QuantizationMode,
        calibration: &[f32],
    ) -> OptimizationReport {
        let bits = mode.bits();
        let mut report =
            OptimizationReport::new(&format!("quantization_{mode}"), mode.compression_ratio());
        if calibration.is_empty() {
            let weights: Vec<f32> = model.weights().collect();
            report.scale = Some(symmetric_scale(&weights, bits));
            report.accuracy = AccuracyDelta::Estimated {
                percent: ESTIMATED_QUANTIZATION_DELTA_PERCENT,
            };
        } else {
            let scale = symmetric_scale(calibration, bits);
            report.scale = Some(scale);
            report.accuracy = AccuracyDelta::Measured {
                mean_abs_error: round_trip_error(calibration, scale, bits),
            };
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ModelConfig, ModelFormat};

    fn model() -> LoadedModel {
        let bytes = [0.5f32, -1.27, 0.25]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        LoadedModel {
            name: "tiny".into(),
            path: None,
            format: ModelFormat::TfLite,
            bytes,
            config: ModelConfig::default(),
            optimization: None,
        }
    }

    #[test]
    fn test_symmetric_scale() {
        let scale = symmetric_scale(&[-1.27, 0.5], 8);
        assert!((scale - 0.01).abs() < 1e-6);
        assert_eq!(symmetric_scale(&[], 8), 0.0);
    }

    #[test]
    fn test_quantization_measured_with_calibration() {
        let cfg = OptimizationConfig::Quantization {
            mode: QuantizationMode::Int8,
            calibration: vec![0.1, -0.333, 0.9, 0.47],
        };
        let report = ModelOptimizer::optimize(&model(), &cfg, &[]).unwrap();
        assert_eq!(report.compression_ratio, 4.0);
        match report.accuracy {
            AccuracyDelta::Measured { mean_abs_error } => {
                let scale = f64::from(report.scale.unwrap());
                assert!(mean_abs_error > 0.0);
                assert!(mean_abs_error <= scale / 2.0 + 1e-9);
            }
            other => panic!("expected measured delta, got {other:?}"),
        }
    }

    #[test]
    fn test_quantization_estimated_without_calibration() {
        let cfg = OptimizationConfig::Quantization {
            mode: QuantizationMode::Fp16,
            calibration: Vec::new(),
        };
        let report = ModelOptimizer::optimize(&model(), &cfg, &[]).unwrap();
        assert_eq!(report.compression_ratio, 2.0);
        assert_eq!(report.kind, "quantization_fp16");
        assert!(matches!(report.accuracy, AccuracyDelta::Estimated { .. }));
        assert!(report.scale.unwrap() > 0.0);
    }

    #[test]
    fn test_pruning_threshold() {
        let pruning = OptimizationConfig::Pruning { threshold: 0.75 };
        let report = ModelOptimizer::optimize(&model(), &pruning, &[]).unwrap();
        assert!((report.compression_ratio - 4.0).abs() < 1e-9);

        for bad in [0.0, 1.0, -0.1, f32::NAN] {
            let cfg = OptimizationConfig::Pruning { threshold: bad };
            assert!(matches!(
                ModelOptimizer::optimize(&model(), &cfg, &[]),
                Err(RuntimeError::Optimization(_))
            ));
        }
    }

    #[test]
    fn test_layer_fusion_requires_ops() {
        let skipped =
            ModelOptimizer::optimize(&model(), &OptimizationConfig::LayerFusion, &["CONV_2D"])
                .unwrap();
        assert!(!skipped.applied);
        assert_eq!(skipped.summary(), "layer_fusion skipped");

        let applied = ModelOptimizer::optimize(
            &model(),
            &OptimizationConfig::LayerFusion,
            &["CONV_2D", "FULLY_CONNECTED", "RELU"],
        )
        .unwrap();
        assert!(applied.applied);
    }

    #[test]
    fn test_memory_optimization() {
        let report = ModelOptimizer::optimize(
            &model(),
            &OptimizationConfig::MemoryOptimization { target_mb: 64 },
            &[],
        )
        .unwrap();
        assert_eq!(report.memory_usage_mb, Some(64));
        assert!(ModelOptimizer::optimize(
            &model(),
            &OptimizationConfig::MemoryOptimization { target_mb: 0 },
            &[]
        )
        .is_err());
    }

    #[test]
    fn test_config_serde_tag() {
        let cfg: OptimizationConfig =
            serde_json::from_str(r#"{"kind":"pruning","threshold":0.5}"#).unwrap();
        assert_eq!(cfg, OptimizationConfig::Pruning { threshold: 0.5 });
        let cfg: OptimizationConfig = serde_json::from_str(r#"{"kind":"quantization"}"#).unwrap();
        assert_eq!(cfg, OptimizationConfig::default());
    }
}
