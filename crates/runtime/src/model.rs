// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model bytes, format tags and per-model configuration.
//!
//! The engine never parses container formats. A [`LoadedModel`] is the raw
//! (already decrypted) byte buffer plus the format tag the backend runtime
//! needs to interpret it.

use crate::{OptimizationConfig, OptimizationReport, RuntimeError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Container format of a model file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    TfLite,
    PyTorch,
    Onnx,
}

impl ModelFormat {
    pub const ALL: [ModelFormat; 3] = [Self::TfLite, Self::PyTorch, Self::Onnx];

    pub fn name(self) -> &'static str {
        match self {
            Self::TfLite => "TFLite",
            Self::PyTorch => "PyTorch",
            Self::Onnx => "ONNX",
        }
    }

    /// Detects the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self, RuntimeError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "tflite" => Ok(Self::TfLite),
            "pt" | "pth" => Ok(Self::PyTorch),
            "onnx" => Ok(Self::Onnx),
            _ => Err(RuntimeError::InvalidInput(format!(
                "unrecognized model format for '{}'; expected .tflite, .pt, .pth or .onnx",
                path.display()
            ))),
        }
    }
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelFormat {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tflite" | "tf-lite" => Ok(Self::TfLite),
            "pytorch" | "torch" | "pt" => Ok(Self::PyTorch),
            "onnx" => Ok(Self::Onnx),
            other => Err(RuntimeError::InvalidInput(format!(
                "unrecognized model format '{other}'; expected 'tflite', 'pytorch' or 'onnx'"
            ))),
        }
    }
}

/// Settings fixed for the life of a loaded model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Largest batch `run_batch_inference` accepts. Must be non-zero.
    pub max_batch_size: usize,
    /// Run the optimizer at load time.
    pub enable_optimization: bool,
    /// Reuse the previous output when the same input is submitted twice in a row.
    pub enable_caching: bool,
    /// Optimization to apply; INT8 quantization when unset.
    pub optimization: Option<OptimizationConfig>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 16,
            enable_optimization: false,
            enable_caching: false,
            optimization: None,
        }
    }
}

impl ModelConfig {
    pub fn with_max_batch_size(mut self, max: usize) -> Self {
        self.max_batch_size = max;
        self
    }

    pub fn with_optimization(mut self, optimization: OptimizationConfig) -> Self {
        self.enable_optimization = true;
        self.optimization = Some(optimization);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), RuntimeError> {
        if self.max_batch_size == 0 {
            return Err(RuntimeError::InvalidConfig(
                "max_batch_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// A model held in memory by the engine.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub name: String,
    /// Source file, `None` when loaded from a buffer.
    pub path: Option<PathBuf>,
    pub format: ModelFormat,
    pub bytes: Vec<u8>,
    pub config: ModelConfig,
    pub optimization: Option<OptimizationReport>,
}

impl LoadedModel {
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// Model contents as little-endian `f32` words, skipping non-finite ones.
    ///
    /// Used as the weight sample for quantization when no calibration data
    /// is supplied.
    pub fn weights(&self) -> impl Iterator<Item = f32> + '_ {
        self.bytes
            .chunks_exact(4)
            .map(|w| f32::from_le_bytes([w[0], w[1], w[2], w[3]]))
            .filter(|w| w.is_finite())
    }

    /// Names of the optimizations applied at load time.
    pub fn enabled_optimizations(&self) -> Vec<String> {
        self.optimization
            .iter()
            .filter(|r| r.applied)
            .map(|r| r.kind.clone())
            .collect()
    }

    pub fn summary(&self) -> String {
        let source = self
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<buffer>".to_string());
        let mut s = format!(
            "Model '{}': {} format, {:.2} KB from {source}, max batch {}{}",
            self.name,
            self.format,
            self.size_bytes() as f64 / 1024.0,
            self.config.max_batch_size,
            if self.config.enable_caching { ", caching on" } else { "" },
        );
        if let Some(report) = &self.optimization {
            s.push_str(&format!(", {}", report.summary()));
        }
        s
    }
}
