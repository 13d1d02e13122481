// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the inference runtime.

use accelerator::AcceleratorError;
use std::path::PathBuf;

/// Errors that can occur while configuring or running the engine.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The held accelerator failed and no fallback applied.
    #[error("accelerator error: {0}")]
    Accelerator(#[from] AcceleratorError),

    /// The model file could not be read.
    #[error("cannot load model '{}': {source}", path.display())]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Rejected input: empty buffer, empty model, unknown format.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Rejected setting: zero threads, zero batch size, bad limit string.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no model loaded")]
    NoModelLoaded,

    #[error("memory limit exceeded: {required} bytes required, limit {limit}")]
    MemoryLimitExceeded {
        required: usize,
        limit: crate::MemoryLimit,
    },

    #[error("batch of {size} exceeds max_batch_size {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("optimization failed: {0}")]
    Optimization(String),

    /// Configuration file could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("cannot write '{}': {source}", path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
