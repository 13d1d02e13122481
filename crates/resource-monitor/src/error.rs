// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for resource monitoring.

/// Errors that can occur when reading system resources or exporting samples.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Failed to read a sysfs or procfs file.
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse a numeric value from a system file.
    #[error("failed to parse value from {path}: {detail}")]
    ParseError { path: String, detail: String },

    /// The sysfs node does not exist on this device.
    #[error("sysfs path not found: {path}")]
    NotAvailable { path: String },

    /// Writing an export file failed.
    #[error("failed to export to {path}: {source}")]
    ExportError {
        path: String,
        source: std::io::Error,
    },

    /// Samples or reports could not be serialised.
    #[error("serialisation failed: {0}")]
    Serialise(#[from] serde_json::Error),
}
