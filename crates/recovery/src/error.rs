// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the recovery subsystem itself.

/// Failures of history export and import.
#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    /// An export was requested with an empty path.
    #[error("export path is empty")]
    EmptyPath,

    /// Writing the export file failed.
    #[error("failed to write error history to {path}: {source}")]
    Export {
        path: String,
        source: std::io::Error,
    },

    /// History could not be serialised or parsed.
    #[error("error history JSON: {0}")]
    Json(#[from] serde_json::Error),
}
