// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for accelerators and vendor drivers.

use std::fmt;

/// Stable, machine-readable classification of an [`AcceleratorError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InitializationFailed,
    HardwareError,
    NotInitialized,
    InvalidArgument,
    Unavailable,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InitializationFailed => "INITIALIZATION_FAILED",
            Self::HardwareError => "HARDWARE_ERROR",
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::Unavailable => "UNAVAILABLE",
        };
        f.write_str(s)
    }
}

/// Errors returned by [`Accelerator`](crate::Accelerator) operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AcceleratorError {
    #[error("{accelerator}: initialization failed: {detail}")]
    InitializationFailed { accelerator: String, detail: String },

    #[error("{accelerator}: not initialized")]
    NotInitialized { accelerator: String },

    #[error("{accelerator}: hardware error: {detail}")]
    HardwareError { accelerator: String, detail: String },

    #[error("{accelerator}: hardware unavailable")]
    Unavailable { accelerator: String },

    #[error("invalid argument: {detail}")]
    InvalidArgument { detail: String },
}

impl AcceleratorError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InitializationFailed { .. } => ErrorCode::InitializationFailed,
            Self::NotInitialized { .. } => ErrorCode::NotInitialized,
            Self::HardwareError { .. } => ErrorCode::HardwareError,
            Self::Unavailable { .. } => ErrorCode::Unavailable,
            Self::InvalidArgument { .. } => ErrorCode::InvalidArgument,
        }
    }

    pub(crate) fn invalid(detail: impl Into<String>) -> Self {
        Self::InvalidArgument {
            detail: detail.into(),
        }
    }
}

/// Failure reported by a [`VendorDriver`](crate::VendorDriver).
///
/// `code` is the vendor runtime's own status code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("driver error {code}: {message}")]
pub struct DriverError {
    pub code: i32,
    pub message: String,
}

impl DriverError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
