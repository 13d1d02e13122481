// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The error taxonomy and the context attached to each report.

use resource_monitor::DeviceInfo;
use serde::{Deserialize, Serialize};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;

/// How bad a reported error is. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl ErrorSeverity {
    /// Whether reports of this severity trigger automatic recovery.
    pub fn requires_recovery(self) -> bool {
        self >= ErrorSeverity::Error
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "Info",
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::Critical => "Critical",
        };
        f.write_str(s)
    }
}

/// Which subsystem an error concerns. Recovery strategies are keyed on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    Hardware,
    Model,
    Memory,
    System,
    Security,
    Network,
}

impl ErrorCategory {
    pub const ALL: [ErrorCategory; 6] = [
        Self::Hardware,
        Self::Model,
        Self::Memory,
        Self::System,
        Self::Security,
        Self::Network,
    ];
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Hardware => "Hardware",
            Self::Model => "Model",
            Self::Memory => "Memory",
            Self::System => "System",
            Self::Security => "Security",
            Self::Network => "Network",
        };
        f.write_str(s)
    }
}

/// One reported error, as stored in the history and exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub message: String,
    pub severity: ErrorSeverity,
    pub category: ErrorCategory,
    /// Reporting component; `"Unknown"` when the reporter gave none.
    pub component: String,
    pub stack_trace: String,
    pub device_info: DeviceInfo,
    /// Unix milliseconds.
    pub timestamp_ms: u64,
}

impl ErrorContext {
    /// Builds a context stamped with the current time and a backtrace.
    ///
    /// The backtrace honours `RUST_BACKTRACE`; when capture is disabled the
    /// field says so instead of staying empty.
    pub fn new(
        message: impl Into<String>,
        severity: ErrorSeverity,
        category: ErrorCategory,
        component: impl Into<String>,
        device_info: DeviceInfo,
    ) -> Self {
        let component = component.into();
        Self {
            message: message.into(),
            severity,
            category,
            component: if component.is_empty() {
                "Unknown".to_string()
            } else {
                component
            },
            stack_trace: capture_stack_trace(),
            device_info,
            timestamp_ms: resource_monitor::unix_millis(),
        }
    }

    /// One-line rendering used in logs and the CLI.
    pub fn summary(&self) -> String {
        format!(
            "[{}] {} {}: {}",
            self.component, self.severity, self.category, self.message
        )
    }
}

fn capture_stack_trace() -> String {
    let bt = Backtrace::capture();
    match bt.status() {
        BacktraceStatus::Captured => bt.to_string(),
        _ => "stack trace not captured (set RUST_BACKTRACE=1)".to_string(),
    }
}
