// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # recovery
//!
//! Centralised error reporting for the accelerator runtime.
//!
//! Components report failures to a shared [`ErrorHandler`] as an
//! [`ErrorContext`]: a message plus an orthogonal severity and category.
//! The handler logs it, keeps it in a bounded history, notifies listeners,
//! tracks overall system health and, for `Error` and `Critical` reports,
//! runs the recovery strategy registered for the category with exponential
//! backoff between attempts.
//!
//! | Severity | Log | Health | Recovery |
//! |---|---|---|---|
//! | Info / Warning | yes | unchanged | no |
//! | Error | yes | unchanged | yes |
//! | Critical | yes | unhealthy | yes |
//!
//! The handler is shared by injection:
//!
//! ```
//! use recovery::{ErrorCategory, ErrorHandler, ErrorSeverity, RecoveryOutcome};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let errors = Arc::new(ErrorHandler::new());
//! errors.set_base_delay(Duration::ZERO);
//! errors.register_recovery_strategy(ErrorCategory::Hardware, |_ctx| true);
//!
//! let outcome = errors.report("DSP session lost", ErrorSeverity::Error, ErrorCategory::Hardware, "hexagon-dsp");
//! assert_eq!(outcome, RecoveryOutcome::Recovered { attempts: 1 });
//! assert!(errors.is_system_healthy());
//! ```

mod context;
mod error;
mod handler;
mod policy;

pub use context::{ErrorCategory, ErrorContext, ErrorSeverity};
pub use error::RecoveryError;
pub use handler::{
    ErrorHandler, ErrorListener, RecoveryOutcome, RecoveryStrategy, MAX_ERROR_HISTORY,
};
pub use policy::{RecoveryMachine, RecoveryPolicy, RecoveryState};
