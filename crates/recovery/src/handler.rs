// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The shared error handler.
//!
//! `handle` calls are serialised by a dispatch lock, so at most one
//! recovery run is in flight and no two strategy invocations overlap.
//! History, listeners, strategies and health live behind a separate state
//! lock that is never held while user code (listeners, strategies) runs.
//! Listeners and strategies must not call back into `handle`, `report` or
//! `attempt_recovery`.

use crate::{
    ErrorCategory, ErrorContext, ErrorSeverity, RecoveryError, RecoveryMachine, RecoveryPolicy,
    RecoveryState,
};
use resource_monitor::DeviceInfo;
use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{error, info, warn};

/// Maximum number of contexts kept in the error history.
pub const MAX_ERROR_HISTORY: usize = 1000;

const HEALTHY_STATUS: &str = "System healthy";

/// Called with every handled error.
pub type ErrorListener = Arc<dyn Fn(&ErrorContext) + Send + Sync>;

/// Attempts to remediate an error; returns `true` on success.
pub type RecoveryStrategy = Arc<dyn Fn(&ErrorContext) -> bool + Send + Sync>;

/// What happened to a reported error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// The report was dropped (empty message).
    Ignored,
    /// Recovery was not run: automatic recovery is off or severity is below `Error`.
    NotAttempted,
    /// No strategy is registered for the category.
    NoStrategy,
    Recovered { attempts: u32 },
    Exhausted { attempts: u32 },
}

impl RecoveryOutcome {
    pub fn is_recovered(self) -> bool {
        matches!(self, Self::Recovered { .. })
    }
}

struct HandlerState {
    history: VecDeque<ErrorContext>,
    listeners: Vec<ErrorListener>,
    strategies: HashMap<ErrorCategory, RecoveryStrategy>,
    healthy: bool,
    status: String,
    policy: RecoveryPolicy,
}

/// Central error sink shared across the runtime as `Arc<ErrorHandler>`.
pub struct ErrorHandler {
    state: Mutex<HandlerState>,
    dispatch: Mutex<()>,
    device_info: fn() -> DeviceInfo,
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ErrorHandler")
            .field("errors", &state.history.len())
            .field("healthy", &state.healthy)
            .field("policy", &state.policy)
            .finish()
    }
}

impl ErrorHandler {
    pub fn new() -> Self {
        Self::with_policy(RecoveryPolicy::default())
    }

    pub fn with_policy(policy: RecoveryPolicy) -> Self {
        Self {
            state: Mutex::new(HandlerState {
                history: VecDeque::new(),
                listeners: Vec::new(),
                strategies: HashMap::new(),
                healthy: true,
                status: HEALTHY_STATUS.to_string(),
                policy,
            }),
            dispatch: Mutex::new(()),
            device_info: DeviceInfo::capture,
        }
    }

    /// Replaces the device-identity reader called on every report.
    /// Defaults to [`DeviceInfo::capture`].
    pub fn with_device_source(mut self, source: fn() -> DeviceInfo) -> Self {
        self.device_info = source;
        self
    }

    fn lock(&self) -> MutexGuard<'_, HandlerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Registration ───────────────────────────────────────────

    pub fn register_error_callback<F>(&self, listener: F)
    where
        F: Fn(&ErrorContext) + Send + Sync + 'static,
    {
        self.lock().listeners.push(Arc::new(listener));
    }

    /// Registers the strategy for `category`, replacing any previous one.
    pub fn register_recovery_strategy<F>(&self, category: ErrorCategory, strategy: F)
    where
        F: Fn(&ErrorContext) -> bool + Send + Sync + 'static,
    {
        if self
            .lock()
            .strategies
            .insert(category, Arc::new(strategy))
            .is_some()
        {
            info!(%category, "recovery strategy replaced");
        }
    }

    // ── Reporting ──────────────────────────────────────────────

    /// Builds a context with the device identity read now and handles it.
    ///
    /// An empty message is logged and ignored.
    pub fn report(
        &self,
        message: &str,
        severity: ErrorSeverity,
        category: ErrorCategory,
        component: &str,
    ) -> RecoveryOutcome {
        if message.is_empty() {
            warn!(%category, component, "empty error message reported; ignoring");
            return RecoveryOutcome::Ignored;
        }
        let device = (self.device_info)();
        let ctx = ErrorContext::new(message, severity, category, component, device);
        self.handle(ctx)
    }

    /// Logs, records, notifies, updates health, then recovers if warranted.
    pub fn handle(&self, ctx: ErrorContext) -> RecoveryOutcome {
        let _dispatch = self.dispatch.lock().unwrap_or_else(PoisonError::into_inner);

        log_context(&ctx);

        let (listeners, policy) = {
            let mut state = self.lock();
            if state.history.len() >= MAX_ERROR_HISTORY {
                state.history.pop_front();
            }
            state.history.push_back(ctx.clone());
            (state.listeners.clone(), state.policy)
        };

        for listener in &listeners {
            if panic::catch_unwind(AssertUnwindSafe(|| listener(&ctx))).is_err() {
                error!(component = %ctx.component, "error listener panicked");
            }
        }

        self.update_health(&ctx);

        if policy.automatic && ctx.severity.requires_recovery() {
            self.run_recovery(&ctx)
        } else {
            RecoveryOutcome::NotAttempted
        }
    }

    /// Runs the category's strategy with backoff. Returns `true` on success.
    ///
    /// Blocks for the whole backoff sequence.
    pub fn attempt_recovery(&self, ctx: &ErrorContext) -> bool {
        let _dispatch = self.dispatch.lock().unwrap_or_else(PoisonError::into_inner);
        self.run_recovery(ctx).is_recovered()
    }

    fn run_recovery(&self, ctx: &ErrorContext) -> RecoveryOutcome {
        let (strategy, policy) = {
            let state = self.lock();
            (state.strategies.get(&ctx.category).cloned(), state.policy)
        };
        let Some(strategy) = strategy else {
            info!(category = %ctx.category, "no recovery strategy registered");
            return RecoveryOutcome::NoStrategy;
        };

        let max = policy.max_retries;
        let state = RecoveryMachine::new(policy).drive(
            |attempt| {
                info!(category = %ctx.category, attempt, max, "attempting recovery");
                match panic::catch_unwind(AssertUnwindSafe(|| strategy(ctx))) {
                    Ok(ok) => ok,
                    Err(_) => {
                        error!(category = %ctx.category, attempt, "recovery strategy panicked");
                        false
                    }
                }
            },
            std::thread::sleep,
        );

        match state {
            RecoveryState::Succeeded { attempts } => {
                info!(category = %ctx.category, attempts, "recovery successful");
                RecoveryOutcome::Recovered { attempts }
            }
            RecoveryState::Exhausted { attempts } => {
                error!(category = %ctx.category, attempts, "recovery failed");
                RecoveryOutcome::Exhausted { attempts }
            }
            RecoveryState::Idle | RecoveryState::Retrying { .. } => {
                RecoveryOutcome::Exhausted { attempts: 0 }
            }
        }
    }

    /// Retries `operation` up to `max_retries` times with the handler's
    /// backoff. Returns `true` as soon as it succeeds.
    pub fn retry_operation<F>(&self, mut operation: F, max_retries: u32) -> bool
    where
        F: FnMut() -> bool,
    {
        let policy = RecoveryPolicy {
            max_retries,
            ..self.policy()
        };
        let state = RecoveryMachine::new(policy).drive(|_| operation(), std::thread::sleep);
        matches!(state, RecoveryState::Succeeded { .. })
    }

    // ── Policy ─────────────────────────────────────────────────

    pub fn set_automatic_recovery(&self, enabled: bool) {
        self.lock().policy.automatic = enabled;
        info!(enabled, "automatic recovery toggled");
    }

    pub fn set_max_retries(&self, retries: u32) {
        self.lock().policy.max_retries = retries;
    }

    pub fn set_base_delay(&self, delay: Duration) {
        self.lock().policy.base_delay_ms = delay.as_millis() as u64;
    }

    pub fn set_policy(&self, policy: RecoveryPolicy) {
        self.lock().policy = policy;
    }

    pub fn policy(&self) -> RecoveryPolicy {
        self.lock().policy
    }

    // ── Health ─────────────────────────────────────────────────

    fn update_health(&self, ctx: &ErrorContext) {
        let mut state = self.lock();
        if ctx.severity == ErrorSeverity::Critical {
            state.healthy = false;
            error!("system health compromised by critical error");
        }
        let mut status = format!("Last error: {}", ctx.message);
        if !state.healthy {
            status.push_str(" (System unhealthy)");
        }
        state.status = status;
    }

    pub fn is_system_healthy(&self) -> bool {
        self.lock().healthy
    }

    pub fn system_status(&self) -> String {
        self.lock().status.clone()
    }

    /// Clears the history and marks the system healthy again.
    pub fn reset_system(&self) {
        let mut state = self.lock();
        state.history.clear();
        state.healthy = true;
        state.status = "System reset successfully".to_string();
        info!("system reset");
    }

    // ── History ────────────────────────────────────────────────

    /// A copy of the history, oldest first.
    pub fn error_history(&self) -> Vec<ErrorContext> {
        self.lock().history.iter().cloned().collect()
    }

    pub fn clear_error_history(&self) {
        self.lock().history.clear();
        info!("error history cleared");
    }

    /// The history as a pretty-printed JSON array.
    pub fn export_json(&self) -> Result<String, RecoveryError> {
        Ok(serde_json::to_string_pretty(&self.error_history())?)
    }

    pub fn export_to_file(&self, path: impl AsRef<Path>) -> Result<(), RecoveryError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(RecoveryError::EmptyPath);
        }
        let json = self.export_json()?;
        std::fs::write(path, json).map_err(|source| RecoveryError::Export {
            path: path.display().to_string(),
            source,
        })?;
        info!(path = %path.display(), "error history exported");
        Ok(())
    }

    /// Parses a previous [`export_json`](Self::export_json) output.
    pub fn parse_export(json: &str) -> Result<Vec<ErrorContext>, RecoveryError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn log_context(ctx: &ErrorContext) {
    let component = ctx.component.as_str();
    let category = ctx.category;
    match ctx.severity {
        ErrorSeverity::Info => info!(component, %category, "{}", ctx.message),
        ErrorSeverity::Warning => warn!(component, %category, "{}", ctx.message),
        ErrorSeverity::Error => error!(component, %category, "{}", ctx.message),
        ErrorSeverity::Critical => {
            error!(critical = true, component, %category, "{}", ctx.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_handler() -> ErrorHandler {
        ErrorHandler::with_policy(RecoveryPolicy {
            automatic: true,
            max_retries: 3,
            base_delay_ms: 0,
        })
    }

    fn counting_strategy(result: bool) -> (Arc<AtomicUsize>, impl Fn(&ErrorContext) -> bool) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        (calls, move |_: &ErrorContext| {
            counter.fetch_add(1, Ordering::SeqCst);
            result
        })
    }

    #[test]
    fn test_failing_strategy_invoked_max_retries_times() {
        let handler = fast_handler();
        let (calls, strategy) = counting_strategy(false);
        handler.register_recovery_strategy(ErrorCategory::Hardware, strategy);

        let outcome =
            handler.report("npu hung", ErrorSeverity::Error, ErrorCategory::Hardware, "apu");
        assert_eq!(outcome, RecoveryOutcome::Exhausted { attempts: 3 });
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_device_info_read_per_report() {
        static READS: AtomicUsize = AtomicUsize::new(0);
        fn numbered_device() -> DeviceInfo {
            let n = READS.fetch_add(1, Ordering::SeqCst);
            DeviceInfo {
                nodename: format!("node-{n}"),
                ..DeviceInfo::default()
            }
        }

        let handler = fast_handler().with_device_source(numbered_device);
        handler.report("first", ErrorSeverity::Warning, ErrorCategory::System, "engine");
        handler.report("second", ErrorSeverity::Warning, ErrorCategory::System, "engine");

        let history = handler.error_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].device_info.nodename, "node-0");
        assert_eq!(history[1].device_info.nodename, "node-1");
    }

    #[test]
    fn test_no_strategy() {
        let handler = fast_handler();
        let (calls, strategy) = counting_strategy(true);
        handler.register_recovery_strategy(ErrorCategory::Memory, strategy);

        let ctx = ErrorContext::new(
            "dsp lost",
            ErrorSeverity::Error,
            ErrorCategory::Hardware,
            "dsp",
            DeviceInfo::default(),
        );
        assert!(!handler.attempt_recovery(&ctx));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(handler.handle(ctx), RecoveryOutcome::NoStrategy);
    }

    #[test]
    fn test_later_strategy_replaces_earlier() {
        let handler = fast_handler();
        let (first, s1) = counting_strategy(false);
        let (second, s2) = counting_strategy(true);
        handler.register_recovery_strategy(ErrorCategory::Model, s1);
        handler.register_recovery_strategy(ErrorCategory::Model, s2);

        let outcome =
            handler.report("bad model", ErrorSeverity::Error, ErrorCategory::Model, "loader");
        assert_eq!(outcome, RecoveryOutcome::Recovered { attempts: 1 });
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_strategy_counts_as_failure() {
        let handler = fast_handler();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        handler.register_recovery_strategy(ErrorCategory::System, move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("first attempt explodes");
            }
            true
        });
        let outcome = handler.report("oops", ErrorSeverity::Error, ErrorCategory::System, "x");
        assert_eq!(outcome, RecoveryOutcome::Recovered { attempts: 2 });
    }

    #[test]
    fn test_warnings_do_not_recover() {
        let handler = fast_handler();
        let (calls, strategy) = counting_strategy(true);
        handler.register_recovery_strategy(ErrorCategory::Hardware, strategy);

        let outcome =
            handler.report("slow", ErrorSeverity::Warning, ErrorCategory::Hardware, "dsp");
        assert_eq!(outcome, RecoveryOutcome::NotAttempted);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_automatic_recovery_disabled() {
        let handler = fast_handler();
        let (calls, strategy) = counting_strategy(true);
        handler.register_recovery_strategy(ErrorCategory::Hardware, strategy);
        handler.set_automatic_recovery(false);

        let outcome =
            handler.report("lost", ErrorSeverity::Critical, ErrorCategory::Hardware, "dsp");
        assert_eq!(outcome, RecoveryOutcome::NotAttempted);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_message_ignored() {
        let handler = fast_handler();
        let outcome = handler.report("", ErrorSeverity::Critical, ErrorCategory::System, "x");
        assert_eq!(outcome, RecoveryOutcome::Ignored);
        assert!(handler.error_history().is_empty());
        assert!(handler.is_system_healthy());
    }

    #[test]
    fn test_history_capped() {
        let handler = fast_handler();
        for i in 0..=MAX_ERROR_HISTORY {
            handler.report(&format!("error {i}"), ErrorSeverity::Info, ErrorCategory::System, "t");
        }
        let history = handler.error_history();
        assert_eq!(history.len(), MAX_ERROR_HISTORY);
        assert_eq!(history[0].message, "error 1");
        assert_eq!(history[MAX_ERROR_HISTORY - 1].message, format!("error {MAX_ERROR_HISTORY}"));
    }

    #[test]
    fn test_health_and_status() {
        let handler = fast_handler();
        assert_eq!(handler.system_status(), "System healthy");

        handler.report("minor", ErrorSeverity::Warning, ErrorCategory::Network, "net");
        assert!(handler.is_system_healthy());
        assert_eq!(handler.system_status(), "Last error: minor");

        handler.report("thermal shutdown", ErrorSeverity::Critical, ErrorCategory::Hardware, "soc");
        assert!(!handler.is_system_healthy());
        assert_eq!(handler.system_status(), "Last error: thermal shutdown (System unhealthy)");

        handler.report("later", ErrorSeverity::Info, ErrorCategory::System, "x");
        assert_eq!(handler.system_status(), "Last error: later (System unhealthy)");

        handler.reset_system();
        assert!(handler.is_system_healthy());
        assert!(handler.error_history().is_empty());
        assert_eq!(handler.system_status(), "System reset successfully");
    }

    #[test]
    fn test_listener_panic_isolated() {
        let handler = fast_handler();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        handler.register_error_callback(|_| panic!("listener failure"));
        handler.register_error_callback(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        handler.report("e", ErrorSeverity::Info, ErrorCategory::System, "x");
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(handler.error_history().len(), 1);
    }

    #[test]
    fn test_export_parse_round_trip() {
        let handler = fast_handler();
        handler.report("a", ErrorSeverity::Info, ErrorCategory::Model, "m");
        handler.report("b", ErrorSeverity::Critical, ErrorCategory::Security, "s");
        handler.report("c", ErrorSeverity::Warning, ErrorCategory::Network, "n");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("errors.json");
        handler.export_to_file(&path).unwrap();

        let parsed = ErrorHandler::parse_export(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let original = handler.error_history();
        assert_eq!(parsed.len(), original.len());
        for (p, o) in parsed.iter().zip(&original) {
            assert_eq!(
                (&p.message, p.category, p.severity),
                (&o.message, o.category, o.severity)
            );
        }
    }

    #[test]
    fn test_export_empty_path() {
        let handler = fast_handler();
        assert!(matches!(handler.export_to_file(""), Err(RecoveryError::EmptyPath)));
    }

    #[test]
    fn test_retry_operation() {
        let handler = fast_handler();
        let mut calls = 0;
        assert!(handler.retry_operation(
            || {
                calls += 1;
                calls == 3
            },
            5
        ));
        assert_eq!(calls, 3);

        let mut failures = 0;
        assert!(!handler.retry_operation(
            || {
                failures += 1;
                false
            },
            2
        ));
        assert_eq!(failures, 2);
    }

    #[test]
    fn test_concurrent_reports_serialised() {
        let handler = Arc::new(fast_handler());
        let active = Arc::new(AtomicUsize::new(0));
        let overlap = Arc::new(AtomicUsize::new(0));
        {
            let active = Arc::clone(&active);
            let overlap = Arc::clone(&overlap);
            handler.register_recovery_strategy(ErrorCategory::Hardware, move |_| {
                if active.fetch_add(1, Ordering::SeqCst) > 0 {
                    overlap.fetch_add(1, Ordering::SeqCst);
                }
                std::thread::sleep(Duration::from_millis(2));
                active.fetch_sub(1, Ordering::SeqCst);
                true
            });
        }

        let threads: Vec<_> = (0..4)
            .map(|i| {
                let handler = Arc::clone(&handler);
                std::thread::spawn(move || {
                    handler.report(
                        &format!("t{i}"),
                        ErrorSeverity::Error,
                        ErrorCategory::Hardware,
                        "hw",
                    )
                })
            })
            .collect();
        for t in threads {
            assert!(t.join().unwrap().is_recovered());
        }
        assert_eq!(overlap.load(Ordering::SeqCst), 0);
        assert_eq!(handler.error_history().len(), 4);
    }
}
