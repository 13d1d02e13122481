// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Retry policy and the recovery state machine.
//!
//! The machine does no I/O and never sleeps: it hands out attempt numbers
//! and the backoff to wait after each failure, and the caller decides how
//! to wait.
//!
//! ```text
//! Idle ──next_attempt──▶ Retrying{1} ──fail, wait 2·base──▶ Retrying{2} … ──▶ Exhausted{max}
//!                             │
//!                             └──success──▶ Succeeded{n}
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How recovery is attempted. Loadable as the `[recovery]` config table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryPolicy {
    /// Run strategies automatically for `Error` and `Critical` reports.
    pub automatic: bool,
    /// Maximum strategy invocations per failure.
    pub max_retries: u32,
    /// Backoff after failed attempt `n` is `base_delay_ms × 2^n`.
    pub base_delay_ms: u64,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            automatic: true,
            max_retries: 3,
            base_delay_ms: 100,
        }
    }
}

impl RecoveryPolicy {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Delay after failed attempt `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay().saturating_mul(factor)
    }
}

/// Where a recovery run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryState {
    Idle,
    /// Attempt `attempt` (1-based) is due or running.
    Retrying { attempt: u32 },
    Succeeded { attempts: u32 },
    Exhausted { attempts: u32 },
}

/// Drives one recovery run under a [`RecoveryPolicy`].
#[derive(Debug, Clone)]
pub struct RecoveryMachine {
    policy: RecoveryPolicy,
    state: RecoveryState,
}

impl RecoveryMachine {
    pub fn new(policy: RecoveryPolicy) -> Self {
        Self {
            policy,
            state: RecoveryState::Idle,
        }
    }

    pub fn state(&self) -> RecoveryState {
        self.state
    }

    /// Returns the attempt to run next, or `None` once the run is over.
    ///
    /// With `max_retries == 0` the first call moves straight to
    /// `Exhausted { attempts: 0 }`.
    pub fn next_attempt(&mut self) -> Option<u32> {
        match self.state {
            RecoveryState::Idle if self.policy.max_retries == 0 => {
                self.state = RecoveryState::Exhausted { attempts: 0 };
                None
            }
            RecoveryState::Idle => {
                self.state = RecoveryState::Retrying { attempt: 1 };
                Some(1)
            }
            RecoveryState::Retrying { attempt } => Some(attempt),
            RecoveryState::Succeeded { .. } | RecoveryState::Exhausted { .. } => None,
        }
    }

    /// Records the result of the current attempt.
    ///
    /// Returns the backoff to wait before the next attempt, or `None` if
    /// the run just ended (success, or the last attempt failed). Outside
    /// `Retrying` this does nothing.
    pub fn record(&mut self, success: bool) -> Option<Duration> {
        let RecoveryState::Retrying { attempt } = self.state else {
            return None;
        };
        if success {
            self.state = RecoveryState::Succeeded { attempts: attempt };
            None
        } else if attempt >= self.policy.max_retries {
            self.state = RecoveryState::Exhausted { attempts: attempt };
            None
        } else {
            self.state = RecoveryState::Retrying {
                attempt: attempt + 1,
            };
            Some(self.policy.backoff(attempt))
        }
    }

    /// Runs `attempt` to completion, calling `wait` with each backoff.
    pub fn drive<A, W>(mut self, mut attempt: A, mut wait: W) -> RecoveryState
    where
        A: FnMut(u32) -> bool,
        W: FnMut(Duration),
    {
        while let Some(n) = self.next_attempt() {
            let ok = attempt(n);
            if let Some(delay) = self.record(ok) {
                wait(delay);
            }
        }
        self.state
    }
}
