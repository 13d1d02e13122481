// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Generic-processor execution path.
//!
//! Used when hardware acceleration is disabled, the accelerator is not
//! available, or it failed and recovery did not bring it back.

use accelerator::kernel;
use tracing::trace;

/// Runs the host kernel split into a fixed number of parallel chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuExecutor {
    threads: usize,
}

impl Default for CpuExecutor {
    fn default() -> Self {
        Self::new(1)
    }
}

impl CpuExecutor {
    /// `threads` is clamped to at least one.
    pub fn new(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
        }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn set_threads(&mut self, threads: usize) {
        self.threads = threads.max(1);
    }

    /// Executes `input`, replacing the contents of `output`.
    pub fn execute(&self, input: &[f32], output: &mut Vec<f32>) {
        output.clear();
        output.resize(input.len(), 0.0);
        kernel::execute_into(input, output, self.threads);
        trace!(len = input.len(), threads = self.threads, "cpu fallback executed");
    }
}
