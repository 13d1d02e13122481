// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Host reference kernel.
//!
//! Stands in for the external inference runtime on the generic processor:
//! output has the input's shape and values. Both the CPU accelerator and
//! the engine's fallback path execute through here so their results agree.

use rayon::prelude::*;

/// Inputs shorter than this run on the calling thread.
const MIN_PARALLEL_LEN: usize = 4096;

/// Executes the kernel on one chunk. `output` must be as long as `input`.
pub fn execute_chunk(input: &[f32], output: &mut [f32]) {
    output.copy_from_slice(input);
}

/// Executes the kernel over `input`, split into `threads` chunks on the
/// rayon pool, and returns the output buffer.
pub fn execute_parallel(input: &[f32], threads: usize) -> Vec<f32> {
    let mut output = vec![0.0; input.len()];
    execute_into(input, &mut output, threads);
    output
}

/// Like [`execute_parallel`] but writes into a caller-owned buffer of the
/// same length.
pub fn execute_into(input: &[f32], output: &mut [f32], threads: usize) {
    let threads = threads.max(1);
    if threads == 1 || input.len() < MIN_PARALLEL_LEN {
        execute_chunk(input, output);
        return;
    }

    let chunk = input.len().div_ceil(threads);
    output
        .par_chunks_mut(chunk)
        .zip(input.par_chunks(chunk))
        .for_each(|(dst, src)| execute_chunk(src, dst));
}
