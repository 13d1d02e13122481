// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `accel-rt benchmark` command: sweep batch sizes and report latency.

use super::{banner, build_engine};
use anyhow::Context;
use runtime::{
    export_results, summarize, BenchmarkConfig, BenchmarkRunner, ModelFormat, RuntimeConfig,
};
use std::path::PathBuf;
use std::time::Duration;

pub struct Args {
    pub model: PathBuf,
    pub batch_sizes: String,
    pub runs: usize,
    pub warm_up: usize,
    pub input_len: usize,
    pub timeout_ms: Option<u64>,
    pub output: Option<PathBuf>,
}

pub async fn execute(config: RuntimeConfig, args: Args) -> anyhow::Result<()> {
    banner("Benchmark");

    let batch_sizes = parse_batch_sizes(&args.batch_sizes)?;
    anyhow::ensure!(args.runs > 0, "--runs must be at least 1");

    let (mut engine, errors) = build_engine(&config)?;
    // Every swept batch size must fit the model.
    let max_batch = batch_sizes.iter().copied().max().unwrap_or(1);
    let model_config = config
        .model_config()
        .with_max_batch_size(max_batch.max(config.max_batch_size));
    match engine.load_model(&args.model, None, model_config.clone()) {
        Ok(()) => {}
        Err(runtime::RuntimeError::ModelLoad { .. }) => {
            println!("  Model file not readable. Benchmarking a synthetic 4 MB model.");
            let format = ModelFormat::from_path(&args.model).unwrap_or(ModelFormat::TfLite);
            engine.load_model_from_bytes("synthetic", vec![0; 4 << 20], format, model_config)?;
        }
        Err(e) => return Err(e.into()),
    }

    println!("  Accelerator: {}", engine.accelerator_descriptor().summary());
    println!("  {}", engine.model_info());
    println!(
        "  Sweep:       batch sizes {:?}, {} runs each, {} warm-up",
        batch_sizes, args.runs, args.warm_up
    );
    println!();

    let bench = BenchmarkConfig {
        num_runs: args.runs,
        warm_up: args.warm_up > 0,
        warm_up_runs: args.warm_up,
        batch_sizes,
        input_len: args.input_len,
        run_timeout: args.timeout_ms.map(Duration::from_millis),
        ..Default::default()
    };
    let total = bench.batch_sizes.len() * bench.num_runs;
    let mut done = 0usize;
    let results = BenchmarkRunner::new(&mut engine, bench).run(|_| {
        done += 1;
        if done % 50 == 0 || done == total {
            tracing::info!("{done}/{total} runs");
        }
    });

    println!("  Results:");
    for s in summarize(&results) {
        println!("   {}", s.summary());
    }
    println!();

    if let Some(path) = &args.output {
        export_results(path, &results)
            .with_context(|| format!("exporting results to {}", path.display()))?;
        println!("  Results written to {}", path.display());
    }
    println!("  Health: {}", errors.system_status());

    engine.release_resources();
    Ok(())
}

/// Parses `"1,4,8"` into sorted, deduplicated batch sizes.
fn parse_batch_sizes(s: &str) -> anyhow::Result<Vec<usize>> {
    let mut sizes = s
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            let n: usize = p.parse().with_context(|| format!("invalid batch size '{p}'"))?;
            anyhow::ensure!(n > 0, "batch size must be at least 1");
            Ok(n)
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    anyhow::ensure!(!sizes.is_empty(), "no batch sizes given");
    sizes.sort_unstable();
    sizes.dedup();
    Ok(sizes)
}
