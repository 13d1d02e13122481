// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Example: Compare every registered accelerator across power profiles.
//!
//! Runs a short benchmark sweep per (accelerator, profile) pair on a
//! synthetic model and prints latency, throughput and estimated power.
//! On a development host the vendor backends use their simulated drivers.
//!
//! ```bash
//! cargo run -p runtime --example accelerator_comparison
//! ```

use accelerator::{AcceleratorRegistry, PowerProfile};
use recovery::ErrorHandler;
use runtime::{
    summarize, BenchmarkConfig, BenchmarkRunner, InferenceEngine, ModelConfig, ModelFormat,
    RuntimeConfig,
};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing.
    tracing_subscriber::fmt()
        .with_env_filter("warn")
        .init();

    let registry = AcceleratorRegistry::with_defaults();
    let errors = Arc::new(ErrorHandler::new());
    let profiles = [
        PowerProfile::LowPower,
        PowerProfile::Balanced,
        PowerProfile::HighPerformance,
    ];
    let bench = BenchmarkConfig {
        num_runs: 20,
        warm_up_runs: 3,
        batch_sizes: vec![1, 8],
        input_len: 4096,
        measure_thermal: false,
        ..Default::default()
    };

    println!(
        "{:<16} {:<18} {:>6} {:>10} {:>12} {:>10}",
        "Accelerator", "Profile", "Batch", "Mean ms", "Inputs/s", "Power mW",
    );
    println!("{}", "-".repeat(78));

    for name in registry.names() {
        for profile in profiles {
            let config = RuntimeConfig {
                accelerator: name.to_string(),
                power_profile: profile,
                ..Default::default()
            };
            let accelerator = config.create_accelerator(&registry)?;
            let mut engine = InferenceEngine::new(config.clone(), Arc::clone(&errors))?
                .initialize(accelerator)?;
            engine.load_model_from_bytes(
                "synthetic",
                vec![0; 1 << 20],
                ModelFormat::TfLite,
                config.model_config(),
            )?;

            let results = BenchmarkRunner::new(&mut engine, bench.clone()).run(|_| {});
            for s in summarize(&results) {
                println!(
                    "{:<16} {:<18} {:>6} {:>10.3} {:>12.1} {:>10.0}",
                    name,
                    profile.to_string(),
                    s.batch_size,
                    s.mean_ms,
                    s.throughput,
                    s.mean_power_mw,
                );
            }
            engine.release_resources();
        }
    }

    println!("\n{}", errors.system_status());
    Ok(())
}
