// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # accel-rt
//!
//! Command-line interface for the edge accelerator runtime.
//!
//! ## Usage
//! ```bash
//! # Run inference on the NeuroPilot APU
//! accel-rt run --model ./models/mobilenet.tflite --accelerator neuropilot-apu --batch 4
//!
//! # Benchmark across batch sizes
//! accel-rt benchmark --model ./models/mobilenet.tflite --batch-sizes 1,4,8 --output results.json
//!
//! # Watch system resources until ctrl-c
//! accel-rt monitor --interval-ms 500 --cpu-threshold 85
//!
//! # List the available backends
//! accel-rt accelerators
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "accel-rt",
    about = "Hardware-accelerated inference runtime for mobile and edge devices",
    version,
    author
)]
struct Cli {
    /// Path to a TOML runtime configuration file. Explicit flags override it.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a model and run inference on synthetic input.
    Run {
        /// Path to the model file (.tflite, .pt, .pth, .onnx).
        #[arg(short, long)]
        model: PathBuf,

        /// Model format: tflite, pytorch, onnx. Detected from the extension if omitted.
        #[arg(short, long)]
        format: Option<String>,

        /// Accelerator: hexagon-dsp, neuropilot-apu, cpu.
        #[arg(short, long)]
        accelerator: Option<String>,

        /// Power profile: low_power, balanced, high_performance.
        #[arg(short, long)]
        power_profile: Option<String>,

        /// Elements per input buffer.
        #[arg(long, default_value_t = 1024)]
        input_len: usize,

        /// Number of inputs to run as one batch.
        #[arg(short, long, default_value_t = 1)]
        batch: usize,

        /// Worker threads.
        #[arg(short, long)]
        threads: Option<usize>,

        /// Per-call memory limit (e.g., "256M", "1G").
        #[arg(long)]
        memory_limit: Option<String>,

        /// Disable hardware acceleration and use the CPU fallback path.
        #[arg(long)]
        no_hw: bool,
    },

    /// Benchmark inference across batch sizes.
    Benchmark {
        /// Path to the model file.
        #[arg(short, long)]
        model: PathBuf,

        /// Accelerator: hexagon-dsp, neuropilot-apu, cpu.
        #[arg(short, long)]
        accelerator: Option<String>,

        /// Comma-separated batch sizes to sweep.
        #[arg(long, default_value = "1,4,8,16")]
        batch_sizes: String,

        /// Recorded runs per batch size.
        #[arg(short, long, default_value_t = 100)]
        runs: usize,

        /// Warm-up runs at batch size 1 (0 disables warm-up).
        #[arg(long, default_value_t = 10)]
        warm_up: usize,

        /// Elements per input buffer.
        #[arg(long, default_value_t = 1024)]
        input_len: usize,

        /// Mark runs slower than this as failed.
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Write results as JSON to this path.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Sample system resources in the background until the duration ends or ctrl-c.
    Monitor {
        /// Stop after this many seconds (runs until ctrl-c if omitted).
        #[arg(short, long)]
        duration_secs: Option<u64>,

        /// Sampling interval in milliseconds.
        #[arg(short, long)]
        interval_ms: Option<u64>,

        /// Alert when CPU usage exceeds this percentage.
        #[arg(long)]
        cpu_threshold: Option<f64>,

        /// Alert when memory usage exceeds this percentage.
        #[arg(long)]
        memory_threshold: Option<f64>,

        /// Alert when the temperature exceeds this many degrees Celsius.
        #[arg(long)]
        temperature_threshold: Option<f64>,

        /// Export the performance report as JSON to this path.
        #[arg(short, long)]
        export: Option<PathBuf>,
    },

    /// Display current system resource status.
    Status,

    /// List registered accelerators and their descriptors.
    Accelerators {
        /// Print descriptors as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging based on verbosity.
    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            model,
            format,
            accelerator,
            power_profile,
            input_len,
            batch,
            threads,
            memory_limit,
            no_hw,
        } => {
            let overrides = commands::Overrides {
                accelerator,
                power_profile,
                threads,
                memory_limit,
                no_hw,
            };
            let config = commands::load_config(cli.config.as_deref(), &overrides)?;
            commands::run::execute(config, model, format, input_len, batch).await
        }
        Commands::Benchmark {
            model,
            accelerator,
            batch_sizes,
            runs,
            warm_up,
            input_len,
            timeout_ms,
            output,
        } => {
            let overrides = commands::Overrides {
                accelerator,
                ..Default::default()
            };
            let config = commands::load_config(cli.config.as_deref(), &overrides)?;
            let args = commands::benchmark::Args {
                model,
                batch_sizes,
                runs,
                warm_up,
                input_len,
                timeout_ms,
                output,
            };
            commands::benchmark::execute(config, args).await
        }
        Commands::Monitor {
            duration_secs,
            interval_ms,
            cpu_threshold,
            memory_threshold,
            temperature_threshold,
            export,
        } => {
            let config = commands::load_config(cli.config.as_deref(), &Default::default())?;
            let args = commands::monitor::Args {
                duration_secs,
                interval_ms,
                cpu_threshold,
                memory_threshold,
                temperature_threshold,
                export,
            };
            commands::monitor::execute(config.monitoring, args).await
        }
        Commands::Status => commands::status::execute().await,
        Commands::Accelerators { json } => commands::accelerators::execute(json).await,
    }
}
