// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and the helpers they share.

pub mod accelerators;
pub mod benchmark;
pub mod monitor;
pub mod run;
pub mod status;

use accelerator::{AcceleratorRegistry, PowerProfile};
use anyhow::Context;
use recovery::ErrorHandler;
use runtime::{InferenceEngine, Ready, RuntimeConfig};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Installs the fmt subscriber. `RUST_LOG` wins over the `-v` count.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose >= 2)
        .init();
}

/// Command-line flags that take precedence over the configuration file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub accelerator: Option<String>,
    pub power_profile: Option<String>,
    pub threads: Option<usize>,
    pub memory_limit: Option<String>,
    pub no_hw: bool,
}

/// Reads the configuration file (or defaults) and applies `overrides`.
pub fn load_config(path: Option<&Path>, overrides: &Overrides) -> anyhow::Result<RuntimeConfig> {
    let mut config = match path {
        Some(p) => RuntimeConfig::from_file(p)
            .with_context(|| format!("loading configuration from {}", p.display()))?,
        None => RuntimeConfig::default(),
    };

    if let Some(name) = &overrides.accelerator {
        config.accelerator = name.clone();
    }
    if let Some(profile) = &overrides.power_profile {
        config.power_profile = profile.parse::<PowerProfile>()?;
    }
    if overrides.threads.is_some() {
        config.num_threads = overrides.threads;
    }
    if overrides.memory_limit.is_some() {
        config.memory_limit = overrides.memory_limit.clone();
    }
    if overrides.no_hw {
        config.enable_hardware_acceleration = false;
    }
    config.validate()?;
    Ok(config)
}

/// Builds the configured accelerator and brings an engine to `Ready`.
pub fn build_engine(
    config: &RuntimeConfig,
) -> anyhow::Result<(InferenceEngine<Ready>, Arc<ErrorHandler>)> {
    let errors = Arc::new(ErrorHandler::with_policy(config.recovery));
    let registry = AcceleratorRegistry::with_defaults();
    let accelerator = config.create_accelerator(&registry)?;
    let engine = InferenceEngine::new(config.clone(), Arc::clone(&errors))?
        .initialize(accelerator)
        .with_context(|| format!("initializing accelerator '{}'", config.accelerator))?;
    Ok((engine, errors))
}

/// Prints the boxed command banner.
pub fn banner(title: &str) {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║ {:^52} ║", format!("accel-rt · {title}"));
    println!("╚══════════════════════════════════════════════════════╝");
    println!();
}

/// Creates a visual usage bar (0-100 scale).
pub fn usage_bar(percent: f64) -> String {
    let filled = ((percent / 100.0) * 20.0).round().clamp(0.0, 20.0) as usize;
    let empty = 20 - filled;
    let symbol = if percent >= 90.0 {
        "#"
    } else if percent >= 70.0 {
        "="
    } else {
        "-"
    };
    format!("[{}{}]", symbol.repeat(filled), ".".repeat(empty))
}
