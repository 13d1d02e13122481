// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `accel-rt monitor` command: background sampling with threshold alerts.
//!
//! The sampler runs on its own thread; this command only polls the latest
//! sample for display and stops on ctrl-c or when the duration elapses.

use super::{banner, usage_bar};
use anyhow::Context;
use resource_monitor::{MonitoringConfig, PerformanceMonitor, PerformanceSample};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;

pub struct Args {
    pub duration_secs: Option<u64>,
    pub interval_ms: Option<u64>,
    pub cpu_threshold: Option<f64>,
    pub memory_threshold: Option<f64>,
    pub temperature_threshold: Option<f64>,
    pub export: Option<PathBuf>,
}

pub async fn execute(base: MonitoringConfig, args: Args) -> anyhow::Result<()> {
    banner("Resource Monitor");

    let config = apply_args(base, &args)?;
    println!(
        "  Interval {} ms; alerts at CPU > {:.0}%, memory > {:.0}%, temperature > {:.0} C",
        config.sampling_interval_ms,
        config.thresholds.cpu_percent,
        config.thresholds.memory_percent,
        config.thresholds.temperature_celsius,
    );
    match args.duration_secs {
        Some(s) => println!("  Running for {s} s (ctrl-c to stop early)"),
        None => println!("  Running until ctrl-c"),
    }
    println!();

    let mut monitor = PerformanceMonitor::new();
    monitor.register_alert_callback(|alert| {
        println!("   ALERT {}: {}", alert.kind, alert.message);
    });
    let interval = config.sampling_interval();
    monitor.start_monitoring(config);

    let deadline = args
        .duration_secs
        .map(|s| Instant::now() + Duration::from_secs(s));
    let stop_at = wait_until(deadline);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(stop_at, ctrl_c);

    let mut ticker = tokio::time::interval(interval);
    let mut last_shown = 0u64;
    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result.context("listening for ctrl-c")?;
                println!();
                println!("  Interrupted.");
                break;
            }
            _ = &mut stop_at => break,
            _ = ticker.tick() => {
                if let Some(sample) = monitor.current_metrics() {
                    if sample.timestamp_ms != last_shown {
                        last_shown = sample.timestamp_ms;
                        println!("   {}", sample_line(&sample));
                    }
                }
            }
        }
    }

    monitor.stop_monitoring();
    let report = monitor.report();
    println!();
    println!("  Report:");
    println!("   Samples:        {}", report.total_samples);
    println!("   Average CPU:    {:.1}%", report.average_cpu_usage);
    println!("   Peak memory:    {:.1}%", report.peak_memory_usage);
    println!("   Average power:  {:.0} mW", report.average_power_consumption);

    if let Some(path) = &args.export {
        monitor
            .export_report(path)
            .with_context(|| format!("exporting report to {}", path.display()))?;
        println!("   Report written to {}", path.display());
    }
    Ok(())
}

/// Overlays the command-line flags on the configured monitoring settings.
fn apply_args(mut config: MonitoringConfig, args: &Args) -> anyhow::Result<MonitoringConfig> {
    if let Some(ms) = args.interval_ms {
        anyhow::ensure!(ms > 0, "--interval-ms must be at least 1");
        config = config.with_interval(Duration::from_millis(ms));
    }
    if let Some(v) = args.cpu_threshold {
        config.thresholds.cpu_percent = v;
    }
    if let Some(v) = args.memory_threshold {
        config.thresholds.memory_percent = v;
    }
    if let Some(v) = args.temperature_threshold {
        config.thresholds.temperature_celsius = v;
    }
    Ok(config)
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn sample_line(s: &PerformanceSample) -> String {
    format!(
        "CPU {:>5.1}% {}  Mem {:>5.1}%  GPU {:>5.1}%  {:>6.0} mW  {:>5.1} C  {:>8.1} kB/s",
        s.cpu_percent,
        usage_bar(s.cpu_percent),
        s.memory_percent,
        s.gpu_percent,
        s.power_mw,
        s.temperature_celsius,
        s.network_kbps,
    )
}
