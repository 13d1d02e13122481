// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `accel-rt status` command: display current system resource state.
//!
//! Reads thermal, memory, CPU, GPU and battery figures from procfs and
//! sysfs. On hosts without some of those nodes (containers, laptops) the
//! missing readings show as zero or n/a and the command still works.

use super::{banner, usage_bar};
use resource_monitor::{DeviceInfo, ProcessStats, ThermalInfo};

pub async fn execute() -> anyhow::Result<()> {
    banner("System Resource Status");

    let snapshot = resource_monitor::snapshot()?;

    // ── Device ─────────────────────────────────────────────────
    println!("  Device");
    println!("   {}", DeviceInfo::capture().summary());
    println!();

    // ── Thermal ────────────────────────────────────────────────
    println!("  Thermal");
    let temp = snapshot.thermal.cpu_temp_celsius as f64;
    println!("   Temperature:  {temp:.1} C  {}", usage_bar(temp));
    println!(
        "   Throttling:   {:.0}%",
        snapshot.thermal.throttling_percent()
    );
    for zone in ThermalInfo::zones() {
        println!("   zone {:<2} {:<20} {:.1} C", zone.index, zone.kind, zone.temp_celsius);
    }
    if snapshot.thermal.is_overheating() {
        println!("   WARNING: THERMAL THROTTLING ACTIVE");
    }
    println!();

    // ── Memory ─────────────────────────────────────────────────
    println!("  Memory");
    let total = snapshot.memory.total_mb();
    let avail = snapshot.memory.available_mb();
    let pct = snapshot.memory.utilisation_percent();
    println!("   Total:        {total} MB");
    println!("   Available:    {avail} MB");
    println!("   Used:         {} MB ({pct:.1}%)  {}", total.saturating_sub(avail), usage_bar(pct));
    if let Ok(process) = ProcessStats::read() {
        println!("   This process: {:.1} MB RSS", process.rss_mb());
    }
    println!();

    // ── CPU / GPU ──────────────────────────────────────────────
    println!("  CPU");
    println!("   Online cores: {}", snapshot.cpu.online_cores);
    println!(
        "   Frequency:    {} / {} MHz",
        snapshot.cpu.frequency_mhz, snapshot.cpu.max_frequency_mhz,
    );
    println!("   Load (1m):    {:.2} per core", snapshot.cpu.load_per_core);
    if snapshot.cpu.is_throttled() {
        println!("   WARNING: CPU frequency is throttled");
    }
    match &snapshot.gpu {
        Some(gpu) => println!("   GPU busy:     {:.1}% ({})", gpu.busy_percent, gpu.node),
        None => println!("   GPU busy:     n/a"),
    }
    println!();

    // ── Power ──────────────────────────────────────────────────
    println!("  Power");
    match &snapshot.power {
        Some(p) => println!("   Draw:         {:.0} mW ({:?})", p.power_mw, p.source),
        None => println!("   Draw:         n/a (no battery node)"),
    }
    println!();

    // ── Overall Assessment ─────────────────────────────────────
    println!("  Assessment");
    if snapshot.is_resource_constrained() {
        println!("   Status:       RESOURCE CONSTRAINED");
        println!("   Recommended:  low_power profile, smaller batches");
    } else {
        println!("   Status:       System healthy");
        println!("   Recommended:  balanced or high_performance profile");
    }
    println!();
    println!("{}", snapshot.summary());

    Ok(())
}
