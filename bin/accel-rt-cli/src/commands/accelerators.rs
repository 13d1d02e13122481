// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `accel-rt accelerators` command: list registered backends.
//!
//! Each backend is initialized just long enough to read its descriptor and
//! availability, then released.

use super::banner;
use accelerator::{AcceleratorDescriptor, AcceleratorRegistry};
use serde_json::json;

pub async fn execute(as_json: bool) -> anyhow::Result<()> {
    let entries = probe(&AcceleratorRegistry::with_defaults())?;

    if as_json {
        let list: Vec<_> = entries
            .iter()
            .map(|(desc, available)| json!({ "descriptor": desc, "available": available }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    banner("Accelerators");
    for (desc, available) in &entries {
        println!(
            "  {:<16} {:<28} {}",
            desc.name,
            desc.display_name,
            if *available { "available" } else { "not present" }
        );
        println!("   Power range:  {} (default level {})", desc.power_range, desc.power_level);
        println!("   Driver:       {} / firmware {}", desc.driver_version, desc.firmware_version);
        println!("   Operations:   {}", desc.supported_operations.join(", "));
        println!();
    }
    Ok(())
}

/// Initializes every registered backend and returns its descriptor and availability.
fn probe(registry: &AcceleratorRegistry) -> anyhow::Result<Vec<(AcceleratorDescriptor, bool)>> {
    let mut entries = Vec::new();
    for name in registry.names() {
        let mut acc = registry.create(name)?;
        if let Err(e) = acc.initialize() {
            tracing::warn!(accelerator = name, error = %e, "initialization failed");
        }
        let available = acc.is_available();
        entries.push((acc.descriptor(), available));
        acc.release_resources();
    }
    Ok(entries)
}
