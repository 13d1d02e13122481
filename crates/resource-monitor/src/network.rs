// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Network throughput from `/proc/net/dev` byte counters.

use crate::sysfs::read_trimmed;
use crate::MonitorError;
use std::path::Path;
use std::time::Instant;

const NET_DEV_PATH: &str = "/proc/net/dev";

/// Total received + transmitted bytes over all non-loopback interfaces.
#[derive(Debug, Clone, Copy)]
pub struct NetCounters {
    pub total_bytes: u64,
    pub taken_at: Instant,
}

impl NetCounters {
    pub fn read() -> Result<Self, MonitorError> {
        let content = read_trimmed(Path::new(NET_DEV_PATH))?;
        Ok(Self {
            total_bytes: Self::parse(&content),
            taken_at: Instant::now(),
        })
    }

    /// Sums rx and tx bytes of every interface except `lo`.
    ///
    /// Line format after the two header lines:
    /// `  eth0: rx_bytes rx_packets ... (8 rx fields) tx_bytes ...`
    pub(crate) fn parse(content: &str) -> u64 {
        content
            .lines()
            .filter_map(|line| line.split_once(':'))
            .filter(|(iface, _)| iface.trim() != "lo")
            .filter_map(|(_, stats)| {
                let fields: Vec<u64> = stats
                    .split_whitespace()
                    .filter_map(|f| f.parse().ok())
                    .collect();
                Some(fields.first()? + fields.get(8)?)
            })
            .sum()
    }

    /// Throughput in kilobits per second since `earlier`.
    pub fn kbps_since(&self, earlier: &NetCounters) -> f64 {
        let secs = self.taken_at.duration_since(earlier.taken_at).as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        let bytes = self.total_bytes.saturating_sub(earlier.total_bytes);
        bytes as f64 * 8.0 / 1000.0 / secs
    }
}
