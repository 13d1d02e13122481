// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Memory ceiling for inference calls.
//!
//! The engine checks each call's estimated footprint (model bytes plus
//! input and output buffers) against a [`MemoryLimit`] before touching any
//! backend.

use crate::RuntimeError;
use std::fmt;
use std::str::FromStr;

const KIB: usize = 1024;
const MIB: usize = 1024 * KIB;
const GIB: usize = 1024 * MIB;

/// A hard per-call memory ceiling in bytes.
///
/// # Parsing
/// `"512M"`/`"512MB"`, `"1G"`/`"1GB"`, `"2048K"`/`"2048KB"`, `"100B"` or a
/// plain byte count. Case-insensitive; zero is rejected.
///
/// ```
/// use runtime::MemoryLimit;
///
/// let limit: MemoryLimit = "1G".parse().unwrap();
/// assert_eq!(limit.as_mb(), 1024);
/// assert_eq!(limit.to_string(), "1 GB");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct MemoryLimit {
    bytes: usize,
}

impl MemoryLimit {
    pub fn from_bytes(bytes: usize) -> Self {
        Self { bytes }
    }

    pub fn from_mb(mb: usize) -> Self {
        Self {
            bytes: mb.saturating_mul(MIB),
        }
    }

    pub fn as_bytes(&self) -> usize {
        self.bytes
    }

    /// Whole megabytes, truncated.
    pub fn as_mb(&self) -> usize {
        self.bytes / MIB
    }

    pub fn allows(&self, bytes: usize) -> bool {
        bytes <= self.bytes
    }

    pub fn parse(s: &str) -> Result<Self, RuntimeError> {
        let trimmed = s.trim();
        let upper = trimmed.to_ascii_uppercase();

        let (digits, multiplier) = [
            ("GB", GIB),
            ("G", GIB),
            ("MB", MIB),
            ("M", MIB),
            ("KB", KIB),
            ("K", KIB),
            ("B", 1),
        ]
        .into_iter()
        .find_map(|(suffix, mul)| {
            upper
                .strip_suffix(suffix)
                .map(|_| (&trimmed[..trimmed.len() - suffix.len()], mul))
        })
        .unwrap_or((trimmed, 1));

        let value: usize = digits.trim().parse().map_err(|_| {
            RuntimeError::InvalidConfig(format!(
                "invalid memory limit '{s}': expected a number with an optional K, M or G suffix"
            ))
        })?;
        let bytes = value
            .checked_mul(multiplier)
            .ok_or_else(|| RuntimeError::InvalidConfig(format!("memory limit overflow: '{s}'")))?;
        if bytes == 0 {
            return Err(RuntimeError::InvalidConfig("memory limit must be non-zero".into()));
        }
        Ok(Self { bytes })
    }
}

impl FromStr for MemoryLimit {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for MemoryLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bytes {
            b if b >= GIB && b % GIB == 0 => write!(f, "{} GB", b / GIB),
            b if b >= MIB && b % MIB == 0 => write!(f, "{} MB", b / MIB),
            b if b >= KIB && b % KIB == 0 => write!(f, "{} KB", b / KIB),
            b => write!(f, "{b} B"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_suffixes() {
        assert_eq!(MemoryLimit::parse("512M").unwrap().as_mb(), 512);
        assert_eq!(MemoryLimit::parse("512mb").unwrap().as_mb(), 512);
        assert_eq!(MemoryLimit::parse("2g").unwrap().as_mb(), 2048);
        assert_eq!(MemoryLimit::parse("2048K").unwrap().as_bytes(), 2 * MIB);
        assert_eq!(MemoryLimit::parse("100B").unwrap().as_bytes(), 100);
        assert_eq!(MemoryLimit::parse(" 1048576 ").unwrap().as_mb(), 1);
    }

    #[test]
    fn test_parse_rejects() {
        for bad in ["", "abc", "0M", "M", "12X"] {
            assert!(
                matches!(MemoryLimit::parse(bad), Err(RuntimeError::InvalidConfig(_))),
                "{bad:?} should be rejected"
            );
        }
        assert!(MemoryLimit::parse(&format!("{}G", usize::MAX)).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(MemoryLimit::from_mb(1024).to_string(), "1 GB");
        assert_eq!(MemoryLimit::from_mb(512).to_string(), "512 MB");
        assert_eq!(MemoryLimit::from_bytes(2048).to_string(), "2 KB");
        assert_eq!(MemoryLimit::from_bytes(100).to_string(), "100 B");
    }

    #[test]
    fn test_allows() {
        let limit = MemoryLimit::from_bytes(1000);
        assert!(limit.allows(1000));
        assert!(!limit.allows(1001));
    }
}
