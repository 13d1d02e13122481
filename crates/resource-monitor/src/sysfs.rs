// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Small helpers shared by every sysfs/procfs reader in this crate.

use crate::MonitorError;
use std::path::Path;

/// Reads a sysfs/procfs file and returns its trimmed content.
pub(crate) fn read_trimmed(path: &Path) -> Result<String, MonitorError> {
    if !path.exists() {
        return Err(MonitorError::NotAvailable {
            path: path.display().to_string(),
        });
    }
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|e| MonitorError::ReadError {
            path: path.display().to_string(),
            source: e,
        })
}

/// Reads a file holding a single integer (optionally followed by a unit).
pub(crate) fn read_i64(path: &Path) -> Result<i64, MonitorError> {
    let content = read_trimmed(path)?;
    leading_number(&content)
        .map(|v| v as i64)
        .ok_or_else(|| MonitorError::ParseError {
            path: path.display().to_string(),
            detail: format!("expected an integer, got '{content}'"),
        })
}

/// Parses the leading numeric token of strings like `"42 %"` or `"54321"`.
pub(crate) fn leading_number(s: &str) -> Option<f64> {
    let token: String = s
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    token.parse().ok()
}

/// Finds `key` in a `Key:   value kB` style file and returns the value.
pub(crate) fn find_kb_field(content: &str, key: &str) -> Option<u64> {
    content.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        if parts.next()? == key {
            parts.next()?.parse().ok()
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_number() {
        assert_eq!(leading_number("42 %"), Some(42.0));
        assert_eq!(leading_number("  54321\n"), Some(54321.0));
        assert_eq!(leading_number("-1200"), Some(-1200.0));
        assert_eq!(leading_number("n/a"), None);
    }

    #[test]
    fn test_find_kb_field() {
        let content = "Name:\tcat\nVmRSS:\t   2048 kB\nThreads:\t1\n";
        assert_eq!(find_kb_field(content, "VmRSS:"), Some(2048));
        assert_eq!(find_kb_field(content, "VmSwap:"), None);
    }

    #[test]
    fn test_missing_file() {
        let result = read_trimmed(Path::new("/nonexistent/node"));
        assert!(matches!(result, Err(MonitorError::NotAvailable { .. })));
    }

    #[test]
    fn test_read_i64_with_unit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gpu_busy");
        std::fs::write(&path, "37 %\n").unwrap();
        assert_eq!(read_i64(&path).unwrap(), 37);
    }
}
