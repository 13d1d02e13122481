// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Runtime configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! accelerator = "hexagon-dsp"
//! num_threads = 4
//! power_profile = "balanced"
//! memory_limit = "512M"
//! enable_hardware_acceleration = true
//! enable_profiling = true
//! max_batch_size = 16
//!
//! [recovery]
//! automatic = true
//! max_retries = 3
//! base_delay_ms = 100
//!
//! [monitoring]
//! sampling_interval_ms = 1000
//! max_history = 3600
//!
//! [monitoring.thresholds]
//! cpu_percent = 80.0
//! memory_percent = 90.0
//! temperature_celsius = 80.0
//! ```
//!
//! Every key is optional; missing keys take their defaults.

use crate::{MemoryLimit, ModelConfig, RuntimeError};
use accelerator::{Accelerator, AcceleratorRegistry, PowerProfile};
use recovery::RecoveryPolicy;
use resource_monitor::MonitoringConfig;
use std::path::Path;

/// Configuration for the inference runtime.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Registry name of the accelerator: `"hexagon-dsp"`, `"neuropilot-apu"`, `"cpu"`.
    pub accelerator: String,
    /// Worker threads (defaults to the number of online cores).
    pub num_threads: Option<usize>,
    pub power_profile: PowerProfile,
    /// Per-call memory ceiling (human-readable, e.g. `"512M"`). Unlimited when unset.
    pub memory_limit: Option<String>,
    /// When `false` every call takes the CPU fallback path.
    pub enable_hardware_acceleration: bool,
    /// Collect [`InferenceMetrics`](crate::InferenceMetrics) for every call.
    pub enable_profiling: bool,
    /// Default `max_batch_size` for models loaded through [`model_config`](Self::model_config).
    pub max_batch_size: usize,
    pub recovery: RecoveryPolicy,
    pub monitoring: MonitoringConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            accelerator: "cpu".to_string(),
            num_threads: None,
            power_profile: PowerProfile::default(),
            memory_limit: None,
            enable_hardware_acceleration: true,
            enable_profiling: true,
            max_batch_size: ModelConfig::default().max_batch_size,
            recovery: RecoveryPolicy::default(),
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Loads and validates configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RuntimeError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, RuntimeError> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| RuntimeError::Config(format!("TOML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, RuntimeError> {
        toml::to_string_pretty(self)
            .map_err(|e| RuntimeError::Config(format!("TOML serialise error: {e}")))
    }

    /// Rejects zero threads, a zero batch size and unparsable limits.
    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.num_threads == Some(0) {
            return Err(RuntimeError::InvalidConfig("num_threads must be at least 1".into()));
        }
        if self.max_batch_size == 0 {
            return Err(RuntimeError::InvalidConfig("max_batch_size must be at least 1".into()));
        }
        self.parse_memory_limit()?;
        Ok(())
    }

    pub fn parse_memory_limit(&self) -> Result<Option<MemoryLimit>, RuntimeError> {
        self.memory_limit.as_deref().map(MemoryLimit::parse).transpose()
    }

    /// Resolves the number of worker threads.
    pub fn resolve_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }

    /// Builds the configured accelerator from `registry`.
    pub fn create_accelerator(
        &self,
        registry: &AcceleratorRegistry,
    ) -> Result<Box<dyn Accelerator>, RuntimeError> {
        registry.create(&self.accelerator).map_err(|e| {
            RuntimeError::Config(format!("accelerator '{}': {e}", self.accelerator))
        })
    }

    /// A [`ModelConfig`] carrying this configuration's batch limit.
    pub fn model_config(&self) -> ModelConfig {
        ModelConfig::default().with_max_batch_size(self.max_batch_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let c = RuntimeConfig::default();
        assert_eq!(c.accelerator, "cpu");
        assert_eq!(c.power_profile, PowerProfile::Balanced);
        assert!(c.enable_hardware_acceleration);
        assert!(c.enable_profiling);
        assert_eq!(c.recovery.max_retries, 3);
        assert_eq!(c.monitoring.sampling_interval_ms, 1000);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_from_toml_nested_tables() {
        let toml = r#"
accelerator = "neuropilot-apu"
num_threads = 2
power_profile = "low_power"
memory_limit = "256M"
enable_hardware_acceleration = false
max_batch_size = 8

[recovery]
automatic = false
max_retries = 5

[monitoring]
sampling_interval_ms = 250
monitor_network = false

[monitoring.thresholds]
cpu_percent = 95.0
"#;
        let c = RuntimeConfig::from_toml(toml).unwrap();
        assert_eq!(c.accelerator, "neuropilot-apu");
        assert_eq!(c.num_threads, Some(2));
        assert_eq!(c.power_profile, PowerProfile::LowPower);
        assert_eq!(c.parse_memory_limit().unwrap().unwrap().as_mb(), 256);
        assert!(!c.enable_hardware_acceleration);
        assert!(c.enable_profiling);
        assert_eq!(c.max_batch_size, 8);
        assert!(!c.recovery.automatic);
        assert_eq!(c.recovery.max_retries, 5);
        assert_eq!(c.recovery.base_delay_ms, 100);
        assert_eq!(c.monitoring.sampling_interval_ms, 250);
        assert!(!c.monitoring.monitor_network);
        assert_eq!(c.monitoring.thresholds.cpu_percent, 95.0);
        assert_eq!(c.monitoring.thresholds.memory_percent, 90.0);
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let c = RuntimeConfig {
            memory_limit: Some("1G".into()),
            num_threads: Some(3),
            ..Default::default()
        };
        let toml = c.to_toml().unwrap();
        let back = RuntimeConfig::from_toml(&toml).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(matches!(
            RuntimeConfig::from_toml("num_threads = 0"),
            Err(RuntimeError::InvalidConfig(_))
        ));
        assert!(matches!(
            RuntimeConfig::from_toml("max_batch_size = 0"),
            Err(RuntimeError::InvalidConfig(_))
        ));
        assert!(RuntimeConfig::from_toml("memory_limit = \"lots\"").is_err());
        assert!(matches!(
            RuntimeConfig::from_toml("power_profile = \"turbo\""),
            Err(RuntimeError::Config(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runtime.toml");
        std::fs::write(&path, "accelerator = \"hexagon-dsp\"\n").unwrap();
        assert_eq!(RuntimeConfig::from_file(&path).unwrap().accelerator, "hexagon-dsp");
        assert!(RuntimeConfig::from_file(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_create_accelerator() {
        let registry = AcceleratorRegistry::with_defaults();
        let c = RuntimeConfig {
            accelerator: "hexagon-dsp".into(),
            ..Default::default()
        };
        assert_eq!(c.create_accelerator(&registry).unwrap().name(), "hexagon-dsp");

        let bad = RuntimeConfig {
            accelerator: "tpu".into(),
            ..Default::default()
        };
        assert!(bad.create_accelerator(&registry).is_err());
    }

    #[test]
    fn test_resolve_threads() {
        let c = RuntimeConfig {
            num_threads: Some(8),
            ..Default::default()
        };
        assert_eq!(c.resolve_threads(), 8);
        assert!(RuntimeConfig::default().resolve_threads() >= 1);
    }
}
