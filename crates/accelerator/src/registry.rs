// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Accelerator selection by name.
//!
//! [`AcceleratorKind`] is the closed set of built-in backends.
//! [`AcceleratorRegistry`] is the open table the runtime and CLI look names
//! up in; integrators add their own backends with
//! [`register`](AcceleratorRegistry::register).

use crate::{Accelerator, AcceleratorError, CpuAccelerator, HexagonDsp, NeuroPilotApu};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Builds a fresh, uninitialized accelerator.
pub type AcceleratorFactory = Arc<dyn Fn() -> Box<dyn Accelerator> + Send + Sync>;

/// Built-in backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcceleratorKind {
    HexagonDsp,
    NeuroPilotApu,
    Cpu,
}

impl AcceleratorKind {
    pub const ALL: [AcceleratorKind; 3] = [Self::HexagonDsp, Self::NeuroPilotApu, Self::Cpu];

    pub fn name(self) -> &'static str {
        match self {
            Self::HexagonDsp => "hexagon-dsp",
            Self::NeuroPilotApu => "neuropilot-apu",
            Self::Cpu => "cpu",
        }
    }

    pub fn create(self) -> Box<dyn Accelerator> {
        match self {
            Self::HexagonDsp => Box::new(HexagonDsp::new()),
            Self::NeuroPilotApu => Box::new(NeuroPilotApu::new()),
            Self::Cpu => Box::new(CpuAccelerator::new()),
        }
    }
}

impl fmt::Display for AcceleratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AcceleratorKind {
    type Err = AcceleratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.name() == lower)
            .ok_or_else(|| AcceleratorError::invalid(format!("unknown accelerator '{s}'")))
    }
}

/// Named accelerator factories.
#[derive(Clone, Default)]
pub struct AcceleratorRegistry {
    factories: BTreeMap<String, AcceleratorFactory>,
}

impl fmt::Debug for AcceleratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcceleratorRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl AcceleratorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every [`AcceleratorKind`].
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for kind in AcceleratorKind::ALL {
            registry.register(kind.name(), move || kind.create());
        }
        registry
    }

    /// Adds a factory, replacing any existing one of the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Accelerator> + Send + Sync + 'static,
    {
        let name = name.into();
        debug!(name = %name, "accelerator registered");
        self.factories.insert(name, Arc::new(factory));
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn Accelerator>, AcceleratorError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| {
                AcceleratorError::invalid(format!(
                    "unknown accelerator '{name}' (known: {})",
                    self.names().join(", ")
                ))
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}
