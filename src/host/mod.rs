//! Host adapter - descriptors, the plugin factory, and instance lifecycle
//!
//! A host discovers plugins through a [`PluginLibrary`], instantiates one at
//! a sample rate, connects every port to storage it owns, activates it and
//! then calls `run` once per block:
//!
//! ```
//! use std::cell::Cell;
//! use blockflow::host::PluginLibrary;
//!
//! let library = PluginLibrary::new();
//! let index = library.find("blockflow_amp").unwrap();
//!
//! let gain = [Cell::new(0.5)];
//! let input = [Cell::new(1.0), Cell::new(-2.0)];
//! let output = [Cell::new(0.0), Cell::new(0.0)];
//!
//! let mut plugin = library.instantiate(index, 48_000).unwrap();
//! plugin.connect_port(0, &gain).unwrap();
//! plugin.connect_port(1, &input).unwrap();
//! plugin.connect_port(2, &output).unwrap();
//! plugin.activate();
//! plugin.run(2);
//! plugin.cleanup();
//!
//! assert_eq!(output[0].get(), 0.5);
//! assert_eq!(output[1].get(), -1.0);
//! ```
//!
//! Ports are shared `Cell` slices, so input and output may be the same
//! storage.

mod amplifier;
mod delay_line;
mod descriptor;

use core::cell::Cell;

use tracing::debug;

pub use amplifier::AmplifierPlugin;
pub use delay_line::{DelayLinePlugin, MAX_DELAY_SECONDS};
pub use descriptor::{PluginDescriptor, PortClass, PortInfo, RangeHint};

use crate::config::PluginConfig;
use crate::error::HostError;

/// Every plugin in the library, by index.
static DESCRIPTORS: [&PluginDescriptor; 2] = [&amplifier::DESCRIPTOR, &delay_line::DESCRIPTOR];

/// The plugins this crate provides, and the configuration they are built with.
#[derive(Clone, Debug, Default)]
pub struct PluginLibrary {
    config: PluginConfig,
}

impl PluginLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PluginConfig) -> Result<Self, HostError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub fn descriptor(&self, index: usize) -> Option<&'static PluginDescriptor> {
        DESCRIPTORS.get(index).copied()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &'static PluginDescriptor> {
        DESCRIPTORS.iter().copied()
    }

    /// Index of the plugin labelled `label`
    pub fn find(&self, label: &str) -> Option<usize> {
        DESCRIPTORS.iter().position(|d| d.label == label)
    }

    pub fn instantiate<'h>(&self, index: usize, sample_rate: u32) -> Result<PluginInstance<'h>, HostError> {
        if sample_rate == 0 {
            return Err(HostError::InvalidSampleRate);
        }

        let instance = match index {
            0 => PluginInstance::Amplifier(AmplifierPlugin::new(sample_rate, &self.config)?),
            1 => PluginInstance::DelayLine(DelayLinePlugin::new(sample_rate)),
            _ => return Err(HostError::UnknownPlugin(index)),
        };

        debug!(label = instance.descriptor().label, sample_rate, "instantiated");
        Ok(instance)
    }
}

/// A live plugin, borrowing its port storage for `'h`.
pub enum PluginInstance<'h> {
    Amplifier(AmplifierPlugin<'h>),
    DelayLine(DelayLinePlugin<'h>),
}

impl<'h> PluginInstance<'h> {
    pub fn descriptor(&self) -> &'static PluginDescriptor {
        match self {
            PluginInstance::Amplifier(_) => &amplifier::DESCRIPTOR,
            PluginInstance::DelayLine(_) => &delay_line::DESCRIPTOR,
        }
    }

    /// Connect port `port` to host storage. Control ports read the first cell.
    pub fn connect_port(&mut self, port: usize, data: &'h [Cell<f32>]) -> Result<(), HostError> {
        match self {
            PluginInstance::Amplifier(p) => p.connect_port(port, data),
            PluginInstance::DelayLine(p) => p.connect_port(port, data),
        }
    }

    pub fn activate(&mut self) {
        match self {
            PluginInstance::Amplifier(p) => p.activate(),
            PluginInstance::DelayLine(p) => p.activate(),
        }
    }

    pub fn run(&mut self, sample_count: usize) {
        match self {
            PluginInstance::Amplifier(p) => p.run(sample_count),
            PluginInstance::DelayLine(p) => p.run(sample_count),
        }
    }

    /// Release the instance and everything it allocated.
    pub fn cleanup(self) {
        debug!(label = self.descriptor().label, "cleanup");
    }
}
