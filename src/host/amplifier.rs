//! Networked amplifier plugin

use core::cell::Cell;

use tracing::{debug, warn};

use crate::bridge::Bridge;
use crate::config::PluginConfig;
use crate::error::HostError;
use crate::graph::GraphDefinition;
use crate::node::PortDirection;
use crate::nodes::DEFAULT_GAIN;
use crate::transport::NullTransport;

use super::descriptor::{PluginDescriptor, PortInfo, RangeHint};

pub const PORT_AMPLITUDE: usize = 0;
pub const PORT_INPUT: usize = 1;
pub const PORT_OUTPUT: usize = 2;

const AMPLITUDE_RANGE: RangeHint = RangeHint::bounded(0.0, 4.0).with_default(DEFAULT_GAIN);

static PORTS: &[PortInfo] = &[
    PortInfo::control("Amplitude", AMPLITUDE_RANGE),
    PortInfo::audio("Input", PortDirection::Input),
    PortInfo::audio("Output", PortDirection::Output),
];

pub static DESCRIPTOR: PluginDescriptor = PluginDescriptor {
    unique_id: 4310,
    label: "blockflow_amp",
    name: "Blockflow Amplifier",
    maker: "blockflow",
    copyright: "MIT",
    hard_rt_capable: true,
    ports: PORTS,
};

/// Amplifier whose gain stage is an amplitude node inside a [`Bridge`].
///
/// The `Amplitude` control is read at the start of every block, held to its
/// advertised range, and handed to the network only when it changes.
pub struct AmplifierPlugin<'h> {
    bridge: Bridge,
    gain_parameter: usize,
    sample_rate: u32,
    amplitude: Option<&'h Cell<f32>>,
    input: Option<&'h [Cell<f32>]>,
    output: Option<&'h [Cell<f32>]>,
    last_gain: Option<f32>,
}

impl<'h> AmplifierPlugin<'h> {
    pub fn new(sample_rate: u32, config: &PluginConfig) -> Result<Self, HostError> {
        let graph = GraphDefinition::amplifier(&config.amplifier);
        let bridge = Bridge::new(&graph, config.bridge.clone(), Box::new(NullTransport::new()))?;
        let gain_parameter = bridge
            .parameter_index("amplitude")
            .ok_or(HostError::MissingParameter("amplitude"))?;

        Ok(Self {
            bridge,
            gain_parameter,
            sample_rate,
            amplitude: None,
            input: None,
            output: None,
            last_gain: None,
        })
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn connect_port(&mut self, port: usize, data: &'h [Cell<f32>]) -> Result<(), HostError> {
        match port {
            PORT_AMPLITUDE => self.amplitude = data.first(),
            PORT_INPUT => self.input = Some(data),
            PORT_OUTPUT => self.output = Some(data),
            _ => {
                return Err(HostError::UnknownPort {
                    plugin: DESCRIPTOR.label,
                    port,
                })
            }
        }
        Ok(())
    }

    pub fn activate(&mut self) {
        self.last_gain = None;
        debug!(plugin = DESCRIPTOR.label, "activated");
    }

    /// Process `sample_count` samples from the input port into the output port.
    ///
    /// Never panics. Failures are logged and leave the output untouched.
    pub fn run(&mut self, sample_count: usize) {
        let (Some(input), Some(output)) = (self.input, self.output) else {
            warn!(plugin = DESCRIPTOR.label, "run with unconnected audio ports");
            return;
        };

        if let Some(gain) = self.amplitude.map(|c| AMPLITUDE_RANGE.constrain(c.get())) {
            if self.last_gain != Some(gain) {
                match self.bridge.set_parameter(self.gain_parameter, gain) {
                    Ok(()) => self.last_gain = Some(gain),
                    Err(e) => warn!(plugin = DESCRIPTOR.label, error = %e, "gain change not delivered"),
                }
            }
        }

        let samples = sample_count.min(input.len()).min(output.len());
        let result = self.bridge.run_with(
            samples,
            |block| {
                for (dst, src) in block.iter_mut().zip(input) {
                    *dst = src.get();
                }
            },
            |block| {
                for (dst, &src) in output.iter().zip(block) {
                    dst.set(src);
                }
            },
        );

        if let Err(e) = result {
            warn!(plugin = DESCRIPTOR.label, error = %e, "block failed, output left untouched");
        }
    }
}
