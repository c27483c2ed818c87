//! Simple delay line plugin

use core::cell::Cell;

use tracing::{debug, warn};

use crate::error::HostError;
use crate::node::PortDirection;

use super::descriptor::{PluginDescriptor, PortInfo, RangeHint};

/// Longest delay the line can hold, in seconds
pub const MAX_DELAY_SECONDS: f32 = 5.0;

pub const PORT_DELAY: usize = 0;
pub const PORT_DRY_WET: usize = 1;
pub const PORT_INPUT: usize = 2;
pub const PORT_OUTPUT: usize = 3;

const DELAY_RANGE: RangeHint = RangeHint::bounded(0.0, MAX_DELAY_SECONDS);
const DRY_WET_RANGE: RangeHint = RangeHint::bounded(0.0, 1.0);

static PORTS: &[PortInfo] = &[
    PortInfo::control("Delay (Seconds)", DELAY_RANGE),
    PortInfo::control("Dry/Wet Balance", DRY_WET_RANGE),
    PortInfo::audio("Input", PortDirection::Input),
    PortInfo::audio("Output", PortDirection::Output),
];

pub static DESCRIPTOR: PluginDescriptor = PluginDescriptor {
    unique_id: 1043,
    label: "delay_5s",
    name: "Simple Delay Line",
    maker: "Richard Furse (LADSPA example plugins)",
    copyright: "None",
    hard_rt_capable: true,
    ports: PORTS,
};

/// Delay line over a power-of-two ring of past input.
///
/// Output is `dry * x + wet * x_delayed`, where `wet` is the dry/wet control
/// and `dry = 1 - wet`. Does not go through the network.
///
/// Each sample is written before the delayed one is read, so a delay of zero
/// passes the input straight through instead of replaying a full ring ago.
pub struct DelayLinePlugin<'h> {
    sample_rate: f32,
    history: Vec<f32>,
    write: usize,
    delay: Option<&'h Cell<f32>>,
    dry_wet: Option<&'h Cell<f32>>,
    input: Option<&'h [Cell<f32>]>,
    output: Option<&'h [Cell<f32>]>,
}

impl<'h> DelayLinePlugin<'h> {
    pub fn new(sample_rate: u32) -> Self {
        let min_len = (sample_rate as f32 * MAX_DELAY_SECONDS) as usize;
        Self {
            sample_rate: sample_rate as f32,
            history: vec![0.0; min_len.max(1).next_power_of_two()],
            write: 0,
            delay: None,
            dry_wet: None,
            input: None,
            output: None,
        }
    }

    /// Length of the history ring, always a power of two
    #[inline]
    pub fn capacity(&self) -> usize {
        self.history.len()
    }

    pub fn connect_port(&mut self, port: usize, data: &'h [Cell<f32>]) -> Result<(), HostError> {
        match port {
            PORT_DELAY => self.delay = data.first(),
            PORT_DRY_WET => self.dry_wet = data.first(),
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

    /// Clear the delay history.
    pub fn activate(&mut self) {
        self.history.fill(0.0);
        debug!(plugin = DESCRIPTOR.label, capacity = self.history.len(), "activated");
    }

    pub fn run(&mut self, sample_count: usize) {
        let (Some(delay), Some(dry_wet), Some(input), Some(output)) =
            (self.delay, self.dry_wet, self.input, self.output)
        else {
            warn!(plugin = DESCRIPTOR.label, "run with unconnected ports");
            return;
        };

        let mask = self.history.len() - 1;
        let delay = (DELAY_RANGE.constrain(delay.get()) * self.sample_rate) as usize;
        let delay = delay.min(mask);
        let wet = DRY_WET_RANGE.constrain(dry_wet.get());
        let dry = 1.0 - wet;

        let write = self.write;
        let read = write + self.history.len() - delay;
        let samples = sample_count.min(input.len()).min(output.len());

        for i in 0..samples {
            let x = input[i].get();
            self.history[(i + write) & mask] = x;
            let delayed = self.history[(i + read) & mask];
            output[i].set(dry * x + wet * delayed);
        }

        self.write = (write + samples) & mask;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_is_a_power_of_two_covering_max_delay() {
        let line = DelayLinePlugin::new(44_100);
        assert!(line.capacity().is_power_of_two());
        assert!(line.capacity() >= 220_500);
        assert!(line.capacity() < 2 * 220_500);
    }

    #[test]
    fn tiny_sample_rate_still_allocates() {
        assert_eq!(DelayLinePlugin::new(0).capacity(), 1);
    }
}
