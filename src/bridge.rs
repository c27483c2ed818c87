//! Real-time bridge - one audio block in, one audio block out

use core::mem;

use tracing::{debug, trace, warn};

use crate::buffer::{AudioBlock, BufferArena};
use crate::config::{BridgeConfig, Limit, OversizePolicy};
use crate::controller::{Controller, Correlation, Settlement};
use crate::error::{BridgeError, BridgeResult, ConfigError, GraphError, NetworkError};
use crate::graph::GraphDefinition;
use crate::network::Emission;
use crate::node::Endpoint;
use crate::packet::{BufferType, Packet};
use crate::transport::Transport;

/// Summary of one successful [`Bridge::run`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunReport {
    /// Samples actually processed
    pub samples: usize,
    /// Controller ticks spent draining the network
    pub ticks: usize,
    /// Whether the block was cut down to the bridge's capacity
    pub truncated: bool,
}

/// Drives an embedded network to completion once per audio block.
///
/// Each call copies the host's input into a block the bridge owns, lends that
/// block to the network as an audio buffer, and ticks the controller until
/// the completion endpoint emits. A run fails instead when the failure
/// endpoint fires first, when the network goes idle, or when the tick budget
/// runs out. Only a completed run writes the output.
///
/// Everything is allocated in [`Bridge::new`]; running a block does not
/// allocate.
///
/// # Example
///
/// ```
/// use blockflow::bridge::Bridge;
/// use blockflow::config::{AmplifierConfig, BridgeConfig};
/// use blockflow::graph::GraphDefinition;
/// use blockflow::transport::NullTransport;
///
/// let graph = GraphDefinition::amplifier(&AmplifierConfig::default());
/// let mut bridge = Bridge::new(&graph, BridgeConfig::default(), Box::new(NullTransport::new())).unwrap();
///
/// let mut output = [0.0; 3];
/// bridge.run(&[1.0, 2.0, -1.0], &mut output).unwrap();
/// assert_eq!(output, [0.3, 0.6, -0.3]);
/// ```
pub struct Bridge {
    controller: Controller,
    block: AudioBlock,
    inport: Endpoint,
    completion: Endpoint,
    failure: Option<Endpoint>,
    parameters: Vec<(String, Endpoint)>,
    generation: u32,
    config: BridgeConfig,
    observations: Vec<Emission>,
}

impl Bridge {
    /// Build the network described by `graph` and wire it to `transport`.
    pub fn new(
        graph: &GraphDefinition,
        config: BridgeConfig,
        transport: Box<dyn Transport>,
    ) -> BridgeResult<Self> {
        config.validate()?;

        let required = graph.parameters.len() + graph.initial.len() + 1;
        if config.queue_capacity < required {
            return Err(ConfigError::invalid(
                "queue_capacity",
                format!("graph needs room for at least {required} messages"),
            )
            .into());
        }

        let network = graph.build(config.queue_capacity)?;
        let inport = graph.inport.ok_or(GraphError::NoInport)?;
        let completion = graph.completion().ok_or(GraphError::Completion(0))?;
        let failure = graph.failure();

        let mut controller = Controller::new(network, transport);
        for endpoint in graph.exports() {
            controller.subscribe_to_port(endpoint, true)?;
        }

        let parameters = graph
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.target))
            .collect();

        debug!(
            inport = %inport,
            completion = %completion,
            max_block_size = config.max_block_size,
            queue_capacity = config.queue_capacity,
            "bridge ready"
        );

        Ok(Self {
            controller,
            block: AudioBlock::with_capacity(config.max_block_size),
            inport,
            completion,
            failure,
            parameters,
            generation: 0,
            observations: Vec::with_capacity(config.observation_capacity),
            config,
        })
    }

    /// Index of the parameter called `name`
    pub fn parameter_index(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|(n, _)| n == name)
    }

    /// Enqueue a new value for a parameter; it takes effect in the next run.
    pub fn set_parameter(&mut self, index: usize, value: f32) -> BridgeResult<()> {
        let &(_, target) = self
            .parameters
            .get(index)
            .ok_or(BridgeError::UnknownParameter(index))?;

        self.controller.send_message_to(target, Packet::Float(value))?;
        Ok(())
    }

    /// Process one block: `output` receives `input` run through the network.
    ///
    /// Only `min(input.len(), output.len())` samples take part. On error the
    /// output is left untouched.
    pub fn run(&mut self, input: &[f32], output: &mut [f32]) -> BridgeResult<RunReport> {
        let requested = input.len().min(output.len());
        self.run_with(
            requested,
            |block| block.copy_from_slice(&input[..block.len()]),
            |block| output[..block.len()].copy_from_slice(block),
        )
    }

    /// Process one block of `requested` samples with caller-provided IO.
    ///
    /// `load` fills the block before it is injected; `store` receives the
    /// processed block, and is only called when the run completes. Both see
    /// exactly the number of samples being processed.
    pub fn run_with(
        &mut self,
        requested: usize,
        load: impl FnOnce(&mut [f32]),
        store: impl FnOnce(&[f32]),
    ) -> BridgeResult<RunReport> {
        let samples = self.admit(requested)?;
        load(self.block.as_mut_slice(samples));

        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;

        let mut correlation = Correlation::new(
            self.completion,
            self.failure,
            mem::take(&mut self.observations),
        );
        let drained = drive(
            &mut self.controller,
            self.block.as_mut_slice(samples),
            generation,
            self.inport,
            &mut correlation,
            self.config.tick_budget,
        );

        let purged = self
            .controller
            .network_mut()
            .purge(|m| m.packet.borrows_from(generation));
        if purged > 0 {
            warn!(purged, generation, "dropped messages still borrowing the block");
        }

        let settlement = correlation.settlement();
        self.observations = correlation.into_observations();
        let ticks = drained?;

        match settlement {
            Some(Settlement::Completed(packet)) => {
                let valid = packet
                    .as_buffer(BufferType::Audio)
                    .map_or(false, |b| !b.is_null() && b.generation() == generation);
                if !valid {
                    return Err(BridgeError::UnexpectedPacket(packet));
                }

                store(self.block.as_slice(samples));
                trace!(samples, ticks, "block complete");
                Ok(RunReport {
                    samples,
                    ticks,
                    truncated: samples < requested,
                })
            }
            Some(Settlement::Failed(emission)) => Err(BridgeError::NodeFailure {
                origin: emission.source,
                packet: emission.packet,
            }),
            None => Err(BridgeError::Stalled { ticks }),
        }
    }

    fn admit(&self, requested: usize) -> BridgeResult<usize> {
        let capacity = self.block.capacity();
        if requested <= capacity {
            return Ok(requested);
        }

        match self.config.oversize {
            OversizePolicy::Reject => Err(BridgeError::BlockTooLarge {
                requested,
                capacity,
            }),
            OversizePolicy::Truncate => {
                warn!(requested, capacity, "block truncated");
                Ok(capacity)
            }
        }
    }

    /// Exported emissions recorded during the last run, in emission order
    pub fn observations(&self) -> &[Emission] {
        &self.observations
    }

    #[inline]
    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    #[inline]
    pub fn max_block_size(&self) -> usize {
        self.block.capacity()
    }

    #[inline]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }
}

/// Inject `samples` and tick until `correlation` settles.
///
/// A full queue at injection is drained first, within `budget`, and the block
/// is injected again. Returns the number of ticks spent. The arena, and with it the borrow of
/// `samples`, ends when this returns.
fn drive(
    controller: &mut Controller,
    samples: &mut [f32],
    generation: u32,
    inport: Endpoint,
    correlation: &mut Correlation,
    budget: Limit,
) -> BridgeResult<usize> {
    let mut arena = BufferArena::new(generation);
    let buffer = arena
        .lend(samples, BufferType::Audio)
        .ok_or(BridgeError::ArenaExhausted)?;
    let block = Packet::Buffer(buffer);

    let mut ticks = 0;
    if let Err(err) = controller.send_message_to(inport, block) {
        if !matches!(err, NetworkError::QueueFull { .. }) {
            return Err(err.into());
        }

        // Deliver the backlog ahead of the block, then inject once more.
        let backlog = controller.network().pending();
        debug!(backlog, "queue full at injection, draining backlog");
        while controller.network().pending() > 0 {
            if !budget.allows(ticks + 1) {
                return Err(BridgeError::TickBudgetExhausted {
                    ticks,
                    pending: controller.network().pending(),
                });
            }
            controller.tick(&mut arena, correlation)?;
            ticks += 1;
        }
        controller.send_message_to(inport, block)?;
    }

    while !correlation.is_settled() {
        let pending = controller.network().pending();
        if pending == 0 {
            return Err(BridgeError::Stalled { ticks });
        }
        if !budget.allows(ticks + 1) {
            return Err(BridgeError::TickBudgetExhausted { ticks, pending });
        }

        controller.tick(&mut arena, correlation)?;
        ticks += 1;
    }
    Ok(ticks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AmplifierConfig;
    use crate::transport::NullTransport;

    fn amplifier(config: BridgeConfig) -> Bridge {
        let graph = GraphDefinition::amplifier(&AmplifierConfig::default());
        Bridge::new(&graph, config, Box::new(NullTransport::new())).unwrap()
    }

    #[test]
    fn scales_by_default_gain() {
        let mut bridge = amplifier(BridgeConfig::default());
        let mut out = [0.0; 3];
        let report = bridge.run(&[1.0, 2.0, -1.0], &mut out).unwrap();

        assert_eq!(out, [0.3, 0.6, -0.3]);
        assert_eq!(report.samples, 3);
        assert_eq!(report.ticks, 1);
        assert!(!report.truncated);
    }

    #[test]
    fn oversized_block_is_rejected() {
        let mut bridge = amplifier(BridgeConfig::default().with_max_block_size(4));
        let mut out = [9.0; 5];

        let err = bridge.run(&[1.0; 5], &mut out).unwrap_err();
        assert!(matches!(err, BridgeError::BlockTooLarge { requested: 5, capacity: 4 }));
        assert_eq!(out, [9.0; 5]);
    }

    #[test]
    fn oversized_block_can_be_truncated() {
        let mut bridge = amplifier(
            BridgeConfig::default()
                .with_max_block_size(2)
                .with_oversize(OversizePolicy::Truncate),
        );
        let mut out = [9.0; 3];

        let report = bridge.run(&[1.0, 1.0, 1.0], &mut out).unwrap();
        assert!(report.truncated);
        assert_eq!(report.samples, 2);
        assert_eq!(out, [0.3, 0.3, 9.0]);
    }

    #[test]
    fn unknown_parameter_index() {
        let mut bridge = amplifier(BridgeConfig::default());
        assert_eq!(bridge.parameter_index("amplitude"), Some(0));
        assert_eq!(bridge.parameter_index("volume"), None);
        assert!(matches!(
            bridge.set_parameter(3, 1.0),
            Err(BridgeError::UnknownParameter(3))
        ));
    }

    #[test]
    fn empty_block_completes() {
        let mut bridge = amplifier(BridgeConfig::default());
        let report = bridge.run(&[], &mut []).unwrap();
        assert_eq!(report.samples, 0);
    }

    #[test]
    fn queue_smaller_than_graph_needs_is_refused() {
        let graph = GraphDefinition::amplifier(&AmplifierConfig::default());
        let config = BridgeConfig::default().with_queue_capacity(1);
        assert!(matches!(
            Bridge::new(&graph, config, Box::new(NullTransport::new())),
            Err(BridgeError::Config(ConfigError::Invalid { field: "queue_capacity", .. }))
        ));
        assert!(Bridge::new(
            &graph,
            BridgeConfig::default().with_queue_capacity(2),
            Box::new(NullTransport::new())
        )
        .is_ok());
    }

    #[test]
    fn invalid_config_is_refused() {
        let graph = GraphDefinition::amplifier(&AmplifierConfig::default());
        let config = BridgeConfig::default().with_queue_capacity(0);
        assert!(matches!(
            Bridge::new(&graph, config, Box::new(NullTransport::new())),
            Err(BridgeError::Config(_))
        ));
    }
}
