//! Controller: ticks the network and the transport, and observes emissions

use hashbrown::HashSet;
use tracing::{debug, trace};

use crate::buffer::BufferArena;
use crate::error::NetworkResult;
use crate::network::{Emission, EmissionObserver, Network};
use crate::node::{Endpoint, PortDirection};
use crate::packet::Packet;
use crate::transport::Transport;

/// How a correlation token settled.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Settlement {
    /// The completion endpoint emitted this packet
    Completed(Packet),
    /// The failure endpoint fired first
    Failed(Emission),
}

/// Call-local state matching emissions against the endpoints one run waits for.
///
/// Passed by reference into every [`Controller::tick`] of a run and dropped
/// afterwards, so nothing from one call can leak into the next. The first
/// matching emission settles the token; later ones are ignored.
#[derive(Debug)]
pub struct Correlation {
    expected: Endpoint,
    failure: Option<Endpoint>,
    settled: Option<Settlement>,
    observations: Vec<Emission>,
}

impl Correlation {
    /// Wait for `expected`, recording observations into `observations`
    ///
    /// `observations` is cleared but keeps its capacity; once it is full
    /// further observations are not recorded, so observing never allocates.
    pub fn new(expected: Endpoint, failure: Option<Endpoint>, mut observations: Vec<Emission>) -> Self {
        observations.clear();
        Self {
            expected,
            failure,
            settled: None,
            observations,
        }
    }

    #[inline]
    pub fn expected(&self) -> Endpoint {
        self.expected
    }

    #[inline]
    pub fn is_settled(&self) -> bool {
        self.settled.is_some()
    }

    #[inline]
    pub fn settlement(&self) -> Option<Settlement> {
        self.settled
    }

    /// Exported emissions seen so far, in emission order
    pub fn observations(&self) -> &[Emission] {
        &self.observations
    }

    /// Give the observation log back, e.g. to reuse its allocation
    pub fn into_observations(self) -> Vec<Emission> {
        self.observations
    }

    /// Feed one exported emission to the token
    pub fn observe(&mut self, emission: &Emission) {
        if self.observations.len() < self.observations.capacity() {
            self.observations.push(*emission);
        }

        if self.settled.is_some() {
            return;
        }

        if emission.source == self.expected {
            self.settled = Some(Settlement::Completed(emission.packet));
        } else if Some(emission.source) == self.failure {
            self.settled = Some(Settlement::Failed(*emission));
        }
    }
}

/// Drives a [`Network`] and a [`Transport`] in lock step.
///
/// Every tick delivers at most one network message and then ticks the
/// transport once. Emissions on subscribed ports are handed to the
/// transport and to the caller's [`Correlation`].
pub struct Controller {
    network: Network,
    transport: Box<dyn Transport>,
    subscriptions: HashSet<Endpoint>,
}

struct Hook<'a> {
    subscriptions: &'a HashSet<Endpoint>,
    transport: &'a mut dyn Transport,
    correlation: &'a mut Correlation,
}

impl EmissionObserver for Hook<'_> {
    fn packet_sent(&mut self, emission: &Emission) {
        trace!(source = %emission.source, packet = ?emission.packet, "packet sent");

        if self.subscriptions.contains(&emission.source) {
            self.transport.notify(emission);
            self.correlation.observe(emission);
        }
    }
}

impl Controller {
    pub fn new(network: Network, transport: Box<dyn Transport>) -> Self {
        Self {
            network,
            transport,
            subscriptions: HashSet::new(),
        }
    }

    /// Mark the output `endpoint` as externally observable, or stop observing it
    pub fn subscribe_to_port(&mut self, endpoint: Endpoint, export: bool) -> NetworkResult<()> {
        self.network.check_port(endpoint, PortDirection::Output)?;

        if export {
            debug!(endpoint = %endpoint, "port exported");
            self.subscriptions.insert(endpoint);
        } else {
            self.subscriptions.remove(&endpoint);
        }
        Ok(())
    }

    pub fn is_subscribed(&self, endpoint: Endpoint) -> bool {
        self.subscriptions.contains(&endpoint)
    }

    #[inline]
    pub fn send_message_to(&mut self, target: Endpoint, packet: Packet) -> NetworkResult<()> {
        self.network.send_message_to(target, packet)
    }

    /// Tick the network once, then the transport once
    ///
    /// Returns whether the network delivered a message. The transport is
    /// ticked even when the network reports a capacity error.
    pub fn tick(
        &mut self,
        buffers: &mut BufferArena<'_>,
        correlation: &mut Correlation,
    ) -> NetworkResult<bool> {
        let mut hook = Hook {
            subscriptions: &self.subscriptions,
            transport: self.transport.as_mut(),
            correlation,
        };
        let delivered = self.network.tick(buffers, &mut hook);
        self.transport.tick();
        delivered
    }

    #[inline]
    pub fn network(&self) -> &Network {
        &self.network
    }

    #[inline]
    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{amplitude_ports, Amplitude, Forward};
    use crate::packet::ErrorCode;
    use crate::transport::NullTransport;

    fn amp_controller() -> Controller {
        let mut network = Network::new(8);
        network.add_node(Box::new(Amplitude::default()));
        Controller::new(network, Box::new(NullTransport::new()))
    }

    fn at(port: crate::node::PortId) -> Endpoint {
        Endpoint {
            node: crate::node::NodeId(0),
            port,
        }
    }

    #[test]
    fn subscribe_requires_an_output_port() {
        let mut controller = amp_controller();
        assert!(controller.subscribe_to_port(at(amplitude_ports::OUT), true).is_ok());
        assert!(controller.subscribe_to_port(Endpoint::new(0, 7), true).is_err());
        assert!(controller.subscribe_to_port(Endpoint::new(3, 0), true).is_err());

        controller.subscribe_to_port(at(amplitude_ports::OUT), false).unwrap();
        assert!(!controller.is_subscribed(at(amplitude_ports::OUT)));
    }

    #[test]
    fn only_exported_emissions_are_observed() {
        let mut controller = amp_controller();
        controller.subscribe_to_port(at(amplitude_ports::OUT), true).unwrap();

        let mut corr = Correlation::new(at(amplitude_ports::OUT), None, Vec::with_capacity(4));
        controller
            .send_message_to(at(amplitude_ports::AMPLITUDE), Packet::Float(0.5))
            .unwrap();
        assert_eq!(controller.tick(&mut BufferArena::new(1), &mut corr), Ok(true));

        assert!(corr.observations().is_empty());
        assert!(!corr.is_settled());
    }

    #[test]
    fn failure_endpoint_settles_first() {
        let mut controller = amp_controller();
        controller.subscribe_to_port(at(amplitude_ports::OUT), true).unwrap();
        controller.subscribe_to_port(at(amplitude_ports::ERROR), true).unwrap();

        let mut corr = Correlation::new(
            at(amplitude_ports::OUT),
            Some(at(amplitude_ports::ERROR)),
            Vec::with_capacity(4),
        );
        controller
            .send_message_to(at(amplitude_ports::IN), Packet::Integer(1))
            .unwrap();
        controller.tick(&mut BufferArena::new(1), &mut corr).unwrap();

        assert_eq!(
            corr.settlement(),
            Some(Settlement::Failed(Emission {
                source: at(amplitude_ports::ERROR),
                packet: Packet::Error(ErrorCode::UnsupportedType),
            }))
        );
    }

    #[test]
    fn completion_waits_for_the_designated_endpoint() {
        let mut network = Network::new(8);
        for _ in 0..3 {
            network.add_node(Box::new(Forward));
        }
        network.connect(Endpoint::new(0, 0), Endpoint::new(1, 0)).unwrap();
        network.connect(Endpoint::new(1, 0), Endpoint::new(2, 0)).unwrap();
        let mut controller = Controller::new(network, Box::new(NullTransport::new()));
        for n in 0..3 {
            controller.subscribe_to_port(Endpoint::new(n, 0), true).unwrap();
        }

        let mut corr = Correlation::new(Endpoint::new(2, 0), None, Vec::with_capacity(8));
        let mut arena = BufferArena::new(1);
        controller.send_message_to(Endpoint::new(0, 0), Packet::Integer(9)).unwrap();

        let mut ticks = 0;
        while !corr.is_settled() {
            assert!(controller.tick(&mut arena, &mut corr).unwrap());
            ticks += 1;
        }
        assert_eq!(ticks, 3);
        assert_eq!(corr.observations().len(), 3);
        assert_eq!(corr.settlement(), Some(Settlement::Completed(Packet::Integer(9))));
    }

    #[test]
    fn observation_log_never_grows() {
        let log = Vec::with_capacity(1);
        let mut corr = Correlation::new(Endpoint::new(0, 0), None, log);
        for v in 0..3 {
            corr.observe(&Emission {
                source: Endpoint::new(1, 0),
                packet: Packet::Integer(v),
            });
        }
        assert_eq!(corr.observations().len(), 1);
        assert_eq!(corr.into_observations().capacity(), 1);
    }
}
