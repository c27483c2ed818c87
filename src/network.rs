//! Message-passing network - owns components, routes and the message queue

use hashbrown::HashMap;
use tracing::trace;

use crate::buffer::BufferArena;
use crate::error::{NetworkError, NetworkResult};
use crate::node::{find_port, Component, Endpoint, NodeId, Outbox, PortDirection, ProcessContext};
use crate::packet::{Message, Packet};
use crate::queue::MessageQueue;

/// A packet a component emitted, and where it came from.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Emission {
    pub source: Endpoint,
    pub packet: Packet,
}

/// Receives every emission the network routes during a tick.
pub trait EmissionObserver {
    fn packet_sent(&mut self, emission: &Emission);
}

/// Running totals for a network.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NetworkStats {
    /// Messages handed to a component
    pub delivered: u64,
    /// Packets emitted by components
    pub emitted: u64,
    /// Messages refused because the queue was full
    pub rejected: u64,
    /// Messages dropped by [`Network::purge`]
    pub purged: u64,
}

struct NodeSlot {
    component: Box<dyn Component>,
}

/// A network of components connected output-to-input.
///
/// Each tick delivers at most one message; whatever the receiving component
/// emits is routed along its connections into the back of the queue, so
/// processing order is queue-arrival order, not topological order.
pub struct Network {
    nodes: Vec<NodeSlot>,
    routes: HashMap<Endpoint, Endpoint>,
    queue: MessageQueue,
    outbox: Outbox,
    stats: NetworkStats,
}

impl Network {
    /// Create an empty network whose queue holds at most `queue_capacity` messages
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(16),
            routes: HashMap::new(),
            queue: MessageQueue::new(queue_capacity),
            outbox: Outbox::with_capacity(16),
            stats: NetworkStats::default(),
        }
    }

    /// Add a component, returns its id
    pub fn add_node(&mut self, component: Box<dyn Component>) -> NodeId {
        let id = NodeId(self.nodes.len() as u16);
        self.nodes.push(NodeSlot { component });
        id
    }

    /// Connect output `from` to input `to`
    ///
    /// An output feeds at most one input; connecting it again replaces the route.
    pub fn connect(&mut self, from: Endpoint, to: Endpoint) -> NetworkResult<()> {
        self.check_port(from, PortDirection::Output)?;
        self.check_port(to, PortDirection::Input)?;
        self.routes.insert(from, to);
        Ok(())
    }

    /// Check that `endpoint` names an existing port with the given direction
    pub fn check_port(&self, endpoint: Endpoint, direction: PortDirection) -> NetworkResult<()> {
        let slot = self
            .nodes
            .get(endpoint.node.index())
            .ok_or(NetworkError::UnknownNode(endpoint.node))?;

        match find_port(slot.component.ports(), endpoint.port, direction) {
            Some(_) => Ok(()),
            None if direction == PortDirection::Input => Err(NetworkError::UnknownInput(endpoint)),
            None => Err(NetworkError::UnknownOutput(endpoint)),
        }
    }

    /// Enqueue `packet` for the input port `target`
    ///
    /// Fails with [`NetworkError::QueueFull`] when the queue is at capacity;
    /// the message is not enqueued and is counted as rejected.
    pub fn send_message_to(&mut self, target: Endpoint, packet: Packet) -> NetworkResult<()> {
        self.check_port(target, PortDirection::Input)?;

        self.queue.push(Message::new(target, packet)).map_err(|_| {
            self.stats.rejected += 1;
            NetworkError::QueueFull {
                target,
                capacity: self.queue.capacity(),
            }
        })
    }

    /// Deliver the oldest pending message, if any
    ///
    /// Every packet the receiving component emits is reported to `observer`
    /// and then routed. Returns whether a message was delivered. A routing
    /// enqueue that finds the queue full is reported as an error after all
    /// emissions of this tick have been observed.
    pub fn tick(
        &mut self,
        buffers: &mut BufferArena<'_>,
        observer: &mut dyn EmissionObserver,
    ) -> NetworkResult<bool> {
        let Some(message) = self.queue.pop() else {
            return Ok(false);
        };

        let node = message.target.node;
        let slot = self
            .nodes
            .get_mut(node.index())
            .ok_or(NetworkError::UnknownNode(node))?;

        self.outbox.clear();
        {
            let mut ctx = ProcessContext::new(node, buffers, &mut self.outbox);
            slot.component.process(&mut ctx, message.packet, message.target.port);
        }
        self.stats.delivered += 1;

        trace!(
            node = %node,
            component = slot.component.name(),
            emitted = self.outbox.len(),
            "delivered"
        );

        let mut overflow = None;
        for (port, packet) in self.outbox.drain(..) {
            let emission = Emission {
                source: Endpoint { node, port },
                packet,
            };
            self.stats.emitted += 1;
            observer.packet_sent(&emission);

            if let Some(&target) = self.routes.get(&emission.source) {
                if self.queue.push(Message::new(target, packet)).is_err() {
                    self.stats.rejected += 1;
                    if overflow.is_none() {
                        overflow = Some(NetworkError::QueueFull {
                            target,
                            capacity: self.queue.capacity(),
                        });
                    }
                }
            }
        }

        match overflow {
            Some(err) => Err(err),
            None => Ok(true),
        }
    }

    /// Drop pending messages matching `predicate`. Returns how many were dropped.
    pub fn purge(&mut self, mut predicate: impl FnMut(&Message) -> bool) -> usize {
        let purged = self.queue.retain(|m| !predicate(m));
        self.stats.purged += purged as u64;
        purged
    }

    /// Number of messages waiting to be delivered
    #[inline]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn queue_capacity(&self) -> usize {
        self.queue.capacity()
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&dyn Component> {
        self.nodes.get(id.index()).map(|slot| slot.component.as_ref())
    }

    /// Where output `from` is routed, if anywhere
    pub fn route(&self, from: Endpoint) -> Option<Endpoint> {
        self.routes.get(&from).copied()
    }

    #[inline]
    pub fn stats(&self) -> NetworkStats {
        self.stats
    }
}
