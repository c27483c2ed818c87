//! Core component trait, identifiers, and port metadata.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::buffer::BufferArena;
use crate::packet::{BufferRef, Packet};

/// Index of a node within a network.
///
/// Ids are assigned once from the static graph and never reassigned.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u16);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index of a port on one node. Inputs and outputs are numbered separately.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortId(pub u8);

/// A (node, port) pair: the address of a message, or the source of an emission.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Endpoint {
    pub node: NodeId,
    pub port: PortId,
}

impl Endpoint {
    pub const fn new(node: u16, port: u8) -> Self {
        Self {
            node: NodeId(node),
            port: PortId(port),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.port.0)
    }
}

/// Whether a port receives or emits packets.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PortDirection {
    Input,
    Output,
}

/// What a port carries. Used to reject obviously wrong connections up front;
/// components still validate every packet they receive.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PortKind {
    /// Anything goes.
    Any,
    /// Numeric scalars.
    Number,
    /// Buffers tagged as audio.
    AudioBuffer,
    /// Error packets.
    Error,
}

impl PortKind {
    /// Can an output of kind `self` feed an input of kind `input`?
    pub fn feeds(self, input: PortKind) -> bool {
        self == PortKind::Any || input == PortKind::Any || self == input
    }
}

/// Static descriptor for one port of a component.
#[derive(Clone, Copy, Debug)]
pub struct PortDescriptor {
    pub id: PortId,
    pub name: &'static str,
    pub direction: PortDirection,
    pub kind: PortKind,
}

impl PortDescriptor {
    pub const fn input(id: u8, name: &'static str, kind: PortKind) -> Self {
        Self {
            id: PortId(id),
            name,
            direction: PortDirection::Input,
            kind,
        }
    }

    pub const fn output(id: u8, name: &'static str, kind: PortKind) -> Self {
        Self {
            id: PortId(id),
            name,
            direction: PortDirection::Output,
            kind,
        }
    }
}

/// Looks up a port by id and direction in a descriptor table.
pub fn find_port(
    ports: &[PortDescriptor],
    id: PortId,
    direction: PortDirection,
) -> Option<&PortDescriptor> {
    ports.iter().find(|p| p.id == id && p.direction == direction)
}

/// Packets a component emitted during one `process` call, in emission order.
pub type Outbox = Vec<(PortId, Packet)>;

/// Everything a component may touch while handling one packet.
///
/// The context only lives for a single [`Component::process`] call, so any
/// buffer obtained through it cannot be retained by the component.
pub struct ProcessContext<'a, 'buf> {
    node: NodeId,
    buffers: &'a mut BufferArena<'buf>,
    outbox: &'a mut Outbox,
}

impl<'a, 'buf> ProcessContext<'a, 'buf> {
    pub fn new(node: NodeId, buffers: &'a mut BufferArena<'buf>, outbox: &'a mut Outbox) -> Self {
        Self {
            node,
            buffers,
            outbox,
        }
    }

    /// The node currently being processed.
    #[inline]
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Emit `packet` on one of this node's output ports.
    #[inline]
    pub fn send(&mut self, port: PortId, packet: Packet) {
        self.outbox.push((port, packet));
    }

    /// Resolve a buffer reference to the lent samples.
    ///
    /// Returns `None` for null references and for references lent by another
    /// call, which components treat the same as a null buffer.
    #[inline]
    pub fn buffer_mut(&mut self, buffer: &BufferRef) -> Option<&mut [f32]> {
        self.buffers.resolve(buffer)
    }
}

/// The core trait for processing nodes in the embedded network.
///
/// A component consumes one packet per call on one of its input ports and may
/// emit any number of packets on its output ports through the context.
///
/// ```
/// use blockflow::node::{Component, PortDescriptor, PortId, PortKind, ProcessContext};
/// use blockflow::packet::Packet;
///
/// static PORTS: &[PortDescriptor] = &[
///     PortDescriptor::input(0, "in", PortKind::Number),
///     PortDescriptor::output(0, "out", PortKind::Number),
/// ];
///
/// struct Doubler;
///
/// impl Component for Doubler {
///     fn name(&self) -> &str { "Doubler" }
///
///     fn ports(&self) -> &'static [PortDescriptor] { PORTS }
///
///     fn process(&mut self, ctx: &mut ProcessContext<'_, '_>, packet: Packet, _port: PortId) {
///         if let Some(v) = packet.as_float() {
///             ctx.send(PortId(0), Packet::Float(v * 2.0));
///         }
///     }
/// }
/// ```
pub trait Component: Send + 'static {
    /// Human-readable component name, used in logs.
    fn name(&self) -> &str;

    /// Port table for this component.
    fn ports(&self) -> &'static [PortDescriptor];

    /// Handle one packet delivered on `port`.
    ///
    /// Must not block, sleep, or perform I/O.
    fn process(&mut self, ctx: &mut ProcessContext<'_, '_>, packet: Packet, port: PortId);
}
