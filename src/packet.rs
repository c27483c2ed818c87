//! Packets and addressed messages.

use crate::node::Endpoint;

/// How the receiver of a buffer reference should interpret the samples.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum BufferType {
    /// Floating point audio samples.
    Audio,
    /// Opaque data that merely travels as a buffer.
    Bytes,
}

/// Codes carried by error packets.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ErrorCode {
    /// The packet had the wrong type for the port it arrived on.
    UnsupportedType,
    /// The packet had the right type but an unusable value.
    UnsupportedValue,
}

/// Non-owning reference to a buffer lent out by a [`BufferArena`](crate::buffer::BufferArena).
///
/// The reference carries the generation of the arena that lent it. Once that
/// arena is gone the reference resolves to nothing, so a packet can never be
/// used to reach a buffer after the call that produced it has returned.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BufferRef {
    pub(crate) slot: u16,
    pub(crate) generation: u32,
    /// Number of samples the receiver should process.
    pub samples: usize,
    /// Interpretation of the buffer.
    pub tag: BufferType,
}

impl BufferRef {
    pub(crate) const NULL_SLOT: u16 = u16::MAX;

    /// A reference to no buffer at all.
    pub const fn null(tag: BufferType, samples: usize) -> Self {
        Self {
            slot: Self::NULL_SLOT,
            generation: 0,
            samples,
            tag,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.slot == Self::NULL_SLOT
    }

    /// Arena generation that lent this buffer.
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Same buffer, different sample count.
    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }
}

/// A typed unit of data exchanged between components.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Packet {
    /// A bang: carries no value.
    Void,
    Bool(bool),
    Integer(i32),
    Float(f32),
    /// A borrowed buffer. Never implies ownership.
    Buffer(BufferRef),
    Error(ErrorCode),
}

impl Packet {
    /// Numeric value of the packet, if it has one.
    pub fn as_float(&self) -> Option<f32> {
        match *self {
            Packet::Float(v) => Some(v),
            Packet::Integer(v) => Some(v as f32),
            _ => None,
        }
    }

    /// The buffer reference, if this packet carries a buffer tagged `tag`.
    pub fn as_buffer(&self, tag: BufferType) -> Option<BufferRef> {
        match *self {
            Packet::Buffer(buffer) if buffer.tag == tag => Some(buffer),
            _ => None,
        }
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        match *self {
            Packet::Error(code) => Some(code),
            _ => None,
        }
    }

    /// Does this packet borrow a buffer lent by the arena of `generation`?
    pub fn borrows_from(&self, generation: u32) -> bool {
        matches!(self, Packet::Buffer(b) if !b.is_null() && b.generation == generation)
    }
}

/// A packet addressed to an input port.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Message {
    pub target: Endpoint,
    pub packet: Packet,
}

impl Message {
    pub fn new(target: Endpoint, packet: Packet) -> Self {
        Self { target, packet }
    }
}
