//! Amplitude scaling of audio buffers

use tracing::trace;

use crate::node::{Component, PortDescriptor, PortId, PortKind, ProcessContext};
use crate::packet::{BufferType, ErrorCode, Packet};

/// Port numbers for [`Amplitude`]
pub mod ports {
    use crate::node::PortId;

    /// Audio buffer to scale (input)
    pub const IN: PortId = PortId(0);
    /// New gain value (input)
    pub const AMPLITUDE: PortId = PortId(1);

    /// The scaled buffer (output)
    pub const OUT: PortId = PortId(0);
    /// Echo of every accepted gain value (output)
    pub const AMPLITUDE_CHANGED: PortId = PortId(1);
    /// Error packets (output)
    pub const ERROR: PortId = PortId(2);
}

static PORTS: &[PortDescriptor] = &[
    PortDescriptor::input(0, "in", PortKind::AudioBuffer),
    PortDescriptor::input(1, "amplitude", PortKind::Number),
    PortDescriptor::output(0, "out", PortKind::Any),
    PortDescriptor::output(1, "amplitudechanged", PortKind::Number),
    PortDescriptor::output(2, "error", PortKind::Error),
];

/// Gain applied before any amplitude packet arrives
pub const DEFAULT_GAIN: f32 = 0.3;

/// Default safety bound on the number of samples in one buffer
pub const DEFAULT_MAX_SAMPLES: usize = 10_000;

/// Scales audio buffers in place by the current gain.
///
/// The buffer is never copied: the packet that arrives on `in` is forwarded
/// unchanged on `out` once its samples have been multiplied, so whoever lent
/// the buffer sees the result.
///
/// Invalid input never mutates anything. A packet that is not an audio
/// buffer yields an [`ErrorCode::UnsupportedType`] packet on `error`; a null
/// buffer, or one longer than the sample bound, yields
/// [`ErrorCode::UnsupportedValue`].
#[derive(Clone, Debug)]
pub struct Amplitude {
    gain: f32,
    /// `None` disables the bound entirely
    max_samples: Option<usize>,
}

impl Amplitude {
    /// Create an amplitude node with the given initial gain and the default bound
    pub fn new(gain: f32) -> Self {
        Self {
            gain,
            max_samples: Some(DEFAULT_MAX_SAMPLES),
        }
    }

    /// Set the sample bound, or disable it with `None`
    pub fn with_max_samples(mut self, max_samples: Option<usize>) -> Self {
        self.max_samples = max_samples;
        self
    }

    #[inline]
    pub fn gain(&self) -> f32 {
        self.gain
    }

    #[inline]
    pub fn max_samples(&self) -> Option<usize> {
        self.max_samples
    }

    fn set_gain(&mut self, ctx: &mut ProcessContext<'_, '_>, packet: Packet) {
        match packet.as_float() {
            Some(gain) => {
                self.gain = gain;
                ctx.send(ports::AMPLITUDE_CHANGED, packet);
            }
            None => ctx.send(ports::ERROR, Packet::Error(ErrorCode::UnsupportedType)),
        }
    }

    fn scale(&mut self, ctx: &mut ProcessContext<'_, '_>, packet: Packet) {
        let Some(buffer) = packet.as_buffer(BufferType::Audio) else {
            ctx.send(ports::ERROR, Packet::Error(ErrorCode::UnsupportedType));
            return;
        };

        if self.max_samples.map_or(false, |max| buffer.samples > max) {
            ctx.send(ports::ERROR, Packet::Error(ErrorCode::UnsupportedValue));
            return;
        }

        let gain = self.gain;
        let scaled = match ctx
            .buffer_mut(&buffer)
            .and_then(|data| data.get_mut(..buffer.samples))
        {
            Some(samples) => {
                samples.iter_mut().for_each(|s| *s *= gain);
                true
            }
            None => false,
        };

        if scaled {
            ctx.send(ports::OUT, packet);
        } else {
            ctx.send(ports::ERROR, Packet::Error(ErrorCode::UnsupportedValue));
        }
    }
}

impl Default for Amplitude {
    fn default() -> Self {
        Self::new(DEFAULT_GAIN)
    }
}

impl Component for Amplitude {
    fn name(&self) -> &str {
        "AudioAmplitude"
    }

    fn ports(&self) -> &'static [PortDescriptor] {
        PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_, '_>, packet: Packet, port: PortId) {
        match port {
            ports::AMPLITUDE => self.set_gain(ctx, packet),
            ports::IN => self.scale(ctx, packet),
            other => trace!(node = %ctx.node(), port = other.0, "packet on unknown port ignored"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferArena;
    use crate::node::{NodeId, Outbox};
    use crate::packet::BufferRef;

    fn process(node: &mut Amplitude, arena: &mut BufferArena<'_>, packet: Packet, port: PortId) -> Outbox {
        let mut outbox = Outbox::new();
        let mut ctx = ProcessContext::new(NodeId(0), arena, &mut outbox);
        node.process(&mut ctx, packet, port);
        outbox
    }

    #[test]
    fn scales_in_place_and_forwards_same_buffer() {
        let mut node = Amplitude::default();
        let mut data = [1.0, 2.0, -1.0];
        let mut arena = BufferArena::new(1);
        let buffer = arena.lend(&mut data, BufferType::Audio).unwrap();

        let sent = process(&mut node, &mut arena, Packet::Buffer(buffer), ports::IN);
        assert_eq!(sent, vec![(ports::OUT, Packet::Buffer(buffer))]);

        drop(arena);
        assert_eq!(data, [0.3, 0.6, -0.3]);
    }

    #[test]
    fn only_the_declared_count_is_scaled() {
        let mut node = Amplitude::new(2.0);
        let mut data = [1.0, 1.0, 1.0, 1.0];
        let mut arena = BufferArena::new(1);
        let buffer = arena.lend(&mut data, BufferType::Audio).unwrap().with_samples(2);

        process(&mut node, &mut arena, Packet::Buffer(buffer), ports::IN);
        drop(arena);
        assert_eq!(data, [2.0, 2.0, 1.0, 1.0]);
    }

    #[test]
    fn amplitude_port_updates_gain_and_echoes() {
        let mut node = Amplitude::default();
        let mut arena = BufferArena::new(1);

        let sent = process(&mut node, &mut arena, Packet::Float(0.5), ports::AMPLITUDE);
        assert_eq!(sent, vec![(ports::AMPLITUDE_CHANGED, Packet::Float(0.5))]);
        assert_eq!(node.gain(), 0.5);
    }

    #[test]
    fn non_numeric_amplitude_is_a_type_error() {
        let mut node = Amplitude::default();
        let mut arena = BufferArena::new(1);

        let sent = process(&mut node, &mut arena, Packet::Bool(true), ports::AMPLITUDE);
        assert_eq!(sent, vec![(ports::ERROR, Packet::Error(ErrorCode::UnsupportedType))]);
        assert_eq!(node.gain(), DEFAULT_GAIN);
    }

    #[test]
    fn wrong_packet_type_is_a_type_error() {
        let mut node = Amplitude::default();
        let mut data = [1.0];
        let mut arena = BufferArena::new(1);
        let bytes = arena.lend(&mut data, BufferType::Bytes).unwrap();

        for packet in [Packet::Float(1.0), Packet::Void, Packet::Buffer(bytes)] {
            let sent = process(&mut node, &mut arena, packet, ports::IN);
            assert_eq!(sent, vec![(ports::ERROR, Packet::Error(ErrorCode::UnsupportedType))]);
        }

        drop(arena);
        assert_eq!(data, [1.0]);
    }

    #[test]
    fn null_buffer_is_a_value_error() {
        let mut node = Amplitude::default();
        let mut arena = BufferArena::new(1);

        let null = BufferRef::null(BufferType::Audio, 3);
        let sent = process(&mut node, &mut arena, Packet::Buffer(null), ports::IN);
        assert_eq!(sent, vec![(ports::ERROR, Packet::Error(ErrorCode::UnsupportedValue))]);
    }

    #[test]
    fn oversized_buffer_is_a_value_error() {
        let mut node = Amplitude::default();
        let mut data = vec![1.0; 20_000];
        let mut arena = BufferArena::new(1);
        let buffer = arena.lend(&mut data, BufferType::Audio).unwrap();

        let sent = process(&mut node, &mut arena, Packet::Buffer(buffer), ports::IN);
        assert_eq!(sent, vec![(ports::ERROR, Packet::Error(ErrorCode::UnsupportedValue))]);

        drop(arena);
        assert!(data.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn count_beyond_lent_slice_is_a_value_error() {
        let mut node = Amplitude::default();
        let mut data = [1.0; 2];
        let mut arena = BufferArena::new(1);
        let buffer = arena.lend(&mut data, BufferType::Audio).unwrap().with_samples(3);

        let sent = process(&mut node, &mut arena, Packet::Buffer(buffer), ports::IN);
        assert_eq!(sent, vec![(ports::ERROR, Packet::Error(ErrorCode::UnsupportedValue))]);
    }

    #[test]
    fn unbounded_lineage_accepts_large_buffers() {
        let mut node = Amplitude::new(0.5).with_max_samples(None);
        let mut data = vec![2.0; 20_000];
        let mut arena = BufferArena::new(1);
        let buffer = arena.lend(&mut data, BufferType::Audio).unwrap();

        let sent = process(&mut node, &mut arena, Packet::Buffer(buffer), ports::IN);
        assert_eq!(sent, vec![(ports::OUT, Packet::Buffer(buffer))]);

        drop(arena);
        assert!(data.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn unknown_port_emits_nothing() {
        let mut node = Amplitude::default();
        let mut arena = BufferArena::new(1);
        assert!(process(&mut node, &mut arena, Packet::Float(1.0), PortId(9)).is_empty());
    }
}
