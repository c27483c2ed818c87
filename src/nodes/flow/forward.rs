//! Pass-through node

use crate::node::{Component, PortDescriptor, PortId, PortKind, ProcessContext};
use crate::packet::Packet;

static PORTS: &[PortDescriptor] = &[
    PortDescriptor::input(0, "in", PortKind::Any),
    PortDescriptor::output(0, "out", PortKind::Any),
];

/// Re-emits every packet it receives, unchanged, on `out`.
///
/// Buffers pass through by reference, exactly like any other packet.
#[derive(Clone, Copy, Debug, Default)]
pub struct Forward;

impl Forward {
    pub const IN: PortId = PortId(0);
    pub const OUT: PortId = PortId(0);
}

impl Component for Forward {
    fn name(&self) -> &str {
        "Forward"
    }

    fn ports(&self) -> &'static [PortDescriptor] {
        PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_, '_>, packet: Packet, port: PortId) {
        if port == Self::IN {
            ctx.send(Self::OUT, packet);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferArena;
    use crate::node::{NodeId, Outbox};

    #[test]
    fn forwards_unchanged() {
        let mut arena = BufferArena::new(1);
        let mut outbox = Outbox::new();
        let mut ctx = ProcessContext::new(NodeId(0), &mut arena, &mut outbox);

        Forward.process(&mut ctx, Packet::Integer(7), Forward::IN);
        Forward.process(&mut ctx, Packet::Integer(8), PortId(3));

        assert_eq!(outbox, vec![(Forward::OUT, Packet::Integer(7))]);
    }
}
