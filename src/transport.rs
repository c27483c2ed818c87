//! Transports the controller ticks alongside the network

use rtrb::{Consumer, Producer, RingBuffer};
use tracing::warn;

use crate::network::Emission;

/// External channel ticked once per controller tick.
///
/// `tick` must be cheap and must never block: it runs on the audio thread,
/// possibly thousands of times per block.
pub trait Transport: Send {
    fn tick(&mut self);

    /// Called for every emission on an exported port, before `tick`.
    fn notify(&mut self, _emission: &Emission) {}
}

/// A transport that does nothing but count ticks.
#[derive(Debug, Default)]
pub struct NullTransport {
    ticks: u64,
}

impl NullTransport {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl Transport for NullTransport {
    #[inline]
    fn tick(&mut self) {
        self.ticks += 1;
    }
}

/// A transport that pushes exported emissions into an rtrb ring buffer
///
/// Useful for:
/// - Watching a running plugin from another thread
/// - Recording parameter echoes and failures for analysis
///
/// Never blocks. When the ring is full the emission is dropped and counted.
pub struct MonitorTransport {
    producer: Producer<Emission>,
    dropped: u64,
    ticks: u64,
}

impl MonitorTransport {
    /// Create a transport and the consumer end the monitor thread reads from
    pub fn new(capacity: usize) -> (Self, Consumer<Emission>) {
        let (producer, consumer) = RingBuffer::new(capacity.max(1));
        let transport = Self {
            producer,
            dropped: 0,
            ticks: 0,
        };
        (transport, consumer)
    }

    /// Returns how many emission slots are free
    #[inline]
    pub fn available(&self) -> usize {
        self.producer.slots()
    }

    /// Emissions lost because the ring was full
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl Transport for MonitorTransport {
    fn tick(&mut self) {
        self.ticks += 1;
    }

    fn notify(&mut self, emission: &Emission) {
        if self.producer.push(*emission).is_err() {
            self.dropped += 1;
            // one warning per burst, not per packet
            if self.dropped.is_power_of_two() {
                warn!(dropped = self.dropped, source = %emission.source, "monitor ring full");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Endpoint;
    use crate::packet::Packet;

    fn emission(v: f32) -> Emission {
        Emission {
            source: Endpoint::new(0, 1),
            packet: Packet::Float(v),
        }
    }

    #[test]
    fn null_transport_counts_ticks() {
        let mut t = NullTransport::new();
        t.tick();
        t.notify(&emission(1.0));
        t.tick();
        assert_eq!(t.ticks(), 2);
    }

    #[test]
    fn monitor_delivers_in_order() {
        let (mut t, mut rx) = MonitorTransport::new(4);
        t.notify(&emission(1.0));
        t.notify(&emission(2.0));

        assert_eq!(rx.pop().unwrap(), emission(1.0));
        assert_eq!(rx.pop().unwrap(), emission(2.0));
        assert!(rx.pop().is_err());
    }

    #[test]
    fn monitor_drops_when_full() {
        let (mut t, mut rx) = MonitorTransport::new(2);
        for i in 0..5 {
            t.notify(&emission(i as f32));
        }
        assert_eq!(t.dropped(), 3);
        assert_eq!(t.available(), 0);
        assert_eq!(rx.pop().unwrap(), emission(0.0));
    }

    #[test]
    fn monitor_is_usable_across_threads() {
        let (mut t, mut rx) = MonitorTransport::new(16);
        let reader = std::thread::spawn(move || {
            let mut seen = Vec::new();
            while seen.len() < 3 {
                if let Ok(e) = rx.pop() {
                    seen.push(e);
                }
            }
            seen
        });

        for i in 0..3 {
            t.notify(&emission(i as f32));
        }

        let seen = reader.join().unwrap();
        assert_eq!(seen, vec![emission(0.0), emission(1.0), emission(2.0)]);
    }
}
