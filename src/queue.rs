//! Bounded FIFO of pending messages.

use rtrb::{Consumer, Producer, RingBuffer};

use crate::packet::Message;

/// Fixed-capacity message queue backed by an `rtrb` ring buffer.
///
/// Both ends live in the network and are only touched from the thread that
/// ticks it. Pushing onto a full queue hands the message back instead of
/// overwriting or dropping anything.
pub struct MessageQueue {
    producer: Producer<Message>,
    consumer: Consumer<Message>,
    capacity: usize,
}

impl MessageQueue {
    pub fn new(capacity: usize) -> Self {
        let (producer, consumer) = RingBuffer::new(capacity);
        Self {
            producer,
            consumer,
            capacity,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of pending messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.consumer.slots()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.consumer.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.producer.is_full()
    }

    /// Enqueue a message.
    ///
    /// Returns `Err(msg)` if the queue is full.
    pub fn push(&mut self, msg: Message) -> Result<(), Message> {
        self.producer.push(msg).map_err(|rtrb::PushError::Full(m)| m)
    }

    /// Dequeue the oldest message.
    pub fn pop(&mut self) -> Option<Message> {
        self.consumer.pop().ok()
    }

    /// Drop every pending message for which `keep` returns false, preserving
    /// the order of the rest. Returns how many were dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(&Message) -> bool) -> usize {
        let pending = self.len();
        let mut dropped = 0;
        for _ in 0..pending {
            let Some(msg) = self.pop() else { break };
            if keep(&msg) {
                // A slot was just freed by the pop above.
                let requeued = self.push(msg);
                debug_assert!(requeued.is_ok());
            } else {
                dropped += 1;
            }
        }
        dropped
    }
}
