//! Buffer ownership: the bridge-owned audio block and the per-call lending arena.

use crate::packet::{BufferRef, BufferType};

/// Maximum number of buffers one arena can lend at a time.
pub const MAX_LENT_BUFFERS: usize = 4;

struct Lent<'buf> {
    data: &'buf mut [f32],
    tag: BufferType,
}

/// Lends buffers to the network for the duration of a single call.
///
/// Buffers are handed out as [`BufferRef`]s stamped with the arena's
/// generation. Components resolve them back to samples through their
/// [`ProcessContext`](crate::node::ProcessContext); a reference from another
/// generation, or a null reference, resolves to `None`. When the arena is
/// dropped the borrow of every lent buffer ends with it.
pub struct BufferArena<'buf> {
    generation: u32,
    slots: [Option<Lent<'buf>>; MAX_LENT_BUFFERS],
}

impl<'buf> BufferArena<'buf> {
    pub fn new(generation: u32) -> Self {
        Self {
            generation,
            slots: Default::default(),
        }
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Number of buffers currently lent.
    pub fn lent(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Lend `data`, returning a reference covering all of it.
    ///
    /// Returns `None` if every slot is taken.
    pub fn lend(&mut self, data: &'buf mut [f32], tag: BufferType) -> Option<BufferRef> {
        let slot = self.slots.iter().position(|s| s.is_none())?;
        let samples = data.len();
        self.slots[slot] = Some(Lent { data, tag });

        Some(BufferRef {
            slot: slot as u16,
            generation: self.generation,
            samples,
            tag,
        })
    }

    /// Mutable access to a lent buffer.
    pub fn resolve(&mut self, buffer: &BufferRef) -> Option<&mut [f32]> {
        if buffer.is_null() || buffer.generation != self.generation {
            return None;
        }

        let lent = self.slots.get_mut(buffer.slot as usize)?.as_mut()?;
        if lent.tag != buffer.tag {
            return None;
        }
        Some(&mut *lent.data)
    }

    /// Shared access to a lent buffer.
    pub fn get(&self, buffer: &BufferRef) -> Option<&[f32]> {
        if buffer.is_null() || buffer.generation != self.generation {
            return None;
        }

        let lent = self.slots.get(buffer.slot as usize)?.as_ref()?;
        if lent.tag != buffer.tag {
            return None;
        }
        Some(&*lent.data)
    }
}

/// Contiguous sample storage owned by the bridge.
///
/// Allocated once with a fixed capacity; running a block never allocates.
pub struct AudioBlock {
    samples: Vec<f32>,
}

impl AudioBlock {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity],
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// The first `len` samples. `len` is clamped to the capacity.
    pub fn as_slice(&self, len: usize) -> &[f32] {
        &self.samples[..len.min(self.samples.len())]
    }

    /// The first `len` samples, mutably. `len` is clamped to the capacity.
    pub fn as_mut_slice(&mut self, len: usize) -> &mut [f32] {
        let len = len.min(self.samples.len());
        &mut self.samples[..len]
    }
}
