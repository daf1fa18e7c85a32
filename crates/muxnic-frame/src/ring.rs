//! Single-producer single-consumer receive ring.
//!
//! The deframer copies payload bytes into fixed-size slots; the network
//! stack drains them from the other end. Each slot's `len` field doubles as
//! the handshake flag: zero means the slot belongs to the producer, nonzero
//! means it holds a frame of that many bytes and belongs to the consumer.
//! The producer's `Release` store on publish and the consumer's `Acquire`
//! load on take order the data accesses, so no lock is needed. A slot is
//! never overwritten while its `len` is nonzero; when the consumer falls
//! behind, the producer holds off instead.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;

/// Consumer-side signal that a frame has been published.
///
/// Fired by the deframer after every publish, from the receive loop's
/// thread. Implementations must not block for long; typically this pokes a
/// condition variable or an event channel the network stack sleeps on.
pub trait RxNotify: Send + Sync {
    fn frame_ready(&self);
}

struct Slot {
    /// Zero: free, producer's turn. Nonzero: frame of this many bytes,
    /// consumer's turn.
    len: AtomicUsize,
    data: UnsafeCell<Box<[u8]>>,
}

// SAFETY: slot data is written only by the producer while `len` is zero and
// read only by the consumer while `len` is nonzero. The Release store in
// `publish` and the Acquire load in `take` (and the mirror pair when the
// consumer frees the slot) order those accesses across threads.
unsafe impl Sync for Slot {}

struct RxRing {
    slots: Box<[Slot]>,
    slot_capacity: usize,
}

/// Create a receive ring with `slots` slots of `slot_capacity` data bytes.
///
/// Returns the producer and consumer handles. Neither handle is cloneable;
/// single ownership per side is what makes the slot handshake sufficient.
///
/// # Panics
///
/// Panics if `slots` or `slot_capacity` is zero.
pub fn rx_ring(slots: usize, slot_capacity: usize) -> (RingProducer, RingConsumer) {
    assert!(slots > 0, "receive ring needs at least one slot");
    assert!(slot_capacity > 0, "receive slots need nonzero capacity");
    let slots = (0..slots)
        .map(|_| Slot {
            len: AtomicUsize::new(0),
            data: UnsafeCell::new(vec![0u8; slot_capacity].into_boxed_slice()),
        })
        .collect::<Vec<_>>()
        .into_boxed_slice();
    let ring = Arc::new(RxRing {
        slots,
        slot_capacity,
    });
    (
        RingProducer {
            ring: Arc::clone(&ring),
            cursor: 0,
        },
        RingConsumer { ring, cursor: 0 },
    )
}

/// Write side of the receive ring, owned by the deframer.
pub struct RingProducer {
    ring: Arc<RxRing>,
    cursor: usize,
}

impl RingProducer {
    /// Data bytes one slot can hold.
    pub fn slot_capacity(&self) -> usize {
        self.ring.slot_capacity
    }

    /// True while the slot under the write cursor still holds an undrained
    /// frame. Writing must hold off until this clears.
    pub fn is_backlogged(&self) -> bool {
        self.ring.slots[self.cursor].len.load(Ordering::Acquire) != 0
    }

    /// Copy `bytes` into the cursor slot at `offset`.
    ///
    /// The slot must be free (`!is_backlogged()`) and the write must fit
    /// within the slot capacity.
    pub fn write(&mut self, offset: usize, bytes: &[u8]) {
        let slot = &self.ring.slots[self.cursor];
        debug_assert_eq!(slot.len.load(Ordering::Acquire), 0);
        debug_assert!(offset + bytes.len() <= self.ring.slot_capacity);
        // SAFETY: `len` is zero, so the consumer does not touch the data
        // area (see the handshake contract on `Slot`).
        let data = unsafe { &mut *slot.data.get() };
        data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Publish the cursor slot as a frame of `len` bytes and advance the
    /// cursor to the next slot.
    pub fn publish(&mut self, len: usize) {
        let slot = &self.ring.slots[self.cursor];
        debug_assert_ne!(len, 0);
        debug_assert!(len <= self.ring.slot_capacity);
        debug_assert_eq!(slot.len.load(Ordering::Acquire), 0);
        slot.len.store(len, Ordering::Release);
        self.cursor = (self.cursor + 1) % self.ring.slots.len();
    }
}

/// Read side of the receive ring, owned by the network stack.
pub struct RingConsumer {
    ring: Arc<RxRing>,
    cursor: usize,
}

impl RingConsumer {
    /// Take the next published frame, freeing its slot for the producer.
    ///
    /// Returns `None` when no frame is pending. Frames come out in publish
    /// order.
    pub fn take(&mut self) -> Option<Bytes> {
        let slot = &self.ring.slots[self.cursor];
        let len = slot.len.load(Ordering::Acquire);
        if len == 0 {
            return None;
        }
        // SAFETY: `len` is nonzero, so the producer leaves the data area
        // alone until the store below frees the slot.
        let data = unsafe { &*slot.data.get() };
        let frame = Bytes::copy_from_slice(&data[..len]);
        slot.len.store(0, Ordering::Release);
        self.cursor = (self.cursor + 1) % self.ring.slots.len();
        Some(frame)
    }
}
