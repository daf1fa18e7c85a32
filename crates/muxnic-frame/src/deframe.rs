//! Receive state machine for the data channel.
//!
//! The deframer pulls raw bytes off a [`ChanMux`] data channel, cuts the
//! `[2-byte length][payload]` records back apart and lands each payload in
//! a receive ring slot. Record boundaries never line up with read
//! boundaries: a length prefix can arrive split across two reads and one
//! read can carry several records, so all parse state persists across
//! [`Deframer::pump`] calls.
//!
//! Frames longer than a ring slot cannot be delivered; their bytes are
//! still consumed so the stream stays in sync. A failed transport read is
//! different: bytes may be gone mid-record, and from then on no record
//! boundary can be trusted. The machine parks in an error state and the
//! owner must pause far-side delivery, call
//! [`Deframer::resynchronize`] and resume before pumping again.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, trace, warn};

use muxnic_transport::{ChanMux, ChannelConfig, TransportError};

use crate::codec::{ETHERNET_FRAME_MAX_SIZE, LEN_PREFIX_SIZE};
use crate::error::{FrameError, Result};
use crate::ring::{RingProducer, RxNotify};

/// After this many consecutive yields the wait for a free ring slot
/// escalates from yielding to short sleeps.
const YIELD_ESCALATE: u64 = 64;

/// Sleep per slot re-check once yielding has escalated.
const PROCESSING_BACKOFF: Duration = Duration::from_micros(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RxState {
    /// Reset per-frame bookkeeping before parsing the next record.
    FrameStart,
    /// Accumulating the 2-byte big-endian length prefix.
    FrameLen,
    /// Moving payload bytes into the ring slot, or draining a dropped frame.
    FrameData,
    /// Frame published; wait for the next slot to come free.
    Processing,
    /// A read failed and the stream may have stopped mid-record.
    Error,
}

/// What one [`Deframer::pump`] call delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxEvent {
    /// A frame of `len` bytes was published to the ring.
    Published { len: usize },
    /// A frame of `len` bytes exceeded the slot capacity and was discarded.
    /// The stream itself is still in sync.
    Dropped { len: usize },
}

/// Receive state machine over one data channel.
pub struct Deframer<M, N> {
    mux: Arc<M>,
    channel: ChannelConfig,
    producer: RingProducer,
    notify: N,
    /// Transport reads land here and are parsed across pump calls.
    buf: Box<[u8]>,
    buf_off: usize,
    buf_len: usize,
    state: RxState,
    /// Set when parsing ran dry; the next pump pass reads before stepping.
    need_input: bool,
    /// Length-prefix bytes still outstanding.
    len_remaining: usize,
    frame_len: usize,
    frame_off: usize,
    /// Current frame exceeds the slot capacity; consume but do not deliver.
    drop_frame: bool,
    yield_counter: u64,
}

impl<M: ChanMux, N: RxNotify> Deframer<M, N> {
    /// Build a deframer reading `channel` on `mux` and publishing into the
    /// ring behind `producer`.
    pub fn new(mux: Arc<M>, channel: ChannelConfig, producer: RingProducer, notify: N) -> Self {
        debug_assert!(channel.capacity > 0);
        Self {
            buf: vec![0u8; ETHERNET_FRAME_MAX_SIZE].into_boxed_slice(),
            mux,
            channel,
            producer,
            notify,
            buf_off: 0,
            buf_len: 0,
            state: RxState::FrameStart,
            need_input: false,
            len_remaining: 0,
            frame_len: 0,
            frame_off: 0,
            drop_frame: false,
            yield_counter: 0,
        }
    }

    /// Drive the state machine until the next frame is published or
    /// dropped.
    ///
    /// Blocks in [`ChanMux::wait`] while the stream is dry and yields while
    /// the consumer still holds the next ring slot. After a transport read
    /// failure this returns [`FrameError::RecoveryNeeded`] on every call
    /// until [`resynchronize`](Self::resynchronize) has run.
    pub fn pump(&mut self) -> Result<RxEvent> {
        loop {
            if self.state == RxState::Error {
                return Err(FrameError::RecoveryNeeded);
            }
            self.fill()?;
            if let Some(event) = self.step() {
                return Ok(event);
            }
        }
    }

    /// Discard parse state and drain the channel after a failed read.
    ///
    /// The caller pauses far-side delivery first, calls this, then resumes
    /// delivery; the far side starts the next frame on a record boundary.
    /// Overflow indications during the drain are expected and skipped; any
    /// other read error ends the drain early. Returns the number of bytes
    /// thrown away.
    pub fn resynchronize(&mut self) -> usize {
        let mut discarded = self.buf_len;
        self.buf_off = 0;
        self.buf_len = 0;
        loop {
            match self.mux.read(self.channel.id, &mut self.buf) {
                Ok(0) => break,
                Ok(n) => discarded += n,
                Err(TransportError::Overflow { .. }) => continue,
                Err(err) => {
                    debug!(channel = self.channel.id, error = %err, "drain ended by error");
                    break;
                }
            }
        }
        self.state = RxState::FrameStart;
        self.need_input = true;
        if discarded > 0 {
            debug!(
                channel = self.channel.id,
                bytes = discarded,
                "discarded stale data channel bytes"
            );
        }
        discarded
    }

    /// Read more input if parsing ran dry.
    ///
    /// Data events can fire without data behind them, so a zero-byte read
    /// just waits again.
    fn fill(&mut self) -> Result<()> {
        while self.need_input {
            debug_assert_eq!(self.buf_len, 0);
            self.mux.wait(self.channel.id);
            match self.mux.read(self.channel.id, &mut self.buf) {
                Ok(0) => continue,
                Ok(n) => {
                    self.buf_off = 0;
                    self.buf_len = n;
                    self.need_input = false;
                }
                Err(err) => {
                    match &err {
                        TransportError::Overflow { .. } => warn!(
                            channel = self.channel.id,
                            "multiplexer reported FIFO overflow"
                        ),
                        other => warn!(
                            channel = self.channel.id,
                            error = %other,
                            "data channel read failed"
                        ),
                    }
                    self.state = RxState::Error;
                    return Err(FrameError::RecoveryNeeded);
                }
            }
        }
        Ok(())
    }

    /// Run one state machine pass over the buffered input.
    ///
    /// Returns the delivery event when a record completed, `None` when the
    /// pass ended for another reason (state advanced, input ran dry, or a
    /// yield was taken).
    fn step(&mut self) -> Option<RxEvent> {
        match self.state {
            RxState::FrameStart => {
                self.len_remaining = LEN_PREFIX_SIZE;
                self.frame_len = 0;
                self.frame_off = 0;
                self.drop_frame = false;
                self.state = RxState::FrameLen;
                None
            }
            RxState::FrameLen => {
                while self.len_remaining > 0 {
                    if self.buf_len == 0 {
                        self.need_input = true;
                        return None;
                    }
                    // Network byte order, most significant byte first.
                    self.frame_len = (self.frame_len << 8) | usize::from(self.buf[self.buf_off]);
                    self.buf_off += 1;
                    self.buf_len -= 1;
                    self.len_remaining -= 1;
                }
                if self.frame_len > self.producer.slot_capacity() {
                    warn!(
                        len = self.frame_len,
                        capacity = self.producer.slot_capacity(),
                        "frame exceeds slot capacity, dropping"
                    );
                    self.drop_frame = true;
                } else {
                    trace!(len = self.frame_len, "frame length parsed");
                }
                self.state = RxState::FrameData;
                None
            }
            RxState::FrameData => {
                while self.frame_off < self.frame_len {
                    if self.buf_len == 0 {
                        self.need_input = true;
                        return None;
                    }
                    if !self.drop_frame && self.frame_off == 0 && self.producer.is_backlogged() {
                        // The slot can still be held by the consumer right
                        // after a resynchronization; pace like Processing.
                        self.yield_to_consumer();
                        if self.producer.is_backlogged() {
                            return None;
                        }
                        self.report_yields();
                    }
                    let chunk = (self.frame_len - self.frame_off).min(self.buf_len);
                    if !self.drop_frame {
                        self.producer
                            .write(self.frame_off, &self.buf[self.buf_off..self.buf_off + chunk]);
                    }
                    self.buf_off += chunk;
                    self.buf_len -= chunk;
                    self.frame_off += chunk;
                }
                if self.drop_frame {
                    debug!(len = self.frame_len, "oversized frame discarded");
                    self.state = RxState::FrameStart;
                    return Some(RxEvent::Dropped {
                        len: self.frame_len,
                    });
                }
                if self.frame_len == 0 {
                    // Empty records carry nothing to hand over.
                    trace!("zero-length frame skipped");
                    self.state = RxState::FrameStart;
                    return None;
                }
                self.producer.publish(self.frame_len);
                self.notify.frame_ready();
                trace!(len = self.frame_len, "frame published");
                self.state = RxState::Processing;
                Some(RxEvent::Published {
                    len: self.frame_len,
                })
            }
            RxState::Processing => {
                if self.producer.is_backlogged() {
                    if self.buf_len == 0 {
                        // Nothing parsed ahead; fetching input gives the
                        // consumer time without spinning.
                        self.need_input = true;
                        return None;
                    }
                    self.yield_to_consumer();
                    if self.producer.is_backlogged() {
                        return None;
                    }
                }
                self.report_yields();
                self.state = RxState::FrameStart;
                None
            }
            // pump reports the park before stepping again.
            RxState::Error => None,
        }
    }

    fn yield_to_consumer(&mut self) {
        self.yield_counter += 1;
        if self.yield_counter > YIELD_ESCALATE {
            thread::sleep(PROCESSING_BACKOFF);
        } else {
            thread::yield_now();
        }
    }

    fn report_yields(&mut self) {
        match self.yield_counter {
            0 => {}
            1 => trace!("yielded once for the frame consumer"),
            n => warn!(yields = n, "frame consumer stalled the receive loop"),
        }
        self.yield_counter = 0;
    }
}
