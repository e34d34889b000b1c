//! Deferred continuations keyed by simulation time.
//!
//! Ability delays, repeat delays and phase transition windows are not
//! blocking waits; they are entries in a [`TimerQueue`] that the owning
//! component drains once per tick. Cancelling removes an entry by token.
//!
//! The clock is `f64` seconds. Durations are authored as `f32`, so a frame
//! sum that should land exactly on a fire time can fall a few ulps short;
//! [`TIME_EPSILON`] absorbs that.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

/// Slack allowed when comparing the clock against a fire time or a
/// remaining cooldown. Well below any realistic frame length.
pub const TIME_EPSILON: f64 = 1e-4;

/// Identifies one scheduled entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerToken(u64);

/// An entry whose fire time has been reached.
#[derive(Clone, Debug, PartialEq)]
pub struct DueTimer<T> {
    pub token: TimerToken,
    /// Scheduled fire time; follow-up work should be scheduled from here
    /// rather than from the current clock so timelines do not drift with
    /// frame length.
    pub fire_at: f64,
    pub payload: T,
}

struct Entry<T> {
    fire_at: f64,
    seq: u64,
    payload: T,
}

// Ordering is reversed so the std max-heap pops the earliest entry first.
// Ties on fire time resolve in scheduling order.
impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .fire_at
            .total_cmp(&self.fire_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl<T> Eq for Entry<T> {}

/// Min-heap of `(fire_at, payload)` entries with lazy cancellation.
pub struct TimerQueue<T> {
    heap: BinaryHeap<Entry<T>>,
    pending: HashSet<TimerToken>,
    next_seq: u64,
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            pending: HashSet::new(),
            next_seq: 0,
        }
    }

    /// Schedules `payload` to fire `delay` seconds after `now`.
    /// Negative delays fire at `now`.
    pub fn schedule(&mut self, now: f64, delay: f32, payload: T) -> TimerToken {
        let seq = self.next_seq;
        self.next_seq += 1;
        let token = TimerToken(seq);
        self.heap.push(Entry {
            fire_at: now + f64::from(delay.max(0.0)),
            seq,
            payload,
        });
        self.pending.insert(token);
        token
    }

    /// Cancels a pending entry. Returns false if it already fired or was
    /// cancelled.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        self.pending.remove(&token)
    }

    pub fn is_pending(&self, token: TimerToken) -> bool {
        self.pending.contains(&token)
    }

    /// Pops the earliest entry whose fire time is at or before `now`,
    /// within [`TIME_EPSILON`].
    pub fn pop_due(&mut self, now: f64) -> Option<DueTimer<T>> {
        self.discard_cancelled();
        if self.heap.peek()?.fire_at > now + TIME_EPSILON {
            return None;
        }
        let entry = self.heap.pop()?;
        let token = TimerToken(entry.seq);
        self.pending.remove(&token);
        Some(DueTimer {
            token,
            fire_at: entry.fire_at,
            payload: entry.payload,
        })
    }

    /// Fire time of the earliest live entry.
    pub fn next_fire_time(&mut self) -> Option<f64> {
        self.discard_cancelled();
        self.heap.peek().map(|entry| entry.fire_at)
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn discard_cancelled(&mut self) {
        while let Some(entry) = self.heap.peek() {
            if self.pending.contains(&TimerToken(entry.seq)) {
                break;
            }
            self.heap.pop();
        }
    }
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for TimerQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerQueue")
            .field("pending", &self.pending.len())
            .finish()
    }
}
