//! One-shot timer queue for Horizon Bind.
//!
//! Components that need to act "a little later" (delayed event dispatch,
//! debounced selection) arm a one-shot timer carrying a payload. The host
//! event loop drives the queue by calling [`TimerQueue::process_expired`]
//! with the current instant and handling the payloads that come back.
//!
//! Everything runs on the caller's thread; nothing fires on its own.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use slotmap::{SlotMap, new_key_type};

use crate::error::{Result, TimerError};
use crate::logging::targets;

new_key_type! {
    /// A unique identifier for a timer.
    pub struct TimerId;
}

/// Internal timer data.
#[derive(Debug)]
struct TimerData<T> {
    /// When this timer should fire.
    fire_at: Instant,
    /// What to hand back when it fires.
    payload: T,
}

/// An entry in the timer queue (min-heap by fire time).
#[derive(Debug, Clone, Copy)]
struct TimerQueueEntry {
    id: TimerId,
    fire_time: Instant,
    /// Arming order, used to keep timers with equal deadlines FIFO.
    sequence: u64,
}

impl PartialEq for TimerQueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_time == other.fire_time && self.sequence == other.sequence
    }
}

impl Eq for TimerQueueEntry {}

impl PartialOrd for TimerQueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerQueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap (BinaryHeap is max-heap by default).
        other
            .fire_time
            .cmp(&self.fire_time)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Queue of pending one-shot timers, each carrying a payload of type `T`.
#[derive(Debug)]
pub struct TimerQueue<T> {
    timers: SlotMap<TimerId, TimerData<T>>,
    queue: BinaryHeap<TimerQueueEntry>,
    sequence: u64,
}

impl<T> TimerQueue<T> {
    /// Create an empty timer queue.
    pub fn new() -> Self {
        Self {
            timers: SlotMap::with_key(),
            queue: BinaryHeap::new(),
            sequence: 0,
        }
    }

    /// Arm a one-shot timer that fires `delay` after now.
    pub fn start_one_shot(&mut self, delay: Duration, payload: T) -> TimerId {
        self.start_one_shot_at(Instant::now() + delay, payload)
    }

    /// Arm a one-shot timer that fires at `fire_at`.
    pub fn start_one_shot_at(&mut self, fire_at: Instant, payload: T) -> TimerId {
        let id = self.timers.insert(TimerData { fire_at, payload });
        self.sequence += 1;
        self.queue.push(TimerQueueEntry {
            id,
            fire_time: fire_at,
            sequence: self.sequence,
        });
        tracing::trace!(target: targets::TIMER, ?id, "timer armed");
        id
    }

    /// Stop and remove a timer, returning its payload.
    pub fn stop(&mut self, id: TimerId) -> Result<T> {
        self.timers
            .remove(id)
            .map(|data| data.payload)
            .ok_or_else(|| TimerError::NotPending.into())
    }

    /// Check if a timer is still pending.
    pub fn is_active(&self, id: TimerId) -> bool {
        self.timers.contains_key(id)
    }

    /// When the given timer is due, if it is still pending.
    pub fn deadline(&self, id: TimerId) -> Option<Instant> {
        self.timers.get(id).map(|t| t.fire_at)
    }

    /// Get the duration from `now` until the next timer fires, if any.
    pub fn time_until_next(&mut self, now: Instant) -> Option<Duration> {
        // Drop stopped timers from the front of the queue.
        while let Some(entry) = self.queue.peek() {
            if self.timers.contains_key(entry.id) {
                break;
            }
            self.queue.pop();
        }

        self.queue
            .peek()
            .map(|entry| entry.fire_time.saturating_duration_since(now))
    }

    /// Remove every timer due at or before `now` and return the payloads in
    /// firing order.
    #[tracing::instrument(skip(self), target = "horizon_bind_core::timer", level = "trace")]
    pub fn process_expired(&mut self, now: Instant) -> Vec<(TimerId, T)> {
        let mut fired = Vec::new();

        while let Some(entry) = self.queue.peek() {
            if entry.fire_time > now {
                break;
            }
            let Some(entry) = self.queue.pop() else {
                break;
            };

            // Stopped timers leave stale heap entries behind.
            if let Some(data) = self.timers.remove(entry.id) {
                tracing::trace!(target: targets::TIMER, id = ?entry.id, "timer fired");
                fired.push((entry.id, data.payload));
            }
        }

        fired
    }

    /// Get the number of pending timers.
    pub fn active_count(&self) -> usize {
        self.timers.len()
    }
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
