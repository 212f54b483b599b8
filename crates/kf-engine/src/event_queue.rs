//! Ordered buffer for events crossed during one playback step.

use alloc::vec::Vec;
use kf_ir::{Pulses, RawEvent};

/// An event handed to the host, tagged with its source track.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaybackEvent {
    pub track_id: usize,
    /// Absolute pulse of the event within its track
    pub pulse: Pulses,
    pub event: RawEvent,
}

/// Events sorted by (pulse, track id), stable for equal keys.
///
/// Tracks are advanced one after another within a step; the queue merges
/// their output so the order does not depend on how a span of time was
/// split into steps.
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    events: Vec<PlaybackEvent>,
}

impl EventQueue {
    /// Create a new empty event queue.
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Insert after every queued event with the same or an earlier key.
    pub fn push(&mut self, event: PlaybackEvent) {
        let key = (event.pulse, event.track_id);
        let pos = self
            .events
            .partition_point(|e| (e.pulse, e.track_id) <= key);
        self.events.insert(pos, event);
    }

    /// Move every queued event to the end of `out`, in order.
    pub fn drain_into(&mut self, out: &mut Vec<PlaybackEvent>) {
        out.append(&mut self.events);
    }

    /// Clear all events.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns the number of events in the queue.
    pub fn len(&self) -> usize {
        self.events.len()
    }
}
