//! Track model: decoded events, cumulative pulses, reconstructed notes.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::ops::Range;
use arrayvec::ArrayString;

use crate::event::{ChannelMessage, EventKind, MetaEvent, RawEvent, TextKind};
use crate::instrument::Instrument;
use crate::note::Note;
use crate::time::Pulses;

/// One track of a song.
///
/// `pulses[i]` is the absolute pulse of `events[i]`. The replay cursor is
/// private and only moves forward until [`Track::reset`].
#[derive(Clone, Debug)]
pub struct Track {
    /// Name from the first track-name meta event
    pub name: ArrayString<64>,
    events: Vec<RawEvent>,
    pulses: Vec<Pulses>,
    notes: Vec<Note>,
    instrument: Instrument,
    /// Number of Note-Ons still open at end of track (dropped)
    unterminated: usize,
    /// Next event index to emit
    cursor: usize,
    /// Pulses forwarded since the last reset
    running_pulses: Pulses,
}

impl Track {
    /// Build a track from decoded events.
    ///
    /// Cumulative pulses, notes and the instrument are derived once here.
    pub fn new(track_id: usize, events: Vec<RawEvent>) -> Self {
        let pulses = cumulative_pulses(&events);
        let (notes, unterminated) = reconstruct_notes(track_id, &events, &pulses);
        let instrument = Instrument::classify(&events);
        let name = track_name(&events);

        Self {
            name,
            events,
            pulses,
            notes,
            instrument,
            unterminated,
            cursor: 0,
            running_pulses: 0,
        }
    }

    pub fn events(&self) -> &[RawEvent] {
        &self.events
    }

    pub fn pulses(&self) -> &[Pulses] {
        &self.pulses
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn instrument(&self) -> Instrument {
        self.instrument
    }

    pub fn has_notes(&self) -> bool {
        !self.notes.is_empty()
    }

    /// Note-Ons that never saw a matching release.
    pub fn unterminated_notes(&self) -> usize {
        self.unterminated
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Absolute pulse of the last event (0 for an empty track).
    pub fn last_pulse(&self) -> Pulses {
        self.pulses.last().copied().unwrap_or(0)
    }

    /// Event `index` with its absolute pulse.
    pub fn event_at(&self, index: usize) -> Option<(Pulses, &RawEvent)> {
        Some((*self.pulses.get(index)?, self.events.get(index)?))
    }

    /// Rewind the replay cursor.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.running_pulses = 0;
    }

    pub fn running_pulses(&self) -> Pulses {
        self.running_pulses
    }

    /// Forward `pulses` and return the index range of events crossed.
    ///
    /// An event is crossed once the running pulse count reaches its pulse.
    pub fn advance(&mut self, pulses: Pulses) -> Range<usize> {
        self.running_pulses += pulses;
        let start = self.cursor;
        while self.cursor < self.pulses.len() && self.pulses[self.cursor] <= self.running_pulses {
            self.cursor += 1;
        }
        start..self.cursor
    }

    /// True once every event has been emitted.
    pub fn is_finished(&self) -> bool {
        self.cursor >= self.events.len()
    }
}

/// Running prefix sums of event deltas.
pub fn cumulative_pulses(events: &[RawEvent]) -> Vec<Pulses> {
    let mut total: Pulses = 0;
    events
        .iter()
        .map(|e| {
            total += e.delta as Pulses;
            total
        })
        .collect()
}

/// Pair Note-Ons with their releases.
///
/// A Note-On for a (channel, note) that is already sounding closes the
/// previous occurrence at the new pulse and opens a fresh one. Anything
/// still open at the end of the track is dropped; the count is returned.
pub fn reconstruct_notes(track_id: usize, events: &[RawEvent], pulses: &[Pulses]) -> (Vec<Note>, usize) {
    let mut open: BTreeMap<(u8, u8), (Pulses, u8)> = BTreeMap::new();
    let mut notes = Vec::new();

    for (event, &pulse) in events.iter().zip(pulses) {
        let EventKind::Channel(ev) = &event.kind else { continue };
        let Some(note) = ev.note() else { continue };
        let key = (ev.channel, note);

        if ev.is_note_off() {
            if let Some((start, velocity)) = open.remove(&key) {
                notes.push(Note { note, channel: ev.channel, velocity, track_id, start, end: pulse });
            }
            continue;
        }

        let velocity = match ev.message {
            ChannelMessage::NoteOn { velocity, .. } => velocity,
            _ => continue,
        };
        if let Some((start, prev_velocity)) = open.insert(key, (pulse, velocity)) {
            notes.push(Note {
                note,
                channel: ev.channel,
                velocity: prev_velocity,
                track_id,
                start,
                end: pulse,
            });
        }
    }

    (notes, open.len())
}

fn track_name(events: &[RawEvent]) -> ArrayString<64> {
    let mut name = ArrayString::new();
    let text = events.iter().find_map(|e| match &e.kind {
        EventKind::Meta(MetaEvent::Text { kind: TextKind::TrackName, text }) => Some(text),
        _ => None,
    });
    if let Some(text) = text {
        for ch in String::from_utf8_lossy(text).trim().chars() {
            if name.try_push(ch).is_err() {
                break;
            }
        }
    }
    name
}
