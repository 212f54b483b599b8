//! Closed note intervals, in pulses and in microseconds.

use alloc::vec::Vec;
use core::cmp::Ordering;

use crate::time::{Microseconds, Pulses};

/// A closed note reconstructed from a Note-On/Note-Off pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Note {
    /// MIDI note number (60 = middle C)
    pub note: u8,
    pub channel: u8,
    pub velocity: u8,
    /// Index of the originating track
    pub track_id: usize,
    pub start: Pulses,
    pub end: Pulses,
}

impl Note {
    pub fn duration(&self) -> Pulses {
        self.end.saturating_sub(self.start)
    }
}

/// Whether the user played a scored note.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlayState {
    #[default]
    Unplayed,
    Hit,
    Missed,
}

/// A note projected onto the playback clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TranslatedNote {
    pub note: u8,
    pub channel: u8,
    pub velocity: u8,
    pub track_id: usize,
    pub start: Microseconds,
    pub end: Microseconds,
    pub state: PlayState,
}

impl TranslatedNote {
    /// Set ordering: start time, note number, channel, then track.
    fn order(&self, other: &Self) -> Ordering {
        self.start
            .cmp(&other.start)
            .then(self.note.cmp(&other.note))
            .then(self.channel.cmp(&other.channel))
            .then(self.track_id.cmp(&other.track_id))
    }
}

/// Every translated note of a song, ordered by (start, note, channel).
///
/// Consumers rely on the ordering to stop scanning as soon as a note starts
/// past their horizon.
#[derive(Clone, Debug, Default)]
pub struct TranslatedNoteSet {
    notes: Vec<TranslatedNote>,
}

impl TranslatedNoteSet {
    pub fn new() -> Self {
        Self { notes: Vec::new() }
    }

    /// Build a set from notes in any order.
    pub fn from_unsorted(mut notes: Vec<TranslatedNote>) -> Self {
        notes.sort_by(TranslatedNote::order);
        Self { notes }
    }

    /// Insert one note at its ordered position (after any equal notes).
    pub fn insert(&mut self, note: TranslatedNote) {
        let pos = self
            .notes
            .partition_point(|n| n.order(&note) != Ordering::Greater);
        self.notes.insert(pos, note);
    }

    pub fn iter(&self) -> core::slice::Iter<'_, TranslatedNote> {
        self.notes.iter()
    }

    pub fn get(&self, index: usize) -> Option<&TranslatedNote> {
        self.notes.get(index)
    }

    /// Update the play state of the note at `index`.
    pub fn set_state(&mut self, index: usize, state: PlayState) {
        if let Some(note) = self.notes.get_mut(index) {
            note.state = state;
        }
    }

    /// Reset every note to [`PlayState::Unplayed`].
    pub fn clear_states(&mut self) {
        for note in &mut self.notes {
            note.state = PlayState::Unplayed;
        }
    }

    /// Notes sounding at some point in `[from, horizon)`.
    ///
    /// Single forward scan that stops at the first note starting at or
    /// after `horizon`.
    pub fn visible(
        &self,
        from: Microseconds,
        horizon: Microseconds,
    ) -> impl Iterator<Item = (usize, &TranslatedNote)> + '_ {
        self.notes
            .iter()
            .enumerate()
            .take_while(move |(_, n)| n.start < horizon)
            .filter(move |(_, n)| n.end >= from)
    }

    pub fn first(&self) -> Option<&TranslatedNote> {
        self.notes.first()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

impl<'a> IntoIterator for &'a TranslatedNoteSet {
    type Item = &'a TranslatedNote;
    type IntoIter = core::slice::Iter<'a, TranslatedNote>;

    fn into_iter(self) -> Self::IntoIter {
        self.notes.iter()
    }
}
