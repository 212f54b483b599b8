//! Scoring of live input against expected notes.

use alloc::vec::Vec;
use kf_ir::{ChannelEvent, ChannelMessage, Microseconds, TranslatedNoteSet};
use log::trace;

/// Default width of a note opportunity window.
pub const DEFAULT_WINDOW_WIDTH_US: Microseconds = 320_000;

/// Points for a hit at combo multiplier 1.
pub const NOTE_BASE_VALUE: f64 = 100.0;

pub const MAX_COMBO_MULTIPLIER: f64 = 5.0;

/// Score multiplier for a hit landing on top of `combo` earlier hits.
pub fn combo_multiplier(combo: u32) -> f64 {
    (1.0 + combo as f64 / 10.0).min(MAX_COMBO_MULTIPLIER)
}

/// Interval during which a live press counts as playing one note.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteWindow {
    pub start: Microseconds,
    pub end: Microseconds,
    pub note: u8,
    /// Index of the note in the translated note set
    pub note_index: usize,
}

impl NoteWindow {
    /// Strictly inside, both edges excluded.
    pub fn contains(&self, time: Microseconds) -> bool {
        self.start < time && time < self.end
    }
}

/// Result of feeding one live event to the matcher.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MatchOutcome {
    Hit { note_index: usize, points: f64 },
    /// A press with no open window for its note
    Stray,
    /// Not a press
    Ignored,
}

/// Running counters for one playthrough.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SongStatistics {
    pub total_notes: usize,
    pub playable_notes: usize,
    pub notes_hit: usize,
    pub notes_missed: usize,
    pub stray_presses: usize,
    pub longest_combo: u32,
    pub score: f64,
}

/// Visual state of one key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyState {
    #[default]
    Released,
    Pressed,
    Hit,
}

/// State of all 128 keys.
#[derive(Clone, Debug)]
pub struct KeyboardState {
    keys: [KeyState; 128],
}

impl Default for KeyboardState {
    fn default() -> Self {
        Self { keys: [KeyState::Released; 128] }
    }
}

impl KeyboardState {
    pub fn get(&self, note: u8) -> KeyState {
        self.keys.get(note as usize).copied().unwrap_or_default()
    }

    pub fn set(&mut self, note: u8, state: KeyState) {
        if let Some(key) = self.keys.get_mut(note as usize) {
            *key = state;
        }
    }

    pub fn release_all(&mut self) {
        self.keys = [KeyState::Released; 128];
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, KeyState)> + '_ {
        self.keys.iter().enumerate().map(|(n, &k)| (n as u8, k))
    }
}

/// Streaming matcher over the windows of every user-played note.
///
/// Windows are created in bulk by [`PerformanceMatcher::start`] and only
/// ever removed, by a hit or by expiry.
#[derive(Clone, Debug)]
pub struct PerformanceMatcher {
    width: Microseconds,
    /// Ordered by start; every window has the same width so also by end
    windows: Vec<NoteWindow>,
    combo: u32,
    stats: SongStatistics,
    keyboard: KeyboardState,
}

impl Default for PerformanceMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_WIDTH_US)
    }
}

impl PerformanceMatcher {
    pub fn new(width: Microseconds) -> Self {
        Self {
            width: width.max(0),
            windows: Vec::new(),
            combo: 0,
            stats: SongStatistics::default(),
            keyboard: KeyboardState::default(),
        }
    }

    pub fn width(&self) -> Microseconds {
        self.width
    }

    /// Begin a playthrough: one window per note whose track is user-played.
    ///
    /// Clears every counter and the keyboard.
    pub fn start<F>(&mut self, notes: &TranslatedNoteSet, mut is_user_track: F)
    where
        F: FnMut(usize) -> bool,
    {
        let half = self.width / 2;
        self.windows = notes
            .iter()
            .enumerate()
            .filter(|(_, n)| is_user_track(n.track_id))
            .map(|(note_index, n)| NoteWindow {
                start: n.start.saturating_sub(half),
                end: n.start.saturating_add(half),
                note: n.note,
                note_index,
            })
            .collect();

        self.combo = 0;
        self.keyboard.release_all();
        self.stats = SongStatistics {
            total_notes: notes.len(),
            playable_notes: self.windows.len(),
            ..SongStatistics::default()
        };
    }

    /// Drop every window that ended before `now` without scoring it.
    ///
    /// The dropped notes no longer count as playable. Returns how many
    /// were dropped.
    pub fn skip_to(&mut self, now: Microseconds) -> usize {
        let skipped = self.windows.partition_point(|w| w.end < now);
        self.windows.drain(..skipped);
        self.stats.playable_notes -= skipped;
        skipped
    }

    /// Remove every window that ended before `now`, breaking the combo.
    ///
    /// Returns the note indices of the missed notes.
    pub fn expire(&mut self, now: Microseconds) -> Vec<usize> {
        let expired = self.windows.partition_point(|w| w.end < now);
        if expired == 0 {
            return Vec::new();
        }

        let missed: Vec<usize> = self.windows.drain(..expired).map(|w| w.note_index).collect();
        trace!("{} windows expired at {} us", missed.len(), now);
        self.stats.notes_missed += missed.len();
        self.combo = 0;
        missed
    }

    /// Classify a live event received at playback time `now`.
    pub fn feed(&mut self, event: &ChannelEvent, now: Microseconds) -> MatchOutcome {
        if event.is_note_off() {
            if let Some(note) = event.note() {
                self.keyboard.set(note, KeyState::Released);
            }
            return MatchOutcome::Ignored;
        }
        let note = match event.message {
            ChannelMessage::NoteOn { note, .. } => note,
            _ => return MatchOutcome::Ignored,
        };

        let found = self
            .windows
            .iter()
            .take_while(|w| w.start <= now)
            .position(|w| w.note == note && w.contains(now));

        let Some(pos) = found else {
            self.stats.stray_presses += 1;
            self.keyboard.set(note, KeyState::Pressed);
            trace!("stray press of {} at {} us", note, now);
            return MatchOutcome::Stray;
        };

        let window = self.windows.remove(pos);
        let points = NOTE_BASE_VALUE * combo_multiplier(self.combo);
        self.combo += 1;
        self.stats.notes_hit += 1;
        self.stats.score += points;
        self.stats.longest_combo = self.stats.longest_combo.max(self.combo);
        self.keyboard.set(note, KeyState::Hit);
        trace!("hit note {} (index {}) for {} points", note, window.note_index, points);

        MatchOutcome::Hit { note_index: window.note_index, points }
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn statistics(&self) -> SongStatistics {
        self.stats
    }

    pub fn keyboard(&self) -> &KeyboardState {
        &self.keyboard
    }

    /// Windows not yet hit or expired.
    pub fn open_windows(&self) -> &[NoteWindow] {
        &self.windows
    }
}
