//! Main timing engine.
//!
//! A [`Document`] owns every track of a loaded song plus the synthesized
//! tempo track, and replays them forward in time with [`Document::update`].
//!
//! Two clocks are involved:
//! - *song time*: microseconds since pulse 0, derived from the tempo track
//! - *playback time*: microseconds since the last [`Document::reset`]; the
//!   first note sits exactly `lead_in` after 0
//!
//! Translated notes and [`Document::position_us`] use playback time.

use alloc::vec::Vec;
use kf_ir::{Microseconds, PlayState, Pulses, RawEvent, Track, TranslatedNoteSet};
use log::{debug, trace, warn};

use crate::event_queue::{EventQueue, PlaybackEvent};
use crate::tempo::{extract_tempo, pulse_to_us, pulse_to_us_ceil, PulseClock};
use crate::translate::translate_notes;

/// Longest span of time applied in one slice of an update.
pub const MAX_UPDATE_SLICE_US: Microseconds = 500_000;

/// A loaded song and its replay state.
#[derive(Clone, Debug)]
pub struct Document {
    /// Song tracks followed by the synthetic tempo track
    tracks: Vec<Track>,
    /// Pulses per quarter note
    ppqn: u16,
    clock: PulseClock,
    /// Song time of the first note
    dead_start_us: Microseconds,
    /// Song time of the last event of any track
    song_end_us: Microseconds,
    lead_in_us: Microseconds,
    lead_out_us: Microseconds,
    /// Lead timing the note set was last built for
    translated_for: Option<(Microseconds, Microseconds)>,
    /// Playback time
    position_us: Microseconds,
    /// Song time already forwarded to the tracks
    forwarded_us: Microseconds,
    /// Whether song time has reached 0 since the last reset
    started: bool,
    notes: TranslatedNoteSet,
    queue: EventQueue,
    /// Events crossed by the pre-roll advance in `reset`
    pending: Vec<PlaybackEvent>,
    tempo_duplicates: usize,
}

impl Document {
    /// Build a document from decoded track events.
    ///
    /// Tempo changes are moved out of the tracks into a tempo track
    /// appended at the end, so song track ids match file order and the
    /// tempo track id is `track_count() - 1`.
    pub fn new(ppqn: u16, tracks: Vec<Vec<RawEvent>>) -> Self {
        let extraction = extract_tempo(tracks);
        if extraction.duplicates > 0 {
            warn!("dropped {} tempo events sharing a pulse with an earlier one", extraction.duplicates);
        }

        let mut built: Vec<Track> = extraction
            .tracks
            .into_iter()
            .enumerate()
            .map(|(id, events)| Track::new(id, events))
            .collect();
        let tempo_id = built.len();
        built.push(Track::new(tempo_id, extraction.tempo_track));

        let unterminated: usize = built.iter().map(Track::unterminated_notes).sum();
        if unterminated > 0 {
            warn!("dropped {} notes with no release before end of track", unterminated);
        }

        let tempo_track = &built[tempo_id];
        let first_note = built
            .iter()
            .flat_map(|t| t.notes())
            .map(|n| n.start)
            .min();
        let dead_start_us = first_note
            .map(|p| pulse_to_us(tempo_track, ppqn, p))
            .unwrap_or(0);
        let last_pulse = built.iter().map(Track::last_pulse).max().unwrap_or(0);
        let song_end_us = pulse_to_us_ceil(tempo_track, ppqn, last_pulse);

        debug!(
            "document: {} tracks, ppqn {}, {} tempo changes, first note at {} us, end at {} us",
            tempo_id,
            ppqn,
            tempo_track.len(),
            dead_start_us,
            song_end_us
        );

        Self {
            tracks: built,
            ppqn,
            clock: PulseClock::new(ppqn),
            dead_start_us,
            song_end_us,
            lead_in_us: 0,
            lead_out_us: 0,
            translated_for: None,
            position_us: 0,
            forwarded_us: 0,
            started: false,
            notes: TranslatedNoteSet::new(),
            queue: EventQueue::new(),
            pending: Vec::new(),
            tempo_duplicates: extraction.duplicates,
        }
    }

    // --- Structure ---

    pub fn ppqn(&self) -> u16 {
        self.ppqn
    }

    /// All tracks, the tempo track last.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, track_id: usize) -> Option<&Track> {
        self.tracks.get(track_id)
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn tempo_track_id(&self) -> usize {
        self.tracks.len() - 1
    }

    pub fn tempo_track(&self) -> &Track {
        &self.tracks[self.tempo_track_id()]
    }

    /// Tempo events dropped at load for sharing a pulse with another.
    pub fn duplicate_tempo_events(&self) -> usize {
        self.tempo_duplicates
    }

    // --- Time conversion ---

    /// Song time of `pulse` in microseconds.
    pub fn pulse_to_us(&self, pulse: Pulses) -> Microseconds {
        pulse_to_us(self.tempo_track(), self.ppqn, pulse)
    }

    /// Playback time of `pulse` under the current lead timing.
    pub fn pulse_to_playback_us(&self, pulse: Pulses) -> Microseconds {
        self.pulse_to_us(pulse).saturating_add(self.playback_offset())
    }

    fn playback_offset(&self) -> Microseconds {
        self.lead_in_us - self.dead_start_us
    }

    // --- Lengths ---

    /// Song time of the first note.
    pub fn dead_start_us(&self) -> Microseconds {
        self.dead_start_us
    }

    /// From the first note to the last event.
    pub fn song_length_us(&self) -> Microseconds {
        (self.song_end_us - self.dead_start_us).max(0)
    }

    /// Song length plus lead-in and lead-out.
    pub fn total_length_us(&self) -> Microseconds {
        self.lead_in_us
            .saturating_add(self.song_length_us())
            .saturating_add(self.lead_out_us)
    }

    pub fn lead_in_us(&self) -> Microseconds {
        self.lead_in_us
    }

    pub fn lead_out_us(&self) -> Microseconds {
        self.lead_out_us
    }

    // --- Playback ---

    /// Playback time since the last reset.
    pub fn position_us(&self) -> Microseconds {
        self.position_us
    }

    /// Song time corresponding to the current position.
    pub fn song_time_us(&self) -> Microseconds {
        self.position_us.saturating_sub(self.playback_offset())
    }

    /// Fraction of the total length played, clamped to 1.0.
    pub fn percent_complete(&self) -> f64 {
        let total = self.total_length_us();
        if total <= 0 {
            return 1.0;
        }
        (self.position_us as f64 / total as f64).clamp(0.0, 1.0)
    }

    pub fn is_song_over(&self) -> bool {
        self.position_us >= self.total_length_us()
    }

    /// Translated notes of every track, for display and matching.
    pub fn notes(&self) -> &TranslatedNoteSet {
        &self.notes
    }

    /// Record whether the user played note `index` of [`Document::notes`].
    pub fn set_note_state(&mut self, index: usize, state: PlayState) {
        self.notes.set_state(index, state);
    }

    /// Rewind to the start with new lead timing.
    ///
    /// Every track cursor and the tempo are reset, then the song is
    /// advanced so the first note sits exactly `lead_in_us` ahead; events
    /// crossed by that advance are returned by the next [`Document::update`].
    /// The translated note set is rebuilt only when lead timing changed.
    pub fn reset(&mut self, lead_in_us: Microseconds, lead_out_us: Microseconds) {
        for track in &mut self.tracks {
            track.reset();
        }
        self.clock.reset();
        self.queue.clear();
        self.pending.clear();
        self.position_us = 0;
        self.forwarded_us = 0;
        self.started = false;
        self.lead_in_us = lead_in_us.max(0);
        self.lead_out_us = lead_out_us.max(0);

        let leads = (self.lead_in_us, self.lead_out_us);
        if self.translated_for != Some(leads) {
            self.notes = translate_notes(&self.tracks, self.tempo_track(), self.ppqn, self.playback_offset());
            self.translated_for = Some(leads);
            debug!("translated {} notes for lead-in {} us", self.notes.len(), self.lead_in_us);
        } else {
            self.notes.clear_states();
        }

        let pre_roll = self.dead_start_us - self.lead_in_us;
        if pre_roll >= 0 {
            let mut pending = Vec::new();
            self.forward_to(pre_roll, &mut pending);
            self.pending = pending;
        }
    }

    /// Advance playback by `delta_us` and return every event crossed.
    ///
    /// Events are ordered by pulse, then track id. Negative deltas are
    /// treated as zero.
    pub fn update(&mut self, delta_us: Microseconds) -> Vec<PlaybackEvent> {
        let mut out = core::mem::take(&mut self.pending);
        self.position_us = self.position_us.saturating_add(delta_us.max(0));

        // Nothing reaches the tracks while song time is still negative.
        let song_time = self.song_time_us();
        if song_time >= 0 {
            self.forward_to(song_time, &mut out);
        }
        out
    }

    /// Jump to `position_us` with the current lead timing.
    ///
    /// Events crossed on the way are discarded.
    pub fn go_to(&mut self, position_us: Microseconds) {
        self.reset(self.lead_in_us, self.lead_out_us);
        let _ = self.update(position_us);
    }

    /// Forward the tracks to song time `target`, in bounded slices.
    fn forward_to(&mut self, target: Microseconds, out: &mut Vec<PlaybackEvent>) {
        if !self.started {
            // events at pulse 0 are due as soon as song time reaches 0
            self.started = true;
            self.advance_slice(0, out);
        }

        let mut remaining = target - self.forwarded_us;
        if remaining <= 0 {
            return;
        }
        self.forwarded_us = target;

        while remaining > 0 {
            let slice = remaining.min(MAX_UPDATE_SLICE_US);
            remaining -= slice;
            self.advance_slice(slice as u64, out);
        }
    }

    /// Advance every track under the tempo in effect for this slice.
    fn advance_slice(&mut self, slice_us: u64, out: &mut Vec<PlaybackEvent>) {
        let tempo_id = self.tracks.len() - 1;
        let pulses = self.clock.advance(&self.tracks[tempo_id], slice_us);
        trace!("slice {} us -> {} pulses (tempo {})", slice_us, pulses, self.clock.tempo());

        for (track_id, track) in self.tracks.iter_mut().enumerate() {
            for index in track.advance(pulses) {
                if let Some((pulse, event)) = track.event_at(index) {
                    self.queue.push(PlaybackEvent { track_id, pulse, event: event.clone() });
                }
            }
        }
        self.queue.drain_into(out);
    }
}
