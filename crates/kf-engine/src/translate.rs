//! Projection of pulse-domain notes onto the playback clock.

use alloc::vec::Vec;
use kf_ir::{Microseconds, PlayState, Track, TranslatedNote, TranslatedNoteSet};

use crate::tempo::pulse_to_us;

/// Translate every note of `tracks` into one ordered set.
///
/// `offset` is added to each converted time, moving song time (0 at pulse
/// 0) onto the playback clock.
pub fn translate_notes(
    tracks: &[Track],
    tempo_track: &Track,
    ppqn: u16,
    offset: Microseconds,
) -> TranslatedNoteSet {
    let total: usize = tracks.iter().map(|t| t.notes().len()).sum();
    let mut notes = Vec::with_capacity(total);

    for track in tracks {
        for note in track.notes() {
            let start = pulse_to_us(tempo_track, ppqn, note.start).saturating_add(offset);
            let end = pulse_to_us(tempo_track, ppqn, note.end).saturating_add(offset);
            notes.push(TranslatedNote {
                note: note.note,
                channel: note.channel,
                velocity: note.velocity,
                track_id: note.track_id,
                start,
                end,
                state: PlayState::Unplayed,
            });
        }
    }

    TranslatedNoteSet::from_unsorted(notes)
}
