//! Song summary: what a file contains, scanned from its tracks.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;
use core::fmt;

use crate::event::{EventKind, MetaEvent};
use crate::instrument::Instrument;
use crate::track::Track;

/// Summary of a song's tracks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SongSummary {
    pub tracks: usize,
    pub tracks_with_notes: usize,
    pub total_notes: usize,
    pub note_range: Option<(u8, u8)>,
    pub channels_used: BTreeSet<u8>,
    pub tempo_changes: usize,
    pub unterminated_notes: usize,
    pub instruments: Vec<Instrument>,
}

/// Summarize a list of tracks.
pub fn summarize(tracks: &[Track]) -> SongSummary {
    let mut summary = SongSummary {
        tracks: tracks.len(),
        tracks_with_notes: tracks.iter().filter(|t| t.has_notes()).count(),
        total_notes: 0,
        note_range: None,
        channels_used: BTreeSet::new(),
        tempo_changes: 0,
        unterminated_notes: 0,
        instruments: Vec::new(),
    };

    for track in tracks {
        summary.unterminated_notes += track.unterminated_notes();
        if track.has_notes() {
            summary.instruments.push(track.instrument());
        }
        for note in track.notes() {
            summary.total_notes += 1;
            summary.channels_used.insert(note.channel);
            summary.note_range = Some(match summary.note_range {
                Some((lo, hi)) => (lo.min(note.note), hi.max(note.note)),
                None => (note.note, note.note),
            });
        }
        summary.tempo_changes += track
            .events()
            .iter()
            .filter(|e| matches!(e.kind, EventKind::Meta(MetaEvent::Tempo(_))))
            .count();
    }

    summary
}

impl fmt::Display for SongSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tracks:   {} ({} with notes)", self.tracks, self.tracks_with_notes)?;
        writeln!(f, "Notes:    {} total", self.total_notes)?;
        if let Some((lo, hi)) = self.note_range {
            writeln!(f, "Range:    {} - {} (MIDI)", lo, hi)?;
        }
        let channels: Vec<_> = self.channels_used.iter().map(|c| c + 1).collect();
        writeln!(f, "Channels: {:?}", channels)?;
        writeln!(f, "Tempo changes: {}", self.tempo_changes)?;
        if self.unterminated_notes > 0 {
            writeln!(f, "Dropped:  {} unterminated notes", self.unterminated_notes)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ChannelEvent, ChannelMessage, RawEvent};
    use alloc::vec;

    fn ev(delta: u32, channel: u8, message: ChannelMessage) -> RawEvent {
        RawEvent::new(delta, EventKind::Channel(ChannelEvent::new(channel, message)))
    }

    #[test]
    fn summary_is_comparable_and_debuggable() {
        let tracks = [Track::new(0, vec![ev(0, 0, ChannelMessage::NoteOn { note: 60, velocity: 90 })])];
        let s = summarize(&tracks);
        assert_eq!(s, summarize(&tracks));
        assert!(alloc::format!("{:?}", s).starts_with("SongSummary"));
    }

    #[test]
    fn empty_song_has_nothing() {
        let s = summarize(&[]);
        assert_eq!(s.total_notes, 0);
        assert_eq!(s.note_range, None);
        assert!(s.channels_used.is_empty());
    }

    #[test]
    fn counts_notes_channels_and_tempo() {
        let melody = Track::new(0, vec![
            RawEvent::new(0, EventKind::Meta(MetaEvent::Tempo(400_000))),
            ev(0, 0, ChannelMessage::NoteOn { note: 48, velocity: 80 }),
            ev(10, 0, ChannelMessage::NoteOff { note: 48, velocity: 0 }),
            ev(0, 2, ChannelMessage::NoteOn { note: 72, velocity: 80 }),
            ev(10, 2, ChannelMessage::NoteOff { note: 72, velocity: 0 }),
            ev(0, 2, ChannelMessage::NoteOn { note: 74, velocity: 80 }),
        ]);
        let empty = Track::new(1, vec![]);

        let s = summarize(&[melody, empty]);
        assert_eq!(s.tracks, 2);
        assert_eq!(s.tracks_with_notes, 1);
        assert_eq!(s.total_notes, 2);
        assert_eq!(s.note_range, Some((48, 72)));
        assert_eq!(s.channels_used.len(), 2);
        assert_eq!(s.tempo_changes, 1);
        assert_eq!(s.unterminated_notes, 1);
        assert_eq!(s.instruments, vec![Instrument::Program(0)]);
    }
}
