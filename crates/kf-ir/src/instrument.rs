//! Instrument classification of a track.

use core::fmt;

use crate::event::{ChannelMessage, EventKind, RawEvent};

/// The instrument a track plays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Instrument {
    /// A single General MIDI program (0 when the track never declares one)
    Program(u8),
    /// Every note is on the percussion channel
    Percussion,
    /// Mixed percussion/melodic channels, or several distinct programs
    Various,
}

impl Instrument {
    /// Classify a track from its events.
    ///
    /// A track is percussion if every Note-On uses the percussion channel,
    /// various if it mixes percussion and melodic Note-Ons or declares more
    /// than one distinct program, and otherwise its single declared program
    /// (0 by default).
    pub fn classify(events: &[RawEvent]) -> Self {
        let mut uses_percussion = false;
        let mut uses_melodic = false;
        let mut program: Option<u8> = None;
        let mut several_programs = false;

        for event in events {
            let EventKind::Channel(ev) = &event.kind else { continue };
            match ev.message {
                ChannelMessage::NoteOn { velocity, .. } if velocity > 0 => {
                    if ev.is_percussion() {
                        uses_percussion = true;
                    } else {
                        uses_melodic = true;
                    }
                }
                ChannelMessage::ProgramChange { program: p } => match program {
                    Some(prev) if prev != p => several_programs = true,
                    _ => program = Some(p),
                },
                _ => {}
            }
        }

        match (uses_percussion, uses_melodic) {
            (true, false) => Self::Percussion,
            (true, true) => Self::Various,
            _ if several_programs => Self::Various,
            _ => Self::Program(program.unwrap_or(0)),
        }
    }

    /// Display name (General MIDI program names for single programs).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Program(p) => GM_PROGRAM_NAMES[(*p & 0x7F) as usize],
            Self::Percussion => "Percussion",
            Self::Various => "Various",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

const GM_PROGRAM_NAMES: [&str; 128] = [
    "Acoustic Grand Piano", "Bright Acoustic Piano", "Electric Grand Piano", "Honky-tonk Piano",
    "Electric Piano 1", "Electric Piano 2", "Harpsichord", "Clavinet",
    "Celesta", "Glockenspiel", "Music Box", "Vibraphone",
    "Marimba", "Xylophone", "Tubular Bells", "Dulcimer",
    "Drawbar Organ", "Percussive Organ", "Rock Organ", "Church Organ",
    "Reed Organ", "Accordion", "Harmonica", "Tango Accordion",
    "Acoustic Guitar (nylon)", "Acoustic Guitar (steel)", "Electric Guitar (jazz)", "Electric Guitar (clean)",
    "Electric Guitar (muted)", "Overdriven Guitar", "Distortion Guitar", "Guitar Harmonics",
    "Acoustic Bass", "Electric Bass (finger)", "Electric Bass (pick)", "Fretless Bass",
    "Slap Bass 1", "Slap Bass 2", "Synth Bass 1", "Synth Bass 2",
    "Violin", "Viola", "Cello", "Contrabass",
    "Tremolo Strings", "Pizzicato Strings", "Orchestral Harp", "Timpani",
    "String Ensemble 1", "String Ensemble 2", "Synth Strings 1", "Synth Strings 2",
    "Choir Aahs", "Voice Oohs", "Synth Choir", "Orchestra Hit",
    "Trumpet", "Trombone", "Tuba", "Muted Trumpet",
    "French Horn", "Brass Section", "Synth Brass 1", "Synth Brass 2",
    "Soprano Sax", "Alto Sax", "Tenor Sax", "Baritone Sax",
    "Oboe", "English Horn", "Bassoon", "Clarinet",
    "Piccolo", "Flute", "Recorder", "Pan Flute",
    "Blown Bottle", "Shakuhachi", "Whistle", "Ocarina",
    "Lead 1 (square)", "Lead 2 (sawtooth)", "Lead 3 (calliope)", "Lead 4 (chiff)",
    "Lead 5 (charang)", "Lead 6 (voice)", "Lead 7 (fifths)", "Lead 8 (bass + lead)",
    "Pad 1 (new age)", "Pad 2 (warm)", "Pad 3 (polysynth)", "Pad 4 (choir)",
    "Pad 5 (bowed)", "Pad 6 (metallic)", "Pad 7 (halo)", "Pad 8 (sweep)",
    "FX 1 (rain)", "FX 2 (soundtrack)", "FX 3 (crystal)", "FX 4 (atmosphere)",
    "FX 5 (brightness)", "FX 6 (goblins)", "FX 7 (echoes)", "FX 8 (sci-fi)",
    "Sitar", "Banjo", "Shamisen", "Koto",
    "Kalimba", "Bagpipe", "Fiddle", "Shanai",
    "Tinkle Bell", "Agogo", "Steel Drums", "Woodblock",
    "Taiko Drum", "Melodic Tom", "Synth Drum", "Reverse Cymbal",
    "Guitar Fret Noise", "Breath Noise", "Seashore", "Bird Tweet",
    "Telephone Ring", "Helicopter", "Applause", "Gunshot",
];
