//! Decoded MIDI events.
//!
//! A track is a list of [`RawEvent`]s, each carrying the delta in pulses
//! since the previous event of the same track. The payload is a sum type
//! over channel, meta and system-exclusive events.

use alloc::vec::Vec;
use arrayvec::ArrayVec;

use crate::time::{UsPerQuarter, PERCUSSION_CHANNEL};

/// One event of a track, as decoded from the file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawEvent {
    /// Pulses since the previous event in the same track
    pub delta: u32,
    /// What the event is
    pub kind: EventKind,
}

impl RawEvent {
    /// Create a new event.
    pub fn new(delta: u32, kind: EventKind) -> Self {
        Self { delta, kind }
    }

    /// The tempo carried by this event, if it is a tempo change.
    pub fn tempo(&self) -> Option<UsPerQuarter> {
        match self.kind {
            EventKind::Meta(MetaEvent::Tempo(t)) => Some(t),
            _ => None,
        }
    }

    /// The channel event carried by this event, if any.
    pub fn channel_event(&self) -> Option<&ChannelEvent> {
        match &self.kind {
            EventKind::Channel(ev) => Some(ev),
            _ => None,
        }
    }
}

/// Event payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// Voice or mode message addressed to one channel
    Channel(ChannelEvent),
    /// Non-playing file metadata (tempo, names, signatures, ...)
    Meta(MetaEvent),
    /// Opaque system-exclusive blob
    Sysex(SysexEvent),
}

/// A channel voice message and the channel it addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelEvent {
    /// Zero-based channel (0-15)
    pub channel: u8,
    pub message: ChannelMessage,
}

/// Channel voice messages, keyed by the status nibble.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelMessage {
    /// 0x8n
    NoteOff { note: u8, velocity: u8 },
    /// 0x9n (velocity 0 is a release, see [`ChannelEvent::is_note_off`])
    NoteOn { note: u8, velocity: u8 },
    /// 0xAn
    PolyPressure { note: u8, pressure: u8 },
    /// 0xBn
    ControlChange { controller: u8, value: u8 },
    /// 0xCn
    ProgramChange { program: u8 },
    /// 0xDn
    ChannelPressure { pressure: u8 },
    /// 0xEn, 14-bit value centered on 0x2000
    PitchBend { value: u16 },
}

impl ChannelMessage {
    /// Number of data bytes following a status byte with this high nibble.
    pub const fn data_len(status: u8) -> usize {
        match status & 0xF0 {
            0xC0 | 0xD0 => 1,
            _ => 2,
        }
    }

    /// Build a message from a status nibble and its data bytes.
    ///
    /// Returns `None` for a status that is not a channel message.
    pub fn from_parts(status: u8, d1: u8, d2: u8) -> Option<Self> {
        let d1 = d1 & 0x7F;
        let d2 = d2 & 0x7F;
        let msg = match status & 0xF0 {
            0x80 => Self::NoteOff { note: d1, velocity: d2 },
            0x90 => Self::NoteOn { note: d1, velocity: d2 },
            0xA0 => Self::PolyPressure { note: d1, pressure: d2 },
            0xB0 => Self::ControlChange { controller: d1, value: d2 },
            0xC0 => Self::ProgramChange { program: d1 },
            0xD0 => Self::ChannelPressure { pressure: d1 },
            0xE0 => Self::PitchBend { value: (d2 as u16) << 7 | d1 as u16 },
            _ => return None,
        };
        Some(msg)
    }

    const fn status_nibble(&self) -> u8 {
        match self {
            Self::NoteOff { .. } => 0x80,
            Self::NoteOn { .. } => 0x90,
            Self::PolyPressure { .. } => 0xA0,
            Self::ControlChange { .. } => 0xB0,
            Self::ProgramChange { .. } => 0xC0,
            Self::ChannelPressure { .. } => 0xD0,
            Self::PitchBend { .. } => 0xE0,
        }
    }
}

impl ChannelEvent {
    pub const fn new(channel: u8, message: ChannelMessage) -> Self {
        Self { channel: channel & 0x0F, message }
    }

    /// Decode a live wire message (status byte plus data bytes).
    ///
    /// Live input always carries a status byte; anything else is ignored.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;
        if !(0x80..0xF0).contains(&status) {
            return None;
        }
        let needed = ChannelMessage::data_len(status);
        if data.len() < needed {
            return None;
        }
        let d2 = if needed == 2 { data[1] } else { 0 };
        let message = ChannelMessage::from_parts(status, data[0], d2)?;
        Some(Self::new(status & 0x0F, message))
    }

    /// Encode to wire bytes with an explicit status byte.
    pub fn to_bytes(&self) -> ArrayVec<u8, 3> {
        let mut out = ArrayVec::new();
        out.push(self.message.status_nibble() | self.channel);
        match self.message {
            ChannelMessage::NoteOff { note, velocity } | ChannelMessage::NoteOn { note, velocity } => {
                out.push(note);
                out.push(velocity);
            }
            ChannelMessage::PolyPressure { note, pressure } => {
                out.push(note);
                out.push(pressure);
            }
            ChannelMessage::ControlChange { controller, value } => {
                out.push(controller);
                out.push(value);
            }
            ChannelMessage::ProgramChange { program } => out.push(program),
            ChannelMessage::ChannelPressure { pressure } => out.push(pressure),
            ChannelMessage::PitchBend { value } => {
                out.push((value & 0x7F) as u8);
                out.push((value >> 7 & 0x7F) as u8);
            }
        }
        out
    }

    /// Note number if this is a Note-On with non-zero velocity.
    pub fn note_on(&self) -> Option<u8> {
        match self.message {
            ChannelMessage::NoteOn { note, velocity } if velocity > 0 => Some(note),
            _ => None,
        }
    }

    /// True for Note-Off and for Note-On with zero velocity.
    pub fn is_note_off(&self) -> bool {
        matches!(
            self.message,
            ChannelMessage::NoteOff { .. } | ChannelMessage::NoteOn { velocity: 0, .. }
        )
    }

    /// Note number of any note message (on or off).
    pub fn note(&self) -> Option<u8> {
        match self.message {
            ChannelMessage::NoteOn { note, .. } | ChannelMessage::NoteOff { note, .. } => Some(note),
            _ => None,
        }
    }

    pub fn is_percussion(&self) -> bool {
        self.channel == PERCUSSION_CHANNEL
    }
}

/// Text-bearing meta event sub-types (0x01-0x09).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextKind {
    Text,
    Copyright,
    TrackName,
    InstrumentName,
    Lyric,
    Marker,
    CuePoint,
    ProgramName,
    DeviceName,
}

impl TextKind {
    pub fn from_meta_type(meta_type: u8) -> Option<Self> {
        Some(match meta_type {
            0x01 => Self::Text,
            0x02 => Self::Copyright,
            0x03 => Self::TrackName,
            0x04 => Self::InstrumentName,
            0x05 => Self::Lyric,
            0x06 => Self::Marker,
            0x07 => Self::CuePoint,
            0x08 => Self::ProgramName,
            0x09 => Self::DeviceName,
            _ => return None,
        })
    }
}

/// Meta events (status 0xFF), refined by their sub-type byte.
///
/// Known sub-types whose payload length does not match the standard layout
/// decode as [`MetaEvent::Unknown`] rather than failing the load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetaEvent {
    SequenceNumber(u16),
    Text { kind: TextKind, text: Vec<u8> },
    ChannelPrefix(u8),
    Port(u8),
    EndOfTrack,
    /// Microseconds per quarter note
    Tempo(UsPerQuarter),
    SmpteOffset { hours: u8, minutes: u8, seconds: u8, frames: u8, subframes: u8 },
    TimeSignature {
        numerator: u8,
        /// Denominator as a power of two (2 = quarter note)
        denominator_pow2: u8,
        clocks_per_click: u8,
        thirty_seconds_per_quarter: u8,
    },
    KeySignature { sharps: i8, minor: bool },
    SequencerSpecific(Vec<u8>),
    Unknown { meta_type: u8, data: Vec<u8> },
}

impl MetaEvent {
    /// Interpret a meta payload by sub-type.
    pub fn from_payload(meta_type: u8, data: &[u8]) -> Self {
        if let Some(kind) = TextKind::from_meta_type(meta_type) {
            return Self::Text { kind, text: data.to_vec() };
        }
        match (meta_type, data) {
            (0x00, [hi, lo]) => Self::SequenceNumber(u16::from_be_bytes([*hi, *lo])),
            (0x20, [ch]) => Self::ChannelPrefix(*ch),
            (0x21, [port]) => Self::Port(*port),
            (0x2F, []) => Self::EndOfTrack,
            (0x51, [a, b, c]) => Self::Tempo(u32::from_be_bytes([0, *a, *b, *c])),
            (0x54, [hours, minutes, seconds, frames, subframes]) => Self::SmpteOffset {
                hours: *hours,
                minutes: *minutes,
                seconds: *seconds,
                frames: *frames,
                subframes: *subframes,
            },
            (0x58, [nn, dd, cc, bb]) => Self::TimeSignature {
                numerator: *nn,
                denominator_pow2: *dd,
                clocks_per_click: *cc,
                thirty_seconds_per_quarter: *bb,
            },
            (0x59, [sf, mi]) => Self::KeySignature { sharps: *sf as i8, minor: *mi != 0 },
            (0x7F, _) => Self::SequencerSpecific(data.to_vec()),
            _ => Self::Unknown { meta_type, data: data.to_vec() },
        }
    }
}

/// System-exclusive events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SysexEvent {
    /// 0xF0: the bytes following the status, up to and including any 0xF7
    Message(Vec<u8>),
    /// 0xF7: escaped bytes sent verbatim (continuation packets, real-time)
    Escape(Vec<u8>),
}

impl SysexEvent {
    /// Wire bytes to hand to a device.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Message(data) => {
                let mut out = Vec::with_capacity(data.len() + 1);
                out.push(0xF0);
                out.extend_from_slice(data);
                out
            }
            Self::Escape(data) => data.clone(),
        }
    }
}
