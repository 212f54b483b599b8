//! Core IR types for keyfall.
//!
//! This crate defines the decoded MIDI event model, the per-track note
//! reconstruction and the translated note set. The format parser emits
//! these types and the timing engine consumes them.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod analysis;
mod event;
mod instrument;
mod note;
mod time;
pub mod track;

pub use analysis::{summarize, SongSummary};
pub use event::{ChannelEvent, ChannelMessage, EventKind, MetaEvent, RawEvent, SysexEvent, TextKind};
pub use instrument::Instrument;
pub use note::{Note, PlayState, TranslatedNote, TranslatedNoteSet};
pub use time::{
    pulses_to_scaled_us, tempo_to_bpm, Microseconds, Pulses, UsPerQuarter, DEFAULT_TEMPO,
    PERCUSSION_CHANNEL,
};
pub use track::Track;
