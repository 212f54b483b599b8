//! Timing engine for keyfall.
//!
//! Replays a decoded song forward in wall-clock time, projects its notes onto
//! the playback clock and scores live input against them.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod document;
mod event_queue;
pub mod matcher;
pub mod tempo;
mod translate;

pub use document::{Document, MAX_UPDATE_SLICE_US};
pub use event_queue::{EventQueue, PlaybackEvent};
pub use matcher::{
    KeyState, KeyboardState, MatchOutcome, NoteWindow, PerformanceMatcher, SongStatistics,
    DEFAULT_WINDOW_WIDTH_US,
};
pub use tempo::{extract_tempo, pulse_to_us, pulse_to_us_ceil, PulseClock, TempoExtraction};
pub use translate::translate_notes;
