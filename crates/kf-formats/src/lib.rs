//! Format parsers for keyfall.
//!
//! Parses Standard MIDI Files (optionally inside an RMID container) into
//! the IR and builds a playable [`Document`].

mod reader;
mod riff;
mod smf;

use kf_engine::Document;
use log::debug;
use thiserror::Error;

pub use riff::{is_riff, unwrap_rmid};
pub use smf::{decode_track, parse_smf, SmfFile, SmfFormat};

/// Error type for format parsing.
///
/// Every variant aborts the load; no partial document is returned.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("not a MIDI file: missing MThd header")]
    UnknownHeader,
    #[error("header chunk length {0} is invalid")]
    BadHeaderSize(u32),
    #[error("format 2 (independent tracks) is not supported")]
    UnsupportedFormat2,
    #[error("unknown file format {0}")]
    UnknownFormat(u16),
    #[error("format 0 file declares {0} tracks")]
    BadFormat0TrackCount(u16),
    #[error("file ends before a declared track header")]
    TrackHeaderTooShort,
    #[error("malformed track chunk header")]
    BadTrackHeader,
    #[error("track chunk runs past the end of the file")]
    TrackTooShort,
    #[error("SMPTE time division is not supported")]
    SmpteTimingUnsupported,
    #[error("time division of zero pulses per quarter note")]
    ZeroDivision,
    #[error("track data ends in the middle of an event")]
    UnexpectedEof,
    #[error("data byte with no running status")]
    MissingRunningStatus,
    #[error("invalid status byte {0:#04x} in track data")]
    InvalidStatus(u8),
    #[error("variable-length quantity longer than four bytes")]
    VlqTooLong,
    #[error("malformed RIFF/RMID container")]
    BadRiffContainer,
    #[error("file declares no tracks")]
    NoTracks,
}

/// Load a MIDI file from bytes.
pub fn load_midi(data: &[u8]) -> Result<Document, FormatError> {
    let file = parse_smf(data)?;
    let doc = Document::new(file.ppqn, file.tracks);
    debug!(
        "loaded document: {} notes over {} us",
        doc.tracks().iter().map(|t| t.notes().len()).sum::<usize>(),
        doc.song_length_us()
    );
    Ok(doc)
}
