//! Standard MIDI File decoder.
//!
//! Reads the `MThd` header and every `MTrk` chunk into per-track event lists.
//! All chunk fields are big-endian.

use binrw::io::Cursor;
use binrw::{BinRead, BinReaderExt};
use kf_ir::{ChannelEvent, ChannelMessage, EventKind, MetaEvent, RawEvent, SysexEvent};
use log::debug;

use crate::reader::ChunkReader;
use crate::riff;
use crate::FormatError;

/// Size of a chunk id plus its length field.
const CHUNK_HEADER_LEN: usize = 8;
/// Minimum body length of the `MThd` chunk.
const HEADER_BODY_LEN: u32 = 6;

/// Chunk id and body length.
#[derive(BinRead, Debug)]
#[br(big)]
struct ChunkHeader {
    id: [u8; 4],
    length: u32,
}

/// Body of the `MThd` chunk.
#[derive(BinRead, Debug)]
#[br(big)]
struct HeaderBody {
    format: u16,
    tracks: u16,
    division: u16,
}

/// Track layout declared in the header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SmfFormat {
    /// One multi-channel track
    SingleTrack,
    /// Simultaneous tracks sharing one timeline
    Parallel,
}

/// A decoded file, before tempo extraction.
#[derive(Clone, Debug)]
pub struct SmfFile {
    pub format: SmfFormat,
    /// Pulses per quarter note
    pub ppqn: u16,
    pub tracks: Vec<Vec<RawEvent>>,
}

impl SmfFile {
    pub fn event_count(&self) -> usize {
        self.tracks.iter().map(Vec::len).sum()
    }
}

fn read_chunk_header(data: &[u8]) -> Result<ChunkHeader, FormatError> {
    Cursor::new(data)
        .read_be::<ChunkHeader>()
        .map_err(|_| FormatError::UnexpectedEof)
}

/// Decode a Standard MIDI File, unwrapping an RMID container first.
pub fn parse_smf(data: &[u8]) -> Result<SmfFile, FormatError> {
    if riff::is_riff(data) {
        let inner = riff::unwrap_rmid(data)?;
        debug!("unwrapped RMID container, {} byte SMF inside", inner.len());
        return parse_smf(inner);
    }

    if data.len() < CHUNK_HEADER_LEN || &data[..4] != b"MThd" {
        return Err(FormatError::UnknownHeader);
    }
    let header = read_chunk_header(data)?;
    if header.length < HEADER_BODY_LEN {
        return Err(FormatError::BadHeaderSize(header.length));
    }
    let body_end = CHUNK_HEADER_LEN
        .checked_add(header.length as usize)
        .filter(|&end| end <= data.len())
        .ok_or(FormatError::BadHeaderSize(header.length))?;

    let body: HeaderBody = Cursor::new(&data[CHUNK_HEADER_LEN..body_end])
        .read_be()
        .map_err(|_| FormatError::BadHeaderSize(header.length))?;

    let format = match body.format {
        0 => SmfFormat::SingleTrack,
        1 => SmfFormat::Parallel,
        2 => return Err(FormatError::UnsupportedFormat2),
        other => return Err(FormatError::UnknownFormat(other)),
    };
    if body.tracks == 0 {
        return Err(FormatError::NoTracks);
    }
    if format == SmfFormat::SingleTrack && body.tracks != 1 {
        return Err(FormatError::BadFormat0TrackCount(body.tracks));
    }
    if body.division & 0x8000 != 0 {
        return Err(FormatError::SmpteTimingUnsupported);
    }
    if body.division == 0 {
        return Err(FormatError::ZeroDivision);
    }

    let mut tracks = Vec::with_capacity(body.tracks as usize);
    let mut pos = body_end;
    while tracks.len() < body.tracks as usize {
        let rest = &data[pos..];
        if rest.len() < CHUNK_HEADER_LEN {
            return Err(FormatError::TrackHeaderTooShort);
        }
        let chunk = read_chunk_header(rest)?;
        if !chunk.id.iter().all(u8::is_ascii_alphanumeric) {
            return Err(FormatError::BadTrackHeader);
        }

        let len = chunk.length as usize;
        if rest.len() - CHUNK_HEADER_LEN < len {
            return Err(FormatError::TrackTooShort);
        }
        let body = &rest[CHUNK_HEADER_LEN..CHUNK_HEADER_LEN + len];
        pos += CHUNK_HEADER_LEN + len;

        if &chunk.id != b"MTrk" {
            debug!("skipping {} byte chunk {:?}", len, String::from_utf8_lossy(&chunk.id));
            continue;
        }
        tracks.push(decode_track(body)?);
    }

    let file = SmfFile { format, ppqn: body.division, tracks };
    debug!(
        "parsed SMF: {:?}, {} tracks, ppqn {}, {} events",
        file.format,
        file.tracks.len(),
        file.ppqn,
        file.event_count()
    );
    Ok(file)
}

/// Decode the events of one `MTrk` body.
///
/// Decoding stops at the first end-of-track event; anything after it is
/// ignored. A body that ends without one is accepted as is.
pub fn decode_track(data: &[u8]) -> Result<Vec<RawEvent>, FormatError> {
    let mut r = ChunkReader::new(data);
    let mut events = Vec::new();
    let mut running_status: Option<u8> = None;

    while !r.is_empty() {
        let delta = r.read_vlq()?;
        let kind = decode_event(&mut r, &mut running_status)?;
        let end = matches!(kind, EventKind::Meta(MetaEvent::EndOfTrack));
        events.push(RawEvent::new(delta, kind));
        if end {
            break;
        }
    }
    Ok(events)
}

/// Decode one event after its delta time.
///
/// Only channel messages set the running status. Meta and sysex events
/// leave it untouched.
fn decode_event(r: &mut ChunkReader, running_status: &mut Option<u8>) -> Result<EventKind, FormatError> {
    let first = r.peek_u8()?;

    let status = if first < 0x80 {
        running_status.ok_or(FormatError::MissingRunningStatus)?
    } else {
        r.read_u8()?
    };

    match status {
        0x80..=0xEF => {
            *running_status = Some(status);
            let d1 = r.read_u8()?;
            let d2 = if ChannelMessage::data_len(status) == 2 { r.read_u8()? } else { 0 };
            let message = ChannelMessage::from_parts(status, d1, d2).ok_or(FormatError::InvalidStatus(status))?;
            Ok(EventKind::Channel(ChannelEvent::new(status & 0x0F, message)))
        }
        0xFF => {
            let meta_type = r.read_u8()?;
            let payload = r.read_vlq_bytes()?;
            Ok(EventKind::Meta(MetaEvent::from_payload(meta_type, payload)))
        }
        0xF0 => Ok(EventKind::Sysex(SysexEvent::Message(r.read_vlq_bytes()?.to_vec()))),
        0xF7 => Ok(EventKind::Sysex(SysexEvent::Escape(r.read_vlq_bytes()?.to_vec()))),
        other => Err(FormatError::InvalidStatus(other)),
    }
}
