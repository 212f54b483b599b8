//! RMID container: a Standard MIDI File wrapped in a RIFF `data` chunk.
//!
//! RIFF sizes are little-endian, unlike the SMF chunks they carry.

use binrw::io::Cursor;
use binrw::{BinRead, BinReaderExt};

use crate::FormatError;

#[derive(BinRead, Debug)]
#[br(little)]
struct RiffChunk {
    id: [u8; 4],
    size: u32,
}

pub fn is_riff(data: &[u8]) -> bool {
    data.starts_with(b"RIFF")
}

fn read_chunk(data: &[u8]) -> Result<RiffChunk, FormatError> {
    Cursor::new(data)
        .read_le::<RiffChunk>()
        .map_err(|_| FormatError::BadRiffContainer)
}

/// Return the body of the `data` sub-chunk of an `RMID` form.
///
/// Sub-chunks before it are skipped, honoring the RIFF pad byte after
/// odd-sized bodies.
pub fn unwrap_rmid(data: &[u8]) -> Result<&[u8], FormatError> {
    if data.len() < 12 || &data[8..12] != b"RMID" {
        return Err(FormatError::BadRiffContainer);
    }
    let outer = read_chunk(data)?;
    let form_end = (outer.size as usize).saturating_add(8).min(data.len());

    let mut pos = 12;
    while pos + 8 <= form_end {
        let chunk = read_chunk(&data[pos..])?;
        let body_start = pos + 8;
        let body_end = body_start
            .checked_add(chunk.size as usize)
            .filter(|&end| end <= data.len())
            .ok_or(FormatError::BadRiffContainer)?;

        if &chunk.id == b"data" {
            return Ok(&data[body_start..body_end]);
        }
        pos = body_end + (chunk.size as usize & 1);
    }
    Err(FormatError::BadRiffContainer)
}
