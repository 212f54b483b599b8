//! Integration tests for the SMF parser: a checked-in fixture plus files
//! assembled byte by byte.

use kf_engine::Document;
use kf_formats::{load_midi, parse_smf, FormatError, SmfFormat};
use kf_ir::{Instrument, MetaEvent};
use std::fs;
use std::path::PathBuf;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../tests/fixtures/midi")
}

fn fixture_bytes(name: &str) -> Vec<u8> {
    let path = fixtures_dir().join(name);
    fs::read(&path).unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
}

fn load_fixture(name: &str) -> Document {
    load_midi(&fixture_bytes(name)).unwrap_or_else(|e| panic!("Failed to parse {}: {}", name, e))
}

// --- Builder ---

struct SmfBuilder {
    format: u16,
    declared_tracks: Option<u16>,
    division: u16,
    chunks: Vec<Vec<u8>>,
}

impl SmfBuilder {
    fn new(format: u16, division: u16) -> Self {
        Self { format, declared_tracks: None, division, chunks: Vec::new() }
    }

    fn declare_tracks(mut self, n: u16) -> Self {
        self.declared_tracks = Some(n);
        self
    }

    fn chunk(mut self, id: &[u8; 4], body: &[u8]) -> Self {
        let mut c = id.to_vec();
        c.extend_from_slice(&(body.len() as u32).to_be_bytes());
        c.extend_from_slice(body);
        self.chunks.push(c);
        self
    }

    fn track(self, body: &[u8]) -> Self {
        self.chunk(b"MTrk", body)
    }

    fn build(&self) -> Vec<u8> {
        let tracks = self
            .declared_tracks
            .unwrap_or_else(|| self.chunks.iter().filter(|c| &c[..4] == b"MTrk").count() as u16);
        let mut out = b"MThd".to_vec();
        out.extend_from_slice(&6u32.to_be_bytes());
        out.extend_from_slice(&self.format.to_be_bytes());
        out.extend_from_slice(&tracks.to_be_bytes());
        out.extend_from_slice(&self.division.to_be_bytes());
        for c in &self.chunks {
            out.extend_from_slice(c);
        }
        out
    }
}

const END_OF_TRACK: [u8; 4] = [0x00, 0xFF, 0x2F, 0x00];

fn one_note_track() -> Vec<u8> {
    let mut t = vec![0x00, 0x90, 60, 100, 0x60, 0x80, 60, 0];
    t.extend_from_slice(&END_OF_TRACK);
    t
}

fn wrap_rmid(smf: &[u8]) -> Vec<u8> {
    let mut data = b"data".to_vec();
    data.extend_from_slice(&(smf.len() as u32).to_le_bytes());
    data.extend_from_slice(smf);
    if smf.len() % 2 == 1 {
        data.push(0);
    }
    let mut out = b"RIFF".to_vec();
    out.extend_from_slice(&((data.len() + 4) as u32).to_le_bytes());
    out.extend_from_slice(b"RMID");
    out.extend_from_slice(&data);
    out
}

// --- three_tracks.mid ---

#[test]
fn three_tracks_structure() {
    let doc = load_fixture("three_tracks.mid");
    assert_eq!(doc.ppqn(), 96);
    // three file tracks plus the synthesized tempo track
    assert_eq!(doc.track_count(), 4);
    assert_eq!(doc.tempo_track_id(), 3);

    let names: Vec<_> = doc.tracks()[..3].iter().map(|t| t.name.as_str().to_string()).collect();
    assert_eq!(names, ["Conductor", "Right Hand", "Drums"]);

    assert_eq!(doc.tracks()[1].instrument(), Instrument::Program(0));
    assert_eq!(doc.tracks()[2].instrument(), Instrument::Percussion);
    assert!(!doc.tracks()[0].has_notes());
}

#[test]
fn three_tracks_tempo_is_extracted() {
    let doc = load_fixture("three_tracks.mid");
    let tempo = doc.tempo_track();
    assert_eq!(tempo.len(), 2);
    assert_eq!(tempo.pulses(), &[0, 192]);

    let conductor_tempos = doc.tracks()[0]
        .events()
        .iter()
        .filter(|e| matches!(e.kind, kf_ir::EventKind::Meta(MetaEvent::Tempo(_))))
        .count();
    assert_eq!(conductor_tempos, 0);
    // end of track keeps its absolute pulse after the tempo event is removed
    assert_eq!(doc.tracks()[0].last_pulse(), 384);
}

#[test]
fn three_tracks_timing() {
    let mut doc = load_fixture("three_tracks.mid");
    assert_eq!(doc.dead_start_us(), 0);
    assert_eq!(doc.song_length_us(), 1_500_000);

    doc.reset(0, 0);
    let notes: Vec<_> = doc.notes().iter().map(|n| (n.start, n.note, n.end)).collect();
    assert_eq!(
        notes,
        vec![
            (0, 36, 250_000),
            (0, 60, 500_000),
            (500_000, 38, 750_000),
            (500_000, 64, 1_000_000),
            (1_000_000, 67, 1_250_000),
        ]
    );
}

#[test]
fn three_tracks_running_status_release() {
    let doc = load_fixture("three_tracks.mid");
    // the release of note 64 is written with running status after a Note-On
    let right_hand = &doc.tracks()[1];
    assert_eq!(right_hand.notes().len(), 3);
    assert_eq!(right_hand.notes()[1].note, 64);
    assert_eq!(right_hand.notes()[1].end, 192);
}

#[test]
fn rmid_container_is_unwrapped() {
    let plain = fixture_bytes("three_tracks.mid");
    let wrapped = parse_smf(&wrap_rmid(&plain)).unwrap();
    let direct = parse_smf(&plain).unwrap();
    assert_eq!(wrapped.tracks, direct.tracks);
    assert_eq!(wrapped.ppqn, 96);
}

// --- Built files ---

#[test]
fn format_0_single_track() {
    let file = parse_smf(&SmfBuilder::new(0, 480).track(&one_note_track()).build()).unwrap();
    assert_eq!(file.format, SmfFormat::SingleTrack);
    assert_eq!(file.ppqn, 480);
    assert_eq!(file.tracks.len(), 1);
    assert_eq!(file.event_count(), 3);
}

#[test]
fn alien_chunks_are_skipped() {
    let bytes = SmfBuilder::new(1, 96)
        .chunk(b"XFIH", &[1, 2, 3])
        .track(&one_note_track())
        .build();
    let file = parse_smf(&bytes).unwrap();
    assert_eq!(file.tracks.len(), 1);
}

#[test]
fn track_without_end_of_track_is_accepted() {
    let file = parse_smf(&SmfBuilder::new(1, 96).track(&[0x00, 0x90, 60, 100]).build()).unwrap();
    assert_eq!(file.tracks[0].len(), 1);
}

#[test]
fn integrity_anomalies_are_recovered() {
    let tempo = |t: u32| {
        let b = t.to_be_bytes();
        [0x00, 0xFF, 0x51, 0x03, b[1], b[2], b[3]]
    };
    let mut a = tempo(400_000).to_vec();
    a.extend_from_slice(&[0x00, 0x90, 60, 100]); // never released
    a.extend_from_slice(&END_OF_TRACK);
    let mut b = tempo(300_000).to_vec(); // same pulse as the first tempo
    b.extend_from_slice(&one_note_track());

    let doc = load_midi(&SmfBuilder::new(1, 96).track(&a).track(&b).build()).unwrap();
    assert_eq!(doc.duplicate_tempo_events(), 1);
    assert_eq!(doc.tracks()[0].unterminated_notes(), 1);
    assert!(!doc.tracks()[0].has_notes());
    assert_eq!(doc.tracks()[1].notes().len(), 1);
    // the first tempo seen wins
    assert_eq!(doc.pulse_to_us(96), 400_000);
}

// --- Errors ---

#[test]
fn error_unknown_header() {
    assert!(matches!(parse_smf(b"MTrk\0\0\0\x06\0\0\0\x01\0\x60"), Err(FormatError::UnknownHeader)));
    assert!(matches!(parse_smf(b"MT"), Err(FormatError::UnknownHeader)));
}

#[test]
fn error_bad_header_size() {
    let mut bytes = SmfBuilder::new(1, 96).track(&one_note_track()).build();
    bytes[7] = 4;
    assert!(matches!(parse_smf(&bytes), Err(FormatError::BadHeaderSize(4))));
}

#[test]
fn error_format_2() {
    let bytes = SmfBuilder::new(2, 96).track(&one_note_track()).build();
    assert!(matches!(parse_smf(&bytes), Err(FormatError::UnsupportedFormat2)));
}

#[test]
fn error_unknown_format() {
    let bytes = SmfBuilder::new(7, 96).track(&one_note_track()).build();
    assert!(matches!(parse_smf(&bytes), Err(FormatError::UnknownFormat(7))));
}

#[test]
fn error_format_0_with_two_tracks() {
    let bytes = SmfBuilder::new(0, 96)
        .track(&one_note_track())
        .track(&one_note_track())
        .build();
    assert!(matches!(parse_smf(&bytes), Err(FormatError::BadFormat0TrackCount(2))));
}

#[test]
fn error_smpte_division() {
    // -25 fps, 40 ticks per frame
    let bytes = SmfBuilder::new(1, 0xE728).track(&one_note_track()).build();
    assert!(matches!(parse_smf(&bytes), Err(FormatError::SmpteTimingUnsupported)));
}

#[test]
fn error_zero_division() {
    let bytes = SmfBuilder::new(1, 0).track(&one_note_track()).build();
    assert!(matches!(parse_smf(&bytes), Err(FormatError::ZeroDivision)));
}

#[test]
fn error_no_tracks() {
    let bytes = SmfBuilder::new(1, 96).declare_tracks(0).build();
    assert!(matches!(parse_smf(&bytes), Err(FormatError::NoTracks)));
}

#[test]
fn error_missing_track_header() {
    let bytes = SmfBuilder::new(1, 96).declare_tracks(2).track(&one_note_track()).build();
    assert!(matches!(parse_smf(&bytes), Err(FormatError::TrackHeaderTooShort)));
}

#[test]
fn error_garbage_track_header() {
    let mut bytes = SmfBuilder::new(1, 96).track(&one_note_track()).build();
    bytes[14] = 0x00;
    assert!(matches!(parse_smf(&bytes), Err(FormatError::BadTrackHeader)));
}

#[test]
fn error_track_longer_than_file() {
    let mut bytes = SmfBuilder::new(1, 96).track(&one_note_track()).build();
    bytes.truncate(bytes.len() - 2);
    assert!(matches!(parse_smf(&bytes), Err(FormatError::TrackTooShort)));
}

#[test]
fn error_event_truncated_inside_track() {
    let bytes = SmfBuilder::new(1, 96).track(&[0x00, 0x90, 60]).build();
    assert!(matches!(load_midi(&bytes), Err(FormatError::UnexpectedEof)));
}

#[test]
fn error_bad_riff() {
    let mut bytes = wrap_rmid(&SmfBuilder::new(1, 96).track(&one_note_track()).build());
    bytes[12..16].copy_from_slice(b"junk");
    assert!(matches!(parse_smf(&bytes), Err(FormatError::BadRiffContainer)));
}
