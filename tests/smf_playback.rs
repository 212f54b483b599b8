//! End-to-end playback and scoring of the checked-in MIDI fixture.

use kf_engine::{Document, MatchOutcome, PlaybackEvent};
use kf_formats::load_midi;
use kf_io::{live_input_queue, RecordingSink};
use kf_ir::{ChannelEvent, ChannelMessage, EventKind, PlayState};
use kf_master::{Config, Controller, TrackMode};
use std::fs;
use std::path::PathBuf;

fn fixture(name: &str) -> Vec<u8> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/midi").join(name);
    fs::read(&path).unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
}

fn load_doc() -> Document {
    load_midi(&fixture("three_tracks.mid")).unwrap()
}

fn play_through(doc: &mut Document, step: i64) -> Vec<PlaybackEvent> {
    let mut out = Vec::new();
    loop {
        out.extend(doc.update(step));
        if doc.is_song_over() {
            return out;
        }
    }
}

fn press(note: u8) -> ChannelEvent {
    ChannelEvent::new(0, ChannelMessage::NoteOn { note, velocity: 100 })
}

#[test]
fn step_size_does_not_change_the_event_stream() {
    let mut reference = load_doc();
    reference.reset(0, 0);
    let expected = play_through(&mut reference, 2_000_000);

    for step in [3, 997, 16_667, 333_333, 499_999, 500_001] {
        let mut doc = load_doc();
        doc.reset(0, 0);
        assert_eq!(play_through(&mut doc, step), expected, "step {}", step);
    }
}

#[test]
fn every_event_is_emitted_once_in_pulse_order() {
    let mut doc = load_doc();
    doc.reset(1_000_000, 500_000);
    let events = play_through(&mut doc, 10_000);

    let total: usize = doc.tracks().iter().map(|t| t.len()).sum();
    assert_eq!(events.len(), total);
    assert!(events.windows(2).all(|w| (w[0].pulse, w[0].track_id) <= (w[1].pulse, w[1].track_id)));
}

#[test]
fn note_on_arrives_when_its_translated_time_is_reached() {
    let mut doc = load_doc();
    doc.reset(2_000_000, 0);
    let note_67 = doc.notes().iter().find(|n| n.note == 67).copied().unwrap();
    assert_eq!(note_67.start, 3_000_000);

    let mut crossed_at = None;
    while !doc.is_song_over() {
        let events = doc.update(5_000);
        let hit = events.iter().any(|e| {
            matches!(e.event.kind, EventKind::Channel(ev) if ev.note_on() == Some(67))
        });
        if hit {
            crossed_at = Some(doc.position_us());
        }
    }
    assert_eq!(crossed_at, Some(3_000_000));
}

#[test]
fn reset_rewinds_for_a_second_pass() {
    let mut doc = load_doc();
    doc.reset(500_000, 500_000);
    let first = play_through(&mut doc, 40_000);
    assert_eq!(doc.percent_complete(), 1.0);

    doc.reset(500_000, 500_000);
    assert_eq!(doc.position_us(), 0);
    assert_eq!(doc.percent_complete(), 0.0);
    assert_eq!(play_through(&mut doc, 40_000), first);
}

#[test]
fn perfect_playthrough_scores_every_note() {
    let config = Config { lead_in_us: 1_000_000, lead_out_us: 0, user_tracks: vec![1], ..Config::default() };
    let mut ctrl = Controller::new(config);
    ctrl.load(&fixture("three_tracks.mid")).unwrap();

    let starts: Vec<_> = ctrl
        .notes()
        .unwrap()
        .iter()
        .filter(|n| n.track_id == 1)
        .map(|n| (n.start, n.note))
        .collect();
    assert_eq!(starts, vec![(1_000_000, 60), (1_500_000, 64), (2_000_000, 67)]);

    let mut pending = starts.iter().peekable();
    while !ctrl.is_song_over() {
        if let Some(&&(start, note)) = pending.peek() {
            if ctrl.position_us() >= start {
                assert!(matches!(ctrl.feed_live_event(press(note)), MatchOutcome::Hit { .. }));
                pending.next();
            }
        }
        ctrl.step(10_000).unwrap();
    }

    let stats = ctrl.statistics();
    assert_eq!(stats.playable_notes, 3);
    assert_eq!(stats.notes_hit, 3);
    assert_eq!(stats.notes_missed, 0);
    assert_eq!(stats.longest_combo, 3);
    assert!((stats.score - (100.0 + 110.0 + 120.0)).abs() < 1e-9);
    assert!(ctrl
        .notes()
        .unwrap()
        .iter()
        .filter(|n| n.track_id == 1)
        .all(|n| n.state == PlayState::Hit));
}

#[test]
fn idle_player_misses_everything() {
    let config = Config { lead_in_us: 0, lead_out_us: 0, user_tracks: vec![1, 2], ..Config::default() };
    let mut ctrl = Controller::new(config);
    ctrl.load(&fixture("three_tracks.mid")).unwrap();
    while !ctrl.is_song_over() {
        ctrl.step(50_000).unwrap();
    }
    // the last window closes 160 ms after the last note starts, inside the song
    let stats = ctrl.statistics();
    assert_eq!(stats.playable_notes, 5);
    assert_eq!(stats.notes_missed, 5);
    assert_eq!(stats.score, 0.0);
}

#[test]
fn queued_input_echoes_for_user_tracks() {
    let sink = RecordingSink::new();
    let config = Config { lead_in_us: 0, lead_out_us: 0, ..Config::default() };
    let mut ctrl = Controller::new(config);
    ctrl.set_sink(Box::new(sink.clone()));
    ctrl.load(&fixture("three_tracks.mid")).unwrap();
    ctrl.set_track_mode(1, TrackMode::UserPlays).unwrap();
    ctrl.set_track_mode(2, TrackMode::NotPlayed).unwrap();
    ctrl.reset().unwrap();

    let (mut tx, rx) = live_input_queue(4);
    ctrl.set_input(Box::new(rx));
    tx.push(press(60)).unwrap();
    ctrl.step(10_000).unwrap();

    assert_eq!(ctrl.statistics().notes_hit, 1);
    // the echoed press; the conductor track only carries meta events
    assert_eq!(sink.events(), vec![EventKind::Channel(press(60))]);
}
