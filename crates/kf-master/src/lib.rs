//! Headless controller for keyfall.
//!
//! Owns the loaded document, the output sink and the live input source, and
//! drives them one step at a time. The CLI and any embedding host share
//! this API.

mod config;

use kf_engine::PerformanceMatcher;
use kf_io::NullSink;
use kf_ir::{ChannelEvent, EventKind, Microseconds, PlayState, TranslatedNoteSet};
use log::{debug, info, trace, warn};
use std::path::Path;
use thiserror::Error;

// Re-export common types so callers don't need the lower crates directly.
pub use config::Config;
pub use kf_engine::{Document, KeyState, KeyboardState, MatchOutcome, PlaybackEvent, SongStatistics};
pub use kf_formats::FormatError;
pub use kf_io::{live_input_queue, DeviceError, InputSource, LiveInputProducer, LogSink, OutputSink};
#[cfg(feature = "midir")]
pub use kf_io::{input_port_names, output_port_names, MidirInput, MidirOutput};
pub use kf_ir::{summarize, Instrument, SongSummary, Track};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("no song loaded")]
    NoDocument,
    #[error("track {0} does not exist")]
    NoSuchTrack(usize),
}

/// How a track takes part in playback.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TrackMode {
    /// Sent to the output sink
    #[default]
    Automatic,
    /// Scored; live input is echoed to the sink in its place
    UserPlays,
    /// Scored; nothing is sent
    UserPlaysSilently,
    /// Muted
    NotPlayed,
}

impl TrackMode {
    pub fn is_scored(self) -> bool {
        matches!(self, Self::UserPlays | Self::UserPlaysSilently)
    }
}

/// Headless player: owns a song and steps its playback.
pub struct Controller {
    config: Config,
    document: Option<Document>,
    modes: Vec<TrackMode>,
    matcher: PerformanceMatcher,
    sink: Box<dyn OutputSink>,
    input: Option<Box<dyn InputSource>>,
}

impl Controller {
    pub fn new(config: Config) -> Self {
        let matcher = PerformanceMatcher::new(config.window_width_us);
        Self {
            config,
            document: None,
            modes: Vec::new(),
            matcher,
            sink: Box::new(NullSink),
            input: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_sink(&mut self, sink: Box<dyn OutputSink>) {
        self.sink = sink;
    }

    pub fn set_input(&mut self, input: Box<dyn InputSource>) {
        self.input = Some(input);
    }

    // --- Song management ---

    /// Load a song from bytes and rewind to its start.
    ///
    /// Tracks listed in the config's `user_tracks` are marked user-played.
    pub fn load(&mut self, data: &[u8]) -> Result<(), ControllerError> {
        let document = kf_formats::load_midi(data)?;
        self.modes = vec![TrackMode::Automatic; document.track_count()];
        self.document = Some(document);

        for track_id in self.config.user_tracks.clone() {
            if let Err(e) = self.mark_track_user_playable(track_id) {
                warn!("ignoring user track from config: {}", e);
            }
        }
        self.reset()
    }

    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<(), ControllerError> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        self.load(&data)?;
        info!("loaded {}", path.display());
        Ok(())
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn tracks(&self) -> &[Track] {
        self.document.as_ref().map(Document::tracks).unwrap_or(&[])
    }

    // --- Track modes ---

    pub fn track_mode(&self, track_id: usize) -> Option<TrackMode> {
        self.modes.get(track_id).copied()
    }

    /// Change a track's mode; takes effect for scoring at the next reset.
    pub fn set_track_mode(&mut self, track_id: usize, mode: TrackMode) -> Result<(), ControllerError> {
        let slot = self.modes.get_mut(track_id).ok_or(ControllerError::NoSuchTrack(track_id))?;
        *slot = mode;
        Ok(())
    }

    pub fn mark_track_user_playable(&mut self, track_id: usize) -> Result<(), ControllerError> {
        self.set_track_mode(track_id, TrackMode::UserPlays)
    }

    // --- Playback ---

    /// Rewind with the configured lead timing and start a new playthrough.
    ///
    /// Builds a note window for every note of a scored track and silences
    /// the sink.
    pub fn reset(&mut self) -> Result<(), ControllerError> {
        let doc = self.document.as_mut().ok_or(ControllerError::NoDocument)?;
        doc.reset(self.config.lead_in_us, self.config.lead_out_us);
        self.start_playthrough(0)
    }

    /// Jump to a playback position and start a new playthrough from there.
    ///
    /// Scores and note states are cleared. Notes whose window closed before
    /// the target are left out rather than counted as misses.
    pub fn go_to(&mut self, position_us: Microseconds) -> Result<(), ControllerError> {
        let doc = self.document.as_mut().ok_or(ControllerError::NoDocument)?;
        doc.go_to(position_us);
        let now = doc.position_us();
        self.start_playthrough(now)
    }

    fn start_playthrough(&mut self, from_us: Microseconds) -> Result<(), ControllerError> {
        let doc = self.document.as_ref().ok_or(ControllerError::NoDocument)?;
        let modes = &self.modes;
        self.matcher = PerformanceMatcher::new(self.config.window_width_us);
        self.matcher
            .start(doc.notes(), |track| modes.get(track).is_some_and(|m| m.is_scored()));
        let skipped = self.matcher.skip_to(from_us);
        debug!(
            "playthrough started at {} us: {} of {} notes playable, {} skipped",
            from_us,
            self.matcher.statistics().playable_notes,
            self.matcher.statistics().total_notes,
            skipped
        );

        self.sink.reset()?;
        Ok(())
    }

    /// Advance by a wall-clock delta.
    ///
    /// Pending live input is matched at the current position first. The
    /// delta is then scaled by the playback speed, the document advanced,
    /// windows that ended are counted as misses, and events of automatic
    /// tracks are written to the sink. Returns every crossed event.
    pub fn step(&mut self, delta_us: Microseconds) -> Result<Vec<PlaybackEvent>, ControllerError> {
        if self.document.is_none() {
            return Err(ControllerError::NoDocument);
        }

        while let Some(event) = self.input.as_mut().and_then(|input| input.read()) {
            self.feed_live_event(event);
        }

        let scaled = self.config.scale_delta(delta_us);
        let doc = self.document.as_mut().ok_or(ControllerError::NoDocument)?;
        let events = doc.update(scaled);
        let now = doc.position_us();
        for index in self.matcher.expire(now) {
            doc.set_note_state(index, PlayState::Missed);
        }

        for ev in &events {
            if self.modes.get(ev.track_id) == Some(&TrackMode::Automatic) {
                self.sink.write(&ev.event.kind)?;
            }
        }
        trace!("step {} us -> {} events at {} us", scaled, events.len(), now);
        Ok(events)
    }

    /// Score one live event at the current position.
    ///
    /// With any track in [`TrackMode::UserPlays`] the event is also echoed
    /// to the sink. Never fails; a sink error is only logged.
    pub fn feed_live_event(&mut self, event: ChannelEvent) -> MatchOutcome {
        let Some(doc) = self.document.as_mut() else {
            return MatchOutcome::Ignored;
        };
        let now = doc.position_us();
        for index in self.matcher.expire(now) {
            doc.set_note_state(index, PlayState::Missed);
        }

        let outcome = self.matcher.feed(&event, now);
        if let MatchOutcome::Hit { note_index, .. } = outcome {
            doc.set_note_state(note_index, PlayState::Hit);
        }

        if self.modes.contains(&TrackMode::UserPlays) {
            if let Err(e) = self.sink.write(&EventKind::Channel(event)) {
                warn!("failed to echo live input: {}", e);
            }
        }
        outcome
    }

    // --- Queries ---

    pub fn statistics(&self) -> SongStatistics {
        self.matcher.statistics()
    }

    pub fn keyboard(&self) -> &KeyboardState {
        self.matcher.keyboard()
    }

    pub fn combo(&self) -> u32 {
        self.matcher.combo()
    }

    pub fn position_us(&self) -> Microseconds {
        self.document.as_ref().map_or(0, Document::position_us)
    }

    pub fn percent_complete(&self) -> f64 {
        self.document.as_ref().map_or(0.0, Document::percent_complete)
    }

    pub fn is_song_over(&self) -> bool {
        self.document.as_ref().map_or(true, Document::is_song_over)
    }

    pub fn notes(&self) -> Option<&TranslatedNoteSet> {
        self.document.as_ref().map(Document::notes)
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
