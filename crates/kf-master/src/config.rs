//! Player settings, loaded from JSON.

use std::path::Path;

use kf_engine::DEFAULT_WINDOW_WIDTH_US;
use kf_ir::Microseconds;
use serde::Deserialize;

use crate::ControllerError;

/// Settings for one player session. Missing fields take their defaults.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Silence before the first note
    pub lead_in_us: Microseconds,
    /// Silence after the last event
    pub lead_out_us: Microseconds,
    /// Width of the window around each note in which a press counts
    pub window_width_us: Microseconds,
    /// Playback speed, 100 = as written
    pub speed_percent: u32,
    pub input_queue_capacity: usize,
    /// Tracks the user plays, by id
    pub user_tracks: Vec<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lead_in_us: 3_000_000,
            lead_out_us: 1_000_000,
            window_width_us: DEFAULT_WINDOW_WIDTH_US,
            speed_percent: 100,
            input_queue_capacity: 256,
            user_tracks: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ControllerError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_json_str(&text)?)
    }

    /// Scale a wall-clock delta by the playback speed.
    pub fn scale_delta(&self, delta_us: Microseconds) -> Microseconds {
        delta_us * self.speed_percent as Microseconds / 100
    }
}
