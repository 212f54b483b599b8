//! Device traits and error types.

use kf_ir::{ChannelEvent, EventKind};
use thiserror::Error;

/// Error type for device operations.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no MIDI device available")]
    NoDevice,
    #[error("MIDI port {0} does not exist")]
    PortOutOfRange(usize),
    #[error("failed to connect: {0}")]
    Connect(String),
    #[error("failed to send: {0}")]
    Send(String),
    #[error("live input queue is full")]
    QueueFull,
}

/// Destination for replayed events.
pub trait OutputSink {
    /// Send one event. Meta events carry no device data and are skipped.
    fn write(&mut self, event: &EventKind) -> Result<(), DeviceError>;

    /// Silence every sounding note.
    fn reset(&mut self) -> Result<(), DeviceError>;
}

/// Non-blocking source of live channel events.
pub trait InputSource {
    fn has_pending(&self) -> bool;

    /// Next queued event, or `None` if nothing is waiting.
    fn read(&mut self) -> Option<ChannelEvent>;
}

/// Wire bytes for an event, or `None` for meta events.
pub fn wire_bytes(event: &EventKind) -> Option<Vec<u8>> {
    match event {
        EventKind::Channel(ev) => Some(ev.to_bytes().to_vec()),
        EventKind::Sysex(sysex) => Some(sysex.to_bytes()),
        EventKind::Meta(_) => None,
    }
}
