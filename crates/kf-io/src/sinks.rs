//! Output sinks that need no device.

use std::sync::{Arc, Mutex};

use kf_ir::EventKind;
use log::{debug, trace};

use crate::traits::{wire_bytes, DeviceError, OutputSink};

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn write(&mut self, _event: &EventKind) -> Result<(), DeviceError> {
        Ok(())
    }

    fn reset(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }
}

/// Logs the wire bytes of every event at trace level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl OutputSink for LogSink {
    fn write(&mut self, event: &EventKind) -> Result<(), DeviceError> {
        if let Some(bytes) = wire_bytes(event) {
            trace!("out {:02X?}", bytes);
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<(), DeviceError> {
        debug!("out reset");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Recording {
    events: Vec<EventKind>,
    resets: usize,
}

/// Keeps every non-meta event written, for inspection.
///
/// Clones share one recording, so a test can hand one clone to the player
/// and read back through another.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    inner: Arc<Mutex<Recording>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EventKind> {
        self.inner.lock().map(|r| r.events.clone()).unwrap_or_default()
    }

    pub fn resets(&self) -> usize {
        self.inner.lock().map(|r| r.resets).unwrap_or(0)
    }

    pub fn clear(&self) {
        if let Ok(mut r) = self.inner.lock() {
            r.events.clear();
        }
    }
}

impl OutputSink for RecordingSink {
    fn write(&mut self, event: &EventKind) -> Result<(), DeviceError> {
        if matches!(event, EventKind::Meta(_)) {
            return Ok(());
        }
        let mut r = self.inner.lock().map_err(|e| DeviceError::Send(e.to_string()))?;
        r.events.push(event.clone());
        Ok(())
    }

    fn reset(&mut self) -> Result<(), DeviceError> {
        let mut r = self.inner.lock().map_err(|e| DeviceError::Send(e.to_string()))?;
        r.resets += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kf_ir::{ChannelEvent, ChannelMessage, MetaEvent, SysexEvent};

    #[test]
    fn recording_skips_meta_and_is_shared() {
        let reader = RecordingSink::new();
        let mut sink: Box<dyn OutputSink> = Box::new(reader.clone());

        let note = EventKind::Channel(ChannelEvent::new(0, ChannelMessage::NoteOn { note: 60, velocity: 1 }));
        sink.write(&note).unwrap();
        sink.write(&EventKind::Meta(MetaEvent::EndOfTrack)).unwrap();
        sink.write(&EventKind::Sysex(SysexEvent::Message(vec![0x7E, 0xF7]))).unwrap();
        sink.reset().unwrap();

        assert_eq!(reader.events().len(), 2);
        assert_eq!(reader.events()[0], note);
        assert_eq!(reader.resets(), 1);
        reader.clear();
        assert!(reader.events().is_empty());
    }

    #[test]
    fn wire_bytes_of_each_kind() {
        let cc = EventKind::Channel(ChannelEvent::new(2, ChannelMessage::ControlChange { controller: 7, value: 90 }));
        assert_eq!(wire_bytes(&cc), Some(vec![0xB2, 7, 90]));
        let sysex = EventKind::Sysex(SysexEvent::Message(vec![0x43, 0xF7]));
        assert_eq!(wire_bytes(&sysex), Some(vec![0xF0, 0x43, 0xF7]));
        assert_eq!(wire_bytes(&EventKind::Meta(MetaEvent::Tempo(1))), None);
    }
}
