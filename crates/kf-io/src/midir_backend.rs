//! Hardware MIDI ports through `midir`.

use kf_ir::EventKind;
use log::{debug, info};
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};

use crate::queue::LiveInputProducer;
use crate::traits::{wire_bytes, DeviceError, OutputSink};

const CLIENT_NAME: &str = "keyfall";

/// Control change 123: all notes off.
const ALL_NOTES_OFF: u8 = 123;

pub fn output_port_names() -> Result<Vec<String>, DeviceError> {
    let out = MidiOutput::new(CLIENT_NAME).map_err(|e| DeviceError::Connect(e.to_string()))?;
    Ok(out
        .ports()
        .iter()
        .map(|p| out.port_name(p).unwrap_or_else(|_| "<unknown>".to_string()))
        .collect())
}

pub fn input_port_names() -> Result<Vec<String>, DeviceError> {
    let input = MidiInput::new(CLIENT_NAME).map_err(|e| DeviceError::Connect(e.to_string()))?;
    Ok(input
        .ports()
        .iter()
        .map(|p| input.port_name(p).unwrap_or_else(|_| "<unknown>".to_string()))
        .collect())
}

/// Output sink writing to a hardware or virtual port.
pub struct MidirOutput {
    conn: MidiOutputConnection,
}

impl MidirOutput {
    /// Connect to output port `index`.
    pub fn connect(index: usize) -> Result<Self, DeviceError> {
        let out = MidiOutput::new(CLIENT_NAME).map_err(|e| DeviceError::Connect(e.to_string()))?;
        let ports = out.ports();
        if ports.is_empty() {
            return Err(DeviceError::NoDevice);
        }
        let port = ports.get(index).ok_or(DeviceError::PortOutOfRange(index))?;
        let name = out.port_name(port).unwrap_or_else(|_| "<unknown>".to_string());
        let conn = out
            .connect(port, CLIENT_NAME)
            .map_err(|e| DeviceError::Connect(e.to_string()))?;
        info!("connected MIDI output {}: {}", index, name);
        Ok(Self { conn })
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), DeviceError> {
        self.conn.send(bytes).map_err(|e| DeviceError::Send(e.to_string()))
    }
}

impl OutputSink for MidirOutput {
    fn write(&mut self, event: &EventKind) -> Result<(), DeviceError> {
        match wire_bytes(event) {
            Some(bytes) => self.send(&bytes),
            None => Ok(()),
        }
    }

    fn reset(&mut self) -> Result<(), DeviceError> {
        for channel in 0..16u8 {
            self.send(&[0xB0 | channel, ALL_NOTES_OFF, 0])?;
        }
        Ok(())
    }
}

/// Live input from a hardware or virtual port.
///
/// The driver's callback thread owns the producer half of a live input
/// queue; dropping this closes the port.
pub struct MidirInput {
    _conn: MidiInputConnection<LiveInputProducer>,
}

impl MidirInput {
    /// Connect to input port `index`, feeding `producer`.
    pub fn connect(index: usize, producer: LiveInputProducer) -> Result<Self, DeviceError> {
        let mut input = MidiInput::new(CLIENT_NAME).map_err(|e| DeviceError::Connect(e.to_string()))?;
        input.ignore(Ignore::All);
        let ports = input.ports();
        if ports.is_empty() {
            return Err(DeviceError::NoDevice);
        }
        let port = ports.get(index).ok_or(DeviceError::PortOutOfRange(index))?;
        let name = input.port_name(port).unwrap_or_else(|_| "<unknown>".to_string());

        let conn = input
            .connect(
                port,
                CLIENT_NAME,
                |_stamp, bytes, producer: &mut LiveInputProducer| {
                    // a full queue is already logged by the producer
                    let _ = producer.push_bytes(bytes);
                },
                producer,
            )
            .map_err(|e| DeviceError::Connect(e.to_string()))?;
        debug!("connected MIDI input {}: {}", index, name);
        Ok(Self { _conn: conn })
    }
}
