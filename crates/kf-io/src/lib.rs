//! MIDI device input and output for keyfall.

#[cfg(feature = "midir")]
mod midir_backend;
mod queue;
mod sinks;
mod traits;

#[cfg(feature = "midir")]
pub use midir_backend::{input_port_names, output_port_names, MidirInput, MidirOutput};
pub use queue::{live_input_queue, LiveInputConsumer, LiveInputProducer};
pub use sinks::{LogSink, NullSink, RecordingSink};
pub use traits::{wire_bytes, DeviceError, InputSource, OutputSink};
