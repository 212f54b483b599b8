//! Bounded queue between a device callback thread and the playback loop.
//!
//! The producer half is moved to the driver's thread; the consumer half
//! stays with the host and is drained without blocking at each step.

use kf_ir::ChannelEvent;
use log::warn;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::traits::{DeviceError, InputSource};

/// Create a live input queue holding at most `capacity` events.
pub fn live_input_queue(capacity: usize) -> (LiveInputProducer, LiveInputConsumer) {
    let rb = HeapRb::<ChannelEvent>::new(capacity.max(1));
    let (producer, consumer) = rb.split();
    (LiveInputProducer { producer, dropped: 0 }, LiveInputConsumer { consumer })
}

/// Writing half, owned by the input driver.
pub struct LiveInputProducer {
    producer: HeapProd<ChannelEvent>,
    dropped: usize,
}

impl LiveInputProducer {
    /// Queue an event; a full queue drops it.
    pub fn push(&mut self, event: ChannelEvent) -> Result<(), DeviceError> {
        if self.producer.try_push(event).is_err() {
            self.dropped += 1;
            warn!("live input queue full, dropped {:?} ({} total)", event, self.dropped);
            return Err(DeviceError::QueueFull);
        }
        Ok(())
    }

    /// Decode wire bytes and queue them; non-channel messages are ignored.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Result<(), DeviceError> {
        match ChannelEvent::from_bytes(bytes) {
            Some(event) => self.push(event),
            None => Ok(()),
        }
    }

    /// Events lost to a full queue so far.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

/// Reading half, drained by the host.
pub struct LiveInputConsumer {
    consumer: HeapCons<ChannelEvent>,
}

impl InputSource for LiveInputConsumer {
    fn has_pending(&self) -> bool {
        !self.consumer.is_empty()
    }

    fn read(&mut self) -> Option<ChannelEvent> {
        self.consumer.try_pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kf_ir::ChannelMessage;

    fn press(note: u8) -> ChannelEvent {
        ChannelEvent::new(0, ChannelMessage::NoteOn { note, velocity: 80 })
    }

    #[test]
    fn events_come_out_in_order() {
        let (mut tx, mut rx) = live_input_queue(4);
        assert!(!rx.has_pending());
        tx.push(press(60)).unwrap();
        tx.push(press(62)).unwrap();
        assert!(rx.has_pending());
        assert_eq!(rx.read(), Some(press(60)));
        assert_eq!(rx.read(), Some(press(62)));
        assert_eq!(rx.read(), None);
    }

    #[test]
    fn full_queue_drops_newest() {
        let (mut tx, mut rx) = live_input_queue(2);
        tx.push(press(1)).unwrap();
        tx.push(press(2)).unwrap();
        assert!(matches!(tx.push(press(3)), Err(DeviceError::QueueFull)));
        assert_eq!(tx.dropped(), 1);
        assert_eq!(rx.read(), Some(press(1)));
        assert_eq!(rx.read(), Some(press(2)));
        assert!(!rx.has_pending());
    }

    #[test]
    fn wire_bytes_are_decoded() {
        let (mut tx, mut rx) = live_input_queue(4);
        tx.push_bytes(&[0x93, 64, 100]).unwrap();
        tx.push_bytes(&[0xF8]).unwrap(); // clock, ignored
        assert_eq!(
            rx.read(),
            Some(ChannelEvent::new(3, ChannelMessage::NoteOn { note: 64, velocity: 100 }))
        );
        assert_eq!(rx.read(), None);
    }

    #[test]
    fn producer_works_from_another_thread() {
        let (mut tx, mut rx) = live_input_queue(16);
        std::thread::spawn(move || {
            for n in 0..8 {
                tx.push(press(n)).unwrap();
            }
        })
        .join()
        .unwrap();

        let notes: Vec<_> = std::iter::from_fn(|| rx.read()).filter_map(|e| e.note()).collect();
        assert_eq!(notes, (0..8).collect::<Vec<_>>());
    }
}
