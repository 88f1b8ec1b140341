#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Outbound console queue shared by every task that writes to the serial link.
//!
//! Writers render through [`LineQueueSink`], which batches bytes into frames
//! and hands complete lines to the serial task. Sending never blocks: when the
//! queue is full the frame is dropped and counted.

#[cfg(not(target_os = "none"))]
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
#[cfg(target_os = "none")]
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender, TrySendError};
use heapless::Vec;
use monitor_core::ByteSink;
use portable_atomic::{AtomicU32, Ordering};

/// Bytes carried by one outbound frame.
pub const FRAME_CAPACITY: usize = 64;

/// Frames buffered between writers and the UART transmitter.
pub const OUTBOUND_QUEUE_DEPTH: usize = 8;

#[cfg(target_os = "none")]
type ConsoleMutex = ThreadModeRawMutex;
#[cfg(not(target_os = "none"))]
type ConsoleMutex = NoopRawMutex;

pub type Frame = Vec<u8, FRAME_CAPACITY>;

pub type OutboundQueue = Channel<ConsoleMutex, Frame, OUTBOUND_QUEUE_DEPTH>;

pub type OutboundSender<'a> = Sender<'a, ConsoleMutex, Frame, OUTBOUND_QUEUE_DEPTH>;

pub type OutboundReceiver<'a> = Receiver<'a, ConsoleMutex, Frame, OUTBOUND_QUEUE_DEPTH>;

/// Frames discarded because the queue was full.
static DROPPED_FRAMES: AtomicU32 = AtomicU32::new(0);

pub fn dropped_frames() -> u32 {
    DROPPED_FRAMES.load(Ordering::Relaxed)
}

/// [`ByteSink`] that turns a byte stream into queued frames.
pub struct LineQueueSink<'a> {
    sender: OutboundSender<'a>,
    frame: Frame,
}

impl<'a> LineQueueSink<'a> {
    pub fn new(sender: OutboundSender<'a>) -> Self {
        Self {
            sender,
            frame: Frame::new(),
        }
    }

    /// Queues whatever has been buffered, even without a trailing newline.
    pub fn flush(&mut self) {
        if self.frame.is_empty() {
            return;
        }

        let frame = core::mem::take(&mut self.frame);
        if let Err(TrySendError::Full(frame)) = self.sender.try_send(frame) {
            DROPPED_FRAMES.fetch_add(1, Ordering::Relaxed);
            #[cfg(target_os = "none")]
            defmt::warn!("console: outbound queue full, dropping {} bytes", frame.len());
            #[cfg(not(target_os = "none"))]
            let _ = frame;
        }
    }

    /// Bytes waiting for a newline.
    pub fn pending(&self) -> &[u8] {
        &self.frame
    }
}

impl ByteSink for LineQueueSink<'_> {
    fn send_byte(&mut self, byte: u8) {
        // A frame is flushed as soon as it fills, so there is always room.
        let _ = self.frame.push(byte);
        if byte == b'\n' || self.frame.is_full() {
            self.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monitor_core::interpreter::CommandInterpreter;
    use monitor_core::startup::send_banner;
    use monitor_core::SharedState;

    fn drain(queue: &OutboundQueue) -> std::vec::Vec<std::vec::Vec<u8>> {
        let receiver = queue.receiver();
        core::iter::from_fn(|| receiver.try_receive().ok())
            .map(|frame| frame.to_vec())
            .collect()
    }

    #[test]
    fn newline_closes_a_frame() {
        let queue = OutboundQueue::new();
        let mut sink = LineQueueSink::new(queue.sender());

        sink.send_text("24\n-3");

        assert_eq!(drain(&queue), [b"24\n".to_vec()]);
        assert_eq!(sink.pending(), b"-3");
    }

    #[test]
    fn full_frame_is_queued_without_newline() {
        let queue = OutboundQueue::new();
        let mut sink = LineQueueSink::new(queue.sender());

        for _ in 0..FRAME_CAPACITY + 1 {
            sink.send_byte(b'x');
        }

        let frames = drain(&queue);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), FRAME_CAPACITY);
        assert_eq!(sink.pending(), b"x");
    }

    #[test]
    fn banner_fits_the_queue() {
        let queue = OutboundQueue::new();
        let mut sink = LineQueueSink::new(queue.sender());

        send_banner(&mut sink);

        let frames = drain(&queue);
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[2], b"\n");
    }

    #[test]
    fn overflowing_queue_drops_and_counts() {
        let queue = OutboundQueue::new();
        let mut sink = LineQueueSink::new(queue.sender());
        let before = dropped_frames();

        for _ in 0..OUTBOUND_QUEUE_DEPTH + 2 {
            sink.send_text("12\n");
        }

        assert_eq!(drain(&queue).len(), OUTBOUND_QUEUE_DEPTH);
        assert!(dropped_frames() >= before + 2);
    }

    #[test]
    fn interpreter_replies_reach_the_queue() {
        let queue = OutboundQueue::new();
        let mut sink = LineQueueSink::new(queue.sender());
        let shared = SharedState::new();
        let mut interpreter = CommandInterpreter::new(&shared);

        for &byte in b"o 3\nO\n" {
            interpreter.feed(byte, &mut sink);
        }

        assert_eq!(drain(&queue), [b"T-Offset: 3\n".to_vec()]);
    }
}
