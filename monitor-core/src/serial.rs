//! Byte-level serial ports consumed by the core.
//!
//! The transmit and receive primitives belong to the hardware layer. The core
//! only needs a blocking single-byte send and a non-blocking single-byte
//! receive, which keeps every component drivable from a scripted byte stream.

use core::fmt;

use heapless::Vec;

/// Transmit side of the serial link.
pub trait ByteSink {
    /// Sends one byte, waiting for the transmitter if necessary.
    fn send_byte(&mut self, byte: u8);

    /// Sends every byte of `text` in order.
    fn send_text(&mut self, text: &str) {
        for byte in text.bytes() {
            self.send_byte(byte);
        }
    }
}

/// Receive side of the serial link.
pub trait ByteSource {
    /// Returns the next received byte, or `None` when nothing is pending.
    fn try_receive_byte(&mut self) -> Option<u8>;
}

impl<S> ByteSink for &mut S
where
    S: ByteSink + ?Sized,
{
    fn send_byte(&mut self, byte: u8) {
        (**self).send_byte(byte);
    }
}

impl<S> ByteSource for &mut S
where
    S: ByteSource + ?Sized,
{
    fn try_receive_byte(&mut self) -> Option<u8> {
        (**self).try_receive_byte()
    }
}

/// Bytes past capacity are dropped.
impl<const N: usize> ByteSink for Vec<u8, N> {
    fn send_byte(&mut self, byte: u8) {
        let _ = self.push(byte);
    }
}

/// Scripted source that hands out a fixed byte slice once.
#[derive(Clone, Debug)]
pub struct ScriptedSource<'a> {
    remaining: &'a [u8],
}

impl<'a> ScriptedSource<'a> {
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { remaining: bytes }
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining.is_empty()
    }
}

impl ByteSource for ScriptedSource<'_> {
    fn try_receive_byte(&mut self) -> Option<u8> {
        let (first, rest) = self.remaining.split_first()?;
        self.remaining = rest;
        Some(*first)
    }
}

/// [`fmt::Write`] adapter that streams formatted text into a [`ByteSink`].
pub struct SinkWriter<'s, S: ?Sized> {
    sink: &'s mut S,
}

impl<'s, S> SinkWriter<'s, S>
where
    S: ByteSink + ?Sized,
{
    pub fn new(sink: &'s mut S) -> Self {
        Self { sink }
    }
}

impl<S> fmt::Write for SinkWriter<'_, S>
where
    S: ByteSink + ?Sized,
{
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.sink.send_text(s);
        Ok(())
    }
}
