//! Fixed-capacity line assembly for inbound commands.
//!
//! Bytes land at increasing positions until a newline arrives. When the write
//! position reaches capacity it wraps to zero and keeps going: earlier bytes
//! stay in place and are overwritten from the start, so an over-long line is
//! corrupted rather than rejected. [`LineBuffer::wrapped`] reports when that
//! happened so hosts can log it.

use crate::config::LINE_BUFFER_CAPACITY;

/// Progress of the line being assembled.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineStatus {
    /// More bytes are needed.
    Pending,
    /// A newline terminated the line.
    Complete,
}

/// Zero-filled byte store owned by the command interpreter.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LineBuffer {
    bytes: [u8; LINE_BUFFER_CAPACITY],
    write_index: usize,
    wrapped: bool,
    complete: bool,
}

impl LineBuffer {
    pub const CAPACITY: usize = LINE_BUFFER_CAPACITY;

    #[must_use]
    pub const fn new() -> Self {
        Self {
            bytes: [0; LINE_BUFFER_CAPACITY],
            write_index: 0,
            wrapped: false,
            complete: false,
        }
    }

    /// Resets every byte to zero and rewinds the write position.
    pub fn clear(&mut self) {
        self.bytes = [0; LINE_BUFFER_CAPACITY];
        self.write_index = 0;
        self.wrapped = false;
        self.complete = false;
    }

    /// Stores one received byte.
    ///
    /// NUL is what the receiver reports when nothing arrived, so it is ignored.
    /// Pushing after a completed line starts a fresh receive cycle.
    pub fn push(&mut self, byte: u8) -> LineStatus {
        if byte == 0 {
            return self.status();
        }
        if self.complete {
            self.clear();
        }
        if self.write_index == Self::CAPACITY {
            self.write_index = 0;
            self.wrapped = true;
        }

        self.bytes[self.write_index] = byte;
        if byte == b'\n' {
            self.complete = true;
            LineStatus::Complete
        } else {
            self.write_index += 1;
            LineStatus::Pending
        }
    }

    #[must_use]
    pub fn status(&self) -> LineStatus {
        if self.complete {
            LineStatus::Complete
        } else {
            LineStatus::Pending
        }
    }

    /// Contents up to the first zero byte, or the whole buffer if none.
    #[must_use]
    pub fn line(&self) -> &[u8] {
        let end = self
            .bytes
            .iter()
            .position(|&byte| byte == 0)
            .unwrap_or(Self::CAPACITY);
        &self.bytes[..end]
    }

    /// Raw storage including bytes left behind after a wrap.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; LINE_BUFFER_CAPACITY] {
        &self.bytes
    }

    /// `true` when the write position wrapped during this cycle.
    #[must_use]
    pub fn wrapped(&self) -> bool {
        self.wrapped
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes[0] == 0
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}
