//! Foreground command interpreter.
//!
//! Bytes from the serial receiver are assembled into a [`LineBuffer`]; each
//! newline completes a receive cycle, the first byte selects a [`Command`], and
//! the command mutates the [`SharedState`] or prints a reply. The interpreter
//! is a byte-driven state machine, so the same code runs behind a busy-polled
//! UART, an async reader, or a scripted test source.

pub mod command;
pub mod line;

use core::fmt::Write as _;

use crate::serial::{ByteSink, ByteSource, SinkWriter};
use crate::shared::SharedState;

pub use command::{Command, leading_integer};
pub use line::{LineBuffer, LineStatus};

/// Reply to any selector the interpreter does not know.
pub const UNKNOWN_COMMAND_REPLY: &str = "Unknown Command!\n";

/// Line assembly plus dispatch for the single-letter protocol.
#[derive(Debug)]
pub struct CommandInterpreter<'a> {
    shared: &'a SharedState,
    line: LineBuffer,
    last_wrapped: bool,
}

impl<'a> CommandInterpreter<'a> {
    pub const fn new(shared: &'a SharedState) -> Self {
        Self {
            shared,
            line: LineBuffer::new(),
            last_wrapped: false,
        }
    }

    /// Feeds one received byte. When it completes a line the command is
    /// executed, the buffer is cleared for the next cycle, and the command is
    /// returned.
    pub fn feed<S>(&mut self, byte: u8, sink: &mut S) -> Option<Command>
    where
        S: ByteSink + ?Sized,
    {
        match self.line.push(byte) {
            LineStatus::Pending => None,
            LineStatus::Complete => {
                let command = Command::parse(self.line.line());
                self.last_wrapped = self.line.wrapped();
                self.line.clear();
                self.execute(command, sink);
                Some(command)
            }
        }
    }

    /// Drains whatever the source has pending, stopping after the first
    /// completed line.
    pub fn poll<R, S>(&mut self, source: &mut R, sink: &mut S) -> Option<Command>
    where
        R: ByteSource + ?Sized,
        S: ByteSink + ?Sized,
    {
        while let Some(byte) = source.try_receive_byte() {
            if let Some(command) = self.feed(byte, sink) {
                return Some(command);
            }
        }
        None
    }

    /// Runs one blocking receive cycle: busy-polls the source until a line
    /// completes, calling `idle` after every empty poll.
    pub fn receive_line<R, S, I>(&mut self, source: &mut R, sink: &mut S, mut idle: I) -> Command
    where
        R: ByteSource + ?Sized,
        S: ByteSink + ?Sized,
        I: FnMut(),
    {
        loop {
            match source.try_receive_byte() {
                Some(byte) => {
                    if let Some(command) = self.feed(byte, sink) {
                        return command;
                    }
                }
                None => idle(),
            }
        }
    }

    /// Applies a command to the shared state and writes any reply.
    pub fn execute<S>(&self, command: Command, sink: &mut S)
    where
        S: ByteSink + ?Sized,
    {
        match command {
            Command::Begin => self.shared.set_streaming(true),
            Command::Stop => self.shared.set_streaming(false),
            Command::SetOffset(Some(offset)) => self.shared.set_calibration_offset(offset),
            Command::SetOffset(None) => {}
            Command::QueryOffset => {
                let offset = self.shared.calibration_offset();
                let _ = writeln!(SinkWriter::new(sink), "T-Offset: {offset}");
            }
            Command::Unknown(_) => sink.send_text(UNKNOWN_COMMAND_REPLY),
        }
    }

    /// Line assembled so far in the current cycle.
    #[must_use]
    pub fn pending(&self) -> &LineBuffer {
        &self.line
    }

    /// `true` when the most recently completed line overflowed and wrapped.
    #[must_use]
    pub fn last_line_wrapped(&self) -> bool {
        self.last_wrapped
    }

    #[must_use]
    pub fn shared(&self) -> &'a SharedState {
        self.shared
    }
}
