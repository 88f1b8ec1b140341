use std::convert::Infallible;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant as HostInstant};

use monitor_core::config::{ConverterConfig, HardwareConfig, TimerConfig};
use monitor_core::serial::ByteSource;
use monitor_core::startup::{self, SamplingHardware};
use monitor_core::trigger::{ConversionStarter, SamplingTrigger};
use monitor_core::{
    ByteSink, Calibration, Command, CommandInterpreter, Reading, SharedState,
    TemperatureAcquisition,
};

use crate::sensor::SimulatedSensor;

/// Completed readings kept for [`Session::tick`] before the worker starts
/// discarding them.
const READING_BACKLOG: usize = 16;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TranscriptEntry {
    pub elapsed: Duration,
    pub role: TranscriptRole,
    pub text: String,
}

impl TranscriptEntry {
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "[+{:>6} ms] {} {}",
            self.elapsed.as_millis(),
            self.role.prefix(),
            self.text.escape_debug()
        )
    }
}

/// Serial link as seen from the host terminal.
///
/// Every byte the device transmits goes to `writer`; in raw mode `\n` is
/// expanded to `\r\n` so lines start at column zero. Completed device lines and
/// host input lines are recorded in the transcript.
pub struct TerminalSink<W> {
    writer: W,
    raw_mode: bool,
    echo: bool,
    started_at: HostInstant,
    device_line: String,
    host_line: String,
    transcript: Vec<TranscriptEntry>,
    error: Option<io::Error>,
}

impl<W: Write> TerminalSink<W> {
    #[must_use]
    pub fn new(writer: W, raw_mode: bool, echo: bool) -> Self {
        Self {
            writer,
            raw_mode,
            echo,
            started_at: HostInstant::now(),
            device_line: String::new(),
            host_line: String::new(),
            transcript: Vec::new(),
            error: None,
        }
    }

    /// Notes one byte typed by the operator, echoing it when enabled.
    pub fn record_host_byte(&mut self, byte: u8) {
        if self.echo {
            self.write_terminal(byte);
        }
        if byte == b'\n' {
            let line = std::mem::take(&mut self.host_line);
            self.append(TranscriptRole::Host, line);
        } else {
            self.host_line.push(char::from(byte));
        }
    }

    #[must_use]
    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// Returns the first write error since the last call.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    fn append(&mut self, role: TranscriptRole, text: String) {
        self.transcript.push(TranscriptEntry {
            elapsed: self.started_at.elapsed(),
            role,
            text,
        });
    }

    fn write_terminal(&mut self, byte: u8) {
        let result = if self.raw_mode && byte == b'\n' {
            self.writer
                .write_all(b"\r\n")
                .and_then(|()| self.writer.flush())
        } else {
            self.writer.write_all(&[byte])
        };
        if let Err(err) = result {
            self.error.get_or_insert(err);
        }
    }
}

impl<W: Write> ByteSink for TerminalSink<W> {
    fn send_byte(&mut self, byte: u8) {
        self.write_terminal(byte);
        if byte == b'\n' {
            let line = std::mem::take(&mut self.device_line);
            self.append(TranscriptRole::Emulator, line);
        } else {
            self.device_line.push(char::from(byte));
        }
    }
}

pub type SharedTerminal<W> = Arc<Mutex<TerminalSink<W>>>;

fn lock<W>(terminal: &SharedTerminal<W>) -> MutexGuard<'_, TerminalSink<W>> {
    terminal.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Conversion start that wakes the acquisition worker.
#[derive(Clone)]
pub struct ConversionRequest {
    sender: Sender<()>,
}

impl ConversionStarter for ConversionRequest {
    fn start_conversion(&mut self) {
        // A closed channel means the worker is gone and the session is ending.
        let _ = self.sender.send(());
    }
}

/// Peripheral setup for the emulator. Only the timer period matters; the
/// simulated sensor accepts any converter setup.
#[derive(Default)]
struct EmulatedBoard {
    period: Option<Duration>,
}

impl SamplingHardware for EmulatedBoard {
    type Error = Infallible;

    fn configure_timer(&mut self, timer: &TimerConfig) -> Result<(), Self::Error> {
        self.period = timer.period().ok();
        Ok(())
    }

    fn configure_converter(&mut self, _converter: &ConverterConfig) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Emulated board: trigger, acquisition worker, and command interpreter
/// sharing one terminal.
pub struct Session<W> {
    interpreter: CommandInterpreter<'static>,
    terminal: SharedTerminal<W>,
    trigger: SamplingTrigger<ConversionRequest>,
    readings: Receiver<Reading>,
    period: Duration,
    stop: Arc<AtomicBool>,
    worker: JoinHandle<()>,
}

impl<W: Write + Send + 'static> Session<W> {
    /// Brings the board up and starts the acquisition worker.
    ///
    /// # Errors
    ///
    /// Fails with [`io::ErrorKind::InvalidInput`] when `config` does not pass
    /// bring-up, or with the spawn error when the worker thread cannot start.
    pub fn start(
        shared: &'static SharedState,
        mut sensor: SimulatedSensor,
        terminal: TerminalSink<W>,
        config: &HardwareConfig,
    ) -> io::Result<Self> {
        let terminal = Arc::new(Mutex::new(terminal));
        let mut board = EmulatedBoard::default();
        startup::bring_up(&mut board, &mut *lock(&terminal), config)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))?;
        let period = board
            .period
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no sampling period"))?;

        let (request_tx, request_rx) = mpsc::channel::<()>();
        let (reading_tx, reading_rx) = mpsc::sync_channel(READING_BACKLOG);
        let worker_terminal = Arc::clone(&terminal);
        let calibration = Calibration::for_converter(&config.converter);

        let worker = thread::Builder::new()
            .name("acquisition".into())
            .spawn(move || {
                let acquisition = TemperatureAcquisition::new(shared, calibration);
                for () in request_rx {
                    let raw = sensor.sample();
                    let reading =
                        acquisition.on_conversion_complete(raw, &mut *lock(&worker_terminal));
                    // A full backlog or a finished session discards the reading.
                    let _ = reading_tx.try_send(reading);
                }
            })?;

        Ok(Self {
            interpreter: CommandInterpreter::new(shared),
            terminal,
            trigger: SamplingTrigger::new(ConversionRequest { sender: request_tx }),
            readings: reading_rx,
            period,
            stop: Arc::new(AtomicBool::new(false)),
            worker,
        })
    }

    pub fn terminal(&self) -> MutexGuard<'_, TerminalSink<W>> {
        lock(&self.terminal)
    }

    /// Starts a free-running timer that fires the trigger once per period
    /// until [`Session::shutdown`].
    fn spawn_timer(&self) -> io::Result<JoinHandle<()>> {
        let mut trigger = SamplingTrigger::new(self.trigger.starter().clone());
        let period = self.period;
        let stop = Arc::clone(&self.stop);
        thread::Builder::new()
            .name("sampling-timer".into())
            .spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    thread::sleep(period);
                    trigger.on_compare_match();
                }
            })
    }

    /// Fires one compare match and waits for the resulting conversion.
    ///
    /// Only meaningful while no free-running timer is active.
    pub fn tick(&mut self) -> Option<Reading> {
        self.trigger.on_compare_match();
        self.readings.recv().ok()
    }

    /// Delivers one received byte to the interpreter.
    pub fn feed(&mut self, byte: u8) -> Option<Command> {
        let mut terminal = lock(&self.terminal);
        if byte != 0 {
            terminal.record_host_byte(byte);
        }
        let command = self.interpreter.feed(byte, &mut *terminal);
        if command.is_some() && self.interpreter.last_line_wrapped() {
            terminal.append(
                TranscriptRole::Emulator,
                "(line buffer wrapped)".to_string(),
            );
        }
        command
    }

    /// Feeds every byte currently pending on `source`.
    pub fn poll<R>(&mut self, source: &mut R) -> Vec<Command>
    where
        R: ByteSource + ?Sized,
    {
        let mut commands = Vec::new();
        while let Some(byte) = source.try_receive_byte() {
            commands.extend(self.feed(byte));
        }
        commands
    }

    /// Sends a full line, adding the newline.
    pub fn send_line(&mut self, line: &str) -> Option<Command> {
        let mut last = None;
        for byte in line.bytes().chain(std::iter::once(b'\n')) {
            if let Some(command) = self.feed(byte) {
                last = Some(command);
            }
        }
        last
    }

    /// Rendered transcript, one entry per line.
    #[must_use]
    pub fn transcript_text(&self) -> String {
        let mut text = String::new();
        for entry in self.terminal().transcript() {
            let _ = writeln!(text, "{}", entry.render());
        }
        text
    }

    /// Runs the free-running timer and calls `step` until it breaks, then
    /// stops the worker and joins the timer. An error carried by the break
    /// wins over one raised while stopping.
    ///
    /// # Errors
    ///
    /// Returns the error carried by `step`, else any error from spawning the
    /// timer, from [`Session::shutdown`], or from a panicked timer thread.
    pub fn run_with<F>(mut self, mut step: F) -> io::Result<()>
    where
        F: FnMut(&mut Self) -> ControlFlow<io::Result<()>>,
    {
        let timer = match self.spawn_timer() {
            Ok(timer) => timer,
            Err(err) => {
                let _ = self.shutdown();
                return Err(err);
            }
        };

        let outcome = loop {
            if let ControlFlow::Break(outcome) = step(&mut self) {
                break outcome;
            }
        };

        let stopped = self.shutdown().and_then(|()| {
            timer
                .join()
                .map_err(|_| io::Error::other("sampling timer panicked"))
        });
        outcome.and(stopped)
    }

    /// Stops the timer and the worker.
    ///
    /// # Errors
    ///
    /// Fails when the worker panicked or the terminal reported a write error.
    pub fn shutdown(self) -> io::Result<()> {
        let Session {
            terminal,
            trigger,
            stop,
            worker,
            ..
        } = self;

        stop.store(true, Ordering::Relaxed);
        // The worker exits once every request sender is gone, including the
        // timer thread's copy after its current sleep.
        drop(trigger);
        worker
            .join()
            .map_err(|_| io::Error::other("acquisition worker panicked"))?;

        match lock(&terminal).take_error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monitor_core::startup::BANNER;

    fn leak_state() -> &'static SharedState {
        Box::leak(Box::new(SharedState::new()))
    }

    fn start(shared: &'static SharedState, config: &HardwareConfig) -> Session<Vec<u8>> {
        Session::start(
            shared,
            SimulatedSensor::new(25.0, Calibration::REFERENCE),
            TerminalSink::new(Vec::new(), false, false),
            config,
        )
        .unwrap()
    }

    fn session() -> Session<Vec<u8>> {
        start(leak_state(), &HardwareConfig::REFERENCE)
    }

    /// 100 Hz keeps the timer thread's final sleep short.
    fn fast_session() -> Session<Vec<u8>> {
        let config = HardwareConfig {
            timer: TimerConfig::REFERENCE.with_rate(100),
            ..HardwareConfig::REFERENCE
        };
        start(leak_state(), &config)
    }

    fn device_lines(session: &Session<Vec<u8>>) -> Vec<String> {
        session
            .terminal()
            .transcript()
            .iter()
            .filter(|entry| entry.role == TranscriptRole::Emulator)
            .map(|entry| entry.text.clone())
            .collect()
    }

    #[test]
    fn start_prints_banner_and_reference_period() {
        let session = session();

        assert_eq!(session.period, Duration::from_secs(1));
        let printed = String::from_utf8(session.terminal().writer.clone()).unwrap();
        assert_eq!(printed, BANNER.concat());
        session.shutdown().unwrap();
    }

    #[test]
    fn tick_streams_default_offset_reading() {
        let mut session = session();

        let reading = session.tick().unwrap();

        assert!(reading.reported);
        let lines = device_lines(&session);
        let last = lines.last().unwrap();
        let value: i32 = last.trim().parse().unwrap();
        assert!((-27..=-23).contains(&value), "streamed {value}");
        session.shutdown().unwrap();
    }

    #[test]
    fn commands_round_trip_through_the_terminal() {
        let shared = leak_state();
        let mut session = start(shared, &HardwareConfig::REFERENCE);

        assert_eq!(session.send_line("s"), Some(Command::Stop));
        assert!(!session.tick().unwrap().reported);
        session.send_line("o 10");
        session.send_line("O");
        session.send_line("x");

        let lines = device_lines(&session);
        assert!(lines.ends_with(&["T-Offset: 10".to_string(), "Unknown Command!".to_string()]));
        assert!(!shared.streaming_enabled());
        session.shutdown().unwrap();
    }

    #[test]
    fn raw_mode_expands_newlines() {
        let mut sink = TerminalSink::new(Vec::new(), true, false);
        sink.send_text("24\n");
        assert_eq!(sink.writer.as_slice(), b"24\r\n");
        assert_eq!(sink.transcript()[0].text, "24");
    }

    #[test]
    fn zero_rate_fails_bring_up() {
        let config = HardwareConfig {
            timer: TimerConfig::REFERENCE.with_rate(0),
            ..HardwareConfig::REFERENCE
        };
        let result = Session::start(
            leak_state(),
            SimulatedSensor::new(20.0, Calibration::REFERENCE),
            TerminalSink::new(Vec::new(), false, false),
            &config,
        );
        assert!(result.is_err());
    }

    #[test]
    fn input_error_is_reported_after_the_timer_stops() {
        let deadline = HostInstant::now() + Duration::from_secs(5);

        let result = fast_session().run_with(|session| {
            if session.readings.try_recv().is_ok() {
                return ControlFlow::Break(Err(io::Error::other("keyboard closed")));
            }
            assert!(HostInstant::now() < deadline, "timer never fired");
            thread::sleep(Duration::from_millis(1));
            ControlFlow::Continue(())
        });

        assert_eq!(result.unwrap_err().to_string(), "keyboard closed");
    }

    #[test]
    fn clean_exit_joins_timer_and_worker() {
        let mut steps = 0;

        let result = fast_session().run_with(|session| {
            steps += 1;
            session.send_line("s");
            ControlFlow::Break(Ok(()))
        });

        assert!(result.is_ok());
        assert_eq!(steps, 1);
    }
}
