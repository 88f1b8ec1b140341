use std::env;
use std::io::{self, Write};
use std::ops::ControlFlow;
use std::process;
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use monitor_core::config::{HardwareConfig, TimerConfig};
use monitor_core::serial::ByteSource;
use monitor_core::{Calibration, SharedState};
use monitor_emulator::sensor::SimulatedSensor;
use monitor_emulator::session::{Session, TerminalSink};

const DEFAULT_AMBIENT_CELSIUS: f64 = 22.5;
const IDLE_POLL: Duration = Duration::from_millis(10);

static SHARED: SharedState = SharedState::new();

struct Options {
    ambient: f64,
    rate_hz: u32,
}

fn main() -> io::Result<()> {
    let options = parse_options().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("Usage: monitor-emulator [--ambient <celsius>] [--rate <hz>]");
        process::exit(2);
    });

    let config = HardwareConfig {
        timer: TimerConfig::REFERENCE.with_rate(options.rate_hz),
        ..HardwareConfig::REFERENCE
    };
    let sensor = SimulatedSensor::new(
        options.ambient,
        Calibration::for_converter(&config.converter),
    );

    terminal::enable_raw_mode()?;
    let result = Session::start(
        &SHARED,
        sensor,
        TerminalSink::new(io::stdout(), true, true),
        &config,
    )
    .and_then(run);
    terminal::disable_raw_mode()?;

    let mut stdout = io::stdout();
    writeln!(stdout, "Session closed.")?;
    result
}

fn run(session: Session<io::Stdout>) -> io::Result<()> {
    let mut keyboard = Keyboard::default();

    session.run_with(|session| {
        if session.poll(&mut keyboard).is_empty() {
            thread::sleep(IDLE_POLL);
        }
        match keyboard.error.take() {
            Some(err) => ControlFlow::Break(Err(err)),
            None if keyboard.interrupted => ControlFlow::Break(Ok(())),
            None => ControlFlow::Continue(()),
        }
    })
}

/// Non-blocking key reader standing in for the UART receiver.
#[derive(Default)]
struct Keyboard {
    interrupted: bool,
    error: Option<io::Error>,
}

impl Keyboard {
    fn next_event(&mut self) -> io::Result<Option<Event>> {
        if event::poll(Duration::ZERO)? {
            event::read().map(Some)
        } else {
            Ok(None)
        }
    }
}

impl ByteSource for Keyboard {
    fn try_receive_byte(&mut self) -> Option<u8> {
        if self.interrupted {
            return None;
        }
        loop {
            let event = match self.next_event() {
                Ok(Some(event)) => event,
                Ok(None) => return None,
                Err(err) => {
                    self.error = Some(err);
                    return None;
                }
            };

            let Event::Key(KeyEvent {
                code,
                modifiers,
                kind: KeyEventKind::Press,
                ..
            }) = event
            else {
                continue;
            };

            match code {
                KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                    self.interrupted = true;
                    return None;
                }
                KeyCode::Char(ch) if ch.is_ascii() => return u8::try_from(ch).ok(),
                KeyCode::Enter => return Some(b'\n'),
                _ => {}
            }
        }
    }
}

fn parse_options() -> Result<Options, String> {
    let mut options = Options {
        ambient: DEFAULT_AMBIENT_CELSIUS,
        rate_hz: TimerConfig::REFERENCE.rate_hz,
    };
    let mut args = env::args().skip(1);

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg, None),
        };
        let mut value = || {
            inline
                .clone()
                .or_else(|| args.next())
                .ok_or_else(|| format!("Expected value after {flag}"))
        };

        match flag.as_str() {
            "--ambient" => {
                let raw = value()?;
                options.ambient = raw
                    .parse()
                    .map_err(|_| format!("Invalid temperature `{raw}`"))?;
            }
            "--rate" => {
                let raw = value()?;
                options.rate_hz = raw.parse().map_err(|_| format!("Invalid rate `{raw}`"))?;
            }
            other => return Err(format!("Unknown option `{other}`")),
        }
    }

    Ok(options)
}
