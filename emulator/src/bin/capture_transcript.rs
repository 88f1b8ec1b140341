use std::io::{self, Write};

use monitor_core::config::HardwareConfig;
use monitor_core::{Calibration, SharedState};
use monitor_emulator::sensor::SimulatedSensor;
use monitor_emulator::session::{Session, TerminalSink};

const AMBIENT_CELSIUS: f64 = 24.0;

static SHARED: SharedState = SharedState::new();

/// Replays a fixed operator session with one conversion between commands and
/// prints the resulting transcript.
fn main() -> io::Result<()> {
    let config = HardwareConfig::REFERENCE;
    let sensor = SimulatedSensor::new(
        AMBIENT_CELSIUS,
        Calibration::for_converter(&config.converter),
    );
    let mut session = Session::start(
        &SHARED,
        sensor,
        TerminalSink::new(io::sink(), false, false),
        &config,
    )?;

    session.tick();
    for line in ["b", "o 10", "O", "x", "s"] {
        session.send_line(line);
        session.tick();
    }

    let transcript = session.transcript_text();
    session.shutdown()?;

    let mut stdout = io::stdout().lock();
    writeln!(
        stdout,
        "Temperature monitor emulator transcript (ambient {AMBIENT_CELSIUS} C)"
    )?;
    stdout.write_all(transcript.as_bytes())?;
    stdout.flush()
}
