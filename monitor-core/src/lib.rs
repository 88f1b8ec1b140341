#![no_std]

// Shared logic for the serial temperature monitor.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library. Hardware only enters through the byte and sampling
// traits in `serial`, `trigger`, and `startup`.

pub mod acquisition;
pub mod calibration;
pub mod config;
pub mod interpreter;
pub mod serial;
pub mod shared;
pub mod startup;
pub mod trigger;

pub use acquisition::{Reading, TemperatureAcquisition};
pub use calibration::{Calibration, RawSample, Temperature};
pub use config::HardwareConfig;
pub use interpreter::{Command, CommandInterpreter};
pub use serial::{ByteSink, ByteSource};
pub use shared::SharedState;
