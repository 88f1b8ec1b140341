//! Conversion-complete handling.
//!
//! Runs once per finished conversion with the latched raw sample. The
//! temperature is always computed; it is only transmitted while streaming is
//! enabled.

use core::fmt::Write as _;

use heapless::String;

use crate::calibration::{Calibration, RawSample, Temperature};
use crate::serial::ByteSink;
use crate::shared::SharedState;

/// Longest report: sign, ten digits, and the newline.
pub const REPORT_CAPACITY: usize = 12;

/// Rendered temperature record.
pub type ReportLine = String<REPORT_CAPACITY>;

/// Outcome of a single conversion-complete event.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    pub raw: RawSample,
    pub temperature: Temperature,
    /// `true` when the value was transmitted.
    pub reported: bool,
}

/// Renders a temperature the way the serial stream carries it: the truncated
/// value right-aligned in two columns, then a newline.
#[must_use]
pub fn format_report(temperature: Temperature) -> ReportLine {
    let mut line = ReportLine::new();
    // Cannot overflow: an `i32` renders in at most eleven characters.
    let _ = writeln!(line, "{:2}", temperature.truncated());
    line
}

/// Conversion-complete handler bound to the shared context.
#[derive(Copy, Clone, Debug)]
pub struct TemperatureAcquisition<'a> {
    shared: &'a SharedState,
    calibration: Calibration,
}

impl<'a> TemperatureAcquisition<'a> {
    pub const fn new(shared: &'a SharedState, calibration: Calibration) -> Self {
        Self {
            shared,
            calibration,
        }
    }

    /// Converts a raw sample using the current calibration offset.
    #[must_use]
    pub fn convert(&self, raw: RawSample) -> Temperature {
        self.calibration
            .temperature(raw, self.shared.calibration_offset())
    }

    /// Handles one completed conversion.
    pub fn on_conversion_complete<S>(&self, raw: RawSample, sink: &mut S) -> Reading
    where
        S: ByteSink + ?Sized,
    {
        let temperature = self.convert(raw);
        let reported = self.shared.streaming_enabled();
        if reported {
            sink.send_text(&format_report(temperature));
        }

        Reading {
            raw,
            temperature,
            reported,
        }
    }
}
