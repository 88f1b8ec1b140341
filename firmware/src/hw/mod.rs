//! Board peripherals behind the core's sampling traits.
//!
//! The STM32G0 temperature sensor is read through ADC1 with the settings from
//! [`crate::board::BOARD_CONFIG`]. The periodic compare-match timer of the
//! core configuration becomes an embassy `Ticker` period.

use core::fmt;

use embassy_stm32::adc::{Adc, Resolution, SampleTime, Temperature as TemperatureChannel};
use embassy_stm32::peripherals::ADC1;
use embassy_time::Duration;
use monitor_core::RawSample;
use monitor_core::config::{ConverterConfig, InputChannel, Reference, TimerConfig};
use monitor_core::startup::SamplingHardware;

#[derive(Copy, Clone, Debug, Eq, PartialEq, defmt::Format)]
pub enum BoardError {
    /// Only the on-chip temperature sensor is wired up.
    UnsupportedChannel(u8),
    /// The board has no selectable internal bandgap reference for ADC1.
    UnsupportedReference,
    UnsupportedResolution(u8),
    /// The timer period does not fit an embassy duration.
    PeriodOutOfRange,
    /// Peripherals were handed out before both configure calls succeeded.
    NotConfigured,
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardError::UnsupportedChannel(index) => {
                write!(f, "external channel {index} is not connected")
            }
            BoardError::UnsupportedReference => f.write_str("bandgap reference is unavailable"),
            BoardError::UnsupportedResolution(bits) => {
                write!(f, "{bits}-bit conversions are not supported")
            }
            BoardError::PeriodOutOfRange => f.write_str("sampling period is out of range"),
            BoardError::NotConfigured => f.write_str("sampling peripherals not configured"),
        }
    }
}

/// Longer sample times for slower converter clocks; the slowest divider gets
/// the longest window, which the temperature sensor needs anyway.
fn sample_time_for(clock_divider: u8) -> SampleTime {
    match clock_divider {
        0..=4 => SampleTime::CYCLES12_5,
        5..=16 => SampleTime::CYCLES39_5,
        17..=64 => SampleTime::CYCLES79_5,
        _ => SampleTime::CYCLES160_5,
    }
}

fn resolution_for(bits: u8) -> Result<Resolution, BoardError> {
    match bits {
        12 => Ok(Resolution::BITS12),
        10 => Ok(Resolution::BITS10),
        8 => Ok(Resolution::BITS8),
        6 => Ok(Resolution::BITS6),
        other => Err(BoardError::UnsupportedResolution(other)),
    }
}

/// ADC1 wired to the internal temperature sensor.
pub struct TemperatureProbe {
    adc: Adc<'static, ADC1>,
    channel: TemperatureChannel,
}

impl TemperatureProbe {
    /// Runs one blocking conversion.
    pub fn read(&mut self) -> RawSample {
        RawSample::from_register(self.adc.blocking_read(&mut self.channel))
    }
}

/// Collects the timer period and converter setup during bring-up.
pub struct BoardSampling {
    adc: Adc<'static, ADC1>,
    period: Option<Duration>,
    channel: Option<TemperatureChannel>,
}

impl BoardSampling {
    pub fn new(adc: Adc<'static, ADC1>) -> Self {
        Self {
            adc,
            period: None,
            channel: None,
        }
    }

    /// Hands out the ticker period and the configured probe.
    pub fn finish(self) -> Result<(Duration, TemperatureProbe), BoardError> {
        match (self.period, self.channel) {
            (Some(period), Some(channel)) => Ok((
                period,
                TemperatureProbe {
                    adc: self.adc,
                    channel,
                },
            )),
            _ => Err(BoardError::NotConfigured),
        }
    }
}

impl SamplingHardware for BoardSampling {
    type Error = BoardError;

    fn configure_timer(&mut self, timer: &TimerConfig) -> Result<(), Self::Error> {
        let period = timer.period().map_err(|_| BoardError::PeriodOutOfRange)?;
        let micros = u64::try_from(period.as_micros()).map_err(|_| BoardError::PeriodOutOfRange)?;
        self.period = Some(Duration::from_micros(micros));
        Ok(())
    }

    fn configure_converter(&mut self, converter: &ConverterConfig) -> Result<(), Self::Error> {
        if let InputChannel::External(index) = converter.channel {
            return Err(BoardError::UnsupportedChannel(index));
        }
        if converter.reference == Reference::InternalBandgap {
            return Err(BoardError::UnsupportedReference);
        }

        self.adc
            .set_resolution(resolution_for(converter.resolution_bits)?);
        self.adc
            .set_sample_time(sample_time_for(converter.clock_divider));
        self.channel = Some(self.adc.enable_temperature());
        Ok(())
    }
}
