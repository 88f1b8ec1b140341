//! Hardware configuration surface for the reference board.
//!
//! The values reproduce the one-time register setup: a
//! 16 MHz core clock, timer 1 prescaled by 1024 and compared against a value
//! derived from the refresh rate, the UART in double-speed mode with divisor
//! 34, and the converter reading the internal temperature channel against the
//! 1.1 V bandgap with the slowest clock divider. Firmware ports translate these
//! onto their own peripherals through [`crate::startup::SamplingHardware`].

use core::fmt;
use core::time::Duration;

/// Core clock feeding the timer and UART.
pub const CPU_CLOCK_HZ: u32 = 16_000_000;
/// Timer prescaler (clock select `CS12 | CS10`).
pub const TIMER_PRESCALER: u32 = 1024;
/// Sampling rate in hertz.
pub const REFRESH_RATE_HZ: u32 = 1;
/// UART baud-rate register value for ~57.6 kbaud with double speed.
pub const UART_DIVISOR: u16 = 34;
/// Converter clock prescaler (`ADPS2..0` all set).
pub const ADC_CLOCK_DIVIDER: u8 = 128;
/// Converter resolution.
pub const ADC_RESOLUTION_BITS: u8 = 10;
/// Capacity of the inbound command line buffer.
pub const LINE_BUFFER_CAPACITY: usize = 20;
/// Calibration offset applied at startup.
pub const DEFAULT_CALIBRATION_OFFSET: i32 = -50;

const MICROS_PER_SECOND: u64 = 1_000_000;
const SUPPORTED_DIVIDERS: [u8; 7] = [2, 4, 8, 16, 32, 64, 128];

/// Errors detected while validating the configuration at startup.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// The sampling rate was zero.
    ZeroRate,
    /// The timer prescaler was zero.
    ZeroPrescaler,
    /// The derived compare value is zero or does not fit the 16-bit register.
    CompareOutOfRange { ticks: u32 },
    /// The UART clock or divisor yields no usable baud rate.
    InvalidBaud,
    /// The converter clock divider is not one the hardware offers.
    UnsupportedDivider(u8),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroRate => f.write_str("sampling rate must be non-zero"),
            ConfigError::ZeroPrescaler => f.write_str("timer prescaler must be non-zero"),
            ConfigError::CompareOutOfRange { ticks } => {
                write!(f, "compare value {ticks} does not fit the 16-bit timer")
            }
            ConfigError::InvalidBaud => f.write_str("serial clock yields no baud rate"),
            ConfigError::UnsupportedDivider(divider) => {
                write!(f, "converter clock divider {divider} is not supported")
            }
        }
    }
}

/// Periodic sampling timer in clear-on-compare mode.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerConfig {
    pub clock_hz: u32,
    pub prescaler: u32,
    pub rate_hz: u32,
}

impl TimerConfig {
    /// Reference timer: 16 MHz / 1024 at 1 Hz.
    pub const REFERENCE: Self = Self {
        clock_hz: CPU_CLOCK_HZ,
        prescaler: TIMER_PRESCALER,
        rate_hz: REFRESH_RATE_HZ,
    };

    /// Returns a copy running at a different sampling rate.
    #[must_use]
    pub const fn with_rate(self, rate_hz: u32) -> Self {
        Self { rate_hz, ..self }
    }

    /// Compare-match value, `clock_hz / prescaler / rate_hz`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroRate`] or [`ConfigError::ZeroPrescaler`] for
    /// a zero divisor, and [`ConfigError::CompareOutOfRange`] when the tick
    /// count is zero or exceeds `u16::MAX`.
    pub fn compare_value(&self) -> Result<u16, ConfigError> {
        if self.rate_hz == 0 {
            return Err(ConfigError::ZeroRate);
        }
        if self.prescaler == 0 {
            return Err(ConfigError::ZeroPrescaler);
        }

        let ticks = self.clock_hz / self.prescaler / self.rate_hz;
        match u16::try_from(ticks) {
            Ok(0) | Err(_) => Err(ConfigError::CompareOutOfRange { ticks }),
            Ok(value) => Ok(value),
        }
    }

    /// Time between two compare matches.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`TimerConfig::compare_value`].
    pub fn period(&self) -> Result<Duration, ConfigError> {
        let compare = u64::from(self.compare_value()?);
        let micros =
            compare * u64::from(self.prescaler) * MICROS_PER_SECOND / u64::from(self.clock_hz);
        Ok(Duration::from_micros(micros))
    }
}

/// Asynchronous serial link, 8 data bits, no parity, one stop bit.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerialConfig {
    pub clock_hz: u32,
    pub divisor: u16,
    pub double_speed: bool,
}

impl SerialConfig {
    pub const REFERENCE: Self = Self {
        clock_hz: CPU_CLOCK_HZ,
        divisor: UART_DIVISOR,
        double_speed: true,
    };

    /// Effective baud rate produced by the divisor.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaud`] when the clock is too slow for the
    /// divisor to produce a non-zero rate.
    pub fn baud_rate(&self) -> Result<u32, ConfigError> {
        let samples_per_bit = if self.double_speed { 8 } else { 16 };
        match self.clock_hz / samples_per_bit / (u32::from(self.divisor) + 1) {
            0 => Err(ConfigError::InvalidBaud),
            baud => Ok(baud),
        }
    }
}

/// Multiplexer input feeding the converter.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputChannel {
    /// On-chip temperature sensor.
    Temperature,
    /// External single-ended input.
    External(u8),
}

impl InputChannel {
    /// Multiplexer selection bits.
    #[must_use]
    pub const fn mux_bits(self) -> u8 {
        match self {
            InputChannel::Temperature => 0b1000,
            InputChannel::External(index) => index & 0b0111,
        }
    }
}

/// Converter voltage reference.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reference {
    /// Internal ~1.1 V bandgap.
    InternalBandgap,
    /// Supply rail, in volts.
    Supply(f64),
}

impl Reference {
    /// Bandgap voltage of the reference part.
    pub const BANDGAP_VOLTS: f64 = 1.1;

    #[must_use]
    pub const fn volts(self) -> f64 {
        match self {
            Reference::InternalBandgap => Self::BANDGAP_VOLTS,
            Reference::Supply(volts) => volts,
        }
    }
}

/// Analog front end setup.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConverterConfig {
    pub channel: InputChannel,
    pub reference: Reference,
    pub clock_divider: u8,
    pub resolution_bits: u8,
}

impl ConverterConfig {
    pub const REFERENCE: Self = Self {
        channel: InputChannel::Temperature,
        reference: Reference::InternalBandgap,
        clock_divider: ADC_CLOCK_DIVIDER,
        resolution_bits: ADC_RESOLUTION_BITS,
    };

    #[must_use]
    pub const fn reference_volts(&self) -> f64 {
        self.reference.volts()
    }

    /// Number of codes spanning the reference voltage (1024 for 10 bits).
    #[must_use]
    pub const fn full_scale(&self) -> u32 {
        1_u32 << self.resolution_bits
    }

    /// Checks the divider against the prescaler steps the converter offers.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedDivider`] for any other divider.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if SUPPORTED_DIVIDERS.contains(&self.clock_divider) {
            Ok(())
        } else {
            Err(ConfigError::UnsupportedDivider(self.clock_divider))
        }
    }
}

/// Complete board configuration applied once at startup.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HardwareConfig {
    pub timer: TimerConfig,
    pub serial: SerialConfig,
    pub converter: ConverterConfig,
}

impl HardwareConfig {
    pub const REFERENCE: Self = Self {
        timer: TimerConfig::REFERENCE,
        serial: SerialConfig::REFERENCE,
        converter: ConverterConfig::REFERENCE,
    };

    /// Runs every derivation once so bad values fail before interrupts start.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found in the timer, serial or
    /// converter settings, checked in that order.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timer.compare_value()?;
        self.serial.baud_rate()?;
        self.converter.validate()
    }
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self::REFERENCE
    }
}
