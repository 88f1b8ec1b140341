//! One-time bring-up: validate the configuration, program the sampling
//! peripherals, then greet the operator.

use core::fmt;

use crate::config::{ConfigError, ConverterConfig, HardwareConfig, TimerConfig};
use crate::serial::ByteSink;

/// Greeting written once after the peripherals are configured.
pub const BANNER: [&str; 3] = [
    "Excercise 12 - Temperature measurement\n",
    "--------------------------------------\n\n",
    "Press key 'b' or 's' to start/stop the measurement\n",
];

/// Peripheral setup owned by a firmware port or host emulator.
pub trait SamplingHardware {
    type Error;

    /// Arms the periodic timer that fires the sampling trigger.
    ///
    /// # Errors
    ///
    /// Returns the port's error when the timer cannot be programmed.
    fn configure_timer(&mut self, timer: &TimerConfig) -> Result<(), Self::Error>;

    /// Selects the converter input, reference, and clock, and enables the
    /// conversion-complete interrupt.
    ///
    /// # Errors
    ///
    /// Returns the port's error when the converter cannot be programmed.
    fn configure_converter(&mut self, converter: &ConverterConfig) -> Result<(), Self::Error>;
}

/// Failure during [`bring_up`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartupError<E> {
    Config(ConfigError),
    Hardware(E),
}

impl<E> From<ConfigError> for StartupError<E> {
    fn from(err: ConfigError) -> Self {
        StartupError::Config(err)
    }
}

impl<E: fmt::Display> fmt::Display for StartupError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Config(err) => write!(f, "invalid configuration: {err}"),
            StartupError::Hardware(err) => write!(f, "peripheral setup failed: {err}"),
        }
    }
}

/// Writes the three banner lines.
pub fn send_banner<S>(sink: &mut S)
where
    S: ByteSink + ?Sized,
{
    for line in BANNER {
        sink.send_text(line);
    }
}

/// Validates `config`, programs the timer and converter, and sends the banner.
///
/// Nothing is written to the sink unless every step succeeds.
///
/// # Errors
///
/// Returns [`StartupError::Config`] when `config` fails validation and
/// [`StartupError::Hardware`] when the port rejects the timer or converter
/// setup.
pub fn bring_up<H, S>(
    hardware: &mut H,
    sink: &mut S,
    config: &HardwareConfig,
) -> Result<(), StartupError<H::Error>>
where
    H: SamplingHardware + ?Sized,
    S: ByteSink + ?Sized,
{
    config.validate()?;
    hardware
        .configure_timer(&config.timer)
        .map_err(StartupError::Hardware)?;
    hardware
        .configure_converter(&config.converter)
        .map_err(StartupError::Hardware)?;
    send_banner(sink);
    Ok(())
}
