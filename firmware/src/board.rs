#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Board constants for the STM32G0 port.
//!
//! ADC1 samples the on-chip sensor at 10 bits against the 3.3 V analog
//! supply. The G0 sensor sits near 0.76 V at 30 °C and rises about 2.5 mV per
//! degree, so it gets its own transfer curve instead of the reference part's.

use monitor_core::Calibration;
use monitor_core::calibration::TransferCurve;
use monitor_core::config::{ConverterConfig, HardwareConfig, Reference};

/// Analog supply feeding VREF+ on the board.
pub const VDDA_VOLTS: f64 = 3.3;

/// Core configuration mapped onto this board. The clock tree runs from the
/// 16 MHz HSI, matching the reference timer and UART derivations.
pub const BOARD_CONFIG: HardwareConfig = HardwareConfig {
    converter: ConverterConfig {
        reference: Reference::Supply(VDDA_VOLTS),
        ..ConverterConfig::REFERENCE
    },
    ..HardwareConfig::REFERENCE
};

/// Typical G0 sensor response at -40 °C, 30 °C and 125 °C.
pub const SENSOR_CURVE: TransferCurve =
    TransferCurve::through((0.585, -40.0), (0.76, 30.0), (0.9975, 125.0));

/// Converter scaling from [`BOARD_CONFIG`] paired with [`SENSOR_CURVE`].
pub const BOARD_CALIBRATION: Calibration =
    Calibration::for_converter(&BOARD_CONFIG.converter).with_curve(SENSOR_CURVE);

/// Offset applied at power-up. The curve already reads true degrees, so the
/// reference part's correction is not carried over.
pub const BOARD_CALIBRATION_OFFSET: i32 = 0;
