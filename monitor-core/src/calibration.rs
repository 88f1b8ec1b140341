//! Raw sample to temperature conversion.
//!
//! The on-chip sensor's transfer curve is approximated by two straight lines
//! through the datasheet points (0.242 V, -45 °C), (0.314 V, 25 °C), and
//! (0.380 V, 85 °C). Both lines pass through the breakpoint, so the curve is
//! continuous there before the user offset is added.

use crate::config::ConverterConfig;

/// Sensor voltage where the curve switches from the lower to the upper line.
pub const BREAKPOINT_VOLTS: f64 = 0.314;

const LOW_POINT: (f64, f64) = (0.242, -45.0);
const BREAK_POINT: (f64, f64) = (BREAKPOINT_VOLTS, 25.0);
const HIGH_POINT: (f64, f64) = (0.380, 85.0);

const RAW_MASK: u16 = 0x03FF;

/// Unconverted 10-bit converter result.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSample(u16);

impl RawSample {
    /// Largest value the converter produces.
    pub const MAX: Self = Self(RAW_MASK);

    /// Builds a sample from the data register, dropping bits above the resolution.
    #[must_use]
    pub const fn from_register(value: u16) -> Self {
        Self(value & RAW_MASK)
    }

    #[must_use]
    pub const fn value(self) -> u16 {
        self.0
    }
}

/// One straight line of the transfer curve.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Segment {
    pub slope: f64,
    pub intercept: f64,
}

impl Segment {
    /// Line through two `(volts, celsius)` points.
    #[must_use]
    pub const fn through(start: (f64, f64), end: (f64, f64)) -> Self {
        let slope = (end.1 - start.1) / (end.0 - start.0);
        Self {
            slope,
            intercept: start.1 - slope * start.0,
        }
    }

    #[must_use]
    pub fn celsius_at(&self, volts: f64) -> f64 {
        volts * self.slope + self.intercept
    }
}

/// Two-segment piecewise-linear sensor curve.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TransferCurve {
    pub breakpoint_volts: f64,
    pub lower: Segment,
    pub upper: Segment,
}

impl TransferCurve {
    /// Curve from the reference part's datasheet.
    pub const DATASHEET: Self = Self::through(LOW_POINT, BREAK_POINT, HIGH_POINT);

    /// Two lines joined at `knee`, each given as `(volts, celsius)` points.
    #[must_use]
    pub const fn through(low: (f64, f64), knee: (f64, f64), high: (f64, f64)) -> Self {
        Self {
            breakpoint_volts: knee.0,
            lower: Segment::through(low, knee),
            upper: Segment::through(knee, high),
        }
    }

    #[must_use]
    pub fn segment_for(&self, volts: f64) -> &Segment {
        if volts < self.breakpoint_volts {
            &self.lower
        } else {
            &self.upper
        }
    }

    #[must_use]
    pub fn celsius_at(&self, volts: f64) -> f64 {
        self.segment_for(volts).celsius_at(volts)
    }

    /// Inverse of [`Self::celsius_at`], used by simulators.
    #[must_use]
    pub fn volts_for(&self, celsius: f64) -> f64 {
        let segment = if celsius < self.lower.celsius_at(self.breakpoint_volts) {
            &self.lower
        } else {
            &self.upper
        };
        (celsius - segment.intercept) / segment.slope
    }
}

impl Default for TransferCurve {
    fn default() -> Self {
        Self::DATASHEET
    }
}

/// Temperature in degrees Celsius.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Temperature(pub f64);

impl Temperature {
    #[must_use]
    pub const fn celsius(self) -> f64 {
        self.0
    }

    /// Whole degrees, truncated toward zero (`-0.5` reports as `0`).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn truncated(self) -> i32 {
        self.0 as i32
    }
}

/// Converter scaling plus transfer curve.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Calibration {
    pub curve: TransferCurve,
    pub reference_volts: f64,
    pub full_scale: u32,
}

impl Calibration {
    /// Reference board: 10-bit samples against the 1.1 V bandgap.
    pub const REFERENCE: Self = Self::for_converter(&ConverterConfig::REFERENCE);

    #[must_use]
    pub const fn for_converter(converter: &ConverterConfig) -> Self {
        Self {
            curve: TransferCurve::DATASHEET,
            reference_volts: converter.reference_volts(),
            full_scale: converter.full_scale(),
        }
    }

    /// Same converter scaling with a different sensor curve.
    #[must_use]
    pub const fn with_curve(self, curve: TransferCurve) -> Self {
        Self { curve, ..self }
    }

    /// Sensor voltage for a raw sample, `raw * V_ref / full_scale`.
    #[must_use]
    pub fn volts(&self, raw: RawSample) -> f64 {
        f64::from(raw.value()) * self.reference_volts / f64::from(self.full_scale)
    }

    /// Calibrated temperature including the user offset.
    #[must_use]
    pub fn temperature(&self, raw: RawSample, offset: i32) -> Temperature {
        let volts = self.volts(raw);
        Temperature(self.curve.celsius_at(volts) + f64::from(offset))
    }

    /// Nearest raw sample for a sensor temperature, clamped to the converter range.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn raw_for(&self, celsius: f64) -> RawSample {
        let code =
            self.curve.volts_for(celsius) * f64::from(self.full_scale) / self.reference_volts;
        let clamped = code.clamp(0.0, f64::from(RawSample::MAX.value()));
        RawSample::from_register((clamped + 0.5) as u16)
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::REFERENCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    #[test]
    fn segments_meet_at_breakpoint() {
        let curve = TransferCurve::DATASHEET;
        let lower = curve.lower.celsius_at(BREAKPOINT_VOLTS);
        let upper = curve.upper.celsius_at(BREAKPOINT_VOLTS);

        assert!((lower - 25.0).abs() < TOLERANCE, "lower segment gave {lower}");
        assert!((upper - 25.0).abs() < TOLERANCE, "upper segment gave {upper}");
    }

    #[test]
    fn segments_hit_datasheet_points() {
        let curve = TransferCurve::DATASHEET;
        assert!((curve.celsius_at(0.242) + 45.0).abs() < TOLERANCE);
        assert!((curve.celsius_at(0.380) - 85.0).abs() < TOLERANCE);
    }

    #[test]
    fn breakpoint_selects_upper_segment() {
        let curve = TransferCurve::DATASHEET;
        assert_eq!(curve.segment_for(BREAKPOINT_VOLTS), &curve.upper);
        assert_eq!(curve.segment_for(BREAKPOINT_VOLTS - 1e-6), &curve.lower);
    }

    #[test]
    fn slopes_match_segment_endpoints() {
        let curve = TransferCurve::DATASHEET;
        assert!((curve.lower.slope - 70.0 / 0.072).abs() < 1e-6);
        assert!((curve.upper.slope - 60.0 / 0.066).abs() < 1e-6);
    }

    #[test]
    fn custom_curve_keeps_converter_scaling() {
        let curve = TransferCurve::through((0.5, -40.0), (0.75, 30.0), (1.0, 120.0));
        let calibration = Calibration::REFERENCE.with_curve(curve);

        assert!((calibration.reference_volts - 1.1).abs() < TOLERANCE);
        assert_eq!(calibration.full_scale, 1024);
        assert!((curve.breakpoint_volts - 0.75).abs() < TOLERANCE);
        assert!((curve.celsius_at(0.75) - 30.0).abs() < TOLERANCE);
        assert!((curve.volts_for(-40.0) - 0.5).abs() < TOLERANCE);
        assert!((curve.volts_for(120.0) - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn raw_samples_scale_against_reference() {
        let calibration = Calibration::REFERENCE;
        let half_scale = calibration.volts(RawSample::from_register(512));
        assert!((half_scale - 0.55).abs() < TOLERANCE);
        assert_eq!(RawSample::from_register(0xFFFF), RawSample::MAX);
    }

    #[test]
    fn truncates_toward_zero() {
        assert_eq!(Temperature(24.99).truncated(), 24);
        assert_eq!(Temperature(24.9).truncated(), 24);
        assert_eq!(Temperature(-0.5).truncated(), 0);
        assert_eq!(Temperature(-19.7).truncated(), -19);
    }

    #[test]
    fn inverse_curve_round_trips_through_raw_codes() {
        let calibration = Calibration::REFERENCE;
        for celsius in [-40.0, 0.0, 25.0, 60.0] {
            let raw = calibration.raw_for(celsius);
            let measured = calibration.temperature(raw, 0).celsius();
            // One code is roughly one degree on this curve.
            assert!((measured - celsius).abs() < 1.0, "{celsius} -> {measured}");
        }
    }
}
