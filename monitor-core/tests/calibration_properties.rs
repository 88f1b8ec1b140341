use monitor_core::calibration::{BREAKPOINT_VOLTS, TransferCurve};
use monitor_core::config::{ConverterConfig, Reference};
use monitor_core::{Calibration, RawSample, Temperature};

const TOLERANCE: f64 = 1e-9;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < TOLERANCE
}

#[test]
fn both_segments_meet_at_the_breakpoint() {
    let curve = TransferCurve::DATASHEET;

    assert!(close(curve.lower.celsius_at(BREAKPOINT_VOLTS), 25.0));
    assert!(close(curve.upper.celsius_at(BREAKPOINT_VOLTS), 25.0));
    assert!(close(curve.celsius_at(BREAKPOINT_VOLTS), 25.0));
}

#[test]
fn offset_shifts_every_sample_linearly() {
    let calibration = Calibration::REFERENCE;

    for raw in [0, 120, 250, 292, 293, 300, 512, 1023] {
        let raw = RawSample::from_register(raw);
        let base = calibration.temperature(raw, 0).celsius();
        for offset in [-50, -1, 0, 3, 100] {
            let shifted = calibration.temperature(raw, offset).celsius();
            assert!(
                close(shifted - base, f64::from(offset)),
                "raw {} offset {offset}",
                raw.value()
            );
        }
    }
}

#[test]
fn truncation_goes_toward_zero() {
    assert_eq!(Temperature(24.99).truncated(), 24);
    assert_eq!(Temperature(-0.5).truncated(), 0);
    assert_eq!(Temperature(-24.99).truncated(), -24);
    assert_eq!(Temperature(f64::MAX).truncated(), i32::MAX);
}

#[test]
fn samples_either_side_of_the_breakpoint() {
    let calibration = Calibration::REFERENCE;

    // 292 lands just below 0.314 V, 293 just above.
    assert_eq!(
        calibration.temperature(RawSample::from_register(292), 0).truncated(),
        24
    );
    assert_eq!(
        calibration.temperature(RawSample::from_register(293), 0).truncated(),
        25
    );
}

#[test]
fn supply_reference_rescales_voltage() {
    let converter = ConverterConfig {
        reference: Reference::Supply(3.3),
        ..ConverterConfig::REFERENCE
    };
    let calibration = Calibration::for_converter(&converter);

    assert!(close(
        calibration.volts(RawSample::from_register(512)),
        1.65
    ));
}

#[test]
fn inverse_lookup_round_trips_whole_degrees() {
    let calibration = Calibration::REFERENCE;

    for celsius in [-40, 0, 25, 60] {
        let raw = calibration.raw_for(f64::from(celsius));
        let measured = calibration.temperature(raw, 0).celsius();
        assert!(
            (measured - f64::from(celsius)).abs() < 1.0,
            "{celsius} came back as {measured}"
        );
    }
}
