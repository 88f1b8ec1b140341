use monitor_core::{Calibration, TemperatureAcquisition};

use super::{CONVERSION_REQUEST, OUTBOUND, SHARED};
use crate::console::LineQueueSink;
use crate::hw::TemperatureProbe;

#[embassy_executor::task]
pub async fn run(mut probe: TemperatureProbe, calibration: Calibration) -> ! {
    let acquisition = TemperatureAcquisition::new(&SHARED, calibration);
    let mut sink = LineQueueSink::new(OUTBOUND.sender());

    loop {
        CONVERSION_REQUEST.wait().await;
        let raw = probe.read();
        let reading = acquisition.on_conversion_complete(raw, &mut sink);
        defmt::debug!(
            "acquisition: raw={} temp={} reported={}",
            reading.raw.value(),
            reading.temperature.truncated(),
            reading.reported
        );
    }
}
