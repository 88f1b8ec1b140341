use embassy_time::{Duration, Ticker};
use monitor_core::trigger::SamplingTrigger;

use super::CONVERSION_REQUEST;

/// Periodic compare-match source. Each tick requests one conversion and
/// nothing else.
#[embassy_executor::task]
pub async fn run(period: Duration) -> ! {
    let mut ticker = Ticker::every(period);
    let mut trigger = SamplingTrigger::new(|| CONVERSION_REQUEST.signal(()));

    loop {
        ticker.next().await;
        trigger.on_compare_match();
        defmt::trace!("sampling: tick {}", trigger.fired());
    }
}
