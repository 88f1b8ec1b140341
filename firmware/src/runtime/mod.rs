use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::adc::Adc;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use monitor_core::startup;
use monitor_core::SharedState;

use crate::board::{BOARD_CALIBRATION, BOARD_CALIBRATION_OFFSET, BOARD_CONFIG};
use crate::console::{LineQueueSink, OutboundQueue};
use crate::hw::BoardSampling;

mod acquisition_task;
mod sampling_task;
mod serial_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

/// Streaming flag and calibration offset.
pub(super) static SHARED: SharedState =
    SharedState::with_values(true, BOARD_CALIBRATION_OFFSET);
/// Raised once per timer tick; consumed by the acquisition task.
pub(super) static CONVERSION_REQUEST: Signal<CriticalSectionRawMutex, ()> = Signal::new();
pub(super) static OUTBOUND: OutboundQueue = Channel::new();

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let hal::Peripherals {
        ADC1, USART5, PB0, PB1, ..
    } = hal::init(hal::Config::default());

    let config = BOARD_CONFIG;
    let mut board = BoardSampling::new(Adc::new(ADC1));
    let mut console = LineQueueSink::new(OUTBOUND.sender());
    startup::bring_up(&mut board, &mut console, &config).expect("sampling bring-up");
    let (period, probe) = board.finish().expect("sampling peripherals configured");
    let baud = config.serial.baud_rate().expect("validated baud rate");

    defmt::info!(
        "monitor: sampling every {} ms, serial at {} baud",
        period.as_millis(),
        baud
    );

    spawner
        .spawn(serial_task::run(&OUTBOUND, &SHARED, USART5, PB0, PB1, baud))
        .expect("failed to spawn serial task");
    spawner
        .spawn(acquisition_task::run(probe, BOARD_CALIBRATION))
        .expect("failed to spawn acquisition task");
    spawner
        .spawn(sampling_task::run(period))
        .expect("failed to spawn sampling task");

    core::future::pending::<()>().await;
}
