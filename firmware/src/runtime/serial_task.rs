use embassy_futures::join::join;
use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_stm32::usart::{BufferedUart, Config as UartConfig, DataBits, Parity, StopBits};
use embassy_time::{Duration, Timer};
use embedded_io_async::{Read, Write};
use monitor_core::{CommandInterpreter, SharedState};
use static_cell::StaticCell;

use crate::console::{self, LineQueueSink, OutboundQueue};

const UART_BUFFER_SIZE: usize = console::FRAME_CAPACITY * 2;

static UART_TX_BUFFER: StaticCell<[u8; UART_BUFFER_SIZE]> = StaticCell::new();
static UART_RX_BUFFER: StaticCell<[u8; UART_BUFFER_SIZE]> = StaticCell::new();

embassy_stm32::bind_interrupts!(struct UartIrqs {
    USART3_4_5_6_LPUART1 => embassy_stm32::usart::BufferedInterruptHandler<hal::peripherals::USART5>;
});

/// Owns the serial link: drains the outbound queue to the transmitter and
/// feeds received bytes to the command interpreter.
#[embassy_executor::task]
pub async fn run(
    outbound: &'static OutboundQueue,
    shared: &'static SharedState,
    usart: Peri<'static, hal::peripherals::USART5>,
    tx_pin: Peri<'static, hal::peripherals::PB0>,
    rx_pin: Peri<'static, hal::peripherals::PB1>,
    baud: u32,
) -> ! {
    let mut config = UartConfig::default();
    config.baudrate = baud;
    config.data_bits = DataBits::DataBits8;
    config.stop_bits = StopBits::STOP1;
    config.parity = Parity::ParityNone;

    let uart = BufferedUart::new(
        usart,
        rx_pin,
        tx_pin,
        UART_TX_BUFFER.init([0; UART_BUFFER_SIZE]),
        UART_RX_BUFFER.init([0; UART_BUFFER_SIZE]),
        UartIrqs,
        config,
    )
    .expect("failed to initialize serial UART");

    let (mut uart_tx, mut uart_rx) = uart.split();
    let frames = outbound.receiver();

    let transmit = async move {
        let mut reported_drops = 0;
        loop {
            let frame = frames.receive().await;
            if uart_tx.write_all(&frame).await.is_err() || uart_tx.flush().await.is_err() {
                defmt::warn!("serial: UART write error, {} bytes lost", frame.len());
                Timer::after(Duration::from_millis(5)).await;
            }

            let dropped = console::dropped_frames();
            if dropped != reported_drops {
                defmt::warn!(
                    "serial: {} frames dropped since last report ({} total)",
                    dropped.wrapping_sub(reported_drops),
                    dropped
                );
                reported_drops = dropped;
            }
        }
    };

    let receive = async move {
        let mut interpreter = CommandInterpreter::new(shared);
        let mut replies = LineQueueSink::new(outbound.sender());
        let mut ingress = [0u8; console::FRAME_CAPACITY];

        loop {
            match uart_rx.read(&mut ingress).await {
                Ok(count) => {
                    for &byte in &ingress[..count] {
                        let Some(command) = interpreter.feed(byte, &mut replies) else {
                            continue;
                        };
                        if interpreter.last_line_wrapped() {
                            defmt::warn!("serial: command line overflowed and wrapped");
                        }
                        defmt::info!(
                            "serial: {} -> {}",
                            command,
                            interpreter.shared().snapshot()
                        );
                    }
                }
                Err(_) => {
                    defmt::warn!("serial: UART read error");
                    Timer::after(Duration::from_millis(5)).await;
                }
            }
        }
    };

    join(transmit, receive).await;
    loop {
        core::future::pending::<()>().await;
    }
}
