use core::panic::PanicInfo;

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    if let Some(location) = info.location() {
        defmt::error!(
            "panic at {}:{}: {}",
            location.file(),
            location.line(),
            defmt::Display2Format(&info.message())
        );
    } else {
        defmt::error!("panic: {}", defmt::Display2Format(&info.message()));
    }
    cortex_m::asm::udf();
}
