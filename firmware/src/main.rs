//! 4×4 keypad firmware for ATmega32U4 (Teensy 2.0).
//!
//! Polls the keypad roughly every few milliseconds and writes each reported
//! key to USART1 (9600 baud), one character per line. Log records go to the
//! same port.
//!
//! Wiring:
//!   Strobe (row) outputs: pins 0-3  (PB0-PB3)
//!   Sense (column) inputs: pins 21, 20, 19, 18 (PF0, PF1, PF4, PF5),
//!   each with an external pull-down resistor

#![no_std]
#![no_main]
#![feature(asm_experimental_arch)]

mod gpio;
mod uart;

use avr_device::atmega32u4::Peripherals;
use core::fmt::Write;
use keypad::{Config, DigitalIo, PinId, PinMode, Scanner, Timing};
use log::{info, LevelFilter};

use gpio::TeensyIo;
use uart::Uart;

const STROBE_PINS: [PinId; 4] = [0, 1, 2, 3];
const SENSE_PINS: [PinId; 4] = [21, 20, 19, 18];
const LED_PIN: PinId = 11;

/// One poll is ~4ms (1ms settle per row), so 3 ticks debounce ~12ms.
const CONFIG: Config = Config {
    timing: Timing {
        settle_ms: 1,
        recover_ms: 0,
        ..Timing::new()
    },
    confirm_ticks: 3,
    release_ticks: 3,
    ..Config::new()
};

/// Panic handler — on AVR we just loop forever.
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}

/// Main entry point.
#[no_mangle]
pub extern "C" fn main() -> ! {
    let dp = unsafe { Peripherals::steal() };

    // Disable clock prescaler (CLKPR)
    dp.CPU.clkpr.write(|w| w.clkpce().set_bit());
    dp.CPU.clkpr.write(|w| unsafe { w.bits(0) }); // Prescaler = 1

    // PF4/PF5 double as JTAG pins: JTD has to be written twice within 4 cycles
    dp.CPU.mcucr.write(|w| unsafe { w.bits(0x80) });
    dp.CPU.mcucr.write(|w| unsafe { w.bits(0x80) });

    Uart::init(&dp);
    uart::init_logger(LevelFilter::Info);

    let mut scanner = Scanner::with_config(TeensyIo::new(dp), STROBE_PINS, SENSE_PINS, CONFIG);
    scanner.io_mut().configure_pin(LED_PIN, PinMode::Output);
    info!("keypad ready");

    let mut led = false;
    loop {
        if let Some(symbol) = scanner.poll() {
            let mut out = Uart;
            let _ = writeln!(out, "{}", symbol);

            led = !led;
            scanner.io_mut().write_pin(LED_PIN, led);
        }
    }
}
