//! USART1 transmitter (TXD1 = PD3, Teensy pin 8) and a `log` backend on it.
//!
//! Transmit only, 9600 baud 8N1. Writes busy-wait on UDRE1.

use core::fmt::{self, Write};

use avr_device::atmega32u4::Peripherals;
use log::{LevelFilter, Log, Metadata, Record};

/// UBRR for 9600 baud at 16MHz: 16_000_000 / (16 * 9600) - 1.
const UBRR_9600: u16 = 103;

// UCSR1A / UCSR1B / UCSR1C bits
const UDRE1: u8 = 1 << 5;
const TXEN1: u8 = 1 << 3;
const UCSZ1_8BIT: u8 = (1 << 2) | (1 << 1);

pub struct Uart;

impl Uart {
    pub fn init(dp: &Peripherals) {
        let usart = &dp.USART1;
        usart.ubrr1.write(|w| unsafe { w.bits(UBRR_9600) });
        usart.ucsr1a.write(|w| unsafe { w.bits(0) });
        usart.ucsr1c.write(|w| unsafe { w.bits(UCSZ1_8BIT) });
        usart.ucsr1b.write(|w| unsafe { w.bits(TXEN1) });
    }

    pub fn write_byte(byte: u8) {
        // The scanner owns the Peripherals; USART1 is only touched from here.
        let dp = unsafe { Peripherals::steal() };
        while dp.USART1.ucsr1a.read().bits() & UDRE1 == 0 {}
        dp.USART1.udr1.write(|w| unsafe { w.bits(byte) });
    }
}

impl Write for Uart {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            if byte == b'\n' {
                Self::write_byte(b'\r');
            }
            Self::write_byte(byte);
        }
        Ok(())
    }
}

struct UartLogger;

impl Log for UartLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let mut out = Uart;
            let _ = writeln!(out, "[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: UartLogger = UartLogger;

/// Route `log` records to the UART. Must run before interrupts are enabled
/// (there are none in this firmware).
pub fn init_logger(level: LevelFilter) {
    unsafe {
        let _ = log::set_logger_racy(&LOGGER);
        log::set_max_level_racy(level);
    }
}
