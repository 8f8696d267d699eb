//! Teensy 2.0 digital pins on top of the ATmega32U4 port registers.
//!
//! Pins are addressed by the number printed on the Teensy board. Each one
//! maps to a bit in one of PORTB/C/D/E/F; DDRx selects the direction,
//! PORTx drives outputs and PINx reads inputs.

use avr_device::atmega32u4::Peripherals;
use keypad::{DigitalIo, PinId, PinMode};

#[derive(Copy, Clone)]
enum Port {
    B,
    C,
    D,
    E,
    F,
}

/// Teensy 2.0 pin number → (port, bit).
const PIN_MAP: [(Port, u8); 25] = [
    (Port::B, 0), // 0
    (Port::B, 1), // 1
    (Port::B, 2), // 2
    (Port::B, 3), // 3
    (Port::B, 7), // 4
    (Port::D, 0), // 5
    (Port::D, 1), // 6
    (Port::D, 2), // 7  (RXD1)
    (Port::D, 3), // 8  (TXD1)
    (Port::C, 6), // 9
    (Port::C, 7), // 10
    (Port::D, 6), // 11 (on-board LED)
    (Port::D, 7), // 12
    (Port::B, 4), // 13
    (Port::B, 5), // 14
    (Port::B, 6), // 15
    (Port::F, 7), // 16
    (Port::F, 6), // 17
    (Port::F, 5), // 18
    (Port::F, 4), // 19
    (Port::F, 1), // 20
    (Port::F, 0), // 21
    (Port::D, 4), // 22
    (Port::D, 5), // 23
    (Port::E, 6), // 24
];

fn apply(bits: u8, mask: u8, set: bool) -> u8 {
    if set {
        bits | mask
    } else {
        bits & !mask
    }
}

/// GPIO backend for the keypad scanner. Unknown pin numbers are ignored
/// and read as low.
pub struct TeensyIo {
    dp: Peripherals,
}

impl TeensyIo {
    pub fn new(dp: Peripherals) -> Self {
        Self { dp }
    }

    fn set_direction(&self, port: Port, mask: u8, output: bool) {
        let dp = &self.dp;
        match port {
            Port::B => dp.PORTB.ddrb.modify(|r, w| unsafe { w.bits(apply(r.bits(), mask, output)) }),
            Port::C => dp.PORTC.ddrc.modify(|r, w| unsafe { w.bits(apply(r.bits(), mask, output)) }),
            Port::D => dp.PORTD.ddrd.modify(|r, w| unsafe { w.bits(apply(r.bits(), mask, output)) }),
            Port::E => dp.PORTE.ddre.modify(|r, w| unsafe { w.bits(apply(r.bits(), mask, output)) }),
            Port::F => dp.PORTF.ddrf.modify(|r, w| unsafe { w.bits(apply(r.bits(), mask, output)) }),
        }
    }

    /// For inputs this also controls the pull-up; the keypad sense lines
    /// rely on external pull-downs, so inputs are left with it off.
    fn set_level(&self, port: Port, mask: u8, high: bool) {
        let dp = &self.dp;
        match port {
            Port::B => dp.PORTB.portb.modify(|r, w| unsafe { w.bits(apply(r.bits(), mask, high)) }),
            Port::C => dp.PORTC.portc.modify(|r, w| unsafe { w.bits(apply(r.bits(), mask, high)) }),
            Port::D => dp.PORTD.portd.modify(|r, w| unsafe { w.bits(apply(r.bits(), mask, high)) }),
            Port::E => dp.PORTE.porte.modify(|r, w| unsafe { w.bits(apply(r.bits(), mask, high)) }),
            Port::F => dp.PORTF.portf.modify(|r, w| unsafe { w.bits(apply(r.bits(), mask, high)) }),
        }
    }

    fn input_bits(&self, port: Port) -> u8 {
        let dp = &self.dp;
        match port {
            Port::B => dp.PORTB.pinb.read().bits(),
            Port::C => dp.PORTC.pinc.read().bits(),
            Port::D => dp.PORTD.pind.read().bits(),
            Port::E => dp.PORTE.pine.read().bits(),
            Port::F => dp.PORTF.pinf.read().bits(),
        }
    }
}

impl DigitalIo for TeensyIo {
    fn configure_pin(&mut self, pin: PinId, mode: PinMode) {
        if let Some(&(port, bit)) = PIN_MAP.get(pin as usize) {
            let mask = 1 << bit;
            match mode {
                PinMode::Input => {
                    self.set_direction(port, mask, false);
                    self.set_level(port, mask, false);
                }
                PinMode::Output => {
                    self.set_level(port, mask, false);
                    self.set_direction(port, mask, true);
                }
            }
        }
    }

    fn read_pin(&mut self, pin: PinId) -> bool {
        match PIN_MAP.get(pin as usize) {
            Some(&(port, bit)) => (self.input_bits(port) >> bit) & 1 != 0,
            None => false,
        }
    }

    fn write_pin(&mut self, pin: PinId, high: bool) {
        if let Some(&(port, bit)) = PIN_MAP.get(pin as usize) {
            self.set_level(port, 1 << bit, high);
        }
    }

    fn sleep_ms(&mut self, ms: u16) {
        delay_ms(ms);
    }
}

/// Busy-wait delay in milliseconds (approximate, at 16MHz).
pub fn delay_ms(ms: u16) {
    for _ in 0..ms {
        // ~1ms at 16MHz: 16000 cycles / 4 cycles per loop iteration
        for _ in 0..4000u16 {
            unsafe { core::arch::asm!("nop") };
        }
    }
}
