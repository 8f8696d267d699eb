//! Hardware boundary consumed by the scanner.
//!
//! The scanner touches the outside world through exactly these four
//! primitives. Pin numbering is whatever the backend uses (Teensy digital
//! pin numbers on the firmware, arbitrary ids in the simulator).

/// Backend-specific pin identifier.
pub type PinId = u8;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PinMode {
    Input,
    Output,
}

/// Digital I/O plus a millisecond sleep.
///
/// `true` is the electrically high level, which is also the active level
/// for both strobe and sense lines.
pub trait DigitalIo {
    fn configure_pin(&mut self, pin: PinId, mode: PinMode);
    fn read_pin(&mut self, pin: PinId) -> bool;
    fn write_pin(&mut self, pin: PinId, high: bool);
    fn sleep_ms(&mut self, ms: u16);
}

impl<T: DigitalIo + ?Sized> DigitalIo for &mut T {
    fn configure_pin(&mut self, pin: PinId, mode: PinMode) {
        (**self).configure_pin(pin, mode)
    }

    fn read_pin(&mut self, pin: PinId) -> bool {
        (**self).read_pin(pin)
    }

    fn write_pin(&mut self, pin: PinId, high: bool) {
        (**self).write_pin(pin, high)
    }

    fn sleep_ms(&mut self, ms: u16) {
        (**self).sleep_ms(ms)
    }
}
