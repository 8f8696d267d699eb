//! Simulated keypad hardware.
//!
//! `SimIo` models a 4×4 switch matrix wired between the given strobe and
//! sense pins. A sense pin reads high when any strobed row has a closed
//! switch in that column. Time only advances through `sleep_ms`, so holds
//! and releases are scripted against the virtual clock.

use std::collections::VecDeque;

use crate::io::{DigitalIo, PinId, PinMode};
use crate::{Position, COLS, ROWS};

/// One call across the hardware boundary.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Configure(PinId, PinMode),
    Write(PinId, bool),
    Read(PinId, bool),
    Sleep(u16),
}

#[derive(Clone, Debug, Default)]
struct Switch {
    down: bool,
    /// Virtual time at which a held switch opens again.
    release_at: Option<u64>,
    /// Forced readings, consumed one per sample before `down` applies.
    script: VecDeque<bool>,
}

impl Switch {
    fn is_closed(&self, now: u64) -> bool {
        self.down && self.release_at.map_or(true, |t| now < t)
    }

    fn sample(&mut self, now: u64) -> bool {
        match self.script.pop_front() {
            Some(level) => level,
            None => self.is_closed(now),
        }
    }
}

pub struct SimIo {
    strobe_pins: [PinId; ROWS],
    sense_pins: [PinId; COLS],
    modes: [Option<PinMode>; 256],
    levels: [bool; 256],
    switches: [[Switch; COLS]; ROWS],
    now_ms: u64,
    events: Vec<Event>,
    max_active_strobes: usize,
}

impl SimIo {
    pub fn new(strobe_pins: [PinId; ROWS], sense_pins: [PinId; COLS]) -> Self {
        Self {
            strobe_pins,
            sense_pins,
            modes: [None; 256],
            levels: [false; 256],
            switches: Default::default(),
            now_ms: 0,
            events: Vec::new(),
            max_active_strobes: 0,
        }
    }

    /// Close the switch at `pos` until [`SimIo::release`] is called.
    pub fn press(&mut self, pos: Position) {
        let switch = &mut self.switches[pos.row][pos.col];
        switch.down = true;
        switch.release_at = None;
    }

    /// Close the switch at `pos` for `ms` of virtual time.
    pub fn press_for(&mut self, pos: Position, ms: u64) {
        let switch = &mut self.switches[pos.row][pos.col];
        switch.down = true;
        switch.release_at = Some(self.now_ms + ms);
    }

    pub fn release(&mut self, pos: Position) {
        let switch = &mut self.switches[pos.row][pos.col];
        switch.down = false;
        switch.release_at = None;
    }

    pub fn release_all(&mut self) {
        for pos in Position::all() {
            self.release(pos);
        }
    }

    /// Queue raw readings for `pos`. Each sample of that switch while its row
    /// is strobed consumes one entry; afterwards the pressed state applies.
    pub fn script(&mut self, pos: Position, levels: impl IntoIterator<Item = bool>) {
        self.switches[pos.row][pos.col].script.extend(levels);
    }

    pub fn is_closed(&self, pos: Position) -> bool {
        self.switches[pos.row][pos.col].is_closed(self.now_ms)
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    pub fn mode(&self, pin: PinId) -> Option<PinMode> {
        self.modes[pin as usize]
    }

    pub fn level(&self, pin: PinId) -> bool {
        self.levels[pin as usize]
    }

    /// Highest number of strobe lines ever driven high at the same time.
    pub fn max_active_strobes(&self) -> usize {
        self.max_active_strobes
    }

    pub fn active_strobes(&self) -> usize {
        self.strobe_pins
            .iter()
            .filter(|&&pin| self.levels[pin as usize])
            .count()
    }

    /// Sum of all sleeps recorded since the last `clear_events`.
    pub fn slept_ms(&self) -> u64 {
        self.events
            .iter()
            .map(|e| match e {
                Event::Sleep(ms) => *ms as u64,
                _ => 0,
            })
            .sum()
    }

    fn sense_column(&self, pin: PinId) -> Option<usize> {
        self.sense_pins.iter().position(|&p| p == pin)
    }
}

impl DigitalIo for SimIo {
    fn configure_pin(&mut self, pin: PinId, mode: PinMode) {
        self.modes[pin as usize] = Some(mode);
        self.events.push(Event::Configure(pin, mode));
    }

    fn read_pin(&mut self, pin: PinId) -> bool {
        let level = match self.sense_column(pin) {
            Some(col) => {
                let now = self.now_ms;
                let mut level = false;
                for row in 0..ROWS {
                    if self.levels[self.strobe_pins[row] as usize] {
                        // Sample every strobed switch so scripts advance evenly.
                        level |= self.switches[row][col].sample(now);
                    }
                }
                level
            }
            None => self.levels[pin as usize],
        };
        self.events.push(Event::Read(pin, level));
        level
    }

    fn write_pin(&mut self, pin: PinId, high: bool) {
        self.levels[pin as usize] = high;
        self.max_active_strobes = self.max_active_strobes.max(self.active_strobes());
        self.events.push(Event::Write(pin, high));
    }

    fn sleep_ms(&mut self, ms: u16) {
        self.now_ms += ms as u64;
        self.events.push(Event::Sleep(ms));
    }
}
