//! Row-strobe scanning and press confirmation.
//!
//! A scan drives every strobe line low, then raises one row at a time and
//! reads the sense lines. At most one strobe line is high at any instant, so
//! an active sense line always belongs to the row being strobed. Rows are
//! visited top to bottom and columns left to right; the first confirmed hit
//! ends the scan.

use log::{debug, trace};

use crate::debounce::{PressTracker, DEFAULT_CONFIRM_TICKS, DEFAULT_RELEASE_TICKS};
use crate::io::{DigitalIo, PinId, PinMode};
use crate::{Position, COLS, ROWS};

/// Delays used while scanning, in milliseconds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Timing {
    /// After raising a strobe line, before reading sense lines.
    pub settle_ms: u16,
    /// After lowering a strobe line, before raising the next one.
    pub recover_ms: u16,
    /// Between the first active reading and the confirming re-sample.
    pub debounce_ms: u16,
    /// Poll interval while waiting for a held key to be released.
    pub hold_poll_ms: u16,
}

impl Timing {
    pub const fn new() -> Self {
        Self {
            settle_ms: 5,
            recover_ms: 5,
            debounce_ms: 10,
            hold_poll_ms: 20,
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::new()
    }
}

/// How [`Scanner::get_press`] confirms an active sense line.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Policy {
    /// Re-sample after the debounce window, then busy-wait until the key is
    /// released before reporting it. Stalls the caller for the whole hold.
    BlockUntilRelease,
    /// Re-sample after the debounce window and report immediately. A failed
    /// re-sample leaves the key pending so its row is re-checked without the
    /// settle delay on the next call. A reported key is not reported again
    /// until it has been seen released.
    DebounceSample,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub timing: Timing,
    pub policy: Policy,
    /// Consecutive polls a key must read active before [`Scanner::poll`] reports it.
    pub confirm_ticks: u8,
    /// Consecutive polls a reported key must read inactive to count as released.
    pub release_ticks: u8,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            timing: Timing::new(),
            policy: Policy::DebounceSample,
            confirm_ticks: DEFAULT_CONFIRM_TICKS,
            release_ticks: DEFAULT_RELEASE_TICKS,
        }
    }

    pub const fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub const fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Scanner<IO> {
    io: IO,
    strobe_pins: [PinId; ROWS],
    sense_pins: [PinId; COLS],
    config: Config,
    /// Most recent key that read active but failed its re-sample.
    pending: Option<Position>,
    /// Keys reported by the debounce-sample policy and not yet seen released.
    held: [[bool; COLS]; ROWS],
    tracker: PressTracker,
}

impl<IO: DigitalIo> Scanner<IO> {
    /// Take ownership of the backend and configure the pins with the default
    /// [`Config`]. Pin ids are not validated; they must name 8 distinct pins.
    pub fn new(io: IO, strobe_pins: [PinId; ROWS], sense_pins: [PinId; COLS]) -> Self {
        Self::with_config(io, strobe_pins, sense_pins, Config::new())
    }

    pub fn with_config(
        mut io: IO,
        strobe_pins: [PinId; ROWS],
        sense_pins: [PinId; COLS],
        config: Config,
    ) -> Self {
        for &pin in &sense_pins {
            io.configure_pin(pin, PinMode::Input);
        }
        for &pin in &strobe_pins {
            io.configure_pin(pin, PinMode::Output);
            io.write_pin(pin, false);
        }

        Self {
            io,
            strobe_pins,
            sense_pins,
            config,
            pending: None,
            held: [[false; COLS]; ROWS],
            tracker: PressTracker::with_thresholds(config.confirm_ticks, config.release_ticks),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pending(&self) -> Option<Position> {
        self.pending
    }

    /// Whether `pos` was reported and has not read inactive since.
    pub fn is_held(&self, pos: Position) -> bool {
        self.held[pos.row][pos.col]
    }

    pub fn tracker(&self) -> &PressTracker {
        &self.tracker
    }

    pub fn io(&self) -> &IO {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut IO {
        &mut self.io
    }

    /// Give the backend back.
    pub fn free(self) -> IO {
        self.io
    }

    /// Run one full scan cycle and return the symbol of the confirmed key.
    pub fn get_press(&mut self) -> Option<char> {
        self.scan().map(Position::symbol)
    }

    /// Like [`Scanner::get_press`] but returns the matrix position.
    pub fn scan(&mut self) -> Option<Position> {
        self.strobe_all_low();

        for row in 0..ROWS {
            let strobe = self.strobe_pins[row];
            self.io.write_pin(strobe, true);

            let hit = match self.config.policy {
                Policy::BlockUntilRelease => {
                    self.sleep(self.config.timing.settle_ms);
                    self.confirm_blocking(row)
                }
                Policy::DebounceSample => self.confirm_sampled(row),
            };

            self.io.write_pin(strobe, false);

            if let Some(col) = hit {
                return Some(Position { row, col });
            }
            self.sleep(self.config.timing.recover_ms);
        }

        None
    }

    /// One non-blocking scan fed through the press tracker. Call this at a
    /// steady rate; a key is reported on the poll that confirms it and never
    /// again until it has been released.
    pub fn poll(&mut self) -> Option<char> {
        let raw = self.scan_raw();
        self.tracker.update(raw).map(Position::symbol)
    }

    /// First active (row, col) without any confirmation.
    fn scan_raw(&mut self) -> Option<Position> {
        self.strobe_all_low();

        for row in 0..ROWS {
            let strobe = self.strobe_pins[row];
            self.io.write_pin(strobe, true);
            self.sleep(self.config.timing.settle_ms);

            let hit = (0..COLS).find(|&col| self.io.read_pin(self.sense_pins[col]));

            self.io.write_pin(strobe, false);

            if let Some(col) = hit {
                trace!("raw hit at row {} col {}", row, col);
                return Some(Position { row, col });
            }
            self.sleep(self.config.timing.recover_ms);
        }

        None
    }

    fn confirm_blocking(&mut self, row: usize) -> Option<usize> {
        for col in 0..COLS {
            let sense = self.sense_pins[col];
            if !self.io.read_pin(sense) {
                continue;
            }
            if !self.resample(sense) {
                trace!("bounce at row {} col {}", row, col);
                continue;
            }

            debug!("press at row {} col {}, waiting for release", row, col);
            // No timeout: a stuck key stalls the caller here.
            while self.io.read_pin(sense) {
                self.sleep(self.config.timing.hold_poll_ms);
            }
            return Some(col);
        }

        None
    }

    fn confirm_sampled(&mut self, row: usize) -> Option<usize> {
        match self.pending {
            Some(p) if p.row == row => {
                trace!("re-checking pending {:?} without settle", p);
                self.pending = None;
            }
            _ => self.sleep(self.config.timing.settle_ms),
        }

        for col in 0..COLS {
            let pos = Position { row, col };
            let sense = self.sense_pins[col];
            let active = self.io.read_pin(sense);

            if self.held[row][col] {
                if !active {
                    debug!("release at {:?}", pos);
                    self.held[row][col] = false;
                }
                continue;
            }
            if !active {
                continue;
            }

            if self.resample(sense) {
                debug!("press at {:?}", pos);
                self.pending = None;
                self.held[row][col] = true;
                return Some(col);
            }

            trace!("bounce at {:?}", pos);
            self.pending = Some(pos);
        }

        None
    }

    fn resample(&mut self, sense: PinId) -> bool {
        self.sleep(self.config.timing.debounce_ms);
        self.io.read_pin(sense)
    }

    fn strobe_all_low(&mut self) {
        for &pin in &self.strobe_pins {
            self.io.write_pin(pin, false);
        }
    }

    fn sleep(&mut self, ms: u16) {
        if ms > 0 {
            self.io.sleep_ms(ms);
        }
    }
}
