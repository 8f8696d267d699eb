//! Polling driver for a 4×4 matrix keypad.
//!
//! Four strobe (row) outputs are energized one at a time while four sense
//! (column) inputs are read back. The first confirmed (row, column) hit is
//! translated to a character through [`SYMBOLS`].
//!
//! This crate is `no_std` so the same scanner runs in the AVR firmware and
//! in the host tooling. The `sim` feature adds a scriptable backend for the
//! latter.

#![cfg_attr(not(any(test, feature = "sim")), no_std)]

pub mod debounce;
pub mod io;
pub mod scanner;
#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use debounce::PressTracker;
pub use io::{DigitalIo, PinId, PinMode};
pub use scanner::{Config, Policy, Scanner, Timing};

/// Number of strobe lines (rows).
pub const ROWS: usize = 4;
/// Number of sense lines (columns).
pub const COLS: usize = 4;

/// Character printed on each key, indexed `[row][col]`.
pub static SYMBOLS: [[char; COLS]; ROWS] = [
    ['1', '2', '3', 'A'],
    ['4', '5', '6', 'B'],
    ['7', '8', '9', 'C'],
    ['*', '0', '#', 'D'],
];

/// A key coordinate inside the matrix. Only [`Position::new`] and the
/// lookups build one, so `row < ROWS` and `col < COLS` always hold.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    row: usize,
    col: usize,
}

impl Position {
    /// Build a position, rejecting coordinates outside the 4×4 grid.
    pub const fn new(row: usize, col: usize) -> Option<Self> {
        if row < ROWS && col < COLS {
            Some(Self { row, col })
        } else {
            None
        }
    }

    pub const fn row(self) -> usize {
        self.row
    }

    pub const fn col(self) -> usize {
        self.col
    }

    /// Symbol printed on this key.
    pub fn symbol(self) -> char {
        SYMBOLS[self.row][self.col]
    }

    /// Find the key that carries `symbol`. Letters match case-insensitively.
    pub fn of_symbol(symbol: char) -> Option<Self> {
        let symbol = symbol.to_ascii_uppercase();
        (0..ROWS)
            .flat_map(|row| (0..COLS).map(move |col| Self { row, col }))
            .find(|pos| pos.symbol() == symbol)
    }

    /// Every key in scan order: row-major, lowest index first.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..ROWS).flat_map(|row| (0..COLS).map(move |col| Self { row, col }))
    }
}

/// Look up the symbol at `(row, col)`, or `None` when out of range.
pub fn lookup(row: usize, col: usize) -> Option<char> {
    Position::new(row, col).map(Position::symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_matches_keypad_faceplate() {
        assert_eq!(lookup(0, 0), Some('1'));
        assert_eq!(lookup(0, 3), Some('A'));
        assert_eq!(lookup(1, 3), Some('B'));
        assert_eq!(lookup(2, 1), Some('8'));
        assert_eq!(lookup(3, 0), Some('*'));
        assert_eq!(lookup(3, 1), Some('0'));
        assert_eq!(lookup(3, 2), Some('#'));
        assert_eq!(lookup(3, 3), Some('D'));
    }

    #[test]
    fn test_lookup_out_of_range() {
        assert_eq!(lookup(4, 0), None);
        assert_eq!(lookup(0, 4), None);
        assert!(Position::new(7, 7).is_none());
    }

    #[test]
    fn test_symbols_are_unique() {
        let mut seen: Vec<char> = Position::all().map(Position::symbol).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), ROWS * COLS);
    }

    #[test]
    fn test_reverse_lookup() {
        assert_eq!(Position::of_symbol('8'), Position::new(2, 1));
        assert_eq!(Position::of_symbol('c'), Position::new(2, 3));
        assert_eq!(Position::of_symbol('#'), Position::new(3, 2));
        assert_eq!(Position::of_symbol('x'), None);
    }

    #[test]
    fn test_scan_order_is_row_major() {
        let order: Vec<char> = Position::all().map(Position::symbol).collect();
        assert_eq!(order.iter().collect::<String>(), "123A456B789C*0#D");
    }

    #[test]
    fn test_accessors_stay_in_range() {
        for pos in Position::all() {
            assert!(pos.row() < ROWS && pos.col() < COLS);
            assert_eq!(Position::new(pos.row(), pos.col()), Some(pos));
            assert_eq!(lookup(pos.row(), pos.col()), Some(pos.symbol()));
        }
        let eight = Position::of_symbol('8').unwrap();
        assert_eq!((eight.row(), eight.col()), (2, 1));
    }
}
