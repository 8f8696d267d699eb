//! Non-blocking press detection.
//!
//! The tracker is fed one raw scan result per tick. A key must read active
//! for `confirm_ticks` consecutive ticks before it is reported, and must
//! then read inactive for `release_ticks` consecutive ticks before the
//! tracker goes back to idle. Nothing here sleeps, so the caller's loop
//! keeps running while a key is held.

use log::{debug, trace};

use crate::Position;

/// Consecutive active samples required to report a press.
/// At ~1ms per tick this gives ~5ms debounce time.
pub const DEFAULT_CONFIRM_TICKS: u8 = 5;
/// Consecutive inactive samples required to accept a release.
pub const DEFAULT_RELEASE_TICKS: u8 = 5;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    /// Nothing pressed.
    Idle,
    /// `pos` read active for `stable` consecutive ticks, not yet trusted.
    Candidate { pos: Position, stable: u8 },
    /// `pos` was reported on the tick that entered this state.
    Confirmed(Position),
    /// `pos` has been reported and is still down; `clear` counts inactive ticks.
    WaitingForRelease { pos: Position, clear: u8 },
}

pub struct PressTracker {
    state: State,
    confirm_ticks: u8,
    release_ticks: u8,
}

impl PressTracker {
    pub const fn new() -> Self {
        Self::with_thresholds(DEFAULT_CONFIRM_TICKS, DEFAULT_RELEASE_TICKS)
    }

    /// A single sample is never trusted, so `confirm_ticks` is raised to at
    /// least 2. `release_ticks` is raised to at least 1.
    pub const fn with_thresholds(confirm_ticks: u8, release_ticks: u8) -> Self {
        Self {
            state: State::Idle,
            confirm_ticks: if confirm_ticks < 2 { 2 } else { confirm_ticks },
            release_ticks: if release_ticks < 1 { 1 } else { release_ticks },
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = State::Idle;
    }

    /// Advance one tick with the raw scan result. Returns the position on
    /// the tick a press is confirmed, `None` otherwise.
    pub fn update(&mut self, raw: Option<Position>) -> Option<Position> {
        let (next, reported) = match self.state {
            State::Idle => (Self::candidate(raw), None),

            State::Candidate { pos, stable } => match raw {
                Some(p) if p == pos => {
                    let stable = stable + 1;
                    if stable >= self.confirm_ticks {
                        debug!("press confirmed at {:?}", pos);
                        (State::Confirmed(pos), Some(pos))
                    } else {
                        (State::Candidate { pos, stable }, None)
                    }
                }
                _ => {
                    trace!("bounce rejected at {:?} after {} samples", pos, stable);
                    (Self::candidate(raw), None)
                }
            },

            State::Confirmed(pos) => self.held(pos, 0, raw),

            State::WaitingForRelease { pos, clear } => self.held(pos, clear, raw),
        };

        self.state = next;
        reported
    }

    fn candidate(raw: Option<Position>) -> State {
        match raw {
            Some(pos) => State::Candidate { pos, stable: 1 },
            None => State::Idle,
        }
    }

    fn held(&self, pos: Position, clear: u8, raw: Option<Position>) -> (State, Option<Position>) {
        if raw == Some(pos) {
            return (State::WaitingForRelease { pos, clear: 0 }, None);
        }

        let clear = clear + 1;
        if clear >= self.release_ticks {
            debug!("release accepted at {:?}", pos);
            (State::Idle, None)
        } else {
            (State::WaitingForRelease { pos, clear }, None)
        }
    }
}

impl Default for PressTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pos(row: usize, col: usize) -> Position {
        Position::new(row, col).unwrap()
    }

    fn feed(tracker: &mut PressTracker, samples: &[Option<Position>]) -> Vec<(usize, Position)> {
        samples
            .iter()
            .enumerate()
            .filter_map(|(tick, &raw)| tracker.update(raw).map(|p| (tick, p)))
            .collect()
    }

    #[test]
    fn test_stable_press_reported_once() {
        let mut tracker = PressTracker::with_thresholds(3, 2);
        let k = Some(pos(1, 2));
        let reported = feed(&mut tracker, &[k, k, k, k, k, k, k, k]);
        assert_eq!(reported, vec![(2, pos(1, 2))]);
        assert_eq!(tracker.state(), State::WaitingForRelease { pos: pos(1, 2), clear: 0 });
    }

    #[test]
    fn test_walks_through_every_state() {
        let mut tracker = PressTracker::with_thresholds(2, 2);
        let k = Some(pos(0, 0));

        assert_eq!(tracker.state(), State::Idle);
        tracker.update(k);
        assert_eq!(tracker.state(), State::Candidate { pos: pos(0, 0), stable: 1 });
        assert_eq!(tracker.update(k), Some(pos(0, 0)));
        assert_eq!(tracker.state(), State::Confirmed(pos(0, 0)));
        tracker.update(k);
        assert_eq!(tracker.state(), State::WaitingForRelease { pos: pos(0, 0), clear: 0 });
        tracker.update(None);
        assert_eq!(tracker.state(), State::WaitingForRelease { pos: pos(0, 0), clear: 1 });
        tracker.update(None);
        assert_eq!(tracker.state(), State::Idle);
    }

    #[test]
    fn test_bounce_is_rejected() {
        let mut tracker = PressTracker::with_thresholds(3, 1);
        let k = Some(pos(2, 1));
        let reported = feed(&mut tracker, &[k, None, k, k, None, k, None, None]);
        assert!(reported.is_empty());
        assert_eq!(tracker.state(), State::Idle);
    }

    #[test]
    fn test_release_glitch_does_not_retrigger() {
        let mut tracker = PressTracker::with_thresholds(2, 3);
        let k = Some(pos(3, 3));
        // A short dropout while held must not count as release + re-press.
        let reported = feed(&mut tracker, &[k, k, k, None, None, k, k, k]);
        assert_eq!(reported, vec![(1, pos(3, 3))]);
    }

    #[test]
    fn test_press_release_press_reports_twice() {
        let mut tracker = PressTracker::with_thresholds(2, 2);
        let k = Some(pos(0, 3));
        let reported = feed(&mut tracker, &[k, k, k, None, None, k, k]);
        assert_eq!(reported, vec![(1, pos(0, 3)), (6, pos(0, 3))]);
    }

    #[test]
    fn test_switching_keys_restarts_candidate() {
        let mut tracker = PressTracker::with_thresholds(2, 1);
        let a = Some(pos(0, 0));
        let b = Some(pos(1, 1));
        let reported = feed(&mut tracker, &[a, b, a, b, b]);
        assert_eq!(reported, vec![(4, pos(1, 1))]);
    }

    #[test]
    fn test_single_sample_threshold_is_raised() {
        let mut tracker = PressTracker::with_thresholds(0, 0);
        assert_eq!(tracker.update(Some(pos(0, 1))), None);
        assert_eq!(tracker.update(Some(pos(0, 1))), Some(pos(0, 1)));
    }

    fn raw_sample() -> impl Strategy<Value = Option<Position>> {
        prop::option::of((0..crate::ROWS, 0..crate::COLS)).prop_map(|rc| rc.map(|(r, c)| pos(r, c)))
    }

    proptest! {
        #[test]
        fn report_requires_consecutive_samples(
            samples in prop::collection::vec(raw_sample(), 1..300),
            confirm in 2u8..8,
            release in 1u8..8,
        ) {
            let mut tracker = PressTracker::with_thresholds(confirm, release);
            for (tick, p) in feed(&mut tracker, &samples) {
                let window = confirm as usize;
                prop_assert!(tick + 1 >= window);
                for raw in &samples[tick + 1 - window..=tick] {
                    prop_assert_eq!(*raw, Some(p));
                }
            }
        }

        #[test]
        fn held_key_reported_exactly_once(
            row in 0..crate::ROWS,
            col in 0..crate::COLS,
            hold in 8usize..200,
        ) {
            let mut tracker = PressTracker::with_thresholds(5, 5);
            let mut samples = vec![Some(pos(row, col)); hold];
            samples.extend(vec![None; 10]);
            let reported = feed(&mut tracker, &samples);
            prop_assert_eq!(reported, vec![(4, pos(row, col))]);
            prop_assert_eq!(tracker.state(), State::Idle);
        }

        #[test]
        fn short_glitches_never_reported(
            bursts in prop::collection::vec((0..crate::ROWS, 0..crate::COLS, 1usize..4, 1usize..4), 1..40),
        ) {
            let mut tracker = PressTracker::with_thresholds(4, 1);
            let mut samples = Vec::new();
            for (row, col, on, off) in bursts {
                samples.extend(vec![Some(pos(row, col)); on]);
                samples.extend(vec![None; off]);
            }
            prop_assert!(feed(&mut tracker, &samples).is_empty());
        }
    }
}
