//! Minimum dwell-time enforcement on the per-valve time series.
//!
//! Each valve is a two-state machine (open/closed) with a counter of frames
//! spent in the accepted state. A raw flip is honored only once the accepted
//! state has been held for `min_duration` frames; earlier flips are
//! suppressed and the accepted state is extended instead. Every completed
//! run therefore lasts at least `min_duration` frames. The final run may be
//! shorter since no frames follow it.

use crate::error::{GenError, Result};
use crate::extract::ValveStates;
use crate::grid::N_VALVES;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DebounceReport {
    /// Valve-frames whose state was changed from the raw value.
    pub corrections: usize,
    /// Valves with at least one correction.
    pub valves_touched: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debouncer {
    min_duration: u32,
}

impl Debouncer {
    pub fn new(min_duration: u32) -> Self {
        Self { min_duration }
    }

    /// `min_duration <= 1` leaves every sequence untouched.
    #[inline]
    pub fn is_pass_through(&self) -> bool {
        self.min_duration <= 1
    }

    /// Correct all valves of a frame sequence in place.
    pub fn apply(&self, frames: &mut [ValveStates]) -> DebounceReport {
        let mut report = DebounceReport::default();
        if self.is_pass_through() || frames.len() < 2 {
            return report;
        }
        for valve in 0..N_VALVES {
            let mut accepted = frames[0].is_open(valve);
            let mut held: u32 = 1;
            let mut touched = false;
            for f in frames[1..].iter_mut() {
                let raw = f.is_open(valve);
                if raw != accepted && held >= self.min_duration {
                    accepted = raw;
                    held = 1;
                } else {
                    held = held.saturating_add(1);
                }
                if raw != accepted {
                    f.set(valve, accepted);
                    report.corrections += 1;
                    touched = true;
                }
            }
            if touched {
                report.valves_touched += 1;
            }
        }
        tracing::debug!(
            corrections = report.corrections,
            valves = report.valves_touched,
            min_duration = self.min_duration,
            "debounce pass done"
        );
        report
    }

    /// Debounce a single valve's raw series.
    pub fn debounce_series(&self, raw: &[bool]) -> Vec<bool> {
        let Some(&first) = raw.first() else {
            return Vec::new();
        };
        if self.is_pass_through() {
            return raw.to_vec();
        }
        let mut out = Vec::with_capacity(raw.len());
        let mut accepted = first;
        let mut held: u32 = 0;
        for &r in raw {
            if r != accepted && held >= self.min_duration {
                accepted = r;
                held = 0;
            }
            held = held.saturating_add(1);
            out.push(accepted);
        }
        out
    }
}

/// Lengths of the consecutive equal-value runs of a series.
pub fn run_lengths(series: &[bool]) -> Vec<usize> {
    let mut runs = Vec::new();
    let mut iter = series.iter();
    let Some(&first) = iter.next() else {
        return runs;
    };
    let mut current = first;
    let mut len = 1usize;
    for &v in iter {
        if v == current {
            len += 1;
        } else {
            runs.push(len);
            current = v;
            len = 1;
        }
    }
    runs.push(len);
    runs
}

/// Shortest run that is neither the first nor the last, if any.
pub fn min_interior_run(series: &[bool]) -> Option<usize> {
    let runs = run_lengths(series);
    if runs.len() < 3 {
        return None;
    }
    runs[1..runs.len() - 1].iter().copied().min()
}

/// Check that no valve holds an interior run shorter than `min` frames.
///
/// Reports the valve with the shortest offending run.
pub fn verify_min_duration(frames: &[ValveStates], min: usize) -> Result<()> {
    let worst = (0..N_VALVES)
        .filter_map(|v| min_interior_run(&valve_series(frames, v)).map(|r| (r, v)))
        .min();
    match worst {
        Some((run, valve)) if run < min => {
            Err(eyre::Report::new(GenError::RunTooShort { valve, run, min }))
        }
        _ => Ok(()),
    }
}

/// One valve's state across all frames.
pub fn valve_series(frames: &[ValveStates], valve: usize) -> Vec<bool> {
    frames.iter().map(|f| f.is_open(valve)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glitch_before_hold_elapses_is_suppressed() {
        let d = Debouncer::new(3);
        let raw = [false, true, false, false, false, false];
        assert_eq!(d.debounce_series(&raw), vec![false; 6]);
    }

    #[test]
    fn glitch_after_hold_is_extended_to_min_duration() {
        let d = Debouncer::new(3);
        let raw = [false, false, false, true, false, false, false];
        assert_eq!(
            d.debounce_series(&raw),
            vec![false, false, false, true, true, true, false]
        );
    }

    #[test]
    fn early_flip_is_delayed_not_dropped() {
        let d = Debouncer::new(3);
        let raw = [true, false, false, false, false];
        assert_eq!(d.debounce_series(&raw), vec![true, true, true, false, false]);
    }

    #[test]
    fn run_lengths_and_interior_min() {
        let s = [true, false, false, true, true, true, false];
        assert_eq!(run_lengths(&s), vec![1, 2, 3, 1]);
        assert_eq!(min_interior_run(&s), Some(2));
        assert_eq!(min_interior_run(&[true, false]), None);
        assert!(run_lengths(&[]).is_empty());
    }

    #[test]
    fn verify_reports_shortest_interior_run() {
        let mut frames = vec![ValveStates::ALL_CLOSED; 8];
        for f in &mut frames[2..4] {
            f.set(5, true);
        }
        assert!(verify_min_duration(&frames, 2).is_ok());
        let err = verify_min_duration(&frames, 3).unwrap_err();
        assert_eq!(
            err.downcast_ref::<GenError>(),
            Some(&GenError::RunTooShort {
                valve: 5,
                run: 2,
                min: 3
            })
        );
    }
}
