//! Per-frame valve bitset and its extraction from a black/white image.

use crate::grid::{N_VALVES, ValveGrid};
use crate::image::BinaryImage;

/// Open/closed state of all 112 valves; bit `i` set means valve `i` is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ValveStates(u128);

impl ValveStates {
    pub const ALL_CLOSED: Self = Self(0);

    pub fn all_open() -> Self {
        Self((1u128 << N_VALVES) - 1)
    }

    #[inline]
    pub fn from_bits(bits: u128) -> Self {
        Self(bits & Self::all_open().0)
    }

    #[inline]
    pub fn bits(&self) -> u128 {
        self.0
    }

    #[inline]
    pub fn is_open(&self, valve: usize) -> bool {
        debug_assert!(valve < N_VALVES);
        (self.0 >> valve) & 1 == 1
    }

    #[inline]
    pub fn set(&mut self, valve: usize, open: bool) {
        debug_assert!(valve < N_VALVES);
        if open {
            self.0 |= 1u128 << valve;
        } else {
            self.0 &= !(1u128 << valve);
        }
    }

    #[inline]
    pub fn count_open(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Fraction of valves open.
    #[inline]
    pub fn transparency(&self) -> f64 {
        self.count_open() as f64 / N_VALVES as f64
    }

    /// Indices of open valves, ascending.
    pub fn iter_open(&self) -> impl Iterator<Item = usize> + '_ {
        (0..N_VALVES).filter(move |&v| self.is_open(v))
    }
}

/// Sample the binary image at every valve pixel.
pub fn extract(img: &BinaryImage, grid: &ValveGrid) -> ValveStates {
    let mut states = ValveStates::ALL_CLOSED;
    for v in grid.valves() {
        states.set(v.index, img.is_open(v.pixel));
    }
    states
}
