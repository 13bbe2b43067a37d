//! Fixed mapping from valve index to noise-image pixel and PCS coordinate.
//!
//! The jetting grid is a 15×15 lattice of integer PCS (Protocol Coordinate
//! System) points, x and y in [-7, 7]. Only the checkerboard cells with odd
//! `x + y` carry a valve, giving 112 valves. Valve indices run row-major over
//! the lattice, starting at the top-left (x = -7, y = +7); they are not the
//! valve numbers as laid out in the lab.

use crate::config::{GridGeometry, MAX_PCS_PIXEL_DIST, NUMEL_PCS_AXIS};
use crate::error::{BuildError, Result};

/// Valves on the fixed 15×15 grid.
pub const N_VALVES: usize = 112;
pub const PCS_X_MIN: i8 = -7;
pub const PCS_X_MAX: i8 = 7;
pub const PCS_Y_MIN: i8 = -7;
pub const PCS_Y_MAX: i8 = 7;

/// Pixel location inside the square noise image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelCoordinate {
    pub row: u32,
    pub col: u32,
}

/// Signed grid coordinate of a valve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PcsCoordinate {
    pub x: i8,
    pub y: i8,
}

impl PcsCoordinate {
    pub const fn new(x: i8, y: i8) -> Self {
        Self { x, y }
    }

    /// Inside the [-7, 7]² lattice.
    #[inline]
    pub fn in_range(&self) -> bool {
        (PCS_X_MIN..=PCS_X_MAX).contains(&self.x) && (PCS_Y_MIN..=PCS_Y_MAX).contains(&self.y)
    }

    /// A valve sits on this point (checkerboard rule).
    #[inline]
    pub fn is_valve(&self) -> bool {
        self.in_range() && (i16::from(self.x) + i16::from(self.y)).rem_euclid(2) == 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Valve {
    pub index: usize,
    pub pixel: PixelCoordinate,
    pub pcs: PcsCoordinate,
}

/// Immutable valve layout, computed once from the grid geometry.
#[derive(Debug, Clone)]
pub struct ValveGrid {
    geometry: GridGeometry,
    valves: Vec<Valve>,
}

impl ValveGrid {
    pub fn new(geometry: &GridGeometry) -> Result<Self> {
        if geometry.pcs_pixel_dist == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "pcs_pixel_dist must be > 0",
            )));
        }
        if geometry.pcs_pixel_dist > MAX_PCS_PIXEL_DIST {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "pcs_pixel_dist must be <= 1024",
            )));
        }
        if geometry.numel_pcs_axis != NUMEL_PCS_AXIS {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "numel_pcs_axis must match the 15x15 valve grid",
            )));
        }

        let n = geometry.numel_pcs_axis;
        let dist = geometry.pcs_pixel_dist;
        // Pixel centers of the integer PCS coordinates along one axis
        let px = |k: u32| dist - 1 + k * dist;
        let half = (n / 2) as i8;

        let mut valves = Vec::with_capacity(N_VALVES);
        for r in 0..n {
            for c in 0..n {
                if (r * n + c) % 2 == 0 {
                    continue;
                }
                valves.push(Valve {
                    index: valves.len(),
                    pixel: PixelCoordinate {
                        row: px(r),
                        col: px(c),
                    },
                    pcs: PcsCoordinate {
                        x: c as i8 - half,
                        y: half - r as i8,
                    },
                });
            }
        }
        debug_assert_eq!(valves.len(), N_VALVES);

        tracing::debug!(
            valves = valves.len(),
            n_pixels = geometry.n_pixels(),
            "valve grid mapped"
        );
        Ok(Self {
            geometry: *geometry,
            valves,
        })
    }

    #[inline]
    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// Side length of the noise image.
    #[inline]
    pub fn n_pixels(&self) -> u32 {
        self.geometry.n_pixels()
    }

    #[inline]
    pub fn valves(&self) -> &[Valve] {
        &self.valves
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.valves.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.valves.is_empty()
    }

    /// Valve index for a PCS point, or `None` when no valve sits there.
    pub fn index_of(&self, pcs: PcsCoordinate) -> Option<usize> {
        if !pcs.is_valve() {
            return None;
        }
        let n = self.geometry.numel_pcs_axis as usize;
        let half = (n / 2) as i16;
        let r = (half - i16::from(pcs.y)) as usize;
        let c = (i16::from(pcs.x) + half) as usize;
        Some((r * n + c) / 2)
    }
}
