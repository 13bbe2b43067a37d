//! Seeded coherent noise fields sampled over (pixel, pixel, frame).
//!
//! Each field wraps a 3D simplex noise generator whose permutation table is
//! shuffled from the field's seed, so a given seed reproduces the exact same
//! values on every run and platform. Coordinates are scaled so that the
//! sampled image looks the same for a given feature size regardless of the
//! pixel resolution of the grid.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::config::{GridGeometry, NoiseFieldCfg};
use crate::grid::PixelCoordinate;

/// Skewing and unskewing factors for three dimensions.
const F3: f64 = 1.0 / 3.0;
const G3: f64 = 1.0 / 6.0;

const GRAD3: [[f64; 3]; 12] = [
    [1.0, 1.0, 0.0],
    [-1.0, 1.0, 0.0],
    [1.0, -1.0, 0.0],
    [-1.0, -1.0, 0.0],
    [1.0, 0.0, 1.0],
    [-1.0, 0.0, 1.0],
    [1.0, 0.0, -1.0],
    [-1.0, 0.0, -1.0],
    [0.0, 1.0, 1.0],
    [0.0, -1.0, 1.0],
    [0.0, 1.0, -1.0],
    [0.0, -1.0, -1.0],
];

/// 3D simplex noise with a seeded permutation table.
#[derive(Clone)]
pub struct Simplex3 {
    perm: [u8; 512],
}

impl core::fmt::Debug for Simplex3 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Simplex3")
            .field("perm_head", &&self.perm[..8])
            .finish()
    }
}

impl Simplex3 {
    pub fn new(seed: u64) -> Self {
        let mut table: [u8; 256] = core::array::from_fn(|i| i as u8);
        // ChaCha output is fixed across platforms and rand releases
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        table.shuffle(&mut rng);
        let perm: [u8; 512] = core::array::from_fn(|i| table[i & 255]);
        Self { perm }
    }

    #[inline]
    fn hash(&self, i: usize, j: usize, k: usize) -> usize {
        let p = &self.perm;
        usize::from(p[i + usize::from(p[j + usize::from(p[k])])]) % 12
    }

    /// Raw noise value, approximately in [-1, 1].
    pub fn get(&self, x: f64, y: f64, z: f64) -> f64 {
        // Skew the input space to find the containing simplex cell
        let s = (x + y + z) * F3;
        let i = (x + s).floor();
        let j = (y + s).floor();
        let k = (z + s).floor();
        let t = (i + j + k) * G3;
        let x0 = x - (i - t);
        let y0 = y - (j - t);
        let z0 = z - (k - t);

        // Which of the six tetrahedra we are in
        let (i1, j1, k1, i2, j2, k2) = if x0 >= y0 {
            if y0 >= z0 {
                (1, 0, 0, 1, 1, 0)
            } else if x0 >= z0 {
                (1, 0, 0, 1, 0, 1)
            } else {
                (0, 0, 1, 1, 0, 1)
            }
        } else if y0 < z0 {
            (0, 0, 1, 0, 1, 1)
        } else if x0 < z0 {
            (0, 1, 0, 0, 1, 1)
        } else {
            (0, 1, 0, 1, 1, 0)
        };

        let x1 = x0 - f64::from(i1) + G3;
        let y1 = y0 - f64::from(j1) + G3;
        let z1 = z0 - f64::from(k1) + G3;
        let x2 = x0 - f64::from(i2) + 2.0 * G3;
        let y2 = y0 - f64::from(j2) + 2.0 * G3;
        let z2 = z0 - f64::from(k2) + 2.0 * G3;
        let x3 = x0 - 1.0 + 3.0 * G3;
        let y3 = y0 - 1.0 + 3.0 * G3;
        let z3 = z0 - 1.0 + 3.0 * G3;

        let ii = (i as i64 & 255) as usize;
        let jj = (j as i64 & 255) as usize;
        let kk = (k as i64 & 255) as usize;
        let (i1, j1, k1) = (i1 as usize, j1 as usize, k1 as usize);
        let (i2, j2, k2) = (i2 as usize, j2 as usize, k2 as usize);

        let corners = [
            (x0, y0, z0, self.hash(ii, jj, kk)),
            (x1, y1, z1, self.hash(ii + i1, jj + j1, kk + k1)),
            (x2, y2, z2, self.hash(ii + i2, jj + j2, kk + k2)),
            (x3, y3, z3, self.hash(ii + 1, jj + 1, kk + 1)),
        ];

        let mut n = 0.0;
        for (cx, cy, cz, gi) in corners {
            let t = 0.6 - cx * cx - cy * cy - cz * cz;
            if t > 0.0 {
                let g = GRAD3[gi];
                let t2 = t * t;
                n += t2 * t2 * (g[0] * cx + g[1] * cy + g[2] * cz);
            }
        }
        32.0 * n
    }
}

/// Which of the two fields to sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldId {
    A,
    B,
}

/// One seeded field with its spatial and temporal step sizes.
#[derive(Debug, Clone)]
pub struct NoiseField {
    noise: Simplex3,
    x_step: f64,
    t_step: f64,
}

/// Spatial step per pixel: `32 / (feature_size * pcs_pixel_dist)`.
#[inline]
pub fn x_step(feature_size: f64, pcs_pixel_dist: u32) -> f64 {
    32.0 / (feature_size * f64::from(pcs_pixel_dist))
}

impl NoiseField {
    pub fn new(cfg: &NoiseFieldCfg, grid: &GridGeometry) -> Self {
        Self {
            noise: Simplex3::new(cfg.seed),
            x_step: x_step(cfg.feature_size, grid.pcs_pixel_dist),
            t_step: cfg.t_step,
        }
    }

    #[inline]
    pub fn x_step(&self) -> f64 {
        self.x_step
    }

    /// Grayscale value in [0, 1] at a pixel and frame.
    #[inline]
    pub fn sample(&self, pixel: PixelCoordinate, frame: u32) -> f64 {
        let n = self.noise.get(
            f64::from(pixel.col) * self.x_step,
            f64::from(pixel.row) * self.x_step,
            f64::from(frame) * self.t_step,
        );
        ((n + 1.0) * 0.5).clamp(0.0, 1.0)
    }
}

/// Field A and the optional field B.
#[derive(Debug, Clone)]
pub struct FieldSampler {
    a: NoiseField,
    b: Option<NoiseField>,
}

impl FieldSampler {
    pub fn new(a: &NoiseFieldCfg, b: Option<&NoiseFieldCfg>, grid: &GridGeometry) -> Self {
        Self {
            a: NoiseField::new(a, grid),
            b: b.map(|cfg| NoiseField::new(cfg, grid)),
        }
    }

    #[inline]
    pub fn has_field_b(&self) -> bool {
        self.b.is_some()
    }

    pub fn field(&self, id: FieldId) -> Option<&NoiseField> {
        match id {
            FieldId::A => Some(&self.a),
            FieldId::B => self.b.as_ref(),
        }
    }

    /// Sample one field; `None` when field B is disabled.
    #[inline]
    pub fn sample(&self, id: FieldId, pixel: PixelCoordinate, frame: u32) -> Option<f64> {
        self.field(id).map(|f| f.sample(pixel, frame))
    }

    /// Both fields at once, B skipped entirely when disabled.
    #[inline]
    pub fn sample_pair(&self, pixel: PixelCoordinate, frame: u32) -> (f64, Option<f64>) {
        (
            self.a.sample(pixel, frame),
            self.b.as_ref().map(|f| f.sample(pixel, frame)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permutation_is_a_shuffle() {
        let n = Simplex3::new(0);
        let mut seen = [false; 256];
        for &p in &n.perm[..256] {
            seen[p as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
        assert_eq!(n.perm[..256], n.perm[256..]);
    }

    #[test]
    fn seeded_tables_repeat_and_differ_by_seed() {
        assert_eq!(Simplex3::new(11).perm, Simplex3::new(11).perm);
        assert_ne!(Simplex3::new(11).perm, Simplex3::new(12).perm);
        // Shuffled, not the identity order
        assert_ne!(Simplex3::new(0).perm[..256], core::array::from_fn::<u8, 256, _>(|i| i as u8));
    }

    #[test]
    fn raw_noise_stays_near_unit_range() {
        let n = Simplex3::new(7);
        let mut lo = f64::MAX;
        let mut hi = f64::MIN;
        for i in 0..4000 {
            let f = f64::from(i);
            let v = n.get(f * 0.137, f * 0.071 - 3.0, f * 0.013);
            lo = lo.min(v);
            hi = hi.max(v);
        }
        assert!(lo > -1.1 && hi < 1.1, "range [{lo}, {hi}]");
        assert!(hi - lo > 0.5, "noise should vary, got [{lo}, {hi}]");
    }

    #[test]
    fn integer_lattice_points_are_zero() {
        // Simplex noise vanishes at skewed-lattice vertices like the origin.
        let n = Simplex3::new(42);
        assert!(n.get(0.0, 0.0, 0.0).abs() < 1e-12);
    }
}
