//! Configuration types for the generator pipeline.
//!
//! These are the runtime configuration structs used by `Generator`.
//! They are separate from the TOML-deserialized config in `jetgrid_config`.

/// Number of integer PCS coordinates along one grid axis (-7..=7).
pub const NUMEL_PCS_AXIS: u32 = 15;

/// Parameters of one coherent noise field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseFieldCfg {
    pub seed: u64,
    /// Spatial coherence length [arb. unit]. Must be > 0.
    pub feature_size: f64,
    /// Noise-space advance per frame. Must be > 0.
    pub t_step: f64,
}

/// How a grayscale frame is turned into open/closed pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThresholdPolicy {
    /// Open where `grayscale > 1 - bw_threshold`. Range: [0, 1].
    Constant(f64),
    /// Per-frame solve for the threshold that opens this fraction of pixels. Range: (0, 1).
    TargetTransparency(f64),
}

impl ThresholdPolicy {
    pub fn bw_threshold(&self) -> Option<f64> {
        match self {
            Self::Constant(v) => Some(*v),
            Self::TargetTransparency(_) => None,
        }
    }

    pub fn target_transparency(&self) -> Option<f64> {
        match self {
            Self::Constant(_) => None,
            Self::TargetTransparency(r) => Some(*r),
        }
    }
}

/// Blend of field A and field B into one grayscale value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum MixStrategy {
    /// `(a + b) / 2`
    #[default]
    Average,
    /// `(1 - weight_b) * a + weight_b * b`
    Weighted { weight_b: f64 },
}

/// Newton solver limits for target-transparency mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverCfg {
    /// Accepted |achieved - target| transparency.
    pub tolerance: f64,
    pub max_iter: u32,
}

impl Default for SolverCfg {
    fn default() -> Self {
        Self {
            tolerance: 1e-3,
            max_iter: 50,
        }
    }
}

/// Upper bound on `pcs_pixel_dist`; keeps pixel coordinates well inside `u32`.
pub const MAX_PCS_PIXEL_DIST: u32 = 1024;

/// Valve grid geometry in noise-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridGeometry {
    /// Pixel distance between adjacent integer PCS coordinates.
    pub pcs_pixel_dist: u32,
    pub numel_pcs_axis: u32,
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self {
            pcs_pixel_dist: 32,
            numel_pcs_axis: NUMEL_PCS_AXIS,
        }
    }
}

impl GridGeometry {
    /// Side length of the square noise image.
    #[inline]
    pub fn n_pixels(&self) -> u32 {
        self.pcs_pixel_dist * (self.numel_pcs_axis + 1)
    }
}

/// Complete, validated generation parameters. Built once and passed by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorCfg {
    pub n_frames: u32,
    /// Wall-clock spacing between frames [s].
    pub dt_frame: f64,
    pub field_a: NoiseFieldCfg,
    /// `None` disables mixing entirely.
    pub field_b: Option<NoiseFieldCfg>,
    pub policy: ThresholdPolicy,
    pub mix: MixStrategy,
    pub solver: SolverCfg,
    /// Minimum frames per valve state; <= 1 disables the debounce pass.
    pub min_valve_duration: u32,
    pub grid: GridGeometry,
    /// Frame-rendering threads; 0 picks the available parallelism.
    pub workers: usize,
}

impl GeneratorCfg {
    /// Frame duration in device units (milliseconds).
    #[inline]
    pub fn duration_ms(&self) -> u32 {
        crate::util::seconds_to_ms(self.dt_frame)
    }
}
