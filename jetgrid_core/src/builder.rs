//! Type-state builder for `Generator` and the shared validation path.
//!
//! The builder enforces at compile time that noise field A and a threshold
//! policy are provided before `build()` is available. `try_build()` is always
//! available for dynamic checks. Setting both threshold selectors is caught at
//! build time as a conflicting configuration.

use std::marker::PhantomData;

use chrono::{DateTime, Local};

use crate::config::*;
use crate::error::{BuildError, Result};
use crate::generator::Generator;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Generator`. All fields are validated on `build()`.
pub struct GeneratorBuilder<F, P> {
    n_frames: u32,
    dt_frame: f64,
    field_a: Option<NoiseFieldCfg>,
    field_b: Option<NoiseFieldCfg>,
    bw_threshold: Option<f64>,
    target_transparency: Option<f64>,
    mix: MixStrategy,
    solver: SolverCfg,
    min_valve_duration: u32,
    grid: GridGeometry,
    workers: usize,
    created: Option<DateTime<Local>>,
    _f: PhantomData<F>,
    _p: PhantomData<P>,
}

impl Default for GeneratorBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            n_frames: 5000,
            dt_frame: 0.05,
            field_a: None,
            field_b: None,
            bw_threshold: None,
            target_transparency: None,
            mix: MixStrategy::default(),
            solver: SolverCfg::default(),
            min_valve_duration: 0,
            grid: GridGeometry::default(),
            workers: 0,
            created: None,
            _f: PhantomData,
            _p: PhantomData,
        }
    }
}

impl<F, P> GeneratorBuilder<F, P> {
    fn retype<F2, P2>(self) -> GeneratorBuilder<F2, P2> {
        GeneratorBuilder {
            n_frames: self.n_frames,
            dt_frame: self.dt_frame,
            field_a: self.field_a,
            field_b: self.field_b,
            bw_threshold: self.bw_threshold,
            target_transparency: self.target_transparency,
            mix: self.mix,
            solver: self.solver,
            min_valve_duration: self.min_valve_duration,
            grid: self.grid,
            workers: self.workers,
            created: self.created,
            _f: PhantomData,
            _p: PhantomData,
        }
    }

    /// Frame count and spacing in seconds.
    pub fn with_frames(mut self, n_frames: u32, dt_frame: f64) -> Self {
        self.n_frames = n_frames;
        self.dt_frame = dt_frame;
        self
    }

    pub fn with_field_a(mut self, cfg: NoiseFieldCfg) -> GeneratorBuilder<Set, P> {
        self.field_a = Some(cfg);
        self.retype()
    }

    /// `None` disables field B (no mixing).
    pub fn with_field_b(mut self, cfg: Option<NoiseFieldCfg>) -> Self {
        self.field_b = cfg;
        self
    }

    pub fn with_bw_threshold(mut self, bw: f64) -> GeneratorBuilder<F, Set> {
        self.bw_threshold = Some(bw);
        self.retype()
    }

    pub fn with_target_transparency(mut self, ratio: f64) -> GeneratorBuilder<F, Set> {
        self.target_transparency = Some(ratio);
        self.retype()
    }

    pub fn with_policy(mut self, policy: ThresholdPolicy) -> GeneratorBuilder<F, Set> {
        match policy {
            ThresholdPolicy::Constant(bw) => self.bw_threshold = Some(bw),
            ThresholdPolicy::TargetTransparency(r) => self.target_transparency = Some(r),
        }
        self.retype()
    }

    pub fn with_mix(mut self, mix: MixStrategy) -> Self {
        self.mix = mix;
        self
    }

    pub fn with_solver(mut self, solver: SolverCfg) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_min_valve_duration(mut self, frames: u32) -> Self {
        self.min_valve_duration = frames;
        self
    }

    pub fn with_grid(mut self, grid: GridGeometry) -> Self {
        self.grid = grid;
        self
    }

    /// Frame-rendering threads; 0 picks the available parallelism.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Pin the header timestamp (defaults to the time of `run()`).
    pub fn with_timestamp(mut self, created: DateTime<Local>) -> Self {
        self.created = Some(created);
        self
    }

    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<Generator> {
        let field_a = self
            .field_a
            .ok_or_else(|| eyre::Report::new(BuildError::MissingFieldA))?;
        let policy = match (self.bw_threshold, self.target_transparency) {
            (Some(_), Some(_)) => {
                return Err(eyre::Report::new(BuildError::ConflictingThreshold));
            }
            (None, None) => return Err(eyre::Report::new(BuildError::MissingThreshold)),
            (Some(bw), None) => ThresholdPolicy::Constant(bw),
            (None, Some(r)) => ThresholdPolicy::TargetTransparency(r),
        };
        let cfg = GeneratorCfg {
            n_frames: self.n_frames,
            dt_frame: self.dt_frame,
            field_a,
            field_b: self.field_b,
            policy,
            mix: self.mix,
            solver: self.solver,
            min_valve_duration: self.min_valve_duration,
            grid: self.grid,
            workers: self.workers,
        };
        let mut generator = Generator::new(cfg)?;
        if let Some(ts) = self.created {
            generator.set_timestamp(ts);
        }
        Ok(generator)
    }
}

impl GeneratorBuilder<Set, Set> {
    /// Build when field A and a threshold policy are set.
    pub fn build(self) -> Result<Generator> {
        self.try_build()
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

fn validate_field(f: &NoiseFieldCfg, size_msg: &'static str, step_msg: &'static str) -> Result<()> {
    if !(f.feature_size.is_finite() && f.feature_size > 0.0) {
        return Err(invalid(size_msg));
    }
    if !(f.t_step.is_finite() && f.t_step > 0.0) {
        return Err(invalid(step_msg));
    }
    Ok(())
}

/// Validate a complete configuration before any generation work starts.
///
/// This is the single source of truth for validation, used by both
/// `GeneratorBuilder::try_build()` and `Generator::new()`.
pub fn validate(cfg: &GeneratorCfg) -> Result<()> {
    if cfg.n_frames == 0 {
        return Err(invalid("n_frames must be >= 1"));
    }
    if !(cfg.dt_frame.is_finite() && cfg.dt_frame > 0.0) {
        return Err(invalid("dt_frame must be > 0"));
    }
    if cfg.duration_ms() == 0 {
        return Err(invalid("dt_frame must be >= 1 ms"));
    }
    validate_field(
        &cfg.field_a,
        "field A feature_size must be > 0",
        "field A t_step must be > 0",
    )?;
    if let Some(b) = &cfg.field_b {
        validate_field(
            b,
            "field B feature_size must be > 0 (use None to disable)",
            "field B t_step must be > 0",
        )?;
    }
    match cfg.policy {
        ThresholdPolicy::Constant(bw) => {
            if !(0.0..=1.0).contains(&bw) {
                return Err(invalid("bw_threshold must be in [0, 1]"));
            }
        }
        ThresholdPolicy::TargetTransparency(r) => {
            if !(r > 0.0 && r < 1.0) {
                return Err(invalid("target_transparency must be in (0, 1)"));
            }
        }
    }
    if let MixStrategy::Weighted { weight_b } = cfg.mix
        && !(0.0..=1.0).contains(&weight_b)
    {
        return Err(invalid("weight_b must be in [0, 1]"));
    }
    if !(cfg.solver.tolerance.is_finite() && cfg.solver.tolerance > 0.0) {
        return Err(invalid("solver tolerance must be > 0"));
    }
    if cfg.solver.max_iter == 0 {
        return Err(invalid("solver max_iter must be >= 1"));
    }
    if cfg.grid.pcs_pixel_dist == 0 {
        return Err(invalid("pcs_pixel_dist must be > 0"));
    }
    if cfg.grid.pcs_pixel_dist > MAX_PCS_PIXEL_DIST {
        return Err(invalid("pcs_pixel_dist must be <= 1024"));
    }
    Ok(())
}
