//! `From` implementations bridging `jetgrid_config` types to `jetgrid_core` types.

use crate::config::{GeneratorCfg, GridGeometry, MixStrategy, NoiseFieldCfg, SolverCfg};
use crate::config::{NUMEL_PCS_AXIS, ThresholdPolicy};
use crate::error::BuildError;

// ── NoiseFieldCfg ────────────────────────────────────────────────────────────

impl From<&jetgrid_config::FieldCfg> for NoiseFieldCfg {
    fn from(c: &jetgrid_config::FieldCfg) -> Self {
        Self {
            seed: c.seed,
            feature_size: c.feature_size,
            t_step: c.t_step,
        }
    }
}

// ── MixStrategy ──────────────────────────────────────────────────────────────

impl From<&jetgrid_config::MixCfg> for MixStrategy {
    fn from(c: &jetgrid_config::MixCfg) -> Self {
        match c.strategy {
            jetgrid_config::MixStrategyKind::Average => Self::Average,
            jetgrid_config::MixStrategyKind::Weighted => Self::Weighted {
                weight_b: c.weight_b,
            },
        }
    }
}

// ── SolverCfg ────────────────────────────────────────────────────────────────

impl From<&jetgrid_config::SolverCfg> for SolverCfg {
    fn from(c: &jetgrid_config::SolverCfg) -> Self {
        Self {
            tolerance: c.tolerance,
            max_iter: c.max_iter,
        }
    }
}

// ── GridGeometry ─────────────────────────────────────────────────────────────

impl From<&jetgrid_config::GridCfg> for GridGeometry {
    fn from(c: &jetgrid_config::GridCfg) -> Self {
        Self {
            pcs_pixel_dist: c.pcs_pixel_dist,
            numel_pcs_axis: NUMEL_PCS_AXIS,
        }
    }
}

// ── ThresholdPolicy ──────────────────────────────────────────────────────────

impl TryFrom<&jetgrid_config::ThresholdCfg> for ThresholdPolicy {
    type Error = BuildError;

    fn try_from(c: &jetgrid_config::ThresholdCfg) -> Result<Self, Self::Error> {
        match (c.bw_threshold, c.target_transparency) {
            (Some(bw), None) => Ok(Self::Constant(bw)),
            (None, Some(r)) => Ok(Self::TargetTransparency(r)),
            (Some(_), Some(_)) => Err(BuildError::ConflictingThreshold),
            (None, None) => Err(BuildError::MissingThreshold),
        }
    }
}

// ── GeneratorCfg ─────────────────────────────────────────────────────────────

impl TryFrom<&jetgrid_config::Config> for GeneratorCfg {
    type Error = BuildError;

    fn try_from(c: &jetgrid_config::Config) -> Result<Self, Self::Error> {
        Ok(Self {
            n_frames: c.protocol.n_frames,
            dt_frame: c.protocol.dt_frame,
            field_a: (&c.field_a).into(),
            field_b: c.field_b_enabled().map(NoiseFieldCfg::from),
            policy: ThresholdPolicy::try_from(&c.threshold)?,
            mix: (&c.mix).into(),
            solver: (&c.solver).into(),
            min_valve_duration: c.protocol.min_valve_duration,
            grid: (&c.grid).into(),
            workers: c.generator.workers,
        })
    }
}
