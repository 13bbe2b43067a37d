#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the jetting-grid protocol generator.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - Field B is optional: an absent `[field_b]` table or `feature_size = 0`
//!   disables it.
//! - Exactly one threshold selector (`bw_threshold` or `target_transparency`)
//!   must be set.
use eyre::WrapErr;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Frame count the microcontroller can hold in memory.
pub const DEVICE_MAX_FRAMES: u32 = 5000;

#[derive(Debug, Deserialize)]
pub struct ProtocolCfg {
    /// Number of frames (protocol lines) to generate.
    pub n_frames: u32,
    /// Time interval between frames [s].
    pub dt_frame: f64,
    /// Minimum number of frames a valve holds a state. 0 or 1 disables.
    #[serde(default)]
    pub min_valve_duration: u32,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct FieldCfg {
    /// Coherent feature size [arb. unit, try ~50]. 0 disables the field (B only).
    pub feature_size: f64,
    /// Time step per frame [arb. unit, try ~0.1].
    pub t_step: f64,
    pub seed: u64,
}

impl FieldCfg {
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.feature_size != 0.0
    }
}

#[derive(Debug, Deserialize, Default, Clone, Copy)]
#[serde(default)]
pub struct ThresholdCfg {
    /// Constant threshold: grayscale values above `1 - bw_threshold` open a valve.
    pub bw_threshold: Option<f64>,
    /// Per-frame solve for the threshold giving this open-area ratio.
    pub target_transparency: Option<f64>,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MixStrategyKind {
    #[default]
    Average,
    Weighted,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct MixCfg {
    pub strategy: MixStrategyKind,
    /// Weight of field B for the "weighted" strategy (0.0..=1.0).
    pub weight_b: f64,
}

impl Default for MixCfg {
    fn default() -> Self {
        Self {
            strategy: MixStrategyKind::Average,
            weight_b: 0.5,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
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

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct GridCfg {
    /// Pixel distance between adjacent integer PCS coordinates.
    pub pcs_pixel_dist: u32,
}

impl Default for GridCfg {
    fn default() -> Self {
        Self { pcs_pixel_dist: 32 }
    }
}

#[derive(Debug, Deserialize, Default, Clone, Copy)]
#[serde(default)]
pub struct GeneratorCfg {
    /// Worker threads for frame rendering; 0 picks the available parallelism.
    pub workers: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExportCfg {
    pub subfolder: String,
    /// File name without extension; also the program name sent to the device.
    pub filename: String,
}

impl Default for ExportCfg {
    fn default() -> Self {
        Self {
            subfolder: "protocols".to_string(),
            filename: "simplex_001".to_string(),
        }
    }
}

impl ExportCfg {
    /// Export path without extension, relative to `base`.
    pub fn path_no_ext(&self, base: &Path) -> PathBuf {
        let sub = self.subfolder.trim();
        if sub.is_empty() {
            base.join(&self.filename)
        } else {
            base.join(sub).join(&self.filename)
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub protocol: ProtocolCfg,
    pub field_a: FieldCfg,
    /// Optional second field mixed into field A.
    #[serde(default)]
    pub field_b: Option<FieldCfg>,
    #[serde(default)]
    pub threshold: ThresholdCfg,
    #[serde(default)]
    pub mix: MixCfg,
    #[serde(default)]
    pub solver: SolverCfg,
    #[serde(default)]
    pub grid: GridCfg,
    #[serde(default)]
    pub generator: GeneratorCfg,
    #[serde(default)]
    pub export: ExportCfg,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    /// Field B when present and enabled.
    pub fn field_b_enabled(&self) -> Option<&FieldCfg> {
        self.field_b.as_ref().filter(|b| b.is_enabled())
    }
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text =
        std::fs::read_to_string(path).wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = load_toml(&text).wrap_err_with(|| format!("parse config {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

fn validate_field(name: &str, f: &FieldCfg, optional: bool) -> eyre::Result<()> {
    if !f.feature_size.is_finite() || f.feature_size < 0.0 {
        eyre::bail!("{name}.feature_size must be a finite value >= 0");
    }
    if f.feature_size == 0.0 && !optional {
        eyre::bail!("{name}.feature_size must be > 0");
    }
    if f.is_enabled() && !(f.t_step.is_finite() && f.t_step > 0.0) {
        eyre::bail!("{name}.t_step must be > 0");
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Protocol
        if self.protocol.n_frames == 0 {
            eyre::bail!("protocol.n_frames must be >= 1");
        }
        if !(self.protocol.dt_frame.is_finite() && self.protocol.dt_frame > 0.0) {
            eyre::bail!("protocol.dt_frame must be > 0");
        }
        let dt_ms = (self.protocol.dt_frame * 1000.0).round();
        if dt_ms < 1.0 {
            eyre::bail!("protocol.dt_frame must be >= 0.001 s (device resolution is 1 ms)");
        }
        if dt_ms > f64::from(u32::MAX) {
            eyre::bail!("protocol.dt_frame is unreasonably large");
        }

        // Fields
        validate_field("field_a", &self.field_a, false)?;
        if let Some(b) = &self.field_b {
            validate_field("field_b", b, true)?;
        }

        // Threshold: exactly one selector
        match (self.threshold.bw_threshold, self.threshold.target_transparency) {
            (Some(_), Some(_)) => eyre::bail!(
                "threshold: set either bw_threshold or target_transparency, not both"
            ),
            (None, None) => {
                eyre::bail!("threshold: one of bw_threshold or target_transparency is required")
            }
            (Some(bw), None) => {
                if !(0.0..=1.0).contains(&bw) {
                    eyre::bail!("threshold.bw_threshold must be in [0.0, 1.0]");
                }
            }
            (None, Some(tt)) => {
                if !(tt > 0.0 && tt < 1.0) {
                    eyre::bail!("threshold.target_transparency must be in (0.0, 1.0)");
                }
            }
        }

        // Mix
        if !(0.0..=1.0).contains(&self.mix.weight_b) {
            eyre::bail!("mix.weight_b must be in [0.0, 1.0]");
        }

        // Solver
        if !(self.solver.tolerance.is_finite() && self.solver.tolerance > 0.0) {
            eyre::bail!("solver.tolerance must be > 0");
        }
        if self.solver.max_iter == 0 {
            eyre::bail!("solver.max_iter must be >= 1");
        }

        // Grid
        if self.grid.pcs_pixel_dist == 0 {
            eyre::bail!("grid.pcs_pixel_dist must be > 0");
        }
        if self.grid.pcs_pixel_dist > 1024 {
            eyre::bail!("grid.pcs_pixel_dist is unreasonably large (>1024)");
        }

        // Export
        if self.export.filename.trim().is_empty() {
            eyre::bail!("export.filename must not be empty");
        }

        Ok(())
    }
}
