//! Generated protocol: header metadata plus the ordered, debounced frames.

use chrono::{DateTime, Local};

use crate::codec::{WireFrame, encode_states};
use crate::config::{GeneratorCfg, MixStrategy, NoiseFieldCfg, ThresholdPolicy};
use crate::error::Result;
use crate::extract::ValveStates;
use crate::grid::ValveGrid;
use crate::noise::x_step;

pub const GENERATOR_TYPE: &str = "Simplex noise";
/// Bump when the header layout or generation semantics change.
pub const GENERATOR_VERSION: &str = "1.0";

/// Column width of the header keys.
const KEY_WIDTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub index: u32,
    /// Seconds since the start of the protocol.
    pub timestamp: f64,
    pub valve_states: ValveStates,
    pub duration_ms: u32,
}

/// Generation parameters and derived constants, recorded alongside the frames.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolHeader {
    pub created: DateTime<Local>,
    pub n_frames: u32,
    pub dt_frame: f64,
    pub policy: ThresholdPolicy,
    pub mix: MixStrategy,
    pub field_a: NoiseFieldCfg,
    pub field_b: Option<NoiseFieldCfg>,
    pub min_valve_duration: u32,
    pub pcs_pixel_dist: u32,
    pub n_pixels: u32,
    pub x_step_a: f64,
    pub x_step_b: Option<f64>,
}

impl ProtocolHeader {
    pub fn new(cfg: &GeneratorCfg, created: DateTime<Local>) -> Self {
        let dist = cfg.grid.pcs_pixel_dist;
        Self {
            created,
            n_frames: cfg.n_frames,
            dt_frame: cfg.dt_frame,
            policy: cfg.policy,
            mix: cfg.mix,
            field_a: cfg.field_a,
            field_b: cfg.field_b,
            min_valve_duration: cfg.min_valve_duration,
            pcs_pixel_dist: dist,
            n_pixels: cfg.grid.n_pixels(),
            x_step_a: x_step(cfg.field_a.feature_size, dist),
            x_step_b: cfg.field_b.map(|b| x_step(b.feature_size, dist)),
        }
    }

    /// Plain-text key/value block, keys left-aligned in a fixed-width column.
    pub fn render(&self) -> String {
        fn opt(v: Option<f64>) -> String {
            v.map_or_else(|| "None".to_string(), |v| v.to_string())
        }
        let mix = match self.mix {
            MixStrategy::Average => "average".to_string(),
            MixStrategy::Weighted { weight_b } => format!("weighted (weight_b = {weight_b})"),
        };
        let b = self.field_b;
        let rows: Vec<Vec<(&str, String)>> = vec![
            vec![
                (
                    "TYPE",
                    format!("{GENERATOR_TYPE} v{GENERATOR_VERSION}"),
                ),
                (
                    "DATE",
                    self.created.format("%Y-%m-%d %H:%M:%S").to_string(),
                ),
            ],
            vec![
                ("N_FRAMES", self.n_frames.to_string()),
                ("DT_FRAME", format!("{} s", self.dt_frame)),
            ],
            vec![
                ("BW_THRESHOLD", opt(self.policy.bw_threshold())),
                ("TARGET_TRANSPARENCY", opt(self.policy.target_transparency())),
                ("MIX", mix),
            ],
            vec![
                ("FEATURE_SIZE_A", self.field_a.feature_size.to_string()),
                (
                    "FEATURE_SIZE_B",
                    b.map_or_else(|| "0".to_string(), |b| b.feature_size.to_string()),
                ),
            ],
            vec![
                ("T_STEP_A", self.field_a.t_step.to_string()),
                (
                    "T_STEP_B",
                    b.map_or_else(|| "None".to_string(), |b| b.t_step.to_string()),
                ),
            ],
            vec![
                ("SEED_A", self.field_a.seed.to_string()),
                (
                    "SEED_B",
                    b.map_or_else(|| "None".to_string(), |b| b.seed.to_string()),
                ),
            ],
            vec![(
                "MIN_VALVE_DURATION",
                format!("{} frames", self.min_valve_duration),
            )],
            vec![
                ("PCS_PIXEL_DIST", self.pcs_pixel_dist.to_string()),
                ("N_PIXELS", self.n_pixels.to_string()),
                ("X_STEP_A", self.x_step_a.to_string()),
                (
                    "X_STEP_B",
                    self.x_step_b.map_or_else(|| "0".to_string(), |v| v.to_string()),
                ),
            ],
        ];

        let mut out = String::new();
        for group in rows {
            for (key, value) in group {
                out.push_str(&format!("{key:<KEY_WIDTH$}{value}\n"));
            }
            out.push('\n');
        }
        out
    }
}

/// Immutable generation result.
#[derive(Debug, Clone)]
pub struct Protocol {
    header: ProtocolHeader,
    frames: Vec<Frame>,
    grid: ValveGrid,
}

impl Protocol {
    pub fn new(header: ProtocolHeader, frames: Vec<Frame>, grid: ValveGrid) -> Self {
        Self {
            header,
            frames,
            grid,
        }
    }

    #[inline]
    pub fn header(&self) -> &ProtocolHeader {
        &self.header
    }

    #[inline]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    #[inline]
    pub fn grid(&self) -> &ValveGrid {
        &self.grid
    }

    /// Concatenated wire encoding of every frame.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.frames.len() * 64);
        for f in &self.frames {
            encode_states(f.duration_ms, &f.valve_states, &self.grid, &mut out)?;
        }
        Ok(out)
    }

    /// Frames as the device sees them (open valves as PCS points).
    pub fn wire_frames(&self) -> Vec<WireFrame> {
        let valves = self.grid.valves();
        self.frames
            .iter()
            .map(|f| WireFrame {
                duration_ms: f.duration_ms,
                points: f.valve_states.iter_open().map(|i| valves[i].pcs).collect(),
            })
            .collect()
    }

    /// Mean fraction of open valves over all frames.
    pub fn mean_transparency(&self) -> f64 {
        if self.frames.is_empty() {
            return 0.0;
        }
        self.frames
            .iter()
            .map(|f| f.valve_states.transparency())
            .sum::<f64>()
            / self.frames.len() as f64
    }
}
