//! Two-phase protocol generation.
//!
//! Phase 1 renders, thresholds and extracts every frame. Frames are
//! independent, so workers claim frame indices round-robin and send results
//! back over a channel; the collector reassembles them by index. Phase 2
//! walks the whole ordered sequence once per valve to enforce the minimum
//! dwell time, then the frames are timestamped and wrapped in a `Protocol`.
//!
//! Output is a pure function of the configuration: the worker count only
//! changes wall-clock time.

use chrono::{DateTime, Local};
use crossbeam_channel as xch;

use crate::builder::{self, GeneratorBuilder, Missing};
use crate::config::GeneratorCfg;
use crate::debounce::{DebounceReport, Debouncer};
use crate::error::{GenError, Result};
use crate::extract::{ValveStates, extract};
use crate::grid::ValveGrid;
use crate::image::GrayImage;
use crate::mixer::FieldMixer;
use crate::noise::FieldSampler;
use crate::protocol::{Frame, Protocol, ProtocolHeader};
use crate::threshold::{Solution, ThresholdSolver};
use crate::util::resolve_workers;

/// Phase-1 result of a single frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOutcome {
    pub states: ValveStates,
    pub solution: Solution,
    /// Open-pixel fraction of the whole binary image.
    pub pixel_transparency: f64,
}

/// Per-frame diagnostics of a finished run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub index: u32,
    pub threshold: f64,
    pub pixel_transparency: f64,
    pub solver_iterations: u32,
    pub solver_converged: bool,
    /// Open valves before the debounce pass.
    pub raw_open: usize,
    /// Open valves in the emitted frame.
    pub open: usize,
}

/// Everything a generation run produces.
#[derive(Debug, Clone)]
pub struct Generation {
    pub protocol: Protocol,
    pub stats: Vec<FrameStats>,
    pub debounce: DebounceReport,
    /// Frames whose threshold solve hit `max_iter`.
    pub unconverged: usize,
}

pub struct Generator {
    cfg: GeneratorCfg,
    grid: ValveGrid,
    sampler: FieldSampler,
    mixer: FieldMixer,
    solver: ThresholdSolver,
    debouncer: Debouncer,
    created: Option<DateTime<Local>>,
}

impl core::fmt::Debug for Generator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Generator")
            .field("cfg", &self.cfg)
            .field("created", &self.created)
            .finish_non_exhaustive()
    }
}

impl Generator {
    pub fn builder() -> GeneratorBuilder<Missing, Missing> {
        GeneratorBuilder::default()
    }

    /// Validate `cfg` and prepare the noise fields and grid.
    pub fn new(cfg: GeneratorCfg) -> Result<Self> {
        builder::validate(&cfg)?;
        let grid = ValveGrid::new(&cfg.grid)?;
        let sampler = FieldSampler::new(&cfg.field_a, cfg.field_b.as_ref(), &cfg.grid);
        Ok(Self {
            grid,
            sampler,
            mixer: FieldMixer::new(cfg.mix),
            solver: ThresholdSolver::new(cfg.policy, cfg.solver),
            debouncer: Debouncer::new(cfg.min_valve_duration),
            created: None,
            cfg,
        })
    }

    pub(crate) fn set_timestamp(&mut self, created: DateTime<Local>) {
        self.created = Some(created);
    }

    #[inline]
    pub fn cfg(&self) -> &GeneratorCfg {
        &self.cfg
    }

    #[inline]
    pub fn grid(&self) -> &ValveGrid {
        &self.grid
    }

    /// Mixed grayscale image of one frame.
    pub fn render_frame(&self, frame: u32) -> GrayImage {
        GrayImage::render(&self.sampler, &self.mixer, self.grid.n_pixels(), frame)
    }

    /// Phase 1 for one frame: render, threshold, extract.
    pub fn evaluate_frame(&self, frame: u32) -> FrameOutcome {
        let gray = self.render_frame(frame);
        let (bin, solution) = self.solver.binarize(&gray);
        tracing::debug!(
            frame,
            threshold = solution.threshold,
            achieved = solution.transparency,
            iterations = solution.iterations,
            "frame evaluated"
        );
        FrameOutcome {
            states: extract(&bin, &self.grid),
            solution,
            pixel_transparency: bin.transparency(),
        }
    }

    /// Phase 1 over all frames, in frame order.
    pub fn evaluate_all(&self) -> Result<Vec<FrameOutcome>> {
        let n = self.cfg.n_frames as usize;
        let workers = resolve_workers(self.cfg.workers, n);
        tracing::debug!(frames = n, workers, "rendering frames");
        if workers == 1 {
            return Ok((0..self.cfg.n_frames)
                .map(|i| self.evaluate_frame(i))
                .collect());
        }

        let mut slots: Vec<Option<FrameOutcome>> = (0..n).map(|_| None).collect();
        let (tx, rx) = xch::unbounded::<(usize, FrameOutcome)>();
        std::thread::scope(|s| {
            for w in 0..workers {
                let tx = tx.clone();
                s.spawn(move || {
                    let mut i = w;
                    while i < n {
                        // Receiver only disappears if the collector panicked
                        if tx.send((i, self.evaluate_frame(i as u32))).is_err() {
                            break;
                        }
                        i += workers;
                    }
                });
            }
            drop(tx);
            for (i, outcome) in rx.iter() {
                slots[i] = Some(outcome);
            }
        });

        slots
            .into_iter()
            .enumerate()
            .map(|(i, o)| {
                o.ok_or_else(|| {
                    eyre::Report::new(GenError::Invariant(format!(
                        "frame {i} was never rendered"
                    )))
                })
            })
            .collect()
    }

    /// Run both phases and assemble the protocol.
    pub fn run(&self) -> Result<Generation> {
        let outcomes = self.evaluate_all()?;

        let mut unconverged = 0usize;
        for (i, o) in outcomes.iter().enumerate() {
            if !o.solution.converged {
                unconverged += 1;
                tracing::warn!(
                    frame = i,
                    threshold = o.solution.threshold,
                    achieved = o.solution.transparency,
                    target = self.cfg.policy.target_transparency(),
                    iterations = o.solution.iterations,
                    "threshold solver did not converge; using best threshold"
                );
            }
        }

        let raw: Vec<ValveStates> = outcomes.iter().map(|o| o.states).collect();
        let mut states = raw.clone();
        let debounce = self.debouncer.apply(&mut states);

        let duration_ms = self.cfg.duration_ms();
        let frames: Vec<Frame> = states
            .iter()
            .enumerate()
            .map(|(i, s)| Frame {
                index: i as u32,
                timestamp: i as f64 * self.cfg.dt_frame,
                valve_states: *s,
                duration_ms,
            })
            .collect();

        let stats = outcomes
            .iter()
            .zip(&frames)
            .map(|(o, f)| FrameStats {
                index: f.index,
                threshold: o.solution.threshold,
                pixel_transparency: o.pixel_transparency,
                solver_iterations: o.solution.iterations,
                solver_converged: o.solution.converged,
                raw_open: o.states.count_open(),
                open: f.valve_states.count_open(),
            })
            .collect();

        let created = self.created.unwrap_or_else(Local::now);
        let header = ProtocolHeader::new(&self.cfg, created);
        let protocol = Protocol::new(header, frames, self.grid.clone());
        tracing::info!(
            frames = protocol.frames().len(),
            mean_transparency = protocol.mean_transparency(),
            corrections = debounce.corrections,
            unconverged,
            "protocol generated"
        );
        Ok(Generation {
            protocol,
            stats,
            debounce,
            unconverged,
        })
    }
}
