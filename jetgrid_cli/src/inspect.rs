//! Offline check of an exported binary protocol.

use std::path::Path;

use eyre::{Result, WrapErr};
use jetgrid_core::config::GridGeometry;
use jetgrid_core::debounce::{min_interior_run, valve_series, verify_min_duration};
use jetgrid_core::{N_VALVES, ValveGrid, ValveStates, decode_stream};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub frames: usize,
    pub total_duration_ms: u64,
    pub min_open: usize,
    pub max_open: usize,
    pub mean_transparency: f64,
    /// Shortest run that is neither first nor last, over all valves.
    pub shortest_interior_run: Option<usize>,
    pub shortest_run_valve: Option<usize>,
}

pub fn run_inspect(path: &Path, min_run: Option<usize>) -> Result<InspectReport> {
    let bytes = std::fs::read(path).wrap_err_with(|| format!("read {}", path.display()))?;
    let wire = decode_stream(&bytes)?;
    // The valve layout does not depend on the pixel spacing
    let grid = ValveGrid::new(&GridGeometry::default())?;
    let states = wire
        .iter()
        .map(|f| f.to_states(&grid))
        .collect::<Result<Vec<ValveStates>>>()?;

    let shortest = (0..N_VALVES)
        .filter_map(|v| min_interior_run(&valve_series(&states, v)).map(|r| (r, v)))
        .min();
    let open: Vec<usize> = states.iter().map(ValveStates::count_open).collect();
    let report = InspectReport {
        frames: wire.len(),
        total_duration_ms: wire.iter().map(|f| u64::from(f.duration_ms)).sum(),
        min_open: open.iter().copied().min().unwrap_or(0),
        max_open: open.iter().copied().max().unwrap_or(0),
        mean_transparency: if states.is_empty() {
            0.0
        } else {
            states.iter().map(ValveStates::transparency).sum::<f64>() / states.len() as f64
        },
        shortest_interior_run: shortest.map(|(r, _)| r),
        shortest_run_valve: shortest.map(|(_, v)| v),
    };
    tracing::debug!(frames = report.frames, "protocol decoded");

    if let Some(min) = min_run {
        verify_min_duration(&states, min)?;
    }
    Ok(report)
}
