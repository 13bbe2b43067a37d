//! Protocol generation and export: config mapping, run, file output.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use eyre::{Result, WrapErr};
use jetgrid_config::{Config, DEVICE_MAX_FRAMES};
use jetgrid_core::{FrameStats, Generator, GeneratorCfg};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct GenerateSummary {
    pub header: PathBuf,
    pub binary: PathBuf,
    pub frames: usize,
    pub bytes: usize,
    pub mean_transparency: f64,
    pub debounce_corrections: usize,
    pub unconverged_frames: usize,
    pub elapsed_ms: u64,
}

/// One CSV row per frame.
#[derive(Debug, Serialize)]
struct StatsRow {
    frame: u32,
    timestamp_s: f64,
    threshold: f64,
    pixel_transparency: f64,
    solver_iterations: u32,
    solver_converged: bool,
    raw_open: usize,
    open: usize,
}

fn with_suffix(base: &Path, ext: &str) -> PathBuf {
    let mut s = OsString::from(base.as_os_str());
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

fn write_stats(path: &Path, stats: &[FrameStats], dt_frame: f64) -> Result<()> {
    let mut w = csv::Writer::from_path(path)
        .wrap_err_with(|| format!("create stats file {}", path.display()))?;
    for s in stats {
        w.serialize(StatsRow {
            frame: s.index,
            timestamp_s: f64::from(s.index) * dt_frame,
            threshold: s.threshold,
            pixel_transparency: s.pixel_transparency,
            solver_iterations: s.solver_iterations,
            solver_converged: s.solver_converged,
            raw_open: s.raw_open,
            open: s.open,
        })?;
    }
    w.flush()?;
    Ok(())
}

pub fn run_generate(
    cfg: &Config,
    out: &Path,
    frames: Option<u32>,
    workers: Option<usize>,
    stats: Option<&Path>,
) -> Result<GenerateSummary> {
    // Builder/config mapping via jetgrid_core::conversions
    let mut gcfg = GeneratorCfg::try_from(cfg).map_err(eyre::Report::new)?;
    if let Some(n) = frames {
        gcfg.n_frames = n;
    }
    if let Some(w) = workers {
        gcfg.workers = w;
    }
    if gcfg.n_frames > DEVICE_MAX_FRAMES {
        tracing::warn!(
            frames = gcfg.n_frames,
            max = DEVICE_MAX_FRAMES,
            "protocol exceeds device capacity; upload will be refused"
        );
    }

    let start = Instant::now();
    let generator = Generator::new(gcfg)?;
    let generation = generator.run()?;
    let protocol = &generation.protocol;
    let bytes = protocol.to_bytes()?;

    let base = cfg.export.path_no_ext(out);
    if let Some(dir) = base.parent() {
        fs::create_dir_all(dir)
            .wrap_err_with(|| format!("create output folder {}", dir.display()))?;
    }
    let header = with_suffix(&base, "txt");
    let binary = with_suffix(&base, "bin");
    fs::write(&header, protocol.header().render())
        .wrap_err_with(|| format!("write {}", header.display()))?;
    fs::write(&binary, &bytes).wrap_err_with(|| format!("write {}", binary.display()))?;
    if let Some(p) = stats {
        write_stats(p, &generation.stats, generator.cfg().dt_frame)?;
    }

    tracing::info!(
        header = %header.display(),
        binary = %binary.display(),
        bytes = bytes.len(),
        "protocol exported"
    );
    Ok(GenerateSummary {
        header,
        binary,
        frames: protocol.frames().len(),
        bytes: bytes.len(),
        mean_transparency: protocol.mean_transparency(),
        debounce_corrections: generation.debounce.corrections,
        unconverged_frames: generation.unconverged,
        elapsed_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_keeps_dots_in_names() {
        assert_eq!(
            with_suffix(Path::new("out/run.v2"), "bin"),
            PathBuf::from("out/run.v2.bin")
        );
    }
}
