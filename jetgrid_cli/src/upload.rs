//! Device upload: transport selection and streaming.

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use eyre::{Result, WrapErr};
use jetgrid_core::{GenError, UploadReport, Uploader, decode_stream};
use jetgrid_hardware::SimulatedDevice;
use jetgrid_traits::Transport;

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn open_transport(port: &Path, baud: u32) -> Result<Box<dyn Transport>> {
    Ok(Box::new(jetgrid_hardware::UartTransport::open(port, baud)?))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn open_transport(port: &Path, baud: u32) -> Result<Box<dyn Transport>> {
    tracing::debug!(baud, "baud rate is taken from the device settings in this build");
    Ok(Box::new(jetgrid_hardware::open_device(port)?))
}

/// Positive, representable reply timeout.
fn reply_timeout(secs: f64) -> Result<Duration> {
    match Duration::try_from_secs_f64(secs) {
        Ok(d) if !d.is_zero() => Ok(d),
        _ => Err(GenError::Config(format!(
            "--reply-timeout must be a positive number of seconds, got {secs}"
        ))
        .into()),
    }
}

#[allow(clippy::too_many_arguments)]
pub fn run_upload(
    file: &Path,
    port: Option<&Path>,
    name: Option<&str>,
    sim: bool,
    baud: u32,
    reply_timeout_s: f64,
    shutdown: &AtomicBool,
) -> Result<UploadReport> {
    let reply_timeout = reply_timeout(reply_timeout_s)?;
    let bytes = std::fs::read(file).wrap_err_with(|| format!("read {}", file.display()))?;
    let frames = decode_stream(&bytes)?;
    let name = match name {
        Some(n) => n.to_string(),
        None => file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "protocol".to_string()),
    };

    let transport: Box<dyn Transport> = if sim {
        tracing::info!("using simulated controller");
        Box::new(SimulatedDevice::new())
    } else {
        let port = port.ok_or_else(|| GenError::Config("--port is required".into()))?;
        open_transport(port, baud)?
    };

    let mut uploader = Uploader::new(transport).with_timeout(reply_timeout);
    uploader.upload(&name, &frames, Some(shutdown))
}
