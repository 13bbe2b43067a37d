//! Streaming a protocol into the jetting-grid controller.
//!
//! The device loads a program in stages: the `load` command, the program
//! name (echoed), the frame count (echoed, or an `ERROR` line when it does
//! not fit), then one binary frame at a time, each answered by one line.
//! A bare end-of-frame sentinel closes the program and the device answers
//! `Success!`. Any `ERROR` reply ends the upload; nothing is retried.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use jetgrid_config::DEVICE_MAX_FRAMES;
use jetgrid_traits::Transport;

use crate::codec::{SENTINEL, WireFrame};
use crate::error::{GenError, Result};
use crate::hw_error::map_transport_error;

/// The controller abandons a load after 4 s without progress.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(4);
/// Reply that confirms the whole program was stored.
pub const SUCCESS_REPLY: &str = "Success!";
/// Longest program name the controller's command buffer holds.
pub const MAX_NAME_LEN: usize = 63;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub frames_sent: usize,
    /// Binary payload bytes, end-of-program sentinel included.
    pub bytes_sent: usize,
    /// Name as echoed by the device.
    pub device_name: String,
}

pub struct Uploader<T: Transport> {
    transport: T,
    timeout: Duration,
}

impl<T: Transport> Uploader<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            timeout: DEFAULT_REPLY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    fn check_reply(stage: &str, line: String) -> Result<String> {
        let line = line.trim().to_string();
        tracing::trace!(stage, reply = %line, "device reply");
        if line.starts_with("ERROR") {
            return Err(eyre::Report::new(GenError::Device(line)));
        }
        Ok(line)
    }

    fn read_reply(&mut self, stage: &str) -> Result<String> {
        let line = self
            .transport
            .read_line(self.timeout)
            .map_err(|e| eyre::Report::new(map_transport_error(&*e)))?;
        Self::check_reply(stage, line)
    }

    fn query(&mut self, command: &str, stage: &str) -> Result<String> {
        let line = self
            .transport
            .query(command, self.timeout)
            .map_err(|e| eyre::Report::new(map_transport_error(&*e)))?;
        Self::check_reply(stage, line)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.transport
            .write_bytes(data)
            .map_err(|e| eyre::Report::new(map_transport_error(&*e)))
    }

    /// Upload `frames` under `name`. `shutdown` is checked before every frame.
    pub fn upload(
        &mut self,
        name: &str,
        frames: &[WireFrame],
        shutdown: Option<&AtomicBool>,
    ) -> Result<UploadReport> {
        if name.is_empty() || name.len() > MAX_NAME_LEN || name.contains(['\n', '\r']) {
            return Err(eyre::Report::new(GenError::Config(format!(
                "program name must be 1..={MAX_NAME_LEN} bytes on a single line"
            ))));
        }
        if frames.len() > DEVICE_MAX_FRAMES as usize {
            return Err(eyre::Report::new(GenError::Config(format!(
                "{} frames exceed the device limit of {DEVICE_MAX_FRAMES}",
                frames.len()
            ))));
        }

        tracing::info!(name, frames = frames.len(), "starting upload");
        self.query("load", "load")?;

        let echoed = self.query(name, "name")?;
        if echoed != name {
            return Err(eyre::Report::new(GenError::Device(format!(
                "name echo mismatch: sent {name:?}, device replied {echoed:?}"
            ))));
        }

        let count = frames.len().to_string();
        let echoed = self.query(&count, "count")?;
        if echoed != count {
            return Err(eyre::Report::new(GenError::Device(format!(
                "frame count echo mismatch: sent {count}, device replied {echoed:?}"
            ))));
        }

        let mut buf = Vec::with_capacity(64);
        let mut bytes_sent = 0usize;
        for (i, frame) in frames.iter().enumerate() {
            if shutdown.is_some_and(|s| s.load(Ordering::Relaxed)) {
                tracing::warn!(frame = i, "upload aborted");
                return Err(eyre::Report::new(GenError::Aborted));
            }
            buf.clear();
            frame.encode(&mut buf)?;
            self.write(&buf)?;
            bytes_sent += buf.len();
            self.read_reply("frame")?;
            if (i + 1) % 500 == 0 {
                tracing::debug!(sent = i + 1, total = frames.len(), "upload progress");
            }
        }

        self.write(&[SENTINEL])?;
        bytes_sent += 1;
        let reply = self.read_reply("end")?;
        if reply != SUCCESS_REPLY {
            return Err(eyre::Report::new(GenError::Device(format!(
                "unexpected final reply {reply:?}"
            ))));
        }

        tracing::info!(name, frames = frames.len(), bytes = bytes_sent, "upload complete");
        Ok(UploadReport {
            frames_sent: frames.len(),
            bytes_sent,
            device_name: name.to_string(),
        })
    }
}
