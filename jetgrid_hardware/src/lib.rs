pub mod error;
pub mod stream;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod uart;
pub mod util;

use std::collections::VecDeque;
use std::time::Duration;

use jetgrid_traits::Transport;

use crate::error::HwError;

/// Program capacity of the controller firmware.
pub const DEFAULT_MAX_FRAMES: u32 = 5000;
const SENTINEL: u8 = 0xFF;
const DURATION_LEN: usize = 4;

/// One frame as stored by the device: duration plus packed PCS bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFrame {
    pub duration_ms: u32,
    /// `(x + 7) << 4 | (y + 7)` per open valve, wire order.
    pub points: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadedProgram {
    pub name: String,
    pub frames: Vec<LoadedFrame>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    Name,
    Count,
    Frames { promised: u32 },
}

/// In-memory stand-in for the jetting-grid controller.
///
/// Follows the firmware's loading sequence: `load`, name echo, count echo,
/// binary frames, end-of-program. Every stored frame is answered with the
/// running frame count. Each `write_bytes` call during the binary stage is
/// taken as written by the uploader, so a lone `0xFF` write ends the program.
pub struct SimulatedDevice {
    stage: Stage,
    max_frames: u32,
    fail_at_frame: Option<usize>,
    line_buf: Vec<u8>,
    frame_buf: Vec<u8>,
    pending_name: String,
    received: Vec<LoadedFrame>,
    replies: VecDeque<String>,
    program: Option<LoadedProgram>,
    bytes_received: usize,
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDevice {
    pub fn new() -> Self {
        Self {
            stage: Stage::Idle,
            max_frames: DEFAULT_MAX_FRAMES,
            fail_at_frame: None,
            line_buf: Vec::new(),
            frame_buf: Vec::new(),
            pending_name: String::new(),
            received: Vec::new(),
            replies: VecDeque::new(),
            program: None,
            bytes_received: 0,
        }
    }

    pub fn with_max_frames(mut self, max_frames: u32) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Answer the frame with this zero-based index with an `ERROR` line.
    pub fn fail_at_frame(mut self, frame: usize) -> Self {
        self.fail_at_frame = Some(frame);
        self
    }

    /// Last successfully loaded program.
    pub fn program(&self) -> Option<&LoadedProgram> {
        self.program.as_ref()
    }

    /// Total bytes written to the device, commands included.
    pub fn bytes_received(&self) -> usize {
        self.bytes_received
    }

    fn reply(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::trace!(reply = %line, "simulated device");
        self.replies.push_back(line);
    }

    fn fail(&mut self, msg: String) {
        self.reply(format!("ERROR: {msg}"));
        self.stage = Stage::Idle;
        self.frame_buf.clear();
        self.received.clear();
    }

    fn handle_line(&mut self, line: &str) {
        match self.stage {
            Stage::Idle => match line {
                "load" => {
                    self.received.clear();
                    self.stage = Stage::Name;
                    self.reply("Loading protocol program");
                }
                "id?" => self.reply("Arduino, Jetting Grid"),
                "proto?" => {
                    let name = self
                        .program
                        .as_ref()
                        .map_or_else(|| "None".to_string(), |p| p.name.clone());
                    self.reply(name);
                }
                other => self.reply(format!("ERROR: Unknown command '{other}'")),
            },
            Stage::Name => {
                self.pending_name = line.to_string();
                self.stage = Stage::Count;
                self.reply(line);
            }
            Stage::Count => match line.parse::<u32>() {
                Ok(n) if n > self.max_frames => self.fail(format!(
                    "Protocol program exceeds maximum number of lines. \
                     Requested were {n} lines, but the maximum is {}.",
                    self.max_frames
                )),
                Ok(n) => {
                    self.stage = Stage::Frames { promised: n };
                    self.reply(n.to_string());
                }
                Err(_) => self.fail(format!("Invalid number of lines '{line}'")),
            },
            Stage::Frames { .. } => {}
        }
    }

    fn handle_frame(&mut self, promised: u32) {
        let raw = std::mem::take(&mut self.frame_buf);
        let index = self.received.len();
        if self.fail_at_frame == Some(index) {
            self.fail(format!("Simulated fault at line {index}"));
            return;
        }
        if index >= promised as usize {
            self.fail(format!(
                "Protocol program received more than the promised {promised} lines."
            ));
            return;
        }
        let mut dur = [0u8; DURATION_LEN];
        dur.copy_from_slice(&raw[..DURATION_LEN]);
        let points = raw[DURATION_LEN..raw.len() - 1].to_vec();
        if let Some(bad) = points.iter().find(|&&b| (b >> 4) > 14 || (b & 0x0F) > 14) {
            self.fail(format!("Invalid point byte {bad:#04x} at line {index}"));
            return;
        }
        self.received.push(LoadedFrame {
            duration_ms: u32::from_le_bytes(dur),
            points,
        });
        self.reply(self.received.len().to_string());
    }

    fn finish(&mut self, promised: u32) {
        let got = self.received.len();
        if got != promised as usize {
            self.fail(format!(
                "Protocol program received incorrect number of lines. \
                 Promised were {promised} lines, but {got} were received."
            ));
            return;
        }
        self.program = Some(LoadedProgram {
            name: std::mem::take(&mut self.pending_name),
            frames: std::mem::take(&mut self.received),
        });
        self.stage = Stage::Idle;
        self.reply("Success!");
    }

    fn feed_binary(&mut self, data: &[u8], promised: u32) {
        if self.frame_buf.is_empty() && data == [SENTINEL] {
            self.finish(promised);
            return;
        }
        for &b in data {
            self.frame_buf.push(b);
            if b == SENTINEL && self.frame_buf.len() > DURATION_LEN {
                self.handle_frame(promised);
                if self.stage == Stage::Idle {
                    return;
                }
            }
        }
    }
}

impl Transport for SimulatedDevice {
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.bytes_received += data.len();
        for (i, &b) in data.iter().enumerate() {
            if let Stage::Frames { promised } = self.stage {
                self.feed_binary(&data[i..], promised);
                return Ok(());
            }
            match b {
                b'\n' => {
                    let line = String::from_utf8_lossy(&self.line_buf).trim().to_string();
                    self.line_buf.clear();
                    self.handle_line(&line);
                }
                b'\r' => {}
                _ => self.line_buf.push(b),
            }
        }
        Ok(())
    }

    fn read_line(
        &mut self,
        _timeout: Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        self.replies
            .pop_front()
            .ok_or_else(|| Box::new(HwError::Timeout) as Box<dyn std::error::Error + Send + Sync>)
    }
}

pub use stream::{StreamTransport, open_device};
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use uart::UartTransport;
