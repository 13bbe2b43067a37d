//! Binary wire format consumed by the jetting-grid firmware.
//!
//! One frame on the wire:
//!
//! ```text
//! [u32 little-endian: frame duration in ms]
//! [N bytes: one per open valve, high nibble = x + 7, low nibble = y + 7]
//! [0xFF end-of-frame sentinel]
//! ```
//!
//! Only open valves are listed. The firmware treats every valve that is not
//! listed in a frame as closed for that frame's duration, so a frame with no
//! points closes the whole grid.
//!
//! Both nibbles are at most 14 for the [-7, 7] lattice, so a point byte can
//! never collide with the sentinel; the encoder still checks it.

use crate::error::{GenError, Result};
use crate::extract::ValveStates;
use crate::grid::{PCS_X_MIN, PCS_Y_MIN, PcsCoordinate, ValveGrid};

/// End-of-frame marker.
pub const SENTINEL: u8 = 0xFF;
/// Size of the duration field.
pub const DURATION_LEN: usize = 4;
/// Every lattice point of the 15×15 grid.
pub const MAX_POINTS_PER_FRAME: usize = 225;

/// Decoded view of one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireFrame {
    pub duration_ms: u32,
    /// Open valves in the order they appear on the wire.
    pub points: Vec<PcsCoordinate>,
}

impl WireFrame {
    /// Encoded size in bytes, sentinel included.
    #[inline]
    pub fn encoded_len(&self) -> usize {
        DURATION_LEN + self.points.len() + 1
    }

    pub fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        encode_frame(self.duration_ms, &self.points, out)
    }

    /// Map the points back onto a valve bitset. Points without a valve are an error.
    pub fn to_states(&self, grid: &ValveGrid) -> Result<ValveStates> {
        let mut s = ValveStates::ALL_CLOSED;
        for p in &self.points {
            let idx = grid.index_of(*p).ok_or_else(|| {
                eyre::Report::new(GenError::Decode(format!(
                    "point ({}, {}) is not a valve position",
                    p.x, p.y
                )))
            })?;
            s.set(idx, true);
        }
        Ok(s)
    }
}

fn invariant(msg: String) -> eyre::Report {
    eyre::Report::new(GenError::Invariant(msg))
}

fn decode_err(msg: String) -> eyre::Report {
    eyre::Report::new(GenError::Decode(msg))
}

/// Pack a PCS point into one byte.
pub fn pack_pcs(p: PcsCoordinate) -> Result<u8> {
    if !p.in_range() {
        return Err(invariant(format!(
            "PCS point ({}, {}) outside the grid",
            p.x, p.y
        )));
    }
    let hi = (p.x - PCS_X_MIN) as u8;
    let lo = ((p.y - PCS_Y_MIN) as u8) & 0x0F;
    let byte = (hi << 4) | lo;
    if byte == SENTINEL {
        return Err(invariant(format!(
            "PCS point ({}, {}) collides with the sentinel",
            p.x, p.y
        )));
    }
    Ok(byte)
}

/// Inverse of [`pack_pcs`]; does not range-check.
#[inline]
pub fn unpack_pcs(b: u8) -> PcsCoordinate {
    PcsCoordinate {
        x: (b >> 4) as i8 + PCS_X_MIN,
        y: (b & 0x0F) as i8 + PCS_Y_MIN,
    }
}

/// Append one encoded frame to `out`.
pub fn encode_frame(duration_ms: u32, points: &[PcsCoordinate], out: &mut Vec<u8>) -> Result<()> {
    if points.len() > MAX_POINTS_PER_FRAME {
        return Err(invariant(format!(
            "{} points in one frame exceeds the grid size {}",
            points.len(),
            MAX_POINTS_PER_FRAME
        )));
    }
    out.reserve(DURATION_LEN + points.len() + 1);
    out.extend_from_slice(&duration_ms.to_le_bytes());
    for p in points {
        out.push(pack_pcs(*p)?);
    }
    out.push(SENTINEL);
    Ok(())
}

/// Encode the open valves of `states`, in ascending valve index.
pub fn encode_states(
    duration_ms: u32,
    states: &ValveStates,
    grid: &ValveGrid,
    out: &mut Vec<u8>,
) -> Result<()> {
    let valves = grid.valves();
    let points: Vec<PcsCoordinate> = states.iter_open().map(|i| valves[i].pcs).collect();
    encode_frame(duration_ms, &points, out)
}

/// Decode the first frame of `buf`, returning it and the bytes consumed.
pub fn decode_frame(buf: &[u8]) -> Result<(WireFrame, usize)> {
    if buf.len() < DURATION_LEN + 1 {
        return Err(decode_err(format!(
            "truncated frame: {} bytes, need at least {}",
            buf.len(),
            DURATION_LEN + 1
        )));
    }
    let mut dur = [0u8; DURATION_LEN];
    dur.copy_from_slice(&buf[..DURATION_LEN]);
    let duration_ms = u32::from_le_bytes(dur);

    let body = &buf[DURATION_LEN..];
    let end = body
        .iter()
        .position(|&b| b == SENTINEL)
        .ok_or_else(|| decode_err("missing end-of-frame sentinel".to_string()))?;
    if end > MAX_POINTS_PER_FRAME {
        return Err(decode_err(format!(
            "{end} points in one frame exceeds the grid size {MAX_POINTS_PER_FRAME}"
        )));
    }

    let mut points = Vec::with_capacity(end);
    for &b in &body[..end] {
        let p = unpack_pcs(b);
        if !p.in_range() {
            return Err(decode_err(format!("byte {b:#04x} decodes outside the grid")));
        }
        points.push(p);
    }
    Ok((
        WireFrame {
            duration_ms,
            points,
        },
        DURATION_LEN + end + 1,
    ))
}

/// Decode a concatenation of frames; trailing partial data is an error.
pub fn decode_stream(mut buf: &[u8]) -> Result<Vec<WireFrame>> {
    let mut frames = Vec::new();
    while !buf.is_empty() {
        let (frame, used) = decode_frame(buf)
            .map_err(|e| e.wrap_err(format!("frame {}", frames.len())))?;
        frames.push(frame);
        buf = &buf[used..];
    }
    Ok(frames)
}
