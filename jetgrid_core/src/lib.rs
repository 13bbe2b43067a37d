#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Jetting-grid protocol generation (hardware-agnostic).
//!
//! Turns one or two evolving simplex noise fields into a timed sequence of
//! open/closed states for the 112 valves of a 15×15 jetting grid, and
//! streams the result to the grid controller through `jetgrid_traits::Transport`.
//!
//! ## Pipeline
//!
//! - **Noise**: seeded 3D simplex fields sampled on the pixel lattice (`noise`)
//! - **Mixing**: optional blend of field A with field B (`mixer`)
//! - **Threshold**: constant or per-frame target transparency (`threshold`)
//! - **Extraction**: valve pixels of the binary image (`extract`)
//! - **Debounce**: minimum dwell time per valve (`debounce`)
//! - **Wire**: binary frame encoding and device upload (`codec`, `upload`)
//!
//! Rendering runs in parallel across frames; the debounce pass is sequential
//! per valve. A given configuration always yields byte-identical output.

pub mod builder;
pub mod codec;
pub mod config;
pub mod conversions;
pub mod debounce;
pub mod error;
pub mod extract;
pub mod generator;
pub mod grid;
pub mod hw_error;
pub mod image;
pub mod mixer;
pub mod noise;
pub mod protocol;
pub mod threshold;
pub mod upload;
pub mod util;

pub use builder::GeneratorBuilder;
pub use codec::{WireFrame, decode_frame, decode_stream, encode_frame};
pub use config::{
    GeneratorCfg, GridGeometry, MixStrategy, NoiseFieldCfg, SolverCfg, ThresholdPolicy,
};
pub use debounce::{DebounceReport, Debouncer};
pub use error::{BuildError, GenError, Report, Result};
pub use extract::ValveStates;
pub use generator::{FrameOutcome, FrameStats, Generation, Generator};
pub use grid::{N_VALVES, PcsCoordinate, PixelCoordinate, ValveGrid};
pub use protocol::{Frame, Protocol, ProtocolHeader};
pub use upload::{UploadReport, Uploader};
