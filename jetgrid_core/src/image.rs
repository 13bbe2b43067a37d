//! Square per-frame grayscale and black/white images.

use crate::error::{GenError, Result};
use crate::grid::PixelCoordinate;
use crate::mixer::FieldMixer;
use crate::noise::FieldSampler;

/// Row-major grayscale image, values in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct GrayImage {
    side: u32,
    data: Vec<f32>,
}

impl GrayImage {
    /// Wrap precomputed values; `values.len()` must equal `side * side`.
    pub fn from_values(side: u32, values: Vec<f32>) -> Result<Self> {
        let expected = (side as usize) * (side as usize);
        if values.len() != expected {
            return Err(eyre::Report::new(GenError::Invariant(format!(
                "gray image of side {side} needs {expected} values, got {}",
                values.len()
            ))));
        }
        Ok(Self { side, data: values })
    }

    /// Sample and mix both fields over every pixel of one frame.
    pub fn render(sampler: &FieldSampler, mixer: &FieldMixer, side: u32, frame: u32) -> Self {
        let mut data = Vec::with_capacity((side as usize) * (side as usize));
        for row in 0..side {
            for col in 0..side {
                let (a, b) = sampler.sample_pair(PixelCoordinate { row, col }, frame);
                data.push(mixer.mix(a, b) as f32);
            }
        }
        Self { side, data }
    }

    #[inline]
    pub fn side(&self) -> u32 {
        self.side
    }

    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn get(&self, p: PixelCoordinate) -> f32 {
        self.data[(p.row as usize) * (self.side as usize) + p.col as usize]
    }

    /// Fraction of pixels strictly above `threshold`.
    pub fn exceedance(&self, threshold: f64) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        let above = self
            .data
            .iter()
            .filter(|&&g| f64::from(g) > threshold)
            .count();
        above as f64 / self.data.len() as f64
    }
}

/// Row-major open (`true`) / closed map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryImage {
    side: u32,
    data: Vec<bool>,
}

impl BinaryImage {
    pub fn from_gray(gray: &GrayImage, threshold: f64) -> Self {
        Self {
            side: gray.side,
            data: gray
                .data
                .iter()
                .map(|&g| f64::from(g) > threshold)
                .collect(),
        }
    }

    #[inline]
    pub fn side(&self) -> u32 {
        self.side
    }

    #[inline]
    pub fn is_open(&self, p: PixelCoordinate) -> bool {
        self.data[(p.row as usize) * (self.side as usize) + p.col as usize]
    }

    /// Fraction of open pixels.
    pub fn transparency(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().filter(|&&b| b).count() as f64 / self.data.len() as f64
    }
}
