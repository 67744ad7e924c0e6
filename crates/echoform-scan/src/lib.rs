//! Beam-space to Cartesian resampling for display.
//!
//! A [`Cartesianator`] owns an output grid and fills it from a beam-space
//! frame under the active scan geometry: every output cell is mapped back
//! into beam space (sector scans through an angular transform, linear scans
//! through an affine one) and filled by sampling the input, or left at the
//! background value when it falls outside the scan footprint.
//!
//! # Example
//!
//! ```
//! use echoform_core::{LinearGeometry, ScanGeometry};
//! use echoform_scan::Cartesianator;
//! use std::sync::Arc;
//!
//! let geometry = Arc::new(ScanGeometry::Linear(LinearGeometry::new(0.04, 0.0, 0.08)));
//!
//! let mut cart = Cartesianator::new();
//! cart.set_geometry(geometry);
//! cart.set_output_size(64, 64);
//!
//! let beam_space = vec![1.0; 32 * 128];
//! cart.process(&beam_space, 32, 128);
//! assert_eq!(cart.output_buffer().len(), 64 * 64);
//! ```

use std::sync::Arc;

use echoform_core::{Extents, LinearGeometry, ScanGeometry, SectorGeometry};
use glam::Vec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How to sample between beam-space samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FilterMode {
    /// Use the nearest sample (blocky).
    Nearest,
    /// Bilinear interpolation (smooth).
    #[default]
    Bilinear,
}

/// Resamples beam-space frames onto a uniformly spaced Cartesian grid.
///
/// Holds a shared, read-only reference to the active scan geometry and owns
/// its output buffer. One instance per display pipeline, configured once
/// per geometry change and reused synchronously across frames; every
/// mutating operation takes `&mut self`, so cross-thread sharing needs
/// external locking.
pub struct Cartesianator {
    geometry: Option<Arc<ScanGeometry>>,
    extents: Extents,
    output: Vec<f32>,
    num_samples_x: usize,
    num_samples_y: usize,
    filter_mode: FilterMode,
    background: f32,
}

impl std::fmt::Debug for Cartesianator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cartesianator")
            .field("geometry", &self.geometry)
            .field("extents", &self.extents)
            .field("num_samples_x", &self.num_samples_x)
            .field("num_samples_y", &self.num_samples_y)
            .field("filter_mode", &self.filter_mode)
            .field("background", &self.background)
            .finish()
    }
}

impl Cartesianator {
    /// Creates an unconfigured resampler.
    ///
    /// [`set_geometry`](Self::set_geometry) and
    /// [`set_output_size`](Self::set_output_size) must both be called
    /// before the first [`process`](Self::process).
    pub fn new() -> Self {
        Self {
            geometry: None,
            extents: Extents::new(0.0, 0.0, 0.0, 0.0),
            output: Vec::new(),
            num_samples_x: 0,
            num_samples_y: 0,
            filter_mode: FilterMode::default(),
            background: 0.0,
        }
    }

    /// Stores the scan geometry and recomputes the Cartesian extents the
    /// output grid spans.
    pub fn set_geometry(&mut self, geometry: Arc<ScanGeometry>) {
        self.extents = geometry.cartesian_extents();
        log::debug!("scan geometry set, extents {:?}", self.extents);
        self.geometry = Some(geometry);
    }

    /// Sets the number of output samples in x and y.
    ///
    /// Reallocation is deferred to the next [`process`](Self::process) and
    /// only happens when the dimensions actually changed.
    pub fn set_output_size(&mut self, num_samples_x: usize, num_samples_y: usize) {
        self.num_samples_x = num_samples_x;
        self.num_samples_y = num_samples_y;
    }

    /// The number of output samples in x and y.
    pub fn output_size(&self) -> (usize, usize) {
        (self.num_samples_x, self.num_samples_y)
    }

    /// The last computed grid, row-major with stride `num_samples_x`
    /// (index `y * num_samples_x + x`).
    pub fn output_buffer(&self) -> &[f32] {
        &self.output
    }

    /// Cartesian extents implied by the active geometry.
    pub fn extents(&self) -> Extents {
        self.extents
    }

    /// Sets how beam-space samples are interpolated into output cells.
    pub fn set_filter_mode(&mut self, mode: FilterMode) {
        self.filter_mode = mode;
    }

    /// The active interpolation policy.
    pub fn filter_mode(&self) -> FilterMode {
        self.filter_mode
    }

    /// Sets the value written to cells outside the scan footprint.
    pub fn set_background(&mut self, value: f32) {
        self.background = value;
    }

    /// The value written to cells outside the scan footprint.
    pub fn background(&self) -> f32 {
        self.background
    }

    /// Fills the output grid from a beam-space frame.
    ///
    /// `in_buffer` is row-major with one row of `num_samples` range samples
    /// per beam (index `beam * num_samples + sample`) and is not retained
    /// beyond the call. Geometry and output size must be configured first;
    /// violating that is a caller bug and panics.
    pub fn process(&mut self, in_buffer: &[f32], num_beams: usize, num_samples: usize) {
        assert!(
            num_beams > 0 && num_samples > 0,
            "beam-space input must be non-empty"
        );
        assert_eq!(
            in_buffer.len(),
            num_beams * num_samples,
            "input length must match num_beams * num_samples"
        );
        assert!(
            self.num_samples_x > 0 && self.num_samples_y > 0,
            "output size must be set before process"
        );
        let Some(geometry) = self.geometry.clone() else {
            panic!("scan geometry must be set before process");
        };

        self.update_output_buffer();

        // One dispatch per frame; the per-cell loop never re-branches on
        // the geometry kind.
        match geometry.as_ref() {
            ScanGeometry::Sector(sector) => {
                self.sector_transform(in_buffer, num_beams, num_samples, sector)
            }
            ScanGeometry::Linear(linear) => {
                self.linear_transform(in_buffer, num_beams, num_samples, linear)
            }
        }
    }

    /// Reallocates the output buffer if the requested size changed.
    fn update_output_buffer(&mut self) {
        let len = self.num_samples_x * self.num_samples_y;
        if self.output.len() != len {
            log::debug!(
                "resizing output buffer to {}x{}",
                self.num_samples_x,
                self.num_samples_y
            );
            self.output.clear();
            self.output.resize(len, 0.0);
        }
    }

    fn sector_transform(
        &mut self,
        in_buffer: &[f32],
        num_beams: usize,
        num_samples: usize,
        geometry: &SectorGeometry,
    ) {
        self.resample(in_buffer, num_beams, num_samples, |p| geometry.beam_space(p));
    }

    fn linear_transform(
        &mut self,
        in_buffer: &[f32],
        num_beams: usize,
        num_samples: usize,
        geometry: &LinearGeometry,
    ) {
        self.resample(in_buffer, num_beams, num_samples, |p| geometry.beam_space(p));
    }

    /// Shared per-cell loop; `map` inverts a Cartesian point into
    /// normalized (beam, range) coordinates or rejects it.
    fn resample<F>(&mut self, in_buffer: &[f32], num_beams: usize, num_samples: usize, map: F)
    where
        F: Fn(Vec2) -> Option<Vec2>,
    {
        let nx = self.num_samples_x;
        let ny = self.num_samples_y;
        let x_denom = (nx - 1).max(1) as f32;
        let y_denom = (ny - 1).max(1) as f32;

        for yi in 0..ny {
            // Interpolating between the bounds (rather than stepping from
            // the near edge) keeps the last row/column exactly on the
            // extents, so edge cells stay inside the footprint.
            let ty = yi as f32 / y_denom;
            let y = self.extents.y_min * (1.0 - ty) + self.extents.y_max * ty;
            for xi in 0..nx {
                let tx = xi as f32 / x_denom;
                let x = self.extents.x_min * (1.0 - tx) + self.extents.x_max * tx;
                let value = match map(Vec2::new(x, y)) {
                    Some(bs) => {
                        sample_beam_space(in_buffer, num_beams, num_samples, bs, self.filter_mode)
                    }
                    None => self.background,
                };
                self.output[yi * nx + xi] = value;
            }
        }
    }
}

impl Default for Cartesianator {
    fn default() -> Self {
        Self::new()
    }
}

/// Samples a beam-space frame at normalized (beam, range) coordinates.
///
/// `bs` must lie in [0, 1]²; bilinear taps past the last beam or sample
/// clamp to the edge.
fn sample_beam_space(
    in_buffer: &[f32],
    num_beams: usize,
    num_samples: usize,
    bs: Vec2,
    filter: FilterMode,
) -> f32 {
    let beam_f = bs.x * (num_beams - 1) as f32;
    let sample_f = bs.y * (num_samples - 1) as f32;

    match filter {
        FilterMode::Nearest => {
            let beam = ((beam_f + 0.5).floor() as usize).min(num_beams - 1);
            let sample = ((sample_f + 0.5).floor() as usize).min(num_samples - 1);
            in_buffer[beam * num_samples + sample]
        }
        FilterMode::Bilinear => {
            let fb = beam_f - beam_f.floor();
            let fs = sample_f - sample_f.floor();
            let b0 = beam_f.floor() as usize;
            let s0 = sample_f.floor() as usize;
            let b1 = (b0 + 1).min(num_beams - 1);
            let s1 = (s0 + 1).min(num_samples - 1);

            let at = |beam: usize, sample: usize| in_buffer[beam * num_samples + sample];
            let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;

            let near = lerp(at(b0, s0), at(b1, s0), fb);
            let far = lerp(at(b0, s1), at(b1, s1), fb);
            lerp(near, far, fs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use echoform_core::{LinearGeometry, SectorGeometry};

    fn linear_geometry() -> Arc<ScanGeometry> {
        Arc::new(ScanGeometry::Linear(LinearGeometry::new(0.04, 0.0, 0.08)))
    }

    fn sector_geometry() -> Arc<ScanGeometry> {
        Arc::new(ScanGeometry::Sector(SectorGeometry::new(1.2, 0.01, 0.1)))
    }

    #[test]
    fn test_linear_constant_round_trip() {
        let mut cart = Cartesianator::new();
        cart.set_geometry(linear_geometry());
        cart.set_output_size(32, 48);

        let beam_space = vec![3.5; 16 * 64];
        cart.process(&beam_space, 16, 64);

        // A linear footprint fills its whole bounding box, so every cell
        // carries the constant.
        for (i, v) in cart.output_buffer().iter().enumerate() {
            assert!((v - 3.5).abs() < 1e-5, "cell {} is {}", i, v);
        }
    }

    #[test]
    fn test_output_size_contract() {
        let mut cart = Cartesianator::new();
        cart.set_geometry(linear_geometry());

        cart.set_output_size(10, 20);
        assert_eq!(cart.output_size(), (10, 20));

        let beam_space = vec![0.0; 4 * 8];
        cart.process(&beam_space, 4, 8);
        assert_eq!(cart.output_buffer().len(), 10 * 20);

        // Shrinking lazily reallocates on the next process call.
        cart.set_output_size(5, 5);
        assert_eq!(cart.output_size(), (5, 5));
        cart.process(&beam_space, 4, 8);
        assert_eq!(cart.output_buffer().len(), 25);
    }

    #[test]
    fn test_sector_corners_are_background() {
        let mut cart = Cartesianator::new();
        cart.set_geometry(sector_geometry());
        cart.set_output_size(64, 64);
        cart.set_background(-1.0);

        let beam_space = vec![5.0; 32 * 128];
        cart.process(&beam_space, 32, 128);

        let out = cart.output_buffer();
        // The fan never reaches the corners of its bounding box.
        assert_eq!(out[0], -1.0);
        assert_eq!(out[63], -1.0);
        assert_eq!(out[63 * 64], -1.0);
        assert_eq!(out[63 * 64 + 63], -1.0);

        // But it does cover cells, and in-fan cells carry the constant.
        let mid = out[32 * 64 + 32];
        assert!((mid - 5.0).abs() < 1e-5, "mid cell is {}", mid);
    }

    #[test]
    fn test_nearest_filter_picks_cell_value() {
        let mut cart = Cartesianator::new();
        cart.set_geometry(linear_geometry());
        cart.set_output_size(2, 2);
        cart.set_filter_mode(FilterMode::Nearest);

        // Two beams, two samples: values distinguish all four bins.
        let beam_space = vec![10.0, 20.0, 30.0, 40.0];
        cart.process(&beam_space, 2, 2);

        let out = cart.output_buffer();
        // Output rows run shallow to deep, columns left to right; beam 0
        // is the left edge.
        assert_eq!(out[0], 10.0);
        assert_eq!(out[1], 30.0);
        assert_eq!(out[2], 20.0);
        assert_eq!(out[3], 40.0);
    }

    #[test]
    fn test_bilinear_midpoint_average() {
        let mut cart = Cartesianator::new();
        cart.set_geometry(linear_geometry());
        cart.set_output_size(3, 1);
        cart.set_filter_mode(FilterMode::Bilinear);

        // One range sample per beam; the middle output column sits halfway
        // between the two beams.
        let beam_space = vec![0.0, 8.0];
        cart.process(&beam_space, 2, 1);

        let out = cart.output_buffer();
        assert!((out[0] - 0.0).abs() < 1e-5);
        assert!((out[1] - 4.0).abs() < 1e-5);
        assert!((out[2] - 8.0).abs() < 1e-5);
    }

    #[test]
    fn test_reuse_across_frames() {
        let mut cart = Cartesianator::new();
        cart.set_geometry(linear_geometry());
        cart.set_output_size(8, 8);

        let first = vec![1.0; 4 * 4];
        cart.process(&first, 4, 4);
        assert!((cart.output_buffer()[0] - 1.0).abs() < 1e-5);

        let second = vec![2.0; 4 * 4];
        cart.process(&second, 4, 4);
        assert!((cart.output_buffer()[0] - 2.0).abs() < 1e-5);
    }

    #[test]
    #[should_panic(expected = "scan geometry must be set")]
    fn test_process_without_geometry_panics() {
        let mut cart = Cartesianator::new();
        cart.set_output_size(4, 4);
        let beam_space = vec![0.0; 4];
        cart.process(&beam_space, 2, 2);
    }

    #[test]
    #[should_panic(expected = "output size must be set")]
    fn test_process_without_output_size_panics() {
        let mut cart = Cartesianator::new();
        cart.set_geometry(linear_geometry());
        let beam_space = vec![0.0; 4];
        cart.process(&beam_space, 2, 2);
    }

    #[test]
    #[should_panic(expected = "input length")]
    fn test_process_rejects_mismatched_input() {
        let mut cart = Cartesianator::new();
        cart.set_geometry(linear_geometry());
        cart.set_output_size(4, 4);
        let beam_space = vec![0.0; 7];
        cart.process(&beam_space, 2, 4);
    }
}
