//! Shared value types for the echoform simulation pipeline.
//!
//! Provides the scan geometry variants ([`ScanGeometry`]), the Cartesian
//! bounds they imply ([`Extents`]), the point-scatterer record
//! ([`Scatterer`]), and the row-major beam-space frame
//! ([`BeamSpaceBuffer`]) exchanged between simulation algorithms and the
//! display resampler.
//!
//! # Example
//!
//! ```
//! use echoform_core::{ScanGeometry, SectorGeometry};
//! use glam::Vec2;
//!
//! let geometry = ScanGeometry::Sector(SectorGeometry::new(1.0, 0.01, 0.12));
//!
//! // A point straight ahead of the apex, mid-depth.
//! let bs = geometry.beam_space(Vec2::new(0.0, 0.065)).unwrap();
//! assert!((bs.x - 0.5).abs() < 1e-6);
//! ```

use glam::{Vec2, Vec3};
use std::f32::consts::FRAC_PI_2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Extents
// ============================================================================

/// Axis-aligned Cartesian bounds of a scan footprint.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Extents {
    /// Leftmost lateral coordinate.
    pub x_min: f32,
    /// Rightmost lateral coordinate.
    pub x_max: f32,
    /// Shallowest depth coordinate.
    pub y_min: f32,
    /// Deepest depth coordinate.
    pub y_max: f32,
}

impl Extents {
    /// Creates extents from the four bounds.
    pub fn new(x_min: f32, x_max: f32, y_min: f32, y_max: f32) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Lateral span.
    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    /// Depth span.
    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }

    /// Returns true if the point lies inside the bounds (edges inclusive).
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x_min && p.x <= self.x_max && p.y >= self.y_min && p.y <= self.y_max
    }
}

// ============================================================================
// Scan geometry
// ============================================================================

/// A sector scan: beams fan out from an apex at the origin, symmetric
/// about the +y (depth) axis.
///
/// A point at polar coordinates (r, θ) sits at `(r sin θ, r cos θ)` with
/// θ ∈ [-apex_angle/2, +apex_angle/2].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SectorGeometry {
    /// Full opening angle of the fan, in radians.
    pub apex_angle: f32,
    /// Distance from the apex to the first range sample.
    pub radius_min: f32,
    /// Distance from the apex to the last range sample.
    pub radius_max: f32,
}

impl SectorGeometry {
    /// Creates a sector geometry.
    pub fn new(apex_angle: f32, radius_min: f32, radius_max: f32) -> Self {
        assert!(apex_angle > 0.0, "apex angle must be positive");
        assert!(
            radius_min >= 0.0 && radius_max > radius_min,
            "radii must satisfy 0 <= radius_min < radius_max"
        );
        Self {
            apex_angle,
            radius_min,
            radius_max,
        }
    }

    /// Bounding box of the insonified region.
    pub fn cartesian_extents(&self) -> Extents {
        let half = 0.5 * self.apex_angle;
        let x_max = self.radius_max * half.min(FRAC_PI_2).sin();
        // Sectors wider than a half circle dip below the near arc.
        let y_min = if half <= FRAC_PI_2 {
            self.radius_min * half.cos()
        } else {
            self.radius_max * half.cos()
        };
        Extents::new(-x_max, x_max, y_min, self.radius_max)
    }

    /// Inverts a Cartesian point to normalized (beam, range) coordinates
    /// in [0, 1]², or `None` when the point lies outside the fan.
    pub fn beam_space(&self, p: Vec2) -> Option<Vec2> {
        let half = 0.5 * self.apex_angle;
        let r = p.length();
        let theta = p.x.atan2(p.y);
        if theta < -half || theta > half || r < self.radius_min || r > self.radius_max {
            return None;
        }
        Some(Vec2::new(
            (theta + half) / self.apex_angle,
            (r - self.radius_min) / (self.radius_max - self.radius_min),
        ))
    }
}

/// A linear scan: parallel beams from a flat face, lateral x ∈
/// [-width/2, +width/2], depth along +y.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinearGeometry {
    /// Lateral aperture width.
    pub width: f32,
    /// Depth of the first range sample.
    pub depth_min: f32,
    /// Depth of the last range sample.
    pub depth_max: f32,
}

impl LinearGeometry {
    /// Creates a linear geometry.
    pub fn new(width: f32, depth_min: f32, depth_max: f32) -> Self {
        assert!(width > 0.0, "width must be positive");
        assert!(
            depth_max > depth_min,
            "depths must satisfy depth_min < depth_max"
        );
        Self {
            width,
            depth_min,
            depth_max,
        }
    }

    /// Bounding box of the insonified region.
    pub fn cartesian_extents(&self) -> Extents {
        let half = 0.5 * self.width;
        Extents::new(-half, half, self.depth_min, self.depth_max)
    }

    /// Inverts a Cartesian point to normalized (beam, range) coordinates
    /// in [0, 1]², or `None` when the point lies outside the aperture.
    pub fn beam_space(&self, p: Vec2) -> Option<Vec2> {
        let half = 0.5 * self.width;
        if p.x < -half || p.x > half || p.y < self.depth_min || p.y > self.depth_max {
            return None;
        }
        Some(Vec2::new(
            (p.x + half) / self.width,
            (p.y - self.depth_min) / (self.depth_max - self.depth_min),
        ))
    }
}

/// The physical shape of a scan, deciding how beam-space coordinates map
/// onto Cartesian space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ScanGeometry {
    /// Beams fan out from an apex (phased and curvilinear probes).
    Sector(SectorGeometry),
    /// Parallel beams from a flat face (linear probes).
    Linear(LinearGeometry),
}

impl ScanGeometry {
    /// Bounding box of the insonified region.
    pub fn cartesian_extents(&self) -> Extents {
        match self {
            ScanGeometry::Sector(sector) => sector.cartesian_extents(),
            ScanGeometry::Linear(linear) => linear.cartesian_extents(),
        }
    }

    /// Inverts a Cartesian point to normalized (beam, range) coordinates,
    /// or `None` when the point lies outside the scan footprint.
    pub fn beam_space(&self, p: Vec2) -> Option<Vec2> {
        match self {
            ScanGeometry::Sector(sector) => sector.beam_space(p),
            ScanGeometry::Linear(linear) => linear.beam_space(p),
        }
    }
}

// ============================================================================
// Scatterers
// ============================================================================

/// A single point scatterer.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Scatterer {
    /// Position; x is lateral, y is depth, z is elevation.
    pub position: Vec3,
    /// Reflection amplitude.
    pub amplitude: f32,
}

impl Scatterer {
    /// Creates a scatterer with position and amplitude.
    pub fn new(position: Vec3, amplitude: f32) -> Self {
        Self {
            position,
            amplitude,
        }
    }

    /// Creates a unit-amplitude scatterer at the given position.
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            amplitude: 1.0,
        }
    }

    /// Projection onto the lateral/depth imaging plane.
    pub fn in_plane(&self) -> Vec2 {
        Vec2::new(self.position.x, self.position.y)
    }
}

// ============================================================================
// Beam-space buffer
// ============================================================================

/// A row-major beam-space frame: one row of range samples per beam.
///
/// Storage order is `beam * num_samples + sample`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BeamSpaceBuffer {
    data: Vec<f32>,
    num_beams: usize,
    num_samples: usize,
}

impl BeamSpaceBuffer {
    /// Creates a zero-filled frame.
    pub fn new(num_beams: usize, num_samples: usize) -> Self {
        Self {
            data: vec![0.0; num_beams * num_samples],
            num_beams,
            num_samples,
        }
    }

    /// Creates a frame from raw sample data.
    ///
    /// `data` must be row-major with one row per beam.
    pub fn from_raw(data: Vec<f32>, num_beams: usize, num_samples: usize) -> Self {
        assert_eq!(
            data.len(),
            num_beams * num_samples,
            "data length must match num_beams * num_samples"
        );
        Self {
            data,
            num_beams,
            num_samples,
        }
    }

    /// Number of beams (rows).
    pub fn num_beams(&self) -> usize {
        self.num_beams
    }

    /// Number of range samples per beam (columns).
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Sample at (beam, range-sample).
    pub fn at(&self, beam: usize, sample: usize) -> f32 {
        self.data[beam * self.num_samples + sample]
    }

    /// Mutable sample at (beam, range-sample).
    pub fn at_mut(&mut self, beam: usize, sample: usize) -> &mut f32 {
        &mut self.data[beam * self.num_samples + sample]
    }

    /// The samples, row-major.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Overwrites every sample with `value`.
    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sector_extents_symmetric() {
        let sector = SectorGeometry::new(1.0, 0.01, 0.1);
        let extents = sector.cartesian_extents();

        assert!((extents.x_min + extents.x_max).abs() < 1e-6);
        assert!((extents.y_max - 0.1).abs() < 1e-6);
        assert!((extents.y_min - 0.01 * 0.5_f32.cos()).abs() < 1e-6);
    }

    #[test]
    fn test_sector_beam_space_center() {
        let sector = SectorGeometry::new(1.0, 0.0, 0.1);

        // Straight ahead, mid-range maps to the middle of beam space.
        let bs = sector.beam_space(Vec2::new(0.0, 0.05)).unwrap();
        assert!((bs.x - 0.5).abs() < 1e-6);
        assert!((bs.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_sector_beam_space_edges() {
        let sector = SectorGeometry::new(1.0, 0.01, 0.1);

        // Beyond the far arc.
        assert!(sector.beam_space(Vec2::new(0.0, 0.11)).is_none());
        // Inside the near arc.
        assert!(sector.beam_space(Vec2::new(0.0, 0.005)).is_none());
        // Outside the fan angle.
        assert!(sector.beam_space(Vec2::new(0.05, 0.05)).is_none());
    }

    #[test]
    fn test_linear_beam_space_affine() {
        let linear = LinearGeometry::new(0.04, 0.0, 0.08);

        let bs = linear.beam_space(Vec2::new(-0.02, 0.0)).unwrap();
        assert!((bs.x - 0.0).abs() < 1e-6);
        assert!((bs.y - 0.0).abs() < 1e-6);

        let bs = linear.beam_space(Vec2::new(0.02, 0.08)).unwrap();
        assert!((bs.x - 1.0).abs() < 1e-6);
        assert!((bs.y - 1.0).abs() < 1e-6);

        assert!(linear.beam_space(Vec2::new(0.03, 0.04)).is_none());
    }

    #[test]
    fn test_linear_extents_match_bounds() {
        let linear = LinearGeometry::new(0.04, 0.01, 0.08);
        let extents = ScanGeometry::Linear(linear).cartesian_extents();

        assert!((extents.width() - 0.04).abs() < 1e-6);
        assert!((extents.y_min - 0.01).abs() < 1e-6);
        assert!((extents.y_max - 0.08).abs() < 1e-6);
        assert!(extents.contains(Vec2::new(0.0, 0.05)));
        assert!(!extents.contains(Vec2::new(0.0, 0.09)));
    }

    #[test]
    fn test_beam_space_buffer_indexing() {
        let mut frame = BeamSpaceBuffer::new(3, 4);
        *frame.at_mut(1, 2) = 7.0;

        assert_eq!(frame.at(1, 2), 7.0);
        // Row-major: beam * num_samples + sample.
        assert_eq!(frame.as_slice()[1 * 4 + 2], 7.0);
        assert_eq!(frame.as_slice().len(), 12);
    }

    #[test]
    fn test_beam_space_buffer_from_raw() {
        let frame = BeamSpaceBuffer::from_raw(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3);
        assert_eq!(frame.at(0, 0), 1.0);
        assert_eq!(frame.at(1, 0), 4.0);
        assert_eq!(frame.at(1, 2), 6.0);
    }

    #[test]
    fn test_scatterer_in_plane() {
        let s = Scatterer::at(Vec3::new(0.01, 0.05, 0.002));
        assert_eq!(s.amplitude, 1.0);
        assert_eq!(s.in_plane(), Vec2::new(0.01, 0.05));
    }
}
