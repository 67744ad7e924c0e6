//! Simulation algorithms that turn scatterer models into beam-space frames.
//!
//! Two variants share the [`SimAlgorithm`] trait: [`FixedAlgorithm`]
//! projects a static scatterer cloud, [`SplineAlgorithm`] interpolates each
//! scatterer's position and amplitude from B-splines at every frame time.
//! [`create`] constructs either by its string key.
//!
//! # Example
//!
//! ```
//! use echoform_core::{LinearGeometry, ScanGeometry, Scatterer};
//! use echoform_sim::{FixedAlgorithm, ScanConfig, SimAlgorithm};
//! use glam::Vec3;
//! use std::sync::Arc;
//!
//! let geometry = Arc::new(ScanGeometry::Linear(LinearGeometry::new(0.04, 0.0, 0.08)));
//!
//! let mut algorithm = FixedAlgorithm::new();
//! algorithm.set_scatterers(vec![Scatterer::at(Vec3::new(0.0, 0.04, 0.0))]);
//! algorithm.set_scan(ScanConfig::new(geometry, 32, 128));
//!
//! let frame = algorithm.simulate(0.0).unwrap();
//! assert_eq!(frame.num_beams(), 32);
//! ```

use std::sync::Arc;

use echoform_core::{BeamSpaceBuffer, ScanGeometry, Scatterer};
use echoform_spline::{Spline, SplineError};
use glam::{Vec2, Vec3};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Errors from configuring and running simulation algorithms.
#[derive(Error, Debug)]
pub enum SimError {
    /// Unknown key passed to [`create`].
    #[error("illegal algorithm type: {0}")]
    IllegalAlgorithmType(String),

    /// The algorithm was asked to simulate before a scan was configured.
    #[error("no scan configured for the {0} algorithm")]
    NotConfigured(&'static str),

    /// Spline evaluation failed, e.g. a frame time outside the spline
    /// domain.
    #[error(transparent)]
    Spline(#[from] SplineError),
}

/// Result alias for simulation operations.
pub type SimResult<T> = Result<T, SimError>;

/// Scan shape and beam-space sampling density for one acquisition.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Shared, read-only scan geometry.
    pub geometry: Arc<ScanGeometry>,
    /// Number of beams per frame.
    pub num_beams: usize,
    /// Number of range samples per beam.
    pub num_samples: usize,
}

impl ScanConfig {
    /// Creates a scan configuration.
    pub fn new(geometry: Arc<ScanGeometry>, num_beams: usize, num_samples: usize) -> Self {
        assert!(
            num_beams > 0 && num_samples > 0,
            "scan must have at least one beam and one sample"
        );
        Self {
            geometry,
            num_beams,
            num_samples,
        }
    }
}

/// A simulation algorithm: configured once, then queried per frame.
///
/// Implementations are stateful and reused across frames; calls on one
/// instance must be serialized by the caller.
pub trait SimAlgorithm: std::fmt::Debug {
    /// Sets the scan to simulate.
    fn set_scan(&mut self, scan: ScanConfig);

    /// Produces the beam-space frame at the given time.
    fn simulate(&mut self, time: f32) -> SimResult<BeamSpaceBuffer>;
}

/// Creates a simulation algorithm by key.
///
/// Supported keys are `"fixed"` and `"spline"`; anything else, including
/// keys for accelerator variants this build does not carry, fails with
/// [`SimError::IllegalAlgorithmType`] carrying the offending string.
pub fn create(kind: &str) -> SimResult<Box<dyn SimAlgorithm>> {
    match kind {
        "fixed" => {
            log::debug!("creating fixed-scatterer algorithm");
            Ok(Box::new(FixedAlgorithm::new()))
        }
        "spline" => {
            log::debug!("creating spline-scatterer algorithm");
            Ok(Box::new(SplineAlgorithm::new()))
        }
        _ => Err(SimError::IllegalAlgorithmType(kind.to_string())),
    }
}

/// Adds an amplitude into the beam-space bin nearest to a Cartesian point;
/// points outside the scan footprint are dropped.
fn deposit(frame: &mut BeamSpaceBuffer, scan: &ScanConfig, point: Vec2, amplitude: f32) {
    if let Some(bs) = scan.geometry.beam_space(point) {
        let beam = ((bs.x * (scan.num_beams - 1) as f32 + 0.5).floor() as usize)
            .min(scan.num_beams - 1);
        let sample = ((bs.y * (scan.num_samples - 1) as f32 + 0.5).floor() as usize)
            .min(scan.num_samples - 1);
        *frame.at_mut(beam, sample) += amplitude;
    }
}

// ============================================================================
// Fixed scatterers
// ============================================================================

/// Scatterers with fixed positions and amplitudes.
#[derive(Debug, Default)]
pub struct FixedAlgorithm {
    scatterers: Vec<Scatterer>,
    scan: Option<ScanConfig>,
}

impl FixedAlgorithm {
    /// Creates an algorithm with no scatterers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the scatterer cloud.
    pub fn set_scatterers(&mut self, scatterers: Vec<Scatterer>) {
        self.scatterers = scatterers;
    }

    /// The current scatterer cloud.
    pub fn scatterers(&self) -> &[Scatterer] {
        &self.scatterers
    }
}

impl SimAlgorithm for FixedAlgorithm {
    fn set_scan(&mut self, scan: ScanConfig) {
        self.scan = Some(scan);
    }

    fn simulate(&mut self, _time: f32) -> SimResult<BeamSpaceBuffer> {
        let scan = self
            .scan
            .as_ref()
            .ok_or(SimError::NotConfigured("fixed"))?;

        let mut frame = BeamSpaceBuffer::new(scan.num_beams, scan.num_samples);
        for scatterer in &self.scatterers {
            deposit(&mut frame, scan, scatterer.in_plane(), scatterer.amplitude);
        }
        Ok(frame)
    }
}

// ============================================================================
// Spline scatterers
// ============================================================================

/// A scatterer whose position and amplitude vary smoothly over time.
#[derive(Debug, Clone)]
pub struct SplineScatterer {
    /// Trajectory through space.
    pub position: Spline<Vec3>,
    /// Amplitude envelope.
    pub amplitude: Spline<f32>,
}

impl SplineScatterer {
    /// The scatterer state at a point in time.
    pub fn sample(&self, time: f32) -> Result<Scatterer, SplineError> {
        Ok(Scatterer::new(
            self.position.evaluate(time)?,
            self.amplitude.evaluate(time)?,
        ))
    }
}

/// Scatterers whose state is interpolated from B-splines at every frame.
#[derive(Debug, Default)]
pub struct SplineAlgorithm {
    scatterers: Vec<SplineScatterer>,
    scan: Option<ScanConfig>,
}

impl SplineAlgorithm {
    /// Creates an algorithm with no scatterers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the scatterer splines.
    pub fn set_scatterers(&mut self, scatterers: Vec<SplineScatterer>) {
        self.scatterers = scatterers;
    }

    /// The current scatterer splines.
    pub fn scatterers(&self) -> &[SplineScatterer] {
        &self.scatterers
    }
}

impl SimAlgorithm for SplineAlgorithm {
    fn set_scan(&mut self, scan: ScanConfig) {
        self.scan = Some(scan);
    }

    fn simulate(&mut self, time: f32) -> SimResult<BeamSpaceBuffer> {
        let scan = self
            .scan
            .as_ref()
            .ok_or(SimError::NotConfigured("spline"))?;

        let mut frame = BeamSpaceBuffer::new(scan.num_beams, scan.num_samples);
        for scatterer in &self.scatterers {
            let state = scatterer.sample(time)?;
            deposit(&mut frame, scan, state.in_plane(), state.amplitude);
        }
        Ok(frame)
    }
}

// ============================================================================
// Phantom generation
// ============================================================================

/// Simple LCG random number generator for deterministic phantoms.
struct Rng {
    state: u64,
}

impl Rng {
    fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(1),
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    fn range(&mut self, min: f32, max: f32) -> f32 {
        min + self.next_f32() * (max - min)
    }

    fn vec3_in(&mut self, min: Vec3, max: Vec3) -> Vec3 {
        Vec3::new(
            self.range(min.x, max.x),
            self.range(min.y, max.y),
            self.range(min.z, max.z),
        )
    }
}

/// Scatters point scatterers uniformly in a box, with amplitudes in [0, 1].
pub fn random_scatterers(min: Vec3, max: Vec3, count: usize, seed: u64) -> Vec<Scatterer> {
    let mut rng = Rng::new(seed);
    let mut scatterers = Vec::with_capacity(count);

    for _ in 0..count {
        let position = rng.vec3_in(min, max);
        scatterers.push(Scatterer::new(position, rng.next_f32()));
    }

    scatterers
}

/// Configuration for generating a cloud of spline scatterers.
///
/// Every scatterer wanders smoothly inside the box over `[t0, t1]`; all of
/// them share one degree-regular uniform knot vector.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SplineCloud {
    /// Minimum corner of the volume.
    pub min: Vec3,
    /// Maximum corner of the volume.
    pub max: Vec3,
    /// Number of scatterers to generate.
    pub count: usize,
    /// Control points per scatterer trajectory.
    pub control_points: usize,
    /// Polynomial degree of the trajectories.
    pub degree: usize,
    /// Start of the time interval.
    pub t0: f32,
    /// End of the time interval.
    pub t1: f32,
    /// Random seed.
    pub seed: u64,
}

impl Default for SplineCloud {
    fn default() -> Self {
        Self {
            min: Vec3::ZERO,
            max: Vec3::ONE,
            count: 100,
            control_points: 8,
            degree: 2,
            t0: 0.0,
            t1: 1.0,
            seed: 42,
        }
    }
}

impl SplineCloud {
    /// Generates the scatterer splines.
    pub fn generate(&self) -> SimResult<Vec<SplineScatterer>> {
        let mut rng = Rng::new(self.seed);
        let mut scatterers = Vec::with_capacity(self.count);

        for _ in 0..self.count {
            let mut positions = Vec::with_capacity(self.control_points);
            let mut amplitudes = Vec::with_capacity(self.control_points);
            for _ in 0..self.control_points {
                positions.push(rng.vec3_in(self.min, self.max));
                amplitudes.push(rng.next_f32());
            }

            scatterers.push(SplineScatterer {
                position: Spline::uniform(positions, self.degree, self.t0, self.t1)?,
                amplitude: Spline::uniform(amplitudes, self.degree, self.t0, self.t1)?,
            });
        }

        Ok(scatterers)
    }
}
