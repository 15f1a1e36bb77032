//! Configuration for ball pivoting reconstruction

use pivotmesh_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Vertex order of emitted triangles, seen from the side their normal points to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TriangleWinding {
    #[default]
    CounterClockwise,
    Clockwise,
}

/// Parameters of a ball pivoting run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallPivotingConfig {
    /// Ball radii, processed smallest first. Empty means a radius derived
    /// from the average point spacing.
    pub radii: Vec<f64>,
    /// Largest angle between a triangle and its vertex normals (radians)
    pub normal_angle_threshold: f64,
    /// Looser agreement accepted for a pivot when no candidate meets
    /// `normal_angle_threshold`. `None` disables the fallback.
    pub fallback_normal_angle_threshold: Option<f64>,
    /// Candidate search radius of the boundary probe, relative to `2r`
    pub probe_radius_factor: f64,
    /// Maximum number of candidates the boundary probe looks at
    pub probe_candidate_cap: usize,
    /// Number of evenly spaced edges probed per boundary loop
    pub loop_sample_count: usize,
    /// Share of neighbors on one side of a loop needed to call it a true boundary
    pub one_sided_majority: f64,
    /// Share of neighbors on the other side a true boundary must stay below
    pub one_sided_minority: f64,
    /// Neighbors whose offset from a loop edge's line is at most this share
    /// of their distance to the edge midpoint count as lying on the line
    pub boundary_band: f64,
    /// Loops longer than this many average spacings are true boundaries
    pub boundary_perimeter_factor: f64,
    /// Default radius as a multiple of the average nearest-neighbor spacing
    pub default_radius_factor: f64,
    /// Neighbors averaged per point when estimating spacing
    pub spacing_neighbors: usize,
    /// Relative shrink of the ball in the empty-ball test
    pub empty_ball_tolerance: f64,
    /// Relative volume below which four points count as coplanar
    pub coplanar_tolerance: f64,
    /// Squared segment distance, relative to `r²`, below which segments cross
    pub crossing_tolerance: f64,
    /// Points closer than this to a kept point, relative to the smallest
    /// radius, are dropped when their normals agree
    pub duplicate_distance_soft: f64,
    /// Points closer than this, relative to the smallest radius, are dropped
    /// whatever their normals
    pub duplicate_distance_hard: f64,
    /// Normal dot product above which a close point counts as a duplicate
    pub duplicate_normal_agreement: f64,
    /// Winding of the emitted triangles
    pub winding: TriangleWinding,
    /// Emit a trace event for every seed and pivot decision
    pub verbose: bool,
}

impl Default for BallPivotingConfig {
    fn default() -> Self {
        Self {
            radii: Vec::new(),
            normal_angle_threshold: std::f64::consts::PI / 3.0, // 60 degrees
            fallback_normal_angle_threshold: None,
            probe_radius_factor: 0.75,
            probe_candidate_cap: 16,
            loop_sample_count: 8,
            one_sided_majority: 0.90,
            one_sided_minority: 0.05,
            boundary_band: 0.2,
            boundary_perimeter_factor: 40.0,
            default_radius_factor: 1.5,
            spacing_neighbors: 1,
            empty_ball_tolerance: 1e-9,
            coplanar_tolerance: 1e-10,
            crossing_tolerance: 1e-12,
            duplicate_distance_soft: 0.10,
            duplicate_distance_hard: 0.001,
            duplicate_normal_agreement: 0.6,
            winding: TriangleWinding::default(),
            verbose: false,
        }
    }
}

impl BallPivotingConfig {
    /// Configuration with the given radii and default parameters
    pub fn new(radii: Vec<f64>) -> Self {
        Self {
            radii,
            ..Default::default()
        }
    }

    /// Set the radius schedule
    pub fn with_radii(mut self, radii: Vec<f64>) -> Self {
        self.radii = radii;
        self
    }

    /// Set the normal agreement threshold (radians)
    pub fn with_normal_angle_threshold(mut self, angle: f64) -> Self {
        self.normal_angle_threshold = angle;
        self
    }

    /// Set the fallback normal agreement threshold (radians)
    pub fn with_fallback_normal_angle_threshold(mut self, angle: Option<f64>) -> Self {
        self.fallback_normal_angle_threshold = angle;
        self
    }

    /// Set the boundary probe limits
    pub fn with_probe(mut self, radius_factor: f64, candidate_cap: usize) -> Self {
        self.probe_radius_factor = radius_factor;
        self.probe_candidate_cap = candidate_cap;
        self
    }

    /// Set how many edges of a loop are probed
    pub fn with_loop_sample_count(mut self, count: usize) -> Self {
        self.loop_sample_count = count;
        self
    }

    /// Set the one-sided neighborhood thresholds
    pub fn with_one_sided_thresholds(mut self, majority: f64, minority: f64) -> Self {
        self.one_sided_majority = majority;
        self.one_sided_minority = minority;
        self
    }

    /// Set the slope under which neighbors count as lying on a loop edge
    pub fn with_boundary_band(mut self, band: f64) -> Self {
        self.boundary_band = band;
        self
    }

    /// Set the duplicate point thresholds. A zero soft distance keeps every point.
    pub fn with_duplicate_culling(mut self, soft: f64, hard: f64, agreement: f64) -> Self {
        self.duplicate_distance_soft = soft;
        self.duplicate_distance_hard = hard;
        self.duplicate_normal_agreement = agreement;
        self
    }

    /// Set the winding of the emitted triangles
    pub fn with_winding(mut self, winding: TriangleWinding) -> Self {
        self.winding = winding;
        self
    }

    /// Set the perimeter threshold, in average spacings
    pub fn with_boundary_perimeter_factor(mut self, factor: f64) -> Self {
        self.boundary_perimeter_factor = factor;
        self
    }

    /// Set the default radius factor
    pub fn with_default_radius_factor(mut self, factor: f64) -> Self {
        self.default_radius_factor = factor;
        self
    }

    /// Enable or disable per-decision tracing
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Cosine of the normal agreement threshold
    pub fn normal_cos_threshold(&self) -> f64 {
        self.normal_angle_threshold.cos()
    }

    /// Cosine of the fallback threshold, if the fallback is enabled
    pub fn fallback_cos_threshold(&self) -> Option<f64> {
        self.fallback_normal_angle_threshold.map(f64::cos)
    }

    /// Check every parameter, returning the first offending one
    pub fn validate(&self) -> Result<()> {
        for &r in &self.radii {
            check_radius(r)?;
        }
        if !(0.0..=std::f64::consts::PI).contains(&self.normal_angle_threshold) {
            return Err(Error::InvalidData(format!(
                "normal angle threshold must lie in [0, π], got {}",
                self.normal_angle_threshold
            )));
        }
        if let Some(fallback) = self.fallback_normal_angle_threshold {
            if !(self.normal_angle_threshold..=std::f64::consts::PI).contains(&fallback) {
                return Err(Error::InvalidData(format!(
                    "fallback normal angle threshold must lie in [{}, π], got {}",
                    self.normal_angle_threshold, fallback
                )));
            }
        }
        let fractions = [
            ("probe_radius_factor", self.probe_radius_factor),
            ("one_sided_majority", self.one_sided_majority),
            ("one_sided_minority", self.one_sided_minority),
        ];
        for (name, value) in fractions {
            if !(value > 0.0 && value <= 1.0) {
                return Err(Error::InvalidData(format!(
                    "{} must lie in (0, 1], got {}",
                    name, value
                )));
            }
        }
        let positives = [
            ("boundary_perimeter_factor", self.boundary_perimeter_factor),
            ("default_radius_factor", self.default_radius_factor),
        ];
        for (name, value) in positives {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidData(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        let tolerances = [
            ("empty_ball_tolerance", self.empty_ball_tolerance),
            ("coplanar_tolerance", self.coplanar_tolerance),
            ("crossing_tolerance", self.crossing_tolerance),
            ("boundary_band", self.boundary_band),
        ];
        for (name, value) in tolerances {
            if !(0.0..1.0).contains(&value) {
                return Err(Error::InvalidData(format!(
                    "{} must lie in [0, 1), got {}",
                    name, value
                )));
            }
        }
        let (soft, hard) = (self.duplicate_distance_soft, self.duplicate_distance_hard);
        if !(soft.is_finite() && hard >= 0.0 && hard <= soft) {
            return Err(Error::InvalidData(format!(
                "duplicate distances must satisfy 0 <= hard <= soft, got hard {} and soft {}",
                hard, soft
            )));
        }
        if !(-1.0..=1.0).contains(&self.duplicate_normal_agreement) {
            return Err(Error::InvalidData(format!(
                "duplicate_normal_agreement must lie in [-1, 1], got {}",
                self.duplicate_normal_agreement
            )));
        }
        if self.probe_candidate_cap == 0
            || self.loop_sample_count == 0
            || self.spacing_neighbors == 0
        {
            return Err(Error::InvalidData(
                "probe_candidate_cap, loop_sample_count and spacing_neighbors must be non-zero"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Radii sorted ascending with duplicates removed
    pub fn sorted_radii(&self) -> Result<Vec<f64>> {
        let mut radii = self.radii.clone();
        for &r in &radii {
            check_radius(r)?;
        }
        radii.sort_by(f64::total_cmp);
        radii.dedup();
        Ok(radii)
    }
}

pub(crate) fn check_radius(radius: f64) -> Result<()> {
    if radius.is_finite() && radius > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidData(format!(
            "ball radius must be finite and positive, got {}",
            radius
        )))
    }
}
