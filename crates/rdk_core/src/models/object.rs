//! Tracked objects and their update policies.

use super::config::NoiseType;
use super::types::Vec2;
use serde::Serialize;

/// Per-frame weights for the "different" signal-selection rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MixtureWeights {
    pub coherence: f64,
    pub opposite: f64,
    pub noise: NoiseType,
}

impl MixtureWeights {
    /// Map a uniform draw `r ∈ [0, 1)` to the concrete policy for this frame.
    pub fn pick(&self, r: f64) -> MotionPolicy {
        if r < self.coherence {
            MotionPolicy::ConstantDirection
        } else if r < self.coherence + self.opposite {
            MotionPolicy::OppositeDirection
        } else {
            MotionPolicy::noise(self.noise)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MotionPolicy {
    ConstantDirection,
    OppositeDirection,
    RandomPosition,
    RandomWalk,
    RandomDirection,
    Mixture(MixtureWeights),
}

impl MotionPolicy {
    pub fn noise(noise: NoiseType) -> Self {
        match noise {
            NoiseType::RandomPosition => MotionPolicy::RandomPosition,
            NoiseType::RandomWalk => MotionPolicy::RandomWalk,
            NoiseType::RandomDirection => MotionPolicy::RandomDirection,
        }
    }

    pub fn is_coherent(&self) -> bool {
        matches!(self, MotionPolicy::ConstantDirection)
    }
}

/// Orientation rule for oriented objects (mirror of the movement split).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrientationPolicy {
    Coherent,
    Opposite,
    /// The object's own fixed random orientation.
    Random,
    /// Re-drawn each frame: `coherence`, then `opposite`, else random.
    Mixture { coherence: f64, opposite: f64 },
}

impl OrientationPolicy {
    pub fn pick(coherence: f64, opposite: f64, r: f64) -> Self {
        if r < coherence {
            OrientationPolicy::Coherent
        } else if r < coherence + opposite {
            OrientationPolicy::Opposite
        } else {
            OrientationPolicy::Random
        }
    }
}

/// One simulated dot or oriented shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedObject {
    pub position: Vec2,
    /// Current orientation in radians (oriented objects only).
    pub orientation: Option<f64>,
    pub policy: MotionPolicy,
    pub orientation_policy: Option<OrientationPolicy>,
    /// Pixels per frame after speed jitter.
    pub speed: f64,
    /// `speed · (cos θ, −sin θ)` for the coherent direction θ.
    pub coherent_velocity: Vec2,
    /// Fixed random-direction velocity drawn at creation.
    pub own_velocity: Vec2,
    /// Fixed random orientation drawn at creation, radians.
    pub own_orientation: f64,
    /// Frames lived since the last relocation; `None` when life is unlimited.
    pub life: Option<u32>,
    /// Displacement applied by the most recent step.
    pub last_step: Vec2,
}
