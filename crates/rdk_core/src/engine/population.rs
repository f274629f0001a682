//! Population builder
//!
//! Turns one aperture's parameters into a set of tracked objects:
//! coherence split → per-object policies → initial state.
//!
//! ## Oriented objects
//! Oriented objects carry a second, independent coherence axis. The axis named
//! by `task_axis` is the primary one; the other axis is linked to it through
//! the congruency mode:
//! - `Independent`: secondary slots are shuffled (Same) or drawn independently (Different)
//! - `Congruent`: secondary slots follow the primary rank / draw
//! - `Incongruent`: secondary slots follow the mirrored rank / draw (`1 − r`)
//!
//! The same rule is used for both signal-selection rules; see `motion.rs`
//! for the per-frame half.

use crate::models::config::{
    ApertureParams, CongruencyMode, OrientationParams, SignalSelection, TaskAxis,
    COHERENCE_EPSILON,
};
use crate::models::object::{MixtureWeights, MotionPolicy, OrientationPolicy, TrackedObject};
use crate::models::types::Vec2;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::f64::consts::PI;
use tracing::debug;

/// How many objects fall into each motion class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoherenceSplit {
    pub n_coherent: usize,
    pub n_opposite: usize,
    pub n_incoherent: usize,
}

impl CoherenceSplit {
    /// `round(N·c)` coherent, `round(N·c′)` opposite, the rest incoherent.
    ///
    /// When `c + c′ == 1` the opposite count absorbs the rounding remainder so
    /// no object is left incoherent.
    pub fn compute(n: usize, coherence: f64, opposite: f64) -> Self {
        let n_coherent = ((n as f64 * coherence).round() as usize).min(n);
        let remaining = n - n_coherent;
        let n_opposite = if (coherence + opposite - 1.0).abs() <= COHERENCE_EPSILON {
            remaining
        } else {
            ((n as f64 * opposite).round() as usize).min(remaining)
        };
        Self { n_coherent, n_opposite, n_incoherent: remaining - n_opposite }
    }

    pub fn total(&self) -> usize {
        self.n_coherent + self.n_opposite + self.n_incoherent
    }
}

/// One set of objects for one aperture.
#[derive(Debug, Clone, Serialize)]
pub struct Population {
    pub objects: Vec<TrackedObject>,
    pub split: CoherenceSplit,
    pub orientation_split: Option<CoherenceSplit>,
}

impl Population {
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Mean position of all objects (zero vector when empty).
    pub fn centroid(&self) -> Vec2 {
        if self.objects.is_empty() {
            return Vec2::ZERO;
        }
        let sum = self.objects.iter().fold(Vec2::ZERO, |acc, o| acc + o.position);
        sum * (1.0 / self.objects.len() as f64)
    }
}

/// Build a fresh population for `params`.
pub fn build_population<R: Rng + ?Sized>(params: &ApertureParams, rng: &mut R) -> Population {
    let n = params.n_objects;
    let split = CoherenceSplit::compute(n, params.coherence, params.opposite_coherence);
    debug_assert_eq!(split.total(), n);

    let (motion, orientation, orientation_split) = match params.signal_selection {
        SignalSelection::Same => assign_fixed(params, split, rng),
        SignalSelection::Different => assign_mixture(params),
    };

    let direction = params.coherent_direction_rad();
    let objects = (0..n)
        .map(|i| {
            let speed = jittered_speed(params.speed, params.speed_spread, rng);
            let own_heading = rng.gen_range(-PI..=PI);
            let own_orientation = rng.gen_range(-PI..=PI);
            let orientation_policy = orientation.as_ref().map(|slots| slots[i]);
            let mut object = TrackedObject {
                position: params.aperture.sample_uniform(rng),
                orientation: None,
                policy: motion[i],
                orientation_policy,
                speed,
                coherent_velocity: Vec2::from_heading(direction, speed),
                own_velocity: Vec2::from_heading(own_heading, speed),
                own_orientation,
                life: params.life_limit.map(|limit| rng.gen_range(0..limit)),
                last_step: Vec2::ZERO,
            };
            if let (Some(policy), Some(o)) = (orientation_policy, params.orientation.as_ref()) {
                let concrete = match policy {
                    OrientationPolicy::Mixture { coherence, opposite } => {
                        OrientationPolicy::pick(coherence, opposite, rng.gen())
                    }
                    fixed => fixed,
                };
                object.orientation = Some(orientation_angle(&object, concrete, o));
            }
            object
        })
        .collect();

    debug!(
        aperture = params.index,
        n,
        coherent = split.n_coherent,
        opposite = split.n_opposite,
        incoherent = split.n_incoherent,
        "population built"
    );

    Population { objects, split, orientation_split }
}

type Assignment = (Vec<MotionPolicy>, Option<Vec<OrientationPolicy>>, Option<CoherenceSplit>);

/// "Same" rule: policies fixed by rank at creation.
fn assign_fixed<R: Rng + ?Sized>(
    params: &ApertureParams,
    split: CoherenceSplit,
    rng: &mut R,
) -> Assignment {
    let mut motion = Vec::with_capacity(split.total());
    motion.extend(std::iter::repeat(MotionPolicy::ConstantDirection).take(split.n_coherent));
    motion.extend(std::iter::repeat(MotionPolicy::OppositeDirection).take(split.n_opposite));
    motion.extend(
        std::iter::repeat(MotionPolicy::noise(params.noise_type)).take(split.n_incoherent),
    );

    let Some(o) = params.orientation.as_ref() else {
        return (motion, None, None);
    };

    let o_split = CoherenceSplit::compute(split.total(), o.coherence, o.opposite_coherence);
    let mut orientation = Vec::with_capacity(o_split.total());
    orientation.extend(std::iter::repeat(OrientationPolicy::Coherent).take(o_split.n_coherent));
    orientation.extend(std::iter::repeat(OrientationPolicy::Opposite).take(o_split.n_opposite));
    orientation.extend(std::iter::repeat(OrientationPolicy::Random).take(o_split.n_incoherent));

    match o.task_axis {
        TaskAxis::Movement => couple_ranks(&mut orientation, o.congruency, rng),
        TaskAxis::Orientation => couple_ranks(&mut motion, o.congruency, rng),
    }

    (motion, Some(orientation), Some(o_split))
}

/// Arrange the secondary axis relative to the primary rank order.
fn couple_ranks<T, R: Rng + ?Sized>(secondary: &mut [T], mode: CongruencyMode, rng: &mut R) {
    match mode {
        CongruencyMode::Independent => secondary.shuffle(rng),
        CongruencyMode::Congruent => {}
        CongruencyMode::Incongruent => secondary.reverse(),
    }
}

/// "Different" rule: every object re-draws its role each frame.
fn assign_mixture(params: &ApertureParams) -> Assignment {
    let weights = MixtureWeights {
        coherence: params.coherence,
        opposite: params.opposite_coherence,
        noise: params.noise_type,
    };
    let motion = vec![MotionPolicy::Mixture(weights); params.n_objects];
    let orientation = params.orientation.as_ref().map(|o| {
        vec![
            OrientationPolicy::Mixture { coherence: o.coherence, opposite: o.opposite_coherence };
            params.n_objects
        ]
    });
    (motion, orientation, None)
}

fn jittered_speed<R: Rng + ?Sized>(speed: f64, spread: f64, rng: &mut R) -> f64 {
    if spread > 0.0 {
        (speed + spread * rng.gen_range(-1.0..=1.0)).max(0.0)
    } else {
        speed
    }
}

/// Orientation (radians) shown for a concrete orientation policy.
pub(crate) fn orientation_angle(
    object: &TrackedObject,
    policy: OrientationPolicy,
    params: &OrientationParams,
) -> f64 {
    let coherent = params.coherent_orientation_deg.to_radians();
    match policy {
        OrientationPolicy::Coherent => coherent,
        OrientationPolicy::Opposite => coherent + PI,
        OrientationPolicy::Random | OrientationPolicy::Mixture { .. } => object.own_orientation,
    }
}
